//! X domain: the bondsman network portal, notifications and subscriptions.

use super::{decode, encode, ActionHandler};
use crate::domain::{iso_after, iso_now, or_default, prefixed_id, str_or};
use async_trait::async_trait;
use chrono::Duration;
use relay_types::{Action, ActionError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Length of a subscription period.
pub const SUBSCRIPTION_DAYS: i64 = 30;

pub fn handlers() -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(BondsmanPortal),
        Arc::new(NotificationSystem),
        Arc::new(SubscriptionManagement),
    ]
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PortalRequest {
    action: Option<Value>,
    user_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortalResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    portal_action: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Value>,
    status: &'static str,
    timestamp: String,
}

pub struct BondsmanPortal;

#[async_trait]
impl ActionHandler for BondsmanPortal {
    fn action(&self) -> Action {
        Action::BondsmanPortal
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: PortalRequest = decode(self.action(), data)?;
        encode(
            self.action(),
            &PortalResult {
                portal_action: request.action,
                user_id: request.user_id,
                status: "success",
                timestamp: iso_now(),
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NotificationRequest {
    recipients: Option<Value>,
    message: Option<Value>,
    urgency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Notification {
    notification_id: String,
    recipients: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Value>,
    urgency: String,
    sent: bool,
    sent_at: String,
}

/// Notifies bondsmen in the network.
pub struct NotificationSystem;

#[async_trait]
impl ActionHandler for NotificationSystem {
    fn action(&self) -> Action {
        Action::NotificationSystem
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: NotificationRequest = decode(self.action(), data)?;
        let notification = Notification {
            notification_id: prefixed_id("not"),
            recipients: or_default(request.recipients, json!([])),
            message: request.message,
            urgency: str_or(request.urgency, "normal"),
            sent: true,
            sent_at: iso_now(),
        };
        info!(
            notification_id = %notification.notification_id,
            urgency = %notification.urgency,
            "Notification sent"
        );
        encode(self.action(), &notification)
    }
}

/// Subscription tier of a bondsman, as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Basic,
    Pro,
    Enterprise,
    /// No tier, or one that is not offered. Gets the basic radius and
    /// priority with every notification channel.
    Unlisted,
}

impl Tier {
    #[must_use]
    pub fn from_request(name: Option<&str>) -> Self {
        match name {
            Some("basic") => Tier::Basic,
            Some("pro") => Tier::Pro,
            Some("enterprise") => Tier::Enterprise,
            _ => Tier::Unlisted,
        }
    }

    fn features(self) -> Features {
        const ALL_CHANNELS: &[&str] = &["email", "sms", "app"];
        match self {
            Tier::Enterprise => Features {
                radius: "statewide",
                priority: 1,
                notification_channels: ALL_CHANNELS,
            },
            Tier::Pro => Features {
                radius: "25mi",
                priority: 2,
                notification_channels: ALL_CHANNELS,
            },
            Tier::Basic => Features {
                radius: "10mi",
                priority: 3,
                notification_channels: &["email"],
            },
            Tier::Unlisted => Features {
                radius: "10mi",
                priority: 3,
                notification_channels: ALL_CHANNELS,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Features {
    radius: &'static str,
    priority: u8,
    notification_channels: &'static [&'static str],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SubscriptionRequest {
    user_id: Option<Value>,
    tier: Option<String>,
    action: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Subscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Value>,
    tier: String,
    status: String,
    valid_until: String,
    features: Features,
}

pub struct SubscriptionManagement;

#[async_trait]
impl ActionHandler for SubscriptionManagement {
    fn action(&self) -> Action {
        Action::SubscriptionManagement
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: SubscriptionRequest = decode(self.action(), data)?;
        let features = Tier::from_request(request.tier.as_deref()).features();
        encode(
            self.action(),
            &Subscription {
                user_id: request.user_id,
                features,
                tier: str_or(request.tier, "basic"),
                status: str_or(request.action, "updated"),
                valid_until: iso_after(Duration::days(SUBSCRIPTION_DAYS)),
            },
        )
    }
}

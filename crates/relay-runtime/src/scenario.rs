//! Demonstration flows run by the binary against the hub page.

use relay_bus::DomainRelay;
use relay_types::{Action, DomainName, RelayError, Session};
use serde_json::{json, Value};
use tracing::info;

/// Bail amount quoted by the fee calculation flow.
pub const DEMO_BAIL_AMOUNT: u64 = 10_000;

/// Results of a full demonstration run.
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub fee_quote: Value,
    pub notifications: (Value, Value),
    pub session: Session,
}

/// Ask crypto for the fee on the demo bail amount.
pub async fn fee_calculation(hub: &DomainRelay) -> Result<Value, RelayError> {
    let quote = hub
        .request_action(
            DomainName::Crypto,
            Action::FeeCalculation,
            json!({ "bailAmount": DEMO_BAIL_AMOUNT }),
        )
        .await?;
    info!(quote = %quote, "Fee quoted");
    Ok(quote)
}

/// Send two overlapping notification requests to the bondsman network.
pub async fn concurrent_notifications(hub: &DomainRelay) -> Result<(Value, Value), RelayError> {
    let (first, second) = tokio::join!(
        hub.request_action(
            DomainName::X,
            Action::NotificationSystem,
            json!({ "message": "Detainee located", "urgency": "high" }),
        ),
        hub.request_action(
            DomainName::X,
            Action::NotificationSystem,
            json!({ "message": "Bond posted", "recipients": ["bm_1", "bm_2"] }),
        ),
    );
    let notifications = (first?, second?);
    info!(
        first = %notifications.0["notificationId"],
        second = %notifications.1["notificationId"],
        "Notifications sent"
    );
    Ok(notifications)
}

/// Activate the emergency flow from the hub and return the session.
pub async fn emergency_activation(hub: &DomainRelay) -> Session {
    hub.activate_emergency(json!({
        "initiatedBy": hub.current_domain(),
        "reason": "demo",
    }))
    .await;
    let session = hub.session();
    info!(
        session_id = %session.session_id,
        status = ?session.status,
        "Emergency active"
    );
    session
}

/// Run every demonstration flow in order.
pub async fn run_demo(hub: &DomainRelay) -> Result<DemoReport, RelayError> {
    let fee_quote = fee_calculation(hub).await?;
    let notifications = concurrent_notifications(hub).await?;
    let session = emergency_activation(hub).await;
    Ok(DemoReport {
        fee_quote,
        notifications,
        session,
    })
}

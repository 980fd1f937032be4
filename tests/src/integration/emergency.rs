//! # Emergency Propagation
//!
//! Activating the emergency flow on one page moves the shared session to
//! `emergency_active`, persists it and pushes it to every other domain.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{
        bare_hub, browser, envelope_for, eventually, hub_with_frames, origin_of,
        RecordingNotifier, HUB_URL, HUB_WINDOW,
    };
    use relay_bus::{
        EventFilter, EventTopic, MemoryStorage, RelayConfig, RelayEvent, SessionStore, Severity,
        DEFAULT_SESSION_KEY,
    };
    use relay_runtime::SimulatedBrowser;
    use relay_types::{DomainName, MessagePayload, SessionStatus};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_emergency_reaches_every_frame() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        hub.activate_emergency(json!({"caseId": "case_1"})).await;
        assert_eq!(hub.session().status, SessionStatus::EmergencyActive);

        for domain in DomainName::Blockchain.others() {
            let frame = browser.frame_relay(HUB_WINDOW, domain).unwrap();
            eventually(&format!("emergency on {domain}"), || {
                frame.session().is_emergency_active()
            })
            .await;
            assert_eq!(frame.session().emergency_data, Some(json!({"caseId": "case_1"})));
        }
    }

    #[tokio::test]
    async fn test_emergency_is_persisted() {
        let browser = browser();
        let hub = bare_hub(&browser).await;

        hub.activate_emergency(json!({"caseId": "case_2"})).await;

        let stored = SessionStore::new(browser.storage(), DEFAULT_SESSION_KEY)
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(stored.session_id, hub.session_id());
        assert_eq!(stored.status, SessionStatus::EmergencyActive);
        assert!(stored.emergency_activated);
    }

    #[tokio::test]
    async fn test_emergency_over_storage_relay_opens_every_domain() {
        let browser = browser();
        let hub = bare_hub(&browser).await;

        hub.activate_emergency(json!({})).await;

        eventually("five windows", || browser.window_names().len() == 5).await;
        for domain in DomainName::Blockchain.others() {
            let relay = browser
                .relay(&relay_runtime::window_name(domain))
                .unwrap();
            assert_eq!(relay.session_id(), hub.session_id());
            eventually(&format!("emergency on {domain}"), || {
                relay.session().is_emergency_active()
            })
            .await;
        }
    }

    #[tokio::test]
    async fn test_emergency_notifies_ui() {
        let notifier = Arc::new(RecordingNotifier::default());
        let browser = SimulatedBrowser::with_notifier(
            Arc::new(MemoryStorage::new()),
            RelayConfig::default(),
            notifier.clone(),
        );
        let hub = browser.open_page(HUB_URL).await.unwrap();

        hub.activate_emergency(json!({})).await;

        let seen = notifier.seen.lock().clone();
        assert!(seen.contains(&("Emergency Activated".to_string(), Severity::Critical)));
    }

    #[tokio::test]
    async fn test_emergency_activation_message_from_frame() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;
        let mut emergencies = hub.subscribe(EventFilter::topics(vec![EventTopic::Emergency]));

        let message = envelope_for(
            &hub,
            DomainName::Wallet,
            MessagePayload::EmergencyActivation {
                data: json!({"from": "wallet"}),
            },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(&origin_of(DomainName::Wallet), message)
            .unwrap();

        let event = timeout(Duration::from_secs(2), emergencies.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            RelayEvent::EmergencyActivated { ref data } if data["from"] == "wallet"
        ));
        assert!(hub.session().is_emergency_active());
    }

    #[tokio::test]
    async fn test_session_update_cannot_revert_emergency() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;
        hub.activate_emergency(json!({})).await;
        let mut updates = hub.subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let revert = envelope_for(
            &hub,
            DomainName::Crypto,
            MessagePayload::SessionUpdate {
                session: json!({
                    "sessionId": hub.session_id(),
                    "emergencyActivated": false,
                    "status": "initialized",
                    "domainAccess": {"crypto": false},
                }),
            },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(&origin_of(DomainName::Crypto), revert)
            .unwrap();

        let event = timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        let RelayEvent::SessionUpdated(session) = event else {
            panic!("expected a session update, got {event:?}");
        };
        assert_eq!(session.status, SessionStatus::EmergencyActive);
        assert!(session.emergency_activated);
        assert!(hub.session().is_emergency_active());
    }

    #[tokio::test]
    async fn test_session_update_merges_domain_access() {
        let browser = browser();
        let hub = bare_hub(&browser).await;
        assert!(!hub.session().has_accessed(DomainName::Nft));
        let mut updates = hub.subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let update = envelope_for(
            &hub,
            DomainName::Nft,
            MessagePayload::SessionUpdate {
                session: json!({
                    "sessionId": hub.session_id(),
                    "domainAccess": {"nft": true, "blockchain": false},
                }),
            },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(&origin_of(DomainName::Nft), update)
            .unwrap();

        timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        let session = hub.session();
        assert!(session.has_accessed(DomainName::Nft));
        assert!(session.has_accessed(DomainName::Blockchain));
    }

    #[tokio::test]
    async fn test_partial_session_update_keeps_status_consistent() {
        let browser = browser();
        let hub = bare_hub(&browser).await;
        let mut updates = hub.subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let update = envelope_for(
            &hub,
            DomainName::Wallet,
            MessagePayload::SessionUpdate {
                session: json!({
                    "sessionId": hub.session_id(),
                    "emergencyActivated": true,
                }),
            },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(&origin_of(DomainName::Wallet), update)
            .unwrap();

        let event = timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        let RelayEvent::SessionUpdated(session) = event else {
            panic!("expected a session update, got {event:?}");
        };
        assert!(session.emergency_activated);
        assert_eq!(session.status, SessionStatus::EmergencyActive);
        assert!(hub.session().is_emergency_active());
    }
}

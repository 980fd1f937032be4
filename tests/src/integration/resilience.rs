//! # Resilience
//!
//! Reloads, closed windows, foreign input and requests nobody answers.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{
        bare_hub, browser, browser_with, envelope_for, hub_with_frames, origin_of,
        short_timeout, HUB_URL, HUB_WINDOW,
    };
    use relay_bus::{
        EventFilter, EventTopic, FileStorage, RelayConfig, RelayEvent, DEFAULT_RELAY_KEY_PREFIX,
    };
    use relay_runtime::SimulatedBrowser;
    use relay_types::{
        Action, CorrelationId, DomainName, MessagePayload, RelayError, RelayMessage,
        ResponseStatus, SessionId,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Post a marker response from crypto and wait until the hub has
    /// handled it. Messages posted earlier have been handled by then.
    async fn flush_hub(browser: &Arc<SimulatedBrowser>) {
        let hub = browser.relay(HUB_WINDOW).unwrap();
        let mut actions = hub.subscribe(EventFilter::topics(vec![EventTopic::Actions]));
        let marker_id = CorrelationId::new();
        let marker = envelope_for(
            &hub,
            DomainName::Crypto,
            MessagePayload::ActionResponse {
                original_action: Action::FeeCalculation.as_str().to_string(),
                correlation_id: marker_id,
                status: ResponseStatus::Complete,
                result: json!(null),
                error: None,
            },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(&origin_of(DomainName::Crypto), marker)
            .unwrap();

        timeout(Duration::from_secs(2), async {
            while let Some(event) = actions.recv().await {
                if let RelayEvent::ActionComplete { correlation_id, .. } = event {
                    if correlation_id == marker_id {
                        return;
                    }
                }
            }
            panic!("event bus closed");
        })
        .await
        .unwrap();
    }

    // =========================================================================
    // RELOAD
    // =========================================================================

    #[tokio::test]
    async fn test_session_survives_reload() {
        let browser = browser();
        let first = bare_hub(&browser).await;
        let session_id = first.session_id();

        assert!(browser.close_window(HUB_WINDOW).await);
        let reloaded = bare_hub(&browser).await;

        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.session_id(), session_id);
        assert!(reloaded.session().has_accessed(DomainName::Blockchain));
    }

    #[tokio::test]
    async fn test_session_survives_restart_with_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let session_id = {
            let storage = Arc::new(FileStorage::open(&path).unwrap());
            let browser = SimulatedBrowser::new(storage, RelayConfig::default());
            let hub = browser.open_page(HUB_URL).await.unwrap();
            hub.activate_emergency(json!({"caseId": "case_9"})).await;
            let id = hub.session_id();
            browser.close_all().await;
            id
        };

        let storage = Arc::new(FileStorage::open(&path).unwrap());
        let browser = SimulatedBrowser::new(storage, RelayConfig::default());
        let hub = browser.open_page(HUB_URL).await.unwrap();
        assert_eq!(hub.session_id(), session_id);
        assert!(hub.session().is_emergency_active());
    }

    // =========================================================================
    // STALE WINDOWS
    // =========================================================================

    #[tokio::test]
    async fn test_closed_window_is_reopened_on_next_send() {
        let browser = browser();
        let hub = bare_hub(&browser).await;

        hub.request_action(DomainName::Crypto, Action::FeeCalculation, json!({}))
            .await
            .unwrap();
        let first = browser.relay("domain_crypto").unwrap();

        assert!(browser.close_window("domain_crypto").await);
        assert!(browser.relay("domain_crypto").is_none());

        let quote = hub
            .request_action(
                DomainName::Crypto,
                Action::FeeCalculation,
                json!({"bailAmount": 2000}),
            )
            .await
            .unwrap();
        assert_eq!(quote["total"], 2200);

        let second = browser.relay("domain_crypto").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    // =========================================================================
    // FOREIGN INPUT
    // =========================================================================

    #[tokio::test]
    async fn test_foreign_origin_is_dropped() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let handle = browser.window_handle(HUB_WINDOW).unwrap();
        for origin in [
            "https://evil.example",
            "https://localhost.evil.example",
            "https://evil-replit.attacker.io",
            "https://127.0.0.1.attacker.io",
        ] {
            let activation = envelope_for(
                &hub,
                DomainName::Crypto,
                MessagePayload::EmergencyActivation { data: json!({}) },
            );
            handle.post_message(origin, activation).unwrap();
        }
        flush_hub(&browser).await;

        assert!(!hub.session().is_emergency_active());
    }

    #[tokio::test]
    async fn test_foreign_origin_accepted_when_enforcement_off() {
        let browser = browser_with(RelayConfig {
            enforce_origin: false,
            ..RelayConfig::default()
        });
        let hub = bare_hub(&browser).await;

        let activation = envelope_for(
            &hub,
            DomainName::Crypto,
            MessagePayload::EmergencyActivation { data: json!({}) },
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message("https://evil.example", activation)
            .unwrap();
        flush_hub(&browser).await;

        assert!(hub.session().is_emergency_active());
    }

    #[tokio::test]
    async fn test_foreign_session_is_dropped() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let foreign = RelayMessage::new(
            MessagePayload::EmergencyActivation { data: json!({}) },
            DomainName::Crypto,
            Some(SessionId::new("sid_someoneelse000000000000000")),
        );
        browser
            .window_handle(HUB_WINDOW)
            .unwrap()
            .post_message(
                &origin_of(DomainName::Crypto),
                serde_json::to_value(foreign).unwrap(),
            )
            .unwrap();
        flush_hub(&browser).await;

        assert!(!hub.session().is_emergency_active());
    }

    #[tokio::test]
    async fn test_malformed_messages_are_dropped() {
        let browser = browser();
        let hub = bare_hub(&browser).await;
        let handle = browser.window_handle(HUB_WINDOW).unwrap();
        let origin = origin_of(DomainName::Crypto);

        handle.post_message(&origin, json!("not an object")).unwrap();
        handle
            .post_message(&origin, json!({"type": "DOMAIN_ACTION_REQUEST"}))
            .unwrap();
        handle
            .post_message(&origin, json!({"type": "EMERGENCY_ACTIVATION"}))
            .unwrap();
        flush_hub(&browser).await;

        assert!(!hub.session().is_emergency_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_delivery_is_handled_once() {
        let browser = browser();
        let hub = bare_hub(&browser).await;
        let crypto = browser
            .open_page("https://Nine1Eight.crypto/")
            .await
            .unwrap();
        let mut actions = hub.subscribe(EventFilter::topics(vec![EventTopic::Actions]));

        let request = envelope_for(
            &hub,
            DomainName::Blockchain,
            MessagePayload::ActionRequest {
                action: Action::FeeCalculation.as_str().to_string(),
                correlation_id: CorrelationId::new(),
                response_channel: DomainName::Blockchain,
                data: json!({"bailAmount": 100}),
            },
        );
        let handle = browser.window_handle("domain_crypto").unwrap();
        let hub_origin = hub.origin().to_string();
        handle.post_message(&hub_origin, request.clone()).unwrap();
        handle.post_message(&hub_origin, request).unwrap();

        let first = timeout(Duration::from_secs(2), actions.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, RelayEvent::ActionComplete { .. }));
        assert!(timeout(Duration::from_secs(2), actions.recv()).await.is_err());
        assert_eq!(crypto.current_domain(), DomainName::Crypto);
    }

    // =========================================================================
    // UNANSWERED REQUESTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_action_gets_no_response() {
        let browser = browser_with(short_timeout());
        let hub = hub_with_frames(&browser).await;

        let err = hub
            .request_action(DomainName::Crypto, Action::JailScanning, json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::Timeout {
                target: DomainName::Crypto,
                action: Action::JailScanning,
                timeout_ms: 1_000,
            }
        ));
        assert_eq!(hub.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_popups_time_out_and_leave_record() {
        let browser = browser_with(short_timeout());
        let hub = bare_hub(&browser).await;
        browser.block_popups();

        let err = hub
            .request_action(DomainName::Wallet, Action::WalletConnection, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Timeout { .. }));

        let storage = browser.storage();
        assert_eq!(
            storage.keys_with_prefix(DEFAULT_RELAY_KEY_PREFIX).unwrap().len(),
            1
        );

        // A wallet page opened later drains the record addressed to it.
        browser
            .open_page("https://Nine1Eight.wallet/")
            .await
            .unwrap();
        assert!(storage
            .keys_with_prefix(DEFAULT_RELAY_KEY_PREFIX)
            .unwrap()
            .is_empty());
    }
}

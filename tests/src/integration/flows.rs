//! # Request/Response Flows
//!
//! A hub page asks other domains to run actions and receives their results,
//! over embedded frames and over the storage relay.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{bare_hub, browser, eventually, hub_with_frames, HUB_WINDOW};
    use relay_bus::{TransportKind, DEFAULT_RELAY_KEY_PREFIX};
    use relay_types::{Action, DomainName, DomainRegistry, MessagePayload, RelayError};
    use serde_json::json;

    fn fee_example() -> serde_json::Value {
        json!({
            "bailAmount": 10000,
            "feePercent": 10,
            "fee": 1000,
            "total": 11000,
            "breakdown": {"baseFee": 800, "serviceFee": 200}
        })
    }

    // =========================================================================
    // FEE CALCULATION
    // =========================================================================

    #[tokio::test]
    async fn test_fee_calculation_over_frames() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let quote = hub
            .request_action(
                DomainName::Crypto,
                Action::FeeCalculation,
                json!({"bailAmount": 10000}),
            )
            .await
            .unwrap();

        assert_eq!(quote, fee_example());
        assert_eq!(hub.transport_kind(DomainName::Crypto), Some(TransportKind::Frame));
        assert_eq!(hub.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_fee_calculation_over_storage_relay() {
        let browser = browser();
        let hub = bare_hub(&browser).await;

        let quote = hub
            .request_action(
                DomainName::Crypto,
                Action::FeeCalculation,
                json!({"bailAmount": 10000}),
            )
            .await
            .unwrap();

        assert_eq!(quote, fee_example());
        assert_eq!(
            hub.transport_kind(DomainName::Crypto),
            Some(TransportKind::StorageRelay)
        );
        assert!(browser.relay("domain_crypto").is_some());

        // Delivered records are removed once posted.
        let leftover = browser
            .storage()
            .keys_with_prefix(DEFAULT_RELAY_KEY_PREFIX)
            .unwrap();
        assert!(leftover.is_empty(), "leftover records: {leftover:?}");
    }

    // =========================================================================
    // CONCURRENT REQUESTS
    // =========================================================================

    #[tokio::test]
    async fn test_overlapping_notification_requests_resolve_independently() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let (first, second) = tokio::join!(
            hub.request_action(
                DomainName::X,
                Action::NotificationSystem,
                json!({"message": "first", "urgency": "high"}),
            ),
            hub.request_action(
                DomainName::X,
                Action::NotificationSystem,
                json!({"message": "second"}),
            ),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first["message"], "first");
        assert_eq!(first["urgency"], "high");
        assert_eq!(second["message"], "second");
        assert_eq!(second["urgency"], "normal");
        assert_ne!(first["notificationId"], second["notificationId"]);
        assert_eq!(hub.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_requests_over_storage_relay() {
        let browser = browser();
        let hub = bare_hub(&browser).await;

        let (fee, audit) = tokio::join!(
            hub.request_action(
                DomainName::Crypto,
                Action::FeeCalculation,
                json!({"bailAmount": 500}),
            ),
            hub.request_action(
                DomainName::Nft,
                Action::AuditTrail,
                json!({"actor": "agent_7"}),
            ),
        );

        assert_eq!(fee.unwrap()["total"], 550);
        assert_eq!(audit.unwrap()["actor"], "agent_7");
    }

    // =========================================================================
    // EVERY ACTION
    // =========================================================================

    #[tokio::test]
    async fn test_every_action_answered_by_its_owner() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;
        let crypto = browser.frame_relay(HUB_WINDOW, DomainName::Crypto).unwrap();
        let registry = DomainRegistry::global();

        for action in Action::ALL {
            let owner = registry.owner_of(action);
            // The hub owns the blockchain actions; a frame asks for those.
            let requester = if owner == DomainName::Blockchain {
                &crypto
            } else {
                &hub
            };
            let result = requester
                .request_action(owner, action, json!({}))
                .await
                .unwrap_or_else(|e| panic!("{action} failed: {e}"));
            assert!(result.is_object(), "{action} returned {result}");
        }
    }

    #[tokio::test]
    async fn test_handler_failure_surfaces_as_action_failed() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let err = hub
            .request_action(
                DomainName::Crypto,
                Action::FeeCalculation,
                json!({"bailAmount": -5}),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::ActionFailed {
                target: DomainName::Crypto,
                action: Action::FeeCalculation,
                ..
            }
        ));
        assert_eq!(hub.pending_count(), 0);
    }

    // =========================================================================
    // FRAMES
    // =========================================================================

    #[tokio::test]
    async fn test_frames_announce_readiness_to_hub() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        eventually("four ready frames", || hub.ready_frames().len() == 4).await;
        let ready = hub.ready_frames();
        assert!(!ready.contains(&DomainName::Blockchain));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_other_domain() {
        let browser = browser();
        let hub = hub_with_frames(&browser).await;

        let delivered = hub.broadcast(MessagePayload::DomainReady).await;
        assert_eq!(delivered, 4);
    }
}

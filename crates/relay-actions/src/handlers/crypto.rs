//! Crypto domain: payments, escrow and fee calculation.

use super::{decode, encode, ActionHandler};
use crate::domain::{hex_token, prefixed_id, str_or, Cents, FeeQuote};
use async_trait::async_trait;
use relay_types::{Action, ActionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Bail amount quoted when the request names none.
pub const DEFAULT_QUOTE_BAIL: f64 = 10_000.0;

pub fn handlers() -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(PaymentProcessing),
        Arc::new(EscrowManagement),
        Arc::new(FeeCalculation),
    ]
}

// =============================================================================
// PAYMENT PROCESSING
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PaymentRequest {
    amount: Option<Value>,
    currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payment {
    payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Value>,
    currency: String,
    status: &'static str,
    tx_hash: String,
}

pub struct PaymentProcessing;

#[async_trait]
impl ActionHandler for PaymentProcessing {
    fn action(&self) -> Action {
        Action::PaymentProcessing
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: PaymentRequest = decode(self.action(), data)?;
        let payment = Payment {
            payment_id: prefixed_id("pay"),
            amount: request.amount,
            currency: str_or(request.currency, "USDC"),
            status: "completed",
            tx_hash: hex_token(32),
        };
        info!(payment_id = %payment.payment_id, currency = %payment.currency, "Payment processed");
        encode(self.action(), &payment)
    }
}

// =============================================================================
// ESCROW MANAGEMENT
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EscrowRequest {
    action: Option<String>,
    amount: Option<Value>,
    release_condition: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Escrow {
    escrow_id: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Value>,
    release_condition: String,
}

/// Creates, releases or refunds an escrow; the request's `action` becomes
/// the escrow status.
pub struct EscrowManagement;

#[async_trait]
impl ActionHandler for EscrowManagement {
    fn action(&self) -> Action {
        Action::EscrowManagement
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: EscrowRequest = decode(self.action(), data)?;
        encode(
            self.action(),
            &Escrow {
                escrow_id: prefixed_id("esc"),
                status: str_or(request.action, "created"),
                amount: request.amount,
                release_condition: str_or(request.release_condition, "confirmation"),
            },
        )
    }
}

// =============================================================================
// FEE CALCULATION
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FeeRequest {
    bail_amount: Option<Value>,
}

/// Quotes the 10% bail bond fee.
///
/// A missing or zero `bailAmount` quotes the default amount. Negative or
/// non-numeric amounts are rejected.
pub struct FeeCalculation;

impl FeeCalculation {
    /// Quote the fee on a raw `bailAmount` field.
    pub fn quote(bail_amount: Option<&Value>) -> Result<FeeQuote, ActionError> {
        let invalid = |reason: String| ActionError::InvalidInput {
            action: Action::FeeCalculation,
            reason,
        };

        let amount = match bail_amount.filter(|v| !v.is_null()) {
            Some(value) => Cents::from_json(value).map_err(|e| invalid(e.to_string()))?,
            None => Cents::default(),
        };
        let amount = if amount.is_zero() {
            Cents::from_units(DEFAULT_QUOTE_BAIL).map_err(|e| invalid(e.to_string()))?
        } else {
            amount
        };

        Ok(FeeQuote::for_bail(amount))
    }
}

#[async_trait]
impl ActionHandler for FeeCalculation {
    fn action(&self) -> Action {
        Action::FeeCalculation
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: FeeRequest = decode(self.action(), data)?;
        let quote = Self::quote(request.bail_amount.as_ref())?;
        debug!(
            bail_cents = quote.bail_amount.as_cents(),
            fee_cents = quote.fee.as_cents(),
            "Fee quoted"
        );
        encode(self.action(), &quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fee_calculation_example() {
        let result = FeeCalculation
            .handle(&json!({"bailAmount": 10000}))
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({
                "bailAmount": 10000,
                "feePercent": 10,
                "fee": 1000,
                "total": 11000,
                "breakdown": {"baseFee": 800, "serviceFee": 200}
            })
        );
    }

    #[tokio::test]
    async fn test_fee_calculation_defaults_missing_or_zero() {
        for data in [json!({}), json!({"bailAmount": 0}), Value::Null] {
            let result = FeeCalculation.handle(&data).await.unwrap();
            assert_eq!(result["bailAmount"], 10000);
            assert_eq!(result["total"], 11000);
        }
    }

    #[tokio::test]
    async fn test_fee_calculation_rejects_negative_and_text() {
        for data in [json!({"bailAmount": -5}), json!({"bailAmount": "5000"})] {
            let err = FeeCalculation.handle(&data).await.unwrap_err();
            assert!(matches!(
                err,
                ActionError::InvalidInput {
                    action: Action::FeeCalculation,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_payment_defaults_currency() {
        let result = PaymentProcessing
            .handle(&json!({"amount": 2500}))
            .await
            .unwrap();
        assert_eq!(result["amount"], 2500);
        assert_eq!(result["currency"], "USDC");
        assert_eq!(result["status"], "completed");
        assert_eq!(result["txHash"].as_str().unwrap().len(), 66);
    }

    #[tokio::test]
    async fn test_escrow_status_follows_request_action() {
        let created = EscrowManagement.handle(&json!({})).await.unwrap();
        assert_eq!(created["status"], "created");
        assert_eq!(created["releaseCondition"], "confirmation");
        assert!(created.get("amount").is_none());

        let released = EscrowManagement
            .handle(&json!({"action": "released", "amount": 100}))
            .await
            .unwrap();
        assert_eq!(released["status"], "released");
        assert_eq!(released["amount"], 100);
    }
}

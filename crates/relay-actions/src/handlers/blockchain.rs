//! Blockchain domain: emergency tracking, contract generation and jail
//! scanning.

use super::{decode, encode, ActionHandler};
use crate::domain::{iso_now, or_default, prefixed_id, random_in};
use async_trait::async_trait;
use relay_types::{Action, ActionError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Default bail amount of a generated contract.
pub const DEFAULT_CONTRACT_BAIL: u64 = 25_000;

const FACILITY_NAME: &str = "Central County Detention Facility";

pub fn handlers() -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(EmergencyInitiation),
        Arc::new(ContractGeneration),
        Arc::new(JailScanning),
    ]
}

// =============================================================================
// EMERGENCY INITIATION
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EmergencyRequest {
    user_info: Option<Value>,
    locations: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tracking {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_info: Option<Value>,
    locations: Value,
    active: bool,
}

#[derive(Debug, Serialize)]
struct EmergencyStarted {
    status: &'static str,
    timestamp: String,
    tracking: Tracking,
}

/// Starts tracking a detainee across the given locations.
pub struct EmergencyInitiation;

#[async_trait]
impl ActionHandler for EmergencyInitiation {
    fn action(&self) -> Action {
        Action::EmergencyInitiation
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: EmergencyRequest = decode(self.action(), data)?;
        info!("Emergency tracking initiated");
        encode(
            self.action(),
            &EmergencyStarted {
                status: "initiated",
                timestamp: iso_now(),
                tracking: Tracking {
                    user_info: request.user_info,
                    locations: or_default(request.locations, json!([])),
                    active: true,
                },
            },
        )
    }
}

// =============================================================================
// CONTRACT GENERATION
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContractRequest {
    bail_amount: Option<Value>,
    detainee_info: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedContract {
    contract_id: String,
    timestamp: String,
    bail_amount: Value,
    detainee_info: Value,
    status: &'static str,
}

pub struct ContractGeneration;

#[async_trait]
impl ActionHandler for ContractGeneration {
    fn action(&self) -> Action {
        Action::ContractGeneration
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: ContractRequest = decode(self.action(), data)?;
        let contract = GeneratedContract {
            contract_id: prefixed_id("bc"),
            timestamp: iso_now(),
            bail_amount: or_default(request.bail_amount, json!(DEFAULT_CONTRACT_BAIL)),
            detainee_info: or_default(request.detainee_info, json!({})),
            status: "generated",
        };
        info!(contract_id = %contract.contract_id, "Bail bond contract generated");
        encode(self.action(), &contract)
    }
}

// =============================================================================
// JAIL SCANNING
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Facility {
    name: &'static str,
    id: String,
    booking_ref: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanResult {
    scan_complete: bool,
    found: bool,
    facility: Facility,
}

/// Scans booking records. Always finds the detainee.
pub struct JailScanning;

#[async_trait]
impl ActionHandler for JailScanning {
    fn action(&self) -> Action {
        Action::JailScanning
    }

    async fn handle(&self, _data: &Value) -> Result<Value, ActionError> {
        encode(
            self.action(),
            &ScanResult {
                scan_complete: true,
                found: true,
                facility: Facility {
                    name: FACILITY_NAME,
                    id: prefixed_id("jail"),
                    booking_ref: format!("BK{}", random_in(100_000, 999_999)),
                },
            },
        )
    }
}

//! Typed provider event model.
//!
//! Webhook bodies arrive as `{"event": "...", "data": {...}}`. The
//! envelope is parsed once at this boundary; known event types
//! deserialize into typed payloads and fail closed on wrong shapes,
//! while unknown event types are preserved for acknowledgement without
//! mutation.

use serde::Deserialize;

use crate::ledger::TxnReference;

/// Resolution of a charge dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisputeResolution {
    /// Merchant won; the charge stands.
    Won,
    /// Merchant lost; the charge is clawed back.
    Lost,
}

/// A provider event, parsed and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `charge.success`: a checkout charge settled.
    ChargeSuccess {
        /// Transaction reference echoed by the provider.
        reference: TxnReference,
    },
    /// `charge.dispute.create`: a settled charge is under dispute.
    DisputeCreated {
        /// Reference of the disputed charge.
        reference: TxnReference,
    },
    /// `charge.dispute.remind`: the provider nudges for dispute evidence.
    DisputeReminder {
        /// Provider dispute identifier.
        dispute_id: i64,
    },
    /// `charge.dispute.resolve`: a dispute concluded.
    DisputeResolved {
        /// Reference of the disputed charge.
        reference: TxnReference,
        /// Who the dispute resolved for.
        resolution: DisputeResolution,
    },
    /// `transfer.success`: a payout settled.
    TransferSuccess {
        /// Withdrawal reference.
        reference: TxnReference,
    },
    /// `transfer.failed`: a payout did not complete.
    TransferFailed {
        /// Withdrawal reference.
        reference: TxnReference,
    },
    /// `transfer.reversed`: a payout was unwound by the provider.
    TransferReversed {
        /// Withdrawal reference.
        reference: TxnReference,
    },
    /// Any event type this engine does not act on.
    Unknown {
        /// The raw event name, for logging.
        event: String,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChargeData {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct DisputeData {
    transaction: DisputeTransaction,
}

#[derive(Debug, Deserialize)]
struct DisputeTransaction {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct DisputeReminderData {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct DisputeResolveData {
    status: DisputeResolution,
    transaction: DisputeTransaction,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    reference: String,
}

impl ProviderEvent {
    /// Parses a raw webhook body into a typed event.
    ///
    /// # Errors
    ///
    /// Returns the offending detail when the envelope is not valid JSON
    /// or a known event's data does not match its contract.
    pub fn parse(raw: &[u8]) -> Result<Self, String> {
        let envelope: Envelope =
            serde_json::from_slice(raw).map_err(|e| format!("invalid envelope: {e}"))?;

        let data = envelope.data;
        let event = match envelope.event.as_str() {
            "charge.success" => {
                let d: ChargeData = typed(data)?;
                Self::ChargeSuccess {
                    reference: TxnReference::from_raw(d.reference),
                }
            }
            "charge.dispute.create" => {
                let d: DisputeData = typed(data)?;
                Self::DisputeCreated {
                    reference: TxnReference::from_raw(d.transaction.reference),
                }
            }
            "charge.dispute.remind" => {
                let d: DisputeReminderData = typed(data)?;
                Self::DisputeReminder { dispute_id: d.id }
            }
            "charge.dispute.resolve" => {
                let d: DisputeResolveData = typed(data)?;
                Self::DisputeResolved {
                    reference: TxnReference::from_raw(d.transaction.reference),
                    resolution: d.status,
                }
            }
            "transfer.success" => {
                let d: TransferData = typed(data)?;
                Self::TransferSuccess {
                    reference: TxnReference::from_raw(d.reference),
                }
            }
            "transfer.failed" => {
                let d: TransferData = typed(data)?;
                Self::TransferFailed {
                    reference: TxnReference::from_raw(d.reference),
                }
            }
            "transfer.reversed" => {
                let d: TransferData = typed(data)?;
                Self::TransferReversed {
                    reference: TxnReference::from_raw(d.reference),
                }
            }
            _ => Self::Unknown {
                event: envelope.event,
            },
        };

        Ok(event)
    }
}

fn typed<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(data).map_err(|e| format!("invalid event data: {e}"))
}

//! Transaction state machine.
//!
//! Governs every legal transition for a transaction record from creation
//! to terminal state. Illegal transitions fail loudly; the at-least-once
//! webhook stream makes silent acceptance a double-crediting hazard.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::TxnReference;

/// Transaction status.
///
/// Withdrawals enter at `Initiated` (funds already reserved); top-ups enter
/// at `Pending` (no funds moved yet). `Disputed` is reachable only from
/// `Success` and resolves back to `Success` (dispute won) or `Reversed`
/// (dispute lost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Entry state for withdrawals: funds reserved, transfer not yet started.
    Initiated,
    /// Awaiting a provider outcome.
    Pending,
    /// Settled in the wallet's favor.
    Success,
    /// The provider call failed; reserved funds returned.
    Failed,
    /// Unwound after settlement or failure.
    Reversed,
    /// A successful charge is under provider dispute.
    Disputed,
}

impl TransactionStatus {
    /// Returns true if this status permits a transition to `to`.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (
                Self::Initiated,
                Self::Pending | Self::Success | Self::Failed | Self::Reversed
            ) | (Self::Pending, Self::Success | Self::Failed | Self::Reversed)
                | (Self::Success, Self::Disputed | Self::Reversed)
                | (Self::Failed, Self::Reversed)
                | (Self::Disputed, Self::Success | Self::Reversed)
        )
    }

    /// Validates a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidTransition` if the move is illegal.
    pub fn transition(self, to: Self, reference: &TxnReference) -> Result<Self, LedgerError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: self,
                to,
            })
        }
    }

    /// Returns true if no further provider outcome is expected.
    ///
    /// `Success` is terminal unless a dispute reopens it.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Reversed)
    }

    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Reversed => "reversed",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> TxnReference {
        TxnReference::from_raw("wallet_topup_ada_01_1754000000")
    }

    #[test]
    fn test_withdrawal_happy_path() {
        use TransactionStatus as S;
        let r = reference();
        let s = S::Initiated.transition(S::Pending, &r).unwrap();
        let s = s.transition(S::Success, &r).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn test_topup_happy_path() {
        use TransactionStatus as S;
        assert!(S::Pending.can_transition(S::Success));
        assert!(S::Pending.can_transition(S::Failed));
    }

    #[test]
    fn test_failed_to_success_is_illegal() {
        use TransactionStatus as S;
        let err = S::Failed.transition(S::Success, &reference()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: S::Failed,
                to: S::Success,
                ..
            }
        ));
    }

    #[test]
    fn test_reversed_is_final() {
        use TransactionStatus as S;
        for to in [S::Initiated, S::Pending, S::Success, S::Failed, S::Disputed] {
            assert!(!S::Reversed.can_transition(to));
        }
    }

    #[test]
    fn test_dispute_only_from_success() {
        use TransactionStatus as S;
        assert!(S::Success.can_transition(S::Disputed));
        for from in [S::Initiated, S::Pending, S::Failed, S::Reversed] {
            assert!(!from.can_transition(S::Disputed));
        }
    }

    #[test]
    fn test_dispute_resolution() {
        use TransactionStatus as S;
        assert!(S::Disputed.can_transition(S::Success));
        assert!(S::Disputed.can_transition(S::Reversed));
        assert!(!S::Disputed.can_transition(S::Failed));
    }

    #[test]
    fn test_no_self_transitions() {
        use TransactionStatus as S;
        for s in [S::Initiated, S::Pending, S::Success, S::Failed, S::Reversed, S::Disputed] {
            assert!(!s.can_transition(s), "self-transition allowed for {s}");
        }
    }
}

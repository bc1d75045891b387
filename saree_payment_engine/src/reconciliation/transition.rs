//! The settlement state machine.
//!
//! [`plan_transition`] is the single authority on which (status, payment_status) moves are
//! legal. It is a pure function over the order's current state and an incoming canonical
//! outcome; the database layer executes whatever plan it returns inside one transaction.

use crate::{
    db_types::{OrderStatusType, PaymentStatusType},
    normalizer::PaymentOutcome,
};

/// What the engine should do with an incoming outcome for an order in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Write the new pair of states. `adjust_inventory` is true only on the pending -> paid
    /// edge; the stock decrement must be claimed in the same transaction as this write.
    Apply { status: OrderStatusType, payment_status: PaymentStatusType, adjust_inventory: bool },
    /// The order is already in the terminal state the outcome names. Acknowledge and do
    /// nothing; retries and channel races land here.
    Duplicate,
    /// A pending outcome for an order in any state. Never writes: a late pending report must
    /// not regress a settled order.
    Ignore,
    /// The outcome names the opposite terminal state to the one on record. The record wins;
    /// the conflict is surfaced to the caller for loud logging.
    Conflict { recorded: PaymentStatusType, reported: PaymentOutcome },
}

pub fn plan_transition(current: PaymentStatusType, incoming: PaymentOutcome) -> TransitionPlan {
    use PaymentOutcome as Out;
    use PaymentStatusType as Cur;
    match (current, incoming) {
        (_, Out::Pending) => TransitionPlan::Ignore,
        (Cur::Pending, Out::Paid) => TransitionPlan::Apply {
            status: OrderStatusType::Confirmed,
            payment_status: PaymentStatusType::Paid,
            adjust_inventory: true,
        },
        (Cur::Pending, Out::Failed) => TransitionPlan::Apply {
            status: OrderStatusType::Cancelled,
            payment_status: PaymentStatusType::Failed,
            adjust_inventory: false,
        },
        (Cur::Paid, Out::Paid) | (Cur::Failed, Out::Failed) => TransitionPlan::Duplicate,
        (Cur::Paid, Out::Failed) | (Cur::Failed, Out::Paid) => {
            TransitionPlan::Conflict { recorded: current, reported: incoming }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pending_paid_confirms_and_claims_inventory() {
        let plan = plan_transition(PaymentStatusType::Pending, PaymentOutcome::Paid);
        assert_eq!(
            plan,
            TransitionPlan::Apply {
                status: OrderStatusType::Confirmed,
                payment_status: PaymentStatusType::Paid,
                adjust_inventory: true,
            }
        );
    }

    #[test]
    fn pending_failed_cancels_without_inventory() {
        let plan = plan_transition(PaymentStatusType::Pending, PaymentOutcome::Failed);
        assert_eq!(
            plan,
            TransitionPlan::Apply {
                status: OrderStatusType::Cancelled,
                payment_status: PaymentStatusType::Failed,
                adjust_inventory: false,
            }
        );
    }

    #[test]
    fn pending_outcome_never_writes() {
        for current in [PaymentStatusType::Pending, PaymentStatusType::Paid, PaymentStatusType::Failed] {
            assert_eq!(plan_transition(current, PaymentOutcome::Pending), TransitionPlan::Ignore);
        }
    }

    #[test]
    fn repeated_terminal_outcome_is_a_duplicate() {
        assert_eq!(plan_transition(PaymentStatusType::Paid, PaymentOutcome::Paid), TransitionPlan::Duplicate);
        assert_eq!(plan_transition(PaymentStatusType::Failed, PaymentOutcome::Failed), TransitionPlan::Duplicate);
    }

    #[test]
    fn opposing_terminal_outcomes_conflict() {
        assert_eq!(
            plan_transition(PaymentStatusType::Paid, PaymentOutcome::Failed),
            TransitionPlan::Conflict { recorded: PaymentStatusType::Paid, reported: PaymentOutcome::Failed }
        );
        assert_eq!(
            plan_transition(PaymentStatusType::Failed, PaymentOutcome::Paid),
            TransitionPlan::Conflict { recorded: PaymentStatusType::Failed, reported: PaymentOutcome::Paid }
        );
    }

    // The full matrix: every (current, incoming) pair has exactly one defined plan and terminal
    // states are never moved out of.
    #[test]
    fn terminal_states_are_never_regressed() {
        for current in [PaymentStatusType::Paid, PaymentStatusType::Failed] {
            for incoming in [PaymentOutcome::Paid, PaymentOutcome::Failed, PaymentOutcome::Pending] {
                let plan = plan_transition(current, incoming);
                assert!(
                    !matches!(plan, TransitionPlan::Apply { .. }),
                    "terminal {current} must not be rewritten by {incoming}"
                );
            }
        }
    }
}

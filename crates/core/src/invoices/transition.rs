//! Invoice status state machine.
//!
//! [`plan_transition`] decides which branch a status change takes and
//! [`Invoice::apply_plan`] applies it to the invoice row. Wallet and ledger
//! effects of the plan are applied by the repository in the same database
//! transaction.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::invoices_model::{Invoice, InvoiceStatus};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode {
    /// Only moves listed in [`allowed_targets`].
    Standard,
    /// Admin correction: additionally allows `Cancelled -> Paid`.
    AdminOverride,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPlan {
    /// Mark paid and credit the business wallet with `amount` (invoice currency).
    RecordPayment { amount: Decimal },
    /// Undo a payment and take `amount` back out of the wallet.
    ReversePayment {
        amount: Decimal,
        target: InvoiceStatus,
    },
    /// No money moves.
    StatusOnly {
        target: InvoiceStatus,
        reset_amounts: bool,
    },
}

impl TransitionPlan {
    pub fn target(&self) -> InvoiceStatus {
        match self {
            TransitionPlan::RecordPayment { .. } => InvoiceStatus::Paid,
            TransitionPlan::ReversePayment { target, .. } => *target,
            TransitionPlan::StatusOnly { target, .. } => *target,
        }
    }
}

pub fn allowed_targets(from: InvoiceStatus) -> &'static [InvoiceStatus] {
    use InvoiceStatus::*;
    match from {
        Draft => &[Sent, Paid, Cancelled],
        Sent => &[Draft, Paid, Overdue, Cancelled],
        Overdue => &[Sent, Paid, Cancelled],
        Paid => &[Cancelled, Refunded],
        Cancelled => &[Draft],
        Refunded => &[],
    }
}

pub fn is_allowed(from: InvoiceStatus, to: InvoiceStatus, mode: TransitionMode) -> bool {
    allowed_targets(from).contains(&to)
        || (mode == TransitionMode::AdminOverride
            && from == InvoiceStatus::Cancelled
            && to == InvoiceStatus::Paid)
}

pub fn plan_transition(
    invoice: &Invoice,
    target: InvoiceStatus,
    mode: TransitionMode,
) -> Result<TransitionPlan> {
    let from = invoice.status;
    if !is_allowed(from, target, mode) {
        return Err(Error::InvalidTransition {
            from: from.to_string(),
            to: target.to_string(),
        });
    }

    let plan = match (from, target) {
        (_, InvoiceStatus::Paid) => TransitionPlan::RecordPayment {
            amount: invoice.total,
        },
        (InvoiceStatus::Paid, InvoiceStatus::Cancelled | InvoiceStatus::Refunded) => {
            TransitionPlan::ReversePayment {
                amount: invoice.amount_paid,
                target,
            }
        }
        (_, target) => TransitionPlan::StatusOnly {
            target,
            reset_amounts: matches!(target, InvoiceStatus::Draft | InvoiceStatus::Sent),
        },
    };
    Ok(plan)
}

impl Invoice {
    /// Updates status and amounts for `plan`. Wallet effects are not touched here.
    pub fn apply_plan(&mut self, plan: &TransitionPlan, now: NaiveDateTime) {
        match plan {
            TransitionPlan::RecordPayment { .. } => {
                self.amount_paid = self.total;
                self.amount_due = Decimal::ZERO;
                self.paid_date = Some(now);
            }
            TransitionPlan::ReversePayment { .. } => {
                self.amount_paid = Decimal::ZERO;
                self.amount_due = self.total;
                self.paid_date = None;
            }
            TransitionPlan::StatusOnly { reset_amounts, .. } => {
                if *reset_amounts {
                    self.amount_due = self.total;
                    self.amount_paid = Decimal::ZERO;
                }
            }
        }
        self.status = plan.target();
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use InvoiceStatus::*;

    fn invoice(status: InvoiceStatus) -> Invoice {
        let now = Utc::now().naive_utc();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let paid = status == Paid;
        Invoice {
            id: "inv".to_string(),
            user_id: "biz".to_string(),
            invoice_number: "INV-00007".to_string(),
            client_name: "Client".to_string(),
            client_email: "c@example.com".to_string(),
            currency: "ZAR".to_string(),
            status,
            issue_date: day,
            due_date: day,
            subtotal: dec!(1000),
            vat_total: dec!(150),
            total: dec!(1150),
            amount_due: if paid { dec!(0) } else { dec!(1150) },
            amount_paid: if paid { dec!(1150) } else { dec!(0) },
            paid_date: paid.then_some(now),
            notes: None,
            share_token: "tok".to_string(),
            recurring_invoice_id: None,
            last_reminder_at: None,
            reminder_count: 0,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    #[test]
    fn draft_can_be_paid_directly() {
        let plan = plan_transition(&invoice(Draft), Paid, TransitionMode::Standard).unwrap();
        assert_eq!(plan, TransitionPlan::RecordPayment { amount: dec!(1150) });
    }

    #[test]
    fn cancelled_cannot_be_paid_without_override() {
        let err = plan_transition(&invoice(Cancelled), Paid, TransitionMode::Standard).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let plan =
            plan_transition(&invoice(Cancelled), Paid, TransitionMode::AdminOverride).unwrap();
        assert!(matches!(plan, TransitionPlan::RecordPayment { .. }));
    }

    #[test]
    fn override_does_not_open_other_moves() {
        assert!(plan_transition(&invoice(Refunded), Draft, TransitionMode::AdminOverride).is_err());
        assert!(plan_transition(&invoice(Paid), Sent, TransitionMode::AdminOverride).is_err());
    }

    #[test]
    fn refunded_is_terminal() {
        for target in [Draft, Sent, Paid, Overdue, Cancelled] {
            assert!(plan_transition(&invoice(Refunded), target, TransitionMode::Standard).is_err());
        }
    }

    #[test]
    fn paid_to_cancelled_reverses_amount_paid() {
        let plan = plan_transition(&invoice(Paid), Cancelled, TransitionMode::Standard).unwrap();
        assert_eq!(
            plan,
            TransitionPlan::ReversePayment {
                amount: dec!(1150),
                target: Cancelled
            }
        );
        let mut inv = invoice(Paid);
        inv.apply_plan(&plan, Utc::now().naive_utc());
        assert_eq!(inv.status, Cancelled);
        assert_eq!(inv.amount_paid, dec!(0));
        assert_eq!(inv.amount_due, dec!(1150));
        assert!(inv.paid_date.is_none());
    }

    #[test]
    fn back_to_draft_resets_amounts() {
        let plan = plan_transition(&invoice(Sent), Draft, TransitionMode::Standard).unwrap();
        assert_eq!(
            plan,
            TransitionPlan::StatusOnly {
                target: Draft,
                reset_amounts: true
            }
        );
        let overdue = plan_transition(&invoice(Sent), Overdue, TransitionMode::Standard).unwrap();
        assert_eq!(
            overdue,
            TransitionPlan::StatusOnly {
                target: Overdue,
                reset_amounts: false
            }
        );
    }

    #[test]
    fn payment_sets_paid_fields() {
        let mut inv = invoice(Sent);
        let now = Utc::now().naive_utc();
        let plan = plan_transition(&inv, Paid, TransitionMode::Standard).unwrap();
        inv.apply_plan(&plan, now);
        assert_eq!(inv.status, Paid);
        assert_eq!(inv.amount_due, dec!(0));
        assert_eq!(inv.amount_paid, dec!(1150));
        assert_eq!(inv.paid_date, Some(now));
    }
}

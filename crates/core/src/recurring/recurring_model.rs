use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::invoices::{ComputedLine, InvoiceDraft, InvoiceLine, InvoiceTotals};
use crate::utils::time_utils::{add_days, add_months};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

crate::text_enum!(Frequency {
    Weekly => "WEEKLY",
    Monthly => "MONTHLY",
    Quarterly => "QUARTERLY",
    Yearly => "YEARLY",
});

impl Frequency {
    fn months(&self) -> Option<u32> {
        match self {
            Frequency::Weekly => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Yearly => Some(12),
        }
    }

    /// The first run date of the schedule anchored at `anchor` that falls
    /// after `date`.
    ///
    /// Month-based runs are counted from the anchor, so a schedule starting on
    /// the 31st clamps in short months and returns to the 31st afterwards.
    pub fn advance(&self, anchor: NaiveDate, date: NaiveDate) -> NaiveDate {
        let Some(step) = self.months() else {
            return add_days(date, 7);
        };
        let elapsed = (date.year() - anchor.year()) * 12 + date.month() as i32
            - anchor.month() as i32;
        let mut periods = (elapsed.max(0) as u32) / step;
        loop {
            let candidate = add_months(anchor, periods * step);
            if candidate > date || candidate == NaiveDate::MAX {
                return candidate;
            }
            periods += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringInvoice {
    pub id: String,
    pub user_id: String,
    pub client_name: String,
    pub client_email: String,
    pub currency: String,
    pub items: Vec<InvoiceLine>,
    pub notes: Option<String>,
    pub frequency: Frequency,
    /// Anchor of the schedule.
    pub start_date: NaiveDate,
    pub next_run_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub days_until_due: i32,
    pub is_active: bool,
    pub auto_send: bool,
    pub last_generated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurringInvoice {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.is_active && self.next_run_date <= today && !self.is_past_end(self.next_run_date)
    }

    pub fn is_past_end(&self, run_date: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| run_date > end)
    }

    /// The run date following `run_date` on this template's schedule.
    pub fn run_after(&self, run_date: NaiveDate) -> NaiveDate {
        self.frequency.advance(self.start_date, run_date)
    }

    /// The invoice this template produces for `run_date`.
    pub fn build_draft(&self, run_date: NaiveDate) -> InvoiceDraft {
        InvoiceDraft {
            client_name: self.client_name.clone(),
            client_email: self.client_email.clone(),
            currency: Some(self.currency.clone()),
            issue_date: run_date,
            due_date: add_days(run_date, i64::from(self.days_until_due)),
            notes: self.notes.clone(),
            items: self.items.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurringInvoice {
    pub client_name: String,
    pub client_email: String,
    pub currency: Option<String>,
    pub items: Vec<InvoiceLine>,
    pub notes: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_days_until_due")]
    pub days_until_due: i32,
    #[serde(default)]
    pub auto_send: bool,
}

fn default_days_until_due() -> i32 {
    30
}

impl NewRecurringInvoice {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::invalid_input(
                "A recurring invoice needs at least one item",
            ));
        }
        if !(0..=365).contains(&self.days_until_due) {
            return Err(Error::invalid_input(
                "Days until due must be between 0 and 365",
            ));
        }
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err(Error::invalid_input(
                "End date cannot be before the start date",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringInvoiceUpdate {
    #[serde(flatten)]
    pub template: NewRecurringInvoice,
    pub is_active: bool,
}

/// Everything the repository writes for one generated occurrence.
#[derive(Debug, Clone)]
pub struct GeneratedOccurrence {
    pub template_id: String,
    /// `next_run_date` as read; the write is skipped if it has since changed.
    pub expected_run_date: NaiveDate,
    pub next_run_date: NaiveDate,
    /// Deactivate the template after this occurrence.
    pub deactivate: bool,
    pub draft: InvoiceDraft,
    pub lines: Vec<ComputedLine>,
    pub totals: InvoiceTotals,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRunSummary {
    pub generated: usize,
    pub sent: usize,
    pub deactivated: usize,
    /// Occurrences another run generated first.
    pub skipped: usize,
    pub failures: usize,
}

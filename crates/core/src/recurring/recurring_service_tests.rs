#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use crate::invoices::{InvoiceLine, InvoiceService, InvoiceStatus};
    use crate::recurring::{
        Frequency, NewRecurringInvoice, RecurringInvoice, RecurringInvoiceService,
        RecurringInvoiceServiceTrait, RecurringInvoiceUpdate, RecurringRunSummary,
    };
    use crate::testing::{
        recurring_template, user, MockInvoiceRepository, MockRecurringRepository,
        MockUserRepository, RecordingEmailSender,
    };
    use crate::users::{KycStatus, UserRole};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        service: RecurringInvoiceService,
        templates: Arc<MockRecurringRepository>,
        invoices: Arc<MockInvoiceRepository>,
        email: Arc<RecordingEmailSender>,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 12:00 on 10 April 2024 in Johannesburg.
    fn run_at() -> NaiveDateTime {
        date(2024, 4, 10).and_hms_opt(10, 0, 0).unwrap()
    }

    fn fixture(email_fails: bool) -> Fixture {
        let mut business = user("biz", UserRole::Business, KycStatus::Approved);
        business.vat_number = Some("4123456789".to_string());
        let investor = user("investor", UserRole::Investor, KycStatus::Approved);
        let users = Arc::new(MockUserRepository::with_users(vec![business, investor]));
        let invoices = Arc::new(MockInvoiceRepository::default());
        let email = Arc::new(RecordingEmailSender {
            fail: email_fails,
            ..Default::default()
        });
        let invoice_service = InvoiceService::new(
            invoices.clone(),
            users.clone(),
            email.clone(),
            "https://app.vuka.co.za".to_string(),
        );
        let templates = Arc::new(MockRecurringRepository::new(invoices.clone()));
        let service =
            RecurringInvoiceService::new(templates.clone(), users, Arc::new(invoice_service));
        Fixture {
            service,
            templates,
            invoices,
            email,
        }
    }

    fn monthly(id: &str, start: NaiveDate) -> RecurringInvoice {
        recurring_template(id, "biz", Frequency::Monthly, start)
    }

    fn issue_dates(fx: &Fixture) -> Vec<NaiveDate> {
        fx.invoices
            .invoices
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.issue_date)
            .collect()
    }

    #[tokio::test]
    async fn run_catches_up_every_missed_period() {
        let fx = fixture(false);
        fx.templates.insert(monthly("rec-1", date(2024, 1, 31)));

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 3);
        assert_eq!(summary.failures, 0);
        assert_eq!(
            issue_dates(&fx),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]
        );

        let invoices = fx.invoices.invoices.lock().unwrap().clone();
        assert!(invoices.iter().all(|i| i.status == InvoiceStatus::Draft));
        assert!(invoices.iter().all(|i| i.total == dec!(2300)));
        assert!(invoices
            .iter()
            .all(|i| i.recurring_invoice_id.as_deref() == Some("rec-1")));

        let template = fx.templates.find("rec-1").unwrap();
        assert_eq!(template.next_run_date, date(2024, 4, 30));
        assert!(template.is_active);

        let again = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(again, RecurringRunSummary::default());
    }

    #[tokio::test]
    async fn catch_up_is_capped_per_run() {
        let fx = fixture(false);
        fx.templates.insert(monthly("rec-1", date(2022, 1, 1)));

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 12);
        assert_eq!(
            fx.templates.find("rec-1").unwrap().next_run_date,
            date(2023, 1, 1)
        );
    }

    #[tokio::test]
    async fn template_deactivates_after_its_last_occurrence() {
        let fx = fixture(false);
        let mut template = monthly("rec-1", date(2024, 1, 15));
        template.end_date = Some(date(2024, 2, 20));
        fx.templates.insert(template);

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 2);
        assert_eq!(summary.deactivated, 1);
        assert_eq!(issue_dates(&fx), vec![date(2024, 1, 15), date(2024, 2, 15)]);

        let stored = fx.templates.find("rec-1").unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.next_run_date, date(2024, 3, 15));
    }

    #[tokio::test]
    async fn template_past_its_end_date_deactivates_without_generating() {
        let fx = fixture(false);
        let mut template = monthly("rec-1", date(2024, 1, 15));
        template.next_run_date = date(2024, 3, 15);
        template.end_date = Some(date(2024, 3, 1));
        fx.templates.insert(template);

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.deactivated, 1);
        assert!(issue_dates(&fx).is_empty());
        assert!(!fx.templates.find("rec-1").unwrap().is_active);
    }

    #[tokio::test]
    async fn auto_send_emails_generated_invoices() {
        let fx = fixture(false);
        let mut template = monthly("rec-1", date(2024, 4, 1));
        template.auto_send = true;
        fx.templates.insert(template);

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.sent, 1);

        let sent = fx.email.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "thandi@example.com");
        let invoice = fx.invoices.invoices.lock().unwrap()[0].clone();
        assert_eq!(invoice.status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn failed_auto_send_keeps_the_generated_draft() {
        let fx = fixture(true);
        let mut template = monthly("rec-1", date(2024, 4, 1));
        template.auto_send = true;
        fx.templates.insert(template);

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failures, 1);

        let invoice = fx.invoices.invoices.lock().unwrap()[0].clone();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(
            fx.templates.find("rec-1").unwrap().next_run_date,
            date(2024, 5, 1)
        );
    }

    #[tokio::test]
    async fn one_broken_template_does_not_stop_the_run() {
        let fx = fixture(false);
        fx.templates.insert(recurring_template(
            "rec-ghost",
            "deleted-user",
            Frequency::Weekly,
            date(2024, 4, 8),
        ));
        fx.templates.insert(monthly("rec-1", date(2024, 4, 1)));

        let summary = fx.service.run_due(run_at()).await.unwrap();
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.generated, 1);
    }

    fn new_template(start: NaiveDate) -> NewRecurringInvoice {
        NewRecurringInvoice {
            client_name: "Thandi Nkosi".to_string(),
            client_email: "thandi@example.com".to_string(),
            currency: Some("zar".to_string()),
            items: vec![InvoiceLine {
                description: "Monthly bookkeeping".to_string(),
                quantity: dec!(1),
                unit_price: dec!(2000),
                vat_rate: None,
            }],
            notes: None,
            frequency: Frequency::Monthly,
            start_date: start,
            end_date: None,
            days_until_due: 14,
            auto_send: false,
        }
    }

    #[tokio::test]
    async fn only_the_owning_business_manages_templates() {
        let fx = fixture(false);

        let err = fx
            .service
            .create_template("investor", new_template(date(2024, 5, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let created = fx
            .service
            .create_template("biz", new_template(date(2024, 5, 1)))
            .await
            .unwrap();
        assert_eq!(created.currency, "ZAR");
        assert_eq!(created.next_run_date, date(2024, 5, 1));

        fx.templates.insert(recurring_template(
            "rec-other",
            "other-biz",
            Frequency::Monthly,
            date(2024, 5, 1),
        ));
        let update = RecurringInvoiceUpdate {
            template: new_template(date(2024, 6, 1)),
            is_active: true,
        };
        let err = fx
            .service
            .update_template("biz", "rec-other", update)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = fx
            .service
            .delete_template("biz", "rec-other")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(fx.templates.find("rec-other").is_some());

        let mut invalid = new_template(date(2024, 5, 1));
        invalid.end_date = Some(date(2024, 4, 1));
        let err = fx.service.create_template("biz", invalid).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

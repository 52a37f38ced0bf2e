#[cfg(test)]
mod tests {
    use crate::deals::DealStatus;
    use crate::errors::{Error, IntegrationError};
    use crate::revenue::{
        NewRevenueReport, OAuthTokens, RevenueProvider, RevenueService, RevenueServiceTrait,
        RevenueSource, VerificationStatus, VerificationSummary,
    };
    use crate::testing::{
        connection, deal, report, MockDealRepository, MockRevenueRepository, MockRevenueSource,
        PrefixCipher,
    };
    use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        service: RevenueService,
        reports: Arc<MockRevenueRepository>,
        source: Arc<MockRevenueSource>,
    }

    fn run_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
    }

    fn fixture(source: MockRevenueSource) -> Fixture {
        let deals = Arc::new(MockDealRepository::with_deals(vec![
            deal("deal-1", "biz", DealStatus::Funded, dec!(100000)),
            deal("deal-2", "unlinked", DealStatus::Funded, dec!(50000)),
            deal("deal-3", "biz", DealStatus::Active, dec!(80000)),
        ]));
        let reports = Arc::new(MockRevenueRepository::default());
        reports.connections.lock().unwrap().push(connection(
            "conn-1",
            "biz",
            RevenueProvider::BankFeed,
            "enc:bank-token",
            Some(run_at() + Duration::days(30)),
        ));
        let source = Arc::new(source);
        let service = RevenueService::new(
            reports.clone(),
            deals,
            vec![source.clone() as Arc<dyn RevenueSource>],
            None,
            Arc::new(PrefixCipher),
        );
        Fixture {
            service,
            reports,
            source,
        }
    }

    #[tokio::test]
    async fn verification_applies_the_five_percent_tolerance() {
        let fx = fixture(
            MockRevenueSource::new(RevenueProvider::BankFeed)
                .with_revenue("2024-01", dec!(95000))
                .with_revenue("2024-02", dec!(94999.99)),
        );
        {
            let mut reports = fx.reports.reports.lock().unwrap();
            reports.push(report("rep-1", "deal-1", "2024-01", dec!(100000)));
            reports.push(report("rep-2", "deal-1", "2024-02", dec!(100000)));
        }

        let summary = fx.service.verify_pending(run_at()).await.unwrap();
        assert_eq!(
            summary,
            VerificationSummary {
                verified: 1,
                discrepancies: 1,
                skipped: 0,
                failures: 0,
            }
        );

        let within = fx.reports.report("rep-1").unwrap();
        assert_eq!(within.verification_status, VerificationStatus::Verified);
        assert_eq!(within.verified_revenue, Some(dec!(95000)));
        let outside = fx.reports.report("rep-2").unwrap();
        assert_eq!(outside.verification_status, VerificationStatus::Discrepancy);
        assert_eq!(outside.verified_revenue, Some(dec!(94999.99)));

        // Tokens reach the source decrypted.
        assert_eq!(
            *fx.source.seen_tokens.lock().unwrap(),
            vec!["bank-token".to_string(), "bank-token".to_string()]
        );
        let synced = fx.reports.connection("conn-1").unwrap();
        assert_eq!(synced.last_synced_at, Some(run_at()));

        let again = fx.service.verify_pending(run_at()).await.unwrap();
        assert_eq!(again, VerificationSummary::default());
    }

    #[tokio::test]
    async fn failed_provider_call_leaves_report_unverified() {
        let fx = fixture(
            MockRevenueSource::new(RevenueProvider::BankFeed).with_revenue("2024-01", dec!(1000)),
        );
        {
            let mut reports = fx.reports.reports.lock().unwrap();
            reports.push(report("rep-1", "deal-1", "2024-01", dec!(1000)));
            reports.push(report("rep-2", "deal-1", "2024-03", dec!(1000)));
            reports.push(report("rep-3", "deal-2", "2024-01", dec!(500)));
        }

        let summary = fx.service.verify_pending(run_at()).await.unwrap();
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.skipped, 1);

        let failed = fx.reports.report("rep-2").unwrap();
        assert_eq!(failed.verification_status, VerificationStatus::Unverified);
        assert_eq!(failed.verified_revenue, None);
        let unlinked = fx.reports.report("rep-3").unwrap();
        assert_eq!(unlinked.verification_status, VerificationStatus::Unverified);
    }

    #[tokio::test]
    async fn report_is_skipped_when_no_source_serves_the_connection() {
        let fx = fixture(MockRevenueSource::new(RevenueProvider::Xero));
        fx.reports
            .reports
            .lock()
            .unwrap()
            .push(report("rep-1", "deal-1", "2024-01", dec!(1000)));

        let summary = fx.service.verify_pending(run_at()).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(fx.source.seen_tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_tokens_are_refreshed_and_stored_encrypted() {
        let new_expiry = run_at() + Duration::minutes(30);
        let fx = fixture(
            MockRevenueSource::new(RevenueProvider::BankFeed)
                .with_revenue("2024-04", dec!(20000))
                .with_refresh(OAuthTokens {
                    access_token: "fresh-token".to_string(),
                    refresh_token: Some("fresh-refresh".to_string()),
                    expires_at: Some(new_expiry),
                    tenant_id: None,
                }),
        );
        fx.reports.connections.lock().unwrap()[0].token_expires_at =
            Some(run_at() - Duration::minutes(1));
        fx.reports
            .reports
            .lock()
            .unwrap()
            .push(report("rep-1", "deal-1", "2024-04", dec!(20500)));

        let summary = fx.service.verify_pending(run_at()).await.unwrap();
        assert_eq!(summary.verified, 1);

        assert_eq!(
            *fx.source.seen_tokens.lock().unwrap(),
            vec!["fresh-token".to_string()]
        );
        let stored = fx.reports.connection("conn-1").unwrap();
        assert_eq!(stored.access_token, "enc:fresh-token");
        assert_eq!(stored.refresh_token.as_deref(), Some("enc:fresh-refresh"));
        assert_eq!(stored.token_expires_at, Some(new_expiry));
    }

    #[tokio::test]
    async fn submit_report_checks_ownership_state_and_period() {
        let fx = fixture(MockRevenueSource::new(RevenueProvider::BankFeed));
        let new_report = |deal_id: &str, period: &str| NewRevenueReport {
            deal_id: deal_id.to_string(),
            period: period.to_string(),
            reported_revenue: dec!(12345.678),
        };

        let stored = fx
            .service
            .submit_report("biz", new_report("deal-1", " 2024-01 "))
            .await
            .unwrap();
        assert_eq!(stored.period, "2024-01");
        assert_eq!(stored.reported_revenue, dec!(12345.68));
        assert_eq!(stored.verification_status, VerificationStatus::Unverified);

        let duplicate = fx
            .service
            .submit_report("biz", new_report("deal-1", "2024-01"))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, Error::Conflict(_)));

        let foreign = fx
            .service
            .submit_report("biz", new_report("deal-2", "2024-01"))
            .await
            .unwrap_err();
        assert!(matches!(foreign, Error::Forbidden(_)));

        let not_funded = fx
            .service
            .submit_report("biz", new_report("deal-3", "2024-01"))
            .await
            .unwrap_err();
        assert!(matches!(not_funded, Error::Conflict(_)));

        let next_year = (Utc::now().date_naive() + Duration::days(400))
            .format("%Y-%m")
            .to_string();
        let future = fx
            .service
            .submit_report("biz", new_report("deal-1", next_year.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(future, Error::Validation(_)));
    }

    #[tokio::test]
    async fn xero_flow_requires_configuration_and_matching_state() {
        let fx = fixture(MockRevenueSource::new(RevenueProvider::BankFeed));

        let err = fx.service.xero_authorize("biz").unwrap_err();
        assert!(matches!(
            err,
            Error::Integration(IntegrationError::NotConfigured(_))
        ));

        let err = fx
            .service
            .xero_callback("biz", "code", "someone-else:abc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}

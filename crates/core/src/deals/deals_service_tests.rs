#[cfg(test)]
mod tests {
    use crate::deals::{DealService, DealServiceTrait, DealStatus, InvestmentRequest, NewDeal};
    use crate::errors::Error;
    use crate::testing::{deal, user, MockDealRepository, MockUserRepository};
    use crate::users::{KycStatus, UserRole};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        service: DealService,
        deals: Arc<MockDealRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MockUserRepository::with_users(vec![
            user("biz", UserRole::Business, KycStatus::Approved),
            user("biz-pending", UserRole::Business, KycStatus::Pending),
            user("other-biz", UserRole::Business, KycStatus::Approved),
            user("investor", UserRole::Investor, KycStatus::Approved),
            user("investor-new", UserRole::Investor, KycStatus::NotSubmitted),
        ]));
        let deals = Arc::new(MockDealRepository::with_deals(vec![
            deal("draft", "biz", DealStatus::Draft, dec!(100000)),
            deal("open", "biz", DealStatus::Active, dec!(10000)),
            deal("funded", "biz", DealStatus::Funded, dec!(50000)),
        ]));
        let service = DealService::new(deals.clone(), users);
        Fixture { service, deals }
    }

    fn new_deal() -> NewDeal {
        NewDeal {
            title: "Second delivery van".to_string(),
            description: "Expanding deliveries to Soweto".to_string(),
            funding_goal: dec!(250000.004),
            min_investment: dec!(500),
            revenue_share_percentage: dec!(8),
            repayment_multiple: dec!(1.4),
            closes_at: None,
        }
    }

    fn invest(amount: Decimal) -> InvestmentRequest {
        InvestmentRequest { amount }
    }

    #[tokio::test]
    async fn only_kyc_approved_businesses_create_deals() {
        let fx = fixture();

        let err = fx.service.create_deal("investor", new_deal()).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = fx
            .service
            .create_deal("biz-pending", new_deal())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let mut invalid = new_deal();
        invalid.revenue_share_percentage = Decimal::ZERO;
        let err = fx.service.create_deal("biz", invalid).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let created = fx.service.create_deal("biz", new_deal()).await.unwrap();
        assert_eq!(created.status, DealStatus::Draft);
        assert_eq!(created.funding_goal, dec!(250000.00));
        assert_eq!(created.business_id, "biz");
    }

    #[tokio::test]
    async fn publish_moves_own_draft_to_active_once() {
        let fx = fixture();

        let err = fx
            .service
            .publish_deal("other-biz", "draft")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let published = fx.service.publish_deal("biz", "draft").await.unwrap();
        assert_eq!(published.status, DealStatus::Active);

        let err = fx.service.publish_deal("biz", "draft").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn invest_requires_an_approved_investor() {
        let fx = fixture();

        let err = fx
            .service
            .invest("biz", "open", invest(dec!(2000)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = fx
            .service
            .invest("investor-new", "open", invest(dec!(2000)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(fx.deals.investments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invest_checks_the_deal_before_writing() {
        let fx = fixture();

        let err = fx
            .service
            .invest("investor", "draft", invest(dec!(2000)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = fx
            .service
            .invest("investor", "open", invest(dec!(999)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = fx
            .service
            .invest("investor", "open", invest(dec!(10000.01)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(fx.deals.investments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn investing_the_remaining_goal_funds_the_deal() {
        let fx = fixture();

        let first = fx
            .service
            .invest("investor", "open", invest(dec!(9500)))
            .await
            .unwrap();
        assert_eq!(first.deal.status, DealStatus::Active);
        assert_eq!(first.deal.remaining_goal(), dec!(500));

        // The remainder may be below the minimum investment.
        let last = fx
            .service
            .invest("investor", "open", invest(dec!(500)))
            .await
            .unwrap();
        assert_eq!(last.deal.status, DealStatus::Funded);
        assert!(last.deal.funded_at.is_some());
        assert_eq!(fx.service.list_investments("investor").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancel_only_applies_to_draft_or_active_deals() {
        let fx = fixture();

        let err = fx.service.cancel_deal("biz", "funded").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        let err = fx.service.cancel_deal("other-biz", "open").await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let cancelled = fx.service.cancel_deal("biz", "open").await.unwrap();
        assert_eq!(cancelled.status, DealStatus::Cancelled);
    }

    #[tokio::test]
    async fn listings_default_to_open_deals_and_hide_other_investments() {
        let fx = fixture();

        let open = fx.service.list_deals(None).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "open");
        assert_eq!(fx.service.list_business_deals("biz").unwrap().len(), 3);

        let err = fx
            .service
            .list_deal_investments("other-biz", "open")
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(fx
            .service
            .list_deal_investments("biz", "open")
            .unwrap()
            .is_empty());
    }
}

//! Revenue-share arithmetic: payouts, investor shares and pro-rata splits.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::revenue_model::{DistributionPlan, PayoutAllocation};
use crate::constants::SHARE_DECIMAL_PLACES;
use crate::deals::{Deal, Investment};
use crate::errors::{Error, Result};
use crate::utils::money::{percent_of, round_money};

/// `revenue × percentage / 100` in cents, capped at what is left to repay.
pub fn compute_payout(revenue: Decimal, percentage: Decimal, remaining_repayment: Decimal) -> Decimal {
    if revenue <= Decimal::ZERO || remaining_repayment <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    percent_of(revenue, percentage).min(round_money(remaining_repayment))
}

/// Each holder's percent of the total, keyed like the input.
pub fn compute_share_percentages(amounts: &[(String, Decimal)]) -> Vec<(String, Decimal)> {
    let total: Decimal = amounts.iter().map(|(_, amount)| *amount).sum();
    amounts
        .iter()
        .map(|(key, amount)| {
            let share = if total.is_zero() {
                Decimal::ZERO
            } else {
                (*amount / total * dec!(100)).round_dp_with_strategy(
                    SHARE_DECIMAL_PLACES,
                    RoundingStrategy::MidpointNearestEven,
                )
            };
            (key.clone(), share)
        })
        .collect()
}

/// Splits `payout` by share percentage, rounded down to cents.
///
/// Leftover cents go to the largest holder (first one on ties), so the parts
/// always sum to `payout`.
pub fn split_payout(payout: Decimal, shares: &[(String, Decimal)]) -> Vec<(String, Decimal)> {
    if shares.is_empty() {
        return Vec::new();
    }
    let total_share: Decimal = shares.iter().map(|(_, share)| *share).sum();
    let mut parts: Vec<(String, Decimal)> = shares
        .iter()
        .map(|(key, share)| {
            let part = if total_share.is_zero() {
                Decimal::ZERO
            } else {
                (payout * *share / total_share)
                    .round_dp_with_strategy(2, RoundingStrategy::ToZero)
            };
            (key.clone(), part)
        })
        .collect();

    let allocated: Decimal = parts.iter().map(|(_, part)| *part).sum();
    let remainder = payout - allocated;
    if !remainder.is_zero() {
        let mut largest = 0;
        for (index, (_, share)) in shares.iter().enumerate() {
            if *share > shares[largest].1 {
                largest = index;
            }
        }
        parts[largest].1 += remainder;
    }
    parts
}

/// True when `verified` is within `tolerance_percent` of `reported`.
pub fn within_tolerance(reported: Decimal, verified: Decimal, tolerance_percent: Decimal) -> bool {
    let difference = (reported - verified).abs();
    if reported.is_zero() {
        return difference.is_zero();
    }
    difference * dec!(100) <= reported.abs() * tolerance_percent
}

/// Works out who receives what from one month's revenue.
pub fn plan_distribution(
    deal: &Deal,
    investments: &[Investment],
    revenue: Decimal,
) -> Result<DistributionPlan> {
    if investments.is_empty() {
        return Err(Error::Conflict(format!(
            "Deal '{}' has no investors",
            deal.title
        )));
    }
    let remaining = deal.remaining_repayment();
    let payout = compute_payout(revenue, deal.revenue_share_percentage, remaining);
    if payout.is_zero() {
        return Err(Error::invalid_input(format!(
            "Nothing to distribute for deal '{}'",
            deal.title
        )));
    }

    let shares: Vec<(String, Decimal)> = investments
        .iter()
        .map(|i| (i.id.clone(), i.share_percentage))
        .collect();
    let allocations = split_payout(payout, &shares)
        .into_iter()
        .zip(investments)
        .map(|((investment_id, amount), investment)| PayoutAllocation {
            investment_id,
            investor_id: investment.investor_id.clone(),
            amount,
        })
        .collect();

    Ok(DistributionPlan {
        payout,
        allocations,
        completes_deal: payout >= remaining,
    })
}

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::errors::{Error, Result};
use crate::fx::fx_model::{ConvertedAmount, ExchangeRate};
use crate::utils::money::round_money;

/// Converts amounts across a graph of stored rates.
///
/// Each stored pair also yields its inverse, and currencies without a direct
/// rate are reached through the shortest chain of known pairs.
pub struct CurrencyConverter {
    adj: HashMap<String, HashSet<String>>,
    rates: HashMap<(String, String), Decimal>,
}

impl CurrencyConverter {
    pub fn new(exchange_rates: Vec<ExchangeRate>) -> Self {
        let mut converter = CurrencyConverter {
            adj: HashMap::new(),
            rates: HashMap::new(),
        };
        for rate in exchange_rates {
            converter.add_rate(&rate);
        }
        converter
    }

    fn add_rate(&mut self, rate: &ExchangeRate) {
        if rate.from_currency == rate.to_currency || rate.rate.is_zero() {
            return;
        }
        let from = rate.from_currency.clone();
        let to = rate.to_currency.clone();

        self.rates.insert((from.clone(), to.clone()), rate.rate);
        self.adj.entry(from.clone()).or_default().insert(to.clone());

        // A directly stored rate wins over the inverse of the opposite pair.
        self.rates
            .entry((to.clone(), from.clone()))
            .or_insert(Decimal::ONE / rate.rate);
        self.adj.entry(to).or_default().insert(from);
    }

    /// Rate to multiply an amount in `from_currency` by to get `to_currency`.
    pub fn get_rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal> {
        if from_currency == to_currency {
            return Ok(Decimal::ONE);
        }

        // BFS State: (Current Currency, Accumulated Rate)
        let mut queue: VecDeque<(String, Decimal)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back((from_currency.to_string(), Decimal::ONE));
        visited.insert(from_currency.to_string());

        while let Some((current, accumulated)) = queue.pop_front() {
            if current == to_currency {
                return Ok(accumulated);
            }
            let Some(neighbors) = self.adj.get(&current) else {
                continue;
            };
            for neighbor in neighbors {
                if visited.contains(neighbor) {
                    continue;
                }
                if let Some(rate) = self.rates.get(&(current.clone(), neighbor.clone())) {
                    visited.insert(neighbor.clone());
                    queue.push_back((neighbor.clone(), accumulated * rate));
                }
            }
        }

        Err(Error::CurrencyConversionFailed(format!(
            "No exchange rate path from {} to {}",
            from_currency, to_currency
        )))
    }

    /// Converts and rounds to cents.
    pub fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConvertedAmount> {
        if from_currency == to_currency {
            return Ok(ConvertedAmount::same_currency(amount, to_currency));
        }
        let rate = self.get_rate(from_currency, to_currency)?;
        Ok(ConvertedAmount {
            amount: round_money(amount * rate),
            currency: to_currency.to_string(),
            original_amount: amount,
            original_currency: from_currency.to_string(),
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn make_rate(from: &str, to: &str, rate: Decimal) -> ExchangeRate {
        ExchangeRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate,
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn converts_with_direct_rate() {
        let converter = CurrencyConverter::new(vec![make_rate("USD", "ZAR", dec!(18.50))]);
        let converted = converter.convert(dec!(100), "USD", "ZAR").unwrap();
        assert_eq!(converted.amount, dec!(1850.00));
        assert_eq!(converted.original_currency, "USD");
        assert!(converted.is_conversion());
    }

    #[test]
    fn uses_inverse_when_only_opposite_pair_is_stored() {
        let converter = CurrencyConverter::new(vec![make_rate("ZAR", "USD", dec!(0.05))]);
        let converted = converter.convert(dec!(10), "USD", "ZAR").unwrap();
        assert_eq!(converted.amount, dec!(200.00));
    }

    #[test]
    fn chains_through_intermediate_currency() {
        let converter = CurrencyConverter::new(vec![
            make_rate("EUR", "USD", dec!(1.10)),
            make_rate("USD", "ZAR", dec!(18)),
        ]);
        let rate = converter.get_rate("EUR", "ZAR").unwrap();
        assert_eq!(rate, dec!(19.80));
    }

    #[test]
    fn missing_path_is_an_error() {
        let converter = CurrencyConverter::new(vec![make_rate("USD", "ZAR", dec!(18))]);
        assert!(matches!(
            converter.convert(dec!(1), "GBP", "ZAR"),
            Err(Error::CurrencyConversionFailed(_))
        ));
    }

    #[test]
    fn same_currency_is_identity() {
        let converter = CurrencyConverter::new(Vec::new());
        let converted = converter.convert(dec!(12.34), "ZAR", "ZAR").unwrap();
        assert_eq!(converted.amount, dec!(12.34));
        assert!(!converted.is_conversion());
    }
}

//! Deterministic order pricing.
//!
//! Pricing is a pure function of the validated line items, the destination
//! region, and a [`PricingConfig`]. Given identical inputs it always
//! produces an identical [`PriceBreakdown`], which is what makes the stored
//! totals reproducible in audits and tests.

use crate::errors::ValidationError;
use crate::order::OrderItem;
use crate::types::{Money, Region};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// The monetary breakdown of an order.
///
/// Invariant (enforced again by `Order::new`):
/// `total_amount == subtotal + tax_amount + shipping_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PriceBreakdown {
    /// Sum of line subtotals
    pub subtotal: Money,
    /// Tax on the subtotal, rounded to cents
    pub tax_amount: Money,
    /// Shipping charge
    pub shipping_amount: Money,
    /// Grand total
    pub total_amount: Money,
}

/// Tax and shipping configuration for the pricing calculator.
///
/// The default configuration carries the production rate table: CA 8.75%,
/// NY 8%, TX 6.25%, FL 6%, WA 6.5%, 5% elsewhere, with free shipping on
/// subtotals of $50.00 or more and a $9.99 flat rate below that.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    tax_rates: HashMap<Region, Decimal>,
    default_tax_rate: Decimal,
    free_shipping_threshold: Money,
    flat_shipping_rate: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut tax_rates = HashMap::new();
        for (code, rate) in [
            ("CA", dec!(0.0875)),
            ("NY", dec!(0.08)),
            ("TX", dec!(0.0625)),
            ("FL", dec!(0.06)),
            ("WA", dec!(0.065)),
        ] {
            let region = Region::try_new(code).expect("static region code is valid");
            tax_rates.insert(region, rate);
        }

        Self {
            tax_rates,
            default_tax_rate: dec!(0.05),
            free_shipping_threshold: Money::from_cents(5000)
                .expect("static threshold is valid money"),
            flat_shipping_rate: Money::from_cents(999).expect("static rate is valid money"),
        }
    }
}

impl PricingConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces the tax rate for a region.
    #[must_use]
    pub fn with_tax_rate(mut self, region: Region, rate: Decimal) -> Self {
        self.tax_rates.insert(region, rate);
        self
    }

    /// Sets the tax rate used when the destination has no table entry.
    #[must_use]
    pub fn with_default_tax_rate(mut self, rate: Decimal) -> Self {
        self.default_tax_rate = rate;
        self
    }

    /// Sets the subtotal at which shipping becomes free.
    #[must_use]
    pub fn with_free_shipping_threshold(mut self, threshold: Money) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }

    /// Sets the flat shipping rate charged below the threshold.
    #[must_use]
    pub fn with_flat_shipping_rate(mut self, rate: Money) -> Self {
        self.flat_shipping_rate = rate;
        self
    }

    fn rate_for(&self, destination: Option<&Region>) -> Decimal {
        destination
            .and_then(|region| self.tax_rates.get(region).copied())
            .unwrap_or(self.default_tax_rate)
    }
}

/// Computes order totals from validated line items.
#[derive(Debug, Clone, Default)]
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    /// Creates a calculator with the given configuration.
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Prices an order.
    ///
    /// `subtotal` is the sum of the line subtotals already frozen on the
    /// items. Tax is `subtotal × rate` rounded to cents, half away from
    /// zero. A destination of `None` or an unknown region uses the default
    /// rate.
    pub fn price(
        &self,
        items: &[OrderItem],
        destination: Option<&Region>,
    ) -> Result<PriceBreakdown, ValidationError> {
        let mut subtotal = Money::zero();
        for item in items {
            subtotal = subtotal.checked_add(item.line_subtotal)?;
        }

        let rate = self.config.rate_for(destination);
        let tax = (subtotal.amount() * rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let tax_amount = Money::new(tax)?;

        let shipping_amount = if subtotal >= self.config.free_shipping_threshold {
            Money::zero()
        } else {
            self.config.flat_shipping_rate
        };

        let total_amount = subtotal.checked_add(tax_amount)?.checked_add(shipping_amount)?;

        Ok(PriceBreakdown {
            subtotal,
            tax_amount,
            shipping_amount,
            total_amount,
        })
    }
}

//! Core domain types for the `OrderCore` engine.
//!
//! All types use smart constructors to ensure validity at construction time,
//! following the "parse, don't validate" principle. An instance existing is
//! proof that its invariants hold.

use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order identifier, doubling as the client-supplied idempotency key.
///
/// `OrderId` values are guaranteed to be non-empty and at most 64 characters.
/// Clients that retry a create-order request with the same `OrderId` are
/// guaranteed at-most-once commit semantics.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct OrderId(String);

impl OrderId {
    /// Generates a fresh order identifier with a UUIDv7-derived suffix.
    ///
    /// Format: `ORD-XXXXXXXX`. Callers that want idempotent retries should
    /// generate the id once and reuse it across attempts.
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7().simple().to_string().to_uppercase();
        Self::try_new(format!("ORD-{}", &uuid[..8])).expect("generated OrderId should be valid")
    }
}

/// A user identifier.
///
/// Guaranteed non-empty and at most 64 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct UserId(String);

/// A product identifier.
///
/// Guaranteed non-empty and at most 64 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(String);

impl ProductId {
    /// Generates a fresh product identifier with a UUIDv7-derived suffix.
    ///
    /// Format: `PRD-XXXXXXXX`.
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7().simple().to_string().to_uppercase();
        Self::try_new(format!("PRD-{}", &uuid[..8])).expect("generated ProductId should be valid")
    }
}

/// An order-line quantity.
///
/// Must be at least 1 and at most 1000 per line. Inventory levels are plain
/// `u32` values and may be zero; this type is only for requested quantities.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(u32);

impl Quantity {
    /// Returns the underlying count.
    pub fn value(self) -> u32 {
        self.into()
    }
}

/// A destination region code used for tax-rate selection.
///
/// Trimmed and uppercased on construction, at most 8 characters.
#[nutype(
    sanitize(trim, uppercase),
    validate(not_empty, len_char_max = 8),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct Region(String);

/// A carrier tracking number, required when an order ships.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TrackingNumber(String);

/// A page-size bound for order listing queries.
///
/// Clamped to 1..=100; defaults to 20 when the caller does not specify one.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 100),
    default = 20,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Default,
        Serialize,
        Deserialize
    )
)]
pub struct PageSize(u32);

impl PageSize {
    /// Returns the underlying page size.
    pub fn value(self) -> u32 {
        self.into()
    }
}

/// Error raised when a monetary amount fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MoneyError(pub String);

/// A monetary amount in dollars.
///
/// Uses `Decimal` for exact arithmetic. Amounts are non-negative, carry at
/// most 2 decimal places, and are capped at 100 million. All arithmetic is
/// checked so a `Money` value can never silently go negative or overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum representable amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Creates money from a decimal amount.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() {
            return Err(MoneyError(format!("amount cannot be negative: {amount}")));
        }
        if amount.scale() > 2 {
            return Err(MoneyError(format!(
                "amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(MoneyError(format!(
                "amount {amount} exceeds maximum {}",
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// Creates money from a cent count, avoiding floating-point issues.
    pub fn from_cents(cents: u64) -> Result<Self, MoneyError> {
        let cents = i64::try_from(cents)
            .map_err(|_| MoneyError(format!("cent amount {cents} is out of range")))?;
        Self::new(Decimal::new(cents, 2))
    }

    /// The zero amount.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal value.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Converts to whole cents.
    pub fn to_cents(&self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Adds two amounts, rejecting results above the cap.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }

    /// Subtracts an amount, rejecting results below zero.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        if other.0 > self.0 {
            return Err(MoneyError(format!(
                "cannot subtract {other} from smaller amount {self}"
            )));
        }
        Self::new(self.0 - other.0)
    }

    /// Multiplies a unit price by a line quantity.
    pub fn multiply_by_quantity(self, quantity: Quantity) -> Result<Self, MoneyError> {
        Self::new(self.0 * Decimal::from(quantity.value()))
    }

    /// True when the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount_str = trimmed
            .strip_prefix('$')
            .map_or(trimmed, |stripped| stripped);

        let decimal = amount_str
            .parse::<Decimal>()
            .map_err(|e| MoneyError(format!("failed to parse amount '{s}': {e}")))?;

        Self::new(decimal)
    }
}

/// A UTC timestamp.
///
/// This wrapper keeps timestamp handling consistent across the system and
/// gives pagination a stable, totally ordered sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn order_id_accepts_valid_strings(s in "[a-zA-Z0-9_-]{1,64}") {
            let result = OrderId::try_new(s.clone());
            prop_assert!(result.is_ok());
            let id = result.unwrap();
            prop_assert_eq!(id.as_ref(), &s);
        }

        #[test]
        fn order_id_trims_whitespace(s in " {0,5}[a-zA-Z0-9_-]{1,50} {0,5}") {
            let result = OrderId::try_new(s.clone());
            prop_assert!(result.is_ok());
            let id = result.unwrap();
            prop_assert_eq!(id.as_ref(), s.trim());
        }

        #[test]
        fn order_id_rejects_blank_strings(s in " {0,20}") {
            prop_assert!(OrderId::try_new(s).is_err());
        }

        #[test]
        fn order_id_rejects_strings_over_64_chars(s in "[a-zA-Z0-9]{65,120}") {
            prop_assert!(OrderId::try_new(s).is_err());
        }

        #[test]
        fn quantity_accepts_valid_range(q in 1u32..=1000) {
            let quantity = Quantity::try_new(q);
            prop_assert!(quantity.is_ok());
            prop_assert_eq!(quantity.unwrap().value(), q);
        }

        #[test]
        fn quantity_rejects_out_of_range(q in 1001u32..10_000) {
            prop_assert!(Quantity::try_new(q).is_err());
        }

        #[test]
        fn money_from_cents_roundtrip(cents in 0u64..1_000_000_000) {
            let money = Money::from_cents(cents).unwrap();
            prop_assert_eq!(money.to_cents(), cents);
        }

        #[test]
        fn money_addition_is_commutative(a in 0u64..100_000, b in 0u64..100_000) {
            let ma = Money::from_cents(a).unwrap();
            let mb = Money::from_cents(b).unwrap();
            prop_assert_eq!(ma.checked_add(mb).unwrap(), mb.checked_add(ma).unwrap());
        }

        #[test]
        fn money_roundtrip_serialization(cents in 0u64..1_000_000) {
            let money = Money::from_cents(cents).unwrap();
            let json = serde_json::to_string(&money).unwrap();
            let deserialized: Money = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(money, deserialized);
        }

        #[test]
        fn page_size_accepts_valid_range(n in 1u32..=100) {
            prop_assert!(PageSize::try_new(n).is_ok());
        }

        #[test]
        fn page_size_rejects_out_of_range(n in 101u32..1000) {
            prop_assert!(PageSize::try_new(n).is_err());
        }
    }

    #[test]
    fn order_id_generation_produces_valid_ids() {
        let id = OrderId::generate();
        assert!(id.as_ref().starts_with("ORD-"));
        assert_eq!(id.as_ref().len(), 12);
    }

    #[test]
    fn product_id_generation_produces_valid_ids() {
        let id = ProductId::generate();
        assert!(id.as_ref().starts_with("PRD-"));
        assert_eq!(id.as_ref().len(), 12);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn quantity_rejects_zero() {
        assert!(Quantity::try_new(0).is_err());
    }

    #[test]
    fn region_uppercases_and_trims() {
        let region = Region::try_new("  ca ").unwrap();
        assert_eq!(region.as_ref(), "CA");
    }

    #[test]
    fn region_rejects_blank() {
        assert!(Region::try_new("   ").is_err());
        assert!(Region::try_new("TOOLONGREGION").is_err());
    }

    #[test]
    fn page_size_defaults_to_twenty() {
        let size: u32 = PageSize::default().into();
        assert_eq!(size, 20);
    }

    #[test]
    fn money_validation_rejects_bad_amounts() {
        assert!(Money::new(Decimal::new(-100, 2)).is_err());
        assert!(Money::new(Decimal::new(1001, 3)).is_err());
        assert!(Money::new(Decimal::from(200_000_000)).is_err());
        assert!(Money::from_cents(1050).is_ok());
    }

    #[test]
    fn money_checked_arithmetic() {
        let one = Money::from_cents(100).unwrap();
        let two_fifty = Money::from_cents(250).unwrap();

        assert_eq!(one.checked_add(two_fifty).unwrap().to_cents(), 350);
        assert_eq!(two_fifty.checked_sub(one).unwrap().to_cents(), 150);
        assert!(one.checked_sub(two_fifty).is_err());

        let qty = Quantity::try_new(3).unwrap();
        assert_eq!(one.multiply_by_quantity(qty).unwrap().to_cents(), 300);
    }

    #[test]
    fn money_parses_with_optional_dollar_sign() {
        assert_eq!("$10.50".parse::<Money>().unwrap().to_cents(), 1050);
        assert_eq!("25.99".parse::<Money>().unwrap().to_cents(), 2599);
        assert!("invalid".parse::<Money>().is_err());
        assert!("-5.00".parse::<Money>().is_err());
    }

    #[test]
    fn money_displays_with_two_decimal_places() {
        let money = Money::from_cents(1050).unwrap();
        assert_eq!(money.to_string(), "$10.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn timestamp_now_is_current() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();
        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_ordering_matches_datetime_ordering() {
        let earlier = Timestamp::new(Utc::now());
        let later = Timestamp::new(Utc::now() + chrono::Duration::seconds(5));
        assert!(earlier < later);
    }
}

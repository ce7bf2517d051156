//! Discount codes and the pricing rules they resolve to.

use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Minor-unit precision of the shop currency.
const CURRENCY_DP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("malformed discount code `{0}`")]
    MalformedDiscountCode(String),

    #[error("quantity must be greater than 0, got {0}")]
    InvalidQuantity(i32),
}

/// Discount code stored on a catalog entry.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum DiscountCode {
    #[default]
    #[sea_orm(string_value = "NON")]
    #[serde(rename = "NON")]
    NoDiscount,
    #[sea_orm(string_value = "3F2")]
    #[serde(rename = "3F2")]
    ThreeForTwo,
    #[sea_orm(string_value = "2F1")]
    #[serde(rename = "2F1")]
    TwoForOne,
    #[sea_orm(string_value = "SEV")]
    #[serde(rename = "SEV")]
    SeventyPercent,
    #[sea_orm(string_value = "SIX")]
    #[serde(rename = "SIX")]
    SixtyPercent,
    #[sea_orm(string_value = "FIF")]
    #[serde(rename = "FIF")]
    FiftyPercent,
    #[sea_orm(string_value = "FOR")]
    #[serde(rename = "FOR")]
    FortyPercent,
    #[sea_orm(string_value = "THI")]
    #[serde(rename = "THI")]
    ThirtyPercent,
    #[sea_orm(string_value = "TWE")]
    #[serde(rename = "TWE")]
    TwentyPercent,
    #[sea_orm(string_value = "TEN")]
    #[serde(rename = "TEN")]
    TenPercent,
    #[sea_orm(string_value = "FIV")]
    #[serde(rename = "FIV")]
    FivePercent,
}

impl DiscountCode {
    /// Human-readable label; this is what [`resolve`] parses.
    pub fn label(&self) -> &'static str {
        match self {
            DiscountCode::NoDiscount => "no discount",
            DiscountCode::ThreeForTwo => "3 for 2",
            DiscountCode::TwoForOne => "2 for 1",
            DiscountCode::SeventyPercent => "70 %",
            DiscountCode::SixtyPercent => "60 %",
            DiscountCode::FiftyPercent => "50 %",
            DiscountCode::FortyPercent => "40 %",
            DiscountCode::ThirtyPercent => "30 %",
            DiscountCode::TwentyPercent => "20 %",
            DiscountCode::TenPercent => "10 %",
            DiscountCode::FivePercent => "5 %",
        }
    }

    pub fn rule(&self) -> Result<DiscountRule, PricingError> {
        resolve(self.label())
    }
}

/// Resolved meaning of a discount code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    NoDiscount,
    /// Every complete bundle of `bundle` units takes one unit's price off the line.
    PackageDeal { bundle: u32 },
    Percentage { percent: u32 },
}

impl DiscountRule {
    /// Unit price after the rule is applied.
    ///
    /// Package deals only discount at the line level, so they leave the unit
    /// price untouched.
    pub fn unit_price(&self, price: Decimal) -> Decimal {
        match *self {
            DiscountRule::Percentage { percent } => {
                let remaining = Decimal::from(100u32.saturating_sub(percent));
                (price * remaining / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
            }
            DiscountRule::PackageDeal { .. } | DiscountRule::NoDiscount => price,
        }
    }
}

/// Parses a discount label such as `"50 %"` or `"3 for 2"`.
///
/// A `%` anywhere in the label makes it a percentage, otherwise the substring
/// `for` makes it a package deal. In both cases the leading whitespace-separated
/// token carries the number. Anything else is treated as no discount.
///
/// # Errors
///
/// [`PricingError::MalformedDiscountCode`] when the leading token of a
/// percentage or package label is not a number in range.
pub fn resolve(label: &str) -> Result<DiscountRule, PricingError> {
    let malformed = || PricingError::MalformedDiscountCode(label.to_string());
    let leading = label.split_whitespace().next().unwrap_or_default();

    if label.contains('%') {
        let percent = leading
            .trim_end_matches('%')
            .parse::<u32>()
            .map_err(|_| malformed())?;
        if percent == 0 || percent > 100 {
            return Err(malformed());
        }
        return Ok(DiscountRule::Percentage { percent });
    }

    if label.split_whitespace().any(|token| token == "for") {
        let bundle = leading.parse::<u32>().map_err(|_| malformed())?;
        if bundle == 0 {
            return Err(malformed());
        }
        return Ok(DiscountRule::PackageDeal { bundle });
    }

    Ok(DiscountRule::NoDiscount)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sea_orm::Iterable;

    use super::*;

    #[test]
    fn resolves_percentage_labels() {
        assert_eq!(resolve("50%"), Ok(DiscountRule::Percentage { percent: 50 }));
        assert_eq!(resolve("70 %"), Ok(DiscountRule::Percentage { percent: 70 }));
        assert_eq!(resolve("100%"), Ok(DiscountRule::Percentage { percent: 100 }));
    }

    #[test]
    fn resolves_package_labels() {
        assert_eq!(resolve("3 for 2"), Ok(DiscountRule::PackageDeal { bundle: 3 }));
        assert_eq!(resolve("2 for 1"), Ok(DiscountRule::PackageDeal { bundle: 2 }));
    }

    #[test]
    fn unknown_labels_mean_no_discount() {
        assert_eq!(resolve("no discount"), Ok(DiscountRule::NoDiscount));
        assert_eq!(resolve(""), Ok(DiscountRule::NoDiscount));
        assert_eq!(resolve("summer sale"), Ok(DiscountRule::NoDiscount));
        assert_eq!(resolve("before sale"), Ok(DiscountRule::NoDiscount));
        assert_eq!(resolve("3for2"), Ok(DiscountRule::NoDiscount));
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        for label in ["0%", "101 %", "-5%", "half %", "3.5%", "%"] {
            assert_eq!(
                resolve(label),
                Err(PricingError::MalformedDiscountCode(label.to_string())),
                "{label}"
            );
        }
    }

    #[test]
    fn rejects_bad_bundle_sizes() {
        for label in ["0 for 1", "three for two", "for", "x for 2"] {
            assert!(
                matches!(resolve(label), Err(PricingError::MalformedDiscountCode(_))),
                "{label}"
            );
        }
    }

    #[test]
    fn every_code_resolves() {
        for code in DiscountCode::iter() {
            assert!(code.rule().is_ok(), "{code:?} did not resolve");
        }
        assert_eq!(DiscountCode::default().rule(), Ok(DiscountRule::NoDiscount));
        assert_eq!(
            DiscountCode::ThreeForTwo.rule(),
            Ok(DiscountRule::PackageDeal { bundle: 3 })
        );
        assert_eq!(
            DiscountCode::FivePercent.rule(),
            Ok(DiscountRule::Percentage { percent: 5 })
        );
    }

    #[test]
    fn percentage_unit_price() {
        let rule = DiscountRule::Percentage { percent: 50 };
        assert_eq!(rule.unit_price(dec!(100.00)), dec!(50.00));

        let rule = DiscountRule::Percentage { percent: 30 };
        assert_eq!(rule.unit_price(dec!(19.99)), dec!(13.99));
    }

    #[test]
    fn percentage_rounds_half_up() {
        let rule = DiscountRule::Percentage { percent: 50 };
        assert_eq!(rule.unit_price(dec!(0.05)), dec!(0.03));
        assert_eq!(rule.unit_price(dec!(0.01)), dec!(0.01));
    }

    #[test]
    fn percentage_is_always_cheaper() {
        for percent in 1..=100 {
            let rule = DiscountRule::Percentage { percent };
            for price in [dec!(1.00), dec!(9.99), dec!(250.00), dec!(12345.67)] {
                assert!(rule.unit_price(price) < price, "{percent}% of {price}");
            }
        }
    }

    #[test]
    fn package_and_none_keep_unit_price() {
        let price = dec!(10.00);
        assert_eq!(DiscountRule::NoDiscount.unit_price(price), price);
        assert_eq!(DiscountRule::PackageDeal { bundle: 3 }.unit_price(price), price);
    }
}

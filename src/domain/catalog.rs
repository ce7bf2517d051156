//! Catalog entries and the references cart lines hold to them.

use std::{collections::HashMap, fmt, sync::Arc};

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::discount::{DiscountCode, DiscountRule, PricingError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
#[serde(rename_all = "snake_case")]
pub enum Brand {
    #[sea_orm(string_value = "ACM")]
    Acme,
    #[sea_orm(string_value = "NWD")]
    Northwind,
    #[sea_orm(string_value = "CTS")]
    Contoso,
    #[sea_orm(string_value = "FAB")]
    Fabrikam,
    #[sea_orm(string_value = "OTH")]
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")]
#[serde(rename_all = "snake_case")]
pub enum Country {
    #[sea_orm(string_value = "NO")]
    Norway,
    #[sea_orm(string_value = "SE")]
    Sweden,
    #[sea_orm(string_value = "DK")]
    Denmark,
    #[sea_orm(string_value = "FI")]
    Finland,
    #[sea_orm(string_value = "DE")]
    Germany,
    #[sea_orm(string_value = "XX")]
    Other,
}

/// Kinds of purchasable records a cart line can point at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[sea_orm(string_value = "product")]
    Product,
}

/// Kind tag plus identity of a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ProductRef {
    pub kind: ProductKind,
    pub id: Uuid,
}

impl ProductRef {
    pub fn product(id: Uuid) -> Self {
        Self {
            kind: ProductKind::Product,
            id,
        }
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ProductKind::Product => "product",
        };
        write!(f, "{kind}:{}", self.id)
    }
}

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name must be at most 100 characters")]
    NameTooLong,

    #[error("description must be at most 500 characters")]
    DescriptionTooLong,

    #[error("price must not be negative")]
    NegativePrice,

    #[error("height must not be negative")]
    NegativeHeight,

    #[error("stock must not be negative")]
    NegativeStock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub brand: Brand,
    pub country: Country,
    pub height: i32,
    pub price: Decimal,
    pub description: String,
    pub stock: i32,
    pub discount: DiscountCode,
}

impl CatalogEntry {
    pub fn product_ref(&self) -> ProductRef {
        ProductRef::product(self.id)
    }

    pub fn discount_rule(&self) -> Result<DiscountRule, PricingError> {
        self.discount.rule()
    }

    /// Current price with any percentage discount applied.
    pub fn discounted_unit_price(&self) -> Result<Decimal, PricingError> {
        Ok(self.discount_rule()?.unit_price(self.price))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_listing(&self.name, &self.description, self.price, self.height, self.stock)
    }
}

/// Checks the invariants every stored catalog entry must satisfy.
pub fn validate_listing(
    name: &str,
    description: &str,
    price: Decimal,
    height: i32,
    stock: i32,
) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::EmptyName);
    }
    if name.trim().chars().count() > NAME_MAX_LEN {
        return Err(CatalogError::NameTooLong);
    }
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(CatalogError::DescriptionTooLong);
    }
    if price < Decimal::ZERO {
        return Err(CatalogError::NegativePrice);
    }
    if height < 0 {
        return Err(CatalogError::NegativeHeight);
    }
    if stock < 0 {
        return Err(CatalogError::NegativeStock);
    }
    Ok(())
}

/// Loaded catalog records, looked up by kind and id.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    entries: HashMap<ProductRef, Arc<CatalogEntry>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CatalogEntry) -> Arc<CatalogEntry> {
        let entry = Arc::new(entry);
        self.entries.insert(entry.product_ref(), Arc::clone(&entry));
        entry
    }

    pub fn resolve(&self, product: &ProductRef) -> Option<Arc<CatalogEntry>> {
        self.entries.get(product).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn entry(name: &str, price: Decimal, discount: DiscountCode) -> CatalogEntry {
    CatalogEntry {
        id: Uuid::new_v4(),
        name: name.to_string(),
        brand: Brand::Acme,
        country: Country::Norway,
        height: 30,
        price,
        description: format!("{name} for testing"),
        stock: 10,
        discount,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn discounted_price_follows_code() {
        let half = entry("Lamp", dec!(100.00), DiscountCode::FiftyPercent);
        assert_eq!(half.discounted_unit_price(), Ok(dec!(50.00)));

        let bundle = entry("Candle", dec!(10.00), DiscountCode::ThreeForTwo);
        assert_eq!(bundle.discounted_unit_price(), Ok(dec!(10.00)));

        let plain = entry("Vase", dec!(42.50), DiscountCode::NoDiscount);
        assert_eq!(plain.discounted_unit_price(), Ok(dec!(42.50)));
    }

    #[test]
    fn validation_rejects_negative_values() {
        let mut product = entry("Lamp", dec!(1.00), DiscountCode::NoDiscount);
        assert_eq!(product.validate(), Ok(()));

        product.price = dec!(-0.01);
        assert_eq!(product.validate(), Err(CatalogError::NegativePrice));

        product.price = dec!(0);
        product.height = -1;
        assert_eq!(product.validate(), Err(CatalogError::NegativeHeight));

        product.height = 0;
        product.stock = -3;
        assert_eq!(product.validate(), Err(CatalogError::NegativeStock));

        product.stock = 0;
        product.name = "  ".into();
        assert_eq!(product.validate(), Err(CatalogError::EmptyName));
    }

    #[test]
    fn validation_enforces_text_lengths() {
        let mut product = entry("Lamp", dec!(1.00), DiscountCode::NoDiscount);

        product.name = "ø".repeat(NAME_MAX_LEN);
        assert_eq!(product.validate(), Ok(()));
        product.name.push('x');
        assert_eq!(product.validate(), Err(CatalogError::NameTooLong));

        product.name = "Lamp".into();
        product.description = "d".repeat(DESCRIPTION_MAX_LEN + 1);
        assert_eq!(product.validate(), Err(CatalogError::DescriptionTooLong));
    }

    #[test]
    fn registry_resolves_by_kind_and_id() {
        let mut registry = CatalogRegistry::new();
        let lamp = registry.insert(entry("Lamp", dec!(5.00), DiscountCode::NoDiscount));

        let found = registry.resolve(&ProductRef::product(lamp.id));
        assert_eq!(found.as_deref(), Some(lamp.as_ref()));
        assert!(registry.resolve(&ProductRef::product(Uuid::new_v4())).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn product_ref_display() {
        let id = Uuid::nil();
        assert_eq!(
            ProductRef::product(id).to_string(),
            "product:00000000-0000-0000-0000-000000000000"
        );
    }
}

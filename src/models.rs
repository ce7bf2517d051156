//! Resources as they appear in API responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        Brand, Cart as CartState, CatalogEntry, Country, DiscountCode, DiscountRule, LineItem,
        Order as OrderState, OrderStatus, PricingError, ProductRef,
    },
    entity::{products, users},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Brand,
    pub country: Country,
    pub height: i32,
    #[schema(value_type = String, example = "199.90")]
    pub price: Decimal,
    pub discount: DiscountCode,
    pub discount_label: String,
    pub discount_rule: DiscountRule,
    /// Unit price after percentage discounts; package deals apply per line.
    #[schema(value_type = String, example = "99.95")]
    pub discounted_price: Decimal,
    pub description: String,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<products::Model> for Product {
    type Error = PricingError;

    fn try_from(model: products::Model) -> Result<Self, Self::Error> {
        let created_at = model.created_at.with_timezone(&Utc);
        let entry = CatalogEntry::from(model);
        let discount_rule = entry.discount_rule()?;
        Ok(Self {
            discounted_price: discount_rule.unit_price(entry.price),
            discount_rule,
            discount_label: entry.discount.label().to_string(),
            discount: entry.discount,
            id: entry.id,
            name: entry.name,
            brand: entry.brand,
            country: entry.country,
            height: entry.height,
            price: entry.price,
            description: entry.description,
            stock: entry.stock,
            created_at,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub product: ProductRef,
    pub name: String,
    pub discount: DiscountCode,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl TryFrom<&LineItem> for CartLine {
    type Error = PricingError;

    fn try_from(item: &LineItem) -> Result<Self, Self::Error> {
        Ok(Self {
            product: item.product_ref(),
            name: item.entry.name.clone(),
            discount: item.entry.discount,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub checked_out: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    #[schema(value_type = String)]
    pub grand_total: Decimal,
}

impl TryFrom<&CartState> for Cart {
    type Error = PricingError;

    fn try_from(cart: &CartState) -> Result<Self, Self::Error> {
        let items = cart
            .items()
            .iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: cart.id(),
            checked_out: cart.is_checked_out(),
            created_at: cart.created_at(),
            items,
            item_count: cart.item_count(),
            grand_total: cart.grand_total()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub status_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&OrderState> for Order {
    fn from(order: &OrderState) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            product_id: order.product.id,
            quantity: order.quantity,
            unit_price: order.unit_price,
            total_amount: order.total,
            status: order.status(),
            status_label: order.status().label().to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

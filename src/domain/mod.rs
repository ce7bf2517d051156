//! Pricing, cart and order rules, independent of persistence and HTTP.

pub mod cart;
pub mod catalog;
pub mod discount;
pub mod order;

pub use cart::{Cart, CartError, LineItem};
pub use catalog::{
    Brand, CatalogEntry, CatalogError, CatalogRegistry, Country, ProductKind, ProductRef,
};
pub use discount::{DiscountCode, DiscountRule, PricingError, resolve};
pub use order::{Order, OrderStatus, StatusChange};

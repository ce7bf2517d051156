use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::{Brand, Country, DiscountCode},
    models::Product,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub brand: Brand,
    pub country: Country,
    pub height: i32,
    #[schema(value_type = String, example = "249.00")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    pub stock: i32,
    #[serde(default)]
    pub discount: DiscountCode,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub brand: Option<Brand>,
    pub country: Option<Country>,
    pub height: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub discount: Option<DiscountCode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

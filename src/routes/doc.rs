use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{Brand, Country, DiscountCode, DiscountRule, OrderStatus, ProductRef, StatusChange},
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CheckoutResponse},
        orders::{OrderList, OrderStatusUpdate, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Cart, CartLine, Order, Product, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::checkout,
        orders::list_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::update_order_status
    ),
    components(
        schemas(
            User,
            Product,
            Cart,
            CartLine,
            Order,
            Brand,
            Country,
            DiscountCode,
            DiscountRule,
            OrderStatus,
            ProductRef,
            StatusChange,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            AddToCartRequest,
            CheckoutResponse,
            OrderList,
            UpdateOrderStatusRequest,
            OrderStatusUpdate,
            params::SortOrder,
            params::ProductSortBy,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Cart>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderList>,
            ApiResponse<OrderStatusUpdate>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart and checkout endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Order fulfillment endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

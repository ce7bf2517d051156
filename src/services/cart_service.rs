use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    domain::{Cart, CatalogEntry, LineItem, Order, ProductRef},
    dto::cart::{AddToCartRequest, CheckoutResponse},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart as CartView, Order as OrderView},
    response::{ApiResponse, Meta},
    services::product_service::load_registry,
    state::AppState,
};

/// A cart rebuilt from storage, with the row backing each line.
struct LoadedCart {
    cart: Cart,
    rows: HashMap<ProductRef, CartItemModel>,
}

/// The user's open cart, created on first use.
pub async fn active_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    let open = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::CheckedOut.eq(false))
        .lock(LockType::Update)
        .one(conn)
        .await?;
    if let Some(cart) = open {
        return Ok(cart);
    }

    let cart = Cart::new(user_id);
    let model = CartActive {
        id: Set(cart.id()),
        user_id: Set(cart.user_id()),
        checked_out: Set(false),
        created_at: Set(cart.created_at().into()),
    }
    .insert(conn)
    .await?;
    tracing::debug!(cart_id = %model.id, user_id = %user_id, "opened cart");
    Ok(model)
}

async fn load_cart<C: ConnectionTrait>(conn: &C, model: CartModel) -> AppResult<LoadedCart> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(model.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .order_by_asc(CartItemCol::Id)
        .all(conn)
        .await?;

    let refs: Vec<ProductRef> = rows.iter().map(CartItemModel::product_ref).collect();
    let registry = load_registry(conn, &refs).await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut by_ref = HashMap::with_capacity(rows.len());
    for row in rows {
        let product = row.product_ref();
        let Some(entry) = registry.resolve(&product) else {
            tracing::warn!(cart_id = %model.id, product = %product, "cart line points at a missing product");
            continue;
        };
        items.push(LineItem::new(entry, row.unit_price, row.quantity));
        by_ref.insert(product, row);
    }

    let cart = Cart::from_parts(
        model.id,
        model.user_id,
        model.created_at.with_timezone(&Utc),
        model.checked_out,
        items,
    );
    Ok(LoadedCart { cart, rows: by_ref })
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let model = active_cart(&txn, user.user_id).await?;
    let LoadedCart { cart, .. } = load_cart(&txn, model).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "OK",
        CartView::try_from(&cart)?,
        Some(Meta::empty()),
    ))
}

/// Adds a product at its current catalog price.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;
    let entry = Arc::new(CatalogEntry::from(product));
    let price = entry.price;

    let model = active_cart(&txn, user.user_id).await?;
    let LoadedCart { mut cart, rows } = load_cart(&txn, model).await?;

    let item = cart.add(entry, price, payload.quantity)?;
    let (product, quantity, unit_price) = (item.product_ref(), item.quantity, item.unit_price);

    match rows.get(&product) {
        Some(row) => {
            let mut active: CartItemActive = row.clone().into();
            active.quantity = Set(quantity);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id()),
                product_kind: Set(product.kind),
                product_id: Set(product.id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }
    }

    let view = CartView::try_from(&cart)?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        product = %product,
        quantity,
        "cart updated"
    );
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let model = active_cart(&txn, user.user_id).await?;
    let LoadedCart { mut cart, rows } = load_cart(&txn, model).await?;

    let product = ProductRef::product(product_id);
    cart.remove(&product)?;
    if let Some(row) = rows.get(&product) {
        CartItems::delete_by_id(row.id).exec(&txn).await?;
    }

    let view = CartView::try_from(&cart)?;
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, product = %product, "removed from cart");
    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

/// Closes the active cart and places one confirmed order per line.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CheckoutResponse>> {
    let txn = state.orm.begin().await?;
    let model = active_cart(&txn, user.user_id).await?;
    let LoadedCart { mut cart, .. } = load_cart(&txn, model.clone()).await?;

    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    let grand_total = cart.grand_total()?;

    let mut orders = Vec::with_capacity(cart.items().len());
    for item in cart.items() {
        let reserved = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(item.entry.id))
            .filter(ProdCol::Stock.gte(item.quantity))
            .exec(&txn)
            .await?;
        if reserved.rows_affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                item.entry.id
            )));
        }

        let order = Order::place(user.user_id, item)?;
        OrderActive {
            id: Set(order.id),
            user_id: Set(order.user_id),
            product_id: Set(order.product.id),
            quantity: Set(order.quantity),
            unit_price: Set(order.unit_price),
            total_amount: Set(order.total),
            status: Set(order.status()),
            created_at: Set(order.created_at.into()),
            updated_at: Set(order.updated_at.into()),
        }
        .insert(&txn)
        .await?;
        orders.push(order);
    }

    cart.checkout();
    let mut active: CartActive = model.into();
    active.checked_out = Set(true);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        cart_id = %cart.id(),
        orders = orders.len(),
        total = %grand_total,
        "checkout completed"
    );

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse {
            cart: CartView::try_from(&cart)?,
            orders: orders.iter().map(OrderView::from).collect(),
        },
        Some(Meta::empty()),
    ))
}

use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, Condition, EntityTrait, QuerySelect, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    domain,
    dto::orders::{OrderList, OrderStatusUpdate, UpdateOrderStatusRequest},
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service::page_orders,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (orders, meta) = page_orders(state, Condition::all(), &query).await?;
    Ok(ApiResponse::success("Orders", orders, Some(meta)))
}

/// Moves an order to a new status and notifies its owner.
///
/// The change is committed even when the notification cannot be delivered.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderStatusUpdate>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let model = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let owner = Users::find_by_id(model.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order {id} has no owner")))?;

    let mut order = domain::Order::from(model.clone());
    let change = order
        .set_status(payload.status, &owner.email, state.notifier.as_ref())
        .await;

    if change.is_some() {
        let mut active: OrderActive = model.into();
        active.status = Set(order.status());
        active.updated_at = Set(order.updated_at.into());
        active.update(&txn).await?;
    }
    txn.commit().await?;

    if let Some(change) = &change {
        tracing::info!(
            admin_id = %user.user_id,
            order_id = %change.order_id,
            from = %change.from,
            to = %change.to,
            "order status updated by admin"
        );
    }

    Ok(ApiResponse::success(
        "Order status updated",
        OrderStatusUpdate {
            order: Order::from(&order),
            change,
        },
        Some(Meta::empty()),
    ))
}

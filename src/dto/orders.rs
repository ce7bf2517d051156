use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::{OrderStatus, StatusChange},
    models::Order,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusUpdate {
    pub order: Order,
    /// Absent when the order already had the requested status.
    pub change: Option<StatusChange>,
}

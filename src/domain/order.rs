use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{cart::LineItem, catalog::ProductRef, discount::PricingError};
use crate::notify::Notifier;

/// Fulfillment progression of an order, in declaration order.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "ready_for_transportation")]
    ReadyForTransportation,
    #[sea_orm(string_value = "sent")]
    Sent,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::ReadyForTransportation => "Ready for transportation",
            OrderStatus::Sent => "Sent",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusChange {
    pub fn is_forward(&self) -> bool {
        self.to > self.from
    }

    pub fn subject(&self) -> String {
        format!("Your order is now {}", self.to.label().to_lowercase())
    }

    pub fn body(&self) -> String {
        format!(
            "The status of order {} changed from {} to {}.",
            self.order_id, self.from, self.to
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product: ProductRef,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
    status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a confirmed order for one cart line. No notification is sent.
    pub fn place(user_id: Uuid, item: &LineItem) -> Result<Self, PricingError> {
        let total = item.line_total()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            product: item.product_ref(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total,
            status: OrderStatus::Confirmed,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        user_id: Uuid,
        product: ProductRef,
        quantity: i32,
        unit_price: Decimal,
        total: Decimal,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            product,
            quantity,
            unit_price,
            total,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Moves the order to `status`, telling `recipient` about it first.
    ///
    /// Any status may follow any other. Assigning the current status again
    /// does nothing and returns `None`. Delivery is best-effort: a failed
    /// notification is logged and the new status still applies.
    pub async fn set_status(
        &mut self,
        status: OrderStatus,
        recipient: &str,
        notifier: &dyn Notifier,
    ) -> Option<StatusChange> {
        if status == self.status {
            tracing::debug!(order_id = %self.id, status = %status, "order status unchanged");
            return None;
        }

        let change = StatusChange {
            order_id: self.id,
            from: self.status,
            to: status,
        };
        if !change.is_forward() {
            tracing::warn!(
                order_id = %self.id,
                from = %change.from,
                to = %change.to,
                "order status moved backwards"
            );
        }

        if let Err(err) = notifier
            .send(recipient, &change.subject(), &change.body())
            .await
        {
            tracing::warn!(error = %err, order_id = %self.id, "status notification failed");
        }

        self.status = status;
        self.updated_at = Utc::now();
        tracing::info!(
            order_id = %self.id,
            from = %change.from,
            to = %change.to,
            "order status changed"
        );
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        domain::{catalog::entry, discount::DiscountCode},
        notify::{MailConfig, MemoryNotifier},
    };

    fn notifier() -> MemoryNotifier {
        MemoryNotifier::new(MailConfig {
            from_address: "shop@example.com".into(),
            subject_prefix: String::new(),
        })
    }

    fn placed() -> Order {
        let product = Arc::new(entry("Lamp", dec!(100.00), DiscountCode::FiftyPercent));
        let line = LineItem::new(product, dec!(100.00), 3);
        Order::place(Uuid::new_v4(), &line).unwrap()
    }

    #[test]
    fn placed_order_is_confirmed_with_line_total() {
        let order = placed();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.total, dec!(150.00));
        assert_eq!(order.quantity, 3);
    }

    #[test]
    fn statuses_are_ordered() {
        assert!(OrderStatus::Confirmed < OrderStatus::Accepted);
        assert!(OrderStatus::Accepted < OrderStatus::ReadyForTransportation);
        assert!(OrderStatus::ReadyForTransportation < OrderStatus::Sent);
    }

    #[tokio::test]
    async fn change_sends_exactly_one_notification() {
        let mailer = notifier();
        let mut order = placed();
        assert!(mailer.sent().await.is_empty());

        let change = order
            .set_status(OrderStatus::Accepted, "buyer@example.com", &mailer)
            .await
            .unwrap();
        assert!(change.is_forward());
        assert_eq!(order.status(), OrderStatus::Accepted);

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert!(sent[0].body.contains("from Confirmed to Accepted"));
    }

    #[tokio::test]
    async fn repeated_status_is_silent() {
        let mailer = notifier();
        let mut order = placed();

        order
            .set_status(OrderStatus::Accepted, "buyer@example.com", &mailer)
            .await;
        let again = order
            .set_status(OrderStatus::Accepted, "buyer@example.com", &mailer)
            .await;

        assert!(again.is_none());
        assert_eq!(mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn backwards_moves_are_allowed() {
        let mailer = notifier();
        let mut order = placed();

        order.set_status(OrderStatus::Sent, "buyer@example.com", &mailer).await;
        let change = order
            .set_status(OrderStatus::Accepted, "buyer@example.com", &mailer)
            .await
            .unwrap();

        assert!(!change.is_forward());
        assert_eq!(order.status(), OrderStatus::Accepted);
        assert_eq!(mailer.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_notification_still_applies_status() {
        let mailer = MemoryNotifier::failing(MailConfig {
            from_address: "shop@example.com".into(),
            subject_prefix: String::new(),
        });
        let mut order = placed();

        let change = order
            .set_status(OrderStatus::ReadyForTransportation, "buyer@example.com", &mailer)
            .await;

        assert!(change.is_some());
        assert_eq!(order.status(), OrderStatus::ReadyForTransportation);
    }
}

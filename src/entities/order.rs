use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Zero denotes a guest order; never rejected.
    pub customer_id: i64,

    pub cpf: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed order status vocabulary.
///
/// `received` is the initial state; `completed` and `cancelled` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    InProgress,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Rank used by the kitchen queue: orders closer to completion surface
    /// first. Terminal orders never appear on the queue.
    pub fn kitchen_priority(self) -> Option<u8> {
        match self {
            OrderStatus::Ready => Some(0),
            OrderStatus::InProgress => Some(1),
            OrderStatus::Received => Some(2),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Legal transitions: the forward kitchen chain, cancellation from any
    /// non-terminal state, and same-state no-ops.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (OrderStatus::Received, OrderStatus::InProgress) => true,
            (OrderStatus::InProgress, OrderStatus::Ready) => true,
            (OrderStatus::Ready, OrderStatus::Completed) => true,
            (from, OrderStatus::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

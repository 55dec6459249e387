use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// At most one payment per order, enforced by a unique index.
    pub order_id: i64,

    pub amount: Decimal,
    pub status: String,
    pub payment_method: String,

    /// Empty until the provider confirms the payment.
    pub transaction_id: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payment lifecycle: `pending` until the provider webhook reports one of
/// the three terminal outcomes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Canceled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn is_approved(self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case("pending", PaymentStatus::Pending)]
    #[test_case("approved", PaymentStatus::Approved)]
    #[test_case("rejected", PaymentStatus::Rejected)]
    #[test_case("canceled", PaymentStatus::Canceled)]
    fn parses_vocabulary(input: &str, expected: PaymentStatus) {
        assert_eq!(PaymentStatus::from_str(input).unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Approved.is_terminal());
        assert!(PaymentStatus::Rejected.is_terminal());
        assert!(PaymentStatus::Canceled.is_terminal());
    }
}

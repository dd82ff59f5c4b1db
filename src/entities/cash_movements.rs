use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "cash_movement_type"
)]
#[serde(rename_all = "snake_case")]
pub enum CashMovementType {
    #[sea_orm(string_value = "opening")]
    Opening,
    #[sea_orm(string_value = "closing")]
    Closing,
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl std::fmt::Display for CashMovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CashMovementType::Opening => write!(f, "opening"),
            CashMovementType::Closing => write!(f, "closing"),
            CashMovementType::Sale => write!(f, "sale"),
            CashMovementType::Refund => write!(f, "refund"),
            CashMovementType::Withdrawal => write!(f, "withdrawal"),
            CashMovementType::Deposit => write!(f, "deposit"),
            CashMovementType::Expense => write!(f, "expense"),
            CashMovementType::Adjustment => write!(f, "adjustment"),
        }
    }
}

/// 收银流水，只追加不修改
/// previous_balance / new_balance 为写入时的余额快照
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cash_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub cash_register_id: Uuid,
    pub movement_type: CashMovementType,
    pub amount: f64,
    pub previous_balance: f64,
    pub new_balance: f64,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

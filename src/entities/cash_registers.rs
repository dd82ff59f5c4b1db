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
    enum_name = "cash_register_status"
)]
#[serde(rename_all = "snake_case")]
pub enum CashRegisterStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl std::fmt::Display for CashRegisterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CashRegisterStatus::Open => write!(f, "open"),
            CashRegisterStatus::Closed => write!(f, "closed"),
        }
    }
}

/// 收银台会话（开台 -> 关台）
/// - expected_balance: 按流水滚动计算的应有余额
/// - balance_difference: 关台时 closing_balance - expected_balance
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cash_registers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub status: CashRegisterStatus,
    pub opened_by: Uuid,
    pub closed_by: Option<Uuid>,
    pub opening_balance: f64,
    pub expected_balance: f64,
    pub closing_balance: Option<f64>,
    pub balance_difference: Option<f64>,
    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

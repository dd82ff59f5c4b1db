use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::lenient_amount;
use crate::entities::{
    CashMovementType, CashRegisterStatus, cash_movement_entity, cash_register_entity,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct OpenCashRegisterRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub opening_balance: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CloseCashRegisterRequest {
    /// 实点现金
    #[serde(default, deserialize_with = "lenient_amount")]
    pub closing_balance: Option<f64>,
    pub notes: Option<String>,
}

/// 手工流水：取款 / 存入 / 支出 / 调整
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CashMovementRequest {
    pub movement_type: CashMovementType,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CashRegisterResponse {
    pub id: Uuid,
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
}

impl From<cash_register_entity::Model> for CashRegisterResponse {
    fn from(m: cash_register_entity::Model) -> Self {
        CashRegisterResponse {
            id: m.id,
            status: m.status,
            opened_by: m.opened_by,
            closed_by: m.closed_by,
            opening_balance: m.opening_balance,
            expected_balance: m.expected_balance,
            closing_balance: m.closing_balance,
            balance_difference: m.balance_difference,
            notes: m.notes,
            opened_at: m.opened_at,
            closed_at: m.closed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CashMovementResponse {
    pub id: Uuid,
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

impl From<cash_movement_entity::Model> for CashMovementResponse {
    fn from(m: cash_movement_entity::Model) -> Self {
        CashMovementResponse {
            id: m.id,
            cash_register_id: m.cash_register_id,
            movement_type: m.movement_type,
            amount: m.amount,
            previous_balance: m.previous_balance,
            new_balance: m.new_balance,
            description: m.description,
            order_id: m.order_id,
            payment_id: m.payment_id,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

/// 当前收银台及其全部流水
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CashRegisterDetailResponse {
    pub register: CashRegisterResponse,
    pub movements: Vec<CashMovementResponse>,
}

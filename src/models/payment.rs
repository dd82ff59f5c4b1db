use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::CashMovementResponse;
use crate::domain::money::lenient_amount;
use crate::entities::{PaymentMethod, PaymentStatus, payment_entity};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub method: PaymentMethod,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub fee: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Option<f64>,
    /// 网关交易号（PIX correlation id）
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct QuickPaymentRequest {
    /// 默认现金
    pub method: Option<PaymentMethod>,
    /// 不传则收取全部未付金额
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: f64,
    pub fee: f64,
    pub discount: f64,
    pub tax: f64,
    pub net_amount: f64,
    pub external_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<payment_entity::Model> for PaymentResponse {
    fn from(m: payment_entity::Model) -> Self {
        PaymentResponse {
            id: m.id,
            order_id: m.order_id,
            method: m.method,
            status: m.status,
            amount: m.amount,
            fee: m.fee,
            discount: m.discount,
            tax: m.tax,
            net_amount: m.net_amount,
            external_id: m.external_id,
            paid_at: m.paid_at,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

/// 快速收款结果；已付清时 payment 为空
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuickPaymentResponse {
    pub payment: Option<PaymentResponse>,
    pub order_total: f64,
    pub paid_amount: f64,
    pub outstanding: f64,
    /// 现金收款且有营业中的收银台时追加的销售流水
    pub cash_movement: Option<CashMovementResponse>,
}

/// PIX 网关回调
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PixWebhookPayload {
    pub correlation_id: String,
    pub status: String,
}

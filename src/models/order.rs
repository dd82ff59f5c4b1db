use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::lenient_amount;
use crate::entities::{
    ItemModification, OrderChannel, OrderStatus, order_entity, order_item_entity,
};

/// 新增明细
///
/// 指定 product_id 时名称、单价、制作时间默认取自菜品；
/// 自定义明细（无 product_id）必须给出 name 与 unit_price，且不扣库存。
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<f64>,
    pub quantity: i32,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Option<f64>,
    #[serde(default)]
    pub modifications: Vec<ItemModification>,
    pub notes: Option<String>,
    pub prep_time_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateOrderRequest {
    pub channel: Option<OrderChannel>,
    pub location_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub people_count: Option<i32>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

/// 修改已有明细（按 id），已送厨的明细会被拒绝
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderItemUpdate {
    pub id: Uuid,
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Option<f64>,
    pub modifications: Option<Vec<ItemModification>>,
    pub notes: Option<String>,
}

impl OrderItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit_price.is_none()
            && self.discount.is_none()
            && self.tax.is_none()
            && self.modifications.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateOrderRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Option<f64>,
    pub notes: Option<String>,
    pub people_count: Option<i32>,
    pub table_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<OrderItemUpdate>,
    #[serde(default)]
    pub new_items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
    pub channel: Option<OrderChannel>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub discount: f64,
    pub tax: f64,
    pub total_price: f64,
    pub modifications: Vec<ItemModification>,
    pub notes: Option<String>,
    pub prep_time_minutes: i32,
    pub sent_to_kitchen_at: Option<DateTime<Utc>>,
    /// 已送厨，不可再修改
    pub locked: bool,
}

impl From<order_item_entity::Model> for OrderItemResponse {
    fn from(m: order_item_entity::Model) -> Self {
        OrderItemResponse {
            locked: m.is_frozen(),
            id: m.id,
            product_id: m.product_id,
            name: m.name,
            unit_price: m.unit_price,
            quantity: m.quantity,
            discount: m.discount,
            tax: m.tax,
            total_price: m.total_price,
            modifications: m.modifications.0,
            notes: m.notes,
            prep_time_minutes: m.prep_time_minutes,
            sent_to_kitchen_at: m.sent_to_kitchen_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub location_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: OrderStatus,
    pub channel: OrderChannel,
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
    pub people_count: i32,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_by: Uuid,
    pub closed_by: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn new(order: order_entity::Model, items: Vec<order_item_entity::Model>) -> Self {
        OrderResponse {
            id: order.id,
            location_id: order.location_id,
            table_id: order.table_id,
            customer_id: order.customer_id,
            status: order.status,
            channel: order.channel,
            subtotal: order.subtotal,
            discount: order.discount,
            tax: order.tax,
            total: order.total,
            people_count: order.people_count,
            notes: order.notes,
            cancellation_reason: order.cancellation_reason,
            created_by: order.created_by,
            closed_by: order.closed_by,
            cancelled_by: order.cancelled_by,
            ready_at: order.ready_at,
            delivered_at: order.delivered_at,
            closed_at: order.closed_at,
            cancelled_at: order.cancelled_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_input_accepts_numeric_strings() {
        let input: OrderItemInput = serde_json::from_value(serde_json::json!({
            "name": "Caipirinha",
            "unit_price": "18.90",
            "quantity": 2,
            "discount": "oops",
            "modifications": [{"name": "extra lime", "extra_price": 1.5}, {"name": "no sugar"}]
        }))
        .unwrap();
        assert_eq!(input.unit_price, Some(18.9));
        assert_eq!(input.discount, None);
        assert_eq!(input.modifications.len(), 2);
        assert_eq!(input.modifications[1].extra_price, 0.0);
    }

    #[test]
    fn test_update_request_defaults() {
        let req: UpdateOrderRequest = serde_json::from_str(r#"{"discount": 5}"#).unwrap();
        assert_eq!(req.discount, Some(5.0));
        assert!(req.items.is_empty() && req.new_items.is_empty());

        let update: OrderItemUpdate =
            serde_json::from_value(serde_json::json!({"id": Uuid::nil()})).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_status_query_parses_snake_case() {
        let q: OrderQuery =
            serde_json::from_str(r#"{"status": "preparing", "channel": "dine_in"}"#).unwrap();
        assert_eq!(q.status, Some(OrderStatus::Preparing));
        assert_eq!(q.channel, Some(OrderChannel::DineIn));
    }
}

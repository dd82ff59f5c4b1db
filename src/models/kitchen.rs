//! 厨房显示屏（KDS）推送的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    ItemModification, OrderChannel, OrderStatus, order_entity, order_item_entity,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KitchenItemSnapshot {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub modifications: Vec<ItemModification>,
    pub notes: Option<String>,
    pub prep_time_minutes: i32,
    pub sent_to_kitchen_at: Option<DateTime<Utc>>,
}

impl From<&order_item_entity::Model> for KitchenItemSnapshot {
    fn from(m: &order_item_entity::Model) -> Self {
        KitchenItemSnapshot {
            id: m.id,
            name: m.name.clone(),
            quantity: m.quantity,
            modifications: m.modifications.0.clone(),
            notes: m.notes.clone(),
            prep_time_minutes: m.prep_time_minutes,
            sent_to_kitchen_at: m.sent_to_kitchen_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KitchenOrderSnapshot {
    pub id: Uuid,
    pub status: OrderStatus,
    pub channel: OrderChannel,
    pub table_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<KitchenItemSnapshot>,
    /// 各明细制作时间之和（分钟）
    pub estimated_prep_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl KitchenOrderSnapshot {
    pub fn new(order: &order_entity::Model, items: &[order_item_entity::Model]) -> Self {
        KitchenOrderSnapshot {
            id: order.id,
            status: order.status,
            channel: order.channel,
            table_id: order.table_id,
            notes: order.notes.clone(),
            items: items.iter().map(KitchenItemSnapshot::from).collect(),
            estimated_prep_minutes: items
                .iter()
                .map(|i| i.prep_time_minutes.max(0))
                .fold(0, i32::saturating_add),
            created_at: order.created_at,
            ready_at: order.ready_at,
            delivered_at: order.delivered_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KitchenEvent {
    NewOrder {
        company_id: Uuid,
        order: KitchenOrderSnapshot,
    },
    OrderUpdated {
        company_id: Uuid,
        order: KitchenOrderSnapshot,
    },
    OrderCancelled {
        company_id: Uuid,
        order_id: Uuid,
    },
}

impl KitchenEvent {
    pub fn company_id(&self) -> Uuid {
        match self {
            KitchenEvent::NewOrder { company_id, .. }
            | KitchenEvent::OrderUpdated { company_id, .. }
            | KitchenEvent::OrderCancelled { company_id, .. } => *company_id,
        }
    }

    /// SSE 的 event 字段
    pub fn event_name(&self) -> &'static str {
        match self {
            KitchenEvent::NewOrder { .. } => "new_order",
            KitchenEvent::OrderUpdated { .. } => "order_updated",
            KitchenEvent::OrderCancelled { .. } => "order_cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Modifications;

    fn order() -> order_entity::Model {
        let now = Utc::now();
        order_entity::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            location_id: None,
            table_id: Some(Uuid::new_v4()),
            customer_id: None,
            status: OrderStatus::Preparing,
            channel: OrderChannel::DineIn,
            subtotal: 0.0,
            discount: 0.0,
            tax: 0.0,
            total: 0.0,
            people_count: 2,
            notes: None,
            cancellation_reason: None,
            created_by: Uuid::new_v4(),
            closed_by: None,
            cancelled_by: None,
            ready_at: None,
            delivered_at: None,
            closed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order: &order_entity::Model, name: &str, prep: i32) -> order_item_entity::Model {
        let now = Utc::now();
        order_item_entity::Model {
            id: Uuid::new_v4(),
            tenant_id: order.tenant_id,
            company_id: order.company_id,
            order_id: order.id,
            product_id: None,
            name: name.to_string(),
            unit_price: 10.0,
            quantity: 1,
            discount: 0.0,
            tax: 0.0,
            total_price: 10.0,
            modifications: Modifications::default(),
            notes: None,
            prep_time_minutes: prep,
            sent_to_kitchen_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_snapshot_estimates_prep_time() {
        let order = order();
        let items = vec![item(&order, "Feijoada", 25), item(&order, "Farofa", 5)];
        let snapshot = KitchenOrderSnapshot::new(&order, &items);
        assert_eq!(snapshot.estimated_prep_minutes, 30);
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.status, OrderStatus::Preparing);
    }

    #[test]
    fn test_snapshot_prep_time_saturates() {
        let order = order();
        let items = vec![
            item(&order, "Costela", i32::MAX),
            item(&order, "Cupim", i32::MAX),
        ];
        let snapshot = KitchenOrderSnapshot::new(&order, &items);
        assert_eq!(snapshot.estimated_prep_minutes, i32::MAX);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let company_id = Uuid::new_v4();
        let event = KitchenEvent::OrderCancelled {
            company_id,
            order_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_cancelled");
        assert_eq!(event.company_id(), company_id);
        assert_eq!(event.event_name(), "order_cancelled");
    }
}

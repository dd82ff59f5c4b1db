use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::lenient_amount;
use crate::entities::{PurchaseStatus, purchase_entity, purchase_item_entity};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PurchaseItemInput {
    pub ingredient_id: Uuid,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_cost: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePurchaseRequest {
    pub supplier: Option<String>,
    pub items: Vec<PurchaseItemInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseItemResponse {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
}

impl From<purchase_item_entity::Model> for PurchaseItemResponse {
    fn from(m: purchase_item_entity::Model) -> Self {
        PurchaseItemResponse {
            id: m.id,
            ingredient_id: m.ingredient_id,
            quantity: m.quantity,
            unit_cost: m.unit_cost,
            total_cost: m.total_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub supplier: Option<String>,
    pub status: PurchaseStatus,
    pub total_cost: f64,
    pub created_by: Uuid,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<PurchaseItemResponse>,
}

impl PurchaseResponse {
    pub fn new(purchase: purchase_entity::Model, items: Vec<purchase_item_entity::Model>) -> Self {
        PurchaseResponse {
            id: purchase.id,
            supplier: purchase.supplier,
            status: purchase.status,
            total_cost: purchase.total_cost,
            created_by: purchase.created_by,
            confirmed_by: purchase.confirmed_by,
            confirmed_at: purchase.confirmed_at,
            created_at: purchase.created_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

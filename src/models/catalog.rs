use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::lenient_amount;
use crate::entities::{ingredient_entity, product_entity, recipe_ingredient_entity};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: Option<f64>,
    pub prep_time_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub prep_time_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<product_entity::Model> for ProductResponse {
    fn from(m: product_entity::Model) -> Self {
        ProductResponse {
            id: m.id,
            name: m.name,
            price: m.price,
            prep_time_minutes: m.prep_time_minutes,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RecipeLineInput {
    pub ingredient_id: Uuid,
    /// 每份产品消耗量
    pub quantity: f64,
}

/// 整体替换配方
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SetRecipeRequest {
    pub lines: Vec<RecipeLineInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: f64,
}

impl From<recipe_ingredient_entity::Model> for RecipeLineResponse {
    fn from(m: recipe_ingredient_entity::Model) -> Self {
        RecipeLineResponse {
            id: m.id,
            product_id: m.product_id,
            ingredient_id: m.ingredient_id,
            quantity: m.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub current_stock: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub min_stock: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub max_stock: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_cost: Option<f64>,
}

/// 盘点调整，delta 可正可负
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdjustStockRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub delta: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: Option<f64>,
    pub unit_cost: f64,
    pub below_minimum: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ingredient_entity::Model> for IngredientResponse {
    fn from(m: ingredient_entity::Model) -> Self {
        IngredientResponse {
            below_minimum: m.is_below_minimum(),
            id: m.id,
            name: m.name,
            unit: m.unit,
            current_stock: m.current_stock,
            min_stock: m.min_stock,
            max_stock: m.max_stock,
            unit_cost: m.unit_cost,
            updated_at: m.updated_at,
        }
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 原料库存
/// - current_stock 只通过条件原子更新扣减（current_stock >= 需求量）
/// - max_stock 为空表示不设上限
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: Option<f64>,
    pub unit_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 是否低于安全库存
    pub fn is_below_minimum(&self) -> bool {
        self.current_stock < self.min_stock
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

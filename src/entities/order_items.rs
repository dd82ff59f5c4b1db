use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::money::{LineAmounts, ensure_amount};

/// 明细加料/做法，extra_price 计入单项金额
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemModification {
    pub name: String,
    #[serde(default)]
    pub extra_price: f64,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Modifications(pub Vec<ItemModification>);

impl Modifications {
    pub fn extra_total(&self) -> f64 {
        self.0.iter().map(|m| ensure_amount(m.extra_price)).sum()
    }
}

/// 订单明细
/// sent_to_kitchen_at 一旦写入，该明细即冻结，不再允许修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub discount: f64,
    pub tax: f64,
    pub total_price: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub modifications: Modifications,
    pub notes: Option<String>,
    pub prep_time_minutes: i32,
    pub sent_to_kitchen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_frozen(&self) -> bool {
        self.sent_to_kitchen_at.is_some()
    }

    pub fn line_amounts(&self) -> LineAmounts {
        LineAmounts {
            unit_price: self.unit_price,
            quantity: f64::from(self.quantity),
            modifiers: self.modifications.extra_total(),
            discount: self.discount,
            tax: self.tax,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::money::round_money;
use crate::entities::{
    PurchaseStatus, ingredient_entity as ingredients, purchase_entity as purchases,
    purchase_item_entity as purchase_items,
};
use crate::error::{AppError, AppResult};
use crate::models::{AuthContext, CreatePurchaseRequest, PurchaseResponse};

/// 原料采购入库
#[derive(Clone)]
pub struct PurchaseService {
    pool: DatabaseConnection,
}

impl PurchaseService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: CreatePurchaseRequest,
    ) -> AppResult<PurchaseResponse> {
        if req.items.is_empty() {
            return Err(AppError::ValidationError(
                "A purchase needs at least one item".into(),
            ));
        }

        let mut lines = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let quantity = item.quantity.filter(|q| *q > 0.0).ok_or_else(|| {
                AppError::ValidationError("Purchase quantities must be greater than zero".into())
            })?;
            let unit_cost = item.unit_cost.filter(|c| *c >= 0.0).ok_or_else(|| {
                AppError::ValidationError("Unit cost must be a non-negative number".into())
            })?;
            lines.push((item.ingredient_id, quantity, unit_cost));
        }

        let ids: HashSet<Uuid> = lines.iter().map(|(id, _, _)| *id).collect();
        let known = ingredients::Entity::find()
            .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
            .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
            .filter(ingredients::Column::Id.is_in(ids.iter().copied().collect::<Vec<_>>()))
            .count(&self.pool)
            .await?;
        if known as usize != ids.len() {
            return Err(AppError::not_found("Ingredient"));
        }

        let total_cost = round_money(lines.iter().map(|(_, q, c)| q * c).sum());
        let now = Utc::now();

        let txn = self.pool.begin().await?;
        let purchase = purchases::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            supplier: Set(req.supplier),
            status: Set(PurchaseStatus::Pending),
            total_cost: Set(total_cost),
            created_by: Set(ctx.user_id),
            confirmed_by: Set(None),
            confirmed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (ingredient_id, quantity, unit_cost) in lines {
            let item = purchase_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(purchase.id),
                ingredient_id: Set(ingredient_id),
                quantity: Set(quantity),
                unit_cost: Set(unit_cost),
                total_cost: Set(round_money(quantity * unit_cost)),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }
        txn.commit().await?;

        Ok(PurchaseResponse::new(purchase, items))
    }

    pub async fn get(&self, ctx: &AuthContext, purchase_id: Uuid) -> AppResult<PurchaseResponse> {
        let purchase = self.find(ctx, purchase_id).await?;
        let items = purchase_items::Entity::find()
            .filter(purchase_items::Column::PurchaseId.eq(purchase.id))
            .all(&self.pool)
            .await?;
        Ok(PurchaseResponse::new(purchase, items))
    }

    /// 确认入库：同一事务内增加库存、更新原料成本、标记已确认
    pub async fn confirm(
        &self,
        ctx: &AuthContext,
        purchase_id: Uuid,
    ) -> AppResult<PurchaseResponse> {
        self.find(ctx, purchase_id).await?;

        let txn = self.pool.begin().await?;
        let now = Utc::now();

        // 只有 PENDING 能被确认，重复确认时影响行数为 0
        let claimed = purchases::Entity::update_many()
            .set(purchases::ActiveModel {
                status: Set(PurchaseStatus::Confirmed),
                confirmed_by: Set(Some(ctx.user_id)),
                confirmed_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(purchases::Column::Id.eq(purchase_id))
            .filter(purchases::Column::Status.eq(PurchaseStatus::Pending))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(AppError::ValidationError(
                "Only pending purchases can be confirmed".into(),
            ));
        }

        let items = purchase_items::Entity::find()
            .filter(purchase_items::Column::PurchaseId.eq(purchase_id))
            .all(&txn)
            .await?;
        for item in &items {
            let result = ingredients::Entity::update_many()
                .col_expr(
                    ingredients::Column::CurrentStock,
                    Expr::col(ingredients::Column::CurrentStock).add(item.quantity),
                )
                .col_expr(ingredients::Column::UnitCost, Expr::value(item.unit_cost))
                .col_expr(ingredients::Column::UpdatedAt, Expr::value(now))
                .filter(ingredients::Column::Id.eq(item.ingredient_id))
                .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
                .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::not_found("Ingredient"));
            }
        }

        let purchase = purchases::Entity::find_by_id(purchase_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase"))?;
        txn.commit().await?;

        log::info!(
            "Purchase {} confirmed by {}: {} items, total {:.2}",
            purchase.id,
            ctx.user_id,
            items.len(),
            purchase.total_cost
        );
        Ok(PurchaseResponse::new(purchase, items))
    }

    async fn find(&self, ctx: &AuthContext, purchase_id: Uuid) -> AppResult<purchases::Model> {
        purchases::Entity::find_by_id(purchase_id)
            .filter(purchases::Column::TenantId.eq(ctx.tenant_id))
            .filter(purchases::Column::CompanyId.eq(ctx.company_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase"))
    }
}

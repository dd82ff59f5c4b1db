use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::money::ensure_amount;
use crate::domain::stock::{self, RecipeLine, StockRequirement};
use crate::entities::{ingredient_entity as ingredients, recipe_ingredient_entity as recipes};
use crate::error::{AppError, AppResult};
use crate::models::{AdjustStockRequest, AuthContext, CreateIngredientRequest, IngredientResponse};

#[derive(Clone)]
pub struct StockService {
    pool: DatabaseConnection,
}

impl StockService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_ingredient(
        &self,
        ctx: &AuthContext,
        req: CreateIngredientRequest,
    ) -> AppResult<IngredientResponse> {
        let name = req.name.trim();
        if name.is_empty() || req.unit.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Ingredient name and unit are required".into(),
            ));
        }
        let current_stock = req.current_stock.unwrap_or(0.0);
        let min_stock = req.min_stock.unwrap_or(0.0);
        if current_stock < 0.0 || min_stock < 0.0 || req.max_stock.is_some_and(|m| m < 0.0) {
            return Err(AppError::ValidationError(
                "Stock levels cannot be negative".into(),
            ));
        }

        let now = Utc::now();
        let model = ingredients::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            name: Set(name.to_string()),
            unit: Set(req.unit.trim().to_string()),
            current_stock: Set(current_stock),
            min_stock: Set(min_stock),
            max_stock: Set(req.max_stock),
            unit_cost: Set(ensure_amount(req.unit_cost.unwrap_or(0.0))),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        Ok(model.into())
    }

    pub async fn list_ingredients(&self, ctx: &AuthContext) -> AppResult<Vec<IngredientResponse>> {
        let list = ingredients::Entity::find()
            .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
            .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
            .order_by_asc(ingredients::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 低于安全库存的原料
    pub async fn list_low_stock(&self, ctx: &AuthContext) -> AppResult<Vec<IngredientResponse>> {
        let list = ingredients::Entity::find()
            .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
            .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
            .filter(
                Expr::col(ingredients::Column::CurrentStock)
                    .lt(Expr::col(ingredients::Column::MinStock)),
            )
            .order_by_asc(ingredients::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 手工盘点调整，结果不能为负
    pub async fn adjust_stock(
        &self,
        ctx: &AuthContext,
        ingredient_id: Uuid,
        req: AdjustStockRequest,
    ) -> AppResult<IngredientResponse> {
        let delta = req
            .delta
            .ok_or_else(|| AppError::ValidationError("delta must be a number".into()))?;

        let ingredient = find_ingredient(&self.pool, ctx, ingredient_id).await?;
        stock::adjusted_stock(&ingredient.name, ingredient.current_stock, delta)?;

        let txn = self.pool.begin().await?;
        let requirement = StockRequirement {
            ingredient_id,
            quantity: -delta,
        };
        apply_requirements(&txn, ctx, &[requirement]).await?;
        let updated = find_ingredient(&txn, ctx, ingredient_id).await?;
        txn.commit().await?;

        log::info!(
            "Stock of ingredient {} adjusted by {} by user {} ({})",
            ingredient_id,
            delta,
            ctx.user_id,
            req.reason.as_deref().unwrap_or("no reason")
        );
        Ok(updated.into())
    }
}

async fn find_ingredient<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    ingredient_id: Uuid,
) -> AppResult<ingredients::Model> {
    ingredients::Entity::find_by_id(ingredient_id)
        .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
        .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient"))
}

/// 读取一批菜品的配方
pub async fn load_recipes<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    product_ids: &[Uuid],
) -> AppResult<Vec<RecipeLine>> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }
    let lines = recipes::Entity::find()
        .filter(recipes::Column::TenantId.eq(ctx.tenant_id))
        .filter(recipes::Column::CompanyId.eq(ctx.company_id))
        .filter(recipes::Column::ProductId.is_in(product_ids.to_vec()))
        .all(conn)
        .await?;
    Ok(lines
        .into_iter()
        .map(|l| RecipeLine {
            product_id: l.product_id,
            ingredient_id: l.ingredient_id,
            quantity_per_unit: l.quantity,
        })
        .collect())
}

/// 按配方扣减/回补一批明细的原料
///
/// `items` 为 (product_id, 份数变化量)；必须在调用方事务内执行，
/// 任一原料不足时返回错误，由调用方回滚整个事务。
pub async fn consume_for_items<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    items: &[(Uuid, i32)],
) -> AppResult<()> {
    let mut product_ids: Vec<Uuid> = items.iter().map(|(id, _)| *id).collect();
    product_ids.sort();
    product_ids.dedup();

    let recipe_lines = load_recipes(conn, ctx, &product_ids).await?;
    let requirements = stock::requirements(&recipe_lines, items);
    apply_requirements(conn, ctx, &requirements).await
}

/// 条件原子更新：UPDATE ... SET current_stock = current_stock - q WHERE current_stock >= q
pub async fn apply_requirements<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    requirements: &[StockRequirement],
) -> AppResult<()> {
    let now = Utc::now();
    for req in requirements {
        let base = ingredients::Entity::update_many()
            .col_expr(ingredients::Column::UpdatedAt, Expr::value(now))
            .filter(ingredients::Column::Id.eq(req.ingredient_id))
            .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
            .filter(ingredients::Column::CompanyId.eq(ctx.company_id));

        let result = if req.is_consumption() {
            base.col_expr(
                ingredients::Column::CurrentStock,
                Expr::col(ingredients::Column::CurrentStock).sub(req.quantity),
            )
            .filter(ingredients::Column::CurrentStock.gte(req.quantity))
            .exec(conn)
            .await?
        } else {
            base.col_expr(
                ingredients::Column::CurrentStock,
                Expr::col(ingredients::Column::CurrentStock).add(-req.quantity),
            )
            .exec(conn)
            .await?
        };

        if result.rows_affected == 0 {
            let ingredient = find_ingredient(conn, ctx, req.ingredient_id).await?;
            log::warn!(
                "Stock update for ingredient {} matched no row: required {}, available {}",
                ingredient.id,
                req.quantity,
                ingredient.current_stock
            );
            stock::check_available(&ingredient.name, req.quantity, ingredient.current_stock)?;
            // 读到的库存已足够：条件更新期间被并发修改
            return Err(AppError::Conflict(format!(
                "Stock of ingredient \"{}\" changed concurrently, retry",
                ingredient.name
            )));
        }
    }
    Ok(())
}

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::lifecycle;
use crate::domain::money::round_money;
use crate::entities::{
    ingredient_entity as ingredients, product_entity as products,
    recipe_ingredient_entity as recipes,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthContext, CreateProductRequest, ProductResponse, RecipeLineResponse, SetRecipeRequest,
};

/// 菜品与配方
#[derive(Clone)]
pub struct CatalogService {
    pool: DatabaseConnection,
}

impl CatalogService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_product(
        &self,
        ctx: &AuthContext,
        req: CreateProductRequest,
    ) -> AppResult<ProductResponse> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Product name is required".into()));
        }
        let price = req
            .price
            .map(round_money)
            .filter(|p| *p >= 0.0)
            .ok_or_else(|| AppError::ValidationError("price must be a non-negative number".into()))?;
        let prep_time_minutes = lifecycle::ensure_prep_time(req.prep_time_minutes.unwrap_or(0))?;

        let now = Utc::now();
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            name: Set(name.to_string()),
            price: Set(price),
            prep_time_minutes: Set(prep_time_minutes),
            is_active: Set(req.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        Ok(product.into())
    }

    pub async fn list_products(&self, ctx: &AuthContext) -> AppResult<Vec<ProductResponse>> {
        let list = products::Entity::find()
            .filter(products::Column::TenantId.eq(ctx.tenant_id))
            .filter(products::Column::CompanyId.eq(ctx.company_id))
            .order_by_asc(products::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn get_recipe(
        &self,
        ctx: &AuthContext,
        product_id: Uuid,
    ) -> AppResult<Vec<RecipeLineResponse>> {
        self.ensure_product(ctx, product_id).await?;
        let lines = recipes::Entity::find()
            .filter(recipes::Column::TenantId.eq(ctx.tenant_id))
            .filter(recipes::Column::CompanyId.eq(ctx.company_id))
            .filter(recipes::Column::ProductId.eq(product_id))
            .order_by_asc(recipes::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(lines.into_iter().map(Into::into).collect())
    }

    /// 整体替换菜品配方
    pub async fn set_recipe(
        &self,
        ctx: &AuthContext,
        product_id: Uuid,
        req: SetRecipeRequest,
    ) -> AppResult<Vec<RecipeLineResponse>> {
        self.ensure_product(ctx, product_id).await?;

        let mut seen = HashSet::new();
        for line in &req.lines {
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(AppError::ValidationError(
                    "Recipe quantities must be greater than zero".into(),
                ));
            }
            if !seen.insert(line.ingredient_id) {
                return Err(AppError::ValidationError(
                    "An ingredient can only appear once in a recipe".into(),
                ));
            }
        }

        if !seen.is_empty() {
            let known = ingredients::Entity::find()
                .filter(ingredients::Column::TenantId.eq(ctx.tenant_id))
                .filter(ingredients::Column::CompanyId.eq(ctx.company_id))
                .filter(ingredients::Column::Id.is_in(seen.iter().copied().collect::<Vec<_>>()))
                .count(&self.pool)
                .await?;
            if known as usize != seen.len() {
                return Err(AppError::not_found("Ingredient"));
            }
        }

        let txn = self.pool.begin().await?;
        recipes::Entity::delete_many()
            .filter(recipes::Column::TenantId.eq(ctx.tenant_id))
            .filter(recipes::Column::CompanyId.eq(ctx.company_id))
            .filter(recipes::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(req.lines.len());
        for line in req.lines {
            let model = recipes::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(ctx.tenant_id),
                company_id: Set(ctx.company_id),
                product_id: Set(product_id),
                ingredient_id: Set(line.ingredient_id),
                quantity: Set(line.quantity),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push(model);
        }
        txn.commit().await?;

        log::info!(
            "Recipe of product {} replaced with {} lines by {}",
            product_id,
            created.len(),
            ctx.user_id
        );
        Ok(created.into_iter().map(Into::into).collect())
    }

    async fn ensure_product(&self, ctx: &AuthContext, product_id: Uuid) -> AppResult<products::Model> {
        products::Entity::find_by_id(product_id)
            .filter(products::Column::TenantId.eq(ctx.tenant_id))
            .filter(products::Column::CompanyId.eq(ctx.company_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))
    }
}

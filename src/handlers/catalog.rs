use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::{CatalogService, StockService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/products",
    tag = "catalog",
    request_body = CreateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "菜品已创建", body = ProductResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_product(
    service: web::Data<CatalogService>,
    req: HttpRequest,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.create_product(&ctx, body.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "catalog",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜品列表", body = [ProductResponse])
    )
)]
pub async fn list_products(
    service: web::Data<CatalogService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    match service.list_products(&ctx).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}/recipe",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "菜品ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "菜品配方", body = [RecipeLineResponse]),
        (status = 404, description = "菜品不存在")
    )
)]
pub async fn get_recipe(
    service: web::Data<CatalogService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.get_recipe(&ctx, path.into_inner()).await {
        Ok(lines) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": lines }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/products/{id}/recipe",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "菜品ID")),
    request_body = SetRecipeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "配方已替换", body = [RecipeLineResponse]),
        (status = 400, description = "用量不合法或原料重复"),
        (status = 404, description = "菜品或原料不存在")
    )
)]
pub async fn set_recipe(
    service: web::Data<CatalogService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<SetRecipeRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service
        .set_recipe(&ctx, path.into_inner(), body.into_inner())
        .await
    {
        Ok(lines) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": lines }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/ingredients",
    tag = "catalog",
    request_body = CreateIngredientRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "原料已创建", body = IngredientResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_ingredient(
    service: web::Data<StockService>,
    req: HttpRequest,
    body: web::Json<CreateIngredientRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.create_ingredient(&ctx, body.into_inner()).await {
        Ok(ingredient) => {
            Ok(HttpResponse::Created().json(json!({ "success": true, "data": ingredient })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/ingredients",
    tag = "catalog",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "原料列表", body = [IngredientResponse])
    )
)]
pub async fn list_ingredients(
    service: web::Data<StockService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.list_ingredients(&ctx).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/ingredients/low-stock",
    tag = "catalog",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "低于安全库存的原料", body = [IngredientResponse])
    )
)]
pub async fn list_low_stock(
    service: web::Data<StockService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.list_low_stock(&ctx).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/ingredients/{id}/adjust",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "原料ID")),
    request_body = AdjustStockRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "库存已调整", body = IngredientResponse),
        (status = 400, description = "调整后库存为负"),
        (status = 404, description = "原料不存在")
    )
)]
/// 盘点调整，delta 可正可负
pub async fn adjust_stock(
    service: web::Data<StockService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service
        .adjust_stock(&ctx, path.into_inner(), body.into_inner())
        .await
    {
        Ok(ingredient) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": ingredient }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::post().to(create_product))
            .route("", web::get().to(list_products))
            .route("/{id}/recipe", web::get().to(get_recipe))
            .route("/{id}/recipe", web::put().to(set_recipe)),
    )
    .service(
        web::scope("/ingredients")
            .route("", web::post().to(create_ingredient))
            .route("", web::get().to(list_ingredients))
            .route("/low-stock", web::get().to(list_low_stock))
            .route("/{id}/adjust", web::post().to(adjust_stock)),
    );
}

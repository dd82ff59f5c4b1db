use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::PurchaseService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/purchases",
    tag = "purchase",
    request_body = CreatePurchaseRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "采购单已创建（PENDING）", body = PurchaseResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "原料不存在")
    )
)]
pub async fn create_purchase(
    service: web::Data<PurchaseService>,
    req: HttpRequest,
    body: web::Json<CreatePurchaseRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.create(&ctx, body.into_inner()).await {
        Ok(purchase) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": purchase }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/purchases/{id}",
    tag = "purchase",
    params(("id" = Uuid, Path, description = "采购单ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "采购单详情", body = PurchaseResponse),
        (status = 404, description = "采购单不存在")
    )
)]
pub async fn get_purchase(
    service: web::Data<PurchaseService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.get(&ctx, path.into_inner()).await {
        Ok(purchase) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": purchase }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/purchases/{id}/confirm",
    tag = "purchase",
    params(("id" = Uuid, Path, description = "采购单ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已入库", body = PurchaseResponse),
        (status = 400, description = "采购单不是待确认状态"),
        (status = 404, description = "采购单不存在")
    )
)]
/// 确认入库：增加库存并更新原料成本
pub async fn confirm_purchase(
    service: web::Data<PurchaseService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::BACK_OFFICE)?;
    match service.confirm(&ctx, path.into_inner()).await {
        Ok(purchase) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": purchase }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn purchase_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchases")
            .route("", web::post().to(create_purchase))
            .route("/{id}", web::get().to(get_purchase))
            .route("/{id}/confirm", web::post().to(confirm_purchase)),
    );
}

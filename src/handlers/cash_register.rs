use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::CashRegisterService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/cash-registers/open",
    tag = "cash_register",
    request_body = OpenCashRegisterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "开台成功", body = CashRegisterResponse),
        (status = 403, description = "无权限"),
        (status = 409, description = "已有营业中的收银台")
    )
)]
pub async fn open_register(
    service: web::Data<CashRegisterService>,
    req: HttpRequest,
    body: Option<web::Json<OpenCashRegisterRequest>>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    match service.open(&ctx, body).await {
        Ok(register) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": register }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cash-registers/close",
    tag = "cash_register",
    request_body = CloseCashRegisterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "关台成功，返回应有余额与差额", body = CashRegisterResponse),
        (status = 404, description = "没有营业中的收银台")
    )
)]
/// 关台：按全部流水重算应有余额并记录差额
pub async fn close_register(
    service: web::Data<CashRegisterService>,
    req: HttpRequest,
    body: web::Json<CloseCashRegisterRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service.close(&ctx, body.into_inner()).await {
        Ok(register) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": register }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cash-registers/current",
    tag = "cash_register",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "营业中的收银台及流水", body = CashRegisterDetailResponse),
        (status = 404, description = "没有营业中的收银台")
    )
)]
pub async fn current_register(
    service: web::Data<CashRegisterService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service.current(&ctx).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": detail }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cash-registers/movements",
    tag = "cash_register",
    request_body = CashMovementRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "流水已记录", body = CashMovementResponse),
        (status = 400, description = "系统流水类型或金额不合法"),
        (status = 404, description = "没有营业中的收银台")
    )
)]
/// 手工流水：withdrawal / deposit / expense / adjustment
pub async fn add_movement(
    service: web::Data<CashRegisterService>,
    req: HttpRequest,
    body: web::Json<CashMovementRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service.add_movement(&ctx, body.into_inner()).await {
        Ok(movement) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": movement }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn cash_register_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cash-registers")
            .route("/open", web::post().to(open_register))
            .route("/close", web::post().to(close_register))
            .route("/current", web::get().to(current_register))
            .route("/movements", web::post().to(add_movement)),
    );
}

use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::PaymentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/orders/{id}/payments",
    tag = "payment",
    params(("id" = Uuid, Path, description = "订单ID")),
    request_body = CreatePaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "支付已登记（PENDING）", body = PaymentResponse),
        (status = 400, description = "金额不合法或订单已结束"),
        (status = 403, description = "无权限"),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn create_payment(
    service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service
        .create_payment(&ctx, path.into_inner(), body.into_inner())
        .await
    {
        Ok(payment) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": payment }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{id}/payments",
    tag = "payment",
    params(("id" = Uuid, Path, description = "订单ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单的支付记录", body = [PaymentResponse]),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn list_payments(
    service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service.list_payments(&ctx, path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/orders/{id}/quick-payment",
    tag = "payment",
    params(("id" = Uuid, Path, description = "订单ID")),
    request_body = QuickPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "收款结果；已付清时 payment 为空", body = QuickPaymentResponse),
        (status = 400, description = "金额不合法或订单已结束"),
        (status = 403, description = "无权限"),
        (status = 404, description = "订单不存在")
    )
)]
/// 快速收款：按未付金额直接生成已完成支付，有营业中的收银台时记 SALE 流水
pub async fn quick_payment(
    service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: Option<web::Json<QuickPaymentRequest>>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    match service.quick_payment(&ctx, path.into_inner(), body).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/payments/{id}/status",
    tag = "payment",
    params(("id" = Uuid, Path, description = "支付ID")),
    request_body = UpdatePaymentStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "状态已更新", body = PaymentResponse),
        (status = 400, description = "非法的支付状态流转"),
        (status = 403, description = "无权限"),
        (status = 404, description = "支付不存在")
    )
)]
pub async fn update_payment_status(
    service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentStatusRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::CASH_HANDLING)?;
    match service
        .update_status(&ctx, path.into_inner(), body.into_inner())
        .await
    {
        Ok(payment) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": payment }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders/{id}/payments")
            .route(web::post().to(create_payment))
            .route(web::get().to(list_payments)),
    )
    .route("/orders/{id}/quick-payment", web::post().to(quick_payment))
    .route("/payments/{id}/status", web::patch().to(update_payment_status));
}

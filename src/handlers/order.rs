use crate::entities::{OrderChannel, OrderStatus};
use crate::error::AppError;
use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "开单成功", body = OrderResponse),
        (status = 400, description = "参数错误或原料不足"),
        (status = 401, description = "未授权"),
        (status = 403, description = "无权限")
    )
)]
/// 开单：扣减原料、计算合计并通知厨房
pub async fn create_order(
    service: web::Data<OrderService>,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::ORDER_TAKING)?;
    match service.create_order(&ctx, body.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "order",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<OrderStatus>, Query, description = "订单状态"),
        ("channel" = Option<OrderChannel>, Query, description = "下单渠道")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取订单列表成功", body = PaginatedOrderResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_orders(
    service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    match service.list_orders(&ctx, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "order",
    params(("id" = Uuid, Path, description = "订单ID")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取订单成功", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    match service.get_order(&ctx, path.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/orders/{id}",
    tag = "order",
    params(("id" = Uuid, Path, description = "订单ID")),
    request_body = UpdateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "修改成功", body = OrderResponse),
        (status = 400, description = "订单状态不允许修改、明细已送厨或原料不足"),
        (status = 404, description = "订单不存在")
    )
)]
/// 修改订单头信息、已有明细，追加新明细
pub async fn update_order(
    service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    ctx.require_any(Role::ORDER_TAKING)?;
    match service
        .update_order(&ctx, path.into_inner(), body.into_inner())
        .await
    {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/orders/{id}/status/{status}",
    tag = "order",
    params(
        ("id" = Uuid, Path, description = "订单ID"),
        ("status" = String, Path, description = "目标状态：preparing / ready / delivered / closed / cancelled")
    ),
    request_body = UpdateOrderStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "状态已更新", body = OrderResponse),
        (status = 400, description = "非法流转、未付清或缺少取消原因"),
        (status = 403, description = "无权限"),
        (status = 404, description = "订单不存在")
    )
)]
/// 订单状态流转；取消时需要 cancellation_reason
pub async fn update_order_status(
    service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<(Uuid, String)>,
    body: Option<web::Json<UpdateOrderStatusRequest>>,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    let (order_id, raw_status) = path.into_inner();
    let target: OrderStatus = raw_status.parse().map_err(AppError::ValidationError)?;
    let body = body.map(|b| b.into_inner()).unwrap_or_default();

    match service.update_status(&ctx, order_id, target, body).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": order }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 不使用 /orders scope，支付路由同样挂在 /orders/{id} 下
pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders")
            .route(web::post().to(create_order))
            .route(web::get().to(get_orders)),
    )
    .service(
        web::resource("/orders/{id}")
            .route(web::get().to(get_order))
            .route(web::patch().to(update_order)),
    )
    .route("/orders/{id}/status/{status}", web::patch().to(update_order_status));
}

use std::convert::Infallible;

use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use futures_util::stream;
use serde_json::json;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use uuid::Uuid;

use crate::external::BroadcastKitchenNotifier;
use crate::middlewares::current_auth;
use crate::models::*;
use crate::services::OrderService;

/// 把事件编码为一条 SSE 消息
fn sse_frame(event: &KitchenEvent) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Bytes::from(format!(
            "event: {}\ndata: {}\n\n",
            event.event_name(),
            data
        ))),
        Err(e) => {
            log::error!("Failed to encode kitchen event: {e}");
            None
        }
    }
}

/// 从广播通道取下一条属于本门店的事件；通道关闭时结束
async fn next_frame(rx: &mut Receiver<KitchenEvent>, company_id: Uuid) -> Option<Bytes> {
    loop {
        match rx.recv().await {
            Ok(event) if event.company_id() == company_id => {
                if let Some(frame) = sse_frame(&event) {
                    return Some(frame);
                }
            }
            Ok(_) => {}
            // 屏幕处理太慢，丢掉积压的事件继续推送
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Kitchen screen of company {company_id} lagged, {skipped} events skipped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[utoipa::path(
    get,
    path = "/kitchen/events",
    tag = "kitchen",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "text/event-stream：new_order / order_updated / order_cancelled"),
        (status = 401, description = "未授权")
    )
)]
/// 厨房显示屏订阅（SSE），只推送当前门店的事件
pub async fn kitchen_events(
    notifier: web::Data<BroadcastKitchenNotifier>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    let company_id = ctx.company_id;
    let rx = notifier.subscribe();
    log::info!("Kitchen screen connected: user {} company {}", ctx.user_id, company_id);

    let body = stream::unfold(rx, move |mut rx| async move {
        next_frame(&mut rx, company_id)
            .await
            .map(|frame| (Ok::<_, Infallible>(frame), rx))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

#[utoipa::path(
    get,
    path = "/kitchen/orders",
    tag = "kitchen",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "制作中与待出餐的订单", body = [KitchenOrderSnapshot]),
        (status = 401, description = "未授权")
    )
)]
pub async fn kitchen_orders(
    service: web::Data<OrderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let ctx = current_auth(&req)?;
    match service.kitchen_orders(&ctx).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn kitchen_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/kitchen")
            .route("/events", web::get().to(kitchen_events))
            .route("/orders", web::get().to(kitchen_orders)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::KitchenNotifier;

    #[test]
    fn sse_frame_carries_event_name_and_payload() {
        let company_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let event = KitchenEvent::OrderCancelled {
            company_id,
            order_id,
        };

        let frame = sse_frame(&event).expect("frame");
        let text = std::str::from_utf8(&frame).expect("utf8");
        assert!(text.starts_with("event: order_cancelled\ndata: {"));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains(&order_id.to_string()));
    }

    #[tokio::test]
    async fn next_frame_skips_other_companies() {
        let notifier = BroadcastKitchenNotifier::new(8);
        let mut rx = notifier.subscribe();
        let mine = Uuid::new_v4();
        let order_id = Uuid::new_v4();

        notifier.notify_order_cancelled(Uuid::new_v4(), Uuid::new_v4());
        notifier.notify_order_cancelled(mine, order_id);

        let frame = next_frame(&mut rx, mine).await.expect("frame");
        let text = std::str::from_utf8(&frame).expect("utf8");
        assert!(text.contains(&order_id.to_string()));
    }
}

use crate::models::PixWebhookPayload;
use crate::services::{PaymentService, WebhookOutcome};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// PIX 网关回调
///
/// 处理失败时仍返回 200 避免网关重试，错误记录在日志中
pub async fn pix_webhook(
    service: web::Data<PaymentService>,
    req: HttpRequest,
    body: web::Json<PixWebhookPayload>,
) -> Result<HttpResponse> {
    let secret = req
        .headers()
        .get("x-webhook-secret")
        .and_then(|value| value.to_str().ok());
    if let Err(e) = service.verify_webhook_secret(secret) {
        log::warn!("Rejected PIX webhook: {e}");
        return Ok(e.error_response());
    }

    let payload = body.into_inner();
    log::info!(
        "Received PIX webhook for {} with status {}",
        payload.correlation_id,
        payload.status
    );

    match service.handle_pix_webhook(payload).await {
        Ok(outcome) => {
            let applied = matches!(outcome, WebhookOutcome::Applied(_));
            Ok(HttpResponse::Ok().json(json!({ "received": true, "applied": applied })))
        }
        Err(e) => {
            log::error!("Failed to process PIX webhook: {e}");
            Ok(HttpResponse::Ok().json(json!({
                "received": true,
                "error": format!("Processing failed: {}", e)
            })))
        }
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/pix", web::post().to(pix_webhook)));
}

use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::database::{DbPool, ping};

/// 存活检查，附带一次数据库 ping
pub async fn health(pool: web::Data<DbPool>) -> Result<HttpResponse> {
    match ping(&pool).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "status": "ok" }))),
        Err(e) => {
            log::error!("Health check failed: {e}");
            Ok(e.error_response())
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}

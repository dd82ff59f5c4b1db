use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| {
            // 前端与 KDS 屏幕部署在各门店自有域名下
            true
        })
        .allowed_methods(vec!["GET", "POST", "PATCH", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec!["content-type"])
        .supports_credentials()
        .max_age(3600)
}

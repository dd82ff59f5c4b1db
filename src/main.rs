use std::io::Write;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use chrono::Local;
use env_logger::{Env, Target};

use comanda_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{BroadcastKitchenNotifier, SharedKitchenNotifier},
    handlers,
    middlewares::{AuthMiddleware, create_cors, request_logger},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 厨房推送：服务持有 trait 对象，SSE 处理器直接订阅广播
    let kitchen = BroadcastKitchenNotifier::new(config.kitchen.channel_capacity);
    let kitchen_notifier: SharedKitchenNotifier = Arc::new(kitchen.clone());

    if config.pix.webhook_secret.is_empty() {
        log::warn!("PIX webhook secret is not configured, gateway callbacks will be rejected");
    }

    // 创建服务
    let order_service = OrderService::new(pool.clone(), kitchen_notifier);
    let payment_service = PaymentService::new(pool.clone(), config.pix.webhook_secret.clone());
    let cash_register_service = CashRegisterService::new(pool.clone());
    let catalog_service = CatalogService::new(pool.clone());
    let stock_service = StockService::new(pool.clone());
    let purchase_service = PurchaseService::new(pool.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(request_logger())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(kitchen.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(cash_register_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(stock_service.clone()))
            .app_data(web::Data::new(purchase_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::order_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::cash_register_config)
                    .configure(handlers::catalog_config)
                    .configure(handlers::purchase_config)
                    .configure(handlers::kitchen_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

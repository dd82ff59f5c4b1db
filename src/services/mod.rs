pub mod cash_register_service;
pub mod catalog_service;
pub mod order_service;
pub mod payment_service;
pub mod purchase_service;
pub mod stock_service;
#[cfg(test)]
mod testing;

pub use cash_register_service::CashRegisterService;
pub use catalog_service::CatalogService;
pub use order_service::OrderService;
pub use payment_service::{PaymentService, WebhookOutcome};
pub use purchase_service::PurchaseService;
pub use stock_service::StockService;

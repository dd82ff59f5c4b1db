pub mod cash_register;
pub mod catalog;
pub mod health;
pub mod kitchen;
pub mod order;
pub mod payment;
pub mod purchase;
pub mod webhook;

pub use cash_register::cash_register_config;
pub use catalog::catalog_config;
pub use health::health_config;
pub use kitchen::kitchen_config;
pub use order::order_config;
pub use payment::payment_config;
pub use purchase::purchase_config;
pub use webhook::webhook_config;

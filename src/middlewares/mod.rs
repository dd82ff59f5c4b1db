pub mod auth;
pub mod cors;
pub mod logger;

pub use auth::{AuthMiddleware, current_auth};
pub use cors::create_cors;
pub use logger::request_logger;

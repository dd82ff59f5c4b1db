pub mod auth;
pub mod cash_register;
pub mod catalog;
pub mod kitchen;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod purchase;

pub use auth::*;
pub use cash_register::*;
pub use catalog::*;
pub use kitchen::*;
pub use order::*;
pub use pagination::*;
pub use payment::*;
pub use purchase::*;

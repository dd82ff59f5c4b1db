use thiserror::Error;

use crate::entities::{OrderStatus, PaymentStatus};

/// 业务规则校验失败，统一映射为 400
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Order cannot be modified while {0}")]
    CannotModify(OrderStatus),

    #[error("Item \"{0}\" was already sent to the kitchen and is locked")]
    LockedItem(String),

    #[error("Insufficient stock for ingredient \"{name}\": required {required}, available {available}")]
    InsufficientStock {
        name: String,
        required: f64,
        available: f64,
    },

    #[error("Payment incomplete: paid {paid:.2} of {total:.2}")]
    PaymentIncomplete { paid: f64, total: f64 },

    #[error("A cancellation reason is required to cancel an order")]
    CancellationReasonRequired,

    #[error("Invalid order status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("{0}")]
    Invalid(String),
}

use super::error::DomainError;
use super::money::{PAYMENT_EPSILON, ensure_amount, round_money};
use crate::entities::PaymentStatus;

/// 支付状态机
/// PENDING -> COMPLETED / FAILED / CANCELLED
/// COMPLETED -> REFUNDED / PARTIALLY_REFUNDED
/// PARTIALLY_REFUNDED -> REFUNDED
pub fn ensure_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), DomainError> {
    use PaymentStatus::*;

    let allowed = matches!(
        (from, to),
        (Pending, Completed | Failed | Cancelled)
            | (Completed, Refunded | PartiallyRefunded)
            | (PartiallyRefunded, Refunded)
    );
    if allowed {
        Ok(())
    } else {
        Err(DomainError::InvalidPaymentTransition { from, to })
    }
}

/// 已完成支付金额合计
pub fn paid_amount<I>(payments: I) -> f64
where
    I: IntoIterator<Item = (PaymentStatus, f64)>,
{
    round_money(
        payments
            .into_iter()
            .filter(|(status, _)| *status == PaymentStatus::Completed)
            .map(|(_, amount)| ensure_amount(amount))
            .sum(),
    )
}

/// 快速收款金额：min(requested ?? outstanding, outstanding)
/// 已付清返回 None，不再生成新的支付
pub fn quick_payment_amount(
    total: f64,
    paid: f64,
    requested: Option<f64>,
) -> Result<Option<f64>, DomainError> {
    let outstanding = round_money(total - paid);
    if outstanding <= PAYMENT_EPSILON {
        return Ok(None);
    }

    let amount = match requested {
        Some(requested) if !requested.is_finite() || requested <= 0.0 => {
            return Err(DomainError::Invalid(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        Some(requested) => round_money(requested.min(outstanding)),
        None => outstanding,
    };
    Ok(Some(amount))
}

/// PIX 网关回调状态映射，未知状态返回 None
pub fn map_pix_status(raw: &str) -> Option<PaymentStatus> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "COMPLETED" | "CONFIRMED" => Some(PaymentStatus::Completed),
        "FAILED" | "ERROR" => Some(PaymentStatus::Failed),
        "EXPIRED" | "CANCELLED" => Some(PaymentStatus::Cancelled),
        _ => None,
    }
}

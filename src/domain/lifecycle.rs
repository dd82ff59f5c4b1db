//! 订单状态流转
//!
//! OPEN -> PREPARING -> READY -> DELIVERED -> CLOSED，任意非终态 -> CANCELLED。
//! `transition` 是纯函数：给定当前状态与请求，返回需要写回的状态、时间戳，
//! 以及是否需要冻结明细；是否落库由服务层在事务内完成。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::DomainError;
use super::money::PAYMENT_EPSILON;
use crate::entities::OrderStatus;

/// 各阶段时间戳与操作人，只写一次
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LifecycleStamps {
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub closed_by: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    pub status: OrderStatus,
    pub total: f64,
    pub stamps: LifecycleStamps,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest<'a> {
    pub target: OrderStatus,
    pub actor: Uuid,
    /// 已完成（COMPLETED）支付的合计
    pub paid_amount: f64,
    pub cancellation_reason: Option<&'a str>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub stamps: LifecycleStamps,
    /// 进入 PREPARING 时需要给未送厨的明细写 sent_to_kitchen_at
    pub freeze_items: bool,
    pub cancellation_reason: Option<String>,
}

impl Transition {
    pub fn is_cancellation(&self) -> bool {
        self.to == OrderStatus::Cancelled
    }
}

/// 明细增改只允许在 OPEN / PREPARING
pub fn ensure_items_modifiable(status: OrderStatus) -> Result<(), DomainError> {
    if status.accepts_item_changes() {
        Ok(())
    } else {
        Err(DomainError::CannotModify(status))
    }
}

/// 已付金额是否覆盖订单合计（含 PAYMENT_EPSILON 容差）
pub fn ensure_paid(total: f64, paid: f64) -> Result<(), DomainError> {
    if paid >= total - PAYMENT_EPSILON {
        Ok(())
    } else {
        Err(DomainError::PaymentIncomplete { paid, total })
    }
}

/// 单个明细的制作时间上限（分钟）
pub const MAX_PREP_TIME_MINUTES: i32 = 1440;

pub fn ensure_prep_time(minutes: i32) -> Result<i32, DomainError> {
    if (0..=MAX_PREP_TIME_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(DomainError::Invalid(format!(
            "prep_time_minutes must be between 0 and {MAX_PREP_TIME_MINUTES}"
        )))
    }
}

pub fn transition(
    state: &LifecycleState,
    req: &TransitionRequest<'_>,
) -> Result<Transition, DomainError> {
    let from = state.status;
    let to = req.target;

    let cancellation_reason = if to == OrderStatus::Cancelled {
        let reason = req
            .cancellation_reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(DomainError::CancellationReasonRequired)?;
        Some(reason.to_string())
    } else {
        None
    };

    if from.is_terminal() {
        return Err(DomainError::CannotModify(from));
    }

    // 不允许回退（READY -> PREPARING 等）；同状态视为幂等
    if let (Some(from_rank), Some(to_rank)) = (from.rank(), to.rank()) {
        if to_rank < from_rank {
            return Err(DomainError::InvalidTransition { from, to });
        }
    }

    if to == OrderStatus::Closed {
        ensure_paid(state.total, req.paid_amount)?;
    }

    Ok(Transition {
        from,
        to,
        stamps: stamp(state.stamps, to, req.actor, req.now),
        freeze_items: to == OrderStatus::Preparing,
        cancellation_reason,
    })
}

fn stamp(
    mut stamps: LifecycleStamps,
    to: OrderStatus,
    actor: Uuid,
    now: DateTime<Utc>,
) -> LifecycleStamps {
    match to {
        OrderStatus::Ready => {
            stamps.ready_at.get_or_insert(now);
        }
        OrderStatus::Delivered => {
            stamps.delivered_at.get_or_insert(now);
        }
        OrderStatus::Closed => {
            if stamps.closed_at.is_none() {
                stamps.closed_at = Some(now);
                stamps.closed_by = Some(actor);
            }
        }
        OrderStatus::Cancelled => {
            if stamps.cancelled_at.is_none() {
                stamps.cancelled_at = Some(now);
                stamps.cancelled_by = Some(actor);
            }
        }
        OrderStatus::Open | OrderStatus::Preparing => {}
    }
    stamps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(status: OrderStatus, total: f64) -> LifecycleState {
        LifecycleState {
            status,
            total,
            stamps: LifecycleStamps::default(),
        }
    }

    fn request(target: OrderStatus, paid_amount: f64) -> TransitionRequest<'static> {
        TransitionRequest {
            target,
            actor: Uuid::nil(),
            paid_amount,
            cancellation_reason: None,
            now: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path_stamps_each_stage_once() {
        let mut current = state(OrderStatus::Open, 40.0);
        for target in [
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Closed,
        ] {
            let t = transition(&current, &request(target, 40.0)).unwrap();
            assert_eq!(t.to, target);
            current = LifecycleState {
                status: t.to,
                total: current.total,
                stamps: t.stamps,
            };
        }
        assert!(current.stamps.ready_at.is_some());
        assert!(current.stamps.delivered_at.is_some());
        assert!(current.stamps.closed_at.is_some());
        assert_eq!(current.stamps.closed_by, Some(Uuid::nil()));
        assert!(current.stamps.cancelled_at.is_none());
    }

    #[test]
    fn test_preparing_freezes_items() {
        let t = transition(
            &state(OrderStatus::Open, 10.0),
            &request(OrderStatus::Preparing, 0.0),
        )
        .unwrap();
        assert!(t.freeze_items);

        let t = transition(
            &state(OrderStatus::Preparing, 10.0),
            &request(OrderStatus::Ready, 0.0),
        )
        .unwrap();
        assert!(!t.freeze_items);
    }

    #[test]
    fn test_repeated_transition_keeps_existing_stamps() {
        let earlier = Utc::now() - Duration::minutes(30);
        let current = LifecycleState {
            status: OrderStatus::Ready,
            total: 10.0,
            stamps: LifecycleStamps {
                ready_at: Some(earlier),
                ..Default::default()
            },
        };
        let t = transition(&current, &request(OrderStatus::Ready, 0.0)).unwrap();
        assert_eq!(t.stamps.ready_at, Some(earlier));
    }

    #[test]
    fn test_prep_time_is_bounded() {
        assert_eq!(ensure_prep_time(0), Ok(0));
        assert_eq!(ensure_prep_time(MAX_PREP_TIME_MINUTES), Ok(1440));
        assert!(ensure_prep_time(-1).is_err());
        assert!(ensure_prep_time(5000).is_err());
        assert!(ensure_prep_time(i32::MAX).is_err());
    }

    #[test]
    fn test_terminal_orders_reject_any_transition() {
        for terminal in [OrderStatus::Closed, OrderStatus::Cancelled] {
            for target in [
                OrderStatus::Open,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Delivered,
                OrderStatus::Closed,
            ] {
                let err = transition(&state(terminal, 0.0), &request(target, 0.0)).unwrap_err();
                assert_eq!(err, DomainError::CannotModify(terminal));
            }
            assert!(ensure_items_modifiable(terminal).is_err());
        }
    }

    #[test]
    fn test_item_changes_only_while_open_or_preparing() {
        assert!(ensure_items_modifiable(OrderStatus::Open).is_ok());
        assert!(ensure_items_modifiable(OrderStatus::Preparing).is_ok());
        assert_eq!(
            ensure_items_modifiable(OrderStatus::Ready),
            Err(DomainError::CannotModify(OrderStatus::Ready))
        );
        assert!(ensure_items_modifiable(OrderStatus::Delivered).is_err());
    }

    #[test]
    fn test_close_requires_full_payment() {
        let current = state(OrderStatus::Delivered, 100.0);
        let err = transition(&current, &request(OrderStatus::Closed, 60.0)).unwrap_err();
        assert_eq!(
            err,
            DomainError::PaymentIncomplete {
                paid: 60.0,
                total: 100.0
            }
        );

        let t = transition(&current, &request(OrderStatus::Closed, 60.0 + 40.0)).unwrap();
        assert_eq!(t.to, OrderStatus::Closed);
    }

    #[test]
    fn test_close_tolerates_rounding_epsilon() {
        let current = state(OrderStatus::Open, 33.33);
        assert!(transition(&current, &request(OrderStatus::Closed, 33.326)).is_ok());
        assert!(transition(&current, &request(OrderStatus::Closed, 33.32)).is_err());
    }

    #[test]
    fn test_cancel_requires_reason_from_any_status() {
        for from in [
            OrderStatus::Open,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Closed,
            OrderStatus::Cancelled,
        ] {
            let err = transition(&state(from, 0.0), &request(OrderStatus::Cancelled, 0.0))
                .unwrap_err();
            assert_eq!(err, DomainError::CancellationReasonRequired);
        }

        let mut req = request(OrderStatus::Cancelled, 0.0);
        req.cancellation_reason = Some("   ");
        assert_eq!(
            transition(&state(OrderStatus::Open, 0.0), &req).unwrap_err(),
            DomainError::CancellationReasonRequired
        );
    }

    #[test]
    fn test_cancel_records_reason_and_actor() {
        let actor = Uuid::new_v4();
        let mut req = request(OrderStatus::Cancelled, 0.0);
        req.actor = actor;
        req.cancellation_reason = Some(" customer left ");
        let t = transition(&state(OrderStatus::Preparing, 25.0), &req).unwrap();
        assert!(t.is_cancellation());
        assert_eq!(t.cancellation_reason.as_deref(), Some("customer left"));
        assert_eq!(t.stamps.cancelled_by, Some(actor));
        assert!(t.stamps.cancelled_at.is_some());
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let err = transition(
            &state(OrderStatus::Ready, 0.0),
            &request(OrderStatus::Preparing, 0.0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: OrderStatus::Ready,
                to: OrderStatus::Preparing
            }
        );
    }
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::money::{self, round_money};
use crate::domain::payment::{ensure_payment_transition, map_pix_status, quick_payment_amount};
use crate::entities::{
    CashMovementType, PaymentMethod, PaymentStatus, payment_entity as payments,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthContext, CashMovementResponse, CreatePaymentRequest, PaymentResponse, PixWebhookPayload,
    QuickPaymentRequest, QuickPaymentResponse, UpdatePaymentStatusRequest,
};
use crate::services::cash_register_service::{self, NewMovement};
use crate::services::order_service;

/// 回调处理结果，网关只需要知道是否已接收
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied(PaymentStatus),
    AlreadyApplied,
    Ignored,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    pix_webhook_secret: String,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, pix_webhook_secret: String) -> Self {
        Self {
            pool,
            pix_webhook_secret,
        }
    }

    /// 登记一笔待处理支付
    pub async fn create_payment(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
        req: CreatePaymentRequest,
    ) -> AppResult<PaymentResponse> {
        let amount = req
            .amount
            .map(round_money)
            .filter(|a| *a > 0.0)
            .ok_or_else(|| {
                AppError::ValidationError("Payment amount must be greater than zero".into())
            })?;
        let fee = req.fee.unwrap_or(0.0);
        let discount = req.discount.unwrap_or(0.0);
        let tax = req.tax.unwrap_or(0.0);
        if fee < 0.0 || discount < 0.0 || tax < 0.0 {
            return Err(AppError::ValidationError(
                "fee, discount and tax cannot be negative".into(),
            ));
        }

        let order = order_service::find_order(&self.pool, ctx, order_id).await?;
        if order.status.is_terminal() {
            return Err(DomainError::CannotModify(order.status).into());
        }

        let now = Utc::now();
        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            order_id: Set(order.id),
            method: Set(req.method),
            status: Set(PaymentStatus::Pending),
            amount: Set(amount),
            fee: Set(round_money(fee)),
            discount: Set(round_money(discount)),
            tax: Set(round_money(tax)),
            net_amount: Set(money::net_amount(amount, fee, discount, tax)),
            external_id: Set(req.external_id.filter(|id| !id.trim().is_empty())),
            paid_at: Set(None),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Payment {} ({}) of {:.2} registered on order {} by {}",
            payment.id,
            payment.method,
            payment.amount,
            order.id,
            ctx.user_id
        );
        Ok(payment.into())
    }

    pub async fn list_payments(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
    ) -> AppResult<Vec<PaymentResponse>> {
        order_service::find_order(&self.pool, ctx, order_id).await?;
        let list = payments::Entity::find()
            .filter(payments::Column::TenantId.eq(ctx.tenant_id))
            .filter(payments::Column::CompanyId.eq(ctx.company_id))
            .filter(payments::Column::OrderId.eq(order_id))
            .order_by_asc(payments::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 支付状态流转
    ///
    /// 现金支付在此完成或全额退款时，若有营业中的收银台则同步记一笔 SALE / REFUND 流水。
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        payment_id: Uuid,
        req: UpdatePaymentStatusRequest,
    ) -> AppResult<PaymentResponse> {
        let txn = self.pool.begin().await?;

        let payment = payments::Entity::find_by_id(payment_id)
            .filter(payments::Column::TenantId.eq(ctx.tenant_id))
            .filter(payments::Column::CompanyId.eq(ctx.company_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Payment"))?;

        let from = payment.status;
        ensure_payment_transition(from, req.status)?;

        let updated = set_status(&txn, payment, req.status).await?;

        let ledger_type = match (updated.method, updated.status) {
            (PaymentMethod::Cash, PaymentStatus::Completed) => Some(CashMovementType::Sale),
            (PaymentMethod::Cash, PaymentStatus::Refunded) => Some(CashMovementType::Refund),
            _ => None,
        };
        if let Some(movement_type) = ledger_type {
            if let Some(register) =
                cash_register_service::find_open_register_for_update(&txn, ctx).await?
            {
                cash_register_service::append_movement(
                    &txn,
                    ctx,
                    register,
                    NewMovement {
                        movement_type,
                        amount: updated.amount,
                        description: Some(format!("Cash payment {}", updated.status)),
                        order_id: Some(updated.order_id),
                        payment_id: Some(updated.id),
                    },
                )
                .await?;
            }
        }

        txn.commit().await?;

        log::info!(
            "Payment {} {} -> {} by {}",
            updated.id,
            from,
            updated.status,
            ctx.user_id
        );
        Ok(updated.into())
    }

    /// 快速收款
    ///
    /// 1. 锁定订单并修正漂移的合计
    /// 2. 计算未付金额，已付清则不生成支付
    /// 3. 生成一笔已完成支付，金额不超过未付金额
    /// 4. 现金收款且有营业中的收银台时追加 SALE 流水
    pub async fn quick_payment(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
        req: QuickPaymentRequest,
    ) -> AppResult<QuickPaymentResponse> {
        let txn = self.pool.begin().await?;

        let order = order_service::find_order_for_update(&txn, ctx, order_id).await?;
        if order.status.is_terminal() {
            return Err(DomainError::CannotModify(order.status).into());
        }
        let order = order_service::reconcile_totals(&txn, order).await?;
        let paid = order_service::completed_payments_total(&txn, order.id).await?;

        let Some(amount) = quick_payment_amount(order.total, paid, req.amount)? else {
            txn.commit().await?;
            log::info!("Quick payment on order {} skipped: already settled", order.id);
            return Ok(QuickPaymentResponse {
                payment: None,
                order_total: order.total,
                paid_amount: paid,
                outstanding: round_money((order.total - paid).max(0.0)),
                cash_movement: None,
            });
        };

        let method = req.method.unwrap_or(PaymentMethod::Cash);
        let now = Utc::now();
        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            order_id: Set(order.id),
            method: Set(method),
            status: Set(PaymentStatus::Completed),
            amount: Set(amount),
            fee: Set(0.0),
            discount: Set(0.0),
            tax: Set(0.0),
            net_amount: Set(amount),
            external_id: Set(None),
            paid_at: Set(Some(now)),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // 只有现金进钱箱
        let register = if method == PaymentMethod::Cash {
            cash_register_service::find_open_register_for_update(&txn, ctx).await?
        } else {
            None
        };
        let cash_movement = match register {
            Some(register) => Some(
                cash_register_service::append_movement(
                    &txn,
                    ctx,
                    register,
                    NewMovement {
                        movement_type: CashMovementType::Sale,
                        amount,
                        description: Some(format!("Quick payment for order {}", order.id)),
                        order_id: Some(order.id),
                        payment_id: Some(payment.id),
                    },
                )
                .await?,
            ),
            None => None,
        };

        txn.commit().await?;

        let paid_amount = round_money(paid + amount);
        log::info!(
            "Quick payment {} of {:.2} on order {} by {} (paid {:.2} of {:.2})",
            payment.id,
            amount,
            order.id,
            ctx.user_id,
            paid_amount,
            order.total
        );
        Ok(QuickPaymentResponse {
            payment: Some(payment.into()),
            order_total: order.total,
            paid_amount,
            outstanding: round_money((order.total - paid_amount).max(0.0)),
            cash_movement: cash_movement.map(CashMovementResponse::from),
        })
    }

    /// 校验 PIX 网关回调携带的共享密钥
    pub fn verify_webhook_secret(&self, provided: Option<&str>) -> AppResult<()> {
        if self.pix_webhook_secret.is_empty() {
            log::error!("PIX webhook received but no webhook secret is configured");
        }
        if webhook_secret_matches(&self.pix_webhook_secret, provided) {
            Ok(())
        } else {
            Err(AppError::AuthError("Invalid webhook secret".into()))
        }
    }

    /// PIX 网关回调：按 correlation id 找到支付并推进状态
    ///
    /// 未知状态、未知支付、不允许的流转都只记录日志并确认接收，避免网关重试。
    pub async fn handle_pix_webhook(&self, payload: PixWebhookPayload) -> AppResult<WebhookOutcome> {
        let Some(target) = map_pix_status(&payload.status) else {
            log::warn!(
                "PIX webhook for {} with unknown status {}",
                payload.correlation_id,
                payload.status
            );
            return Ok(WebhookOutcome::Ignored);
        };

        let txn = self.pool.begin().await?;
        let payment = payments::Entity::find()
            .filter(payments::Column::ExternalId.eq(payload.correlation_id.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?;
        let Some(payment) = payment else {
            log::warn!(
                "PIX webhook for unknown payment {}",
                payload.correlation_id
            );
            return Ok(WebhookOutcome::Ignored);
        };

        if payment.status == target {
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        if let Err(e) = ensure_payment_transition(payment.status, target) {
            log::warn!("PIX webhook for payment {} ignored: {}", payment.id, e);
            return Ok(WebhookOutcome::Ignored);
        }

        let updated = set_status(&txn, payment, target).await?;
        txn.commit().await?;

        log::info!(
            "PIX webhook moved payment {} (order {}) to {}",
            updated.id,
            updated.order_id,
            updated.status
        );
        Ok(WebhookOutcome::Applied(updated.status))
    }
}

/// 未配置密钥时拒绝所有回调
fn webhook_secret_matches(configured: &str, provided: Option<&str>) -> bool {
    !configured.is_empty() && provided == Some(configured)
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    payment: payments::Model,
    status: PaymentStatus,
) -> AppResult<payments::Model> {
    let now = Utc::now();
    let mut am = payment.into_active_model();
    am.status = Set(status);
    if status == PaymentStatus::Completed {
        am.paid_at = Set(Some(now));
    }
    am.updated_at = Set(now);
    Ok(am.update(conn).await?)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::entities::{OrderStatus, cash_movement_entity, order_entity};
    use crate::models::Role;
    use crate::services::testing;

    fn quick(method: Option<PaymentMethod>) -> QuickPaymentRequest {
        QuickPaymentRequest {
            method,
            amount: None,
        }
    }

    fn mock_with_order(order: &order_entity::Model, paid: Vec<payments::Model>) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order.clone()]])
            .append_query_results([vec![testing::item(order, 25.0, 2)]])
            .append_query_results([paid])
    }

    #[test]
    fn webhook_secret_must_match() {
        assert!(webhook_secret_matches("s3cret", Some("s3cret")));
        assert!(!webhook_secret_matches("s3cret", Some("wrong")));
        assert!(!webhook_secret_matches("s3cret", None));
    }

    #[test]
    fn webhook_rejected_without_configured_secret() {
        assert!(!webhook_secret_matches("", Some("")));
        assert!(!webhook_secret_matches("", None));
    }

    #[tokio::test]
    async fn test_quick_payment_on_settled_order_creates_nothing() {
        let ctx = testing::ctx(Role::Cashier);
        let order = testing::order(&ctx, OrderStatus::Delivered, 50.0);
        let settled = testing::payment(&order, PaymentMethod::Cash, PaymentStatus::Completed, 50.0);
        let db = mock_with_order(&order, vec![settled]).into_connection();

        let resp = PaymentService::new(db.clone(), String::new())
            .quick_payment(&ctx, order.id, quick(None))
            .await
            .unwrap();
        assert!(resp.payment.is_none());
        assert!(resp.cash_movement.is_none());
        assert_eq!(resp.paid_amount, 50.0);
        assert_eq!(resp.outstanding, 0.0);

        let log = testing::statements(db);
        assert!(!log.iter().any(|s| s.contains(r#"INSERT INTO "payments""#)));
        assert!(log.iter().any(|s| s.contains("COMMIT")));
    }

    #[tokio::test]
    async fn test_card_quick_payment_skips_cash_drawer() {
        let ctx = testing::ctx(Role::Cashier);
        let order = testing::order(&ctx, OrderStatus::Delivered, 50.0);
        let card = testing::payment(
            &order,
            PaymentMethod::CreditCard,
            PaymentStatus::Completed,
            50.0,
        );
        let db = mock_with_order(&order, Vec::new())
            .append_query_results([vec![card]])
            .into_connection();

        let resp = PaymentService::new(db.clone(), String::new())
            .quick_payment(&ctx, order.id, quick(Some(PaymentMethod::CreditCard)))
            .await
            .unwrap();
        assert!(resp.payment.is_some());
        assert!(resp.cash_movement.is_none());
        assert_eq!(resp.outstanding, 0.0);

        let log = testing::statements(db);
        let insert = log
            .iter()
            .find(|s| s.contains(r#"INSERT INTO "payments""#))
            .unwrap();
        assert!(insert.contains("credit_card"));
        assert!(!log.iter().any(|s| s.contains(r#""cash_registers""#)));
        assert!(!log.iter().any(|s| s.contains(r#"INSERT INTO "cash_movements""#)));
    }

    #[tokio::test]
    async fn test_cash_quick_payment_records_sale_on_locked_register() {
        let ctx = testing::ctx(Role::Cashier);
        let order = testing::order(&ctx, OrderStatus::Delivered, 50.0);
        let cash = testing::payment(&order, PaymentMethod::Cash, PaymentStatus::Completed, 50.0);
        let register = testing::register(&ctx, 100.0, 100.0);
        let mut after = register.clone();
        after.expected_balance = 150.0;
        let sale = testing::movement(&register, CashMovementType::Sale, 50.0, 100.0, 150.0);

        let db = mock_with_order(&order, Vec::new())
            .append_query_results([vec![cash]])
            .append_query_results([vec![register]])
            .append_query_results([Vec::<cash_movement_entity::Model>::new()])
            .append_query_results([vec![sale]])
            .append_query_results([vec![after]])
            .into_connection();

        let resp = PaymentService::new(db.clone(), String::new())
            .quick_payment(&ctx, order.id, quick(None))
            .await
            .unwrap();
        let movement = resp.cash_movement.unwrap();
        assert_eq!(movement.movement_type, CashMovementType::Sale);
        assert_eq!(movement.new_balance, 150.0);

        let log = testing::statements(db);
        let lookup = log
            .iter()
            .find(|s| s.contains(r#"FROM "cash_registers""#))
            .unwrap();
        assert!(lookup.contains("FOR UPDATE"));
        let update = log
            .iter()
            .find(|s| s.contains(r#"UPDATE "cash_registers""#))
            .unwrap();
        assert!(update.contains("Double(Some(150.0))"));
    }

    #[tokio::test]
    async fn test_completing_cash_payment_locks_register() {
        let ctx = testing::ctx(Role::Cashier);
        let order = testing::order(&ctx, OrderStatus::Delivered, 30.0);
        let pending = testing::payment(&order, PaymentMethod::Cash, PaymentStatus::Pending, 30.0);
        let mut completed = pending.clone();
        completed.status = PaymentStatus::Completed;
        let register = testing::register(&ctx, 0.0, 0.0);
        let last = testing::movement(&register, CashMovementType::Opening, 0.0, 0.0, 0.0);
        let sale = testing::movement(&register, CashMovementType::Sale, 30.0, 0.0, 30.0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending.clone()]])
            .append_query_results([vec![completed]])
            .append_query_results([vec![register.clone()]])
            .append_query_results([vec![last]])
            .append_query_results([vec![sale]])
            .append_query_results([vec![register]])
            .into_connection();

        let resp = PaymentService::new(db.clone(), String::new())
            .update_status(
                &ctx,
                pending.id,
                UpdatePaymentStatusRequest {
                    status: PaymentStatus::Completed,
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.status, PaymentStatus::Completed);

        let log = testing::statements(db);
        assert!(log
            .iter()
            .any(|s| s.contains(r#"FROM "cash_registers""#) && s.contains("FOR UPDATE")));
        assert!(log.iter().any(|s| s.contains(r#"INSERT INTO "cash_movements""#)));
    }
}

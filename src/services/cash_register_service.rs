use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::cash;
use crate::domain::money::round_money;
use crate::entities::{
    CashMovementType, CashRegisterStatus, cash_movement_entity as movements,
    cash_register_entity as registers,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthContext, CashMovementRequest, CashMovementResponse, CashRegisterDetailResponse,
    CashRegisterResponse, CloseCashRegisterRequest, OpenCashRegisterRequest,
};

#[derive(Clone)]
pub struct CashRegisterService {
    pool: DatabaseConnection,
}

/// 追加流水所需的信息
pub struct NewMovement {
    pub movement_type: CashMovementType,
    pub amount: f64,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

impl CashRegisterService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 开台：同一租户门店只能有一个营业中的收银台
    pub async fn open(
        &self,
        ctx: &AuthContext,
        req: OpenCashRegisterRequest,
    ) -> AppResult<CashRegisterResponse> {
        let opening_balance = round_money(req.opening_balance.unwrap_or(0.0));
        if opening_balance < 0.0 {
            return Err(AppError::ValidationError(
                "Opening balance cannot be negative".into(),
            ));
        }

        let txn = self.pool.begin().await?;

        if find_open_register(&txn, ctx).await?.is_some() {
            return Err(AppError::Conflict(
                "A cash register is already open for this company".into(),
            ));
        }

        let now = Utc::now();
        // 并发开台由部分唯一索引兜底，冲突转为 409
        let register = registers::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            status: Set(CashRegisterStatus::Open),
            opened_by: Set(ctx.user_id),
            closed_by: Set(None),
            opening_balance: Set(opening_balance),
            expected_balance: Set(opening_balance),
            closing_balance: Set(None),
            balance_difference: Set(None),
            notes: Set(req.notes),
            opened_at: Set(now),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("A cash register is already open for this company".into())
            }
            other => other,
        })?;

        insert_movement(
            &txn,
            ctx,
            register.id,
            0.0,
            opening_balance,
            NewMovement {
                movement_type: CashMovementType::Opening,
                amount: opening_balance,
                description: Some("Opening balance".to_string()),
                order_id: None,
                payment_id: None,
            },
        )
        .await?;

        txn.commit().await?;

        log::info!(
            "Cash register {} opened by {} with balance {:.2}",
            register.id,
            ctx.user_id,
            opening_balance
        );
        Ok(register.into())
    }

    /// 关台：按全部流水重算应有余额，记录差额
    pub async fn close(
        &self,
        ctx: &AuthContext,
        req: CloseCashRegisterRequest,
    ) -> AppResult<CashRegisterResponse> {
        let closing_balance = req
            .closing_balance
            .map(round_money)
            .ok_or_else(|| AppError::ValidationError("closing_balance is required".into()))?;

        let txn = self.pool.begin().await?;

        let register = find_open_register_for_update(&txn, ctx)
            .await?
            .ok_or_else(|| AppError::NotFound("No open cash register".into()))?;

        let history = movements::Entity::find()
            .filter(movements::Column::CashRegisterId.eq(register.id))
            .all(&txn)
            .await?;
        let expected = cash::expected_balance(history.iter().map(|m| (m.movement_type, m.amount)));
        let difference = cash::balance_difference(closing_balance, expected);

        insert_movement(
            &txn,
            ctx,
            register.id,
            expected,
            closing_balance,
            NewMovement {
                movement_type: CashMovementType::Closing,
                amount: closing_balance,
                description: Some(format!("Closing count, difference {difference:.2}")),
                order_id: None,
                payment_id: None,
            },
        )
        .await?;

        let now = Utc::now();
        let mut am = register.into_active_model();
        am.status = Set(CashRegisterStatus::Closed);
        am.closed_by = Set(Some(ctx.user_id));
        am.expected_balance = Set(expected);
        am.closing_balance = Set(Some(closing_balance));
        am.balance_difference = Set(Some(difference));
        if req.notes.is_some() {
            am.notes = Set(req.notes);
        }
        am.closed_at = Set(Some(now));
        am.updated_at = Set(now);
        let closed = am.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Cash register {} closed by {}: expected {:.2}, counted {:.2}, difference {:.2}",
            closed.id,
            ctx.user_id,
            expected,
            closing_balance,
            difference
        );
        Ok(closed.into())
    }

    pub async fn current(&self, ctx: &AuthContext) -> AppResult<CashRegisterDetailResponse> {
        let register = find_open_register(&self.pool, ctx)
            .await?
            .ok_or_else(|| AppError::NotFound("No open cash register".into()))?;

        let history = movements::Entity::find()
            .filter(movements::Column::CashRegisterId.eq(register.id))
            .order_by_asc(movements::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        Ok(CashRegisterDetailResponse {
            register: register.into(),
            movements: history.into_iter().map(Into::into).collect(),
        })
    }

    /// 手工流水（取款、存入、支出、调整）
    pub async fn add_movement(
        &self,
        ctx: &AuthContext,
        req: CashMovementRequest,
    ) -> AppResult<CashMovementResponse> {
        if !cash::is_manual_movement(req.movement_type) {
            return Err(AppError::ValidationError(format!(
                "Movement type {} is recorded automatically",
                req.movement_type
            )));
        }
        let amount = cash::manual_amount(req.movement_type, req.amount)?;

        let txn = self.pool.begin().await?;
        let register = find_open_register_for_update(&txn, ctx)
            .await?
            .ok_or_else(|| AppError::NotFound("No open cash register".into()))?;

        let movement = append_movement(
            &txn,
            ctx,
            register,
            NewMovement {
                movement_type: req.movement_type,
                amount,
                description: req.description,
                order_id: None,
                payment_id: None,
            },
        )
        .await?;
        txn.commit().await?;

        log::info!(
            "Cash movement {} ({}) of {:.2} recorded by {}",
            movement.id,
            movement.movement_type,
            movement.amount,
            ctx.user_id
        );
        Ok(movement.into())
    }
}

fn open_register_query(ctx: &AuthContext) -> Select<registers::Entity> {
    registers::Entity::find()
        .filter(registers::Column::TenantId.eq(ctx.tenant_id))
        .filter(registers::Column::CompanyId.eq(ctx.company_id))
        .filter(registers::Column::Status.eq(CashRegisterStatus::Open))
}

async fn find_open_register<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
) -> AppResult<Option<registers::Model>> {
    Ok(open_register_query(ctx).one(conn).await?)
}

/// SELECT ... FOR UPDATE，追加流水与关台在同一收银台上串行执行
pub async fn find_open_register_for_update<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
) -> AppResult<Option<registers::Model>> {
    Ok(open_register_query(ctx).lock_exclusive().one(conn).await?)
}

/// 追加流水并同步收银台的应有余额
///
/// `register` 须由 `find_open_register_for_update` 在同一事务内取得。
/// previous_balance 取上一条流水的 new_balance，没有则取收银台 expected_balance。
pub async fn append_movement<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    register: registers::Model,
    movement: NewMovement,
) -> AppResult<movements::Model> {
    let last = movements::Entity::find()
        .filter(movements::Column::CashRegisterId.eq(register.id))
        .order_by_desc(movements::Column::CreatedAt)
        .one(conn)
        .await?;

    let previous = cash::previous_balance(last.map(|m| m.new_balance), register.expected_balance);
    let new_balance = cash::next_balance(previous, movement.movement_type, movement.amount);

    let created = insert_movement(conn, ctx, register.id, previous, new_balance, movement).await?;

    let mut am = register.into_active_model();
    am.expected_balance = Set(new_balance);
    am.updated_at = Set(Utc::now());
    am.update(conn).await?;

    Ok(created)
}

async fn insert_movement<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    register_id: Uuid,
    previous_balance: f64,
    new_balance: f64,
    movement: NewMovement,
) -> AppResult<movements::Model> {
    let model = movements::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.tenant_id),
        company_id: Set(ctx.company_id),
        cash_register_id: Set(register_id),
        movement_type: Set(movement.movement_type),
        amount: Set(movement.amount),
        previous_balance: Set(previous_balance),
        new_balance: Set(new_balance),
        description: Set(movement.description),
        order_id: Set(movement.order_id),
        payment_id: Set(movement.payment_id),
        created_by: Set(ctx.user_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::models::Role;
    use crate::services::testing;

    #[tokio::test]
    async fn test_second_open_register_conflicts() {
        let ctx = testing::ctx(Role::Cashier);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![testing::register(&ctx, 50.0, 50.0)]])
            .into_connection();

        let err = CashRegisterService::new(db.clone())
            .open(
                &ctx,
                OpenCashRegisterRequest {
                    opening_balance: Some(80.0),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let log = testing::statements(db);
        assert!(!log.iter().any(|s| s.contains(r#"INSERT INTO "cash_registers""#)));
        assert!(log.iter().any(|s| s.contains("ROLLBACK")));
    }

    #[tokio::test]
    async fn test_close_stores_balance_difference() {
        let ctx = testing::ctx(Role::Cashier);
        let register = testing::register(&ctx, 100.0, 150.0);
        let history = vec![
            testing::movement(&register, CashMovementType::Opening, 100.0, 0.0, 100.0),
            testing::movement(&register, CashMovementType::Sale, 50.0, 100.0, 150.0),
        ];
        let closing = testing::movement(&register, CashMovementType::Closing, 148.0, 150.0, 148.0);
        let mut closed = register.clone();
        closed.status = CashRegisterStatus::Closed;
        closed.closing_balance = Some(148.0);
        closed.balance_difference = Some(-2.0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![register]])
            .append_query_results([history])
            .append_query_results([vec![closing]])
            .append_query_results([vec![closed]])
            .into_connection();

        let resp = CashRegisterService::new(db.clone())
            .close(
                &ctx,
                CloseCashRegisterRequest {
                    closing_balance: Some(148.0),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.status, CashRegisterStatus::Closed);

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
        assert!(update.contains("Double(Some(148.0))"));
        assert!(update.contains("Double(Some(-2.0))"));
    }

    #[tokio::test]
    async fn test_negative_deposit_is_rejected_before_touching_ledger() {
        let ctx = testing::ctx(Role::Cashier);
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = CashRegisterService::new(db.clone())
            .add_movement(
                &ctx,
                CashMovementRequest {
                    movement_type: CashMovementType::Deposit,
                    amount: Some(-50.0),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code_and_code(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
        assert!(testing::statements(db).is_empty());
    }

    #[tokio::test]
    async fn test_manual_movement_locks_register() {
        let ctx = testing::ctx(Role::Manager);
        let register = testing::register(&ctx, 100.0, 100.0);
        let withdrawal =
            testing::movement(&register, CashMovementType::Withdrawal, 30.0, 100.0, 70.0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![register.clone()]])
            .append_query_results([Vec::<movements::Model>::new()])
            .append_query_results([vec![withdrawal]])
            .append_query_results([vec![register]])
            .into_connection();

        let movement = CashRegisterService::new(db.clone())
            .add_movement(
                &ctx,
                CashMovementRequest {
                    movement_type: CashMovementType::Withdrawal,
                    amount: Some(30.0),
                    description: Some("troco".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(movement.new_balance, 70.0);

        let log = testing::statements(db);
        assert!(log
            .iter()
            .any(|s| s.contains(r#"FROM "cash_registers""#) && s.contains("FOR UPDATE")));
        let update = log
            .iter()
            .find(|s| s.contains(r#"UPDATE "cash_registers""#))
            .unwrap();
        assert!(update.contains("Double(Some(70.0))"));
    }
}

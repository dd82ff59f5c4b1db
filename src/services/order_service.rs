use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::lifecycle::{self, LifecycleState, LifecycleStamps, TransitionRequest};
use crate::domain::money::{self, OrderTotals, round_money};
use crate::domain::payment::paid_amount;
use crate::domain::DomainError;
use crate::entities::{
    Modifications, OrderChannel, OrderStatus, PaymentStatus, order_entity as orders,
    order_item_entity as order_items, payment_entity as payments, product_entity as products,
};
use crate::error::{AppError, AppResult};
use crate::external::SharedKitchenNotifier;
use crate::models::{
    AuthContext, CreateOrderRequest, KitchenOrderSnapshot, OrderItemInput, OrderItemUpdate,
    OrderQuery, OrderResponse, PaginatedResponse, PaginationParams, Role, UpdateOrderRequest,
    UpdateOrderStatusRequest,
};
use crate::services::stock_service;

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    kitchen: SharedKitchenNotifier,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, kitchen: SharedKitchenNotifier) -> Self {
        Self { pool, kitchen }
    }

    /// 开单
    ///
    /// 1. 校验明细并按菜品补全名称、单价、制作时间
    /// 2. 按配方扣减原料（条件原子更新，任一不足整体回滚）
    /// 3. 计算合计，写入订单与明细
    /// 4. 通知厨房
    pub async fn create_order(
        &self,
        ctx: &AuthContext,
        req: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        let people_count = req.people_count.unwrap_or(1);
        if people_count < 0 {
            return Err(AppError::ValidationError(
                "people_count cannot be negative".into(),
            ));
        }
        let discount = non_negative(req.discount, "discount")?;
        let tax = non_negative(req.tax, "tax")?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.pool.begin().await?;

        let catalog = load_products(&txn, ctx, &req.items).await?;
        let mut items = Vec::with_capacity(req.items.len());
        for input in &req.items {
            let product = input.product_id.and_then(|id| catalog.get(&id));
            items.push(draft_item(ctx, order_id, input, product, now)?);
        }

        stock_service::consume_for_items(&txn, ctx, &stock_deltas(&items)).await?;

        let totals = recompute_totals(&items, discount, tax);
        let order = orders::ActiveModel {
            id: Set(order_id),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(ctx.company_id),
            location_id: Set(req.location_id),
            table_id: Set(req.table_id),
            customer_id: Set(req.customer_id),
            status: Set(OrderStatus::Open),
            channel: Set(req.channel.unwrap_or(OrderChannel::DineIn)),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            tax: Set(totals.tax),
            total: Set(totals.total),
            people_count: Set(people_count),
            notes: Set(req.notes),
            cancellation_reason: Set(None),
            created_by: Set(ctx.user_id),
            closed_by: Set(None),
            cancelled_by: Set(None),
            ready_at: Set(None),
            delivered_at: Set(None),
            closed_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for item in &items {
            insertable(item).insert(&txn).await?;
        }

        txn.commit().await?;

        log::info!(
            "Order {} created by {} with {} items, total {:.2}",
            order.id,
            ctx.user_id,
            items.len(),
            order.total
        );
        self.kitchen
            .notify_new_order(order.company_id, KitchenOrderSnapshot::new(&order, &items));

        Ok(OrderResponse::new(order, items))
    }

    /// 修改订单：头信息、已有明细、新增明细
    pub async fn update_order(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
        req: UpdateOrderRequest,
    ) -> AppResult<OrderResponse> {
        if let Some(people_count) = req.people_count {
            if people_count < 0 {
                return Err(AppError::ValidationError(
                    "people_count cannot be negative".into(),
                ));
            }
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        let order = find_order_for_update(&txn, ctx, order_id).await?;
        lifecycle::ensure_items_modifiable(order.status)?;

        let mut items = load_items(&txn, order.id).await?;
        let mut deltas: Vec<(Uuid, i32)> = Vec::new();

        for update in &req.items {
            let position = items
                .iter()
                .position(|i| i.id == update.id)
                .ok_or_else(|| AppError::not_found("Order item"))?;
            let original = items[position].clone();
            let (updated, quantity_delta) = apply_item_update(&original, update, now)?;

            if let (Some(product_id), true) = (updated.product_id, quantity_delta != 0) {
                deltas.push((product_id, quantity_delta));
            }

            let mut am = original.into_active_model();
            am.unit_price = Set(updated.unit_price);
            am.quantity = Set(updated.quantity);
            am.discount = Set(updated.discount);
            am.tax = Set(updated.tax);
            am.modifications = Set(updated.modifications.clone());
            am.notes = Set(updated.notes.clone());
            am.total_price = Set(updated.total_price);
            am.updated_at = Set(now);
            items[position] = am.update(&txn).await?;
        }

        if !req.new_items.is_empty() {
            let catalog = load_products(&txn, ctx, &req.new_items).await?;
            let mut added = Vec::with_capacity(req.new_items.len());
            for input in &req.new_items {
                let product = input.product_id.and_then(|id| catalog.get(&id));
                added.push(draft_item(ctx, order.id, input, product, now)?);
            }
            deltas.extend(stock_deltas(&added));
            for item in &added {
                insertable(item).insert(&txn).await?;
            }
            items.extend(added);
        }

        stock_service::consume_for_items(&txn, ctx, &deltas).await?;

        let discount = match req.discount {
            Some(_) => non_negative(req.discount, "discount")?,
            None => order.discount,
        };
        let tax = match req.tax {
            Some(_) => non_negative(req.tax, "tax")?,
            None => order.tax,
        };
        let totals = recompute_totals(&items, discount, tax);

        let mut am = order.into_active_model();
        am.subtotal = Set(totals.subtotal);
        am.discount = Set(totals.discount);
        am.tax = Set(totals.tax);
        am.total = Set(totals.total);
        if let Some(notes) = req.notes {
            am.notes = Set(Some(notes));
        }
        if let Some(people_count) = req.people_count {
            am.people_count = Set(people_count);
        }
        if let Some(table_id) = req.table_id {
            am.table_id = Set(Some(table_id));
        }
        am.updated_at = Set(now);
        let order = am.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Order {} updated by {}: {} items, total {:.2}",
            order.id,
            ctx.user_id,
            items.len(),
            order.total
        );
        self.kitchen
            .notify_order_update(order.company_id, KitchenOrderSnapshot::new(&order, &items));

        Ok(OrderResponse::new(order, items))
    }

    /// 状态流转
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
        target: OrderStatus,
        req: UpdateOrderStatusRequest,
    ) -> AppResult<OrderResponse> {
        match target {
            OrderStatus::Closed => ctx.require_any(Role::CASH_HANDLING)?,
            OrderStatus::Cancelled => ctx.require_any(Role::BACK_OFFICE)?,
            _ => ctx.require_any(Role::ALL)?,
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let order = find_order_for_update(&txn, ctx, order_id).await?;

        let paid = if target == OrderStatus::Closed {
            completed_payments_total(&txn, order.id).await?
        } else {
            0.0
        };

        let state = LifecycleState {
            status: order.status,
            total: order.total,
            stamps: LifecycleStamps {
                ready_at: order.ready_at,
                delivered_at: order.delivered_at,
                closed_at: order.closed_at,
                cancelled_at: order.cancelled_at,
                closed_by: order.closed_by,
                cancelled_by: order.cancelled_by,
            },
        };
        let transition = lifecycle::transition(
            &state,
            &TransitionRequest {
                target,
                actor: ctx.user_id,
                paid_amount: paid,
                cancellation_reason: req.cancellation_reason.as_deref(),
                now,
            },
        )?;

        if transition.freeze_items {
            freeze_items(&txn, order.id, now).await?;
        }

        let mut am = order.into_active_model();
        am.status = Set(transition.to);
        am.ready_at = Set(transition.stamps.ready_at);
        am.delivered_at = Set(transition.stamps.delivered_at);
        am.closed_at = Set(transition.stamps.closed_at);
        am.closed_by = Set(transition.stamps.closed_by);
        am.cancelled_at = Set(transition.stamps.cancelled_at);
        am.cancelled_by = Set(transition.stamps.cancelled_by);
        if let Some(reason) = transition.cancellation_reason.clone() {
            am.cancellation_reason = Set(Some(reason));
        }
        am.updated_at = Set(now);
        let order = am.update(&txn).await?;
        let items = load_items(&txn, order.id).await?;

        txn.commit().await?;

        log::info!(
            "Order {} moved from {} to {} by {}",
            order.id,
            transition.from,
            transition.to,
            ctx.user_id
        );
        if transition.is_cancellation() {
            self.kitchen.notify_order_cancelled(order.company_id, order.id);
        } else {
            self.kitchen
                .notify_order_update(order.company_id, KitchenOrderSnapshot::new(&order, &items));
        }

        Ok(OrderResponse::new(order, items))
    }

    pub async fn get_order(&self, ctx: &AuthContext, order_id: Uuid) -> AppResult<OrderResponse> {
        let order = find_order(&self.pool, ctx, order_id).await?;
        let items = load_items(&self.pool, order.id).await?;
        Ok(OrderResponse::new(order, items))
    }

    pub async fn list_orders(
        &self,
        ctx: &AuthContext,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = orders::Entity::find()
            .filter(orders::Column::TenantId.eq(ctx.tenant_id))
            .filter(orders::Column::CompanyId.eq(ctx.company_id));
        if let Some(status) = query.status {
            base_query = base_query.filter(orders::Column::Status.eq(status));
        }
        if let Some(channel) = query.channel {
            base_query = base_query.filter(orders::Column::Channel.eq(channel));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;
        let page = base_query
            .order_by_desc(orders::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let mut items_by_order = load_items_for(&self.pool, &page).await?;
        let data = page
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderResponse::new(order, items)
            })
            .collect();

        Ok(PaginatedResponse::new(
            data,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    /// 厨房屏幕当前需要处理的订单（PREPARING / READY）
    pub async fn kitchen_orders(&self, ctx: &AuthContext) -> AppResult<Vec<KitchenOrderSnapshot>> {
        let active = orders::Entity::find()
            .filter(orders::Column::TenantId.eq(ctx.tenant_id))
            .filter(orders::Column::CompanyId.eq(ctx.company_id))
            .filter(
                Condition::any()
                    .add(orders::Column::Status.eq(OrderStatus::Preparing))
                    .add(orders::Column::Status.eq(OrderStatus::Ready)),
            )
            .order_by_asc(orders::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        let mut items_by_order = load_items_for(&self.pool, &active).await?;
        Ok(active
            .iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                KitchenOrderSnapshot::new(order, &items)
            })
            .collect())
    }
}

pub async fn find_order<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    order_id: Uuid,
) -> AppResult<orders::Model> {
    orders::Entity::find_by_id(order_id)
        .filter(orders::Column::TenantId.eq(ctx.tenant_id))
        .filter(orders::Column::CompanyId.eq(ctx.company_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

/// SELECT ... FOR UPDATE，同一订单的并发修改串行执行
pub async fn find_order_for_update<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    order_id: Uuid,
) -> AppResult<orders::Model> {
    orders::Entity::find_by_id(order_id)
        .filter(orders::Column::TenantId.eq(ctx.tenant_id))
        .filter(orders::Column::CompanyId.eq(ctx.company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<order_items::Model>> {
    Ok(order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::CreatedAt)
        .all(conn)
        .await?)
}

async fn load_items_for<C: ConnectionTrait>(
    conn: &C,
    page: &[orders::Model],
) -> AppResult<HashMap<Uuid, Vec<order_items::Model>>> {
    if page.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<Uuid> = page.iter().map(|o| o.id).collect();
    let all = order_items::Entity::find()
        .filter(order_items::Column::OrderId.is_in(ids))
        .order_by_asc(order_items::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<order_items::Model>> = HashMap::new();
    for item in all {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

/// 已完成支付合计
pub async fn completed_payments_total<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<f64> {
    let list = payments::Entity::find()
        .filter(payments::Column::OrderId.eq(order_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Completed))
        .all(conn)
        .await?;
    Ok(paid_amount(list.into_iter().map(|p| (p.status, p.amount))))
}

/// 按当前明细重算合计；与存量偏差超过容差时写回
pub async fn reconcile_totals<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
) -> AppResult<orders::Model> {
    let items = load_items(conn, order.id).await?;
    let totals = recompute_totals(&items, order.discount, order.tax);
    if !money::totals_drifted(order.subtotal, totals.subtotal)
        && !money::totals_drifted(order.total, totals.total)
    {
        return Ok(order);
    }

    log::warn!(
        "Order {} totals drifted (subtotal {:.2} -> {:.2}, total {:.2} -> {:.2}), correcting",
        order.id,
        order.subtotal,
        totals.subtotal,
        order.total,
        totals.total
    );
    let mut am = order.into_active_model();
    am.subtotal = Set(totals.subtotal);
    am.total = Set(totals.total);
    am.updated_at = Set(Utc::now());
    Ok(am.update(conn).await?)
}

/// 进入 PREPARING：给尚未送厨的明细打上时间戳，已有的不覆盖
async fn freeze_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let result = order_items::Entity::update_many()
        .col_expr(order_items::Column::SentToKitchenAt, Expr::value(now))
        .col_expr(order_items::Column::UpdatedAt, Expr::value(now))
        .filter(order_items::Column::OrderId.eq(order_id))
        .filter(order_items::Column::SentToKitchenAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn load_products<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuthContext,
    inputs: &[OrderItemInput],
) -> AppResult<HashMap<Uuid, products::Model>> {
    let mut ids: Vec<Uuid> = inputs.iter().filter_map(|i| i.product_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    ids.sort();
    ids.dedup();

    let found = products::Entity::find()
        .filter(products::Column::TenantId.eq(ctx.tenant_id))
        .filter(products::Column::CompanyId.eq(ctx.company_id))
        .filter(products::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?;
    let catalog: HashMap<Uuid, products::Model> =
        found.into_iter().map(|p| (p.id, p)).collect();

    if let Some(missing) = ids.iter().find(|id| !catalog.contains_key(id)) {
        return Err(AppError::NotFound(format!("Product {missing} not found")));
    }
    Ok(catalog)
}

fn non_negative(value: Option<f64>, field: &str) -> AppResult<f64> {
    let value = round_money(value.unwrap_or(0.0));
    if value < 0.0 {
        return Err(AppError::ValidationError(format!(
            "{field} cannot be negative"
        )));
    }
    Ok(value)
}

fn recompute_totals(items: &[order_items::Model], discount: f64, tax: f64) -> OrderTotals {
    money::order_totals(
        items.iter().map(|i| money::item_total(&i.line_amounts())),
        discount,
        tax,
    )
}

fn insertable(item: &order_items::Model) -> order_items::ActiveModel {
    order_items::ActiveModel {
        id: Set(item.id),
        tenant_id: Set(item.tenant_id),
        company_id: Set(item.company_id),
        order_id: Set(item.order_id),
        product_id: Set(item.product_id),
        name: Set(item.name.clone()),
        unit_price: Set(item.unit_price),
        quantity: Set(item.quantity),
        discount: Set(item.discount),
        tax: Set(item.tax),
        total_price: Set(item.total_price),
        modifications: Set(item.modifications.clone()),
        notes: Set(item.notes.clone()),
        prep_time_minutes: Set(item.prep_time_minutes),
        sent_to_kitchen_at: Set(item.sent_to_kitchen_at),
        created_at: Set(item.created_at),
        updated_at: Set(item.updated_at),
    }
}

fn stock_deltas(items: &[order_items::Model]) -> Vec<(Uuid, i32)> {
    items
        .iter()
        .filter_map(|i| i.product_id.map(|p| (p, i.quantity)))
        .collect()
}

/// 新明细：菜品提供默认名称、单价、制作时间，请求中的值优先
fn draft_item(
    ctx: &AuthContext,
    order_id: Uuid,
    input: &OrderItemInput,
    product: Option<&products::Model>,
    now: DateTime<Utc>,
) -> AppResult<order_items::Model> {
    if input.quantity < 1 {
        return Err(AppError::ValidationError(
            "Item quantity must be at least 1".into(),
        ));
    }
    if let Some(product) = product {
        if !product.is_active {
            return Err(AppError::ValidationError(format!(
                "Product \"{}\" is not available",
                product.name
            )));
        }
    }

    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| product.map(|p| p.name.clone()))
        .ok_or_else(|| AppError::ValidationError("Item name is required".into()))?;
    let unit_price = input
        .unit_price
        .or_else(|| product.map(|p| p.price))
        .map(round_money)
        .ok_or_else(|| AppError::ValidationError(format!("Unit price is required for \"{name}\"")))?;
    if unit_price < 0.0 {
        return Err(AppError::ValidationError(
            "Unit price cannot be negative".into(),
        ));
    }

    let prep_time_minutes = match input.prep_time_minutes {
        Some(minutes) => lifecycle::ensure_prep_time(minutes)?,
        None => product
            .map(|p| p.prep_time_minutes.clamp(0, lifecycle::MAX_PREP_TIME_MINUTES))
            .unwrap_or(0),
    };

    let mut item = order_items::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        order_id,
        product_id: product.map(|p| p.id),
        name,
        unit_price,
        quantity: input.quantity,
        discount: non_negative(input.discount, "Item discount")?,
        tax: non_negative(input.tax, "Item tax")?,
        total_price: 0.0,
        modifications: Modifications(input.modifications.clone()),
        notes: input.notes.clone(),
        prep_time_minutes,
        sent_to_kitchen_at: None,
        created_at: now,
        updated_at: now,
    };
    item.total_price = money::item_total(&item.line_amounts());
    Ok(item)
}

/// 修改明细，返回新明细与份数变化；已送厨的明细拒绝修改
fn apply_item_update(
    item: &order_items::Model,
    update: &OrderItemUpdate,
    now: DateTime<Utc>,
) -> AppResult<(order_items::Model, i32)> {
    if item.is_frozen() && !update.is_empty() {
        return Err(DomainError::LockedItem(item.name.clone()).into());
    }

    let mut next = item.clone();
    if let Some(quantity) = update.quantity {
        if quantity < 1 {
            return Err(AppError::ValidationError(
                "Item quantity must be at least 1".into(),
            ));
        }
        next.quantity = quantity;
    }
    if let Some(unit_price) = update.unit_price {
        next.unit_price = non_negative(Some(unit_price), "Unit price")?;
    }
    if update.discount.is_some() {
        next.discount = non_negative(update.discount, "Item discount")?;
    }
    if update.tax.is_some() {
        next.tax = non_negative(update.tax, "Item tax")?;
    }
    if let Some(modifications) = &update.modifications {
        next.modifications = Modifications(modifications.clone());
    }
    if let Some(notes) = &update.notes {
        next.notes = Some(notes.clone());
    }
    next.total_price = money::item_total(&next.line_amounts());
    next.updated_at = now;

    let quantity_delta = next.quantity - item.quantity;
    Ok((next, quantity_delta))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;
    use crate::entities::ItemModification;
    use crate::external::BroadcastKitchenNotifier;
    use crate::services::testing;

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role: Role::Waiter,
        }
    }

    fn input(name: &str, unit_price: f64, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            name: Some(name.to_string()),
            unit_price: Some(unit_price),
            quantity,
            discount: None,
            tax: None,
            modifications: Vec::new(),
            notes: None,
            prep_time_minutes: None,
        }
    }

    fn product(ctx: &AuthContext, price: f64) -> products::Model {
        let now = Utc::now();
        products::Model {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            company_id: ctx.company_id,
            name: "X-Burger".to_string(),
            price,
            prep_time_minutes: 12,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(id: Uuid) -> OrderItemUpdate {
        OrderItemUpdate {
            id,
            quantity: None,
            unit_price: None,
            discount: None,
            tax: None,
            modifications: None,
            notes: None,
        }
    }

    #[test]
    fn test_two_item_order_totals() {
        let ctx = ctx();
        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let items = vec![
            draft_item(&ctx, order_id, &input("Picanha", 25.0, 2), None, now).unwrap(),
            draft_item(&ctx, order_id, &input("Guaraná", 10.0, 1), None, now).unwrap(),
        ];
        let totals = recompute_totals(&items, 5.0, 3.0);
        assert_eq!(totals.subtotal, 60.0);
        assert_eq!(totals.total, 58.0);
    }

    #[test]
    fn test_draft_item_uses_product_defaults() {
        let ctx = ctx();
        let product = product(&ctx, 32.5);
        let mut req = input("", 0.0, 2);
        req.name = None;
        req.unit_price = None;
        req.product_id = Some(product.id);
        req.modifications = vec![ItemModification {
            name: "bacon".to_string(),
            extra_price: 4.0,
        }];

        let item = draft_item(&ctx, Uuid::new_v4(), &req, Some(&product), Utc::now()).unwrap();
        assert_eq!(item.name, "X-Burger");
        assert_eq!(item.unit_price, 32.5);
        assert_eq!(item.prep_time_minutes, 12);
        assert_eq!(item.total_price, 69.0);
        assert_eq!(stock_deltas(&[item]), vec![(product.id, 2)]);
    }

    #[test]
    fn test_draft_item_validation() {
        let ctx = ctx();
        let now = Utc::now();
        assert!(draft_item(&ctx, Uuid::new_v4(), &input("Água", 4.0, 0), None, now).is_err());

        let mut no_price = input("Água", 4.0, 1);
        no_price.unit_price = None;
        assert!(draft_item(&ctx, Uuid::new_v4(), &no_price, None, now).is_err());

        let mut inactive = product(&ctx, 10.0);
        inactive.is_active = false;
        let mut req = input("X", 10.0, 1);
        req.product_id = Some(inactive.id);
        assert!(draft_item(&ctx, Uuid::new_v4(), &req, Some(&inactive), now).is_err());
    }

    #[test]
    fn test_draft_item_bounds_prep_time() {
        let ctx = ctx();
        let now = Utc::now();
        let mut slow = input("Cupim", 90.0, 1);
        slow.prep_time_minutes = Some(5000);
        let err = draft_item(&ctx, Uuid::new_v4(), &slow, None, now).unwrap_err();
        assert_eq!(err.status_code_and_code().1, "VALIDATION_ERROR");

        slow.prep_time_minutes = Some(-5);
        assert!(draft_item(&ctx, Uuid::new_v4(), &slow, None, now).is_err());

        let mut legacy = product(&ctx, 20.0);
        legacy.prep_time_minutes = i32::MAX;
        let mut req = input("", 0.0, 1);
        req.name = None;
        req.unit_price = None;
        req.product_id = Some(legacy.id);
        let item = draft_item(&ctx, Uuid::new_v4(), &req, Some(&legacy), now).unwrap();
        assert_eq!(item.prep_time_minutes, lifecycle::MAX_PREP_TIME_MINUTES);
    }

    #[test]
    fn test_frozen_item_rejects_changes() {
        let ctx = ctx();
        let now = Utc::now();
        let mut item = draft_item(&ctx, Uuid::new_v4(), &input("Moqueca", 80.0, 1), None, now)
            .unwrap();
        item.sent_to_kitchen_at = Some(now);

        let mut change = update(item.id);
        change.quantity = Some(2);
        let err = apply_item_update(&item, &change, now).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::LockedItem(ref name)) if name == "Moqueca"
        ));
    }

    #[test]
    fn test_item_update_recomputes_total_and_delta() {
        let ctx = ctx();
        let now = Utc::now();
        let item =
            draft_item(&ctx, Uuid::new_v4(), &input("Pastel", 8.0, 3), None, now).unwrap();
        assert_eq!(item.total_price, 24.0);

        let mut change = update(item.id);
        change.quantity = Some(1);
        change.discount = Some(1.0);
        let (next, delta) = apply_item_update(&item, &change, now).unwrap();
        assert_eq!(next.total_price, 7.0);
        assert_eq!(delta, -2);
    }

    fn service(db: &DatabaseConnection) -> OrderService {
        OrderService::new(db.clone(), Arc::new(BroadcastKitchenNotifier::new(8)))
    }

    #[tokio::test]
    async fn test_create_order_rolls_back_when_stock_is_short() {
        let ctx = testing::ctx(Role::Waiter);
        let product = testing::product(&ctx, 6.0);
        let cheese = testing::ingredient(&ctx, "Queijo", 0.1);
        let recipe = testing::recipe(&ctx, &product, &cheese, 0.05);

        // 条件 UPDATE 命中 0 行，库存保持不变
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![product.clone()]])
            .append_query_results([vec![recipe]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![cheese]])
            .into_connection();

        let mut line = input("", 0.0, 3);
        line.name = None;
        line.unit_price = None;
        line.product_id = Some(product.id);
        let req = CreateOrderRequest {
            channel: None,
            location_id: None,
            table_id: None,
            customer_id: None,
            people_count: Some(2),
            discount: None,
            tax: None,
            notes: None,
            items: vec![line],
        };

        let err = service(&db).create_order(&ctx, req).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InsufficientStock { ref name, available, .. })
                if name == "Queijo" && available == 0.1
        ));

        let log = testing::statements(db);
        assert!(log.iter().any(|s| s.contains(r#"UPDATE "ingredients""#)
            && s.contains(r#""current_stock" >="#)));
        assert!(!log.iter().any(|s| s.contains(r#"INSERT INTO "orders""#)));
        assert!(!log.iter().any(|s| s.contains(r#"INSERT INTO "order_items""#)));
        assert!(log.iter().any(|s| s.contains("ROLLBACK")));
        assert!(!log.iter().any(|s| s.contains("COMMIT")));
    }

    #[tokio::test]
    async fn test_preparing_stamps_only_unsent_items() {
        let ctx = testing::ctx(Role::Waiter);
        let order = testing::order(&ctx, OrderStatus::Open, 20.0);
        let mut preparing = order.clone();
        preparing.status = OrderStatus::Preparing;
        let mut sent = testing::item(&order, 10.0, 2);
        sent.sent_to_kitchen_at = Some(Utc::now());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![preparing]])
            .append_query_results([vec![sent]])
            .into_connection();

        let resp = service(&db)
            .update_status(
                &ctx,
                order.id,
                OrderStatus::Preparing,
                UpdateOrderStatusRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, OrderStatus::Preparing);

        let log = testing::statements(db);
        assert!(log.iter().any(|s| s.contains(r#"FROM "orders""#) && s.contains("FOR UPDATE")));
        let freeze = log
            .iter()
            .find(|s| s.contains(r#"UPDATE "order_items""#))
            .unwrap();
        assert!(freeze.contains(r#""sent_to_kitchen_at" IS NULL"#));
        assert!(log.iter().any(|s| s.contains("COMMIT")));
    }

    #[tokio::test]
    async fn test_later_transitions_leave_kitchen_stamps_alone() {
        let ctx = testing::ctx(Role::Waiter);
        let order = testing::order(&ctx, OrderStatus::Ready, 20.0);
        let mut delivered = order.clone();
        delivered.status = OrderStatus::Delivered;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order.clone()]])
            .append_query_results([vec![delivered]])
            .append_query_results([vec![testing::item(&order, 10.0, 2)]])
            .into_connection();

        service(&db)
            .update_status(
                &ctx,
                order.id,
                OrderStatus::Delivered,
                UpdateOrderStatusRequest::default(),
            )
            .await
            .unwrap();

        let log = testing::statements(db);
        assert!(!log.iter().any(|s| s.contains(r#"UPDATE "order_items""#)));
    }

    #[tokio::test]
    async fn test_reconcile_totals_writes_back_drift() {
        let ctx = testing::ctx(Role::Cashier);
        let stale = testing::order(&ctx, OrderStatus::Delivered, 40.0);
        let mut fixed = stale.clone();
        fixed.subtotal = 60.0;
        fixed.total = 60.0;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![testing::item(&stale, 30.0, 2)]])
            .append_query_results([vec![fixed]])
            .into_connection();

        let order = reconcile_totals(&db, stale).await.unwrap();
        assert_eq!(order.total, 60.0);

        let log = testing::statements(db);
        let update = log
            .iter()
            .find(|s| s.contains(r#"UPDATE "orders""#))
            .unwrap();
        assert!(update.contains("Double(Some(60.0))"));
    }

    #[tokio::test]
    async fn test_reconcile_totals_keeps_consistent_order() {
        let ctx = testing::ctx(Role::Cashier);
        let order = testing::order(&ctx, OrderStatus::Delivered, 60.0);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![testing::item(&order, 30.0, 2)]])
            .into_connection();

        let same = reconcile_totals(&db, order.clone()).await.unwrap();
        assert_eq!(same, order);

        let log = testing::statements(db);
        assert_eq!(log.len(), 1);
        assert!(!log.iter().any(|s| s.contains("UPDATE")));
    }
}

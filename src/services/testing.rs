//! 服务层测试夹具：MockDatabase 返回的行与 SQL 日志

use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::entities::{
    CashMovementType, CashRegisterStatus, Modifications, OrderChannel, OrderStatus,
    PaymentMethod, PaymentStatus, cash_movement_entity as movements,
    cash_register_entity as registers, ingredient_entity as ingredients,
    order_entity as orders, order_item_entity as order_items, payment_entity as payments,
    product_entity as products, recipe_ingredient_entity as recipes,
};
use crate::models::{AuthContext, Role};

pub fn ctx(role: Role) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        role,
    }
}

/// 事务日志展开为语句列表，引号已还原，便于按 SQL 片段断言
pub fn statements(db: DatabaseConnection) -> Vec<String> {
    let log = format!("{:?}", db.into_transaction_log()).replace("\\\"", "\"");
    log.split("Statement {")
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect()
}

pub fn order(ctx: &AuthContext, status: OrderStatus, total: f64) -> orders::Model {
    let now = Utc::now();
    orders::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        location_id: None,
        table_id: None,
        customer_id: None,
        status,
        channel: OrderChannel::DineIn,
        subtotal: total,
        discount: 0.0,
        tax: 0.0,
        total,
        people_count: 1,
        notes: None,
        cancellation_reason: None,
        created_by: ctx.user_id,
        closed_by: None,
        cancelled_by: None,
        ready_at: None,
        delivered_at: None,
        closed_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn item(order: &orders::Model, unit_price: f64, quantity: i32) -> order_items::Model {
    let now = Utc::now();
    order_items::Model {
        id: Uuid::new_v4(),
        tenant_id: order.tenant_id,
        company_id: order.company_id,
        order_id: order.id,
        product_id: None,
        name: "Coxinha".to_string(),
        unit_price,
        quantity,
        discount: 0.0,
        tax: 0.0,
        total_price: unit_price * f64::from(quantity),
        modifications: Modifications::default(),
        notes: None,
        prep_time_minutes: 10,
        sent_to_kitchen_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn payment(
    order: &orders::Model,
    method: PaymentMethod,
    status: PaymentStatus,
    amount: f64,
) -> payments::Model {
    let now = Utc::now();
    payments::Model {
        id: Uuid::new_v4(),
        tenant_id: order.tenant_id,
        company_id: order.company_id,
        order_id: order.id,
        method,
        status,
        amount,
        fee: 0.0,
        discount: 0.0,
        tax: 0.0,
        net_amount: amount,
        external_id: None,
        paid_at: (status == PaymentStatus::Completed).then_some(now),
        created_by: order.created_by,
        created_at: now,
        updated_at: now,
    }
}

pub fn register(ctx: &AuthContext, opening_balance: f64, expected: f64) -> registers::Model {
    let now = Utc::now();
    registers::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        status: CashRegisterStatus::Open,
        opened_by: ctx.user_id,
        closed_by: None,
        opening_balance,
        expected_balance: expected,
        closing_balance: None,
        balance_difference: None,
        notes: None,
        opened_at: now,
        closed_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn movement(
    register: &registers::Model,
    movement_type: CashMovementType,
    amount: f64,
    previous_balance: f64,
    new_balance: f64,
) -> movements::Model {
    movements::Model {
        id: Uuid::new_v4(),
        tenant_id: register.tenant_id,
        company_id: register.company_id,
        cash_register_id: register.id,
        movement_type,
        amount,
        previous_balance,
        new_balance,
        description: None,
        order_id: None,
        payment_id: None,
        created_by: register.opened_by,
        created_at: Utc::now(),
    }
}

pub fn product(ctx: &AuthContext, price: f64) -> products::Model {
    let now = Utc::now();
    products::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        name: "Pão de queijo".to_string(),
        price,
        prep_time_minutes: 8,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn ingredient(ctx: &AuthContext, name: &str, current_stock: f64) -> ingredients::Model {
    let now = Utc::now();
    ingredients::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        name: name.to_string(),
        unit: "kg".to_string(),
        current_stock,
        min_stock: 0.0,
        max_stock: None,
        unit_cost: 0.0,
        created_at: now,
        updated_at: now,
    }
}

pub fn recipe(
    ctx: &AuthContext,
    product: &products::Model,
    ingredient: &ingredients::Model,
    quantity: f64,
) -> recipes::Model {
    recipes::Model {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        product_id: product.id,
        ingredient_id: ingredient.id,
        quantity,
        created_at: Utc::now(),
    }
}

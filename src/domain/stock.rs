use std::collections::BTreeMap;

use uuid::Uuid;

use super::error::DomainError;
use super::money::ensure_amount;

/// 配方行：每份产品消耗的原料数量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipeLine {
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_per_unit: f64,
}

/// 对某个原料的净需求；正数扣减，负数回补
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockRequirement {
    pub ingredient_id: Uuid,
    pub quantity: f64,
}

impl StockRequirement {
    pub fn is_consumption(&self) -> bool {
        self.quantity > 0.0
    }
}

/// 汇总一批明细的原料需求
///
/// `items` 为 (product_id, 份数变化量)。同一原料跨多个明细合并成一条，
/// 按 ingredient_id 排序，事务内按固定顺序更新避免死锁。
pub fn requirements(recipes: &[RecipeLine], items: &[(Uuid, i32)]) -> Vec<StockRequirement> {
    let mut totals: BTreeMap<Uuid, f64> = BTreeMap::new();
    for (product_id, quantity) in items {
        if *quantity == 0 {
            continue;
        }
        for line in recipes.iter().filter(|l| l.product_id == *product_id) {
            *totals.entry(line.ingredient_id).or_insert(0.0) +=
                ensure_amount(line.quantity_per_unit) * f64::from(*quantity);
        }
    }
    totals
        .into_iter()
        .filter(|(_, quantity)| *quantity != 0.0)
        .map(|(ingredient_id, quantity)| StockRequirement {
            ingredient_id,
            quantity,
        })
        .collect()
}

pub fn check_available(name: &str, required: f64, available: f64) -> Result<(), DomainError> {
    if available < required {
        Err(DomainError::InsufficientStock {
            name: name.to_string(),
            required,
            available,
        })
    } else {
        Ok(())
    }
}

/// 手工调整后的库存，不允许为负
pub fn adjusted_stock(name: &str, current: f64, delta: f64) -> Result<f64, DomainError> {
    let next = ensure_amount(current) + ensure_amount(delta);
    if next < 0.0 {
        return Err(DomainError::InsufficientStock {
            name: name.to_string(),
            required: -ensure_amount(delta),
            available: current,
        });
    }
    Ok(next)
}

use super::error::DomainError;
use super::money::{ensure_amount, round_money};
use crate::entities::CashMovementType;

/// 流水对余额的影响：取款、支出、退款为负，其余为正
pub fn signed_amount(movement_type: CashMovementType, amount: f64) -> f64 {
    let amount = ensure_amount(amount);
    match movement_type {
        CashMovementType::Withdrawal | CashMovementType::Expense | CashMovementType::Refund => {
            -amount.abs()
        }
        _ => amount,
    }
}

/// 按全部流水重算应有余额
pub fn expected_balance<I>(movements: I) -> f64
where
    I: IntoIterator<Item = (CashMovementType, f64)>,
{
    round_money(
        movements
            .into_iter()
            .map(|(movement_type, amount)| signed_amount(movement_type, amount))
            .sum(),
    )
}

/// 新流水的 previous_balance：上一条流水的 new_balance，没有则取收银台当前余额
pub fn previous_balance(last_new_balance: Option<f64>, register_balance: f64) -> f64 {
    round_money(last_new_balance.unwrap_or(register_balance))
}

/// 追加一条流水后的余额
pub fn next_balance(previous: f64, movement_type: CashMovementType, amount: f64) -> f64 {
    round_money(previous + signed_amount(movement_type, amount))
}

/// 关账差额 = 实点金额 - 应有余额
pub fn balance_difference(closing_balance: f64, expected: f64) -> f64 {
    round_money(closing_balance - expected)
}

/// 允许手工录入的流水类型；开/关账、销售、退款由系统生成
pub fn is_manual_movement(movement_type: CashMovementType) -> bool {
    matches!(
        movement_type,
        CashMovementType::Withdrawal
            | CashMovementType::Deposit
            | CashMovementType::Expense
            | CashMovementType::Adjustment
    )
}

/// 手工流水金额：存入、取款、支出必须为正，只有调整可正可负
pub fn manual_amount(
    movement_type: CashMovementType,
    amount: Option<f64>,
) -> Result<f64, DomainError> {
    let amount = amount.map(round_money).filter(|a| *a != 0.0).ok_or_else(|| {
        DomainError::Invalid("amount must be a non-zero number".to_string())
    })?;
    if movement_type != CashMovementType::Adjustment && amount < 0.0 {
        return Err(DomainError::Invalid(format!(
            "{movement_type} amount must be positive"
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use CashMovementType::*;

    #[test]
    fn test_outflows_are_negative_regardless_of_sign() {
        assert_eq!(signed_amount(Withdrawal, 20.0), -20.0);
        assert_eq!(signed_amount(Withdrawal, -20.0), -20.0);
        assert_eq!(signed_amount(Expense, 7.5), -7.5);
        assert_eq!(signed_amount(Refund, 3.0), -3.0);
        assert_eq!(signed_amount(Sale, 12.0), 12.0);
        assert_eq!(signed_amount(Adjustment, -4.0), -4.0);
    }

    #[test]
    fn test_expected_balance_and_difference() {
        let movements = [
            (Opening, 100.0),
            (Sale, 58.0),
            (Sale, 40.0),
            (Withdrawal, 30.0),
            (Expense, 12.5),
            (Deposit, 10.0),
            (Refund, 5.0),
        ];
        let expected = expected_balance(movements);
        assert_eq!(expected, 160.5);
        assert_eq!(balance_difference(158.0, expected), -2.5);
        assert_eq!(balance_difference(160.5, expected), 0.0);
    }

    #[test]
    fn test_balance_chaining() {
        assert_eq!(previous_balance(Some(142.0), 100.0), 142.0);
        assert_eq!(previous_balance(None, 100.0), 100.0);
        assert_eq!(next_balance(100.0, Sale, 40.0), 140.0);
        assert_eq!(next_balance(140.0, Withdrawal, 50.0), 90.0);
    }

    #[test]
    fn test_manual_movement_types() {
        for t in [Withdrawal, Deposit, Expense, Adjustment] {
            assert!(is_manual_movement(t));
        }
        for t in [Opening, Closing, Sale, Refund] {
            assert!(!is_manual_movement(t));
        }
    }

    #[test]
    fn test_manual_amount_sign_rules() {
        assert_eq!(manual_amount(Deposit, Some(50.0)), Ok(50.0));
        assert!(manual_amount(Deposit, Some(-50.0)).is_err());
        assert!(manual_amount(Withdrawal, Some(-20.0)).is_err());
        assert!(manual_amount(Expense, Some(-7.5)).is_err());
        assert_eq!(manual_amount(Adjustment, Some(-4.0)), Ok(-4.0));
        assert_eq!(manual_amount(Adjustment, Some(4.0)), Ok(4.0));
        assert!(manual_amount(Adjustment, Some(0.0)).is_err());
        assert!(manual_amount(Deposit, None).is_err());
    }
}

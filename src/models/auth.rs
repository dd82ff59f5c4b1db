use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// 员工角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    Waiter,
    Kitchen,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Admin,
        Role::Manager,
        Role::Cashier,
        Role::Waiter,
        Role::Kitchen,
    ];
    /// 收银相关：支付、收银台
    pub const CASH_HANDLING: &'static [Role] = &[Role::Admin, Role::Manager, Role::Cashier];
    /// 前厅点单
    pub const ORDER_TAKING: &'static [Role] =
        &[Role::Admin, Role::Manager, Role::Cashier, Role::Waiter];
    /// 后台管理：菜品、配方、原料、采购、取消订单
    pub const BACK_OFFICE: &'static [Role] = &[Role::Admin, Role::Manager];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Cashier => write!(f, "cashier"),
            Role::Waiter => write!(f, "waiter"),
            Role::Kitchen => write!(f, "kitchen"),
        }
    }
}

/// 鉴权中间件注入到请求扩展中的当前用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn require_any(&self, roles: &[Role]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            log::warn!(
                "User {} with role {} denied (requires one of {:?})",
                self.user_id,
                self.role,
                roles
            );
            Err(AppError::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_require_any() {
        assert!(ctx(Role::Cashier).require_any(Role::CASH_HANDLING).is_ok());
        assert!(ctx(Role::Waiter).require_any(Role::CASH_HANDLING).is_err());
        assert!(ctx(Role::Kitchen).require_any(Role::ALL).is_ok());
        assert!(matches!(
            ctx(Role::Cashier).require_any(Role::BACK_OFFICE),
            Err(AppError::PermissionDenied)
        ));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Kitchen).unwrap(), "\"kitchen\"");
        let role: Role = serde_json::from_str("\"manager\"").unwrap();
        assert_eq!(role, Role::Manager);
    }
}

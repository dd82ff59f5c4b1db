//! 纯业务规则（无 I/O）。
//!
//! 服务层负责读写数据库，这里只做计算与状态校验，便于单元测试：
//! - `money`: 明细金额、订单合计、数值兜底
//! - `lifecycle`: 订单状态流转 `(state, request) -> Result<Transition, DomainError>`
//! - `payment`: 支付状态机与快速收款金额
//! - `cash`: 收银流水余额折算
//! - `stock`: 配方原料需求汇总与库存校验

pub mod cash;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod payment;
pub mod stock;

pub use error::DomainError;

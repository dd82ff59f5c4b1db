pub mod cash_movements;
pub mod cash_registers;
pub mod ingredients;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
pub mod purchase_items;
pub mod purchases;
pub mod recipe_ingredients;

pub use cash_movements as cash_movement_entity;
pub use cash_registers as cash_register_entity;
pub use ingredients as ingredient_entity;
pub use order_items as order_item_entity;
pub use orders as order_entity;
pub use payments as payment_entity;
pub use products as product_entity;
pub use purchase_items as purchase_item_entity;
pub use purchases as purchase_entity;
pub use recipe_ingredients as recipe_ingredient_entity;

pub use cash_movements::CashMovementType;
pub use cash_registers::CashRegisterStatus;
pub use order_items::{ItemModification, Modifications};
pub use orders::{OrderChannel, OrderStatus};
pub use payments::{PaymentMethod, PaymentStatus};
pub use purchases::PurchaseStatus;

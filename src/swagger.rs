use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    CashMovementType, CashRegisterStatus, ItemModification, OrderChannel, OrderStatus,
    PaymentMethod, PaymentStatus, PurchaseStatus,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::order::create_order,
        handlers::order::get_orders,
        handlers::order::get_order,
        handlers::order::update_order,
        handlers::order::update_order_status,
        handlers::payment::create_payment,
        handlers::payment::list_payments,
        handlers::payment::quick_payment,
        handlers::payment::update_payment_status,
        handlers::cash_register::open_register,
        handlers::cash_register::close_register,
        handlers::cash_register::current_register,
        handlers::cash_register::add_movement,
        handlers::catalog::create_product,
        handlers::catalog::list_products,
        handlers::catalog::get_recipe,
        handlers::catalog::set_recipe,
        handlers::catalog::create_ingredient,
        handlers::catalog::list_ingredients,
        handlers::catalog::list_low_stock,
        handlers::catalog::adjust_stock,
        handlers::purchase::create_purchase,
        handlers::purchase::get_purchase,
        handlers::purchase::confirm_purchase,
        handlers::kitchen::kitchen_events,
        handlers::kitchen::kitchen_orders,
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            OrderChannel,
            ItemModification,
            OrderItemInput,
            CreateOrderRequest,
            OrderItemUpdate,
            UpdateOrderRequest,
            UpdateOrderStatusRequest,
            OrderQuery,
            OrderItemResponse,
            OrderResponse,
            PaginatedOrderResponse,
            PaymentMethod,
            PaymentStatus,
            CreatePaymentRequest,
            UpdatePaymentStatusRequest,
            QuickPaymentRequest,
            PaymentResponse,
            QuickPaymentResponse,
            PixWebhookPayload,
            CashRegisterStatus,
            CashMovementType,
            OpenCashRegisterRequest,
            CloseCashRegisterRequest,
            CashMovementRequest,
            CashRegisterResponse,
            CashMovementResponse,
            CashRegisterDetailResponse,
            CreateProductRequest,
            ProductResponse,
            RecipeLineInput,
            SetRecipeRequest,
            RecipeLineResponse,
            CreateIngredientRequest,
            AdjustStockRequest,
            IngredientResponse,
            PurchaseStatus,
            PurchaseItemInput,
            CreatePurchaseRequest,
            PurchaseItemResponse,
            PurchaseResponse,
            KitchenItemSnapshot,
            KitchenOrderSnapshot,
            KitchenEvent,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "order", description = "Order lifecycle API"),
        (name = "payment", description = "Payment and quick payment API"),
        (name = "cash_register", description = "Cash register ledger API"),
        (name = "catalog", description = "Products, recipes and ingredients API"),
        (name = "purchase", description = "Stock purchase API"),
        (name = "kitchen", description = "Kitchen display feed"),
    ),
    info(
        title = "Comanda Backend API",
        version = "1.0.0",
        description = "Multi-tenant restaurant backend REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

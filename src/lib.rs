pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod orders;
pub mod pricing;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use catalog::CatalogRepository;
use config::AppConfig;
use orders::{OrderService, OrdersRepository};
use pricing::{PriceEngine, PriceRuleRepository, PricingMetrics, PricingState};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        pricing::handlers::get_product_price,
        pricing::handlers::get_pricing_metrics,
        catalog::handlers::list_products,
        catalog::handlers::get_product,
        pricing::admin::create_price_rule,
        pricing::admin::list_price_rules,
        pricing::admin::get_price_rule,
        pricing::admin::update_price_rule,
        pricing::admin::deactivate_price_rule,
        pricing::admin::activate_price_rule,
        orders::handlers::create_order_handler,
        orders::handlers::get_order_handler,
        orders::handlers::update_order_item_handler,
    ),
    components(schemas(
        pricing::PriceResult,
        pricing::AppliedRule,
        pricing::RuleScope,
        pricing::RuleType,
        pricing::MetricsSummary,
        pricing::admin::PriceRuleRequest,
        pricing::admin::PriceRuleResponse,
        catalog::ProductResponse,
        orders::OrderStatus,
        orders::OrderItemRequest,
        orders::CreateOrderRequest,
        orders::UpdateOrderItemRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "pricing", description = "Live price calculation"),
        (name = "catalog", description = "Storefront product reads"),
        (name = "price-rules", description = "Price rule administration"),
        (name = "orders", description = "Orders with frozen line prices")
    ),
    info(
        title = "Moto Parts Pricing API",
        version = "0.1.0",
        description = "Rule-based price engine for the motorcycle parts catalog"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PriceEngine>,
    pub tokens: Arc<TokenService>,
    pub catalog: CatalogRepository,
    pub rules: PriceRuleRepository,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        let catalog = CatalogRepository::new(pool.clone());
        let metrics = PricingMetrics::with_slow_threshold(config.slow_pricing_threshold);
        let engine = Arc::new(PriceEngine::with_metrics(Arc::new(catalog.clone()), metrics));

        Self {
            tokens: Arc::new(TokenService::new(&config.jwt_secret)),
            rules: PriceRuleRepository::new(pool.clone()),
            orders: OrderService::new(OrdersRepository::new(pool), engine.clone()),
            catalog,
            engine,
        }
    }

    pub fn pricing_state(&self) -> PricingState {
        PricingState {
            engine: self.engine.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pricing_routes = pricing::handlers::routes(state.pricing_state());

    let app_routes = Router::new()
        .route("/api/products", get(catalog::handlers::list_products))
        .route("/api/products/:id", get(catalog::handlers::get_product))
        .route(
            "/api/admin/price-rules",
            post(pricing::admin::create_price_rule).get(pricing::admin::list_price_rules),
        )
        .route(
            "/api/admin/price-rules/:id",
            get(pricing::admin::get_price_rule).put(pricing::admin::update_price_rule),
        )
        .route(
            "/api/admin/price-rules/:id/deactivate",
            post(pricing::admin::deactivate_price_rule),
        )
        .route(
            "/api/admin/price-rules/:id/activate",
            post(pricing::admin::activate_price_rule),
        )
        .route("/api/orders", post(orders::handlers::create_order_handler))
        .route("/api/orders/:order_id", get(orders::handlers::get_order_handler))
        .route(
            "/api/orders/:order_id/items/:item_id",
            patch(orders::handlers::update_order_item_handler),
        )
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(app_routes)
        .merge(pricing_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

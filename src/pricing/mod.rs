// Pricing module
// Computes live product prices by folding ordered price rules over the base
// price, and exposes rule administration for catalog operators.

pub mod admin;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod result;
pub mod rule;
pub mod service;
pub mod store;
pub mod types;

pub use error::PricingError;
pub use handlers::PricingState;
pub use metrics::{MetricsSummary, PricingMetrics};
pub use repository::{NewPriceRule, PriceRuleRepository, RuleFilter};
pub use result::{AppliedRule, PriceResult};
pub use rule::{PriceRule, PriceRuleRow};
pub use service::PriceEngine;
pub use store::CatalogStore;
pub use types::{PricedProduct, RuleScope, RuleTarget, RuleType};

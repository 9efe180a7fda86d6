// HTTP handlers for price rule administration (Admin only)
//
// Rules are never deleted. Edits take effect on the next price calculation;
// existing order lines keep their frozen snapshots.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::AdminUser;
use crate::pricing::error::PricingError;
use crate::pricing::repository::{NewPriceRule, RuleFilter};
use crate::pricing::rule::PriceRuleRow;
use crate::pricing::types::{RuleScope, RuleTarget, RuleType};
use crate::AppState;

/// Request DTO for creating or replacing a price rule
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_rule_request", skip_on_field_errors = false))]
pub struct PriceRuleRequest {
    pub scope: RuleScope,
    /// Category id or product id; required for those scopes, absent for global
    pub scope_target: Option<i32>,
    pub rule_type: RuleType,
    /// Signed delta: percentage points or currency amount
    #[schema(value_type = String, example = "-10")]
    pub value: Decimal,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

fn validate_rule_request(request: &PriceRuleRequest) -> Result<(), ValidationError> {
    match (request.scope, request.scope_target) {
        (RuleScope::Global, Some(_)) => {
            let mut err = ValidationError::new("scope_target_not_allowed");
            err.message = Some("Global rules must not carry a scope_target".into());
            return Err(err);
        }
        (RuleScope::Category | RuleScope::Product, None) => {
            let mut err = ValidationError::new("scope_target_required");
            err.message = Some(format!("{} rules require a scope_target", request.scope).into());
            return Err(err);
        }
        _ => {}
    }

    if let (Some(starts_at), Some(ends_at)) = (request.starts_at, request.ends_at) {
        if starts_at > ends_at {
            let mut err = ValidationError::new("invalid_window");
            err.message = Some("starts_at must not be after ends_at".into());
            return Err(err);
        }
    }

    Ok(())
}

impl PriceRuleRequest {
    /// Validate and convert into repository fields
    pub fn into_new_rule(self) -> Result<NewPriceRule, PricingError> {
        self.validate()?;

        let target = RuleTarget::from_parts(self.scope, self.scope_target).ok_or_else(|| {
            PricingError::ValidationError(format!("{} rules require a scope_target", self.scope))
        })?;

        Ok(NewPriceRule {
            target,
            rule_type: self.rule_type,
            value: self.value,
            priority: self.priority,
            is_active: self.is_active,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        })
    }
}

/// Response DTO for a price rule
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceRuleResponse {
    pub id: i32,
    pub scope: RuleScope,
    pub scope_target: Option<i32>,
    pub rule_type: RuleType,
    #[schema(value_type = String, example = "-10")]
    pub value: Decimal,
    pub priority: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decodes a stored row without requiring a usable target, so inert
/// category/product rules stay readable and can be retired.
impl TryFrom<PriceRuleRow> for PriceRuleResponse {
    type Error = PricingError;

    fn try_from(row: PriceRuleRow) -> Result<Self, Self::Error> {
        let malformed = |reason: String| PricingError::MalformedRule {
            rule_id: row.id,
            reason,
        };

        let scope: RuleScope = row.scope.parse().map_err(malformed)?;
        let rule_type: RuleType = row.rule_type.parse().map_err(malformed)?;

        Ok(Self {
            id: row.id,
            scope,
            scope_target: match scope {
                RuleScope::Global => None,
                RuleScope::Category | RuleScope::Product => row.scope_target,
            },
            rule_type,
            value: row.value,
            priority: row.priority,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Query parameters for listing rules
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RuleListQuery {
    pub scope: Option<RuleScope>,
    pub active: Option<bool>,
}

async fn ensure_target_exists(state: &AppState, target: RuleTarget) -> Result<(), PricingError> {
    if state.catalog.target_exists(target).await? {
        return Ok(());
    }

    let message = match target {
        RuleTarget::Category(id) => format!("Category {} does not exist", id),
        RuleTarget::Product(id) => format!("Product {} does not exist", id),
        RuleTarget::Global => return Ok(()),
    };
    tracing::warn!("Rejected price rule: {}", message);
    Err(PricingError::InvalidScopeTarget(message))
}

/// Handler for POST /api/admin/price-rules
#[utoipa::path(
    post,
    path = "/api/admin/price-rules",
    request_body = PriceRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = PriceRuleResponse),
        (status = 400, description = "Invalid rule"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn create_price_rule(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<PriceRuleRequest>,
) -> Result<(StatusCode, Json<PriceRuleResponse>), PricingError> {
    let new_rule = request.into_new_rule()?;
    ensure_target_exists(&state, new_rule.target).await?;

    let rule = PriceRuleResponse::try_from(state.rules.create(&new_rule).await?)?;

    tracing::info!(
        "Price rule {} created by user {}: {} {} {}",
        rule.id,
        admin.user_id,
        rule.scope,
        rule.rule_type,
        rule.value
    );
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Handler for GET /api/admin/price-rules
#[utoipa::path(
    get,
    path = "/api/admin/price-rules",
    params(RuleListQuery),
    responses(
        (status = 200, description = "Rules in evaluation order", body = Vec<PriceRuleResponse>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn list_price_rules(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RuleListQuery>,
) -> Result<Json<Vec<PriceRuleResponse>>, PricingError> {
    let filter = RuleFilter {
        scope: query.scope,
        is_active: query.active,
    };
    let mut rules = Vec::new();
    for row in state.rules.list(&filter).await? {
        match PriceRuleResponse::try_from(row) {
            Ok(rule) => rules.push(rule),
            Err(e) => tracing::warn!("Listing skipped malformed rule: {}", e),
        }
    }

    tracing::debug!("Listed {} price rules", rules.len());
    Ok(Json(rules))
}

/// Handler for GET /api/admin/price-rules/:id
#[utoipa::path(
    get,
    path = "/api/admin/price-rules/{id}",
    params(("id" = i32, Path, description = "Price rule ID")),
    responses(
        (status = 200, description = "Rule found", body = PriceRuleResponse),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn get_price_rule(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<PriceRuleResponse>, PricingError> {
    let row = state
        .rules
        .find_by_id(id)
        .await?
        .ok_or(PricingError::RuleNotFound(id))?;
    let rule = PriceRuleResponse::try_from(row)?;

    Ok(Json(rule))
}

/// Handler for PUT /api/admin/price-rules/:id
#[utoipa::path(
    put,
    path = "/api/admin/price-rules/{id}",
    params(("id" = i32, Path, description = "Price rule ID")),
    request_body = PriceRuleRequest,
    responses(
        (status = 200, description = "Rule replaced", body = PriceRuleResponse),
        (status = 400, description = "Invalid rule"),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn update_price_rule(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(request): Json<PriceRuleRequest>,
) -> Result<Json<PriceRuleResponse>, PricingError> {
    let new_rule = request.into_new_rule()?;
    ensure_target_exists(&state, new_rule.target).await?;

    let row = state
        .rules
        .update(id, &new_rule)
        .await?
        .ok_or(PricingError::RuleNotFound(id))?;
    let rule = PriceRuleResponse::try_from(row)?;

    tracing::info!("Price rule {} updated by user {}", rule.id, admin.user_id);
    Ok(Json(rule))
}

async fn set_rule_active(
    state: &AppState,
    admin_id: i32,
    id: i32,
    is_active: bool,
) -> Result<Json<PriceRuleResponse>, PricingError> {
    let row = state
        .rules
        .set_active(id, is_active)
        .await?
        .ok_or(PricingError::RuleNotFound(id))?;
    let rule = PriceRuleResponse::try_from(row)?;

    tracing::info!(
        "Price rule {} {} by user {}",
        rule.id,
        if is_active { "activated" } else { "deactivated" },
        admin_id
    );
    Ok(Json(rule))
}

/// Handler for POST /api/admin/price-rules/:id/deactivate
#[utoipa::path(
    post,
    path = "/api/admin/price-rules/{id}/deactivate",
    params(("id" = i32, Path, description = "Price rule ID")),
    responses(
        (status = 200, description = "Rule deactivated", body = PriceRuleResponse),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn deactivate_price_rule(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<PriceRuleResponse>, PricingError> {
    set_rule_active(&state, admin.user_id, id, false).await
}

/// Handler for POST /api/admin/price-rules/:id/activate
#[utoipa::path(
    post,
    path = "/api/admin/price-rules/{id}/activate",
    params(("id" = i32, Path, description = "Price rule ID")),
    responses(
        (status = 200, description = "Rule activated", body = PriceRuleResponse),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "price-rules"
)]
pub async fn activate_price_rule(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<PriceRuleResponse>, PricingError> {
    set_rule_active(&state, admin.user_id, id, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn request(scope: RuleScope, scope_target: Option<i32>) -> PriceRuleRequest {
        PriceRuleRequest {
            scope,
            scope_target,
            rule_type: RuleType::Percentage,
            value: dec!(-10),
            priority: 1,
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_global_rule_without_target_is_valid() {
        let rule = request(RuleScope::Global, None).into_new_rule().unwrap();
        assert_eq!(rule.target, RuleTarget::Global);
    }

    #[test]
    fn test_targeted_rules_convert() {
        let rule = request(RuleScope::Category, Some(4)).into_new_rule().unwrap();
        assert_eq!(rule.target, RuleTarget::Category(4));

        let rule = request(RuleScope::Product, Some(9)).into_new_rule().unwrap();
        assert_eq!(rule.target, RuleTarget::Product(9));
    }

    #[test]
    fn test_targeted_rule_requires_target() {
        for scope in [RuleScope::Category, RuleScope::Product] {
            let err = request(scope, None).into_new_rule().unwrap_err();
            assert!(matches!(err, PricingError::ValidationError(_)));
        }
    }

    #[test]
    fn test_global_rule_rejects_target() {
        let err = request(RuleScope::Global, Some(1)).into_new_rule().unwrap_err();
        assert!(matches!(err, PricingError::ValidationError(_)));
    }

    #[test]
    fn test_window_must_be_ordered() {
        let mut req = request(RuleScope::Global, None);
        req.starts_at = Some(Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap());
        req.ends_at = Some(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
        assert!(req.clone().into_new_rule().is_err());

        // a single-instant window is allowed
        req.ends_at = req.starts_at;
        assert!(req.into_new_rule().is_ok());
    }

    #[test]
    fn test_zero_value_is_allowed() {
        let mut req = request(RuleScope::Global, None);
        req.value = Decimal::ZERO;
        assert!(req.into_new_rule().is_ok());
    }

    #[test]
    fn test_request_defaults() {
        let req: PriceRuleRequest = serde_json::from_value(serde_json::json!({
            "scope": "global",
            "rule_type": "amount",
            "value": "5.00"
        }))
        .unwrap();

        assert!(req.is_active);
        assert_eq!(req.priority, 0);
        assert_eq!(req.value, dec!(5.00));
    }

    fn stored_row(scope: &str, scope_target: Option<i32>) -> PriceRuleRow {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        PriceRuleRow {
            id: 3,
            scope: scope.to_string(),
            scope_target,
            rule_type: "amount".to_string(),
            value: dec!(-2.50),
            priority: 4,
            is_active: false,
            starts_at: None,
            ends_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_response_from_row() {
        let response = PriceRuleResponse::try_from(stored_row("product", Some(12))).unwrap();
        assert_eq!(response.scope, RuleScope::Product);
        assert_eq!(response.scope_target, Some(12));
        assert_eq!(response.rule_type, RuleType::Amount);
        assert!(!response.is_active);
    }

    #[test]
    fn test_inert_row_is_still_readable() {
        let response = PriceRuleResponse::try_from(stored_row("category", None)).unwrap();
        assert_eq!(response.scope, RuleScope::Category);
        assert_eq!(response.scope_target, None);
    }

    #[test]
    fn test_global_row_hides_stray_target() {
        let response = PriceRuleResponse::try_from(stored_row("global", Some(5))).unwrap();
        assert_eq!(response.scope_target, None);
    }

    #[test]
    fn test_unknown_scope_row_is_malformed() {
        let err = PriceRuleResponse::try_from(stored_row("dealer", Some(1))).unwrap_err();
        assert!(matches!(err, PricingError::MalformedRule { rule_id: 3, .. }));
    }
}

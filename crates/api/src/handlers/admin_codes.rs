//! Admin handlers for redemption code management.
//!
//! Codes are created in bulk against a plan; the plan's duration is
//! snapshotted onto each code at generation time. Code management is
//! available to `codes_seller` operators as well as admins.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use primex_core::codes::CodeStatus;
use primex_core::error::CoreError;
use primex_core::types::{DbId, Timestamp};
use primex_db::models::code::{CodeFilter, NewCodeBatch, SubscriptionCode, UpdateCode};
use primex_db::models::code_usage::CodeUsageWithUser;
use primex_db::repositories::{CodeRepo, CodeUsageRepo, PlanRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireCodesManager;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/codes/generate`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateCodesRequest {
    #[validate(range(min = 1, max = 1000, message = "Count must be between 1 and 1000"))]
    pub count: i64,
    pub source_name: Option<String>,
    #[validate(range(min = 1, message = "Max uses must be at least 1"))]
    pub max_uses: Option<i32>,
    pub plan_id: DbId,
    pub expires_at: Option<Timestamp>,
}

/// Response body for a bulk generation.
#[derive(Debug, Serialize)]
pub struct GeneratedCodes {
    pub codes: Vec<String>,
    pub count: usize,
}

/// Query parameters for `GET /admin/codes`.
#[derive(Debug, Deserialize)]
pub struct CodeListParams {
    pub status: Option<CodeStatus>,
    pub source_name: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response body for `GET /admin/codes/stats`.
#[derive(Debug, Serialize)]
pub struct CodeStatsResponse {
    /// Codes still redeemable, surfaced under the dashboard's label.
    pub available: i64,
    pub total: i64,
    pub used: i64,
    pub expired: i64,
    pub disabled: i64,
    pub sources: Vec<primex_db::models::code::SourceCount>,
}

/// Response body for `GET /admin/codes/{id}`.
#[derive(Debug, Serialize)]
pub struct CodeDetail {
    pub code: SubscriptionCode,
    pub usage_history: Vec<CodeUsageWithUser>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/codes/generate
///
/// Bulk-create codes against a plan. The plan must exist and be active.
pub async fn generate(
    RequireCodesManager(operator): RequireCodesManager,
    State(state): State<AppState>,
    Json(input): Json<GenerateCodesRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Validation failed: {e}")))?;

    let plan = PlanRepo::find_active_by_id(&state.pool, input.plan_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SubscriptionPlan",
            id: input.plan_id,
        }))?;

    let batch = NewCodeBatch {
        source_name: input.source_name.clone(),
        duration_days: plan.duration_days,
        max_uses: input.max_uses.unwrap_or(1),
        plan_id: plan.id,
        expires_at: input.expires_at,
        created_by: Some(operator.operator_id),
    };

    let created = CodeRepo::create_batch(&state.pool, input.count as usize, &batch).await?;

    tracing::info!(
        count = created.len(),
        plan_id = plan.id,
        source = ?input.source_name,
        operator_id = operator.operator_id,
        "Codes generated"
    );

    let response = GeneratedCodes {
        count: created.len(),
        codes: created.into_iter().map(|c| c.code).collect(),
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/admin/codes
///
/// List codes with optional status / source / substring filters.
pub async fn list(
    _operator: RequireCodesManager,
    State(state): State<AppState>,
    Query(params): Query<CodeListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = CodeFilter {
        status: params.status,
        source_name: params.source_name,
        search: params.search,
    };
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let codes = CodeRepo::list(&state.pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(DataResponse { data: codes }))
}

/// GET /api/v1/admin/codes/stats
pub async fn stats(
    _operator: RequireCodesManager,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = CodeRepo::stats(&state.pool).await?;
    let sources = CodeRepo::counts_by_source(&state.pool).await?;

    let response = CodeStatsResponse {
        available: stats.active,
        total: stats.total,
        used: stats.used,
        expired: stats.expired,
        disabled: stats.disabled,
        sources,
    };
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/admin/codes/{id}
///
/// A code together with its redemption history.
pub async fn get(
    _operator: RequireCodesManager,
    State(state): State<AppState>,
    Path(code_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let code = CodeRepo::find_by_id(&state.pool, code_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SubscriptionCode",
            id: code_id,
        }))?;
    let usage_history = CodeUsageRepo::list_for_code(&state.pool, code_id).await?;

    Ok(Json(DataResponse {
        data: CodeDetail {
            code,
            usage_history,
        },
    }))
}

/// PUT /api/v1/admin/codes/{id}
///
/// Update a code's mutable fields. Status changes must follow the
/// forward-only transition table; a `used` or `expired` code never becomes
/// redeemable again.
pub async fn update(
    _operator: RequireCodesManager,
    State(state): State<AppState>,
    Path(code_id): Path<DbId>,
    Json(input): Json<UpdateCode>,
) -> AppResult<impl IntoResponse> {
    let current = CodeRepo::find_by_id(&state.pool, code_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SubscriptionCode",
            id: code_id,
        }))?;

    if let Some(next) = input.status {
        if next != current.status && !current.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot change code status from {} to {}",
                current.status, next
            )));
        }
    }

    let updated = CodeRepo::update(&state.pool, code_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SubscriptionCode",
            id: code_id,
        }))?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/admin/codes/{id}
///
/// Delete a code. Used codes are audit records and cannot be deleted.
pub async fn delete(
    _operator: RequireCodesManager,
    State(state): State<AppState>,
    Path(code_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let code = CodeRepo::find_by_id(&state.pool, code_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SubscriptionCode",
            id: code_id,
        }))?;

    if code.status == CodeStatus::Used {
        return Err(AppError::BadRequest("Cannot delete a used code".into()));
    }

    CodeRepo::delete(&state.pool, code_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

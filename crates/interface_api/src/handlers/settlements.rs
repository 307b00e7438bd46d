//! Agent and manager settlement handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{AgentSettlementId, ManagerSettlementId};
use domain_directory::{Actor, Role};
use domain_settlement::SettlementStatus;
use infra_db::ListFilter;

use crate::auth::{require_role, roles};
use crate::dto::finance::*;
use crate::dto::ListQuery;
use crate::{error::ApiError, AppState};

// ---------------------------------------------------------------------------
// Agent level
// ---------------------------------------------------------------------------

pub async fn preview_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<AgentSettlementPreview>, ApiError> {
    require_role(&actor, &[Role::Agent])?;

    let snapshot = state.settlements.preview_agent_settlement(actor.user_id).await?;
    Ok(Json((&snapshot).into()))
}

pub async fn create_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateSettlementRequest>,
) -> Result<(StatusCode, Json<AgentSettlementResponse>), ApiError> {
    require_role(&actor, &[Role::Agent])?;
    request.validate()?;

    let settlement = state
        .settlements
        .create_agent_settlement(actor.user_id, !request.save_as_draft, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json((&settlement).into())))
}

pub async fn list_agent_settlements(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AgentSettlementResponse>>, ApiError> {
    require_role(&actor, roles::AGENT_SETTLEMENT_READERS)?;
    query.validate()?;

    let filter = ListFilter {
        agent_id: (actor.role == Role::Agent).then_some(actor.user_id),
        manager_id: (actor.role == Role::GovernorateManager).then_some(actor.user_id),
        status: query.status::<SettlementStatus>()?,
        page: query.page(),
    };
    let settlements = state.settlements.list_agent_settlements(filter).await?;
    Ok(Json(settlements.iter().map(AgentSettlementResponse::from).collect()))
}

pub async fn get_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentSettlementResponse>, ApiError> {
    require_role(&actor, roles::AGENT_SETTLEMENT_READERS)?;

    let settlement = state
        .settlements
        .find_agent_settlement(AgentSettlementId::from_uuid(id))
        .await?;
    if !settlement.can_view(&actor) {
        return Err(ApiError::Forbidden(format!(
            "settlement {} belongs to another agent or manager",
            settlement.settlement_number
        )));
    }
    Ok(Json((&settlement).into()))
}

/// DRAFT → PENDING_MANAGER
pub async fn submit_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::Agent])?;

    let settlement = state
        .settlements
        .submit_agent_settlement(AgentSettlementId::from_uuid(id), &actor)
        .await?;
    Ok(Json((&settlement).into()))
}

/// Manager confirms receipt of the agent's cash
pub async fn confirm_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::GovernorateManager, Role::Admin])?;

    let settlement = state
        .settlements
        .confirm_agent_settlement(AgentSettlementId::from_uuid(id), &actor)
        .await?;
    Ok(Json((&settlement).into()))
}

pub async fn cancel_agent_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelSettlementRequest>,
) -> Result<Json<AgentSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::Agent, Role::GovernorateManager, Role::Admin])?;
    request.validate()?;

    let settlement = state
        .settlements
        .cancel_agent_settlement(AgentSettlementId::from_uuid(id), &actor, request.reason)
        .await?;
    Ok(Json((&settlement).into()))
}

// ---------------------------------------------------------------------------
// Manager level
// ---------------------------------------------------------------------------

pub async fn preview_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ManagerSettlementPreview>, ApiError> {
    require_role(&actor, &[Role::GovernorateManager])?;

    let snapshot = state.settlements.preview_manager_settlement(actor.user_id).await?;
    Ok(Json((&snapshot).into()))
}

pub async fn create_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateSettlementRequest>,
) -> Result<(StatusCode, Json<ManagerSettlementResponse>), ApiError> {
    require_role(&actor, &[Role::GovernorateManager])?;
    request.validate()?;

    let settlement = state
        .settlements
        .create_manager_settlement(actor.user_id, !request.save_as_draft, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json((&settlement).into())))
}

pub async fn list_manager_settlements(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ManagerSettlementResponse>>, ApiError> {
    require_role(&actor, roles::MANAGER_SETTLEMENT_READERS)?;
    query.validate()?;

    let filter = ListFilter {
        agent_id: None,
        manager_id: (actor.role == Role::GovernorateManager).then_some(actor.user_id),
        status: query.status::<SettlementStatus>()?,
        page: query.page(),
    };
    let settlements = state.settlements.list_manager_settlements(filter).await?;
    Ok(Json(settlements.iter().map(ManagerSettlementResponse::from).collect()))
}

pub async fn get_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManagerSettlementResponse>, ApiError> {
    require_role(&actor, roles::MANAGER_SETTLEMENT_READERS)?;

    let settlement = state
        .settlements
        .find_manager_settlement(ManagerSettlementId::from_uuid(id))
        .await?;
    if !settlement.can_view(&actor) {
        return Err(ApiError::Forbidden(format!(
            "settlement {} belongs to another manager",
            settlement.settlement_number
        )));
    }
    Ok(Json((&settlement).into()))
}

/// DRAFT → PENDING_ADMIN
pub async fn submit_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManagerSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::GovernorateManager])?;

    let settlement = state
        .settlements
        .submit_manager_settlement(ManagerSettlementId::from_uuid(id), &actor)
        .await?;
    Ok(Json((&settlement).into()))
}

/// Admin confirms receipt of the company share
pub async fn confirm_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManagerSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::Admin])?;

    let settlement = state
        .settlements
        .confirm_manager_settlement(ManagerSettlementId::from_uuid(id), &actor)
        .await?;
    Ok(Json((&settlement).into()))
}

pub async fn cancel_manager_settlement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelSettlementRequest>,
) -> Result<Json<ManagerSettlementResponse>, ApiError> {
    require_role(&actor, &[Role::GovernorateManager, Role::Admin])?;
    request.validate()?;

    let settlement = state
        .settlements
        .cancel_manager_settlement(ManagerSettlementId::from_uuid(id), &actor, request.reason)
        .await?;
    Ok(Json((&settlement).into()))
}

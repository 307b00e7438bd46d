//! Collection and commission handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BusinessId, BusinessPackageId, CommissionId, Money, UserId};
use domain_directory::{Actor, Role};
use domain_settlement::{CollectionStatus, CommissionStatus};
use infra_db::{ListFilter, NewCollection};

use crate::auth::{require_role, roles};
use crate::dto::finance::*;
use crate::dto::ListQuery;
use crate::{error::ApiError, AppState};

/// Restricts agents to their own items and managers to their agents'
fn finance_scope<S>(actor: &Actor, query: &ListQuery) -> Result<ListFilter<S>, ApiError>
where
    S: std::str::FromStr,
    S::Err: std::fmt::Display,
{
    let (agent_id, manager_id): (Option<UserId>, Option<UserId>) = match actor.role {
        Role::Agent => (Some(actor.user_id), None),
        Role::GovernorateManager => (None, Some(actor.user_id)),
        _ => (None, None),
    };
    Ok(ListFilter {
        agent_id,
        manager_id,
        status: query.status()?,
        page: query.page(),
    })
}

/// Records cash an agent received from a business
pub async fn record_collection(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<RecordedCollectionResponse>), ApiError> {
    require_role(&actor, &[Role::Agent])?;
    request.validate()?;

    let (collection, commission) = state
        .settlements
        .record_collection(
            actor.user_id,
            NewCollection {
                business_id: BusinessId::from_uuid(request.business_id),
                business_package_id: request.business_package_id.map(BusinessPackageId::from_uuid),
                amount: Money::positive(request.amount, state.config.currency)?,
                notes: request.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordedCollectionResponse {
            collection: (&collection).into(),
            commission: (&commission).into(),
        }),
    ))
}

pub async fn list_collections(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CollectionResponse>>, ApiError> {
    require_role(&actor, roles::FINANCE_READERS)?;
    query.validate()?;

    let filter = finance_scope::<CollectionStatus>(&actor, &query)?;
    let collections = state.settlements.list_collections(filter).await?;
    Ok(Json(collections.iter().map(CollectionResponse::from).collect()))
}

pub async fn list_commissions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CommissionResponse>>, ApiError> {
    require_role(&actor, roles::FINANCE_READERS)?;
    query.validate()?;

    let filter = finance_scope::<CommissionStatus>(&actor, &query)?;
    let commissions = state.settlements.list_commissions(filter).await?;
    Ok(Json(commissions.iter().map(CommissionResponse::from).collect()))
}

/// PENDING → APPROVED
pub async fn approve_commission(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommissionResponse>, ApiError> {
    require_role(&actor, roles::BACK_OFFICE)?;

    let commission = state
        .settlements
        .approve_commission(CommissionId::from_uuid(id))
        .await?;
    Ok(Json((&commission).into()))
}

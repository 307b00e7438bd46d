//! Renewal handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Money, PackageId, RenewalId, UserId};
use domain_directory::{Actor, Role};
use domain_renewal::{JobSummary, RenewalStats, RenewalStatus};
use infra_db::{NewContact, NewDecision, RenewalFilter};

use crate::auth::{require_role, roles};
use crate::dto::renewal::*;
use crate::dto::ListQuery;
use crate::{error::ApiError, AppState};

/// Highest priority first; agents see only their assigned records
pub async fn list_renewals(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RenewalResponse>>, ApiError> {
    require_role(&actor, roles::RENEWAL_WORKERS)?;
    query.validate()?;

    let filter = RenewalFilter::visible_to(&actor, query.status::<RenewalStatus>()?, query.page());
    let records = state.renewals.list(filter).await?;
    Ok(Json(records.iter().map(RenewalResponse::from).collect()))
}

pub async fn renewal_stats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<RenewalStats>, ApiError> {
    require_role(&actor, roles::BACK_OFFICE)?;
    Ok(Json(state.renewals.stats().await?))
}

pub async fn get_renewal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<RenewalResponse>, ApiError> {
    require_role(&actor, roles::RENEWAL_WORKERS)?;

    let record = state.renewals.find(RenewalId::from_uuid(id)).await?;
    record.authorize(&actor)?;
    Ok(Json((&record).into()))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    require_role(&actor, roles::RENEWAL_WORKERS)?;

    let id = RenewalId::from_uuid(id);
    let record = state.renewals.find(id).await?;
    record.authorize(&actor)?;

    let contacts = state.renewals.contacts(id).await?;
    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

pub async fn log_contact(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<LogContactRequest>,
) -> Result<(StatusCode, Json<LoggedContactResponse>), ApiError> {
    require_role(&actor, roles::RENEWAL_WORKERS)?;
    request.validate()?;

    let (record, contact) = state
        .renewals
        .log_contact(
            RenewalId::from_uuid(id),
            &actor,
            NewContact {
                contact_type: request.contact_type,
                notes: request.notes,
                outcome: request.outcome,
                next_follow_up: request.next_follow_up,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoggedContactResponse {
            renewal: (&record).into(),
            contact: (&contact).into(),
        }),
    ))
}

pub async fn record_decision(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    require_role(&actor, roles::RENEWAL_WORKERS)?;
    request.validate()?;

    let collected_amount = request
        .collected_amount
        .map(|amount| Money::positive(amount, state.config.currency))
        .transpose()?;

    let result = state
        .renewals
        .decide(
            RenewalId::from_uuid(id),
            &actor,
            NewDecision {
                decision: request.decision,
                new_package_id: request.new_package_id.map(PackageId::from_uuid),
                next_follow_up: request.next_follow_up,
                notes: request.notes,
                collected_amount,
            },
            state.timezone.today(),
        )
        .await?;

    Ok(Json((&result).into()))
}

pub async fn assign_renewal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<RenewalResponse>, ApiError> {
    require_role(&actor, roles::BACK_OFFICE)?;

    let record = state
        .renewals
        .assign(RenewalId::from_uuid(id), UserId::from_uuid(request.agent_id))
        .await?;
    Ok(Json((&record).into()))
}

/// Runs both daily jobs now
pub async fn run_jobs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<JobSummary>, ApiError> {
    require_role(&actor, &[Role::Admin])?;

    let today = state.timezone.today();
    info!(admin = %actor.user_id, %today, "Manual renewal run requested");
    let summary = state.jobs.run_daily(today).await?;
    Ok(Json(summary))
}

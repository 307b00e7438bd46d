//! Accountant report handlers

use axum::{extract::State, Extension, Json};

use domain_directory::Actor;

use crate::auth::{require_role, roles};
use crate::dto::accounting::TrialBalanceResponse;
use crate::{error::ApiError, AppState};

pub async fn trial_balance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TrialBalanceResponse>, ApiError> {
    require_role(&actor, roles::ACCOUNTING)?;

    let report = state.accounting.trial_balance().await?;
    Ok(Json((&report).into()))
}

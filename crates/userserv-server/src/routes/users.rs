//! `/v1/users` endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use userserv_auth::Caller;
use userserv_core::{NewPrincipal, PrincipalId, PrincipalPatch, PrincipalView};

use crate::error::ServiceResult;
use crate::server::AppState;
use crate::validation;

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewPrincipal>,
) -> ServiceResult<(StatusCode, Json<PrincipalView>)> {
    validation::validate_new_principal(&new)?;
    let view = state.principals.create(&caller, new).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn find_by_id(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<PrincipalId>,
) -> ServiceResult<Json<PrincipalView>> {
    Ok(Json(state.principals.find_by_id(&caller, id).await?))
}

pub async fn find_by_email(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> ServiceResult<Json<PrincipalView>> {
    Ok(Json(state.principals.find_by_email(&caller, &email).await?))
}

pub async fn find_by_ids(
    State(state): State<AppState>,
    caller: Caller,
    Json(ids): Json<Vec<PrincipalId>>,
) -> ServiceResult<Json<Vec<PrincipalView>>> {
    Ok(Json(state.principals.find_by_ids(&caller, &ids).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<PrincipalId>,
    Json(patch): Json<PrincipalPatch>,
) -> ServiceResult<Json<PrincipalView>> {
    validation::validate_principal_patch(&patch)?;
    Ok(Json(state.principals.update(&caller, id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<PrincipalId>,
) -> ServiceResult<StatusCode> {
    state.principals.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! `/v1/cards` endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use userserv_auth::Caller;
use userserv_core::{Card, CardId, CardPatch, NewCard};

use crate::error::ServiceResult;
use crate::server::AppState;
use crate::validation;

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewCard>,
) -> ServiceResult<(StatusCode, Json<Card>)> {
    validation::validate_new_card(&new)?;
    let card = state.cards.create(&caller, new).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn find_by_id(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<CardId>,
) -> ServiceResult<Json<Card>> {
    Ok(Json(state.cards.find_by_id(&caller, id).await?))
}

pub async fn find_by_ids(
    State(state): State<AppState>,
    caller: Caller,
    Json(ids): Json<Vec<CardId>>,
) -> ServiceResult<Json<Vec<Card>>> {
    Ok(Json(state.cards.find_by_ids(&caller, &ids).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<CardId>,
    Json(patch): Json<CardPatch>,
) -> ServiceResult<Json<Card>> {
    validation::validate_card_patch(&patch)?;
    Ok(Json(state.cards.update(&caller, id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<CardId>,
) -> ServiceResult<StatusCode> {
    state.cards.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

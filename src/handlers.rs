//! HTTP handlers. Each one authenticates via the extractors in [`crate::auth`],
//! validates its input, and delegates to the store, the voting engine or the
//! results aggregator; errors bubble up as [`ApiError`] responses.

use axum::debug_handler;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::ApiError;
use crate::models::{
    CreatePollRequest, ListPollsResponse, Page, PollCreatedResponse, PollDetailResponse,
    PollResponse, ProfileResponse, UpdatePollRequest, UpsertProfileRequest, VoteRequest,
    VoteResponse,
};
use crate::repo::PollStore;
use crate::voting::{self, VoteStatus};
use crate::{results, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListPollsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// With `mine=true` the listing switches to the caller's own polls,
    /// private ones included.
    pub mine: Option<bool>,
}

/// Create a poll with its options
#[debug_handler]
pub async fn create_poll(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollCreatedResponse>), ApiError> {
    let new_poll = request.validate(Utc::now())?;
    let (poll, _) = state.store.create_poll(user.id, new_poll).await?;
    info!("poll {} created by {}", poll.id, user.id);
    Ok((StatusCode::CREATED, Json(PollCreatedResponse { poll_id: poll.id })))
}

/// List public polls, or the caller's own with `mine=true`
#[debug_handler]
pub async fn list_polls(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Query(query): Query<ListPollsQuery>,
) -> Result<Json<ListPollsResponse>, ApiError> {
    let page = Page::new(query.limit, query.offset)?;
    let polls = if query.mine.unwrap_or(false) {
        let owner_id = user.require()?;
        state.store.list_polls_by_owner(owner_id, page).await?
    } else {
        state.store.list_public_polls(page).await?
    };
    Ok(Json(ListPollsResponse { polls }))
}

/// Fetch one poll with its tallied results
#[debug_handler]
pub async fn poll_detail(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<PollDetailResponse>, ApiError> {
    let poll = state
        .store
        .get_poll(poll_id)
        .await?
        .ok_or(ApiError::PollNotFound)?;
    voting::check_access(&poll, user.user_id())?;
    let results = results::aggregate(&state.store, poll_id).await?;
    Ok(Json(PollDetailResponse::new(poll, results)))
}

/// Cast the caller's vote
#[debug_handler]
pub async fn cast_vote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(poll_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let vote = voting::cast_vote(&state.store, poll_id, request.option_id, user.id, Utc::now())
        .await?;
    info!("vote {} recorded in poll {}", vote.id, poll_id);
    Ok(Json(VoteResponse { success: true, has_voted: true }))
}

/// Whether the caller has voted, and for which option
#[debug_handler]
pub async fn vote_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<VoteStatus>, ApiError> {
    let status = voting::vote_status(&state.store, poll_id, user.id).await?;
    Ok(Json(status))
}

/// Update a poll's details (owner only)
#[debug_handler]
pub async fn update_poll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(poll_id): Path<Uuid>,
    Json(request): Json<UpdatePollRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    let changes = request.validate(Utc::now())?;
    let poll = state
        .store
        .get_poll(poll_id)
        .await?
        .ok_or(ApiError::PollNotFound)?;
    if poll.user_id != user.id {
        return Err(ApiError::AccessDenied);
    }
    let updated = state.store.update_poll(poll_id, changes).await?;
    Ok(Json(PollResponse::from(updated)))
}

/// Delete a poll and everything attached to it (owner only)
#[debug_handler]
pub async fn delete_poll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(poll_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let poll = state
        .store
        .get_poll(poll_id)
        .await?
        .ok_or(ApiError::PollNotFound)?;
    if poll.user_id != user.id {
        return Err(ApiError::AccessDenied);
    }
    state.store.delete_poll(poll_id).await?;
    info!("poll {} deleted by {}", poll_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch the caller's profile
#[debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .store
        .get_profile(user.id)
        .await?
        .ok_or(ApiError::ProfileNotFound)?;
    Ok(Json(ProfileResponse::from(profile)))
}

/// Create or replace the caller's profile
#[debug_handler]
pub async fn upsert_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (name, avatar_url) = request.validate()?;
    let profile = state.store.upsert_profile(user.id, name, avatar_url).await?;
    info!("profile {} saved", profile.id);
    Ok(Json(ProfileResponse::from(profile)))
}

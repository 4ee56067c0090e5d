//! The voting engine: decides whether a vote may be cast and records it.
//!
//! `cast_vote` runs its checks in a fixed order so a request failing several
//! preconditions always reports the same one: the poll must exist, be
//! visible to the voter, still be open, the option must belong to the poll,
//! and the voter must not have voted before. The check-then-insert sequence
//! is not atomic; the storage uniqueness constraint catches the race and
//! surfaces it as [`ApiError::DuplicateVote`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Poll, Vote};
use crate::repo::PollStore;

/// Whether `viewer` may see (and so vote in) `poll`. Private polls are
/// visible to their owner only.
pub fn check_access(poll: &Poll, viewer: Option<Uuid>) -> Result<(), ApiError> {
    if poll.is_public || viewer == Some(poll.user_id) {
        Ok(())
    } else {
        Err(ApiError::AccessDenied)
    }
}

/// A poll closes the moment `now` reaches its end date.
pub fn voting_closed(poll: &Poll, now: DateTime<Utc>) -> bool {
    match poll.end_date {
        Some(end) => now >= end,
        None => false,
    }
}

pub async fn cast_vote<S: PollStore + ?Sized>(
    store: &S,
    poll_id: Uuid,
    option_id: Uuid,
    voter_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vote, ApiError> {
    let poll = store.get_poll(poll_id).await?.ok_or(ApiError::PollNotFound)?;
    check_access(&poll, Some(voter_id))?;
    if voting_closed(&poll, now) {
        return Err(ApiError::PollEnded);
    }

    let options = store.get_options(poll_id).await?;
    if !options.iter().any(|o| o.id == option_id) {
        return Err(ApiError::InvalidOption);
    }

    if store.get_vote(poll_id, voter_id).await?.is_some() {
        return Err(ApiError::AlreadyVoted);
    }

    store
        .insert_vote(Vote {
            id: Uuid::new_v4(),
            poll_id,
            option_id,
            user_id: voter_id,
            created_at: now,
        })
        .await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_id: Option<Uuid>,
}

/// Whether `voter_id` has voted in the poll, subject to the same existence
/// and visibility gates as voting itself.
pub async fn vote_status<S: PollStore + ?Sized>(
    store: &S,
    poll_id: Uuid,
    voter_id: Uuid,
) -> Result<VoteStatus, ApiError> {
    let poll = store.get_poll(poll_id).await?.ok_or(ApiError::PollNotFound)?;
    check_access(&poll, Some(voter_id))?;

    let vote = store.get_vote(poll_id, voter_id).await?;
    Ok(VoteStatus {
        has_voted: vote.is_some(),
        option_id: vote.map(|v| v.option_id),
    })
}

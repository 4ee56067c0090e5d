//! The poll repository: the only module that touches durable storage.
//!
//! [`PollStore`] is the narrow interface the voting engine and the results
//! aggregator depend on; [`PgPollStore`] implements it over Postgres and
//! additionally carries the CRUD surface the HTTP layer uses. Correctness
//! under concurrent voting rests on the `UNIQUE (poll_id, user_id)`
//! constraint enforced here, not on any in-process locking.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{NewPoll, Page, Poll, PollChanges, PollOption, PollSummary, Profile, Vote};

#[async_trait]
pub trait PollStore: Send + Sync {
    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, ApiError>;

    /// Options in creation order: ascending `(created_at, id)`.
    async fn get_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, ApiError>;

    async fn get_vote(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, ApiError>;

    /// Persists a vote. Fails with [`ApiError::DuplicateVote`] when the
    /// `(poll_id, user_id)` uniqueness constraint rejects the write, which
    /// is the backstop for two concurrent requests passing the engine's check.
    async fn insert_vote(&self, vote: Vote) -> Result<Vote, ApiError>;

    /// `(option_id, votes)` pairs for every option with at least one vote.
    async fn count_votes_by_option(&self, poll_id: Uuid) -> Result<Vec<(Uuid, i64)>, ApiError>;
}

#[derive(Clone)]
pub struct PgPollStore {
    pool: PgPool,
}

impl PgPollStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the poll and its options in one transaction; either the whole
    /// poll exists afterwards or none of it does.
    pub async fn create_poll(
        &self,
        owner_id: Uuid,
        new_poll: NewPoll,
    ) -> Result<(Poll, Vec<PollOption>), ApiError> {
        let now = Utc::now();
        let poll = Poll {
            id: Uuid::new_v4(),
            title: new_poll.title,
            description: new_poll.description,
            user_id: owner_id,
            is_public: new_poll.is_public,
            created_at: now,
            end_date: new_poll.end_date,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO polls (id, title, description, user_id, is_public, created_at, end_date, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(poll.user_id)
        .bind(poll.is_public)
        .bind(poll.created_at)
        .bind(poll.end_date)
        .bind(poll.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(new_poll.options.len());
        for (i, text) in new_poll.options.into_iter().enumerate() {
            let option = PollOption {
                id: Uuid::new_v4(),
                poll_id: poll.id,
                text,
                // Staggered by a microsecond each so the (created_at, id)
                // sort preserves submission order.
                created_at: now + Duration::microseconds(i as i64),
            };
            sqlx::query("INSERT INTO options (id, poll_id, text, created_at) VALUES ($1, $2, $3, $4)")
                .bind(option.id)
                .bind(option.poll_id)
                .bind(&option.text)
                .bind(option.created_at)
                .execute(&mut *tx)
                .await?;
            options.push(option);
        }

        tx.commit().await?;
        Ok((poll, options))
    }

    /// Applies a partial update in one statement. Columns outside `changes`
    /// read their stored values inside the `UPDATE`, so concurrent owner
    /// updates to different fields do not clobber each other. Ownership is
    /// the caller's concern.
    pub async fn update_poll(
        &self,
        poll_id: Uuid,
        changes: PollChanges,
    ) -> Result<Poll, ApiError> {
        sqlx::query_as::<_, Poll>(
            "UPDATE polls SET
                 title = COALESCE($1, title),
                 description = CASE WHEN $2 THEN $3::text ELSE description END,
                 end_date = CASE WHEN $4 THEN $5::timestamptz ELSE end_date END,
                 is_public = COALESCE($6, is_public),
                 updated_at = $7
             WHERE id = $8
             RETURNING *",
        )
        .bind(changes.title)
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.end_date.is_some())
        .bind(changes.end_date.flatten())
        .bind(changes.is_public)
        .bind(Utc::now())
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::PollNotFound)
    }

    /// Deletes a poll; options and votes go with it via the cascades.
    pub async fn delete_poll(&self, poll_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_public_polls(&self, page: Page) -> Result<Vec<PollSummary>, ApiError> {
        let polls = sqlx::query_as::<_, PollSummary>(
            "SELECT p.id, p.title, p.description, p.is_public, p.created_at, p.end_date,
                    COUNT(v.id) AS total_votes
             FROM polls p
             LEFT JOIN votes v ON v.poll_id = p.id
             WHERE p.is_public = TRUE
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id
             LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(polls)
    }

    /// The owner's polls, private ones included.
    pub async fn list_polls_by_owner(
        &self,
        owner_id: Uuid,
        page: Page,
    ) -> Result<Vec<PollSummary>, ApiError> {
        let polls = sqlx::query_as::<_, PollSummary>(
            "SELECT p.id, p.title, p.description, p.is_public, p.created_at, p.end_date,
                    COUNT(v.id) AS total_votes
             FROM polls p
             LEFT JOIN votes v ON v.poll_id = p.id
             WHERE p.user_id = $1
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id
             LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(polls)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ApiError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        name: String,
        avatar_url: Option<String>,
    ) -> Result<Profile, ApiError> {
        let now = Utc::now();
        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, name, avatar_url, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
             SET name = EXCLUDED.name, avatar_url = EXCLUDED.avatar_url, updated_at = EXCLUDED.updated_at
             RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(avatar_url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }
}

#[async_trait]
impl PollStore for PgPollStore {
    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, ApiError> {
        let poll = sqlx::query_as::<_, Poll>("SELECT * FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(poll)
    }

    async fn get_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, ApiError> {
        let options = sqlx::query_as::<_, PollOption>(
            "SELECT * FROM options WHERE poll_id = $1 ORDER BY created_at, id",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn get_vote(&self, poll_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, ApiError> {
        let vote =
            sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE poll_id = $1 AND user_id = $2")
                .bind(poll_id)
                .bind(voter_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(vote)
    }

    async fn insert_vote(&self, vote: Vote) -> Result<Vote, ApiError> {
        sqlx::query(
            "INSERT INTO votes (id, poll_id, option_id, user_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(vote.id)
        .bind(vote.poll_id)
        .bind(vote.option_id)
        .bind(vote.user_id)
        .bind(vote.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            let unique = err
                .as_database_error()
                .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation));
            if unique {
                ApiError::DuplicateVote
            } else {
                ApiError::from(err)
            }
        })?;
        Ok(vote)
    }

    async fn count_votes_by_option(&self, poll_id: Uuid) -> Result<Vec<(Uuid, i64)>, ApiError> {
        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT option_id, COUNT(*) AS votes FROM votes WHERE poll_id = $1 GROUP BY option_id",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}

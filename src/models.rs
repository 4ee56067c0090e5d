use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::results::PollResults;

/// Mirror of an identity-provider user, kept for display data only. Polls
/// and votes store user ids as opaque values without referencing this table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Validated poll-creation input, produced by [`CreatePollRequest::validate`].
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_public: bool,
}

/// Validated partial update, produced by [`UpdatePollRequest::validate`].
/// Outer `None` means "leave unchanged"; inner `None` clears the field.
#[derive(Debug, Clone, Default)]
pub struct PollChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_public: Option<bool>,
}

impl CreatePollRequest {
    /// Checks the creation invariants: non-empty title, at least 2 non-empty
    /// options, end date strictly in the future. Runs before anything is
    /// written.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewPoll, ApiError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(ApiError::Validation("title must not be empty".into()));
        }

        if self.options.len() < 2 {
            return Err(ApiError::Validation("a poll needs at least 2 options".into()));
        }
        let mut options = Vec::with_capacity(self.options.len());
        for text in self.options {
            let text = text.trim().to_owned();
            if text.is_empty() {
                return Err(ApiError::Validation("option text must not be empty".into()));
            }
            options.push(text);
        }

        if let Some(end_date) = self.end_date {
            if end_date <= now {
                return Err(ApiError::Validation("end date must be in the future".into()));
            }
        }

        Ok(NewPoll {
            title,
            description: self.description.and_then(non_empty),
            options,
            end_date: self.end_date,
            is_public: self.is_public.unwrap_or(true),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_public: Option<bool>,
}

impl UpdatePollRequest {
    pub fn validate(self, now: DateTime<Utc>) -> Result<PollChanges, ApiError> {
        if self.title.is_none()
            && self.description.is_none()
            && self.end_date.is_none()
            && self.is_public.is_none()
        {
            return Err(ApiError::Validation("nothing to update".into()));
        }

        let title = match self.title {
            Some(title) => {
                let title = title.trim().to_owned();
                if title.is_empty() {
                    return Err(ApiError::Validation("title must not be empty".into()));
                }
                Some(title)
            }
            None => None,
        };

        if let Some(Some(end_date)) = self.end_date {
            if end_date <= now {
                return Err(ApiError::Validation("end date must be in the future".into()));
            }
        }

        Ok(PollChanges {
            title,
            description: self.description.map(|d| d.and_then(non_empty)),
            end_date: self.end_date,
            is_public: self.is_public,
        })
    }
}

/// Distinguishes an absent field from an explicit `null`: absent stays
/// `None` via `#[serde(default)]`, while `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Limit/offset pagination with a server-side cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, ApiError> {
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit < 1 {
            return Err(ApiError::Validation("limit must be positive".into()));
        }
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::Validation("offset must not be negative".into()));
        }
        Ok(Self {
            limit: limit.min(Self::MAX_LIMIT),
            offset,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    pub name: String,
    pub avatar_url: Option<String>,
}

impl UpsertProfileRequest {
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        Ok((name, self.avatar_url.and_then(non_empty)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCreatedResponse {
    pub poll_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub success: bool,
    pub has_voted: bool,
}

/// A poll without tallies, as returned by the update endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Poll> for PollResponse {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            owner_id: poll.user_id,
            is_public: poll.is_public,
            created_at: poll.created_at,
            end_date: poll.end_date,
            updated_at: poll.updated_at,
        }
    }
}

/// Poll detail with embedded tallies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub results: PollResults,
}

impl PollDetailResponse {
    pub fn new(poll: Poll, results: PollResults) -> Self {
        Self {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            owner_id: poll.user_id,
            is_public: poll.is_public,
            created_at: poll.created_at,
            end_date: poll.end_date,
            results,
        }
    }
}

/// One row of the poll listing, with its vote total pre-counted.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub total_votes: i64,
}

#[derive(Debug, Serialize)]
pub struct ListPollsResponse {
    pub polls: Vec<PollSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn request(title: &str, options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            title: title.to_owned(),
            description: None,
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            end_date: None,
            is_public: None,
        }
    }

    #[test]
    fn create_accepts_two_options() {
        let poll = request("Pick one", &["A", "B"]).validate(Utc::now()).unwrap();
        assert_eq!(poll.title, "Pick one");
        assert_eq!(poll.options, vec!["A", "B"]);
        assert!(poll.is_public, "polls default to public");
    }

    #[test]
    fn create_rejects_single_option() {
        let result = request("Pick one", &["A"]).validate(Utc::now());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_rejects_blank_title() {
        let result = request("   ", &["A", "B"]).validate(Utc::now());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_rejects_blank_option_text() {
        let result = request("Pick one", &["A", "  "]).validate(Utc::now());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_rejects_past_end_date() {
        let now = Utc::now();
        let mut req = request("Pick one", &["A", "B"]);
        req.end_date = Some(now - Duration::seconds(1));
        assert!(matches!(req.validate(now), Err(ApiError::Validation(_))));

        // The boundary itself is rejected too: the window must be non-empty.
        let mut req = request("Pick one", &["A", "B"]);
        req.end_date = Some(now);
        assert!(matches!(req.validate(now), Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_drops_blank_description() {
        let mut req = request("Pick one", &["A", "B"]);
        req.description = Some("  ".to_owned());
        let poll = req.validate(Utc::now()).unwrap();
        assert_eq!(poll.description, None);
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let req: UpdatePollRequest = serde_json::from_str(r#"{"endDate": null}"#).unwrap();
        assert_eq!(req.end_date, Some(None), "explicit null clears");

        let req: UpdatePollRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(req.end_date, None, "absent field stays untouched");

        let req: UpdatePollRequest =
            serde_json::from_str(r#"{"endDate": "2030-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(req.end_date, Some(Some(_))));
    }

    #[test]
    fn update_rejects_empty_payload() {
        let result = UpdatePollRequest::default().validate(Utc::now());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn update_rejects_blank_title() {
        let req = UpdatePollRequest {
            title: Some("  ".to_owned()),
            ..Default::default()
        };
        assert!(matches!(req.validate(Utc::now()), Err(ApiError::Validation(_))));
    }

    #[test]
    fn update_maps_empty_description_to_clear() {
        let req = UpdatePollRequest {
            description: Some(Some("  ".to_owned())),
            ..Default::default()
        };
        let changes = req.validate(Utc::now()).unwrap();
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn update_touches_only_the_named_fields() {
        let req = UpdatePollRequest {
            title: Some("New".to_owned()),
            ..Default::default()
        };
        let changes = req.validate(Utc::now()).unwrap();
        assert_eq!(changes.title.as_deref(), Some("New"));
        assert_eq!(changes.description, None);
        assert_eq!(changes.end_date, None);
        assert_eq!(changes.is_public, None);
    }

    #[test]
    fn page_defaults_and_caps() {
        assert_eq!(
            Page::new(None, None).unwrap(),
            Page { limit: Page::DEFAULT_LIMIT, offset: 0 }
        );
        assert_eq!(Page::new(Some(500), None).unwrap().limit, Page::MAX_LIMIT);
        assert!(matches!(Page::new(Some(0), None), Err(ApiError::Validation(_))));
        assert!(matches!(Page::new(None, Some(-1)), Err(ApiError::Validation(_))));
    }

    #[test]
    fn responses_use_camel_case() {
        let response = PollCreatedResponse { poll_id: Uuid::nil() };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("pollId").is_some());

        let response = VoteResponse { success: true, has_voted: true };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json.get("hasVoted"), Some(&serde_json::Value::Bool(true)));
    }
}

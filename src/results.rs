//! The results aggregator: turns raw vote counts into the tallied view a
//! poll page renders. Options come back in creation order with zero counts
//! filled in. Percentages are rounded to whole numbers, and a winner is
//! named only when one option strictly leads.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::PollOption;
use crate::repo::PollStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: Uuid,
    pub text: String,
    pub votes: i64,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub options: Vec<OptionTally>,
    pub total_votes: i64,
    pub winning_option_id: Option<Uuid>,
}

/// Tallies a poll's votes. Visibility is the caller's concern; this only
/// requires that the poll exists.
pub async fn aggregate<S: PollStore + ?Sized>(
    store: &S,
    poll_id: Uuid,
) -> Result<PollResults, ApiError> {
    if store.get_poll(poll_id).await?.is_none() {
        return Err(ApiError::PollNotFound);
    }
    let options = store.get_options(poll_id).await?;
    let counts = store.count_votes_by_option(poll_id).await?;
    Ok(tally(options, &counts))
}

/// Builds the tallied view from options (already in display order) and the
/// per-option counts; options with no votes keep a zero row. The total is
/// summed over the option rows themselves, so count pairs outside the
/// option set never skew it.
pub fn tally(options: Vec<PollOption>, counts: &[(Uuid, i64)]) -> PollResults {
    let by_option: HashMap<Uuid, i64> = counts.iter().copied().collect();
    let total_votes: i64 = options
        .iter()
        .map(|option| by_option.get(&option.id).copied().unwrap_or(0))
        .sum();

    let options: Vec<OptionTally> = options
        .into_iter()
        .map(|option| {
            let votes = by_option.get(&option.id).copied().unwrap_or(0);
            OptionTally {
                option_id: option.id,
                text: option.text,
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();

    PollResults {
        winning_option_id: winner(&options),
        total_votes,
        options,
    }
}

fn percentage(votes: i64, total: i64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((votes as f64 / total as f64) * 100.0).round() as u32
}

/// The option with strictly more votes than every other, if any; ties and
/// empty polls have no winner.
fn winner(options: &[OptionTally]) -> Option<Uuid> {
    let max = options.iter().map(|o| o.votes).max()?;
    if max == 0 {
        return None;
    }
    let mut leaders = options.iter().filter(|o| o.votes == max);
    let leader = leaders.next()?;
    if leaders.next().is_some() {
        None
    } else {
        Some(leader.option_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::repo::testing::{self, MemStore};
    use crate::voting::cast_vote;

    fn option(text: &str) -> PollOption {
        PollOption {
            id: Uuid::new_v4(),
            poll_id: Uuid::new_v4(),
            text: text.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn single_vote_gives_the_leader_everything() {
        let a = option("A");
        let b = option("B");
        let counts = vec![(a.id, 1)];

        let results = tally(vec![a.clone(), b.clone()], &counts);

        assert_eq!(results.total_votes, 1);
        assert_eq!(results.winning_option_id, Some(a.id));
        assert_eq!(results.options[0].votes, 1);
        assert_eq!(results.options[0].percentage, 100);
        assert_eq!(results.options[1].votes, 0);
        assert_eq!(results.options[1].percentage, 0);
    }

    #[test]
    fn percentages_round_to_the_nearest_whole() {
        let a = option("A");
        let b = option("B");
        let counts = vec![(a.id, 2), (b.id, 1)];

        let results = tally(vec![a, b], &counts);

        assert_eq!(results.options[0].percentage, 67);
        assert_eq!(results.options[1].percentage, 33);
    }

    #[test]
    fn three_way_split_rounds_each_third_down() {
        let a = option("A");
        let b = option("B");
        let c = option("C");
        let counts = vec![(a.id, 1), (b.id, 1), (c.id, 1)];

        let results = tally(vec![a, b, c], &counts);

        assert!(results.options.iter().all(|o| o.percentage == 33));
        assert_eq!(results.winning_option_id, None);
    }

    #[test]
    fn a_tie_names_no_winner() {
        let a = option("A");
        let b = option("B");
        let counts = vec![(a.id, 2), (b.id, 2)];

        let results = tally(vec![a, b], &counts);

        assert_eq!(results.winning_option_id, None);
        assert_eq!(results.total_votes, 4);
    }

    #[test]
    fn an_empty_poll_has_zero_rows_and_no_winner() {
        let a = option("A");
        let b = option("B");

        let results = tally(vec![a, b], &[]);

        assert_eq!(results.total_votes, 0);
        assert_eq!(results.winning_option_id, None);
        assert!(results.options.iter().all(|o| o.votes == 0 && o.percentage == 0));
    }

    #[test]
    fn counts_outside_the_option_set_are_ignored() {
        let a = option("A");
        let b = option("B");
        let counts = vec![(a.id, 2), (Uuid::new_v4(), 7)];

        let results = tally(vec![a.clone(), b], &counts);

        assert_eq!(results.total_votes, 2);
        let summed: i64 = results.options.iter().map(|o| o.votes).sum();
        assert_eq!(results.total_votes, summed);
        assert_eq!(results.options[0].percentage, 100);
        assert_eq!(results.winning_option_id, Some(a.id));
    }

    #[test]
    fn rows_keep_the_option_display_order() {
        let first = option("First");
        let second = option("Second");
        let third = option("Third");
        let counts = vec![(third.id, 5), (first.id, 1)];

        let results = tally(vec![first.clone(), second.clone(), third.clone()], &counts);

        let ids: Vec<Uuid> = results.options.iter().map(|o| o.option_id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
        assert_eq!(results.winning_option_id, Some(third.id));
    }

    #[tokio::test]
    async fn aggregate_counts_recorded_votes() {
        let store = MemStore::default();
        let poll = store.add_poll(testing::poll(Uuid::new_v4()));
        let rust = store.add_option(poll.id, "Rust");
        let go = store.add_option(poll.id, "Go");

        for _ in 0..3 {
            cast_vote(&store, poll.id, rust.id, Uuid::new_v4(), Utc::now())
                .await
                .unwrap();
        }
        cast_vote(&store, poll.id, go.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();

        let results = aggregate(&store, poll.id).await.unwrap();

        assert_eq!(results.total_votes, 4);
        assert_eq!(results.winning_option_id, Some(rust.id));
        assert_eq!(results.options[0].votes, 3);
        assert_eq!(results.options[0].percentage, 75);
        assert_eq!(results.options[1].votes, 1);
        assert_eq!(results.options[1].percentage, 25);
    }

    #[tokio::test]
    async fn aggregate_requires_the_poll_to_exist() {
        let store = MemStore::default();
        let err = aggregate(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::PollNotFound));
    }

    #[tokio::test]
    async fn a_rejected_second_vote_leaves_the_tally_unchanged() {
        let store = MemStore::default();
        let poll = store.add_poll(testing::poll(Uuid::new_v4()));
        let a = store.add_option(poll.id, "A");
        let b = store.add_option(poll.id, "B");
        let voter = Uuid::new_v4();

        cast_vote(&store, poll.id, a.id, voter, Utc::now())
            .await
            .unwrap();
        let results = aggregate(&store, poll.id).await.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.options[0].percentage, 100);
        assert_eq!(results.options[1].percentage, 0);
        assert_eq!(results.winning_option_id, Some(a.id));

        let err = cast_vote(&store, poll.id, b.id, voter, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyVoted));

        let unchanged = aggregate(&store, poll.id).await.unwrap();
        assert_eq!(unchanged.total_votes, 1);
        assert_eq!(unchanged.winning_option_id, Some(a.id));
    }
}

//! On-demand leaderboard computation over a session roster.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{dto::session::ParticipantSummary, state::RosterEntry};

/// Rank a roster descending by score.
///
/// The roster map iterates in join order and the sort is stable, so equal
/// scores keep earlier-joined participants first. Recomputed on demand; the
/// roster stays the single source of truth.
pub fn rank(roster: &IndexMap<Uuid, RosterEntry>) -> Vec<ParticipantSummary> {
    let mut entries: Vec<ParticipantSummary> = roster
        .iter()
        .map(|(participant_id, entry)| ParticipantSummary {
            participant_id: *participant_id,
            alias: entry.alias.clone(),
            score: entry.score,
        })
        .collect();

    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

/// Rank a roster and keep only the first `top_n` rows.
pub fn top(roster: &IndexMap<Uuid, RosterEntry>, top_n: usize) -> Vec<ParticipantSummary> {
    let mut entries = rank(roster);
    entries.truncate(top_n);
    entries
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::SystemTime};

    use super::*;

    fn roster_with_scores(scores: &[(&str, u32)]) -> IndexMap<Uuid, RosterEntry> {
        scores
            .iter()
            .map(|(alias, score)| {
                (
                    Uuid::new_v4(),
                    RosterEntry {
                        alias: (*alias).to_owned(),
                        score: *score,
                        joined_at: SystemTime::now(),
                        answered: HashSet::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn sorted_descending_by_score() {
        let roster = roster_with_scores(&[("low", 50), ("high", 250), ("mid", 100)]);
        let ranking = rank(&roster);
        let aliases: Vec<&str> = ranking.iter().map(|entry| entry.alias.as_str()).collect();
        assert_eq!(aliases, ["high", "mid", "low"]);
    }

    #[test]
    fn ties_keep_join_order() {
        let roster = roster_with_scores(&[("first", 100), ("second", 100), ("third", 100)]);
        let ranking = rank(&roster);
        let aliases: Vec<&str> = ranking.iter().map(|entry| entry.alias.as_str()).collect();
        assert_eq!(aliases, ["first", "second", "third"]);
    }

    #[test]
    fn mixed_ties_and_scores() {
        let roster =
            roster_with_scores(&[("a", 100), ("b", 150), ("c", 100), ("d", 0), ("e", 150)]);
        let ranking = rank(&roster);
        let aliases: Vec<&str> = ranking.iter().map(|entry| entry.alias.as_str()).collect();
        assert_eq!(aliases, ["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn top_truncates_after_ranking() {
        let roster = roster_with_scores(&[("a", 10), ("b", 30), ("c", 20), ("d", 40)]);
        let top_two = top(&roster, 2);
        let aliases: Vec<&str> = top_two.iter().map(|entry| entry.alias.as_str()).collect();
        assert_eq!(aliases, ["d", "b"]);
    }

    #[test]
    fn empty_roster_yields_empty_ranking() {
        let roster = IndexMap::new();
        assert!(rank(&roster).is_empty());
        assert!(top(&roster, 5).is_empty());
    }
}

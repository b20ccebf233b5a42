//! Ranking engine: dense ranking with tie flags over team standings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One team's aggregates going into the ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    /// Team identifier.
    pub id: Uuid,
    /// Team display name.
    pub name: String,
    /// Recomputed average score.
    pub score: i32,
    /// Percentage of the team's answers that earned points.
    pub accuracy: u32,
}

/// A ranked team as broadcast in `ranking:show`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedTeam {
    /// Team identifier.
    pub id: Uuid,
    /// Team display name.
    pub name: String,
    /// Score the rank was computed from.
    pub score: i32,
    /// Percentage of the team's answers that earned points.
    pub accuracy: u32,
    /// Dense rank: ties share a rank, the next distinct score advances it by
    /// exactly 1 (no gaps).
    pub rank: u32,
    /// True when this team's score equals a sorted neighbour's.
    pub has_tie: bool,
}

/// Order standings by score descending and assign dense ranks and tie flags.
///
/// The first team gets rank 1; each following team repeats its predecessor's
/// rank on equal scores and takes predecessor rank + 1 otherwise. A team is
/// flagged tied when either sorted neighbour carries the same score. The top
/// of this sequence feeds the final podium; the display surfaces one team
/// per slot from it.
pub fn rank(mut standings: Vec<TeamStanding>) -> Vec<RankedTeam> {
    standings.sort_by(|a, b| b.score.cmp(&a.score));

    let scores: Vec<i32> = standings.iter().map(|standing| standing.score).collect();

    let mut ranked = Vec::with_capacity(standings.len());
    let mut current_rank = 0u32;
    let mut previous_score = None;

    for (position, standing) in standings.into_iter().enumerate() {
        if previous_score != Some(standing.score) {
            current_rank += 1;
            previous_score = Some(standing.score);
        }

        let tied_with_previous = position > 0 && scores[position - 1] == standing.score;
        let tied_with_next =
            position + 1 < scores.len() && scores[position + 1] == standing.score;

        ranked.push(RankedTeam {
            id: standing.id,
            name: standing.name,
            score: standing.score,
            accuracy: standing.accuracy,
            rank: current_rank,
            has_tie: tied_with_previous || tied_with_next,
        });
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(name: &str, score: i32) -> TeamStanding {
        TeamStanding {
            id: Uuid::new_v4(),
            name: name.into(),
            score,
            accuracy: 0,
        }
    }

    #[test]
    fn empty_input_ranks_nothing() {
        assert!(rank(Vec::new()).is_empty());
    }

    #[test]
    fn dense_ranking_shares_and_never_skips() {
        let ranked = rank(vec![
            standing("a", 100),
            standing("b", 100),
            standing("c", 80),
            standing("d", 50),
            standing("e", 50),
        ]);

        let ranks: Vec<u32> = ranked.iter().map(|team| team.rank).collect();
        assert_eq!(ranks, vec![1, 1, 2, 3, 3]);

        let ties: Vec<bool> = ranked.iter().map(|team| team.has_tie).collect();
        assert_eq!(ties, vec![true, true, false, true, true]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let ranked = rank(vec![
            standing("low", 10),
            standing("high", 90),
            standing("mid", 40),
        ]);

        let names: Vec<&str> = ranked.iter().map(|team| team.name.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
        let ranks: Vec<u32> = ranked.iter().map(|team| team.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(ranked.iter().all(|team| !team.has_tie));
    }

    #[test]
    fn all_tied_teams_share_rank_one() {
        let ranked = rank(vec![standing("a", 0), standing("b", 0), standing("c", 0)]);
        assert!(ranked.iter().all(|team| team.rank == 1 && team.has_tie));
    }

    #[test]
    fn ties_below_the_podium_keep_low_ranks_dense() {
        let ranked = rank(vec![
            standing("a", 300),
            standing("b", 200),
            standing("c", 200),
            standing("d", 100),
        ]);
        let ranks: Vec<u32> = ranked.iter().map(|team| team.rank).collect();
        // Competition ranking would give d rank 4; dense ranking gives 3.
        assert_eq!(ranks, vec![1, 2, 2, 3]);
    }
}

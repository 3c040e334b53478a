// Team matching and missing-team aggregation.
//
// A row matches a team only when sport, age group, gender and season are all
// exactly equal. When several teams share the same tuple the first one in the
// supplied list wins.

use std::collections::HashMap;

use crate::model::{MissingTeamBucket, ParsedPlayerRow, Team, TeamKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// Assign each row its matching team, or clear a previous assignment when no
/// team matches any more. Safe to call repeatedly: with an unchanged team list
/// the assignments are identical.
pub fn match_rows(rows: &mut [ParsedPlayerRow], teams: &[Team]) -> MatchStats {
    let mut stats = MatchStats::default();
    for row in rows.iter_mut() {
        let key = row.team_key();
        let found = teams.iter().find(|team| team.matches(&key));
        match found {
            Some(team) => {
                row.matched_team_id = Some(team.id.clone());
                row.matched_team_name = Some(team.name.clone());
                stats.matched += 1;
            }
            None => {
                row.matched_team_id = None;
                row.matched_team_name = None;
                stats.unmatched += 1;
            }
        }
    }
    stats
}

pub fn match_stats(rows: &[ParsedPlayerRow]) -> MatchStats {
    let matched = rows.iter().filter(|r| r.is_matched()).count();
    MatchStats {
        matched,
        unmatched: rows.len() - matched,
    }
}

/// Group unmatched rows by (sport, age group, gender, season).
///
/// Buckets are returned in order of first appearance; their counts sum to the
/// number of unmatched rows.
pub fn missing_teams(rows: &[ParsedPlayerRow]) -> Vec<MissingTeamBucket> {
    let mut buckets: Vec<MissingTeamBucket> = Vec::new();
    let mut index: HashMap<TeamKey<'_>, usize> = HashMap::new();

    for row in rows.iter().filter(|r| !r.is_matched()) {
        match index.get(&row.team_key()) {
            Some(&pos) => buckets[pos].count += 1,
            None => {
                index.insert(row.team_key(), buckets.len());
                buckets.push(MissingTeamBucket {
                    sport: row.sport.clone(),
                    age_group: row.age_group.clone(),
                    gender: row.gender,
                    season: row.season.clone(),
                    count: 1,
                });
            }
        }
    }

    buckets
}

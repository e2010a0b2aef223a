use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{
    ActivityRecord, DepartmentStats, OpsTelemetry, PersonalStats, Platform, RawActivityRow,
    SectionStats, SystemStats, TeamStats,
};

/// Validate raw store rows into aggregatable records. Rows missing a
/// numeric field, carrying a negative count, or tagged with an unknown
/// platform are skipped and counted, never allowed to poison a reduction.
pub fn sanitize_records(rows: &[RawActivityRow]) -> (Vec<ActivityRecord>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        let platform = Platform::from_tag(&row.platform);
        let fields = (row.total_solved, row.daily_increase, row.coding_streak);
        match (platform, fields) {
            (Some(platform), (Some(total_solved), Some(daily_increase), Some(coding_streak)))
                if total_solved >= 0 && daily_increase >= 0 && coding_streak >= 0 =>
            {
                records.push(ActivityRecord {
                    user_id: row.user_id,
                    platform,
                    date: row.date,
                    total_solved,
                    daily_increase,
                    coding_streak,
                    rank_in_team: row.rank_in_team,
                    rank_in_section: row.rank_in_section,
                });
            }
            _ => {
                tracing::warn!(
                    user_id = %row.user_id,
                    platform = %row.platform,
                    date = %row.date,
                    "skipping malformed activity row"
                );
                skipped += 1;
            }
        }
    }

    (records, skipped)
}

/// Distinct users appearing in the record set. A user active on several
/// platforms counts once.
pub fn active_user_count(records: &[ActivityRecord]) -> usize {
    records
        .iter()
        .map(|record| record.user_id)
        .collect::<HashSet<Uuid>>()
        .len()
}

fn total_daily_increase(records: &[ActivityRecord]) -> i64 {
    records.iter().map(|record| record.daily_increase).sum()
}

/// Average daily increase over active users only, one decimal. Zero when
/// nobody was active, so there is never a division by zero.
fn average_over_active(records: &[ActivityRecord]) -> f64 {
    let active = active_user_count(records);
    if active == 0 {
        return 0.0;
    }
    round_one_decimal(total_daily_increase(records) as f64 / active as f64)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn personal_stats(records: &[ActivityRecord]) -> PersonalStats {
    let current_streak = records
        .iter()
        .map(|record| record.coding_streak)
        .max()
        .unwrap_or(0);
    let team_rank = records.iter().find_map(|record| record.rank_in_team);

    PersonalStats {
        today_problems: total_daily_increase(records),
        current_streak,
        total_solved: records.iter().map(|record| record.total_solved).sum(),
        team_rank,
    }
}

/// Team rank and monthly goal need data beyond this cohort's records; the
/// dispatcher fills the rank from the cross-team pass and the goal stays
/// unresolved.
pub fn team_stats(records: &[ActivityRecord]) -> TeamStats {
    TeamStats {
        team_average: average_over_active(records),
        active_members: active_user_count(records),
        team_rank: None,
        monthly_goal: None,
    }
}

pub fn section_stats(
    records: &[ActivityRecord],
    roster_size: usize,
    top_performer_threshold: i64,
) -> SectionStats {
    let active_students = active_user_count(records);
    let top_performers = records
        .iter()
        .filter(|record| record.daily_increase >= top_performer_threshold)
        .count();

    SectionStats {
        section_average: average_over_active(records),
        active_students,
        top_performers,
        need_attention: roster_size.saturating_sub(active_students),
    }
}

pub fn department_stats(
    records: &[ActivityRecord],
    roster_size: usize,
    placement_ready: Option<i64>,
    faculty_usage: i64,
) -> DepartmentStats {
    DepartmentStats {
        department_average: average_over_active(records),
        total_students: roster_size,
        placement_ready,
        faculty_usage,
    }
}

pub fn system_stats(
    total_users: usize,
    records: &[ActivityRecord],
    telemetry: OpsTelemetry,
) -> SystemStats {
    SystemStats {
        total_users,
        active_today: active_user_count(records),
        system_health: telemetry.system_health,
        api_success: telemetry.api_success,
        support_tickets: telemetry.support_tickets,
    }
}

/// Rank teams by today's total daily increase, descending, 1-based.
/// Equal totals share a rank and the next total skips past the tie.
pub fn rank_teams(team_totals: &[(Uuid, i64)]) -> HashMap<Uuid, usize> {
    let mut ordered: Vec<(Uuid, i64)> = team_totals.to_vec();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranks = HashMap::with_capacity(ordered.len());
    let mut last_total: Option<i64> = None;
    let mut last_rank = 0usize;

    for (position, (team_id, total)) in ordered.into_iter().enumerate() {
        let rank = if Some(total) == last_total {
            last_rank
        } else {
            position + 1
        };
        last_total = Some(total);
        last_rank = rank;
        ranks.insert(team_id, rank);
    }

    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    fn record(user_id: Uuid, daily_increase: i64) -> ActivityRecord {
        ActivityRecord {
            user_id,
            platform: Platform::LeetCode,
            date: today(),
            total_solved: 100,
            daily_increase,
            coding_streak: 0,
            rank_in_team: None,
            rank_in_section: None,
        }
    }

    fn raw_row(user_id: Uuid, platform: &str, daily_increase: Option<i64>) -> RawActivityRow {
        RawActivityRow {
            user_id,
            platform: platform.to_string(),
            date: today(),
            total_solved: Some(100),
            daily_increase,
            coding_streak: Some(3),
            rank_in_team: None,
            rank_in_section: None,
        }
    }

    #[test]
    fn personal_sums_across_platforms_and_takes_max_streak() {
        let user = Uuid::new_v4();
        let mut a = record(user, 4);
        a.coding_streak = 12;
        a.total_solved = 250;
        let mut b = record(user, 3);
        b.platform = Platform::SkillRack;
        b.coding_streak = 5;
        b.total_solved = 90;
        b.rank_in_team = Some(2);

        let stats = personal_stats(&[a, b]);
        assert_eq!(stats.today_problems, 7);
        assert_eq!(stats.current_streak, 12);
        assert_eq!(stats.total_solved, 340);
        assert_eq!(stats.team_rank, Some(2));
    }

    #[test]
    fn personal_rank_stays_unavailable_without_source_data() {
        let stats = personal_stats(&[record(Uuid::new_v4(), 5)]);
        assert_eq!(stats.team_rank, None);
    }

    #[test]
    fn personal_is_independent_of_record_order() {
        let user = Uuid::new_v4();
        let mut a = record(user, 4);
        a.coding_streak = 9;
        let mut b = record(user, 6);
        b.platform = Platform::GitHub;
        b.coding_streak = 2;

        let forward = personal_stats(&[a.clone(), b.clone()]);
        let reversed = personal_stats(&[b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn team_average_divides_by_distinct_active_members() {
        // Worked example: A solves 5, B solves 3 and 2 on two platforms,
        // roster of 4. Two active members, average 5.0.
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut b_second = record(b, 2);
        b_second.platform = Platform::CodeChef;
        let records = vec![record(a, 5), record(b, 3), b_second];

        let stats = team_stats(&records);
        assert_eq!(stats.active_members, 2);
        assert!((stats.team_average - 5.0).abs() < f64::EPSILON);
        assert_eq!(stats.team_rank, None);
        assert_eq!(stats.monthly_goal, None);
    }

    #[test]
    fn averages_are_zero_for_empty_record_sets() {
        let stats = team_stats(&[]);
        assert_eq!(stats.active_members, 0);
        assert_eq!(stats.team_average, 0.0);

        let section = section_stats(&[], 0, 10);
        assert_eq!(section.section_average, 0.0);
        assert_eq!(section.need_attention, 0);
    }

    #[test]
    fn section_counts_top_performers_against_threshold() {
        let records: Vec<ActivityRecord> = [12, 9, 15, 3]
            .iter()
            .map(|&n| record(Uuid::new_v4(), n))
            .collect();

        let stats = section_stats(&records, 6, 10);
        assert_eq!(stats.top_performers, 2);
        assert_eq!(stats.active_students, 4);
        assert_eq!(stats.need_attention, 2);
    }

    #[test]
    fn active_count_never_exceeds_roster_and_gap_matches_example() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut b_second = record(b, 2);
        b_second.platform = Platform::HackerRank;
        let records = vec![record(a, 5), record(b, 3), b_second];

        assert_eq!(active_user_count(&records), 2);
        let stats = section_stats(&records, 4, 10);
        assert_eq!(stats.need_attention, 2);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![record(Uuid::new_v4(), 7), record(Uuid::new_v4(), 1)];
        assert_eq!(team_stats(&records), team_stats(&records));
        assert_eq!(
            section_stats(&records, 5, 10),
            section_stats(&records, 5, 10)
        );
    }

    #[test]
    fn department_average_rounds_to_one_decimal() {
        let records = vec![
            record(Uuid::new_v4(), 5),
            record(Uuid::new_v4(), 5),
            record(Uuid::new_v4(), 6),
        ];
        let stats = department_stats(&records, 10, Some(8), 3);
        // 16 / 3 = 5.333... -> 5.3
        assert!((stats.department_average - 5.3).abs() < f64::EPSILON);
        assert_eq!(stats.total_students, 10);
        assert_eq!(stats.placement_ready, Some(8));
        assert_eq!(stats.faculty_usage, 3);
    }

    #[test]
    fn system_stats_pass_telemetry_through_untouched() {
        let records = vec![record(Uuid::new_v4(), 1)];
        let telemetry = OpsTelemetry {
            system_health: Some(99.2),
            api_success: None,
            support_tickets: Some(4),
        };
        let stats = system_stats(250, &records, telemetry);
        assert_eq!(stats.total_users, 250);
        assert_eq!(stats.active_today, 1);
        assert_eq!(stats.system_health, Some(99.2));
        assert_eq!(stats.api_success, None);
        assert_eq!(stats.support_tickets, Some(4));
    }

    #[test]
    fn sanitize_drops_incomplete_and_unknown_platform_rows() {
        let user = Uuid::new_v4();
        let rows = vec![
            raw_row(user, "leetcode", Some(4)),
            raw_row(user, "leetcode", None),
            raw_row(user, "topcoder", Some(2)),
            raw_row(user, "github", Some(-1)),
        ];

        let (records, skipped) = sanitize_records(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 3);
        assert_eq!(records[0].daily_increase, 4);
    }

    #[test]
    fn team_ranking_is_descending_and_ties_share_a_rank() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let ranks = rank_teams(&[(a, 40), (b, 55), (c, 40), (d, 10)]);

        assert_eq!(ranks[&b], 1);
        assert_eq!(ranks[&a], 2);
        assert_eq!(ranks[&c], 2);
        assert_eq!(ranks[&d], 4);
    }
}

use std::fmt::Write;

use crate::models::{DashboardSnapshot, TierStats};

fn opt_count(value: Option<i64>) -> String {
    value.map_or_else(|| "not yet computed".to_string(), |v| v.to_string())
}

/// Render a snapshot as a markdown dashboard report.
pub fn build_report(snapshot: &DashboardSnapshot, viewer_name: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Coding Activity Dashboard — {} tier", snapshot.role);
    let _ = writeln!(
        output,
        "Generated for {} on {} (cohort of {})",
        viewer_name, snapshot.date, snapshot.cohort_size
    );
    let _ = writeln!(output);

    if snapshot.no_data {
        let _ = writeln!(
            output,
            "No cohort resolved for this viewer; the figures below are \
             placeholders, not measured activity."
        );
        let _ = writeln!(output);
    }

    match &snapshot.stats {
        TierStats::Personal(stats) => {
            let _ = writeln!(output, "## Personal");
            let _ = writeln!(output, "- Problems solved today: {}", stats.today_problems);
            let _ = writeln!(output, "- Current streak: {} days", stats.current_streak);
            let _ = writeln!(output, "- Total solved: {}", stats.total_solved);
            let _ = writeln!(
                output,
                "- Team rank: {}",
                stats
                    .team_rank
                    .map_or_else(|| "unavailable".to_string(), |r| format!("#{r}"))
            );
        }
        TierStats::Team(stats) => {
            let _ = writeln!(output, "## Team");
            let _ = writeln!(output, "- Average solved today: {:.1}", stats.team_average);
            let _ = writeln!(output, "- Active members: {}", stats.active_members);
            let _ = writeln!(
                output,
                "- Team rank: {}",
                stats
                    .team_rank
                    .map_or_else(|| "unresolved".to_string(), |r| format!("#{r}"))
            );
            let _ = writeln!(output, "- Monthly goal: {}", opt_count(stats.monthly_goal));
        }
        TierStats::Section(stats) => {
            let _ = writeln!(output, "## Section");
            let _ = writeln!(output, "- Average solved today: {:.1}", stats.section_average);
            let _ = writeln!(output, "- Active students: {}", stats.active_students);
            let _ = writeln!(output, "- Top performers: {}", stats.top_performers);
            let _ = writeln!(output, "- Need attention: {}", stats.need_attention);
        }
        TierStats::Department(stats) => {
            let _ = writeln!(output, "## Department");
            let _ = writeln!(
                output,
                "- Average solved today: {:.1}",
                stats.department_average
            );
            let _ = writeln!(output, "- Total students: {}", stats.total_students);
            let _ = writeln!(
                output,
                "- Placement ready: {}",
                opt_count(stats.placement_ready)
            );
            let _ = writeln!(output, "- Faculty recently active: {}", stats.faculty_usage);
        }
        TierStats::System(stats) => {
            let _ = writeln!(output, "## System");
            let _ = writeln!(output, "- Total active users: {}", stats.total_users);
            let _ = writeln!(output, "- Users active today: {}", stats.active_today);
            let _ = writeln!(
                output,
                "- System health: {}",
                stats
                    .system_health
                    .map_or_else(|| "not reported".to_string(), |v| format!("{v:.1}%"))
            );
            let _ = writeln!(
                output,
                "- API success: {}",
                stats
                    .api_success
                    .map_or_else(|| "not reported".to_string(), |v| format!("{v:.1}%"))
            );
            let _ = writeln!(
                output,
                "- Open support tickets: {}",
                opt_count(stats.support_tickets)
            );
        }
    }

    if snapshot.skipped_records > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{} malformed activity record(s) were excluded from these figures.",
            snapshot.skipped_records
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SectionStats, TeamStats};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn snapshot(stats: TierStats, no_data: bool) -> DashboardSnapshot {
        DashboardSnapshot {
            role: match stats {
                TierStats::Team(_) => Role::TeamLead,
                _ => Role::Advisor,
            },
            viewer: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 8, 23).unwrap(),
            cohort_size: 4,
            no_data,
            skipped_records: 0,
            stats,
        }
    }

    #[test]
    fn unresolved_rank_is_labelled_not_numbered() {
        let report = build_report(
            &snapshot(
                TierStats::Team(TeamStats {
                    team_average: 5.0,
                    active_members: 2,
                    team_rank: None,
                    monthly_goal: None,
                }),
                false,
            ),
            "Priya Nair",
        );
        assert!(report.contains("Team rank: unresolved"));
        assert!(report.contains("Monthly goal: not yet computed"));
    }

    #[test]
    fn no_data_snapshots_carry_the_warning() {
        let report = build_report(
            &snapshot(
                TierStats::Section(SectionStats {
                    section_average: 0.0,
                    active_students: 0,
                    top_performers: 0,
                    need_attention: 0,
                }),
                true,
            ),
            "Meera Joshi",
        );
        assert!(report.contains("No cohort resolved"));
    }
}

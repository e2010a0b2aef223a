use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Dashboard roles, one per organizational tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Role {
    Student,
    TeamLead,
    Advisor,
    Hod,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::TeamLead => "team_lead",
            Role::Advisor => "advisor",
            Role::Hod => "hod",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coding platforms the institution tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LeetCode,
    SkillRack,
    CodeChef,
    HackerRank,
    GitHub,
}

impl Platform {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "leetcode" => Some(Platform::LeetCode),
            "skillrack" => Some(Platform::SkillRack),
            "codechef" => Some(Platform::CodeChef),
            "hackerrank" => Some(Platform::HackerRank),
            "github" => Some(Platform::GitHub),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Platform::LeetCode => "leetcode",
            Platform::SkillRack => "skillrack",
            Platform::CodeChef => "codechef",
            Platform::HackerRank => "hackerrank",
            Platform::GitHub => "github",
        }
    }
}

/// One user's activity on one platform for one day, as stored.
/// Numeric fields are optional here; the sanitize pass in `aggregate`
/// drops rows missing them or carrying negative counts.
#[derive(Debug, Clone)]
pub struct RawActivityRow {
    pub user_id: Uuid,
    pub platform: String,
    pub date: NaiveDate,
    pub total_solved: Option<i64>,
    pub daily_increase: Option<i64>,
    pub coding_streak: Option<i64>,
    pub rank_in_team: Option<i64>,
    pub rank_in_section: Option<i64>,
}

/// A validated activity record, safe to aggregate.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub user_id: Uuid,
    pub platform: Platform,
    pub date: NaiveDate,
    pub total_solved: i64,
    pub daily_increase: i64,
    pub coding_streak: i64,
    pub rank_in_team: Option<i64>,
    pub rank_in_section: Option<i64>,
}

/// Viewer identity as read from the profiles table.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub section_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
}

/// The user ids feeding a tier's aggregation. Roster size counts enrolled
/// members; today's record set may cover fewer.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    pub member_ids: Vec<Uuid>,
}

impl Cohort {
    pub fn new(member_ids: Vec<Uuid>) -> Self {
        Self { member_ids }
    }

    pub fn roster_size(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalStats {
    pub today_problems: i64,
    pub current_streak: i64,
    pub total_solved: i64,
    /// Pre-computed rank carried on today's records; `None` when no record
    /// carries one (rank unavailable, never fabricated).
    pub team_rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    pub team_average: f64,
    pub active_members: usize,
    /// Filled by the cross-team ranking pass; `None` when that pass could
    /// not run.
    pub team_rank: Option<usize>,
    /// Month-to-date goal tracking lives outside the activity records and
    /// is not yet computed.
    pub monthly_goal: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStats {
    pub section_average: f64,
    pub active_students: usize,
    pub top_performers: usize,
    pub need_attention: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub department_average: f64,
    pub total_students: usize,
    /// From the placement-readiness assessment table; `None` when the
    /// department has no assessment row.
    pub placement_ready: Option<i64>,
    pub faculty_usage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub total_users: usize,
    pub active_today: usize,
    /// Operational telemetry injected by the caller, owned by the
    /// ingestion pipeline rather than derived from activity records.
    pub system_health: Option<f64>,
    pub api_success: Option<f64>,
    pub support_tickets: Option<i64>,
}

/// One variant per tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum TierStats {
    Personal(PersonalStats),
    Team(TeamStats),
    Section(SectionStats),
    Department(DepartmentStats),
    System(SystemStats),
}

/// The result of one dashboard load. `no_data` distinguishes an empty
/// cohort from measured zero activity.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub role: Role,
    pub viewer: Uuid,
    pub date: NaiveDate,
    pub cohort_size: usize,
    pub no_data: bool,
    pub skipped_records: usize,
    pub stats: TierStats,
}

/// Ingestion-pipeline health figures shown on the system tier. The engine
/// accepts them as inputs and never computes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpsTelemetry {
    pub system_health: Option<f64>,
    pub api_success: Option<f64>,
    pub support_tickets: Option<i64>,
}

/// Engine tunables, overridable from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Daily-increase cutoff classifying a top performer.
    pub top_performer_threshold: i64,
    /// Window for counting faculty as recently signed in.
    pub faculty_recency_days: i64,
    /// Bound on each store fetch before the load fails as retryable.
    pub fetch_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_performer_threshold: 10,
            faculty_recency_days: 7,
            fetch_timeout_secs: 10,
        }
    }
}

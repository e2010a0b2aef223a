use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Platform, Profile, RawActivityRow};

/// Roster lookups the cohort resolver needs.
#[derive(Debug, Clone, Copy)]
pub enum RosterQuery {
    /// Active members of the team this user leads.
    TeamLedBy(Uuid),
    /// Active students enrolled in a section.
    Section(Uuid),
    /// Active students enrolled in a department.
    Department(Uuid),
    /// Every active user system-wide.
    AllActive,
}

#[derive(Debug, Clone)]
pub struct TeamRoster {
    pub team_id: Uuid,
    pub name: String,
    pub team_lead_id: Uuid,
    pub member_ids: Vec<Uuid>,
}

/// Read-side contract the engine consumes. The engine never writes
/// through this seam; activity rows are append-mostly and owned by the
/// ingestion side.
pub trait ActivityStore {
    async fn profile_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>>;

    async fn roster(&self, query: RosterQuery) -> anyhow::Result<Vec<Uuid>>;

    /// Activity rows for an exact date. `None` user filter means all users.
    async fn records_on(
        &self,
        user_ids: Option<&[Uuid]>,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<RawActivityRow>>;

    /// Every team with its active member ids, for the cross-team ranking
    /// pass.
    async fn team_rosters(&self) -> anyhow::Result<Vec<TeamRoster>>;

    async fn faculty_signed_in_since(
        &self,
        department_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64>;

    /// Placement-readiness headcount from the assessment table, if the
    /// department has been assessed.
    async fn placement_ready(&self, department_id: Uuid) -> anyhow::Result<Option<i64>>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> Profile {
    Profile {
        user_id: row.get("user_id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role: row.get("role"),
        section_id: row.get("section_id"),
        department_id: row.get("department_id"),
        is_active: row.get("is_active"),
    }
}

impl ActivityStore for PgStore {
    async fn profile_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT user_id, full_name, email, role, section_id, department_id, is_active \
             FROM coding_dashboard.profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up viewer profile")?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn roster(&self, query: RosterQuery) -> anyhow::Result<Vec<Uuid>> {
        let rows = match query {
            RosterQuery::TeamLedBy(lead_id) => {
                sqlx::query(
                    "SELECT tm.user_id FROM coding_dashboard.teams t \
                     JOIN coding_dashboard.team_members tm ON tm.team_id = t.id \
                     JOIN coding_dashboard.profiles p ON p.user_id = tm.user_id \
                     WHERE t.team_lead_id = $1 AND p.is_active",
                )
                .bind(lead_id)
                .fetch_all(&self.pool)
                .await
            }
            RosterQuery::Section(section_id) => {
                sqlx::query(
                    "SELECT user_id FROM coding_dashboard.profiles \
                     WHERE section_id = $1 AND role = 'student' AND is_active",
                )
                .bind(section_id)
                .fetch_all(&self.pool)
                .await
            }
            RosterQuery::Department(department_id) => {
                sqlx::query(
                    "SELECT user_id FROM coding_dashboard.profiles \
                     WHERE department_id = $1 AND role = 'student' AND is_active",
                )
                .bind(department_id)
                .fetch_all(&self.pool)
                .await
            }
            RosterQuery::AllActive => {
                sqlx::query("SELECT user_id FROM coding_dashboard.profiles WHERE is_active")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("failed to resolve roster")?;

        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    async fn records_on(
        &self,
        user_ids: Option<&[Uuid]>,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<RawActivityRow>> {
        let mut query = String::from(
            "SELECT user_id, platform, date, total_solved, daily_increase, \
             coding_streak, rank_in_team, rank_in_section \
             FROM coding_dashboard.daily_stats WHERE date = $1",
        );
        if user_ids.is_some() {
            query.push_str(" AND user_id = ANY($2)");
        }

        let mut rows = sqlx::query(&query).bind(date);
        if let Some(ids) = user_ids {
            rows = rows.bind(ids);
        }

        let fetched = rows
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch activity records")?;

        Ok(fetched
            .iter()
            .map(|row| RawActivityRow {
                user_id: row.get("user_id"),
                platform: row.get("platform"),
                date: row.get("date"),
                total_solved: row.get("total_solved"),
                daily_increase: row.get("daily_increase"),
                coding_streak: row.get("coding_streak"),
                rank_in_team: row.get("rank_in_team"),
                rank_in_section: row.get("rank_in_section"),
            })
            .collect())
    }

    async fn team_rosters(&self) -> anyhow::Result<Vec<TeamRoster>> {
        let rows = sqlx::query(
            "SELECT t.id AS team_id, t.name, t.team_lead_id, tm.user_id \
             FROM coding_dashboard.teams t \
             JOIN coding_dashboard.team_members tm ON tm.team_id = t.id \
             JOIN coding_dashboard.profiles p ON p.user_id = tm.user_id \
             WHERE p.is_active \
             ORDER BY t.id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch team rosters")?;

        let mut rosters: Vec<TeamRoster> = Vec::new();
        for row in rows {
            let team_id: Uuid = row.get("team_id");
            let user_id: Uuid = row.get("user_id");
            match rosters.last_mut() {
                Some(roster) if roster.team_id == team_id => roster.member_ids.push(user_id),
                _ => rosters.push(TeamRoster {
                    team_id,
                    name: row.get("name"),
                    team_lead_id: row.get("team_lead_id"),
                    member_ids: vec![user_id],
                }),
            }
        }

        Ok(rosters)
    }

    async fn faculty_signed_in_since(
        &self,
        department_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM coding_dashboard.profiles \
             WHERE department_id = $1 AND role IN ('advisor', 'hod') \
             AND is_active AND last_sign_in_at >= $2",
        )
        .bind(department_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .context("failed to count recently signed-in faculty")?;

        Ok(row.get("n"))
    }

    async fn placement_ready(&self, department_id: Uuid) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT ready_count FROM coding_dashboard.placement_readiness \
             WHERE department_id = $1",
        )
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to read placement readiness")?;

        Ok(row.map(|r| r.get("ready_count")))
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let department_id = Uuid::parse_str("5b3f2a61-7c94-4f2e-9f1d-0a8b2c4d6e81")?;
    let section_id = Uuid::parse_str("a1c8e3b5-2d47-46f9-8e0a-6b5d4c3f2a19")?;
    let team_id = Uuid::parse_str("c7d9f1e3-8a25-4b6c-9d0e-1f2a3b4c5d6e")?;

    sqlx::query(
        r#"
        INSERT INTO coding_dashboard.departments (id, code, name)
        VALUES ($1, 'CSE', 'Computer Science & Engineering')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(department_id)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO coding_dashboard.sections (id, department_id, name)
        VALUES ($1, $2, 'CSE-A')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(section_id)
    .bind(department_id)
    .execute(pool)
    .await?;

    let profiles = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Priya Nair",
            "priya.nair@campus.edu",
            "team_lead",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Arjun Mehta",
            "arjun.mehta@campus.edu",
            "student",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Sana Iqbal",
            "sana.iqbal@campus.edu",
            "student",
        ),
        (
            Uuid::parse_str("7e4b9c2d-5f18-4a3e-b6c7-d8e9f0a1b2c3")?,
            "Dev Raghavan",
            "dev.raghavan@campus.edu",
            "student",
        ),
        (
            Uuid::parse_str("912a3b4c-5d6e-4f70-8192-a3b4c5d6e7f8")?,
            "Meera Joshi",
            "meera.joshi@campus.edu",
            "advisor",
        ),
        (
            Uuid::parse_str("f0e1d2c3-b4a5-4968-8776-655443322110")?,
            "Rahul Krishnan",
            "rahul.krishnan@campus.edu",
            "hod",
        ),
        (
            Uuid::parse_str("1a2b3c4d-5e6f-4708-9a0b-1c2d3e4f5a6b")?,
            "Campus Admin",
            "admin@campus.edu",
            "admin",
        ),
    ];

    for (id, name, email, role) in &profiles {
        sqlx::query(
            r#"
            INSERT INTO coding_dashboard.profiles
            (user_id, full_name, email, role, section_id, department_id, is_active, last_sign_in_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, role = EXCLUDED.role,
                section_id = EXCLUDED.section_id, department_id = EXCLUDED.department_id
            "#,
        )
        .bind(*id)
        .bind(*name)
        .bind(*email)
        .bind(*role)
        .bind(section_id)
        .bind(department_id)
        .execute(pool)
        .await?;
    }

    let lead_id = profiles[0].0;
    sqlx::query(
        r#"
        INSERT INTO coding_dashboard.teams (id, name, team_lead_id, section_id, department_id)
        VALUES ($1, 'Bitwise Brigade', $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(team_id)
    .bind(lead_id)
    .bind(section_id)
    .bind(department_id)
    .execute(pool)
    .await?;

    // Lead plus the three students form the roster.
    for &(member_id, ..) in profiles.iter().take(4) {
        sqlx::query(
            r#"
            INSERT INTO coding_dashboard.team_members (team_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(member_id)
        .execute(pool)
        .await?;
    }

    let today = Utc::now().date_naive();
    let activity = vec![
        (profiles[0].0, Platform::LeetCode, 412i64, 6i64, 14i64, Some(1i64)),
        (profiles[1].0, Platform::LeetCode, 188, 12, 9, Some(2)),
        (profiles[1].0, Platform::SkillRack, 95, 3, 4, None),
        (profiles[2].0, Platform::CodeChef, 142, 4, 6, Some(3)),
        (profiles[3].0, Platform::HackerRank, 77, 0, 0, Some(4)),
    ];

    for (user_id, platform, total_solved, daily_increase, coding_streak, rank_in_team) in activity {
        sqlx::query(
            r#"
            INSERT INTO coding_dashboard.daily_stats
            (id, user_id, platform, date, total_solved, daily_increase, coding_streak, rank_in_team)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, platform, date) DO UPDATE
            SET total_solved = EXCLUDED.total_solved,
                daily_increase = EXCLUDED.daily_increase,
                coding_streak = EXCLUDED.coding_streak,
                rank_in_team = EXCLUDED.rank_in_team
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(platform.as_tag())
        .bind(today)
        .bind(total_solved)
        .bind(daily_increase)
        .bind(coding_streak)
        .bind(rank_in_team)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO coding_dashboard.placement_readiness (department_id, ready_count, assessed_on)
        VALUES ($1, $2, $3)
        ON CONFLICT (department_id) DO UPDATE
        SET ready_count = EXCLUDED.ready_count, assessed_on = EXCLUDED.assessed_on
        "#,
    )
    .bind(department_id)
    .bind(2i64)
    .bind(today)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        platform: String,
        date: NaiveDate,
        total_solved: i64,
        daily_increase: i64,
        coding_streak: i64,
        rank_in_team: Option<i64>,
        rank_in_section: Option<i64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let user_id: Uuid = sqlx::query(
            r#"
            INSERT INTO coding_dashboard.profiles
            (user_id, full_name, email, role, is_active)
            VALUES ($1, $2, $3, 'student', TRUE)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name
            RETURNING user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .fetch_one(pool)
        .await?
        .get("user_id");

        let result = sqlx::query(
            r#"
            INSERT INTO coding_dashboard.daily_stats
            (id, user_id, platform, date, total_solved, daily_increase, coding_streak,
             rank_in_team, rank_in_section)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, platform, date) DO UPDATE
            SET total_solved = EXCLUDED.total_solved,
                daily_increase = EXCLUDED.daily_increase,
                coding_streak = EXCLUDED.coding_streak,
                rank_in_team = EXCLUDED.rank_in_team,
                rank_in_section = EXCLUDED.rank_in_section
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&row.platform)
        .bind(row.date)
        .bind(row.total_solved)
        .bind(row.daily_increase)
        .bind(row.coding_streak)
        .bind(row.rank_in_team)
        .bind(row.rank_in_section)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use uuid::Uuid;

use crate::aggregate;
use crate::cohort::resolve_cohort;
use crate::error::EngineError;
use crate::models::{
    ActivityRecord, Cohort, DashboardSnapshot, EngineConfig, OpsTelemetry, Profile, Role,
    TierStats,
};
use crate::store::ActivityStore;

/// Runs the fetch-then-reduce pipeline for one (role, viewer) pair and
/// maps each role to its tier aggregator. Stateless between loads apart
/// from a generation counter used to discard results that a newer load
/// has superseded.
pub struct Dispatcher<S> {
    store: S,
    config: EngineConfig,
    telemetry: OpsTelemetry,
    generation: AtomicU64,
}

impl<S: ActivityStore> Dispatcher<S> {
    pub fn new(store: S, config: EngineConfig, telemetry: OpsTelemetry) -> Self {
        Self {
            store,
            config,
            telemetry,
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve the viewer, resolve the cohort, fetch the day's records,
    /// and reduce them to the role's tier statistics. Sequential, no
    /// internal parallelism; every store fetch is bounded by the
    /// configured timeout.
    pub async fn load(
        &self,
        role: Role,
        viewer_email: &str,
        date: NaiveDate,
    ) -> Result<DashboardSnapshot, EngineError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(%role, viewer = viewer_email, %date, generation, "loading dashboard");

        let viewer = self
            .bounded(role, 0, self.store.profile_by_email(viewer_email))
            .await?
            .filter(|profile| profile.is_active)
            .ok_or_else(|| EngineError::ViewerNotFound {
                email: viewer_email.to_string(),
            })?;

        let cohort = self
            .bounded(role, 0, resolve_cohort(&self.store, role, &viewer))
            .await?;
        let cohort_size = cohort.roster_size();

        // Admin dashboards count activity across the whole population, so
        // the record fetch drops the id filter; an empty cohort skips the
        // fetch entirely.
        let rows = if cohort.is_empty() {
            Vec::new()
        } else if role == Role::Admin {
            self.bounded(role, cohort_size, self.store.records_on(None, date))
                .await?
        } else {
            self.bounded(
                role,
                cohort_size,
                self.store.records_on(Some(&cohort.member_ids), date),
            )
            .await?
        };

        let (records, skipped_records) = aggregate::sanitize_records(&rows);
        let stats = self
            .reduce(role, &viewer, &cohort, &records, date)
            .await?;

        // A newer load for this dispatcher has started; this result is
        // stale and must not be committed.
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::warn!(%role, generation, "discarding superseded dashboard result");
            return Err(EngineError::Superseded { role });
        }

        Ok(DashboardSnapshot {
            role,
            viewer: viewer.user_id,
            date,
            cohort_size,
            no_data: cohort.is_empty(),
            skipped_records,
            stats,
        })
    }

    async fn reduce(
        &self,
        role: Role,
        viewer: &Profile,
        cohort: &Cohort,
        records: &[ActivityRecord],
        date: NaiveDate,
    ) -> Result<TierStats, EngineError> {
        let stats = match role {
            Role::Student => TierStats::Personal(aggregate::personal_stats(records)),
            Role::TeamLead => {
                let mut stats = aggregate::team_stats(records);
                stats.team_rank = self.cross_team_rank(viewer.user_id, date).await;
                TierStats::Team(stats)
            }
            Role::Advisor => TierStats::Section(aggregate::section_stats(
                records,
                cohort.roster_size(),
                self.config.top_performer_threshold,
            )),
            Role::Hod => {
                let (placement_ready, faculty_usage) = match viewer.department_id {
                    Some(department_id) => {
                        let since = Utc::now()
                            - ChronoDuration::days(self.config.faculty_recency_days.max(0));
                        let placement = self
                            .bounded(
                                role,
                                cohort.roster_size(),
                                self.store.placement_ready(department_id),
                            )
                            .await?;
                        let faculty = self
                            .bounded(
                                role,
                                cohort.roster_size(),
                                self.store.faculty_signed_in_since(department_id, since),
                            )
                            .await?;
                        (placement, faculty)
                    }
                    None => (None, 0),
                };
                TierStats::Department(aggregate::department_stats(
                    records,
                    cohort.roster_size(),
                    placement_ready,
                    faculty_usage,
                ))
            }
            Role::Admin => TierStats::System(aggregate::system_stats(
                cohort.roster_size(),
                records,
                self.telemetry,
            )),
        };

        Ok(stats)
    }

    /// Cross-team ranking pass: rank every team by its members' total
    /// daily increase and pick out the viewer's team. The rank stays
    /// unresolved when the roster data cannot be fetched; a missing rank
    /// is never a load failure.
    async fn cross_team_rank(&self, lead_id: Uuid, date: NaiveDate) -> Option<usize> {
        let rosters = match self.store.team_rosters().await {
            Ok(rosters) => rosters,
            Err(error) => {
                tracing::warn!(%error, "team ranking pass unavailable");
                return None;
            }
        };
        let rows = match self.store.records_on(None, date).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(%error, "team ranking pass unavailable");
                return None;
            }
        };

        let (records, _) = aggregate::sanitize_records(&rows);
        let mut per_user: HashMap<Uuid, i64> = HashMap::new();
        for record in &records {
            *per_user.entry(record.user_id).or_insert(0) += record.daily_increase;
        }

        let totals: Vec<(Uuid, i64)> = rosters
            .iter()
            .map(|roster| {
                let total = roster
                    .member_ids
                    .iter()
                    .filter_map(|member| per_user.get(member))
                    .sum();
                (roster.team_id, total)
            })
            .collect();

        let ranks = aggregate::rank_teams(&totals);
        rosters
            .iter()
            .find(|roster| roster.team_lead_id == lead_id)
            .and_then(|roster| ranks.get(&roster.team_id).copied())
    }

    async fn bounded<T>(
        &self,
        role: Role,
        cohort_size: usize,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, EngineError> {
        let timeout_secs = self.config.fetch_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(EngineError::StoreUnavailable {
                role,
                cohort_size,
                source,
            }),
            Err(_) => Err(EngineError::StoreTimeout {
                role,
                cohort_size,
                timeout_secs,
            }),
        }
    }
}

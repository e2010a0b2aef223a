use crate::models::{Cohort, Profile, Role};
use crate::store::{ActivityStore, RosterQuery};

/// Resolve the set of user ids a role's dashboard aggregates over.
///
/// A viewer missing a prerequisite assignment (a lead with no team, an
/// advisor with no section, a HoD with no department) gets an empty
/// cohort, never an error; the aggregators report it as a no-data state.
pub async fn resolve_cohort<S: ActivityStore>(
    store: &S,
    role: Role,
    viewer: &Profile,
) -> anyhow::Result<Cohort> {
    let member_ids = match role {
        Role::Student => vec![viewer.user_id],
        Role::TeamLead => store.roster(RosterQuery::TeamLedBy(viewer.user_id)).await?,
        Role::Advisor => match viewer.section_id {
            Some(section_id) => store.roster(RosterQuery::Section(section_id)).await?,
            None => {
                tracing::warn!(viewer = %viewer.email, "advisor has no section assigned");
                Vec::new()
            }
        },
        Role::Hod => match viewer.department_id {
            Some(department_id) => store.roster(RosterQuery::Department(department_id)).await?,
            None => {
                tracing::warn!(viewer = %viewer.email, "hod has no department assigned");
                Vec::new()
            }
        },
        Role::Admin => store.roster(RosterQuery::AllActive).await?,
    };

    Ok(Cohort::new(member_ids))
}

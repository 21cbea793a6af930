//! User management. The public gated functions require `role == admin`;
//! `apply_*` are the same operations without a requester, for operators.

use crate::error::{PulseError, Result};
use crate::policy::{require_admin, LeadershipGraph};
use crate::store::{RecordStore, UserFilter};
use crate::types::Role;
use crate::user::User;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChange {
    pub role: Role,
    /// Overrides the leader flag derived from `role` (e.g. a trainee acting
    /// as leader).
    #[serde(default)]
    pub is_team_leader: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderAssignment {
    /// `None` clears the leader.
    #[serde(default)]
    pub leader_id: Option<Uuid>,
}

pub fn list_users(store: &dyn RecordStore, requester: &User, filter: &UserFilter) -> Result<Vec<User>> {
    require_admin(requester)?;
    store.list_users(filter)
}

fn load(store: &dyn RecordStore, id: Uuid) -> Result<User> {
    store
        .get_user(id)?
        .ok_or_else(|| PulseError::UserNotFound(id.to_string()))
}

fn save(store: &dyn RecordStore, user: &User) -> Result<()> {
    if store.update_user(user)? {
        Ok(())
    } else {
        Err(PulseError::UserNotFound(user.id.to_string()))
    }
}

pub fn change_role(
    store: &dyn RecordStore,
    requester: &User,
    target: Uuid,
    change: RoleChange,
) -> Result<User> {
    require_admin(requester)?;
    let user = apply_role(store, target, change)?;
    tracing::info!(by = %requester.id, user = %user.id, "role change by admin");
    Ok(user)
}

/// Point `target` at a new leader (admin only). See [`apply_leader`].
pub fn assign_leader(
    store: &dyn RecordStore,
    requester: &User,
    target: Uuid,
    assignment: LeaderAssignment,
) -> Result<User> {
    require_admin(requester)?;
    let user = apply_leader(store, target, assignment)?;
    tracing::info!(by = %requester.id, user = %user.id, "leader assignment by admin");
    Ok(user)
}

// ---------------------------------------------------------------------------
// Ungated operations (operator CLI)
// ---------------------------------------------------------------------------

/// Change the role of `target`. A user who still has direct reports cannot
/// be moved to a role that cannot lead; reassign the reports first.
pub fn apply_role(store: &dyn RecordStore, target: Uuid, change: RoleChange) -> Result<User> {
    let mut user = load(store, target)?;
    let previous = user.role;
    user.set_role(change.role, change.is_team_leader);
    if !user.can_lead() {
        let reports = store
            .list_users(&UserFilter::default())?
            .into_iter()
            .filter(|u| u.parent_leader_id == Some(user.id))
            .count();
        if reports > 0 {
            return Err(PulseError::validation(format!(
                "user {} still leads {reports} user(s); role {} cannot lead",
                user.id, user.role
            )));
        }
    }
    save(store, &user)?;
    tracing::info!(user = %user.id, from = %previous, to = %user.role, "role changed");
    Ok(user)
}

/// Set or clear the leader of `target`, refusing leaders that cannot lead
/// and assignments that would make a user its own ancestor.
pub fn apply_leader(store: &dyn RecordStore, target: Uuid, assignment: LeaderAssignment) -> Result<User> {
    let mut user = load(store, target)?;
    if let Some(leader_id) = assignment.leader_id {
        let leader = load(store, leader_id)?;
        if !leader.can_lead() {
            return Err(PulseError::validation(format!(
                "user {} with role {} cannot lead",
                leader.id, leader.role
            )));
        }
        let graph = LeadershipGraph::load(store)?;
        if graph.would_create_cycle(user.id, leader.id) {
            return Err(PulseError::validation(format!(
                "assigning {} as leader of {} would create a cycle",
                leader.id, user.id
            )));
        }
    }
    user.parent_leader_id = assignment.leader_id;
    user.updated_at = Utc::now();
    save(store, &user)?;
    tracing::info!(user = %user.id, leader = ?user.parent_leader_id, "leader assigned");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn put(store: &MemoryStore, ext: &str, role: Role) -> User {
        let mut u = User::seeded(ext, None);
        u.set_role(role, None);
        store.upsert_user_by_external_id(&u).unwrap()
    }

    #[test]
    fn only_admin_changes_roles() {
        let store = MemoryStore::new();
        let admin = put(&store, "admin", Role::Admin);
        let leader = put(&store, "lead", Role::TeamLeader);
        let advisor = put(&store, "adv", Role::Advisor);

        let change = RoleChange {
            role: Role::SubLeader,
            is_team_leader: None,
        };
        assert!(matches!(
            change_role(&store, &leader, advisor.id, change.clone()),
            Err(PulseError::Forbidden(_))
        ));
        let updated = change_role(&store, &admin, advisor.id, change).unwrap();
        assert_eq!(updated.role, Role::SubLeader);
        assert!(updated.is_team_leader);
    }

    #[test]
    fn change_role_on_missing_user() {
        let store = MemoryStore::new();
        let admin = put(&store, "admin", Role::Admin);
        let err = change_role(
            &store,
            &admin,
            Uuid::new_v4(),
            RoleChange {
                role: Role::Advisor,
                is_team_leader: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, PulseError::UserNotFound(_)));
    }

    #[test]
    fn assign_leader_rejects_non_leaders_and_cycles() {
        let store = MemoryStore::new();
        let admin = put(&store, "admin", Role::Admin);
        let l = put(&store, "l", Role::TeamLeader);
        let d = put(&store, "d", Role::SubLeader);
        let g = put(&store, "g", Role::Advisor);

        assign_leader(&store, &admin, d.id, LeaderAssignment { leader_id: Some(l.id) }).unwrap();
        assign_leader(&store, &admin, g.id, LeaderAssignment { leader_id: Some(d.id) }).unwrap();

        let err = assign_leader(&store, &admin, l.id, LeaderAssignment { leader_id: Some(g.id) });
        assert!(matches!(err, Err(PulseError::Validation(_))));

        let err = assign_leader(&store, &admin, l.id, LeaderAssignment { leader_id: Some(d.id) });
        assert!(matches!(err, Err(PulseError::Validation(_))));

        let err = assign_leader(&store, &admin, l.id, LeaderAssignment { leader_id: Some(l.id) });
        assert!(matches!(err, Err(PulseError::Validation(_))));
    }

    #[test]
    fn trainee_acting_as_leader_can_be_assigned() {
        let store = MemoryStore::new();
        let admin = put(&store, "admin", Role::Admin);
        let trainee = put(&store, "t", Role::Trainee);
        let advisor = put(&store, "a", Role::Advisor);

        let promoted = change_role(
            &store,
            &admin,
            trainee.id,
            RoleChange {
                role: Role::Trainee,
                is_team_leader: Some(true),
            },
        )
        .unwrap();
        assert!(promoted.can_lead());
        let updated = assign_leader(
            &store,
            &admin,
            advisor.id,
            LeaderAssignment {
                leader_id: Some(trainee.id),
            },
        )
        .unwrap();
        assert_eq!(updated.parent_leader_id, Some(trainee.id));

        let cleared = assign_leader(&store, &admin, advisor.id, LeaderAssignment { leader_id: None }).unwrap();
        assert!(cleared.parent_leader_id.is_none());
    }

    #[test]
    fn leader_with_reports_cannot_be_demoted() {
        let store = MemoryStore::new();
        let l = put(&store, "l", Role::TeamLeader);
        let g = put(&store, "g", Role::Advisor);
        apply_leader(&store, g.id, LeaderAssignment { leader_id: Some(l.id) }).unwrap();

        let demote = RoleChange {
            role: Role::Advisor,
            is_team_leader: None,
        };
        let err = apply_role(&store, l.id, demote.clone()).unwrap_err();
        assert!(matches!(err, PulseError::Validation(_)));
        let stored = store.get_user(l.id).unwrap().unwrap();
        assert_eq!(stored.role, Role::TeamLeader);
        assert!(stored.can_lead());

        // Moving between leading roles is fine.
        let sub = apply_role(
            &store,
            l.id,
            RoleChange {
                role: Role::SubLeader,
                is_team_leader: None,
            },
        )
        .unwrap();
        assert!(sub.can_lead());

        apply_leader(&store, g.id, LeaderAssignment { leader_id: None }).unwrap();
        let demoted = apply_role(&store, l.id, demote).unwrap();
        assert!(!demoted.can_lead());
    }
}

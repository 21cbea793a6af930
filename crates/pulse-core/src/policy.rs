//! Role Policy: who may see and write whose records.
//!
//! - `admin` reaches every user.
//! - `team_leader`, `sub_leader` and anyone flagged `is_team_leader` reach
//!   themselves plus every user whose `parent_leader_id` chain leads back to
//!   them, at any depth.
//! - Everyone else reaches only themselves.
//!
//! The leadership chain is loaded once per request into an arena and walked
//! iteratively with a visited set, so cyclic data cannot hang a request.

use crate::error::{PulseError, Result};
use crate::store::{RecordStore, UserFilter};
use crate::types::Role;
use crate::user::User;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// LeadershipGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LeadershipGraph {
    ids: Vec<Uuid>,
    index: HashMap<Uuid, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl LeadershipGraph {
    pub fn build(users: &[User]) -> Self {
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let index: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut parent = vec![None; ids.len()];
        let mut children = vec![Vec::new(); ids.len()];
        for (i, user) in users.iter().enumerate() {
            // Dangling leader ids are treated as "no leader".
            if let Some(&p) = user.parent_leader_id.and_then(|pid| index.get(&pid)) {
                parent[i] = Some(p);
                children[p].push(i);
            }
        }
        Self {
            ids,
            index,
            parent,
            children,
        }
    }

    pub fn load(store: &dyn RecordStore) -> Result<Self> {
        let users = store.list_users(&UserFilter::default())?;
        Ok(Self::build(&users))
    }

    /// True when `target`'s leader chain reaches `leader`. A user is not its
    /// own descendant.
    pub fn is_descendant(&self, leader: Uuid, target: Uuid) -> bool {
        let (Some(&leader_ix), Some(&target_ix)) = (self.index.get(&leader), self.index.get(&target))
        else {
            return false;
        };
        let mut visited = HashSet::new();
        let mut cursor = self.parent[target_ix];
        while let Some(ix) = cursor {
            if ix == leader_ix {
                return true;
            }
            if !visited.insert(ix) {
                tracing::warn!(%target, "cycle in leadership chain");
                return false;
            }
            cursor = self.parent[ix];
        }
        false
    }

    /// Every transitive report of `leader`, breadth-first.
    pub fn descendants(&self, leader: Uuid) -> Vec<Uuid> {
        let Some(&start) = self.index.get(&leader) else {
            return Vec::new();
        };
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(ix) = queue.pop_front() {
            for &child in &self.children[ix] {
                if visited.insert(child) {
                    out.push(self.ids[child]);
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Whether making `new_leader` the leader of `user` would close a loop.
    pub fn would_create_cycle(&self, user: Uuid, new_leader: Uuid) -> bool {
        user == new_leader || self.is_descendant(user, new_leader)
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Whether `requester` holds report scope beyond their own records.
fn has_report_scope(requester: &User) -> bool {
    match requester.role {
        Role::Admin | Role::TeamLeader | Role::SubLeader => true,
        Role::Advisor | Role::Trainee | Role::Fuehrungskraft => requester.is_team_leader,
    }
}

pub fn can_access(requester: &User, target: Uuid, graph: &LeadershipGraph) -> bool {
    if requester.id == target {
        return true;
    }
    match requester.role {
        Role::Admin => true,
        Role::TeamLeader | Role::SubLeader => graph.is_descendant(requester.id, target),
        Role::Advisor | Role::Trainee | Role::Fuehrungskraft => {
            requester.is_team_leader && graph.is_descendant(requester.id, target)
        }
    }
}

pub fn require_admin(requester: &User) -> Result<()> {
    if requester.role == Role::Admin {
        Ok(())
    } else {
        tracing::warn!(user = %requester.id, role = %requester.role, "admin operation denied");
        Err(PulseError::forbidden("admin role required"))
    }
}

/// Resolve `target` for `requester`, enforcing the policy.
///
/// Non-admins get `Forbidden` for anything outside their scope whether or not
/// the user exists; admins get `UserNotFound` for absent users.
pub fn authorize_user(store: &dyn RecordStore, requester: &User, target: Uuid) -> Result<User> {
    if requester.id == target {
        return Ok(requester.clone());
    }
    let not_found = || PulseError::UserNotFound(target.to_string());
    if requester.role == Role::Admin {
        return store.get_user(target)?.ok_or_else(not_found);
    }
    if has_report_scope(requester) {
        let graph = LeadershipGraph::load(store)?;
        if can_access(requester, target, &graph) {
            return store.get_user(target)?.ok_or_else(not_found);
        }
    }
    tracing::warn!(user = %requester.id, %target, "record access denied");
    Err(PulseError::forbidden("not permitted to access this user's records"))
}

/// Users listed in the requester's team view: everyone for admins, the
/// transitive reports for leaders. Other roles have no listing scope.
pub fn visible_users(store: &dyn RecordStore, requester: &User) -> Result<Vec<User>> {
    if requester.role == Role::Admin {
        return store.list_users(&UserFilter::default());
    }
    if !has_report_scope(requester) {
        return Err(PulseError::forbidden("no team listing scope"));
    }
    let users = store.list_users(&UserFilter::default())?;
    let graph = LeadershipGraph::build(&users);
    let reports: HashSet<Uuid> = graph.descendants(requester.id).into_iter().collect();
    Ok(users.into_iter().filter(|u| reports.contains(&u.id)).collect())
}

/// Team-level views: admins see any team, leaders only their own.
pub fn authorize_team(requester: &User, team_id: &str) -> Result<()> {
    if requester.role == Role::Admin {
        return Ok(());
    }
    if has_report_scope(requester) && requester.team_id.as_deref() == Some(team_id) {
        return Ok(());
    }
    tracing::warn!(user = %requester.id, team_id, "team access denied");
    Err(PulseError::forbidden("not permitted to view this team"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

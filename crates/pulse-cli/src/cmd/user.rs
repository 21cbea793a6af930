use super::Context;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use pulse_core::admin::{self, LeaderAssignment, RoleChange};
use pulse_core::store::{RecordStore, UserFilter};
use pulse_core::types::Role;
use pulse_core::user::User;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// List users, oldest first
    List {
        /// Only members of this team
        #[arg(long)]
        team: Option<String>,
        /// Only users with this role
        #[arg(long)]
        role: Option<String>,
    },

    /// Show one user by external id
    Show { external_id: String },

    /// Pre-provision a user before their first sign-in
    Add {
        external_id: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Initial role (default: advisor)
        #[arg(long)]
        role: Option<String>,
    },

    /// Change a user's role
    SetRole {
        external_id: String,
        /// advisor, sub_leader, team_leader, admin, trainee, führungskraft
        role: String,
        /// Override the leader flag implied by the role
        #[arg(long)]
        leader: Option<bool>,
    },

    /// Set a user's leader, or clear it when no leader is given
    SetLeader {
        external_id: String,
        leader_external_id: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: UserSubcommand) -> anyhow::Result<()> {
    let store = ctx.open_migrated()?;
    match subcmd {
        UserSubcommand::List { team, role } => list(ctx, &store, team, role.as_deref()),
        UserSubcommand::Show { external_id } => show(ctx, &store, &external_id),
        UserSubcommand::Add {
            external_id,
            name,
            role,
        } => add(ctx, &store, &external_id, name, role.as_deref()),
        UserSubcommand::SetRole {
            external_id,
            role,
            leader,
        } => set_role(ctx, &store, &external_id, &role, leader),
        UserSubcommand::SetLeader {
            external_id,
            leader_external_id,
        } => set_leader(ctx, &store, &external_id, leader_external_id.as_deref()),
    }
}

fn find(store: &dyn RecordStore, external_id: &str) -> anyhow::Result<User> {
    store
        .find_user_by_external_id(external_id)?
        .ok_or_else(|| anyhow::anyhow!("no user with external id '{external_id}'"))
}

fn print_user(ctx: &Context, user: &User) -> anyhow::Result<()> {
    if ctx.json {
        return print_json(user);
    }
    println!("id:           {}", user.id);
    println!("external id:  {}", user.external_id);
    println!("name:         {}", user.display_name);
    println!("role:         {}", user.role);
    println!("team leader:  {}", user.is_team_leader);
    println!("team:         {} ({})", user.team_name, or_dash(user.team_id.as_deref()));
    println!("leader:       {}", or_dash(user.parent_leader_id));
    let targets: Vec<String> = user
        .personal_targets
        .iter()
        .map(|(metric, value)| format!("{metric}={value}"))
        .collect();
    println!("targets:      {}", targets.join(" "));
    println!("created:      {}", user.created_at.format("%Y-%m-%d %H:%M"));
    println!(
        "last sign-in: {}",
        or_dash(user.last_sign_in_at.map(|t| t.format("%Y-%m-%d %H:%M")))
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(ctx: &Context, store: &dyn RecordStore, team: Option<String>, role: Option<&str>) -> anyhow::Result<()> {
    let filter = UserFilter {
        team_id: team,
        role: role.map(str::parse::<Role>).transpose()?,
    };
    let users = store.list_users(&filter)?;

    if ctx.json {
        return print_json(&users);
    }
    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }

    let by_id: HashMap<_, _> = users.iter().map(|u| (u.id, u.external_id.as_str())).collect();
    let rows = users
        .iter()
        .map(|u| {
            let leader = u.parent_leader_id.map(|id| {
                by_id
                    .get(&id)
                    .map(|ext| ext.to_string())
                    .unwrap_or_else(|| id.to_string())
            });
            vec![
                u.external_id.clone(),
                u.display_name.clone(),
                u.role.to_string(),
                or_dash(u.team_id.as_deref()),
                or_dash(leader),
                u.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["EXTERNAL ID", "NAME", "ROLE", "TEAM", "LEADER", "CREATED"], rows);
    Ok(())
}

fn show(ctx: &Context, store: &dyn RecordStore, external_id: &str) -> anyhow::Result<()> {
    let user = find(store, external_id)?;
    print_user(ctx, &user)
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

fn add(
    ctx: &Context,
    store: &dyn RecordStore,
    external_id: &str,
    name: Option<String>,
    role: Option<&str>,
) -> anyhow::Result<()> {
    if external_id.trim().is_empty() {
        anyhow::bail!("external id must not be empty");
    }
    let role = role.map(str::parse::<Role>).transpose()?;
    if store.find_user_by_external_id(external_id)?.is_some() {
        anyhow::bail!("user '{external_id}' already exists");
    }

    let mut user = User::seeded(external_id, name);
    user.last_sign_in_at = None;
    if let Some(role) = role {
        user.set_role(role, None);
    }
    let user = store.upsert_user_by_external_id(&user)?;

    if ctx.json {
        print_json(&user)
    } else {
        println!("Added {} ({}) as {}.", user.external_id, user.display_name, user.role);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// set-role / set-leader
// ---------------------------------------------------------------------------

fn set_role(
    ctx: &Context,
    store: &dyn RecordStore,
    external_id: &str,
    role: &str,
    leader: Option<bool>,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let user = find(store, external_id)?;
    let updated = admin::apply_role(
        store,
        user.id,
        RoleChange {
            role,
            is_team_leader: leader,
        },
    )?;

    if ctx.json {
        print_json(&updated)
    } else {
        println!(
            "{}: {} -> {} (team leader: {})",
            updated.external_id, user.role, updated.role, updated.is_team_leader
        );
        Ok(())
    }
}

fn set_leader(
    ctx: &Context,
    store: &dyn RecordStore,
    external_id: &str,
    leader_external_id: Option<&str>,
) -> anyhow::Result<()> {
    let user = find(store, external_id)?;
    let leader = leader_external_id.map(|ext| find(store, ext)).transpose()?;
    let updated = admin::apply_leader(
        store,
        user.id,
        LeaderAssignment {
            leader_id: leader.as_ref().map(|l| l.id),
        },
    )?;

    if ctx.json {
        return print_json(&updated);
    }
    match leader {
        Some(leader) => println!("{} now reports to {}.", updated.external_id, leader.external_id),
        None => println!("{} has no leader.", updated.external_id),
    }
    Ok(())
}

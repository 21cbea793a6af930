use axum::http::StatusCode;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use pulse_core::clock::Clock;
use pulse_core::identity::{IdentityConfig, IdentityResolver};
use pulse_core::store::{RecordStore, SqliteStore};
use pulse_core::types::Role;
use pulse_server::auth::TokenVerifier;
use pulse_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SECRET: &str = "integration-test-secret";

struct Harness {
    app: axum::Router,
    store: Arc<SqliteStore>,
    tokens: TokenVerifier,
}

/// Router over a migrated in-memory SQLite store with the clock pinned to
/// `today`.
fn harness_on(today: NaiveDate, identity: IdentityConfig) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.migrate().unwrap();
    let tokens = TokenVerifier::new(SECRET);
    let state = AppState::new(
        store.clone(),
        IdentityResolver::new(identity),
        Arc::new(tokens.clone()),
    )
    .with_clock(Clock::fixed_date(today));
    Harness {
        app: build_router(state),
        store,
        tokens,
    }
}

/// Wednesday 2026-03-18; its week starts Monday 2026-03-16.
fn harness() -> Harness {
    harness_on(day(18), IdentityConfig::disabled())
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

impl Harness {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        subject: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = axum::http::Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            let token = self.tokens.mint(subject).unwrap();
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                axum::body::Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => axum::body::Body::empty(),
        };
        let response = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str, subject: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(subject), None).await
    }

    /// Sign in `ext` through the API and return the stored user id.
    async fn sign_in(&self, ext: &str) -> Uuid {
        let (status, body) = self.send("POST", "/api/auth/sign-in", Some(ext), None).await;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Sign in and then set role, team and leader directly in the store.
    async fn user(&self, ext: &str, role: Role, team: Option<&str>, leader: Option<Uuid>) -> Uuid {
        let id = self.sign_in(ext).await;
        let mut user = self.store.get_user(id).unwrap().unwrap();
        user.set_role(role, None);
        user.team_id = team.map(str::to_string);
        user.parent_leader_id = leader;
        assert!(self.store.update_user(&user).unwrap());
        id
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let (status, body) = h.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn missing_or_forged_token_is_401() {
    let h = harness();
    let (status, body) = h.send("GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let forged = TokenVerifier::new("other-secret").mint("ext_123").unwrap();
    let req = axum::http::Request::builder()
        .uri("/api/me")
        .header("authorization", format!("Bearer {forged}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_in_seeds_defaults_once() {
    let h = harness();
    let (status, body) = h
        .send(
            "POST",
            "/api/auth/sign-in",
            Some("ext_123"),
            Some(json!({"display_name": "Alice"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let user = &body["data"];
    assert_eq!(user["role"], "advisor");
    assert_eq!(user["team_name"], "Test Team");
    assert_eq!(user["display_name"], "Alice");
    assert_eq!(user["personal_targets"]["fa_daily"], 5);
    assert_eq!(user["personal_targets"]["bav_checks_daily"], 2);

    let again = h.sign_in("ext_123").await;
    assert_eq!(again.to_string(), user["id"].as_str().unwrap());

    let (status, me) = h.get("/api/me", "ext_123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["display_name"], "Alice");
}

#[tokio::test]
async fn unknown_subject_is_404_until_sign_in() {
    let h = harness();
    let (status, _) = h.get("/api/me", "ext_new").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    h.sign_in("ext_new").await;
    let (status, _) = h.get("/api/me", "ext_new").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn fallback_subject_allows_tokenless_requests() {
    let h = harness_on(day(18), IdentityConfig::with_fallback("dev_user"));
    let (status, body) = h.send("POST", "/api/auth/sign-in", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["external_id"], "dev_user");
    let (status, _) = h.send("GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_sign_in_body_is_400() {
    let h = harness();
    let token = h.tokens.mint("ext_bad").unwrap();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/sign-in")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Role policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leadership_chain_grants_transitive_access() {
    let h = harness();
    let l = h.user("lead", Role::TeamLeader, Some("alpha"), None).await;
    let d = h.user("deputy", Role::SubLeader, Some("alpha"), Some(l)).await;
    let g = h.user("advisor", Role::Advisor, Some("alpha"), Some(d)).await;
    h.user("other_lead", Role::TeamLeader, Some("beta"), None).await;
    h.user("admin", Role::Admin, None, None).await;

    let uri = format!("/api/users/{g}/entries");
    assert_eq!(h.get(&uri, "lead").await.0, StatusCode::OK);
    assert_eq!(h.get(&uri, "deputy").await.0, StatusCode::OK);
    assert_eq!(h.get(&uri, "advisor").await.0, StatusCode::OK);
    assert_eq!(h.get(&uri, "admin").await.0, StatusCode::OK);
    let (status, body) = h.get(&uri, "other_lead").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("forbidden"));

    // Reports never see upward.
    assert_eq!(
        h.get(&format!("/api/users/{l}"), "advisor").await.0,
        StatusCode::FORBIDDEN
    );

    let (status, members) = h.get("/api/team/members", "lead").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["data"].as_array().unwrap().len(), 2);
    assert_eq!(h.get("/api/team/members", "advisor").await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_user_is_404_for_admin_and_403_otherwise() {
    let h = harness();
    h.user("admin", Role::Admin, None, None).await;
    h.user("lead", Role::TeamLeader, None, None).await;
    let ghost = Uuid::new_v4();
    let uri = format!("/api/users/{ghost}");
    assert_eq!(h.get(&uri, "admin").await.0, StatusCode::NOT_FOUND);
    assert_eq!(h.get(&uri, "lead").await.0, StatusCode::FORBIDDEN);
    assert_eq!(h.get("/api/users/not-a-uuid", "admin").await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leader_updates_report_targets() {
    let h = harness();
    let l = h.user("lead", Role::TeamLeader, Some("alpha"), None).await;
    let g = h.user("advisor", Role::Advisor, Some("alpha"), Some(l)).await;
    let (status, body) = h
        .send(
            "PUT",
            &format!("/api/users/{g}/targets"),
            Some("lead"),
            Some(json!({"personal_targets": {"fa_daily": 10}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["personal_targets"]["fa_daily"], 10);

    let (status, report) = h.get(&format!("/api/users/{g}/targets/monthly"), "advisor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["data"]["projected"]["fa_monthly"], 220);

    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/users/{l}/targets"),
            Some("advisor"),
            Some(json!({"personal_targets": {"fa_daily": 1}})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/users/{g}/targets"),
            Some("lead"),
            Some(json!({"personal_targets": {"nope_daily": 1}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Entries, progress and team aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entries_upsert_and_feed_progress() {
    let h = harness();
    let id = h.sign_in("ext_e").await;
    for fa in [2, 6] {
        let (status, body) = h
            .send(
                "POST",
                "/api/entries",
                Some("ext_e"),
                Some(json!({"entry_date": "2026-03-16", "metrics": {"fa": fa, "eh": 1}})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    h.send(
        "POST",
        "/api/entries",
        Some("ext_e"),
        Some(json!({"metrics": {"fa": 3}})),
    )
    .await;

    let (status, body) = h.get(&format!("/api/users/{id}/entries"), "ext_e").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["entry_date"], "2026-03-18");
    assert_eq!(entries[1]["metrics"]["fa"], 6);

    let (status, body) = h
        .get(&format!("/api/users/{id}/progress?from=2026-03-16&to=2026-03-18"), "ext_e")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["working_days"], 3);
    let fa = &body["data"]["metrics"][0];
    assert_eq!(fa["metric"], "fa");
    assert_eq!(fa["expected"], 15);
    assert_eq!(fa["actual"], 9);
}

#[tokio::test]
async fn progress_handles_extreme_and_oversized_ranges() {
    let h = harness();
    let id = h.sign_in("ext_r").await;

    let (status, body) = h
        .get(
            &format!("/api/users/{id}/progress?from=%2B262142-12-31&to=%2B262142-12-31"),
            "ext_r",
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["working_days"].as_u64().unwrap() <= 1);

    let (status, _) = h
        .get(
            &format!("/api/users/{id}/progress?from=2000-01-01&to=2026-03-18"),
            "ext_r",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn entry_counts_above_daily_maximum_are_400() {
    let h = harness();
    h.sign_in("ext_e").await;
    let (status, body) = h
        .send(
            "POST",
            "/api/entries",
            Some("ext_e"),
            Some(json!({"metrics": {"fa": 3_000_000_000u64}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fa count"), "{body}");
}

#[tokio::test]
async fn invalid_entries_are_400() {
    let h = harness();
    h.sign_in("ext_e").await;
    let (status, _) = h
        .send(
            "POST",
            "/api/entries",
            Some("ext_e"),
            Some(json!({"entry_date": "2026-03-19", "metrics": {}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .send(
            "POST",
            "/api/entries",
            Some("ext_e"),
            Some(json!({"metrics": {"fa": "lots"}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].is_string());

    let (status, _) = h
        .get("/api/users/00000000-0000-0000-0000-000000000000/entries?from=nope", "ext_e")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn team_analytics_and_targets_are_team_scoped() {
    let h = harness();
    let l = h.user("lead", Role::TeamLeader, Some("alpha"), None).await;
    h.user("a1", Role::Advisor, Some("alpha"), Some(l)).await;
    h.user("b1", Role::Advisor, Some("beta"), None).await;
    h.user("beta_lead", Role::TeamLeader, Some("beta"), None).await;
    for (who, fa) in [("a1", 4), ("lead", 2), ("b1", 50)] {
        h.send(
            "POST",
            "/api/entries",
            Some(who),
            Some(json!({"metrics": {"fa": fa}})),
        )
        .await;
    }

    let (status, body) = h.get("/api/team/alpha/analytics", "lead").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["entry_count"], 2);
    assert_eq!(body["data"]["totals"]["fa"], 6);

    let (status, body) = h.get("/api/team/alpha/analytics?from=2026-03-01&to=2026-03-02", "lead").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    assert_eq!(h.get("/api/team/alpha/analytics", "beta_lead").await.0, StatusCode::FORBIDDEN);
    assert_eq!(h.get("/api/team/alpha/analytics", "a1").await.0, StatusCode::FORBIDDEN);

    let (status, body) = h.get("/api/team/alpha/targets", "lead").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["member_count"], 2);
    assert_eq!(body["data"]["daily"]["fa_daily"], 10);
    assert_eq!(body["data"]["weekly"]["fa"], 50);
}

// ---------------------------------------------------------------------------
// Goals and reflections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn goal_lifecycle() {
    let h = harness();
    let id = h.sign_in("ext_g").await;

    let (status, body) = h.get("/api/goals/current", "ext_g").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "no_goal");
    assert_eq!(body["data"]["week_start_date"], "2026-03-16");
    assert!(body["data"]["goal"].is_null());

    let (status, body) = h
        .send(
            "PUT",
            "/api/goals/current",
            Some("ext_g"),
            Some(json!({"goal_text": "Close five deals", "targets": {"fa": 25}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["week_start_date"], "2026-03-16");

    let (_, body) = h.get("/api/goals/current", "ext_g").await;
    assert_eq!(body["data"]["state"], "active");

    let review = |week: &str| {
        json!({"week_start_date": week, "goal_achieved": true, "completion_notes": "done"})
    };
    let (status, body) = h
        .send("POST", "/api/goals/review", Some("ext_g"), Some(review("2026-03-16")))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_completed"], true);

    let (_, body) = h.get("/api/goals/current", "ext_g").await;
    assert_eq!(body["data"]["state"], "reviewed");

    let (status, _) = h
        .send("POST", "/api/goals/review", Some("ext_g"), Some(review("2026-03-09")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h
        .send("POST", "/api/goals/review", Some("ext_g"), Some(review("2026-03-17")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h.get(&format!("/api/users/{id}/goals"), "ext_g").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reflections_append_and_validate() {
    let h = harness();
    let id = h.sign_in("ext_r").await;
    for text in ["first", "second"] {
        let (status, _) = h
            .send(
                "POST",
                "/api/reflections",
                Some("ext_r"),
                Some(json!({"reflection_text": text, "mood_score": 7})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = h
        .send(
            "POST",
            "/api/reflections",
            Some("ext_r"),
            Some(json!({"reflection_text": "x", "mood_score": 11})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = h.get(&format!("/api/users/{id}/reflections?limit=1"), "ext_r").await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
}

// ---------------------------------------------------------------------------
// Questions and onboarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn questions_fall_back_and_admin_replaces() {
    let h = harness();
    h.user("admin", Role::Admin, None, None).await;
    h.sign_in("ext_q").await;

    for path in ["/api/questions/8", "/api/questions/999", "/api/questions/-1", "/api/questions/friday"] {
        let (status, body) = h.get(path, "ext_q").await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body["data"]["is_fallback"], true, "{path}");
    }

    let custom = json!({
        "yesterday_question": "Wie lief gestern?",
        "today_questions": ["Was ist heute wichtig?"],
        "trainee_question": "Was hast du gelernt?"
    });
    let (status, _) = h
        .send("PUT", "/api/admin/questions/3", Some("ext_q"), Some(custom.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h
        .send("PUT", "/api/admin/questions/3", Some("admin"), Some(custom))
        .await;
    assert_eq!(status, StatusCode::OK);

    // 2026-03-18 is a Wednesday.
    let (status, body) = h.get("/api/questions/today", "ext_q").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["weekday"], 3);
    assert_eq!(body["data"]["is_fallback"], false);
    assert_eq!(body["data"]["yesterday_question"], "Wie lief gestern?");
}

#[tokio::test]
async fn onboarding_reports_both_predicates() {
    let h = harness_on(day(28), IdentityConfig::disabled());
    h.sign_in("ext_o").await;

    let (_, body) = h.get("/api/me/onboarding", "ext_o").await;
    assert_eq!(body["data"]["onboarding_complete"], false);
    assert_eq!(body["data"]["has_basic_info"], false);

    let (status, _) = h
        .send(
            "POST",
            "/api/me/onboarding",
            Some("ext_o"),
            Some(json!({
                "display_name": "Olga",
                "team_name": "Alpha",
                "personal_targets": {"fa_daily": 4}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h.get("/api/me/onboarding", "ext_o").await;
    assert_eq!(body["data"]["onboarding_complete"], true);
    assert_eq!(body["data"]["needs_onboarding"], true);
    assert_eq!(body["data"]["is_month_end"], true);
    assert_eq!(body["data"]["is_first_time"], false);
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_manages_roles_and_leaders() {
    let h = harness();
    h.user("admin", Role::Admin, None, None).await;
    let l = h.sign_in("lead").await;
    let g = h.sign_in("adv").await;

    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{l}/role"),
            Some("adv"),
            Some(json!({"role": "team_leader"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{l}/role"),
            Some("admin"),
            Some(json!({"role": "team_leader"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_team_leader"], true);

    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{l}/role"),
            Some("admin"),
            Some(json!({"role": "overlord"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{g}/leader"),
            Some("admin"),
            Some(json!({"leader_id": l})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{l}/leader"),
            Some("admin"),
            Some(json!({"leader_id": g})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(h.get(&format!("/api/users/{g}"), "lead").await.0, StatusCode::OK);

    let (status, body) = h.get("/api/admin/users?role=team_leader", "admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(h.get("/api/admin/users", "lead").await.0, StatusCode::FORBIDDEN);

    // `lead` still has `adv` reporting to them.
    let (status, _) = h
        .send(
            "PUT",
            &format!("/api/admin/users/{l}/role"),
            Some("admin"),
            Some(json!({"role": "advisor"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.get(&format!("/api/users/{g}"), "lead").await.0, StatusCode::OK);
}

#[tokio::test]
async fn admin_runs_migrations() {
    let h = harness();
    h.user("admin", Role::Admin, None, None).await;
    let (status, body) = h.send("POST", "/api/admin/maintenance/migrate", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["previous_version"], body["data"]["schema_version"]);
    assert_eq!(body["data"]["schema_version"], SqliteStore::latest_version());
}

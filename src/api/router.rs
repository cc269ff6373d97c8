//! REST API router.
//!
//! Returns a composable `Router` nested under `/api/`. Everything except
//! `/api/auth/login` sits behind the bearer-token middleware.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
//! Endpoint handlers use `State<ApiContext>` (provided via `with_state`).

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router with all routes and the middleware stack.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // Protected routes — everything behind bearer-token auth.
    //
    // Layers apply bottom (innermost) to top (outermost):
    //   Extension (outermost) → Auth → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/logout", post(endpoints::auth::logout))
        // Patient registry
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/search", get(endpoints::patients::search))
        .route(
            "/patients/:id",
            get(endpoints::patients::get).put(endpoints::patients::update),
        )
        .route("/patients/:id/archive", patch(endpoints::patients::archive))
        .route("/patients/:id/restore", patch(endpoints::patients::restore))
        .route("/patients/:id/overview", get(endpoints::patients::overview))
        .route(
            "/patients/:id/appointments",
            get(endpoints::patients::appointments),
        )
        .route(
            "/patients/:id/certificates",
            get(endpoints::patients::certificates),
        )
        .route(
            "/patients/:id/documents",
            get(endpoints::patients::documents),
        )
        // Appointment workflow
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/update-status",
            post(endpoints::appointments::update_status),
        )
        .route(
            "/appointments/toggle-mutuelle",
            post(endpoints::appointments::toggle_mutuelle),
        )
        .route(
            "/appointments/stats/monthly",
            get(endpoints::appointments::monthly_stats),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::get).delete(endpoints::appointments::delete),
        )
        .route(
            "/appointments/:id/details",
            put(endpoints::appointments::update_details),
        )
        .route(
            "/appointments/:id/medications",
            post(endpoints::appointments::attach_medications),
        )
        .route(
            "/appointments/:id/medications/:medication_id",
            delete(endpoints::appointments::detach_medication),
        )
        .route(
            "/appointments/:id/analyses",
            post(endpoints::appointments::attach_analyses),
        )
        .route(
            "/appointments/:id/analyses/:analysis_id",
            delete(endpoints::appointments::detach_analysis),
        )
        .route(
            "/appointments/:id/case-description",
            get(endpoints::appointments::get_case_description)
                .put(endpoints::appointments::put_case_description),
        )
        // Medication catalog
        .route(
            "/medications",
            get(endpoints::medications::list).post(endpoints::medications::create),
        )
        .route("/medications/search", get(endpoints::medications::search))
        .route(
            "/medications/:id",
            get(endpoints::medications::get).put(endpoints::medications::update),
        )
        .route(
            "/medications/:id/archive",
            patch(endpoints::medications::archive),
        )
        .route(
            "/medications/:id/restore",
            patch(endpoints::medications::restore),
        )
        // Analysis catalog
        .route(
            "/analyses",
            get(endpoints::analyses::list).post(endpoints::analyses::create),
        )
        .route("/analyses/search", get(endpoints::analyses::search))
        .route(
            "/analyses/:id",
            get(endpoints::analyses::get)
                .put(endpoints::analyses::update)
                .delete(endpoints::analyses::destroy),
        )
        .route("/analyses/:id/archive", patch(endpoints::analyses::archive))
        .route("/analyses/:id/restore", patch(endpoints::analyses::restore))
        // Certificates & documents
        .route("/certificates", post(endpoints::certificates::create))
        .route(
            "/certificates/:id",
            get(endpoints::certificates::get).delete(endpoints::certificates::delete),
        )
        .route("/documents", post(endpoints::documents::create))
        .route(
            "/documents/:id",
            get(endpoints::documents::get).delete(endpoints::documents::delete),
        )
        // Settings & users
        .route(
            "/settings",
            get(endpoints::settings::get).put(endpoints::settings::put),
        )
        .route(
            "/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route(
            "/users/:id",
            put(endpoints::users::update).delete(endpoints::users::delete),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes
    let unprotected = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth;
    use crate::db::{self, StoredCredentials};
    use crate::models::enums::UserRole;
    use crate::models::User;

    struct TestApp {
        router: Router,
        core: Arc<CoreState>,
        token: String,
        _tmp: tempfile::TempDir,
    }

    fn make_user(username: &str, role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: "Test User".to_string(),
            role,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Router + seeded admin session backed by a tempdir database.
    fn test_app() -> TestApp {
        let tmp = tempfile::tempdir().unwrap();
        let core = Arc::new(CoreState::in_dir(tmp.path()));

        let conn = core.open_db().unwrap();
        let admin = make_user("admin", UserRole::Admin);
        db::insert_user(
            &conn,
            &admin,
            &StoredCredentials {
                password_hash: "seeded".to_string(),
                password_salt: "seeded".to_string(),
            },
        )
        .unwrap();
        let token = core.write_sessions().unwrap().issue(&admin);

        TestApp {
            router: api_router(Arc::clone(&core)),
            core,
            token,
            _tmp: tmp,
        }
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Option<&str>) -> axum::response::Response {
        app.router
            .clone()
            .oneshot(request(method, uri, Some(&app.token), body))
            .await
            .unwrap()
    }

    // ── Auth ────────────────────────────────────────────────

    #[tokio::test]
    async fn protected_route_requires_token() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/health", Some("not-a-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_with_valid_token() {
        let app = test_app();
        let response = send(&app, "GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn login_issues_usable_token_and_logout_revokes_it() {
        let app = test_app();

        // Seed a user with real credentials
        let conn = app.core.open_db().unwrap();
        let user = make_user("drkadiri", UserRole::Practitioner);
        db::insert_user(&conn, &user, &auth::derive_credentials("s3cret-pass")).unwrap();

        let response = app
            .router
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/login",
                None,
                Some(r#"{"username": "drkadiri", "password": "s3cret-pass"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let token = json["token"].as_str().unwrap().to_string();
        assert_eq!(json["user"]["username"], "drkadiri");

        // The fresh token opens protected routes
        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/health", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Logout revokes it
        let response = app
            .router
            .clone()
            .oneshot(request("POST", "/api/auth/logout", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/health", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails_uniformly() {
        let app = test_app();
        let conn = app.core.open_db().unwrap();
        let user = make_user("drkadiri", UserRole::Practitioner);
        db::insert_user(&conn, &user, &auth::derive_credentials("s3cret-pass")).unwrap();

        for body in [
            r#"{"username": "drkadiri", "password": "wrong"}"#,
            r#"{"username": "ghost", "password": "whatever"}"#,
        ] {
            let response = app
                .router
                .clone()
                .oneshot(request("POST", "/api/auth/login", None, Some(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    // ── Patients ────────────────────────────────────────────

    #[tokio::test]
    async fn patient_crud_and_archive_cycle() {
        let app = test_app();

        let response = send(
            &app,
            "POST",
            "/api/patients",
            Some(r#"{"first_name": "Amina", "last_name": "Berrada", "cin": "K123456"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        // Archive hides it from the default listing
        let response = send(&app, "PATCH", &format!("/api/patients/{id}/archive"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/api/patients", None).await;
        let listing = json_body(response).await;
        assert_eq!(listing.as_array().unwrap().len(), 0);

        // Restore brings it back, fields intact
        let response = send(&app, "PATCH", &format!("/api/patients/{id}/restore"), None).await;
        let restored = json_body(response).await;
        assert_eq!(restored["first_name"], "Amina");
        assert_eq!(restored["cin"], "K123456");
        assert_eq!(restored["archived"], false);
    }

    #[tokio::test]
    async fn patient_without_name_is_rejected() {
        let app = test_app();
        let response = send(
            &app,
            "POST",
            "/api/patients",
            Some(r#"{"first_name": "  ", "last_name": "Berrada"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(response).await;
        assert_eq!(json["error"]["field"], "first_name");
    }

    #[tokio::test]
    async fn duplicate_active_cin_is_rejected() {
        let app = test_app();
        let body = r#"{"first_name": "Amina", "last_name": "Berrada", "cin": "K123456"}"#;
        send(&app, "POST", "/api/patients", Some(body)).await;

        let response = send(
            &app,
            "POST",
            "/api/patients",
            Some(r#"{"first_name": "Karim", "last_name": "Alaoui", "cin": "K123456"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(response).await;
        assert_eq!(json["error"]["field"], "cin");
    }

    #[tokio::test]
    async fn patient_search_no_match_is_empty_list() {
        let app = test_app();
        let response = send(&app, "GET", "/api/patients/search?term=nobody", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn unknown_patient_is_404() {
        let app = test_app();
        let response = send(
            &app,
            "GET",
            &format!("/api/patients/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ── Appointments ────────────────────────────────────────

    async fn create_patient(app: &TestApp) -> String {
        let response = send(
            app,
            "POST",
            "/api/patients",
            Some(r#"{"first_name": "Amina", "last_name": "Berrada"}"#),
        )
        .await;
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    async fn create_appointment(app: &TestApp, patient_id: &str) -> String {
        let body = format!(
            r#"{{"patient_id": "{patient_id}", "scheduled_at": "2026-03-02T09:00:00", "reason": "checkup"}}"#
        );
        let response = send(app, "POST", "/api/appointments", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn appointment_requires_known_patient() {
        let app = test_app();
        let body = format!(
            r#"{{"patient_id": "{}", "scheduled_at": "2026-03-02T09:00:00"}}"#,
            Uuid::new_v4()
        );
        let response = send(&app, "POST", "/api/appointments", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Nothing was persisted
        let response = send(&app, "GET", "/api/appointments", None).await;
        let json = json_body(response).await;
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn status_walks_the_queue_and_rejects_shortcuts() {
        let app = test_app();
        let patient_id = create_patient(&app).await;
        let appt_id = create_appointment(&app, &patient_id).await;

        // scheduled -> completed is not on the table
        let body = format!(r#"{{"id": "{appt_id}", "status": "completed"}}"#);
        let response = send(&app, "POST", "/api/appointments/update-status", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // The stored status is untouched — the board can roll its card back
        let response = send(&app, "GET", &format!("/api/appointments/{appt_id}"), None).await;
        let json = json_body(response).await;
        assert_eq!(json["appointment"]["status"], "scheduled");

        // Legal path goes through
        for status in ["waiting", "preparing", "consulting", "completed"] {
            let body = format!(r#"{{"id": "{appt_id}", "status": "{status}"}}"#);
            let response =
                send(&app, "POST", "/api/appointments/update-status", Some(&body)).await;
            assert_eq!(response.status(), StatusCode::OK, "to {status}");
        }

        let response = send(&app, "GET", &format!("/api/appointments/{appt_id}"), None).await;
        let json = json_body(response).await;
        assert_eq!(json["appointment"]["status"], "completed");
        assert!(json["appointment"]["consultation_started_at"].is_string());
        assert!(json["appointment"]["consultation_ended_at"].is_string());
    }

    #[tokio::test]
    async fn toggle_mutuelle_twice_is_identity() {
        let app = test_app();
        let patient_id = create_patient(&app).await;
        let appt_id = create_appointment(&app, &patient_id).await;

        let body = format!(r#"{{"id": "{appt_id}"}}"#);
        let response = send(&app, "POST", "/api/appointments/toggle-mutuelle", Some(&body)).await;
        assert_eq!(json_body(response).await["mutuelle"], true);

        let response = send(&app, "POST", "/api/appointments/toggle-mutuelle", Some(&body)).await;
        assert_eq!(json_body(response).await["mutuelle"], false);
    }

    #[tokio::test]
    async fn appointment_delete_cascades_attachments_only() {
        let app = test_app();
        let patient_id = create_patient(&app).await;
        let appt_id = create_appointment(&app, &patient_id).await;

        // Attach a medication and a case description
        let response = send(
            &app,
            "POST",
            "/api/medications",
            Some(r#"{"name": "Doliprane 500"}"#),
        )
        .await;
        let med_id = json_body(response).await["id"].as_str().unwrap().to_string();

        let body = format!(
            r#"{{"medications": [{{"medication_id": "{med_id}", "dosage": "500 mg", "frequency": "3x/day", "duration_days": 5}}]}}"#
        );
        let response = send(
            &app,
            "POST",
            &format!("/api/appointments/{appt_id}/medications"),
            Some(&body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            "PUT",
            &format!("/api/appointments/{appt_id}/case-description"),
            Some(r#"{"case_notes": "flu symptoms", "temperature_c": 38.5}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Delete the appointment
        let response = send(&app, "DELETE", &format!("/api/appointments/{appt_id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Patient and medication survive
        let response = send(&app, "GET", &format!("/api/patients/{patient_id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(&app, "GET", &format!("/api/medications/{med_id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        // The case description is gone with its appointment
        let conn = app.core.open_db().unwrap();
        let cases: i64 = conn
            .query_row("SELECT COUNT(*) FROM case_descriptions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(cases, 0);
    }

    #[tokio::test]
    async fn monthly_stats_count_the_year() {
        let app = test_app();
        let patient_id = create_patient(&app).await;
        create_appointment(&app, &patient_id).await;
        create_appointment(&app, &patient_id).await;

        let response = send(&app, "GET", "/api/appointments/stats/monthly?year=2026", None).await;
        let json = json_body(response).await;
        assert_eq!(json["year"], 2026);
        assert_eq!(json["counts"][2], 2); // March
    }

    // ── Registries ──────────────────────────────────────────

    #[tokio::test]
    async fn analysis_destroy_is_hard_delete() {
        let app = test_app();
        let response = send(
            &app,
            "POST",
            "/api/analyses",
            Some(r#"{"kind": "NFS", "department": "hematology"}"#),
        )
        .await;
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = send(&app, "DELETE", &format!("/api/analyses/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", &format!("/api/analyses/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ── Settings ────────────────────────────────────────────

    #[tokio::test]
    async fn settings_default_then_replace() {
        let app = test_app();

        let response = send(&app, "GET", "/api/settings", None).await;
        let defaults = json_body(response).await;
        assert_eq!(defaults["locale"], "fr");
        assert_eq!(defaults["default_duration_minutes"], 30);

        let body = r#"{
            "default_duration_minutes": 20,
            "working_days": ["mon", "tue", "sat"],
            "day_starts_at": "09:00",
            "day_ends_at": "17:00",
            "reminders_enabled": false,
            "reminder_lead_minutes": 30,
            "locale": "ar",
            "practice_name": "Cabinet Berrada",
            "practice_address": "12 rue des FAR",
            "practice_phone": "0522000000",
            "session_timeout_minutes": 60,
            "drive_token": {"access_token": "ya29.x"}
        }"#;
        let response = send(&app, "PUT", "/api/settings", Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/api/settings", None).await;
        let stored = json_body(response).await;
        assert_eq!(stored["locale"], "ar");
        assert_eq!(stored["working_days"], serde_json::json!(["mon", "tue", "sat"]));
        assert_eq!(stored["drive_token"]["access_token"], "ya29.x");
    }

    // ── Users ───────────────────────────────────────────────

    #[tokio::test]
    async fn user_admin_routes_are_role_gated() {
        let app = test_app();

        // Issue a non-admin session
        let conn = app.core.open_db().unwrap();
        let assistant = make_user("assistant1", UserRole::Assistant);
        db::insert_user(
            &conn,
            &assistant,
            &StoredCredentials {
                password_hash: "seeded".to_string(),
                password_salt: "seeded".to_string(),
            },
        )
        .unwrap();
        let assistant_token = app.core.write_sessions().unwrap().issue(&assistant);

        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/users", Some(&assistant_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The admin sees both accounts
        let response = send(&app, "GET", "/api/users", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn last_admin_cannot_be_deleted() {
        let app = test_app();

        let response = send(&app, "GET", "/api/users", None).await;
        let json = json_body(response).await;
        let admin_id = json[0]["id"].as_str().unwrap().to_string();

        let response = send(&app, "DELETE", &format!("/api/users/{admin_id}"), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

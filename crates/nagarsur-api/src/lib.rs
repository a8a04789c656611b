pub mod auth;
pub mod database;
pub mod middleware;
pub mod rules;

use axum::{Router, middleware as axum_middleware, routing::{get, post}};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Auth endpoints plus the authenticated `/db` surface over the directory store.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/db/{*path}",
            get(database::get_node)
                .put(database::set_node)
                .patch(database::update_node)
                .post(database::push_node)
                .delete(database::remove_node),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use nagarsur_db::Database;
    use nagarsur_types::PlatformEvent;

    use crate::auth::AppStateInner;

    fn app(admins: &[&str]) -> (Router, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let admin_users: HashSet<String> = admins.iter().map(|s| s.to_string()).collect();
        let state = Arc::new(AppStateInner::new(db.clone(), "test-secret".into(), admin_users));
        (router(state), db)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, username: &str) -> (String, String) {
        let (status, body) = send(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": username, "password": "correct horse", "display_name": "Asha"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn register_publishes_account_event() {
        let (app, db) = app(&[]);
        let mut events = db.subscribe();

        let (uid, _) = register(&app, "asha").await;

        match events.recv().await.unwrap() {
            PlatformEvent::AccountCreated(record) => {
                assert_eq!(record.uid, uid);
                assert_eq!(record.display_name.as_deref(), Some("Asha"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let (app, _db) = app(&[]);
        let (short, _) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": "ab", "password": "correct horse"})),
        )
        .await;
        assert_eq!(short, StatusCode::BAD_REQUEST);

        register(&app, "asha").await;
        let (dup, _) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": "asha", "password": "another one"})),
        )
        .await;
        assert_eq!(dup, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (app, _db) = app(&[]);
        let (uid, _) = register(&app, "asha").await;

        let (ok, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "correct horse"})),
        )
        .await;
        assert_eq!(ok, StatusCode::OK);
        assert_eq!(body["user_id"], uid);

        let (bad, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "wrong password"})),
        )
        .await;
        assert_eq!(bad, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn store_requires_token() {
        let (app, _db) = app(&[]);
        let (status, _) = send(&app, Method::GET, "/db/discussion", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/db/discussion", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn client_writes_its_push_token() {
        let (app, _db) = app(&[]);
        let (uid, token) = register(&app, "asha").await;

        let (missing, body) = send(&app, Method::GET, "/db/discussion/none", Some(&token), None).await;
        assert_eq!(missing, StatusCode::OK);
        assert_eq!(body, Value::Null);

        let own = format!("/db/users/{}/fcmToken", uid);
        let (put, _) = send(&app, Method::PUT, &own, Some(&token), Some(json!("device-1"))).await;
        assert_eq!(put, StatusCode::OK);

        let (_, stored) = send(&app, Method::GET, &own, Some(&token), None).await;
        assert_eq!(stored, json!("device-1"));

        let (other, _) = send(
            &app,
            Method::PUT,
            "/db/users/someone-else/fcmToken",
            Some(&token),
            Some(json!("device-2")),
        )
        .await;
        assert_eq!(other, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn push_patch_and_delete() {
        let (app, _db) = app(&[]);
        let (uid, token) = register(&app, "asha").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/db/discussion",
            Some(&token),
            Some(json!({"senderId": uid, "message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let key = body["name"].as_str().unwrap().to_string();
        assert_eq!(key.len(), 20);

        let uri = format!("/db/discussion/{}", key);
        let (patched, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({"message": "edited"}))).await;
        assert_eq!(patched, StatusCode::OK);
        let (_, stored) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(stored["message"], "edited");
        assert_eq!(stored["senderId"], uid);

        let (deleted, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(deleted, StatusCode::NO_CONTENT);
        let (_, gone) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(gone, Value::Null);
    }

    #[tokio::test]
    async fn moderation_needs_admin() {
        let (app, _db) = app(&["mod"]);
        let (_, user) = register(&app, "asha").await;
        let (_, admin) = register(&app, "mod").await;

        let (_, body) = send(
            &app,
            Method::POST,
            "/db/complaints",
            Some(&user),
            Some(json!({"user_id": "u1", "status": "pending"})),
        )
        .await;
        let uri = format!("/db/complaints/{}/status", body["name"].as_str().unwrap());

        let (denied, _) = send(&app, Method::PUT, &uri, Some(&user), Some(json!("resolved"))).await;
        assert_eq!(denied, StatusCode::FORBIDDEN);
        let (allowed, _) = send(&app, Method::PUT, &uri, Some(&admin), Some(json!("resolved"))).await;
        assert_eq!(allowed, StatusCode::OK);

        let (hidden, _) = send(&app, Method::GET, "/db/admin_notifications", Some(&user), None).await;
        assert_eq!(hidden, StatusCode::FORBIDDEN);
        let (visible, _) = send(&app, Method::GET, "/db/admin_notifications", Some(&admin), None).await;
        assert_eq!(visible, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_paths_are_rejected() {
        let (app, _db) = app(&[]);
        let (_, token) = register(&app, "asha").await;
        let (status, _) = send(&app, Method::GET, "/db/discussion/a.b", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

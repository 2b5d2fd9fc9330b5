use crate::support::{Harness, USER_JSON};
use library_client::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use library_client::session::auth::AuthService;
use library_client::session::interface::{
    CibnLoginCredentials, LoginCredentials, RegisterData, UserRole,
};
use mockito::Matcher;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn login_body(access_token: &str, refresh_token: Option<&str>) -> String {
    let user: Value = serde_json::from_str(USER_JSON).unwrap();
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user
    })
    .to_string()
}

#[tokio::test]
async fn test_login_stores_session_and_authorizes_next_request() {
    let mut h = Harness::new("/login").await;
    let login = h
        .server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({
            "email": "reader@library.org",
            "password": "Secret123!"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body("abc123", Some("r1")))
        .expect(1)
        .create_async()
        .await;
    let purchases = h
        .server
        .mock("GET", "/orders")
        .match_header("authorization", "Bearer abc123")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    let response = service
        .login(&LoginCredentials {
            email: "reader@library.org".to_string(),
            password: "Secret123!".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.access_token, "abc123");
    assert_eq!(h.stored(ACCESS_TOKEN_KEY).as_deref(), Some("abc123"));
    assert_eq!(h.stored(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    assert!(service.is_authenticated());
    assert!(service.has_role(UserRole::Subscriber));
    assert_eq!(service.stored_user().unwrap().email, "reader@library.org");

    let _: Value = h.client.get("/orders").await.unwrap();
    login.assert_async().await;
    purchases.assert_async().await;
}

#[tokio::test]
async fn test_login_without_refresh_token_keeps_previous_one() {
    let mut h = Harness::new("/login").await.with_session(None, Some("old"));
    let _login = h
        .server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(login_body("abc123", None))
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    service
        .login(&LoginCredentials {
            email: "reader@library.org".to_string(),
            password: "Secret123!".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(h.stored(REFRESH_TOKEN_KEY).as_deref(), Some("old"));
}

#[tokio::test]
async fn test_bad_credentials_do_not_refresh() {
    let mut h = Harness::new("/login").await.with_session(None, Some("r1"));
    let _login = h
        .server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"detail": "Incorrect email or password"}"#)
        .create_async()
        .await;
    let refresh = h
        .server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    let error = service
        .login(&LoginCredentials {
            email: "reader@library.org".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(401));
    assert!(!service.is_authenticated());
    assert_eq!(h.drain_logout_events(), 1);
    assert!(h.navigator.history().is_empty());
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_cibn_login() {
    let mut h = Harness::new("/login/cibn").await;
    let login = h
        .server
        .mock("POST", "/auth/cibn-login")
        .match_body(Matcher::Json(json!({
            "cibn_employee_id": "CIBN-0042",
            "password": "Secret123!"
        })))
        .with_status(200)
        .with_body(login_body("cibn-token", Some("cibn-refresh")))
        .expect(1)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    service
        .cibn_login(&CibnLoginCredentials {
            cibn_employee_id: "CIBN-0042".to_string(),
            password: "Secret123!".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(h.stored(ACCESS_TOKEN_KEY).as_deref(), Some("cibn-token"));
    login.assert_async().await;
}

#[tokio::test]
async fn test_register_returns_user_without_signing_in() {
    let mut h = Harness::new("/register").await;
    let user: Value = serde_json::from_str(USER_JSON).unwrap();
    let _register = h
        .server
        .mock("POST", "/auth/register")
        .match_body(Matcher::PartialJson(json!({
            "email": "reader@library.org",
            "full_name": "Avid Reader",
            "role": "subscriber"
        })))
        .with_status(201)
        .with_body(json!({ "user": user }).to_string())
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    let created = service
        .register(&RegisterData {
            email: "reader@library.org".to_string(),
            password: "Secret123!".to_string(),
            full_name: "Avid Reader".to_string(),
            phone: None,
            role: Some(UserRole::Subscriber),
            cibn_employee_id: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id, 42);
    assert!(!service.is_authenticated());
}

#[tokio::test]
async fn test_current_user_updates_stored_record() {
    let mut h = Harness::new("/profile")
        .await
        .with_session(Some("abc123"), Some("r1"));
    let _me = h
        .server
        .mock("GET", "/auth/me")
        .match_header("authorization", "Bearer abc123")
        .with_status(200)
        .with_body(
            json!({
                "id": 42,
                "email": "reader@library.org",
                "full_name": "Avid Reader",
                "role": "admin",
                "is_active": true,
                "is_verified": true,
                "created_at": "2024-05-01T08:30:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    assert!(service.has_role(UserRole::Subscriber));

    let user = service.current_user().await.unwrap();

    assert_eq!(user.role, UserRole::Admin);
    assert!(service.has_role(UserRole::Admin));
    let stored: Value = serde_json::from_str(&h.stored(USER_KEY).unwrap()).unwrap();
    assert_eq!(stored["role"], "admin");
}

#[tokio::test]
async fn test_logout_clears_session_even_when_backend_fails() {
    let mut h = Harness::new("/account")
        .await
        .with_session(Some("abc123"), Some("r1"));
    let logout = h
        .server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer abc123")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    service.logout().await.unwrap();

    assert!(h.session_is_empty());
    assert_eq!(h.drain_logout_events(), 1);
    logout.assert_async().await;
}

#[tokio::test]
async fn test_password_reset_flow() {
    let mut h = Harness::new("/forgot-password").await;
    let forgot = h
        .server
        .mock("POST", "/auth/forgot-password")
        .match_body(Matcher::Json(json!({"email": "reader@library.org"})))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    let reset = h
        .server
        .mock("POST", "/auth/reset-password")
        .match_body(Matcher::Json(json!({
            "token": "reset-token",
            "new_password": "N3wSecret!"
        })))
        .with_status(200)
        .with_body(r#"{"message": "Password updated"}"#)
        .expect(1)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    service.forgot_password("reader@library.org").await.unwrap();
    service
        .reset_password("reset-token", "N3wSecret!")
        .await
        .unwrap();

    forgot.assert_async().await;
    reset.assert_async().await;
}

#[tokio::test]
async fn test_session_snapshot() {
    let h = Harness::new("/")
        .await
        .with_session(Some("abc123"), Some("r1"));
    let service = AuthService::new(h.client.clone());

    let session = service.session().unwrap().unwrap();

    assert_eq!(session.access_token, "abc123");
    assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    assert_eq!(session.user.unwrap().id, 42);
    assert_eq!(service.refresh_token_value().as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_logout_with_expired_token_publishes_once_without_redirect() {
    let mut h = Harness::new("/account")
        .await
        .with_session(Some("expired"), Some("r1"));
    let logout = h
        .server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = h
        .server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let service = AuthService::new(h.client.clone());
    service.logout().await.unwrap();

    assert!(h.session_is_empty());
    assert_eq!(h.drain_logout_events(), 1);
    assert!(h.navigator.history().is_empty());
    logout.assert_async().await;
    refresh.assert_async().await;
}

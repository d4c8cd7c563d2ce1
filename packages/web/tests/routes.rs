use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use async_trait::async_trait;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{MemoryStore as SessionStore, SessionManagerLayer};

use api::auth::{ExternalIdentity, IdentityVerifier};
use api::{ApiError, ApiResult, AppContext, Settings};
use store::MemoryStore;

const FORM: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

fn app() -> Router {
    let ctx = AppContext::new(Arc::new(MemoryStore::new()), Settings::default());
    web::router(ctx).layer(SessionManagerLayer::new(SessionStore::default()).with_secure(false))
}

/// Accepts any code except `bad`; the code doubles as the subject.
struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    fn provider(&self) -> &str {
        "stub"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://id.example.org/authorize?state={state}")
    }

    async fn verify(&self, code: &str) -> ApiResult<ExternalIdentity> {
        if code == "bad" {
            return Err(ApiError::Unauthenticated);
        }
        Ok(ExternalIdentity {
            provider: "stub".into(),
            subject: code.into(),
            email: format!("{code}@id.example.org"),
            name: "Ext".into(),
        })
    }
}

fn app_with_verifier() -> Router {
    let ctx = AppContext::new(Arc::new(MemoryStore::new()), Settings::default())
        .with_verifier(Arc::new(StubVerifier));
    web::router(ctx).layer(SessionManagerLayer::new(SessionStore::default()).with_secure(false))
}

fn state_param(url: &str) -> String {
    url.split("state=").nth(1).unwrap().to_string()
}

/// Starts an external sign-in, returning the session cookie and the state.
async fn start_external_sign_in(app: &Router) -> (String, String) {
    let response = send(app, "GET", "/auth/oidc/login", None, None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://id.example.org/authorize"));
    let state = state_param(location);
    (session_cookie(&response), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<(&str, String)>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some((content_type, body)) => request
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

fn session_cookie(response: &Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers the first admin and returns their session cookie.
async fn bootstrap(app: &Router) -> String {
    let response = send(
        app,
        "PUT",
        "/admin/register",
        None,
        Some((FORM, "email=root@example.org&name=Root&password=rootpw".into())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie(&response)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = send(
        app,
        "POST",
        "/auth",
        None,
        Some((FORM, format!("email={email}&password={password}"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

/// Creates a user in a new group, returning the user's id.
async fn create_user_in_new_group(app: &Router, admin: &str, email: &str) -> i64 {
    let response = send(
        app,
        "PUT",
        "/admin/users/create",
        Some(admin),
        Some((
            FORM,
            format!("email={email}&name=Other&password=otherpw&userCreationType=newGroup"),
        )),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json(response).await["id"].as_i64().unwrap()
}

async fn create_list(app: &Router, cookie: &str, name: &str) -> i64 {
    let response = send(
        app,
        "PUT",
        "/list",
        Some(cookie),
        Some((FORM, format!("name={name}"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_unauthenticated_pages_redirect_and_api_rejects() {
    let app = app();

    let page = send(&app, "GET", "/list", None, None).await;
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
    assert_eq!(page.headers()[header::LOCATION], "/auth");

    let api = send(&app, "PUT", "/list", None, Some((FORM, "name=x".into()))).await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);

    let public = send(&app, "GET", "/admin/register", None, None).await;
    assert_eq!(public.status(), StatusCode::OK);
    assert_eq!(json(public).await["registrationOpen"], true);
}

#[tokio::test]
async fn test_registration_closes_after_first_admin() {
    let app = app();
    bootstrap(&app).await;

    let again = send(
        &app,
        "PUT",
        "/admin/register",
        None,
        Some((FORM, "email=late@example.org&name=Late&password=pw".into())),
    )
    .await;
    assert_eq!(again.status(), StatusCode::FORBIDDEN);

    let wrong = send(
        &app,
        "POST",
        "/auth",
        None,
        Some((FORM, "email=root@example.org&password=nope".into())),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_access_is_scoped_to_owner() {
    let app = app();
    let root = bootstrap(&app).await;
    create_user_in_new_group(&app, &root, "other@example.org").await;
    let other = login(&app, "other@example.org", "otherpw").await;

    let list_id = create_list(&app, &root, "Groceries").await;
    let uri = format!("/list/{list_id}");

    let mine = send(&app, "GET", &uri, Some(&root), None).await;
    assert_eq!(mine.status(), StatusCode::OK);
    let detail = json(mine).await;
    assert_eq!(detail["canEdit"], true);
    assert_eq!(detail["list"]["name"], "Groceries");

    let theirs = send(&app, "GET", &uri, Some(&other), None).await;
    assert_eq!(theirs.status(), StatusCode::FORBIDDEN);

    let missing = send(&app, "GET", "/list/9999", Some(&root), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed = send(&app, "GET", "/list/abc", Some(&root), None).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_list_requires_matching_name() {
    let app = app();
    let root = bootstrap(&app).await;
    let list_id = create_list(&app, &root, "Books").await;
    let uri = format!("/list/{list_id}");

    let wrong = send(&app, "DELETE", &uri, Some(&root), Some((JSON, "\"Boks\"".into()))).await;
    assert_eq!(wrong.status(), StatusCode::CONFLICT);
    let still_there = send(&app, "GET", &uri, Some(&root), None).await;
    assert_eq!(still_there.status(), StatusCode::OK);

    let right = send(&app, "DELETE", &uri, Some(&root), Some((JSON, "\"Books\"".into()))).await;
    assert_eq!(right.status(), StatusCode::NO_CONTENT);
    let gone = send(&app, "GET", &uri, Some(&root), None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_published_list_is_public() {
    let app = app();
    let root = bootstrap(&app).await;
    let list_id = create_list(&app, &root, "Wishlist").await;

    let item = send(
        &app,
        "PUT",
        &format!("/list/{list_id}/item"),
        Some(&root),
        Some((JSON, r#"{"name":"Kite"}"#.into())),
    )
    .await;
    assert_eq!(item.status(), StatusCode::CREATED);

    let share_uri = format!("/list/{list_id}/share");
    let published = send(&app, "PUT", &share_uri, Some(&root), None).await;
    assert_eq!(published.status(), StatusCode::OK);
    let code = json(published).await["shareCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let again = send(&app, "PUT", &share_uri, Some(&root), None).await;
    assert_eq!(json(again).await["shareCode"], code.as_str());

    let view = send(&app, "GET", &format!("/shared-list/{code}"), None, None).await;
    assert_eq!(view.status(), StatusCode::OK);
    let view = json(view).await;
    assert_eq!(view["name"], "Wishlist");
    assert_eq!(view["items"][0]["name"], "Kite");

    let unpublished = send(&app, "DELETE", &share_uri, Some(&root), None).await;
    assert_eq!(unpublished.status(), StatusCode::NO_CONTENT);
    let missing = send(&app, "GET", &format!("/shared-list/{code}"), None, None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body = json(missing).await;
    assert_eq!(body["error"], "shared list not found");
    assert_eq!(body["code"], code.as_str());
}

#[tokio::test]
async fn test_adding_list_to_published_collection_publishes_it() {
    let app = app();
    let root = bootstrap(&app).await;
    let list_id = create_list(&app, &root, "Board games").await;

    let created = send(
        &app,
        "POST",
        "/collections",
        Some(&root),
        Some((FORM, "name=Games".into())),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let collection_id = json(created).await["id"].as_i64().unwrap();

    let published = send(
        &app,
        "PUT",
        &format!("/collections/{collection_id}/share"),
        Some(&root),
        None,
    )
    .await;
    let collection_code = json(published).await["shareCode"]
        .as_str()
        .unwrap()
        .to_string();

    let added = send(
        &app,
        "PUT",
        &format!("/collections/{collection_id}/lists/{list_id}"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(added.status(), StatusCode::NO_CONTENT);

    let view = send(
        &app,
        "GET",
        &format!("/shared-collection/{collection_code}"),
        None,
        None,
    )
    .await;
    let view = json(view).await;
    let list_code = view["lists"][0]["shareCode"].as_str().unwrap().to_string();
    assert_ne!(list_code, collection_code);

    let nested = send(
        &app,
        "GET",
        &format!("/shared-collection/{collection_code}/shared-list/{list_code}"),
        None,
        None,
    )
    .await;
    assert_eq!(nested.status(), StatusCode::OK);
    assert_eq!(json(nested).await["name"], "Board games");
}

#[tokio::test]
async fn test_foreign_list_cannot_join_collection() {
    let app = app();
    let root = bootstrap(&app).await;
    create_user_in_new_group(&app, &root, "other@example.org").await;
    let other = login(&app, "other@example.org", "otherpw").await;

    let foreign_list = create_list(&app, &other, "Private").await;
    let created = send(
        &app,
        "POST",
        "/collections",
        Some(&root),
        Some((FORM, "name=Mine".into())),
    )
    .await;
    let collection_id = json(created).await["id"].as_i64().unwrap();

    let refused = send(
        &app,
        "PUT",
        &format!("/collections/{collection_id}/lists/{foreign_list}"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let bulk = send(
        &app,
        "POST",
        &format!("/collections/{collection_id}/lists"),
        Some(&root),
        Some((FORM, format!("listIds={foreign_list}&listIds=oops"))),
    )
    .await;
    assert_eq!(bulk.status(), StatusCode::OK);
    assert_eq!(json(bulk).await["added"], 0);
}

#[tokio::test]
async fn test_admin_routes_respect_roles() {
    let app = app();
    let root = bootstrap(&app).await;
    let other_id = create_user_in_new_group(&app, &root, "other@example.org").await;
    let other = login(&app, "other@example.org", "otherpw").await;

    // A fresh-group user is its group's admin, but not an instance admin
    let users = send(&app, "GET", "/admin/users", Some(&other), None).await;
    assert_eq!(users.status(), StatusCode::OK);
    let all = send(&app, "GET", "/admin/allusers", Some(&other), None).await;
    assert_eq!(all.status(), StatusCode::FORBIDDEN);

    let toggled = send(
        &app,
        "POST",
        &format!("/admin/user/{other_id}/toggleadmin"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(toggled.status(), StatusCode::OK);
    assert_eq!(json(toggled).await["admin"], false);

    let now_plain = send(&app, "GET", "/admin/users", Some(&other), None).await;
    assert_eq!(now_plain.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_session_is_signed_out() {
    let app = app();
    let root = bootstrap(&app).await;
    let other_id = create_user_in_new_group(&app, &root, "other@example.org").await;
    let other = login(&app, "other@example.org", "otherpw").await;

    let deleted = send(
        &app,
        "DELETE",
        &format!("/admin/user/{other_id}"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let api = send(&app, "GET", "/list/groupshared", Some(&other), None).await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    let page = send(&app, "GET", "/list", Some(&other), None).await;
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = app();
    let root = bootstrap(&app).await;

    let logout = send(&app, "DELETE", "/auth", Some(&root), None).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = send(&app, "GET", "/list/groupshared", Some(&root), None).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = app();
    let request = Request::builder()
        .method("GET")
        .uri("/admin/register")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_external_sign_in_disabled_without_provider() {
    let app = app();
    let status = send(&app, "GET", "/auth/oidc/status", None, None).await;
    assert_eq!(json(status).await["enabled"], false);

    let login = send(&app, "GET", "/auth/oidc/login", None, None).await;
    assert_eq!(login.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_external_sign_in_round_trip() {
    let app = app_with_verifier();
    let status = send(&app, "GET", "/auth/oidc/status", None, None).await;
    let status = json(status).await;
    assert_eq!(status["enabled"], true);
    assert_eq!(status["provider"], "stub");

    // A forged state is refused
    let (cookie, _) = start_external_sign_in(&app).await;
    let forged = send(
        &app,
        "GET",
        "/auth/oidc/callback?state=forged&code=sub-1",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(forged.status(), StatusCode::BAD_REQUEST);

    // No sign-in was started in this session
    let stray = send(&app, "GET", "/auth/oidc/callback?state=x&code=sub-1", None, None).await;
    assert_eq!(stray.status(), StatusCode::BAD_REQUEST);

    // Provider-side failure goes back to the login page
    let (cookie, state) = start_external_sign_in(&app).await;
    let denied = send(
        &app,
        "GET",
        &format!("/auth/oidc/callback?state={state}&error=access_denied"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(denied.status(), StatusCode::SEE_OTHER);
    assert_eq!(denied.headers()[header::LOCATION], "/auth?error=oidc_failed");

    let (cookie, state) = start_external_sign_in(&app).await;
    let done = send(
        &app,
        "GET",
        &format!("/auth/oidc/callback?state={state}&code=sub-1"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(done.status(), StatusCode::SEE_OTHER);
    assert_eq!(done.headers()[header::LOCATION], "/list");
    let signed_in = session_cookie(&done);

    // The new account admins its own fresh group
    let dashboard = send(&app, "GET", "/list", Some(&signed_in), None).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let users = send(&app, "GET", "/admin/users", Some(&signed_in), None).await;
    assert_eq!(users.status(), StatusCode::OK);
    assert_eq!(json(users).await[0]["email"], "sub-1@id.example.org");
}

#[tokio::test]
async fn test_link_and_unlink_external_identity() {
    let app = app_with_verifier();
    let root = bootstrap(&app).await;

    let anonymous = send(&app, "POST", "/auth/oidc/link", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let started = send(&app, "POST", "/auth/oidc/link", Some(&root), None).await;
    assert_eq!(started.status(), StatusCode::OK);
    let state = state_param(json(started).await["url"].as_str().unwrap());
    let linked = send(
        &app,
        "GET",
        &format!("/auth/oidc/callback?state={state}&code=sub-9"),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(linked.status(), StatusCode::SEE_OTHER);
    assert_eq!(linked.headers()[header::LOCATION], "/list");

    let again = send(&app, "POST", "/auth/oidc/link", Some(&root), None).await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    // Signing in with the linked identity reaches the same instance admin
    let (cookie, state) = start_external_sign_in(&app).await;
    let done = send(
        &app,
        "GET",
        &format!("/auth/oidc/callback?state={state}&code=sub-9"),
        Some(&cookie),
        None,
    )
    .await;
    let external = session_cookie(&done);
    let all = send(&app, "GET", "/admin/allusers", Some(&external), None).await;
    assert_eq!(all.status(), StatusCode::OK);
    assert_eq!(json(all).await.as_array().unwrap().len(), 1);

    let unlinked = send(&app, "POST", "/auth/oidc/unlink", Some(&root), None).await;
    assert_eq!(unlinked.status(), StatusCode::NO_CONTENT);
    let relink = send(&app, "POST", "/auth/oidc/link", Some(&root), None).await;
    assert_eq!(relink.status(), StatusCode::OK);
}

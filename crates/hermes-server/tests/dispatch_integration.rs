//! End-to-end dispatch tests through the in-memory test client.

use hermes_core::{Error, Principal};
use hermes_extract::{Auth, FieldViolation, NoBody, Query, Validate, Violations};
use hermes_server::{Controller, Dispatcher, Response, Route};
use hermes_test::TestClient;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LINK: &str = "application/test1.link+json";
const TEST1: &str = "application/test1+json";

#[derive(Debug, Deserialize)]
struct Signup {
    #[serde(rename = "Name")]
    name: String,
    #[serde(default)]
    age: u32,
}

impl Validate for Signup {
    fn validate(&self) -> Vec<FieldViolation> {
        let mut v = Violations::new("Signup");
        v.required("Name", !self.name.is_empty());
        v.max("age", self.age, 150);
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
struct Search {
    ids: Vec<u32>,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct Found {
    ids: Vec<u32>,
    limit: u32,
}

fn client(calls: &Arc<AtomicUsize>) -> TestClient {
    let signup_calls = Arc::clone(calls);
    let dispatcher = Dispatcher::builder()
        .route(Route::post("/signup").body::<Signup>().handle(
            move |_ctx, body: Signup, (): ()| {
                let calls = Arc::clone(&signup_calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(Response::created(json!({ "name": body.name })))
                }
            },
        ))
        .route(
            Route::get("/links")
                .public()
                .produces(TEST1)
                .default_handler()
                .handle(|_ctx, _body: NoBody, (): ()| async move {
                    Ok::<_, Error>(Response::ok("default"))
                }),
        )
        .route(
            Route::get("/links")
                .public()
                .produces(LINK)
                .handle(|_ctx, _body: NoBody, (): ()| async move {
                    Ok::<_, Error>(Response::ok("link"))
                }),
        )
        .route(
            Route::post("/links")
                .public()
                .consumes(LINK)
                .produces(LINK)
                .body::<Value>()
                .handle(|_ctx, body: Value, (): ()| async move {
                    Ok::<_, Error>(Response::ok(json!({ "echo": body })))
                }),
        )
        .route(
            Route::get("/search")
                .public()
                .arg::<Query<Search>>()
                .handle(|_ctx, _body: NoBody, (q,): (Query<Search>,)| async move {
                    let Search { ids, limit } = q.into_inner();
                    Ok::<_, Error>(Response::ok(Found { ids, limit }))
                }),
        )
        .route(
            Route::post("/shout")
                .public()
                .consumes("text/plain")
                .produces("text/plain")
                .body::<String>()
                .handle(|_ctx, body: String, (): ()| async move {
                    Ok::<_, Error>(Response::ok(body.to_uppercase()))
                }),
        )
        .route(
            Route::get("/crash")
                .public()
                .handle(|_ctx, _body: NoBody, (): ()| async move {
                    let secret: Option<u8> = None;
                    let value = secret.expect("token=hunter2");
                    Ok::<_, Error>(Response::ok(value))
                }),
        )
        .controller(
            Controller::new("/admin")
                .require_scope("admin")
                .route(Route::get("/whoami").arg::<Auth>().handle(
                    |_ctx, _body: NoBody, (auth,): (Auth,)| async move {
                        Ok::<_, Error>(Response::ok(auth.subject.clone()))
                    },
                )),
        )
        .build()
        .unwrap();
    TestClient::new(dispatcher)
}

fn user() -> Principal {
    Principal::new("ada")
}

#[tokio::test]
async fn test_missing_principal_never_invokes_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = client(&calls)
        .post("/signup")
        .json(&json!({ "Name": "ada" }))
        .send()
        .await;

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_json_field("errors.0.code", &json!("invalid_credentials"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_required_field() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = client(&calls)
        .post("/signup")
        .principal(user())
        .json(&json!({ "age": 30 }))
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("errors.0.code", &json!("validation_failed"))
        .assert_json_field("errors.0.metadata.key", &json!("Signup.Name"))
        .assert_json_field("errors.0.metadata.field", &json!("Name"))
        .assert_json_field("errors.0.metadata.tag", &json!("required"));
    let body = response.json_value().unwrap();
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_valid_signup_is_created() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = client(&calls)
        .post("/signup")
        .principal(user())
        .json(&json!({ "Name": "ada", "age": 36 }))
        .send()
        .await;

    response
        .assert_status(StatusCode::CREATED)
        .assert_json_field("name", &json!("ada"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = client(&calls)
        .post("/signup")
        .principal(user())
        .content_type("application/json")
        .body("{not json")
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("errors.0.code", &json!("failed_to_unmarshal"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unparseable_content_type_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let response = client(&calls)
        .post("/signup")
        .principal(user())
        .content_type("garbage")
        .body(r#"{"Name":"ada"}"#)
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("errors.0.code", &json!("unsupported_media_type"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_default_produces_without_accept() {
    let response = client(&Arc::default()).get("/links").send().await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", TEST1);
    assert_eq!(response.json::<String>().unwrap(), "default");
}

#[tokio::test]
async fn test_accept_selects_alternative() {
    let response = client(&Arc::default()).get("/links").accept(LINK).send().await;

    response.assert_header("content-type", LINK);
    assert_eq!(response.json::<String>().unwrap(), "link");
}

#[tokio::test]
async fn test_super_type_fallback() {
    let response = client(&Arc::default())
        .post("/links")
        .json(&json!({ "rel": "self" }))
        .accept(LINK)
        .send()
        .await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", LINK)
        .assert_json_field("echo.rel", &json!("self"));
}

#[tokio::test]
async fn test_unacceptable_type() {
    let response = client(&Arc::default())
        .get("/links")
        .accept("text/html")
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("errors.0.code", &json!("not_acceptable"));
}

#[tokio::test]
async fn test_query_coercion() {
    let response = client(&Arc::default())
        .get("/search?ids=1&ids=2&limit=10&limit=20")
        .send()
        .await;

    response
        .assert_status(StatusCode::OK)
        .assert_json_field("ids", &json!([1, 2]))
        .assert_json_field("limit", &json!(10));
}

#[tokio::test]
async fn test_query_coercion_failure() {
    let response = client(&Arc::default())
        .get("/search?ids=one&limit=10")
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("errors.0.code", &json!("invalid_argument"));
}

#[tokio::test]
async fn test_text_plain_round() {
    let response = client(&Arc::default())
        .post("/shout")
        .content_type("text/plain")
        .accept("text/plain")
        .body("hello")
        .send()
        .await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "text/plain");
    assert_eq!(response.text().unwrap(), "HELLO");
}

#[tokio::test]
async fn test_panic_does_not_leak() {
    let response = client(&Arc::default()).get("/crash").send().await;

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json_field("errors.0.message", &json!("internal server error"));
    let text = response.text().unwrap();
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("panicked"));
}

#[tokio::test]
async fn test_controller_scope() {
    let client = client(&Arc::default());

    client
        .get("/admin/whoami")
        .principal(user())
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_json_field("errors.0.code", &json!("not_authorized"));

    let response = client
        .get("/admin/whoami")
        .principal(user().with_scope("admin"))
        .send()
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<String>().unwrap(), "ada");
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let client = client(&Arc::default());

    client
        .get("/nowhere")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    client
        .delete("/links")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "GET, POST");
}

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

const API_KEY: &str = "pwd";

async fn spawn_app(tag: &str) -> (Router, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "sheetbridge-router-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}", temp_path.display());
    let pool = sheetbridge::db::connect(&database_url)
        .await
        .expect("open temp database");

    // These routes never reach Google; the real client is just wiring.
    let google = sheetbridge::GoogleApiClient::new(None);
    let http = google.http();
    let state = sheetbridge::router::BridgeState::new(
        pool,
        Arc::new(google),
        http,
        Arc::from(API_KEY),
        "Dataset Sheet Backups".to_string(),
    );
    (sheetbridge::router::bridge_router(state), temp_path)
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json");
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    builder.body(body).expect("failed to build request")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not JSON")
}

fn volunteer_form() -> Value {
    json!({
        "title": "Volunteer Signup",
        "fields": [
            { "name": "email", "type": "email", "required": true },
            { "name": "skills", "type": "text", "required": false }
        ]
    })
}

async fn save_form(app: &Router, form_id: &str) -> String {
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/forms/{form_id}/saved"),
            Some(volunteer_form()),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    body["datasetId"]
        .as_str()
        .expect("form save returns a dataset id")
        .to_string()
}

#[tokio::test]
async fn requests_without_a_key_are_unauthorized() {
    let (app, db) = spawn_app("auth").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/integration/google")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Bearer form of the same key is accepted.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/integration/google")
                .header("authorization", format!("Bearer {API_KEY}"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn integration_status_reflects_connect() {
    let (app, db) = spawn_app("integration").await;

    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/integration/google", None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["connected"], json!(false));

    let resp = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/v1/integration/google",
            Some(json!({
                "client_id": "id",
                "client_secret": "secret",
                "refresh_token": "refresh"
            })),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/integration/google", None))
        .await
        .expect("request failed");
    assert_eq!(json_body(resp).await["connected"], json!(true));

    // Blank credentials are rejected up front.
    let resp = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/v1/integration/google",
            Some(json!({
                "client_id": " ",
                "client_secret": "secret",
                "refresh_token": "refresh"
            })),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn form_save_creates_dataset_and_is_idempotent() {
    let (app, db) = spawn_app("form-save").await;

    let first = save_form(&app, "form-1").await;
    let second = save_form(&app, "form-1").await;
    assert_eq!(first, second);

    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/forms/form-1/dataset", None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["dataset"]["id"], json!(first));
    assert_eq!(body["dataset"]["name"], json!("Volunteer Signup"));

    // A form that was never saved has no dataset, and that is not an error.
    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/forms/ghost/dataset", None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["dataset"], Value::Null);

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn submissions_flow_into_dataset_records() {
    let (app, db) = spawn_app("records").await;
    let dataset_id = save_form(&app, "form-1").await;

    for i in 0..3 {
        let resp = app
            .clone()
            .oneshot(authed(
                "POST",
                "/v1/forms/form-1/submissions",
                Some(json!({ "email": format!("u{i}@example.org"), "skills": "rust" })),
            ))
            .await
            .expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/v1/datasets/{dataset_id}/records?page_size=2"),
            None,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let page = json_body(resp).await;
    assert_eq!(page["records"].as_array().unwrap().len(), 2);
    // Newest first.
    assert_eq!(page["records"][0]["data"]["email"], json!("u2@example.org"));
    assert!(page["nextCursor"].is_i64());

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/v1/datasets/{dataset_id}/stats"),
            None,
        ))
        .await
        .expect("request failed");
    let stats = json_body(resp).await;
    assert_eq!(stats["recordCount"], json!(3));
    assert_eq!(stats["fieldCount"], json!(2));

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn deleting_a_form_with_a_dataset_requires_an_explicit_choice() {
    let (app, db) = spawn_app("delete-choice").await;
    save_form(&app, "form-1").await;

    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/v1/forms/form-1", None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn preserve_on_delete_keeps_records_but_detaches_the_form() {
    let (app, db) = spawn_app("preserve").await;
    let dataset_id = save_form(&app, "form-1").await;

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/forms/form-1/submissions",
            Some(json!({ "email": "a@example.org" })),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/forms/form-1/deletion-plan", None))
        .await
        .expect("request failed");
    let plan = json_body(resp).await;
    assert_eq!(plan["linkedDataset"]["datasetId"], json!(dataset_id));

    let resp = app
        .clone()
        .oneshot(authed(
            "DELETE",
            "/v1/forms/form-1?dataset_action=preserve",
            None,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // The dataset and its records survive the form.
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/v1/datasets/{dataset_id}/stats"),
            None,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["recordCount"], json!(1));

    // But the form link is gone.
    let resp = app
        .clone()
        .oneshot(authed("GET", "/v1/forms/form-1/dataset", None))
        .await
        .expect("request failed");
    assert_eq!(json_body(resp).await["dataset"], Value::Null);

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn hard_delete_removes_dataset_and_records() {
    let (app, db) = spawn_app("hard-delete").await;
    let dataset_id = save_form(&app, "form-1").await;

    let resp = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/v1/datasets/{dataset_id}"),
            None,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(authed("GET", &format!("/v1/datasets/{dataset_id}"), None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));

    let _ = fs::remove_file(&db);
}

#[tokio::test]
async fn publishing_an_unknown_dataset_is_not_found() {
    let (app, db) = spawn_app("publish-missing").await;

    let resp = app
        .clone()
        .oneshot(authed("POST", "/v1/datasets/ghost/publish", None))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = fs::remove_file(&db);
}

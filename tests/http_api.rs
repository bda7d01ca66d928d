//! HTTP surface driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::{to_bytes, Body},
  http::{Method, Request, StatusCode},
  Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use exomaths_backend::logic::reconcile_all;
use exomaths_backend::routes::build_router;
use exomaths_backend::state::AppState;

async fn app() -> Router {
  let state = Arc::new(AppState::from_config(None).await.unwrap());
  reconcile_all(state.clone()).await.unwrap();
  build_router(state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      req = req.header("content-type", "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

#[tokio::test]
async fn health_is_ok() {
  let app = app().await;
  let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn generate_is_deterministic_for_a_seed() {
  let app = app().await;
  let req = json!({ "exerciseId": "fractions-simplification", "difficulty": "medium", "seed": 12 });
  let (status, first) = call(&app, Method::POST, "/api/v1/exercises/generate", Some(req.clone())).await;
  assert_eq!(status, StatusCode::OK);
  let (_, second) = call(&app, Method::POST, "/api/v1/exercises/generate", Some(req)).await;
  assert_eq!(first, second);
  assert_eq!(first["difficulty"], "moyen");
  assert_eq!(first["generatorSeed"], 12);
}

#[tokio::test]
async fn unknown_difficulty_lists_accepted_labels() {
  let app = app().await;
  let req = json!({ "exerciseId": "addition-entiers", "difficulty": "bof" });
  let (status, body) = call(&app, Method::POST, "/api/v1/exercises/generate", Some(req)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "unknown_difficulty");
  assert_eq!(body["detail"]["label"], "bof");
  assert!(body["detail"]["accepted"].as_array().unwrap().contains(&json!("facile")));
}

#[tokio::test]
async fn fixed_variant_not_found_lists_available_ids() {
  let app = app().await;
  let req = json!({ "exerciseId": "addition-entiers", "mode": "fixed", "variantId": "v9" });
  let (status, body) = call(&app, Method::POST, "/api/v1/exercises/generate", Some(req)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "variant_not_found");
  assert_eq!(body["detail"]["available"], json!(["calcul", "somme"]));
}

#[tokio::test]
async fn unknown_exercise_is_404() {
  let app = app().await;
  let (status, body) =
    call(&app, Method::POST, "/api/v1/exercises/generate", Some(json!({ "exerciseId": "pythagore" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "unknown_exercise");
}

#[tokio::test]
async fn template_validation_reports_every_problem() {
  let app = app().await;
  let req = json!({
    "template": { "prompt": "{{{fraction_html}}} {{absent}}", "answer": "{{autre}}" },
    "generator": "fractions_simplification"
  });
  let (status, body) = call(&app, Method::POST, "/api/v1/templates/validate", Some(req)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["valid"], false);
  assert_eq!(body["report"]["missing"], json!(["absent", "autre"]));
  assert_eq!(body["report"]["html_violations"][0]["placeholder"], "fraction_html");
}

#[tokio::test]
async fn source_writes_flow_into_the_catalog() {
  let app = app().await;

  let (status, body) = call(&app, Method::GET, "/api/v1/catalog/4e-equations", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["entries"].as_array().unwrap().len(), 1);
  assert_eq!(body["entries"][0]["difficulties"], json!(["moyen"]));

  let put = json!({ "topic": "4e-equations", "generator": "equation_premier_degre", "difficulty": "difficile", "tier": "premium", "dynamic": true });
  let (status, body) = call(&app, Method::PUT, "/api/v1/sources/eq-2", Some(put)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["topics"][0]["report"]["updated"], 1);

  let (_, body) = call(&app, Method::GET, "/api/v1/catalog/4e-equations", None).await;
  assert_eq!(body["entries"][0]["difficulties"], json!(["moyen", "difficile"]));

  let (status, _) = call(&app, Method::DELETE, "/api/v1/sources/eq-2", None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, body) = call(&app, Method::DELETE, "/api/v1/sources/eq-2", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "unknown_source");

  let (status, body) = call(&app, Method::POST, "/api/v1/catalog/reconcile", None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["topics"].as_array().unwrap().iter().all(|t| t["plan"]["actions"] == json!([])));
}

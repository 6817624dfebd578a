use crate::auth::IdentityVerifier;
use crate::ingest::{Outcome, Pipeline};
use crate::transport::ApiError;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    verifier: Arc<IdentityVerifier>,
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(verifier: IdentityVerifier, pipeline: Pipeline) -> Self {
        AppState {
            verifier: Arc::new(verifier),
            pipeline: Arc::new(pipeline),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct IngestResponse {
    status: &'static str,
}

impl From<Outcome> for IngestResponse {
    fn from(outcome: Outcome) -> Self {
        let status = match outcome {
            Outcome::Accepted => "ok",
            Outcome::Duplicate => "duplicate",
        };
        IngestResponse { status }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/ingest/location", post(ingest_location))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ingest_location(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let driver_id = state.verifier.verify(authorization)?;

    let outcome = state.pipeline.process(&driver_id, &body).await?;
    Ok((StatusCode::ACCEPTED, Json(IngestResponse::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use crate::auth::bearer_for;
    use crate::ingest::RateLimiter;
    use crate::store::{FlakyStore, MemoryStore, Operation, Store};
    use axum::body::to_bytes;
    use axum::http::header::CONTENT_TYPE;
    use axum::response::{IntoResponse, Response};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use test_log::test;
    use tokio::net::TcpListener;

    const SCENARIO_BODY: &str = r#"{"seq": 1, "lat": 10.0, "lng": 20.0, "accuracy_m": 15.0}"#;

    fn state_with(store: Arc<dyn Store>) -> AppState {
        let config = AppConfigBuilder::new().build();
        AppState::new(IdentityVerifier::new(config.auth().jwt_secret()), Pipeline::new(store, &config))
    }

    fn authorized(driver_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_for(driver_id).parse().unwrap());
        headers
    }

    async fn call(state: AppState, headers: HeaderMap, body: &str) -> (StatusCode, String) {
        let response = ingest_location(State(state), headers, Bytes::from(body.to_string())).await.into_response();
        into_parts(response).await
    }

    async fn into_parts(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test(tokio::test)]
    async fn accepts_a_new_point() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(store.clone());

        let response = ingest_location(State(state), authorized("d1"), Bytes::from(SCENARIO_BODY)).await.into_response();

        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(into_parts(response).await, (StatusCode::ACCEPTED, r#"{"status":"ok"}"#.to_string()));
        assert_eq!(store.position("drivers:last", "d1").await, Some((10.0, 20.0)));
    }

    #[test(tokio::test)]
    async fn answers_a_replay_with_duplicate() {
        let state = state_with(Arc::new(MemoryStore::new()));
        call(state.clone(), authorized("d1"), SCENARIO_BODY).await;

        let result = call(state, authorized("d1"), SCENARIO_BODY).await;

        assert_eq!(result, (StatusCode::ACCEPTED, r#"{"status":"duplicate"}"#.to_string()));
    }

    #[test(tokio::test)]
    async fn rejects_poor_accuracy_with_bad_request() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let body = r#"{"seq": 1, "lat": 10.0, "lng": 20.0, "accuracy_m": 100.0}"#;

        let (status, message) = call(state, authorized("d1"), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.starts_with("invalid payload: poor accuracy"), "unexpected message '{}'", message);
    }

    #[test(tokio::test)]
    async fn rejects_malformed_json_with_bad_request() {
        let state = state_with(Arc::new(MemoryStore::new()));

        let (status, message) = call(state, authorized("d1"), "{").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.starts_with("bad json"));
    }

    #[test(tokio::test)]
    async fn rejects_a_missing_token_with_unauthorized() {
        let state = state_with(Arc::new(MemoryStore::new()));

        let result = call(state, HeaderMap::new(), SCENARIO_BODY).await;

        assert_eq!(result, (StatusCode::UNAUTHORIZED, "missing bearer token".to_string()));
    }

    #[test(tokio::test)]
    async fn rejects_an_invalid_token_with_unauthorized() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());

        let result = call(state, headers, SCENARIO_BODY).await;

        assert_eq!(result, (StatusCode::UNAUTHORIZED, "invalid token".to_string()));
    }

    #[test(tokio::test)]
    async fn rejects_the_seventh_request_with_too_many_requests() {
        fn fixed_second() -> DateTime<Utc> {
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        }

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = AppConfigBuilder::new().rate_limit(2, 4).build();
        let pipeline = Pipeline::new(store.clone(), &config).with_rate_limiter(RateLimiter::new(store, 2, 4).with_clock(fixed_second));
        let state = AppState::new(IdentityVerifier::new(config.auth().jwt_secret()), pipeline);

        for seq in 0..6 {
            let body = format!(r#"{{"seq": {}, "lat": 10.0, "lng": 20.0, "accuracy_m": 15.0}}"#, seq);
            let (status, _) = call(state.clone(), authorized("d1"), &body).await;
            assert_eq!(status, StatusCode::ACCEPTED);
        }

        let result = call(state, authorized("d1"), SCENARIO_BODY).await;
        assert_eq!(result, (StatusCode::TOO_MANY_REQUESTS, "rate limit".to_string()));
    }

    #[test(tokio::test)]
    async fn reports_store_failures_as_internal_server_error() {
        let state = state_with(Arc::new(FlakyStore::new().failing(Operation::Publish)));

        let result = call(state, authorized("d1"), SCENARIO_BODY).await;

        assert_eq!(result, (StatusCode::INTERNAL_SERVER_ERROR, "publish error".to_string()));
    }

    async fn spawn_server(state: AppState, max_body_bytes: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state, max_body_bytes)).await.unwrap();
        });
        format!("http://{}", address)
    }

    #[test(tokio::test)]
    async fn serves_ingest_and_health_over_http() -> Result<(), reqwest::Error> {
        let url = spawn_server(state_with(Arc::new(MemoryStore::new())), 4096).await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/healthz", url)).send().await?;
        assert_eq!(health.status(), reqwest::StatusCode::OK);
        assert_eq!(health.text().await?, "ok");

        let response = client
            .post(format!("{}/ingest/location", url))
            .header("Authorization", bearer_for("d1"))
            .header("Content-Type", "application/json")
            .body(SCENARIO_BODY)
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        assert_eq!(response.json::<serde_json::Value>().await?, serde_json::json!({ "status": "ok" }));

        Ok(())
    }

    #[test(tokio::test)]
    async fn refuses_other_methods_and_oversized_bodies() -> Result<(), reqwest::Error> {
        let url = spawn_server(state_with(Arc::new(MemoryStore::new())), 64).await;
        let client = reqwest::Client::new();

        let wrong_method = client.get(format!("{}/ingest/location", url)).send().await?;
        assert_eq!(wrong_method.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

        let oversized = client
            .post(format!("{}/ingest/location", url))
            .header("Authorization", bearer_for("d1"))
            .body(format!(r#"{{"source": "{}"}}"#, "x".repeat(128)))
            .send()
            .await?;
        assert_eq!(oversized.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);

        Ok(())
    }

    #[test]
    fn maps_outcomes_to_statuses() {
        assert_eq!(IngestResponse::from(Outcome::Accepted), IngestResponse { status: "ok" });
        assert_eq!(IngestResponse::from(Outcome::Duplicate), IngestResponse { status: "duplicate" });
    }
}

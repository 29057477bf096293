use inbox_insights::routes::health::HealthResponse;
use inbox_insights::store::EmailStore;
use inbox_insights::test_support::{InMemoryEmailRepository, TestRocketBuilder};
use rocket::http::Status;
use std::sync::Arc;

#[test]
fn health_endpoint_returns_ok_before_first_connection() {
    let (builder, _repository) = TestRocketBuilder::new().with_memory_store();
    let client = builder.blocking_client();

    let response = client.get("/api/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
    assert_eq!(payload.database, "unconnected");
}

#[test]
fn health_reflects_connection_outcome() {
    let (builder, _repository) = TestRocketBuilder::new().with_memory_store();
    let client = builder.blocking_client();
    client.get("/api/emails").dispatch();

    let payload: HealthResponse = client
        .get("/api/health")
        .dispatch()
        .into_json()
        .expect("valid JSON payload");
    assert_eq!(payload.database, "connected");

    let client = TestRocketBuilder::new()
        .manage_store(EmailStore::new(Arc::new(
            InMemoryEmailRepository::unreachable(),
        )))
        .blocking_client();
    client.get("/api/emails").dispatch();

    let payload: HealthResponse = client
        .get("/api/health")
        .dispatch()
        .into_json()
        .expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
    assert_eq!(payload.database, "failed");
}

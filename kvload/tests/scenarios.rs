//! End-to-end runs of each scenario against an in-process key-value server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use kvload::http::HttpRemote;
use kvload::{Config, Scenario, Summary, Workload};
use kvload_test::server::{RecordedRequest, TestServer};
use reqwest::Method;

async fn run_scenario(scenario: Scenario, config: &Config) -> Result<Summary> {
    kvload_test::tracing::init();

    config.validate()?;
    let remote = HttpRemote::from_config(config)?;
    let workload = Workload::new(scenario, config);
    kvload::run(Arc::new(remote), Arc::new(workload), config).await
}

fn config(server: &TestServer) -> Config {
    Config {
        base_url: server.base_url(),
        duration: Duration::from_secs(30),
        iterations: Some(200),
        vus: 4,
        ..Default::default()
    }
}

fn assert_value_shape(value: &str) {
    let suffix = value
        .strip_prefix("val-1-")
        .unwrap_or_else(|| panic!("unexpected value `{value}`"));
    assert_eq!(suffix.len(), 6, "{value}");
    assert!(
        suffix.bytes().all(|b| b.is_ascii_alphanumeric()),
        "{value}"
    );
}

#[tokio::test]
async fn single_write_to_single_key() -> Result<()> {
    let server = TestServer::new().await;
    let config = Config {
        keyspace: 1,
        vus: 1,
        iterations: Some(1),
        ..config(&server)
    };

    let summary = run_scenario(Scenario::PutOnly, &config).await?;
    assert_eq!(summary.iterations(), 1);
    assert_eq!(summary.failures(), 0);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let RecordedRequest {
        method,
        path,
        key,
        value,
    } = &requests[0];
    assert_eq!(method, Method::POST);
    assert_eq!(path, "/create");
    assert_eq!(*key, Some(1));

    let value = value.as_deref().unwrap();
    assert_value_shape(value);
    assert_eq!(server.value(1).as_deref(), Some(value));

    Ok(())
}

#[tokio::test]
async fn popular_reads_hit_hot_range() -> Result<()> {
    let server = TestServer::with_values((1..=50).map(|key| (key, format!("seed-{key}")))).await;
    let config = Config {
        hot_key_max: 50,
        ..config(&server)
    };

    let summary = run_scenario(Scenario::GetPopular, &config).await?;
    assert_eq!(summary.reads.count(), 200);
    assert_eq!(summary.creates.count(), 0);
    assert_eq!(summary.failures(), 0);

    for request in server.requests() {
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/read");
        let key = request.key.unwrap();
        assert!((1..=50).contains(&key), "{request:?}");
    }

    Ok(())
}

#[tokio::test]
async fn missing_keys_count_as_failures() -> Result<()> {
    let server = TestServer::new().await;

    let summary = run_scenario(Scenario::GetPopular, &config(&server)).await?;

    // Every read misses on an empty store. The failures are reported, not hidden.
    assert_eq!(summary.reads.count(), 200);
    assert_eq!(summary.reads.failures, 200);
    assert_eq!(server.requests().len(), 200);

    Ok(())
}

#[tokio::test]
async fn mixed_without_reads_only_writes() -> Result<()> {
    let server = TestServer::new().await;
    let config = Config {
        get_ratio: 0.0,
        put_ratio: 1.0,
        keyspace: 100,
        ..config(&server)
    };

    let summary = run_scenario(Scenario::Mixed, &config).await?;
    assert_eq!(summary.creates.count(), 200);
    assert_eq!(summary.reads.count(), 0);

    let requests = server.requests();
    assert_eq!(requests.len(), 200);
    for request in requests {
        assert_eq!(request.method, Method::POST);
        let key = request.key.unwrap();
        assert!((1..=100).contains(&key), "{request:?}");
        assert!(request.value.is_some_and(|v| v.starts_with("val-")));
    }

    Ok(())
}

#[tokio::test]
async fn mixed_without_writes_only_reads() -> Result<()> {
    let server = TestServer::new().await;
    let config = Config {
        get_ratio: 1.0,
        put_ratio: 0.0,
        ..config(&server)
    };

    let summary = run_scenario(Scenario::Mixed, &config).await?;
    assert_eq!(summary.reads.count(), 200);
    assert_eq!(summary.creates.count(), 0);
    assert!(server.requests().iter().all(|r| r.method == Method::GET));

    Ok(())
}

#[tokio::test]
async fn unreachable_service_fails_iterations() -> Result<()> {
    let server = TestServer::new().await;
    let base_url = server.base_url();
    drop(server);

    // Give the aborted listener a moment to close.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = Config {
        base_url,
        iterations: Some(3),
        vus: 1,
        timeout: Duration::from_secs(2),
        ..Default::default()
    };

    let summary = run_scenario(Scenario::PutOnly, &config).await?;
    assert_eq!(summary.creates.count(), 3);
    assert_eq!(summary.creates.failures, 3);

    Ok(())
}

#[tokio::test]
async fn server_answers_like_the_service() -> Result<()> {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/read?key=7")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(response.text().await?, "Key not found");

    let response = client
        .post(server.url("/create?key=7&value=hello"))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client.get(server.url("/read?key=7")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "hello");

    let response = client.post(server.url("/create?key=7")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client.get(server.url("/read")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    Ok(())
}

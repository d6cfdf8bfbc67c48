use std::sync::Arc;
use std::time::Duration;

use dockyard_scheduler::{
    api,
    cluster::{ConsulMembership, DockerEvictor},
    ingest::{EventIngestion, WorkloadClassifier},
    jobs::{JobQueue, JobWorker, RetryPolicy},
    registry::{DockRegistry, DEFAULT_INDEX_KEY},
    scheduler::{AdmissionQueue, HostSelector, Weights},
    state::AppState,
    store::{KvStore, MemoryStore},
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ApiFixture {
    base_url: String,
    client: reqwest::Client,
    store: Arc<MemoryStore>,
    registry: DockRegistry,
    _shutdown: watch::Sender<bool>,
}

impl ApiFixture {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn add_dock(&self, host: &str, tags: Option<&str>) {
        let resp = self
            .client
            .post(self.url("/v1/docks"))
            .json(&json!({ "host": host, "tags": tags }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    async fn set_counter(&self, host: &str, key: &str, value: i64) -> reqwest::Response {
        self.client
            .put(self.url("/v1/docks/fields"))
            .json(&json!({ "host": host, "key": key, "value": value }))
            .send()
            .await
            .unwrap()
    }

    async fn select(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/v1/hosts/optimal"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn docks(&self) -> Vec<Value> {
        let body: Value = self
            .client
            .get(self.url("/v1/docks"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["items"].as_array().cloned().unwrap_or_default()
    }
}

async fn start_api(consul_url: &str) -> ApiFixture {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dockyard_scheduler=debug".into()),
        )
        .with_test_writer()
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let registry = DockRegistry::new(store.clone(), DEFAULT_INDEX_KEY);
    let (shutdown, shutdown_rx) = watch::channel(false);

    let selector = HostSelector::new(registry.clone(), Weights::default());
    let (admission, _admission_worker) = AdmissionQueue::spawn(selector, shutdown_rx.clone());

    let http = reqwest::Client::new();
    let (jobs, job_rx) = JobQueue::channel();
    let ingestion = Arc::new(EventIngestion::new(
        registry.clone(),
        WorkloadClassifier::default(),
        Arc::new(DockerEvictor::new(http.clone())),
        Arc::new(ConsulMembership::new(http, consul_url)),
        Arc::new(jobs.clone()),
    ));
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    };
    tokio::spawn(JobWorker::new(ingestion.clone(), jobs, job_rx, policy).run(shutdown_rx));

    let app = api::create_router(AppState::new(registry.clone(), admission, ingestion));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ApiFixture {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        registry,
        _shutdown: shutdown,
    }
}

#[tokio::test]
async fn health_endpoints_report_store_state() {
    let fixture = start_api("http://127.0.0.1:9").await;

    let resp = fixture.client.get(fixture.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = fixture.client.get(fixture.url("/livez")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = fixture.client.get(fixture.url("/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["components"]["store"]["status"], "ok");

    fixture.store.set_available(false);
    let resp = fixture.client.get(fixture.url("/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["store"]["status"], "unavailable");
}

#[tokio::test]
async fn selects_least_loaded_dock_and_records_it() {
    let fixture = start_api("http://127.0.0.1:9").await;
    for (host, builds) in [
        ("http://10.0.0.1:4242", 2),
        ("http://10.0.0.2:4242", 1),
        ("http://10.0.0.3:4242", 3),
    ] {
        fixture.add_dock(host, None).await;
        let resp = fixture.set_counter(host, "numBuilds", builds).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    let resp = fixture.select(json!({ "type": "container_build" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["dockHost"], "http://10.0.0.2:4242");

    let docks = fixture.docks().await;
    let chosen = docks
        .iter()
        .find(|d| d["host"] == "http://10.0.0.2:4242")
        .unwrap();
    assert_eq!(chosen["numBuilds"], 2);
}

#[tokio::test]
async fn selection_via_query_string() {
    let fixture = start_api("http://127.0.0.1:9").await;
    fixture.add_dock("http://10.0.0.1:4242", None).await;
    fixture.add_dock("http://10.0.0.2:4242", None).await;

    let resp = fixture
        .client
        .get(fixture.url("/v1/hosts/optimal"))
        .query(&[("type", "container_run"), ("prevDock", "http://10.0.0.2:4242")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["dockHost"], "http://10.0.0.2:4242");
}

#[tokio::test]
async fn invalid_and_empty_requests_map_to_problems() {
    let fixture = start_api("http://127.0.0.1:9").await;

    let resp = fixture.select(json!({})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers()["content-type"],
        "application/problem+json"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_request");

    let resp = fixture.select(json!({ "type": "container_run" })).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "no_docks_available");
    assert_eq!(body["retryable"], true);

    fixture.add_dock("http://10.0.0.1:4242", None).await;
    fixture.store.set_available(false);
    let resp = fixture.select(json!({ "type": "container_run" })).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "store_unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_selections_are_balanced() {
    let fixture = Arc::new(start_api("http://127.0.0.1:9").await);
    for i in 1..=3 {
        fixture.add_dock(&format!("http://10.0.0.{i}:4242"), None).await;
    }

    let mut requests = Vec::new();
    for _ in 0..30 {
        let fixture = fixture.clone();
        requests.push(tokio::spawn(async move {
            fixture.select(json!({ "type": "container_run" })).await.status()
        }));
    }
    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }

    for dock in fixture.docks().await {
        assert_eq!(dock["numContainers"], 10, "unbalanced dock {dock}");
    }
}

#[tokio::test]
async fn dock_administration_round() {
    let fixture = start_api("http://127.0.0.1:9").await;
    fixture.add_dock("http://10.0.0.1:4242/", Some("build,gpu")).await;
    fixture.add_dock("http://10.0.0.2:4242", Some("run")).await;

    let body: Value = fixture
        .client
        .get(fixture.url("/v1/docks"))
        .query(&[("tag", "gpu")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["host"], "http://10.0.0.1:4242");

    let resp = fixture.set_counter("http://10.0.0.9:4242", "numBuilds", 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = fixture.set_counter("http://10.0.0.1:4242", "numCpus", 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = fixture.set_counter("10.0.0.1", "numBuilds", 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = fixture
        .client
        .delete(fixture.url("/v1/docks"))
        .query(&[("host", "http://10.0.0.1:4242")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Incomplete records show up raw but are never selectable.
    fixture
        .registry
        .store()
        .list_push(DEFAULT_INDEX_KEY, "http://10.0.0.3:4242")
        .await
        .unwrap();
    let body: Value = fixture
        .client
        .get(fixture.url("/v1/docks/raw"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(fixture.docks().await.len(), 1);
}

#[tokio::test]
async fn build_container_death_releases_slot() {
    let fixture = start_api("http://127.0.0.1:9").await;
    fixture.add_dock("http://10.0.0.1:4242", None).await;
    fixture.set_counter("http://10.0.0.1:4242", "numBuilds", 3).await;

    let resp = fixture
        .client
        .post(fixture.url("/v1/events/container.died"))
        .json(&json!({
            "ip": "10.0.0.1",
            "host": "http://10.0.0.1:4242",
            "from": "registry.runnable.com/runnable/image-builder:v4"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "completed");
    assert_eq!(fixture.docks().await[0]["numBuilds"], 2);

    let resp = fixture
        .client
        .post(fixture.url("/v1/events/container.died"))
        .json(&json!({ "host": "http://10.0.0.1:4242" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "dropped");
    assert_eq!(fixture.docks().await[0]["numBuilds"], 2);
}

#[tokio::test]
async fn store_outage_asks_publisher_to_retry() {
    let fixture = start_api("http://127.0.0.1:9").await;
    fixture.store.set_available(false);

    let resp = fixture
        .client
        .post(fixture.url("/v1/events/dock.up"))
        .json(&json!({ "host": "http://10.0.0.1:4242" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "retry");
}

#[tokio::test]
async fn unhealthy_dock_is_evicted_and_confirmed_removed() {
    let cluster = MockServer::start().await;
    let dock = cluster.uri();
    let authority = dock.trim_start_matches("http://").to_string();

    Mock::given(method("POST"))
        .and(path("/containers/swarm/kill"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&cluster)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/kv/swarm/docker/swarm/nodes/{authority}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&cluster)
        .await;

    let fixture = start_api(&dock).await;
    fixture.add_dock(&dock, None).await;

    let resp = fixture
        .client
        .post(fixture.url("/v1/events/dock.unhealthy"))
        .json(&json!({ "host": dock }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(fixture.docks().await.is_empty());

    // The follow-up wait-for-removal job runs on the worker.
    let mut checked = false;
    for _ in 0..200 {
        let requests = cluster.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path().starts_with("/v1/kv/")) {
            checked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(checked, "membership was never checked");
}

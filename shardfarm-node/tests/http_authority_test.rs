//! HTTP authority tests
//!
//! Runs the client against a local axum server with scripted status codes.
//!
//! Run with: cargo test --test http_authority_test

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use shardfarm_core::error::FarmError;
use shardfarm_core::{PayoutAddress, RetryPolicy, WalletRef};
use shardfarm_node::{Authority, HttpAuthority, ResilientClient};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PAYOUT: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

#[derive(Clone)]
struct Script {
    status: Arc<AtomicU16>,
    hits: Arc<AtomicU64>,
    last_path: Arc<Mutex<String>>,
}

impl Script {
    fn new(status: StatusCode) -> Self {
        Self {
            status: Arc::new(AtomicU16::new(status.as_u16())),
            hits: Arc::new(AtomicU64::new(0)),
            last_path: Arc::new(Mutex::new(String::new())),
        }
    }

    fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    fn last_path(&self) -> String {
        self.last_path.lock().unwrap().clone()
    }
}

async fn respond(State(script): State<Script>, uri: Uri) -> (StatusCode, &'static str) {
    script.hits.fetch_add(1, Ordering::SeqCst);
    *script.last_path.lock().unwrap() = uri.path().to_string();
    let status = StatusCode::from_u16(script.status.load(Ordering::SeqCst)).unwrap();
    (status, "")
}

async fn serve(script: Script) -> SocketAddr {
    let app = Router::new()
        .route("/api/register/:auth/:payout", get(respond))
        .route("/api/ping/:auth", get(respond))
        .route("/api/height/:auth/:height", get(respond))
        .with_state(script);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn auth_address() -> PayoutAddress {
    WalletRef::generate().auth_address()
}

async fn authority(status: StatusCode) -> (HttpAuthority, Script) {
    let script = Script::new(status);
    let addr = serve(script.clone()).await;
    let authority = HttpAuthority::new(&format!("http://{}", addr), auth_address()).unwrap();
    (authority, script)
}

#[tokio::test]
async fn test_success_paths() {
    let (authority, script) = authority(StatusCode::OK).await;
    let auth = authority.auth_address().to_string();
    let payout = PayoutAddress::parse(PAYOUT).unwrap();

    authority.register(&payout).await.unwrap();
    assert_eq!(script.last_path(), format!("/api/register/{}/{}", auth, PAYOUT));

    authority.ping().await.unwrap();
    assert_eq!(script.last_path(), format!("/api/ping/{}", auth));

    authority.report_height(25).await.unwrap();
    assert_eq!(script.last_path(), format!("/api/height/{}/25", auth));
}

#[tokio::test]
async fn test_conflict_depends_on_call() {
    let (authority, _script) = authority(StatusCode::CONFLICT).await;
    let payout = PayoutAddress::parse(PAYOUT).unwrap();

    let err = authority.register(&payout).await.unwrap_err();
    assert!(err.is_already_registered());

    // Only registration can conflict; elsewhere it is a plain rejection
    assert!(matches!(authority.ping().await, Err(FarmError::Rejected(_))));
    assert!(matches!(
        authority.report_height(1).await,
        Err(FarmError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_bad_request_depends_on_call() {
    let (authority, _script) = authority(StatusCode::BAD_REQUEST).await;
    let payout = PayoutAddress::parse(PAYOUT).unwrap();

    assert!(matches!(
        authority.register(&payout).await,
        Err(FarmError::InvalidAddress(_))
    ));
    assert!(matches!(
        authority.report_height(1).await,
        Err(FarmError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let (authority, script) = authority(StatusCode::SERVICE_UNAVAILABLE).await;
    let client = ResilientClient::new(authority, RetryPolicy::bounded(3, Duration::ZERO));

    let err = client.ping().await.unwrap_err();

    assert!(matches!(
        err,
        FarmError::ConnectionExhausted {
            operation: "ping",
            attempts: 3,
            ..
        }
    ));
    assert_eq!(script.hits(), 3);
}

#[tokio::test]
async fn test_unknown_farmer_not_retried() {
    let (authority, script) = authority(StatusCode::NOT_FOUND).await;
    let client = ResilientClient::new(authority, RetryPolicy::bounded(3, Duration::ZERO));

    let err = client.report_height(4).await.unwrap_err();

    assert!(matches!(err, FarmError::Rejected(_)));
    assert_eq!(script.hits(), 1);
}

#[tokio::test]
async fn test_recovers_when_server_returns() {
    let (authority, script) = authority(StatusCode::INTERNAL_SERVER_ERROR).await;
    let client = ResilientClient::new(authority, RetryPolicy::bounded(10, Duration::from_millis(20)));

    let flip = script.clone();
    tokio::spawn(async move {
        while flip.hits() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        flip.status.store(StatusCode::OK.as_u16(), Ordering::SeqCst);
    });

    client.report_height(8).await.unwrap();
    assert!(script.hits() >= 2);
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let authority = HttpAuthority::new(&format!("http://{}", addr), auth_address()).unwrap();
    let payout = PayoutAddress::parse(PAYOUT).unwrap();

    assert!(matches!(authority.ping().await, Err(FarmError::Transport(_))));
    assert!(matches!(
        authority.register(&payout).await,
        Err(FarmError::RegistrationFailed(_))
    ));
}

//! Common test utilities for API testing.
//!
//! This module provides a test fixture that builds the router over a real
//! SQLite store in a temporary directory, seeded through the same batch
//! append the update engine uses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use torrentdb_core::{
    config::DatabaseConfig, Config, FetchedItem, SourceIdentity, SqliteTorrentStore, TorrentStore,
};
use torrentdb_server::state::AppState;

/// Re-export fixtures for test convenience
pub use torrentdb_core::testing::fixtures;

/// Source id used for seeded rows.
pub const SOURCE_ID: u32 = 2;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_lookup() {
///     let fixture = TestFixture::new();
///     fixture.seed(fixtures::items(1..=3));
///
///     let response = fixture.get("/api/v1/stats").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Store behind the router
    pub store: Arc<SqliteTorrentStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture with an empty store and one known source.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let store = Arc::new(SqliteTorrentStore::new(&db_path).expect("Failed to create store"));
        let sources = vec![SourceIdentity {
            id: SOURCE_ID,
            name: "rutor".to_string(),
        }];

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn TorrentStore>,
            sources,
        ));
        let router = torrentdb_server::api::create_router(state);

        Self {
            router,
            store,
            temp_dir,
        }
    }

    /// Append items for [`SOURCE_ID`].
    pub fn seed(&self, items: Vec<FetchedItem>) {
        self.store
            .append_batch(SOURCE_ID, &items)
            .expect("Failed to seed store");
    }

    /// Send a GET request to the test router.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}

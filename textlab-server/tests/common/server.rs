//! Test server harness for integration tests.
//!
//! Spins up the real router on a random port so tests talk HTTP through
//! `reqwest` exactly as a browser client would.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use textlab_core::SessionStore;
use textlab_server::{build_router, AppState, LayoutService, SampleLayoutService};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    store: SessionStore,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server backed by the sample layout service.
    pub async fn start() -> Self {
        Self::with_layouts(Arc::new(SampleLayoutService)).await
    }

    /// Start a server with a custom layout service.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn with_layouts(layouts: Arc<dyn LayoutService>) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let store = SessionStore::new();
        let app = build_router(AppState::new(store.clone(), layouts));

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            store,
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Absolute URL for a path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// URL of a session route.
    pub fn session_url(&self, session: &str, rest: &str) -> String {
        self.url(&format!("/api/sessions/{session}{rest}"))
    }

    /// The HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Direct access to the session store (for test assertions).
    #[allow(dead_code)]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// GET a path and decode JSON, returning the status too.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.expect("GET");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    /// POST JSON to a session route.
    pub async fn post(&self, session: &str, rest: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.session_url(session, rest))
            .json(body)
            .send()
            .await
            .expect("POST");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}

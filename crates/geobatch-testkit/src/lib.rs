//! Local HTTP servers standing in for geocoding providers in tests.
//!
//! Every server binds `127.0.0.1:0`, answers on any path and lives until the
//! test runtime shuts down.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Arc<str>,
    hits: Arc<AtomicUsize>,
}

/// A running local server and the number of requests it has seen.
#[derive(Debug)]
pub struct CannedServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl CannedServer {
    /// Answer every request with `status` and a JSON `body`.
    pub async fn start(status: u16, body: impl Into<String>) -> io::Result<Self> {
        let status = StatusCode::from_u16(status)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let canned = Canned {
            status,
            body: Arc::from(body.into()),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let hits = Arc::clone(&canned.hits);
        let router = Router::new().fallback(respond).with_state(canned);
        Ok(Self {
            base_url: serve(router).await?,
            hits,
        })
    }

    /// Accept requests and never answer them.
    pub async fn stalled() -> io::Result<Self> {
        let canned = Canned {
            status: StatusCode::OK,
            body: Arc::from(""),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let hits = Arc::clone(&canned.hits);
        let router = Router::new().fallback(hang).with_state(canned);
        Ok(Self {
            base_url: serve(router).await?,
            hits,
        })
    }

    /// `http://127.0.0.1:<port>`, no trailing slash.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A base URL nothing is listening on.
pub async fn refused_url() -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

async fn serve(router: Router) -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

async fn respond(State(canned): State<Canned>) -> impl IntoResponse {
    canned.hits.fetch_add(1, Ordering::SeqCst);
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.to_string(),
    )
}

async fn hang(State(canned): State<Canned>) -> StatusCode {
    canned.hits.fetch_add(1, Ordering::SeqCst);
    std::future::pending::<StatusCode>().await
}

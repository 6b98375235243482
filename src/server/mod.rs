//! Local x-callback-url HTTP server
//!
//! Receives shortcut completion callbacks, validates them against the
//! issued single-use tokens and dispatches the configured completion
//! command. Every response carries the same terminal HTML page whose only
//! behavior is closing the browser context that delivered the callback.

pub mod command;
pub mod params;
pub mod token;
pub mod validators;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::Html;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use command::CallbackCommand;
use params::CallbackSearchParams;
use token::TokenRegistry;
use validators::RequestValidator;

pub const CALLBACK_PATHNAME: &str = "/x-callback-url";

const CALLBACK_HTML: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html class=\"default\" lang=\"en\">\n",
    "  <head>\n",
    "    <meta charset=\"utf-8\">\n",
    "    <title>shortcutd v",
    env!("CARGO_PKG_VERSION"),
    " - X-Callback-Url Server</title>\n",
    "    <script>typeof window !== \"undefined\" && window.close()</script>\n",
    "  </head>\n",
    "</html>"
);

/// Emitted after a callback has been validated and its completion command
/// dispatched.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub shortcut: String,
    /// Status as reported by the caller, not independently verified.
    pub status: String,
}

struct ServerState {
    config: Arc<Config>,
    tokens: TokenRegistry,
    outcomes: mpsc::UnboundedSender<CallbackOutcome>,
}

pub struct CallbackServer {
    state: Arc<ServerState>,
    addr: Option<SocketAddr>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    outcomes: mpsc::UnboundedReceiver<CallbackOutcome>,
}

impl CallbackServer {
    /// Construct the server and start listening, when callback handling is
    /// enabled and the socket can be bound. Otherwise the instance is
    /// inert: no socket, but `base_url` and `issue_token` stay usable and
    /// `destroy` is a no-op.
    pub async fn start(config: Arc<Config>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(ServerState {
            config: config.clone(),
            tokens: TokenRegistry::new(),
            outcomes: outcomes_tx,
        });

        let mut server = Self {
            state,
            addr: None,
            shutdown: shutdown_tx,
            task: None,
            outcomes: outcomes_rx,
        };

        if !config.callback_server_enabled {
            error!("Attempted to create callback server while callback handling is disabled");
            return server;
        }

        let bind_addr = format!(
            "{}:{}",
            config.callback_server_hostname, config.callback_server_port
        );
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind callback server at {}: {}", bind_addr, e);
                return server;
            }
        };
        server.addr = listener.local_addr().ok();

        info!("Callback server listening at {}", bind_addr);

        let app = router(server.state.clone());
        let mut shutdown_rx = shutdown_rx;
        let shutdown = async move {
            let _ = shutdown_rx.changed().await;
        };
        server.task = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Callback server error: {}", e);
            }
        }));

        server
    }

    pub fn is_listening(&self) -> bool {
        self.task.is_some()
    }

    /// Actual bound address, when listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Base URL the outbound x-callback sub-URLs point at.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.state.config.callback_server_protocol,
            self.state.config.callback_server_hostname,
            self.state.config.callback_server_port,
            CALLBACK_PATHNAME
        )
    }

    /// Issue a single-use callback authorization token.
    pub fn issue_token(&self) -> String {
        self.state.tokens.issue()
    }

    /// Wait for the next dispatched callback, or give up after `timeout`.
    pub async fn wait_for_outcome(&mut self, timeout: Duration) -> Result<CallbackOutcome> {
        if !self.is_listening() {
            return Err(anyhow!("Callback server is not listening"));
        }
        tokio::select! {
            outcome = self.outcomes.recv() => {
                outcome.ok_or_else(|| anyhow!("Callback outcome channel closed"))
            }
            _ = tokio::time::sleep(timeout) => {
                Err(anyhow!("Timed out waiting for shortcut completion callback"))
            }
        }
    }

    /// Stop listening and drop open connections. Safe to call repeatedly,
    /// and on a server that never started.
    pub fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Closing callback server connections and listeners");
            let _ = self.shutdown.send(true);
            task.abort();
        }
        self.addr = None;
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn router(state: Arc<ServerState>) -> Router {
    // A single fallback route: method and pathname classification belong
    // to the validator chain, not the router.
    Router::new().fallback(handle_request).with_state(state)
}

async fn handle_request(
    State(state): State<Arc<ServerState>>,
    request: Request,
) -> (StatusCode, Html<&'static str>) {
    debug!("Incoming request, starting validation");

    let method = request.method().clone();
    let uri = request.uri().clone();
    let search_params = CallbackSearchParams::parse(uri.query().unwrap_or_default());

    let validators = [
        RequestValidator::new(
            || method == Method::GET,
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Unsupported request: {} {}", method, uri),
        ),
        RequestValidator::new(
            || uri.path() == CALLBACK_PATHNAME,
            StatusCode::NOT_FOUND,
            format!("Invalid url pathname: {}", uri.path()),
        ),
        RequestValidator::new(
            || search_params.has_required(),
            StatusCode::BAD_REQUEST,
            format!(
                "Missing required search params ({})",
                serde_json::to_string(&search_params).unwrap_or_default()
            ),
        ),
        RequestValidator::new(
            || state.tokens.consume(search_params.token.as_deref()),
            StatusCode::FORBIDDEN,
            "Authorization token invalid or already consumed".to_string(),
        ),
    ];

    if let Some(failure) = validators::first_failure(&validators) {
        return end_with_error(failure.error_code, &failure.error_message);
    }
    drop(validators);

    debug!("Request validators passed");

    let command = match CallbackCommand::new(&search_params, &state.config) {
        Ok(command) => command,
        Err(e) => {
            return end_with_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to run callback command: {}", e),
            );
        }
    };
    if let Err(e) = command.run().await {
        return end_with_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Failed to run callback command: {}", e),
        );
    }

    let shortcut = search_params.shortcut.as_deref().unwrap_or_default();
    info!("Executed callback command for shortcut \"{}\"", shortcut);

    let _ = state.outcomes.send(CallbackOutcome {
        shortcut: shortcut.to_string(),
        status: search_params.status.as_deref().unwrap_or_default().to_string(),
    });

    (StatusCode::OK, Html(CALLBACK_HTML))
}

fn end_with_error(status_code: StatusCode, error_message: &str) -> (StatusCode, Html<&'static str>) {
    error!(
        "Callback request rejected: status_code={} {}",
        status_code.as_u16(),
        error_message
    );
    (status_code, Html(CALLBACK_HTML))
}

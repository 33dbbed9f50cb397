//! Hyper HTTP/1 adapter.
//!
//! The transport owns connection handling only. Route matching and identity
//! verification are delegated to two collaborators:
//!
//! - [`RouteResolver`] maps `(method, path)` to a route template and path
//!   parameters
//! - [`Authenticator`] maps request headers to an optional [`Principal`]
//!
//! Everything after that is the [`Dispatcher`]'s job.

use crate::{Dispatcher, IncomingRequest};
use bytes::Bytes;
use hermes_config::HermesConfig;
use hermes_core::{Error, Params, Principal, RequestContext};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Default body limit applied by the transport: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Default time to wait for in-flight connections on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Listener I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A route matched by the external router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The route template, e.g. `/orders/{id}`.
    pub template: String,
    /// Values extracted for the template's parameters.
    pub params: Params,
}

impl RouteMatch {
    /// Creates a match.
    pub fn new(template: impl Into<String>, params: Params) -> Self {
        Self {
            template: template.into(),
            params,
        }
    }
}

/// The external router contract.
///
/// Returning `None` makes the literal request path the route, which the
/// dispatcher then reports as `RouteNotFound` if nothing is registered.
pub trait RouteResolver: Send + Sync + 'static {
    /// Matches `path` for `method`.
    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch>;
}

impl<F> RouteResolver for F
where
    F: Fn(&Method, &str) -> Option<RouteMatch> + Send + Sync + 'static,
{
    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self(method, path)
    }
}

/// The external authentication contract.
///
/// Implementations verify credentials however they like; the dispatcher only
/// sees the resulting principal, or its absence.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the principal for `headers`, if any.
    fn authenticate(&self, headers: &HeaderMap) -> impl Future<Output = Option<Principal>> + Send;
}

/// An authenticator that never produces a principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthentication;

impl Authenticator for NoAuthentication {
    fn authenticate(&self, _headers: &HeaderMap) -> impl Future<Output = Option<Principal>> + Send {
        std::future::ready(None)
    }
}

/// Serves a [`Dispatcher`] over HTTP/1.
pub struct Transport<R, A> {
    dispatcher: Dispatcher,
    resolver: Arc<R>,
    authenticator: Arc<A>,
    max_body_bytes: usize,
    shutdown_timeout: Duration,
}

impl<R, A> Clone for Transport<R, A> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            resolver: Arc::clone(&self.resolver),
            authenticator: Arc::clone(&self.authenticator),
            max_body_bytes: self.max_body_bytes,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl<R: RouteResolver, A: Authenticator> Transport<R, A> {
    /// Creates a transport with default limits.
    pub fn new(dispatcher: Dispatcher, resolver: R, authenticator: A) -> Self {
        Self {
            dispatcher,
            resolver: Arc::new(resolver),
            authenticator: Arc::new(authenticator),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Applies the `server` section of `config`.
    #[must_use]
    pub fn with_config(self, config: &HermesConfig) -> Self {
        self.max_body_bytes(config.server.max_body_bytes)
            .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
    }

    /// Sets the maximum body size read from the wire.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Sets how long shutdown waits for in-flight connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Handles one HTTP request.
    pub async fn handle<B>(&self, request: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();
        let (template, params) = match self.resolver.resolve(&parts.method, parts.uri.path()) {
            Some(matched) => (matched.template, matched.params),
            None => (parts.uri.path().to_string(), Params::new()),
        };

        let bytes = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                    // The true size is unknown once the limit trips.
                    Error::payload_too_large(self.max_body_bytes, self.max_body_bytes.saturating_add(1))
                } else {
                    Error::new(StatusCode::BAD_REQUEST, "failed to read request body")
                        .with_cause(anyhow::anyhow!(e))
                };
                let ctx = RequestContext::new(parts.method, template).with_headers(parts.headers);
                return self.dispatcher.error_response(&err, &ctx);
            }
        };

        let principal = self.authenticator.authenticate(&parts.headers).await;
        let mut incoming = IncomingRequest::new(parts.method, template)
            .with_params(params)
            .with_uri(parts.uri)
            .with_headers(parts.headers)
            .with_body(bytes);
        if let Some(principal) = principal {
            incoming = incoming.with_principal(principal);
        }
        self.dispatcher.execute(incoming).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// On shutdown, open connections are asked to finish gracefully and are
    /// given up to the shutdown timeout before being aborted.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), TransportError>
    where
        S: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, routes = self.dispatcher.registry().len(), "Transport listening");

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let transport = self.clone();
                        let mut stop = stop_rx.clone();
                        connections.spawn(async move {
                            let service = service_fn(move |request: http::Request<Incoming>| {
                                let transport = transport.clone();
                                async move { Ok::<_, Infallible>(transport.handle(request).await) }
                            });
                            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                            tokio::pin!(conn);
                            let result = tokio::select! {
                                result = conn.as_mut() => result,
                                _ = stop.changed() => {
                                    conn.as_mut().graceful_shutdown();
                                    conn.await
                                }
                            };
                            if let Err(e) = result {
                                tracing::debug!(remote = %remote, error = %e, "Connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        // Receivers may already be gone; that only means nothing is left to stop.
        let _ = stop_tx.send(true);

        let in_flight = connections.len();
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Shutdown timeout reached, aborting connections"
            );
            connections.abort_all();
        } else {
            tracing::info!(drained = in_flight, "All connections closed");
        }
        Ok(())
    }
}

/// Binds a TCP listener on `addr`.
pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serves `dispatcher` on `listener` until `shutdown` resolves.
pub async fn serve<R, A, S>(
    listener: TcpListener,
    dispatcher: Dispatcher,
    resolver: R,
    authenticator: A,
    shutdown: S,
) -> Result<(), TransportError>
where
    R: RouteResolver,
    A: Authenticator,
    S: Future<Output = ()> + Send,
{
    Transport::new(dispatcher, resolver, authenticator)
        .serve(listener, shutdown)
        .await
}

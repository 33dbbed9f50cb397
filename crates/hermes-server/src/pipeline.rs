//! The per-request stage sequence.
//!
//! Each registered route is stored as a [`Handler`], a type-erased endpoint
//! that runs the typed stages for one request:
//!
//! ```text
//! Start → AuthZ → ExtractArgs → DecodeBody → BeforeValidateHook → Validate
//!       → Invoke → ProcessResponse → WriteResponse → Done
//! ```
//!
//! The first failing stage ends the sequence. The [`StageTracker`] records
//! the current stage so the executor can attach it to the error log, even
//! when the failure is a panic.

use crate::writer::{self, Reply};
use crate::Response;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use hermes_core::{Error, RequestContext};
use hermes_extract::{is_read_only, violations_to_error, ArgList, BodyFormat, BodyPlan, RequestBody};
use hermes_registry::{HandlerDescriptor, MediaType};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Request accepted, nothing run yet.
    Start,
    /// Principal presence and authorization checks.
    AuthZ,
    /// Side-argument extraction.
    ExtractArgs,
    /// The route's pre-validation hook.
    BeforeValidateHook,
    /// Body decoding or read-only synthesis.
    DecodeBody,
    /// Structural validation.
    Validate,
    /// The user handler.
    Invoke,
    /// Encoding and response processors.
    ProcessResponse,
    /// Writing the HTTP response.
    WriteResponse,
    /// Completed successfully.
    Done,
    /// Ended by a failure.
    Aborted,
}

impl Stage {
    const ALL: [Self; 11] = [
        Self::Start,
        Self::AuthZ,
        Self::ExtractArgs,
        Self::BeforeValidateHook,
        Self::DecodeBody,
        Self::Validate,
        Self::Invoke,
        Self::ProcessResponse,
        Self::WriteResponse,
        Self::Done,
        Self::Aborted,
    ];

    /// Returns the stage name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AuthZ => "authz",
            Self::ExtractArgs => "extract_args",
            Self::BeforeValidateHook => "before_validate_hook",
            Self::DecodeBody => "decode_body",
            Self::Validate => "validate",
            Self::Invoke => "invoke",
            Self::ProcessResponse => "process_response",
            Self::WriteResponse => "write_response",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the stage a request is in.
#[derive(Debug)]
pub struct StageTracker(AtomicU8);

impl StageTracker {
    /// A tracker at [`Stage::Start`].
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(Stage::Start as u8))
    }

    /// Moves to `stage`.
    pub fn enter(&self, stage: Stage) {
        self.0.store(stage as u8, Ordering::Relaxed);
        tracing::trace!(stage = stage.as_str(), "Entering stage");
    }

    /// Returns the current stage.
    #[must_use]
    pub fn current(&self) -> Stage {
        let raw = self.0.load(Ordering::Relaxed);
        Stage::ALL
            .into_iter()
            .find(|stage| *stage as u8 == raw)
            .unwrap_or(Stage::Aborted)
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs principal presence and authorization checks for `descriptor`.
///
/// Skipped entirely for public routes. Checks run in registration order
/// (controller checks first) and the first failure wins.
#[track_caller]
pub fn authorize(descriptor: &HandlerDescriptor, ctx: &RequestContext) -> Result<(), Error> {
    if !descriptor.auth_required() {
        return Ok(());
    }
    let principal = ctx.principal().ok_or_else(Error::invalid_credentials)?;
    for check in descriptor.auth_checks() {
        check.check(principal).map_err(Error::not_authorized)?;
    }
    Ok(())
}

/// Per-request inputs an endpoint needs besides the context.
pub(crate) struct Input<'a> {
    pub(crate) body: Bytes,
    pub(crate) format: BodyFormat,
    pub(crate) max_body_bytes: Option<usize>,
    pub(crate) produces: &'a MediaType,
    pub(crate) descriptor: &'a HandlerDescriptor,
    pub(crate) tracker: &'a StageTracker,
}

/// A registered route with its types erased.
pub(crate) trait Endpoint: Send + Sync {
    /// Runs every stage from argument extraction through response processing.
    fn call<'a>(&'a self, ctx: RequestContext, input: Input<'a>) -> BoxFuture<'a, Result<Reply, Error>>;
}

/// Pre-validation hook over the primary value and side-arguments.
pub(crate) type Hook<B, A> = Arc<dyn Fn(&mut B, &mut A) -> Result<(), Error> + Send + Sync>;

/// The typed endpoint built by [`Route::handle`](crate::Route::handle).
pub(crate) struct TypedEndpoint<B, A: ArgList, F, T> {
    handler: F,
    body_plan: BodyPlan,
    args_plan: A::Plan,
    hook: Option<Hook<B, A>>,
    _types: PhantomData<fn() -> (B, T)>,
}

impl<B: RequestBody, A: ArgList, F, T> TypedEndpoint<B, A, F, T> {
    /// Builds the per-type plans once, at registration.
    pub(crate) fn new<Fut>(handler: F, hook: Option<Hook<B, A>>) -> Self
    where
        F: Fn(RequestContext, B, A) -> Fut,
        Fut: Future<Output = Result<Response<T>, Error>>,
    {
        Self {
            handler,
            body_plan: BodyPlan::of::<B>(),
            args_plan: A::plan(),
            hook,
            _types: PhantomData,
        }
    }
}

impl<B, A, F, Fut, T> Endpoint for TypedEndpoint<B, A, F, T>
where
    B: RequestBody,
    A: ArgList,
    F: Fn(RequestContext, B, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<T>, Error>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn call<'a>(&'a self, ctx: RequestContext, input: Input<'a>) -> BoxFuture<'a, Result<Reply, Error>> {
        Box::pin(async move {
            let tracker = input.tracker;

            tracker.enter(Stage::ExtractArgs);
            let mut args = A::extract(&self.args_plan, &ctx)?;

            tracker.enter(Stage::DecodeBody);
            let mut body: B = if is_read_only(ctx.method()) {
                self.body_plan.synthesize(&ctx)?
            } else {
                self.body_plan
                    .decode(&input.body, input.format, input.max_body_bytes)?
            };

            if let Some(hook) = &self.hook {
                tracker.enter(Stage::BeforeValidateHook);
                hook(&mut body, &mut args)?;
            }

            tracker.enter(Stage::Validate);
            violations_to_error(&body.validate())?;

            tracker.enter(Stage::Invoke);
            let response = (self.handler)(ctx, body, args).await?;

            tracker.enter(Stage::ProcessResponse);
            let (body, status, headers) = response.into_parts();
            let body = writer::prepare(body, input.produces, input.descriptor.response_processors())?;
            Ok(Reply {
                body,
                status,
                headers,
            })
        })
    }
}

/// A type-erased route handler, as stored in the registry.
#[derive(Clone)]
pub struct Handler(Arc<dyn Endpoint>);

impl Handler {
    pub(crate) fn new(endpoint: impl Endpoint + 'static) -> Self {
        Self(Arc::new(endpoint))
    }

    pub(crate) fn endpoint(&self) -> &dyn Endpoint {
        &*self.0
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

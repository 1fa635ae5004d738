//! Request handlers.
//!
//! A handler gets the request by value and the response by mutable
//! reference. It may stream a body with
//! [`ServerResponse::write_with`] or just set a status and return; whatever
//! it leaves open is completed by the server once the returned future
//! resolves.
//!
//! ```text
//! hyper ──▶ dispatch ──spawn──▶ handler.handle(req, &mut res)
//!              │                        │ first write / end
//!              ◀──────── response head ─┘
//! ```
//!
//! The head travels back to the connection task through a oneshot, so the
//! handler can keep writing after hyper started sending.

use std::future::Future;
use std::pin::Pin;

use crate::error::Error;
use crate::server::{ServerRequest, ServerResponse};

// ── Types ─────────────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// The lifetime lets the future borrow the handler and the response it
/// writes to; `Send` lets tokio move it across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── HttpHandler ───────────────────────────────────────────────────────────────

/// Serves one request.
///
/// Returning `Err` before anything was written produces a `500`. Returning
/// `Err` after the head went out aborts the body, so the peer sees a broken
/// transfer rather than a truncated success.
pub trait HttpHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: ServerRequest,
        res: &'a mut ServerResponse,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

/// Wraps a closure as an [`HttpHandler`].
///
/// ```rust,no_run
/// use hitch::{Status, handler_fn};
///
/// let teapot = handler_fn(|_req, res| Box::pin(async move {
///     res.set_status(Status::ImATeapot)?;
///     res.set_complete()
/// }));
/// # let _ = teapot;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(ServerRequest, &'a mut ServerResponse) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    HandlerFn(f)
}

/// See [`handler_fn`].
pub struct HandlerFn<F>(F);

impl<F> HttpHandler for HandlerFn<F>
where
    F: for<'a> Fn(ServerRequest, &'a mut ServerResponse) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        req: ServerRequest,
        res: &'a mut ServerResponse,
    ) -> BoxFuture<'a, Result<(), Error>> {
        (self.0)(req, res)
    }
}

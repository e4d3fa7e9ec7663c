//! Error-handler registry and dispatch.

use crate::dependency::{builtin, Args, InjectContext, Signature};
use crate::error::{Error, ErrorKind, Result, EXCEPTION, HTTP, REDIRECT};
use crate::handler::Handler;
use crate::server::{Reply, Request, Response, SharedResponse};
use serde_json::json;
use std::cmp::Reverse;
use std::rc::Rc;
use tracing::{debug, error};

/// Handlers keyed by error kind, in registration order.
#[derive(Debug, Clone)]
pub(crate) struct ErrorHandlers {
    handlers: Vec<(&'static ErrorKind, Handler)>,
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        let mut handlers = Self {
            handlers: Vec::new(),
        };
        handlers.register(&REDIRECT, redirect_handler());
        handlers.register(&HTTP, http_error_handler());
        handlers.register(&EXCEPTION, exception_handler());
        handlers
    }
}

impl ErrorHandlers {
    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: &'static ErrorKind, handler: Handler) {
        self.handlers.retain(|(existing, _)| *existing != kind);
        self.handlers.push((kind, handler));
    }

    /// Handlers that apply to `kind`, most specific first.
    ///
    /// Equal depths, if any, go most recently registered first.
    pub fn candidates(&self, kind: &ErrorKind) -> Vec<&(&'static ErrorKind, Handler)> {
        let mut matching: Vec<_> = self
            .handlers
            .iter()
            .rev()
            .filter(|(registered, _)| kind.is_a(registered))
            .collect();
        matching.sort_by_key(|(registered, _)| Reverse(registered.depth()));
        matching
    }

    /// Turn `err` into a response by trying each applicable handler in turn.
    ///
    /// A handler that fails, or whose return value can not be materialized, is
    /// logged and skipped. When no handler succeeds the response is a bare 500.
    pub fn dispatch(&self, err: Error, request: &Rc<Request>) -> Response {
        let err = Rc::new(err);
        let response = Response::new(500).shared();

        for (kind, handler) in self.candidates(err.kind()) {
            let ctx = InjectContext::new(Rc::clone(request), Rc::clone(&response));
            let args = Args::new().with_positional(Rc::clone(&err));

            match render(handler, &ctx, args, &response) {
                Ok(()) => {
                    debug!(
                        kind = %kind,
                        handler_name = %handler.name(),
                        status = response.borrow().status(),
                        "Error handled"
                    );
                    return response.take();
                }
                Err(failure) => {
                    error!(
                        kind = %kind,
                        handler_name = %handler.name(),
                        error = %failure,
                        "Failed to process error handler"
                    );
                }
            }
        }

        Response::new(500)
    }
}

fn render(
    handler: &Handler,
    ctx: &InjectContext,
    args: Args,
    response: &SharedResponse,
) -> Result<()> {
    let reply = handler.call(ctx, args)?;
    let mut response = response.borrow_mut();
    response.set_raw(reply);
    response.finalize()
}

fn redirect_handler() -> Handler {
    Handler::new(|args| {
        let response: SharedResponse = args.take("response")?;
        let mut response = response.borrow_mut();
        let err = args.error()?;
        response.set_status(err.status_code());
        response.set_header("content-type", "text/plain");
        if let Error::Redirect { to, .. } = err {
            response.set_header("location", to.clone());
        }
        Ok(Reply::Empty)
    })
    .named("redirect_handler")
    .inject("response", builtin::response())
}

fn http_error_handler() -> Handler {
    Handler::new(|args| {
        let response: SharedResponse = args.take("response")?;
        let err = args.error()?;
        response.borrow_mut().set_status(err.status_code());
        Ok(json!({ "detail": err.details() }))
    })
    .named("http_error_handler")
    .inject("response", builtin::response())
}

fn exception_handler() -> Handler {
    Handler::new(|args| {
        let response: SharedResponse = args.take("response")?;
        response.borrow_mut().set_status(500);
        Ok(())
    })
    .named("exception_handler")
    .inject("response", builtin::response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BAD_REQUEST, NOT_FOUND, PAYLOAD, QUERY_PARAM_MISSING};

    static CUSTOM: ErrorKind = ErrorKind::new("custom", &EXCEPTION);
    static OTHER: ErrorKind = ErrorKind::new("other", &EXCEPTION);
    static SAME_NAME: ErrorKind = ErrorKind::new("custom", &EXCEPTION);

    fn names(handlers: &ErrorHandlers, kind: &ErrorKind) -> Vec<&'static str> {
        handlers
            .candidates(kind)
            .into_iter()
            .map(|(kind, _)| kind.name())
            .collect()
    }

    fn noop() -> Handler {
        Handler::new(|_| Ok(()))
    }

    #[test]
    fn test_default_candidates() {
        let handlers = ErrorHandlers::default();
        assert_eq!(names(&handlers, &REDIRECT), vec!["redirect", "http", "exception"]);
        assert_eq!(names(&handlers, &PAYLOAD), vec!["http", "exception"]);
        assert_eq!(names(&handlers, &CUSTOM), vec!["exception"]);
    }

    #[test]
    fn test_deeper_kinds_come_first() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(&BAD_REQUEST, noop());
        handlers.register(&QUERY_PARAM_MISSING, noop());
        assert_eq!(
            names(&handlers, &QUERY_PARAM_MISSING),
            vec!["query_param_missing", "bad_request", "http", "exception"]
        );
        assert_eq!(names(&handlers, &NOT_FOUND), vec!["http", "exception"]);
    }

    #[test]
    fn test_subkind_first_regardless_of_registration_order() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(&QUERY_PARAM_MISSING, noop());
        handlers.register(&BAD_REQUEST, noop());
        handlers.register(&HTTP, noop());
        assert_eq!(
            names(&handlers, &QUERY_PARAM_MISSING),
            vec!["query_param_missing", "bad_request", "http", "exception"]
        );
    }

    #[test]
    fn test_register_replaces_existing_kind() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(&CUSTOM, noop());
        handlers.register(&OTHER, noop());
        handlers.register(&HTTP, noop().named("replacement"));
        assert_eq!(handlers.handlers.len(), 5);

        let candidates = handlers.candidates(&NOT_FOUND);
        assert_eq!(candidates[0].1.name(), "replacement");
        assert_eq!(names(&handlers, &OTHER), vec!["other", "exception"]);
    }

    #[test]
    fn test_same_name_kinds_keep_separate_handlers() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(&CUSTOM, noop().named("custom"));
        handlers.register(&SAME_NAME, noop().named("same_name"));
        assert_eq!(handlers.handlers.len(), 5);
        assert_eq!(handlers.candidates(&CUSTOM)[0].1.name(), "custom");
        assert_eq!(handlers.candidates(&SAME_NAME)[0].1.name(), "same_name");
    }

    #[test]
    fn test_dispatch_falls_through_failing_handler() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(
            &NOT_FOUND,
            Handler::new(|_| -> Result<()> { Err(Error::bad_request("broken")) }),
        );
        let request = Rc::new(Request::new("GET", "/missing"));
        let response = handlers.dispatch(Error::NotFound, &request);
        assert_eq!(response.status(), 404);
        assert_eq!(response.body(), r#"{"detail":{"msg":"Page not found"}}"#);
    }

    #[test]
    fn test_dispatch_all_failing_is_bare_500() {
        let mut handlers = ErrorHandlers::default();
        handlers.register(
            &EXCEPTION,
            Handler::new(|_| -> Result<()> { Err(Error::bad_request("broken")) }),
        );
        let request = Rc::new(Request::new("GET", "/"));
        let response = handlers.dispatch(Error::custom(&CUSTOM, anyhow::anyhow!("boom")), &request);
        assert_eq!(response.status(), 500);
        assert_eq!(response.body(), "");
        assert_eq!(response.headers().count(), 0);
    }
}

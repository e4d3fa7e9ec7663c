use super::errors::ErrorHandlers;
use crate::dependency::{Args, InjectContext};
use crate::error::{Error, ErrorKind, Result, RouteError, BAD_REQUEST, EXCEPTION, NOT_FOUND};
use crate::handler::Handler;
use crate::router::{MethodFilter, Router};
use crate::runtime_config::RuntimeConfig;
use crate::server::{Reply, Request, Response, SharedResponse};
use std::rc::Rc;
use tracing::{debug, debug_span, error, info};

/// Anything that owns a route table and can be mounted into another.
///
/// Both [`Blueprint`] and [`App`] implement this, so routes are registered the same
/// way on either and either can be included into the other.
pub trait Mountable {
    fn router(&self) -> &Router;

    fn router_mut(&mut self) -> &mut Router;

    /// Bind `handler` to `path` for every method.
    fn route(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.router_mut()
            .add_route(&[MethodFilter::Any], path, handler)
    }

    /// Bind `handler` to `path` for `methods`; an empty list means every method.
    fn route_methods(
        &mut self,
        methods: &[&str],
        path: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        if methods.is_empty() {
            return self.route(path, handler);
        }
        let methods: Vec<MethodFilter> = methods.iter().map(|m| MethodFilter::method(m)).collect();
        self.router_mut().add_route(&methods, path, handler)
    }

    fn get(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.route_methods(&["GET"], path, handler)
    }

    fn post(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.route_methods(&["POST"], path, handler)
    }

    fn put(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.route_methods(&["PUT"], path, handler)
    }

    fn delete(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.route_methods(&["DELETE"], path, handler)
    }

    /// Mount every route of `other` under `prefix`.
    fn include_app<M: Mountable>(&mut self, other: &M, prefix: &str) -> Result<(), RouteError>
    where
        Self: Sized,
    {
        self.router_mut().include(other.router(), prefix)
    }
}

/// Mark `body` as HTML so it is sent with `content-type: text/html`.
pub fn html(body: impl Into<String>) -> Reply {
    Reply::Html(body.into())
}

/// A route-only application, meant to be mounted into an [`App`].
#[derive(Debug, Clone, Default)]
pub struct Blueprint {
    router: Router,
}

impl Blueprint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A blueprint whose routes all live under `prefix`.
    pub fn with_prefix(prefix: &str) -> Result<Self, RouteError> {
        Ok(Self {
            router: Router::with_prefix(prefix)?,
        })
    }
}

impl Mountable for Blueprint {
    fn router(&self) -> &Router {
        &self.router
    }

    fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

/// The application: routes, dependency-injected handlers and the error chain.
///
/// # Example
///
/// ```rust
/// use cuproute::prelude::*;
///
/// let mut app = App::new();
/// app.get(
///     "/hello/{name}",
///     Handler::new(|args| {
///         let name: String = args.param("name")?;
///         Ok(format!("Hello, {name}"))
///     })
///     .untyped_param("name"),
/// )?;
///
/// let response = app.serve(Request::new("GET", "/hello/world"));
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body(), "Hello, world");
/// # Ok::<(), cuproute::RouteError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct App {
    router: Router,
    errors: ErrorHandlers,
    log_http_errors: bool,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An application whose routes all live under `prefix`.
    pub fn with_prefix(prefix: &str) -> Result<Self, RouteError> {
        Ok(Self {
            router: Router::with_prefix(prefix)?,
            ..Self::default()
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RouteError> {
        let mut app = Self::with_prefix(&config.path_prefix)?;
        app.log_http_errors = config.log_http_errors;
        info!(
            path_prefix = %config.path_prefix,
            log_http_errors = config.log_http_errors,
            "Application configured"
        );
        Ok(app)
    }

    /// Handle errors of `kind` (and of its descendants without a closer
    /// handler) with `handler`.
    ///
    /// The handler receives the error as positional argument 0, see
    /// [`Args::error`]. Its return value becomes the response body.
    pub fn exception_handler(&mut self, kind: &'static ErrorKind, handler: Handler) {
        self.errors.register(kind, handler);
    }

    pub fn handle_404(&mut self, handler: Handler) {
        self.exception_handler(&NOT_FOUND, handler);
    }

    pub fn handle_400(&mut self, handler: Handler) {
        self.exception_handler(&BAD_REQUEST, handler);
    }

    pub fn handle_500(&mut self, handler: Handler) {
        self.exception_handler(&EXCEPTION, handler);
    }

    /// Run `handler` against `request` and `response` with extra bindings.
    pub fn invoke(
        &self,
        request: Rc<Request>,
        response: SharedResponse,
        handler: &Handler,
        args: Args,
    ) -> Result<Reply> {
        let ctx = InjectContext::new(request, response);
        handler.call(&ctx, args)
    }

    /// Route and run the handler, without finalizing or handling errors.
    pub fn handle_request(&self, request: &Rc<Request>) -> Result<Response> {
        let matched = self
            .router
            .handle_route(request.method(), request.path())?;
        let response = Response::new(200).shared();
        let reply = self.invoke(
            Rc::clone(request),
            Rc::clone(&response),
            &matched.handler,
            Args::from(matched.path_params),
        )?;

        let mut response = response.take();
        response.set_raw(reply);
        Ok(response)
    }

    /// Produce the final response for `request`; never fails.
    pub fn serve(&self, request: Request) -> Response {
        let request = Rc::new(request);
        let span = debug_span!("request", method = %request.method(), path = %request.path());
        let _enter = span.enter();

        let result = self.handle_request(&request).and_then(|mut response| {
            response.finalize()?;
            Ok(response)
        });

        match result {
            Ok(response) => {
                debug!(status = response.status(), "Request served");
                response
            }
            Err(err) => {
                self.log_failure(&err);
                let response = self.errors.dispatch(err, &request);
                debug!(status = response.status(), "Request served by error handler");
                response
            }
        }
    }

    fn log_failure(&self, err: &Error) {
        if err.is_http() {
            if self.log_http_errors {
                info!(kind = %err.kind(), status = err.status_code(), error = %err, "HTTP condition");
            } else {
                debug!(kind = %err.kind(), status = err.status_code(), error = %err, "HTTP condition");
            }
            return;
        }
        let cause = match err {
            Error::Other { source, .. } => format!("{source:#}"),
            other => other.to_string(),
        };
        error!(kind = %err.kind(), error = %cause, "Failed to process handler");
    }

    /// Log every registered route.
    pub fn dump_routes(&self) {
        self.router.dump_routes();
    }
}

impl Mountable for App {
    fn router(&self) -> &Router {
        &self.router
    }

    fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

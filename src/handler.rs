use crate::dependency::{invoke, Args, InjectContext, Param, Signature};
use crate::error::Result;
use crate::server::Reply;
use std::fmt;
use std::sync::Arc;

type HandlerFn = dyn Fn(&mut Args) -> Result<Reply> + Send + Sync;

/// A route or error handler: a function plus its declared parameters.
///
/// Parameters are declared with the [`Signature`] builder methods. Path
/// parameters are declared with [`Signature::param`] so the router knows
/// which pattern to compile for them.
#[derive(Clone)]
pub struct Handler {
    name: String,
    params: Vec<Param>,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&mut Args) -> Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Self {
            name: std::any::type_name::<F>().to_string(),
            params: Vec::new(),
            func: Arc::new(move |args| func(args).map(Into::into)),
        }
    }

    /// Name shown in logs and route dumps.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the declared parameters under `ctx` and run the function.
    pub fn call(&self, ctx: &InjectContext, args: Args) -> Result<Reply> {
        invoke(ctx, &self.params, args, |args| (self.func)(args))
    }
}

impl Signature for Handler {
    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut Vec<Param> {
        &mut self.params
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

use super::error::AllowedErrors;
use crate::input::{InputComposer, InputError, InputSources, Providers};
use crate::server::OperationResponse;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Where a successful output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLocation {
    /// Serialized as the JSON body. An output that serializes to `null`
    /// (such as `()`) gives an empty body.
    #[default]
    Body,
    /// Serialized to a JSON object whose scalar fields become response
    /// headers; the body is empty.
    Headers,
    /// The output is discarded; empty body.
    None,
    /// The named top-level fields become response headers and the rest of
    /// the object is the JSON body.
    BodyAndHeaders(&'static [&'static str]),
}

/// Signature of a per-operation response renderer.
///
/// Receives the validated output serialized to JSON. An `Err` becomes a 500
/// `InternalError`.
pub type RenderFn = dyn Fn(Value) -> Result<OperationResponse, String> + Send + Sync;

/// Everything an operation declares at registration besides its function.
///
/// Defaults to a body-only input, body output and an empty allow-list.
///
/// ```rust
/// use opsrouter::input::InputSources;
/// use opsrouter::operation::{OperationConfig, OutputLocation};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct GetPet {
///     id: u64,
///     verbose: Option<bool>,
/// }
///
/// let config = OperationConfig::<GetPet>::new()
///     .input_sources(InputSources::PATH | InputSources::QUERY)
///     .allow("NotFound", 404)
///     .output(OutputLocation::Body);
/// assert_eq!(config.allowed_errors.get("NotFound").unwrap().status, 404);
/// ```
#[derive(Clone)]
pub struct OperationConfig<I> {
    pub allowed_errors: AllowedErrors,
    pub input: InputComposer<I>,
    pub output: OutputLocation,
    /// Replaces `output` when set.
    pub renderer: Option<Arc<RenderFn>>,
}

impl<I> fmt::Debug for OperationConfig<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationConfig")
            .field("allowed_errors", &self.allowed_errors)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("renderer", &self.renderer.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl<I> Default for OperationConfig<I> {
    fn default() -> Self {
        Self {
            allowed_errors: AllowedErrors::new(),
            input: InputComposer::body(),
            output: OutputLocation::Body,
            renderer: None,
        }
    }
}

impl<I> OperationConfig<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A config whose input is built by a custom composer.
    pub fn with_composer<F>(compose: F) -> Self
    where
        F: Fn(&mut Providers<'_>) -> Result<I, InputError> + Send + Sync + 'static,
    {
        Self::new().input(InputComposer::custom(compose))
    }

    #[must_use]
    pub fn input(mut self, composer: InputComposer<I>) -> Self {
        self.input = composer;
        self
    }

    #[must_use]
    pub fn input_sources(self, sources: InputSources) -> Self {
        self.input(InputComposer::sources(sources))
    }

    #[must_use]
    pub fn output(mut self, output: OutputLocation) -> Self {
        self.output = output;
        self
    }

    /// Build the success response with `render` instead of the output location.
    ///
    /// ```rust
    /// use opsrouter::operation::OperationConfig;
    /// use opsrouter::server::OperationResponse;
    ///
    /// let config = OperationConfig::<()>::new().render_with(|output| {
    ///     let mut response = OperationResponse::json(201, output);
    ///     response.set_header("location", "/pets/1".to_string());
    ///     Ok(response)
    /// });
    /// assert!(config.renderer.is_some());
    /// ```
    #[must_use]
    pub fn render_with<F>(mut self, render: F) -> Self
    where
        F: Fn(Value) -> Result<OperationResponse, String> + Send + Sync + 'static,
    {
        self.renderer = Some(Arc::new(render));
        self
    }

    #[must_use]
    pub fn allowed_errors(mut self, allowed_errors: AllowedErrors) -> Self {
        self.allowed_errors = allowed_errors;
        self
    }

    #[must_use]
    pub fn allow(mut self, identity: &str, status: u16) -> Self {
        self.allowed_errors = self.allowed_errors.allow(identity, status);
        self
    }

    #[must_use]
    pub fn allow_as(mut self, identity: &str, code: &str, status: u16) -> Self {
        self.allowed_errors = self.allowed_errors.allow_as(identity, code, status);
        self
    }
}

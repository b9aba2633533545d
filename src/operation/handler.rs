use super::completion::{Completion, FinishFn, ResponseSink, ResponseSlot};
use super::config::{OperationConfig, OutputLocation, RenderFn};
use super::error::{AllowedErrors, DispatchError, OperationError};
use super::validate::Validate;
use crate::input::{InputSources, Providers};
use crate::server::{OperationResponse, RawRequest};
use crate::shape::Shape;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

type InvokeFn<Ctx> = dyn Fn(Providers<'_>, &Ctx, &Arc<ResponseSlot>) + Send + Sync;

/// A registered operation with its input composer, output strategy and
/// allowed-error table, type-erased over its input, output and error types.
///
/// Invoking it composes the input, validates it, runs the operation and
/// turns the outcome into exactly one [`OperationResponse`]:
///
/// | Outcome                                   | Response                  |
/// |-------------------------------------------|---------------------------|
/// | input does not decode or validate         | 400 `ValidationError`     |
/// | output, [`OutputLocation::Body`]          | 200 with JSON body        |
/// | output, [`OutputLocation::Headers`]       | 200, fields as headers    |
/// | output, [`OutputLocation::None`]          | 200, empty body           |
/// | output, [`OutputLocation::BodyAndHeaders`]| 200, split body/headers   |
/// | output, custom renderer                   | whatever it renders       |
/// | output fails [`Validate`] or serialization| 500 `InternalError`       |
/// | output yields an invalid header           | 500 `InternalError`       |
/// | error listed in [`AllowedErrors`]         | mapped code and status    |
/// | any other error, panic, dropped completion| 500 `InternalError`       |
pub struct OperationHandler<Ctx> {
    name: Arc<str>,
    input_sources: Option<InputSources>,
    output: OutputLocation,
    invoke: Box<InvokeFn<Ctx>>,
}

impl<Ctx> fmt::Debug for OperationHandler<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandler")
            .field("name", &self.name)
            .field("input_sources", &self.input_sources)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<Ctx: 'static> OperationHandler<Ctx> {
    /// Wrap an operation that reports through a [`Completion`].
    ///
    /// The operation may complete before returning or keep the token and
    /// complete later from any thread. Returning `Err` sends that error
    /// immediately unless a completion already responded.
    pub fn new<I, O, E, F>(name: &str, operation: F, config: OperationConfig<I>) -> Self
    where
        I: DeserializeOwned + Validate + 'static,
        O: Serialize + Validate + 'static,
        E: OperationError + 'static,
        F: Fn(I, &Ctx, Completion<O, E>) -> Result<(), E> + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(name);
        let OperationConfig {
            allowed_errors,
            input,
            output,
            renderer,
        } = config;
        let input_sources = input.declared_sources();

        let finish: Arc<FinishFn<O, E>> = {
            let name = Arc::clone(&name);
            Arc::new(move |result: Result<O, E>| {
                finish_response(&name, result, &allowed_errors, output, renderer.as_deref())
            })
        };

        let invoke = erase(move |mut providers, ctx: &Ctx, slot| {
            let input = match input.compose(&mut providers) {
                Ok(input) => input,
                Err(err) => {
                    debug!(
                        request_id = %slot.request_id(),
                        operation = %slot.operation(),
                        error = %err,
                        "Input composition failed"
                    );
                    slot.respond(DispatchError::from(err).into_response());
                    return;
                }
            };
            drop(providers);

            if let Err(reason) = input.validate() {
                debug!(
                    request_id = %slot.request_id(),
                    operation = %slot.operation(),
                    reason = %reason,
                    "Input validation failed"
                );
                slot.respond(DispatchError::Validation { reason }.into_response());
                return;
            }

            let completion = Completion::new(Arc::clone(slot), Arc::clone(&finish));
            match operation(input, ctx, completion) {
                Ok(()) => slot.returned_ok(),
                Err(err) => {
                    if !slot.respond(finish(Err(err))) {
                        warn!(
                            request_id = %slot.request_id(),
                            operation = %slot.operation(),
                            "Operation returned an error after responding; ignoring"
                        );
                    }
                }
            }
        });

        Self {
            name,
            input_sources,
            output,
            invoke,
        }
    }

    /// Wrap an operation that returns its result directly.
    pub fn from_sync<I, O, E, F>(name: &str, operation: F, config: OperationConfig<I>) -> Self
    where
        I: DeserializeOwned + Validate + 'static,
        O: Serialize + Validate + 'static,
        E: OperationError + 'static,
        F: Fn(I, &Ctx) -> Result<O, E> + Send + Sync + 'static,
    {
        Self::new(
            name,
            move |input: I, ctx: &Ctx, completion: Completion<O, E>| {
                completion.complete(operation(input, ctx));
                Ok(())
            },
            config,
        )
    }
}

impl<Ctx> OperationHandler<Ctx> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sources the input composer reads; `None` for a custom composer.
    #[must_use]
    pub fn input_sources(&self) -> Option<InputSources> {
        self.input_sources
    }

    #[must_use]
    pub fn output(&self) -> OutputLocation {
        self.output
    }

    /// Run the operation for a routed request.
    ///
    /// The response, whenever it is ready, goes to `sink`.
    pub fn invoke(&self, request: &RawRequest, path_shape: Shape, ctx: &Ctx, sink: ResponseSink) {
        self.invoke_with_providers(Providers::from_request(request, path_shape), ctx, sink);
    }

    /// Run the operation with explicitly bound providers.
    pub fn invoke_with_providers(&self, providers: Providers<'_>, ctx: &Ctx, sink: ResponseSink) {
        let slot = Arc::new(ResponseSlot::new(Arc::clone(&self.name), sink));

        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (self.invoke)(providers, ctx, &slot))) {
            let panic_message = panic_message(panic.as_ref());
            let backtrace = std::backtrace::Backtrace::capture();
            error!(
                request_id = %slot.request_id(),
                operation = %self.name,
                panic_message = %panic_message,
                backtrace = %backtrace,
                "Operation panicked - CRITICAL"
            );
            slot.respond(
                DispatchError::Internal {
                    detail: format!("operation panicked: {panic_message}"),
                }
                .into_response(),
            );
        }
    }
}

fn finish_response<O, E>(
    operation: &str,
    result: Result<O, E>,
    allowed: &AllowedErrors,
    output: OutputLocation,
    renderer: Option<&RenderFn>,
) -> OperationResponse
where
    O: Serialize + Validate,
    E: OperationError,
{
    let outcome = match result {
        Ok(value) => render_output(&value, output, renderer).and_then(check_headers),
        Err(err) => Err(allowed.classify(&err)),
    };
    outcome.unwrap_or_else(|err| {
        debug!(operation = %operation, code = %err.code(), status = err.status(), "Operation failed");
        err.into_response()
    })
}

fn render_output<O: Serialize + Validate>(
    output: &O,
    location: OutputLocation,
    renderer: Option<&RenderFn>,
) -> Result<OperationResponse, DispatchError> {
    output.validate().map_err(|reason| DispatchError::Internal {
        detail: format!("output validation failed: {reason}"),
    })?;

    if renderer.is_none() && location == OutputLocation::None {
        return Ok(OperationResponse::empty(200));
    }

    let value = serde_json::to_value(output).map_err(|e| DispatchError::Internal {
        detail: format!("output serialization failed: {e}"),
    })?;

    if let Some(render) = renderer {
        return render(value).map_err(|reason| DispatchError::Internal {
            detail: format!("output rendering failed: {reason}"),
        });
    }

    match location {
        OutputLocation::Body if value.is_null() => Ok(OperationResponse::empty(200)),
        OutputLocation::Body => Ok(OperationResponse::json(200, value)),
        OutputLocation::Headers => {
            let mut response = OperationResponse::empty(200);
            for (name, field) in output_fields(value)? {
                set_field_header(&mut response, &name, field)?;
            }
            Ok(response)
        }
        OutputLocation::BodyAndHeaders(header_fields) => {
            let mut response = OperationResponse::empty(200);
            let mut body = serde_json::Map::new();
            for (name, field) in output_fields(value)? {
                if header_fields.contains(&name.as_str()) {
                    set_field_header(&mut response, &name, field)?;
                } else {
                    body.insert(name, field);
                }
            }
            if !body.is_empty() {
                response.set_header("content-type", "application/json".to_string());
                response.body = Some(Value::Object(body));
            }
            Ok(response)
        }
        OutputLocation::None => Ok(OperationResponse::empty(200)),
    }
}

fn output_fields(value: Value) -> Result<serde_json::Map<String, Value>, DispatchError> {
    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(serde_json::Map::new()),
        other => Err(DispatchError::Internal {
            detail: format!("header output must be an object, got {other}"),
        }),
    }
}

fn set_field_header(
    response: &mut OperationResponse,
    name: &str,
    value: Value,
) -> Result<(), DispatchError> {
    let text = match value {
        Value::Null => return Ok(()),
        Value::String(s) => s,
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            return Err(DispatchError::Internal {
                detail: format!("header output field '{name}' is not a scalar"),
            })
        }
    };
    response.set_header(&name.to_ascii_lowercase(), text);
    Ok(())
}

/// Reject headers `http` could not send.
fn check_headers(response: OperationResponse) -> Result<OperationResponse, DispatchError> {
    for (name, value) in &response.headers {
        if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(DispatchError::Internal {
                detail: format!("output header name '{name}' is invalid"),
            });
        }
        if http::HeaderValue::from_str(value).is_err() {
            return Err(DispatchError::Internal {
                detail: format!("output header '{name}' has an invalid value"),
            });
        }
    }
    Ok(response)
}

fn erase<Ctx, F>(invoke: F) -> Box<InvokeFn<Ctx>>
where
    F: Fn(Providers<'_>, &Ctx, &Arc<ResponseSlot>) + Send + Sync + 'static,
{
    Box::new(invoke)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

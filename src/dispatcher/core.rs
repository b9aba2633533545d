//! Dispatcher core module - per-request flow from routing to response.

use crate::ids::RequestId;
use crate::input::Providers;
use crate::method::HttpMethod;
use crate::operation::{
    Completion, DispatchError, OperationConfig, OperationError, OperationHandler, ResponseSink,
    Validate,
};
use crate::router::{HandlerTable, RouteMatch, RoutingError, TemplateError};
use crate::runtime_config::RuntimeConfig;
use crate::server::{OperationResponse, RawRequest};
use may::sync::mpsc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Routes requests to registered operations and delivers their responses
///
/// Owns the [`HandlerTable`] and the application context handed to every
/// operation. Operations are registered through `&mut self` during startup;
/// afterwards the dispatcher is read-only and can be shared (e.g. in an
/// `Arc`) by every transport worker.
pub struct Dispatcher<Ctx> {
    table: HandlerTable<OperationHandler<Ctx>>,
    context: Ctx,
    config: RuntimeConfig,
    request_id_header: Arc<str>,
}

impl<Ctx: Send + Sync + 'static> Dispatcher<Ctx> {
    /// Create a dispatcher configured from the environment
    ///
    /// See [`RuntimeConfig::from_env`] for the variables read.
    #[must_use]
    pub fn new(context: Ctx) -> Self {
        Self::with_config(context, RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(context: Ctx, config: RuntimeConfig) -> Self {
        Self {
            table: HandlerTable::with_slow_route_threshold(config.slow_route_threshold),
            context,
            request_id_header: Arc::from(config.request_id_header.as_str()),
            config,
        }
    }

    /// Register an operation that reports through a [`Completion`]
    ///
    /// # Arguments
    ///
    /// * `uri` - Exact URI (`/health`) or template (`/pets/{id}`, `/files/{path+}`)
    /// * `method` - HTTP method
    /// * `operation` - `Fn(input, &ctx, completion) -> Result<(), E>`
    /// * `config` - Input composer, output location and allowed errors
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for a malformed URI pattern; nothing is registered.
    pub fn register<I, O, E, F>(
        &mut self,
        uri: &str,
        method: HttpMethod,
        operation: F,
        config: OperationConfig<I>,
    ) -> Result<(), TemplateError>
    where
        I: DeserializeOwned + Validate + 'static,
        O: Serialize + Validate + 'static,
        E: OperationError + 'static,
        F: Fn(I, &Ctx, Completion<O, E>) -> Result<(), E> + Send + Sync + 'static,
    {
        let name = format!("{method} {uri}");
        self.register_handler(uri, method, OperationHandler::new(&name, operation, config))
    }

    /// Register an operation that returns its result directly
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for a malformed URI pattern; nothing is registered.
    pub fn register_sync<I, O, E, F>(
        &mut self,
        uri: &str,
        method: HttpMethod,
        operation: F,
        config: OperationConfig<I>,
    ) -> Result<(), TemplateError>
    where
        I: DeserializeOwned + Validate + 'static,
        O: Serialize + Validate + 'static,
        E: OperationError + 'static,
        F: Fn(I, &Ctx) -> Result<O, E> + Send + Sync + 'static,
    {
        let name = format!("{method} {uri}");
        self.register_handler(uri, method, OperationHandler::from_sync(&name, operation, config))
    }

    /// Register a pre-built handler
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for a malformed URI pattern; nothing is registered.
    pub fn register_handler(
        &mut self,
        uri: &str,
        method: HttpMethod,
        handler: OperationHandler<Ctx>,
    ) -> Result<(), TemplateError> {
        let operation = handler.name().to_string();
        match self.table.register(method.clone(), uri, handler) {
            Ok(()) => {
                info!(
                    operation = %operation,
                    method = %method,
                    uri = %uri,
                    total_routes = self.table.len(),
                    "Operation registered"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    operation = %operation,
                    method = %method,
                    uri = %uri,
                    error = %err,
                    "Operation registration failed"
                );
                Err(err)
            }
        }
    }
}

impl<Ctx> Dispatcher<Ctx> {
    #[must_use]
    pub fn context(&self) -> &Ctx {
        &self.context
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self) -> &HandlerTable<OperationHandler<Ctx>> {
        &self.table
    }

    /// Select the handler for a URI and method
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidOperation`] when nothing matches.
    pub fn resolve(
        &self,
        uri: &str,
        method: &HttpMethod,
    ) -> Result<RouteMatch<OperationHandler<Ctx>>, RoutingError> {
        self.table.resolve(uri, method)
    }

    /// Handle one request without waiting for the response
    ///
    /// Routes the request, composes the input and runs the operation on the
    /// calling thread or coroutine. The response is sent on `reply_tx`, either
    /// before this returns or later when the operation completes.
    ///
    /// # Returns
    ///
    /// The request id, reused from the request id header when it holds a
    /// valid ULID. The same id is set on the response.
    pub fn handle(
        &self,
        request: &RawRequest,
        reply_tx: mpsc::Sender<OperationResponse>,
    ) -> RequestId {
        let request_id =
            RequestId::from_header_or_new(request.get_header(&self.request_id_header));
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path(),
        );
        let _entered = span.enter();

        debug!(
            header_count = request.headers.len(),
            body_size_bytes = request.body.len(),
            "Request received"
        );

        let sink = ResponseSink::new(reply_tx, request_id, Arc::clone(&self.request_id_header));
        match self.table.resolve(&request.uri, &request.method) {
            Ok(route) => {
                debug!(operation = %route.handler.name(), "Request dispatched to operation");
                route
                    .handler
                    .invoke(request, route.path_shape, &self.context, sink);
            }
            Err(err) => {
                warn!(error = %err, "Request rejected: no matching operation");
                sink.send(DispatchError::from(err).into_response());
            }
        }
        request_id
    }

    /// Handle one request with explicitly bound providers
    ///
    /// Routing uses `uri` and `method`; the path provider of `providers` is
    /// replaced by the variables the route captured.
    pub fn handle_with_providers(
        &self,
        uri: &str,
        method: &HttpMethod,
        providers: Providers<'_>,
        reply_tx: mpsc::Sender<OperationResponse>,
    ) -> RequestId {
        let request_id = RequestId::new();
        let span = info_span!("request", request_id = %request_id, method = %method, path = %uri);
        let _entered = span.enter();

        let sink = ResponseSink::new(reply_tx, request_id, Arc::clone(&self.request_id_header));
        match self.table.resolve(uri, method) {
            Ok(route) => {
                let path_shape = route.path_shape;
                let providers = providers.with_path(move || Ok(path_shape));
                route
                    .handler
                    .invoke_with_providers(providers, &self.context, sink);
            }
            Err(err) => {
                warn!(error = %err, "Request rejected: no matching operation");
                sink.send(DispatchError::from(err).into_response());
            }
        }
        request_id
    }

    /// Handle one request and wait for its response
    ///
    /// Blocks the calling thread (or yields the calling coroutine) until the
    /// operation completes. There is no timeout: an operation holding its
    /// completion forever blocks this call forever.
    #[must_use]
    pub fn dispatch(&self, request: &RawRequest) -> OperationResponse {
        let (reply_tx, reply_rx) = mpsc::channel();
        let start = Instant::now();
        let request_id = self.handle(request, reply_tx);

        // may::sync::mpsc has no recv_timeout
        match reply_rx.recv() {
            Ok(response) => {
                debug!(
                    request_id = %request_id,
                    status = response.status,
                    latency_us = start.elapsed().as_micros(),
                    "Response received"
                );
                response
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    error = %e,
                    "Reply channel closed without a response"
                );
                let mut response = DispatchError::Internal {
                    detail: "reply channel closed without a response".to_string(),
                }
                .into_response();
                response.set_header(&self.request_id_header, request_id.to_string());
                response
            }
        }
    }

    /// [`Dispatcher::dispatch`] over `http` crate types
    ///
    /// # Errors
    ///
    /// Returns [`http::Error`] if the response cannot be represented as an
    /// `http::Response` (an operation produced an invalid header).
    pub fn dispatch_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, http::Error> {
        self.dispatch(&RawRequest::from_http(request)).into_http()
    }
}

//! Handler table - hot path for request routing.

use crate::method::HttpMethod;
use crate::shape::{Shape, ShapeError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::template::{split_path, ExtractedVariables, PathTemplate, TemplateError};

/// Routing failure returned by [`HandlerTable::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// No registered handler accepts the URI and method.
    #[error("{reason}")]
    InvalidOperation { reason: String },
}

/// Result of successfully matching a request to a handler
///
/// Exact matches carry empty variables and an empty path shape.
#[derive(Debug)]
pub struct RouteMatch<H> {
    /// The selected handler
    pub handler: Arc<H>,
    /// Variables captured by the template, in segment order
    pub variables: ExtractedVariables,
    /// The variables folded into a [`Shape`] for typed decode
    pub path_shape: Shape,
}

impl<H> RouteMatch<H> {
    /// Get a path variable by name
    ///
    /// # Arguments
    /// * `name` - The variable name (e.g., "id")
    ///
    /// # Returns
    /// The last value captured under `name`, None otherwise
    #[inline]
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name)
    }
}

struct TemplatedEntry<H> {
    method: HttpMethod,
    template: PathTemplate,
    handler: Arc<H>,
}

/// Routing engine that selects one handler per `(uri, method)`
///
/// Holds two structures:
///
/// - an exact table keyed by the lower-cased, `/`-trimmed URI and then by
///   method, consulted first in O(1);
/// - an ordered list of templated entries, scanned in registration order
///   when the exact lookup misses. The first entry whose method matches, whose
///   template matches the path segments and whose variables fold into a valid
///   path [`Shape`] wins.
///
/// The table is filled during startup through `&mut self` and is read-only
/// afterwards, so a shared reference can be used from any number of threads.
///
/// # Example
///
/// ```rust
/// use opsrouter::method::HttpMethod;
/// use opsrouter::router::HandlerTable;
///
/// let mut table = HandlerTable::new();
/// table.register(HttpMethod::Get, "/pets", "list_pets").unwrap();
/// table.register(HttpMethod::Get, "/pets/{id}", "get_pet").unwrap();
///
/// let m = table.resolve("/PETS", &HttpMethod::Get).unwrap();
/// assert_eq!(*m.handler, "list_pets");
///
/// let m = table.resolve("/pets/42", &HttpMethod::Get).unwrap();
/// assert_eq!(*m.handler, "get_pet");
/// assert_eq!(m.get_variable("id"), Some("42"));
/// ```
pub struct HandlerTable<H> {
    exact: HashMap<String, HashMap<HttpMethod, Arc<H>>>,
    templated: Vec<TemplatedEntry<H>>,
    slow_route_threshold: Duration,
}

impl<H> Default for HandlerTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> HandlerTable<H> {
    /// Create an empty table with the default slow-route threshold (1 ms).
    #[must_use]
    pub fn new() -> Self {
        Self::with_slow_route_threshold(Duration::from_micros(
            crate::runtime_config::DEFAULT_SLOW_ROUTE_US,
        ))
    }

    /// Create an empty table that warns when resolution takes longer than `threshold`.
    #[must_use]
    pub fn with_slow_route_threshold(threshold: Duration) -> Self {
        Self {
            exact: HashMap::new(),
            templated: Vec::new(),
            slow_route_threshold: threshold,
        }
    }

    /// Register a handler for a URI pattern and method
    ///
    /// Patterns without variables go into the exact table; re-registering the
    /// same `(uri, method)` replaces the previous handler. Patterns with
    /// variables are appended to the templated list. Registering a template
    /// equivalent to an earlier one for the same method still succeeds, but
    /// the later entry is unreachable and a warning is logged.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method the handler serves
    /// * `pattern` - URI or template such as `/pets/{id}` or `/files/{path+}`
    /// * `handler` - The handler to select
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the pattern is malformed; nothing is registered.
    pub fn register(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        handler: H,
    ) -> Result<(), TemplateError> {
        let template = PathTemplate::tokenize(pattern)?;
        let handler = Arc::new(handler);

        if let Some(key) = template.exact_key() {
            let by_method = self.exact.entry(key).or_default();
            if by_method.insert(method.clone(), handler).is_some() {
                warn!(
                    method = %method,
                    pattern = %pattern,
                    "Exact route registered twice; replacing previous handler"
                );
            } else {
                debug!(method = %method, pattern = %template, kind = "exact", "Route registered");
            }
            return Ok(());
        }

        if let Some(existing) = self
            .templated
            .iter()
            .find(|entry| entry.method == method && entry.template.is_equivalent(&template))
        {
            warn!(
                method = %method,
                pattern = %template,
                shadowed_by = %existing.template,
                "Duplicate template registered; the later route can never be selected"
            );
        } else {
            debug!(method = %method, pattern = %template, kind = "templated", "Route registered");
        }

        self.templated.push(TemplatedEntry {
            method,
            template,
            handler,
        });
        Ok(())
    }

    /// Resolve a request URI and method to a handler
    ///
    /// Any query string or fragment is ignored. The exact table is consulted
    /// with the lower-cased URI; templated entries then match against the
    /// path with its original casing.
    ///
    /// # Arguments
    ///
    /// * `uri` - Request target, e.g. `/pets/42?verbose=true`
    /// * `method` - Request method
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidOperation`] when nothing matches.
    pub fn resolve(&self, uri: &str, method: &HttpMethod) -> Result<RouteMatch<H>, RoutingError> {
        let start = Instant::now();
        let path = strip_query(uri);
        let normalized = path.trim_matches('/');

        if let Some(handler) = self
            .exact
            .get(&normalized.to_lowercase())
            .and_then(|by_method| by_method.get(method))
        {
            self.log_match(method, path, "exact", start.elapsed());
            return Ok(RouteMatch {
                handler: Arc::clone(handler),
                variables: ExtractedVariables::new(),
                path_shape: Shape::empty(),
            });
        }

        let segments: Vec<&str> = split_path(normalized).collect();
        for entry in self.templated.iter().filter(|e| &e.method == method) {
            let Some(variables) = entry.template.match_segments(&segments) else {
                continue;
            };
            match path_shape(&variables) {
                Ok(path_shape) => {
                    self.log_match(method, path, "templated", start.elapsed());
                    return Ok(RouteMatch {
                        handler: Arc::clone(&entry.handler),
                        variables,
                        path_shape,
                    });
                }
                Err(err) => {
                    debug!(
                        method = %method,
                        path = %path,
                        template = %entry.template,
                        error = %err,
                        "Template matched but path variables did not form a valid shape"
                    );
                }
            }
        }

        info!(
            method = %method,
            path = %path,
            duration_us = start.elapsed().as_micros(),
            "No route matched"
        );
        Err(RoutingError::InvalidOperation {
            reason: format!("no handler for {method} {path}"),
        })
    }

    /// Number of registered `(uri, method)` pairs, exact and templated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.values().map(HashMap::len).sum::<usize>() + self.templated.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered routes as `(method, pattern)` for diagnostics
    ///
    /// Exact routes come first, sorted; templated routes follow in the
    /// order they are tried.
    #[must_use]
    pub fn routes(&self) -> Vec<(HttpMethod, String)> {
        let mut exact: Vec<(HttpMethod, String)> = self
            .exact
            .iter()
            .flat_map(|(uri, by_method)| {
                by_method
                    .keys()
                    .map(move |method| (method.clone(), format!("/{uri}")))
            })
            .collect();
        exact.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        exact.extend(
            self.templated
                .iter()
                .map(|entry| (entry.method.clone(), entry.template.to_string())),
        );
        exact
    }

    /// Log the full routing table at `info`
    pub fn log_routes(&self) {
        let routes = self.routes();
        let summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|(method, pattern)| format!("{method} {pattern}"))
            .collect();
        info!(
            routes_count = routes.len(),
            exact_count = self.len() - self.templated.len(),
            templated_count = self.templated.len(),
            routes_summary = ?summary,
            "Routing table loaded"
        );
    }

    fn log_match(&self, method: &HttpMethod, path: &str, kind: &'static str, elapsed: Duration) {
        if elapsed > self.slow_route_threshold {
            warn!(
                method = %method,
                path = %path,
                kind,
                duration_us = elapsed.as_micros(),
                threshold_us = self.slow_route_threshold.as_micros(),
                "Slow route matching detected"
            );
        } else {
            debug!(
                method = %method,
                path = %path,
                kind,
                duration_us = elapsed.as_micros(),
                "Route matched"
            );
        }
    }
}

fn strip_query(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or(uri)
}

fn path_shape(variables: &ExtractedVariables) -> Result<Shape, ShapeError> {
    Shape::from_pairs(variables.iter())
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP router.
//!
//! Routes are grouped by method and kept sorted most-specific-first:
//!
//! 1. more path segments before fewer,
//! 2. at the first differing segment, a literal before a `{param}`,
//! 3. otherwise registration order.
//!
//! A route matches when its segments are a prefix of the request path's
//! segments, `{name}` binding exactly one segment. The bare `/` route has no
//! segments and therefore matches everything for its method, after every other
//! route has been tried. Query strings and empty segments (trailing or doubled
//! slashes) are ignored while matching.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{HttpContext, HttpRequest, QueryParams};
use crate::error::FaasError;
use crate::middleware::{Handler, HandlerMiddleware, Middleware, Next, Outcome, invoke};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    /// Same position shape: equal literals, or two params of any name.
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
        }
    }
}

/// A (method, pattern) to middleware binding.
pub struct Route {
    method: String,
    pattern: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
    middleware: Arc<dyn Middleware<HttpContext>>,
    order: usize,
}

impl Route {
    fn new(
        method: &str,
        pattern: &str,
        middleware: Arc<dyn Middleware<HttpContext>>,
        order: usize,
    ) -> Result<Self, FaasError> {
        let method = method.trim();
        if method.is_empty() {
            return Err(FaasError::Config(format!(
                "route {} has no method",
                pattern
            )));
        }
        let segments = parse_pattern(pattern)?;
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect();

        Ok(Self {
            method: method.to_ascii_uppercase(),
            pattern: pattern.to_string(),
            segments,
            param_names,
            middleware,
            order,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in pattern order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware<HttpContext>> {
        &self.middleware
    }

    /// Type name of the bound middleware.
    pub fn type_name(&self) -> &'static str {
        self.middleware.type_name()
    }

    fn matches(&self, path: &[&str]) -> bool {
        self.segments.len() <= path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, value)| match segment {
                    Segment::Literal(lit) => lit == value,
                    Segment::Param(_) => true,
                })
    }

    fn extract(&self, path: &[&str]) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(path)
            .filter_map(|(segment, value)| match segment {
                Segment::Param(name) => Some((name.clone(), (*value).to_string())),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn same_path(&self, other: &Route) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    fn specificity(&self, other: &Route) -> Ordering {
        other
            .segments
            .len()
            .cmp(&self.segments.len())
            .then_with(|| {
                self.segments
                    .iter()
                    .zip(&other.segments)
                    .map(|(a, b)| a.rank().cmp(&b.rank()))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.order.cmp(&other.order))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("param_names", &self.param_names)
            .field("middleware", &self.type_name())
            .finish()
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, FaasError> {
    if !pattern.starts_with('/') {
        return Err(FaasError::Config(format!(
            "route pattern '{}' must start with '/'",
            pattern
        )));
    }
    if pattern.contains(['?', '#']) {
        return Err(FaasError::Config(format!(
            "route pattern '{}' must be a path without query or fragment",
            pattern
        )));
    }

    let mut segments = Vec::new();
    for raw in path_segments(pattern) {
        let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if is_param_name(name) => Segment::Param(name.to_string()),
            Some(_) => {
                return Err(FaasError::Config(format!(
                    "route pattern '{}' has an invalid placeholder '{}'",
                    pattern, raw
                )));
            }
            None if raw.contains(['{', '}']) => {
                return Err(FaasError::Config(format!(
                    "route pattern '{}' has a malformed segment '{}'",
                    pattern, raw
                )));
            }
            None => Segment::Literal(raw.to_string()),
        };
        if let Segment::Param(name) = &segment
            && segments
                .iter()
                .any(|s| matches!(s, Segment::Param(n) if n == name))
        {
            return Err(FaasError::Config(format!(
                "route pattern '{}' repeats placeholder '{}'",
                pattern, name
            )));
        }
        segments.push(segment);
    }
    Ok(segments)
}

fn is_param_name(name: &str) -> bool {
    let valid = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    !name.is_empty() && name.chars().all(valid)
}

fn path_segments(path: &str) -> Vec<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Default fallback: 404 `text/plain` "Not Found".
pub struct NotFound;

#[async_trait]
impl Middleware<HttpContext> for NotFound {
    async fn handle(
        &self,
        mut ctx: HttpContext,
        _next: Next<'_, HttpContext>,
    ) -> Outcome<HttpContext> {
        ctx.response_mut().set_status(404).set_text("Not Found");
        Ok(Some(ctx))
    }
}

/// Method and path based dispatch, usable as a single middleware.
pub struct Router {
    routes: HashMap<String, Vec<Route>>,
    not_found: Route,
    registered: usize,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("not_found", &self.not_found.type_name())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: Self::fallback(Arc::new(NotFound)),
            registered: 0,
        }
    }

    fn fallback(middleware: Arc<dyn Middleware<HttpContext>>) -> Route {
        Route {
            method: "*".to_string(),
            pattern: "/".to_string(),
            segments: Vec::new(),
            param_names: Vec::new(),
            middleware,
            order: usize::MAX,
        }
    }

    /// Register `middleware` for `method` and `pattern`.
    ///
    /// Fails when the method is empty, the pattern is malformed or the same
    /// method and path are already registered.
    pub fn route<M>(
        &mut self,
        method: &str,
        pattern: &str,
        middleware: M,
    ) -> Result<&mut Self, FaasError>
    where
        M: Middleware<HttpContext> + 'static,
    {
        self.add(method, pattern, Arc::new(middleware))
    }

    /// Register a handler; it continues with the router's `next` afterwards.
    pub fn route_handler<H>(
        &mut self,
        method: &str,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.add(method, pattern, Arc::new(HandlerMiddleware::new(handler)))
    }

    pub fn get<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.route_handler("GET", pattern, handler)
    }

    pub fn post<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.route_handler("POST", pattern, handler)
    }

    pub fn put<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.route_handler("PUT", pattern, handler)
    }

    pub fn patch<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.route_handler("PATCH", pattern, handler)
    }

    pub fn delete<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, FaasError>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.route_handler("DELETE", pattern, handler)
    }

    /// Replace the fallback used when no route matches.
    pub fn not_found<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<HttpContext> + 'static,
    {
        self.not_found = Self::fallback(Arc::new(middleware));
        self
    }

    fn add(
        &mut self,
        method: &str,
        pattern: &str,
        middleware: Arc<dyn Middleware<HttpContext>>,
    ) -> Result<&mut Self, FaasError> {
        let route = Route::new(method, pattern, middleware, self.registered)?;
        let routes = self.routes.entry(route.method.clone()).or_default();

        if let Some(existing) = routes.iter().find(|r| r.same_path(&route)) {
            return Err(FaasError::Config(format!(
                "duplicate route {} {}: already handled by {} (registered as {})",
                route.method,
                route.pattern,
                existing.type_name(),
                existing.pattern
            )));
        }

        debug!(
            method = %route.method,
            pattern = %route.pattern,
            middleware = route.type_name(),
            "route registered"
        );

        let at = routes
            .iter()
            .position(|r| route.specificity(r).is_lt())
            .unwrap_or(routes.len());
        routes.insert(at, route);
        self.registered += 1;
        Ok(self)
    }

    /// Best route for the request, or the not-found route.
    pub fn get_route(&self, ctx: &HttpContext) -> &Route {
        let request = ctx.request();
        let segments = path_segments(request.path());
        self.routes
            .get(&request.method().to_ascii_uppercase())
            .and_then(|routes| routes.iter().find(|r| r.matches(&segments)))
            .unwrap_or(&self.not_found)
    }

    /// Routes for `method` in match order.
    pub fn routes(&self, method: &str) -> &[Route] {
        self.routes
            .get(&method.to_ascii_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

/// Request carrying the matched path parameters and any query parameters
/// that only appeared in the raw path.
fn routed_request(request: &HttpRequest, route: &Route) -> HttpRequest {
    let segments = path_segments(request.path());
    let mut params = request.path_params().clone();
    params.extend(route.extract(&segments));

    let mut query = request.query().clone();
    if let Some((_, raw_query)) = request.path().split_once('?') {
        for (name, values) in QueryParams::parse(raw_query).iter() {
            if !query.contains(name) {
                for value in values {
                    query.add(name, value.as_str());
                }
            }
        }
    }

    HttpRequest::builder_from(request)
        .path_params(params)
        .query(query)
        .build()
}

#[async_trait]
impl Middleware<HttpContext> for Router {
    async fn handle(
        &self,
        ctx: HttpContext,
        next: Next<'_, HttpContext>,
    ) -> Outcome<HttpContext> {
        let route = self.get_route(&ctx);
        debug!(
            method = %ctx.request().method(),
            path = %ctx.request().path(),
            route = %route.pattern,
            middleware = route.type_name(),
            "routing request"
        );

        let request = routed_request(ctx.request(), route);
        invoke(route.middleware.as_ref(), ctx.with_request(request), next).await
    }
}

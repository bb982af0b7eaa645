use std::collections::HashMap;

use tracing::{debug, trace};

use crate::types::{Extraction, HOST_PATH_SEPARATOR};
use crate::{MatchError, MatchedRoute, RouteCollection};

/// Selects the route for a request.
///
/// Candidates are the routes registered for the request method, tried in
/// registration order. The first whose pattern matches, whose variable rules
/// all pass, and whose headers are present wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteMatcher;

impl RouteMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Match a request against `collection`. Leading `/` characters of `path`
    /// are ignored; `method` is compared case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::MethodNotAllowed`] when no route for `method`
    /// matches the host and path at all but a route registered for another
    /// method does, with its rules satisfied. Otherwise
    /// [`MatchError::RouteNotFound`], including when a route for `method`
    /// matched the path and was then rejected by a rule or a header.
    pub fn match_request<'c>(
        &self,
        method: &str,
        host: &str,
        path: &str,
        headers: &HashMap<String, String>,
        collection: &'c RouteCollection,
    ) -> Result<MatchedRoute<'c>, MatchError> {
        let subject = subject(host, path);
        // A same-method route that matched the path but failed a rule or a
        // header rules out a 405.
        let mut path_matched = false;

        for route in collection.get_by_method(method) {
            let compiled = route.template.compiled();
            match compiled.extract(&subject) {
                Extraction::NoMatch => {
                    trace!(pattern = compiled.pattern(), "candidate pattern did not match");
                }
                Extraction::Rejected { variable, rule } => {
                    path_matched = true;
                    trace!(
                        pattern = compiled.pattern(),
                        %variable,
                        %rule,
                        "candidate rejected by rule"
                    );
                }
                Extraction::Matched(variables) => {
                    if !route.headers_match(headers) {
                        path_matched = true;
                        trace!(pattern = compiled.pattern(), "candidate rejected by headers");
                        continue;
                    }
                    debug!(
                        method,
                        path,
                        route = route.name().unwrap_or_else(|| route.template.path_template()),
                        "matched route"
                    );
                    return Ok(MatchedRoute::new(route, variables));
                }
            }
        }

        if path_matched {
            debug!(method, path, "no route found");
            return Err(MatchError::RouteNotFound);
        }
        let allowed = allowed_methods(method, &subject, collection);
        if allowed.is_empty() {
            debug!(method, path, "no route found");
            return Err(MatchError::RouteNotFound);
        }
        debug!(method, path, ?allowed, "method not allowed");
        Err(MatchError::MethodNotAllowed {
            method: method.to_owned(),
            allowed,
        })
    }
}

fn subject(host: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    let mut subject = String::with_capacity(host.len() + 1 + path.len());
    subject.push_str(host);
    subject.push(HOST_PATH_SEPARATOR);
    subject.push_str(path);
    subject
}

/// Methods of the routes, registered for some other method, that would accept
/// this host and path. Sorted and deduplicated.
fn allowed_methods(method: &str, subject: &str, collection: &RouteCollection) -> Vec<String> {
    let mut allowed: Vec<String> = collection
        .routes()
        .iter()
        .filter(|route| !route.accepts_method(method))
        .filter(|route| {
            matches!(
                route.template.compiled().extract(subject),
                Extraction::Matched(_)
            )
        })
        .flat_map(|route| route.methods().iter().cloned())
        .collect();
    allowed.sort_unstable();
    allowed.dedup();
    allowed
}

use std::collections::HashMap;

use super::route::Route;
use super::value::Value;

/// A successful match: the selected route and its typed variables.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct MatchedRoute<'c> {
    route: &'c Route,
    variables: HashMap<String, Value>,
}

impl<'c> MatchedRoute<'c> {
    pub(crate) fn new(route: &'c Route, variables: HashMap<String, Value>) -> Self {
        Self { route, variables }
    }

    #[must_use]
    pub fn route(&self) -> &'c Route {
        self.route
    }

    #[must_use]
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn into_variables(self) -> HashMap<String, Value> {
        self.variables
    }
}

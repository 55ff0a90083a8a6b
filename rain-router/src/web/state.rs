//! Application state for the web layer.

use std::sync::Arc;
use std::time::Duration;

use crate::occurrences::OccurrenceStore;
use crate::planner::RouteEngine;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
pub struct AppState<S> {
    /// Route engine over the shared network
    pub engine: Arc<RouteEngine<S>>,

    /// Daily occurrence reports, if configured
    pub occurrences: Option<Arc<OccurrenceStore>>,

    /// Bound on a single route computation
    pub deadline: Duration,
}

impl<S> AppState<S> {
    /// Create a new app state.
    pub fn new(
        engine: RouteEngine<S>,
        occurrences: Option<OccurrenceStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            occurrences: occurrences.map(Arc::new),
            deadline,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            occurrences: self.occurrences.clone(),
            deadline: self.deadline,
        }
    }
}

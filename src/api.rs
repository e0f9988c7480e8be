//! HTTP API for the city router
//!
//! A thin surface over [`RouterWorkflow`]: every query is one run.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::workflow::RouterWorkflow;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<RouterWorkflow>,
}

impl AppState {
    pub fn new(workflow: RouterWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

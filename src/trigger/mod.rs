//! Trigger surfaces for the hand-in workflow
//!
//! - [`schedule`] - wakes at configured local times and runs once per tick
//! - [`http`] - axum router running the workflow on request
//!
//! Both go through a [`Runner`], which lets only one run proceed at a time.

pub mod http;
pub mod schedule;

pub use http::router;
pub use schedule::{ScheduledTrigger, TickSchedule};

use tokio::sync::Mutex;

use crate::workflow::{HandInWorkflow, RunReport};

/// Serializes workflow runs across triggers
pub struct Runner {
    workflow: HandInWorkflow,
    gate: Mutex<()>,
}

impl Runner {
    pub fn new(workflow: HandInWorkflow) -> Self {
        Self {
            workflow,
            gate: Mutex::new(()),
        }
    }

    pub fn workflow(&self) -> &HandInWorkflow {
        &self.workflow
    }

    /// Run the workflow, waiting for any run already in progress
    pub async fn run(&self) -> RunReport {
        let _guard = self.gate.lock().await;
        self.workflow.run().await
    }

    /// Whether a run is in progress right now
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

//! Task execution host contract.
//!
//! The surrounding tool owns task scheduling; this crate only needs to query
//! previously provided tasks by type and ask for one to be executed.
//! [`LocalTaskHost`] is the in-process implementation backed directly by the
//! provider, used by the demo binary and tests.

use std::sync::Arc;

use async_trait::async_trait;

use super::definition::{ServerTask, TASK_TYPE};
use super::provider::ServerTaskProvider;

#[async_trait]
pub trait TaskHost: Send + Sync {
    /// All known tasks of the given type.
    async fn fetch_tasks(&self, task_type: &str) -> Vec<ServerTask>;

    /// Execute a task, instantiating (or reusing) its terminal.
    async fn execute(&self, task: &ServerTask);
}

/// Host implementation that short-circuits to the provider itself.
pub struct LocalTaskHost {
    provider: Arc<ServerTaskProvider>,
}

impl LocalTaskHost {
    pub fn new(provider: Arc<ServerTaskProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskHost for LocalTaskHost {
    async fn fetch_tasks(&self, task_type: &str) -> Vec<ServerTask> {
        if task_type == TASK_TYPE {
            self.provider.provide_tasks()
        } else {
            Vec::new()
        }
    }

    async fn execute(&self, task: &ServerTask) {
        self.provider.execute_task(&task.definition);
    }
}

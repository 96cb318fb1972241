//! "Run preview server" task: definitions, pseudo-terminal, coordinator, and
//! the execution-host contract.

pub mod definition;
pub mod host;
pub mod provider;
pub mod terminal;

pub use definition::{
    ServerMsg, ServerStartedStatus, ServerTask, TaskDefinition, TASK_TYPE, VERBOSE_ARG,
};
pub use host::{LocalTaskHost, TaskHost};
pub use provider::ServerTaskProvider;
pub use terminal::ServerTaskTerminal;

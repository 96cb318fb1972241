//! preview-bridge — glue between a locally bound dev preview server and the
//! tool that hosts it.
//!
//! Two components, generalized from editor-extension territory:
//!
//! - [`connection`]: authoritative host/port state per workspace, resolving
//!   externally reachable URIs through a pluggable
//!   [`resolver::ExternalUriResolver`] (tunneled/remote development remaps
//!   local binds onto forwarded addresses).
//! - [`task`]: a task-provider contract for the "run preview server" task,
//!   coordinating a workspace-keyed registry of pseudo-terminals and relaying
//!   lifecycle events between the server manager and each terminal.
//!
//! Host specifics (task UI, terminal rendering, URI externalization
//! transport, telemetry transport) stay behind traits; everything here runs
//! on plain tokio.

pub mod config;
pub mod connection;
pub mod events;
pub mod paths;
pub mod resolver;
pub mod task;
pub mod telemetry;
pub mod workspace;

pub use config::BridgeConfig;
pub use connection::{Connection, ConnectionInfo, ConnectionManager};
pub use events::{EventEmitter, Subscription};
pub use resolver::{ExternalUriResolver, LoopbackResolver, ResolveError};
pub use task::{ServerTaskProvider, ServerTaskTerminal};
pub use workspace::{WorkspaceFolder, WorkspaceKey, WorkspaceRegistry};

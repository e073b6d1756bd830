//! Tool dispatch for the research agent.
//!
//! A [`Dispatcher`] takes a query and a set of registered tools, runs the
//! relevant ones concurrently under per-tool timeout and retry, and returns
//! a [`ResultBundle`] with exactly one outcome per selected tool.

mod bundle;
mod dispatcher;
mod error;
mod registry;
mod types;
pub mod builtin;

pub use bundle::{OutcomeKind, ResultBundle, ToolOutcome, ToolResult};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, ToolError};
pub use registry::ToolRegistry;
pub use types::*;

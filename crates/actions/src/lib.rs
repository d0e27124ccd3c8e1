//! `actions` crate: the action model, the per-invocation execution context,
//! and the `ActionHandler` registry the engine dispatches through.
//!
//! Every action kind, built-in or tenant plugin, is executed by an
//! [`ActionHandler`] registered for its [`ActionKind`].

pub mod action;
pub mod context;
pub mod error;
pub mod logging;
pub mod mock;
pub mod registry;
pub mod result;
pub mod traits;

pub use action::{Action, ActionKind, CardTarget};
pub use context::{CardSnapshot, RuleExecutionContext, TriggerEvent};
pub use error::ActionError;
pub use registry::ActionRegistry;
pub use result::ActionExecutionResult;
pub use traits::{ActionExecutor, ActionHandler, ActionOutput};

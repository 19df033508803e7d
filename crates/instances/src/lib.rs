//! Instance orchestration: the registry of named instances, their
//! kind-specific controllers and the dispatcher running their commands.
//!
//! Request handlers only ever talk to [`InstanceRegistry`] and
//! [`CommandDispatcher`]. State and chart data of a resident instance live in
//! its [`InstanceHandle`], which clients poll through the version counters.

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod output;
pub mod registry;

#[cfg(test)]
mod testing;

pub use controller::{ControllerContext, InstanceController};
pub use dispatcher::{CommandDispatcher, CommandTicket};
pub use error::{CommandError, InstanceError};
pub use handle::InstanceHandle;
pub use output::InstanceOutput;
pub use registry::InstanceRegistry;

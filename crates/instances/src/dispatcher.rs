use crate::controller::InstanceController;
use crate::error::{CommandError, InstanceError};
use core_types::{InputMap, OutputSink};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A command handed to the runtime. Dropping it detaches the command.
#[derive(Debug)]
pub struct CommandTicket {
    pub id: Uuid,
    pub handle: JoinHandle<()>,
}

/// Runs controller commands on their own tasks, off the request path.
///
/// Commands of different instances are unordered; commands of the same
/// instance may interleave. A failing or panicking command is reported to its
/// instance's output and affects nothing else.
#[derive(Debug, Clone, Default)]
pub struct CommandDispatcher {
    in_flight: Arc<AtomicUsize>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Schedules the command bound to `button` and returns immediately. Fails
    /// without scheduling anything if the button has no enabled action.
    pub fn dispatch(
        &self,
        controller: Arc<InstanceController>,
        button: u32,
        input: InputMap,
    ) -> Result<CommandTicket, InstanceError> {
        let name = controller.handle().name().to_string();
        let action = controller
            .action(button)
            .ok_or_else(|| InstanceError::InvalidButton {
                name: name.clone(),
                button,
            })?;

        let id = Uuid::new_v4();
        let guard = InFlight::enter(Arc::clone(&self.in_flight));
        let handle = tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(instance = %name, command_id = %id, button, %action, "Running command.");
            let outcome = AssertUnwindSafe(controller.handle_command(button, input))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => {
                    tracing::info!(instance = %name, command_id = %id, "Command finished.");
                    return;
                }
                Ok(Err(error)) => error,
                Err(panic) => CommandError::Panicked(panic_message(panic.as_ref())),
            };
            tracing::warn!(instance = %name, command_id = %id, error = %error, "Command failed.");
            controller.output().write(&format!("Error: {error}"));
        });
        Ok(CommandTicket { id, handle })
    }
}

/// Counts a command as in flight until dropped, however its task ends.
#[derive(Debug)]
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

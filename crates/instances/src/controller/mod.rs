//! Kind-specific behaviour bound to one instance.
//!
//! [`InstanceController`] is a closed sum over the three kinds. Every variant
//! works on the [`InstanceHandle`] it was built with and owns no storage of its
//! own.

mod backtest;
pub mod input;
mod live;
mod train;

pub use backtest::BacktestController;
pub use live::LiveController;
pub use train::TrainController;

use crate::error::CommandError;
use crate::handle::InstanceHandle;
use crate::output::InstanceOutput;
use core_types::{InputMap, InstanceKind};
use persistence::PersistenceStore;
use std::sync::Arc;

/// What a controller is bound to.
#[derive(Clone)]
pub struct ControllerContext {
    pub handle: Arc<InstanceHandle>,
    pub store: Arc<dyn PersistenceStore>,
}

pub enum InstanceController {
    Backtest(BacktestController),
    Live(LiveController),
    Train(TrainController),
}

impl InstanceController {
    /// Builds the controller variant for `kind`.
    pub fn new(kind: InstanceKind, ctx: ControllerContext) -> Self {
        match kind {
            InstanceKind::Backtest => InstanceController::Backtest(BacktestController::new(ctx)),
            InstanceKind::Live => InstanceController::Live(LiveController::new(ctx)),
            InstanceKind::Train => InstanceController::Train(TrainController::new(ctx)),
        }
    }

    pub fn kind(&self) -> InstanceKind {
        match self {
            InstanceController::Backtest(_) => InstanceKind::Backtest,
            InstanceController::Live(_) => InstanceKind::Live,
            InstanceController::Train(_) => InstanceKind::Train,
        }
    }

    fn context(&self) -> &ControllerContext {
        match self {
            InstanceController::Backtest(c) => c.context(),
            InstanceController::Live(c) => c.context(),
            InstanceController::Train(c) => c.context(),
        }
    }

    pub fn handle(&self) -> &Arc<InstanceHandle> {
        &self.context().handle
    }

    pub fn output(&self) -> InstanceOutput {
        InstanceOutput::new(Arc::clone(self.handle()))
    }

    /// Input keys and defaults the kind declares.
    pub fn required_input(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            InstanceController::Backtest(_) => BacktestController::required_input(),
            InstanceController::Live(_) => LiveController::required_input(),
            InstanceController::Train(_) => TrainController::required_input(),
        }
    }

    fn actions(&self) -> (&'static str, &'static str) {
        match self {
            InstanceController::Backtest(_) => BacktestController::ACTIONS,
            InstanceController::Live(_) => LiveController::ACTIONS,
            InstanceController::Train(_) => TrainController::ACTIONS,
        }
    }

    /// Seeds the action labels and any missing default input. Re-running it
    /// changes nothing.
    pub fn initialize(&self) {
        let (action1, action2) = self.actions();
        let required = self.required_input();
        self.handle().update_state_if(|state| {
            let mut changed = state.set_actions(action1, action2);
            for (key, default) in required {
                changed |= state.add_input_key(key, default);
            }
            changed
        });
    }

    /// Releases resources held by the controller. None of the kinds hold any.
    pub fn teardown(&self) {
        tracing::debug!(instance = %self.handle().name(), kind = %self.kind(), "Controller torn down.");
    }

    /// The label of an enabled 1-based button.
    pub fn action(&self, button: u32) -> Option<String> {
        self.handle().state().action(button).map(str::to_string)
    }

    /// Merges `overrides` into the stored input, then runs the command bound to
    /// `button` with the merged input.
    pub async fn handle_command(&self, button: u32, overrides: InputMap) -> Result<(), CommandError> {
        let input = self.handle().update_state(|state| {
            state.input.extend(overrides);
            state.input.clone()
        });
        match (self, button) {
            (InstanceController::Backtest(c), 1) => c.run(input).await,
            (InstanceController::Live(c), 1) => c.start(input).await,
            (InstanceController::Train(c), 1) => c.load_series(input).await,
            (InstanceController::Train(c), 2) => c.build_model(input).await,
            (_, other) => Err(CommandError::InvalidButton(other)),
        }
    }
}

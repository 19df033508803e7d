use crate::handle::InstanceHandle;
use core_types::OutputSink;
use std::sync::Arc;

/// Appends lines to an instance's output log, mirroring them to the tracing
/// subscriber.
#[derive(Debug, Clone)]
pub struct InstanceOutput {
    handle: Arc<InstanceHandle>,
}

impl InstanceOutput {
    pub fn new(handle: Arc<InstanceHandle>) -> Self {
        Self { handle }
    }
}

impl OutputSink for InstanceOutput {
    fn write(&self, line: &str) {
        tracing::info!(instance = %self.handle.name(), "{line}");
        self.handle.update_state(|state| state.append_output(line));
    }
}

//! Log sinks for engine output

use crate::core::LogSink;
use log::info;

/// Discards all engine output. The default for training and cross validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl LogSink for SilentSink {
    fn print(&self, _message: &str) {}
}

/// Forwards engine output to the `log` facade under the `svm_engine` target
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecordSink;

impl LogSink for LogRecordSink {
    fn print(&self, message: &str) {
        let message = message.trim_end();
        if !message.is_empty() {
            info!(target: "svm_engine", "{message}");
        }
    }
}

//! Routes database log messages to `tracing` and the configured callback.

use crate::config::Logging;

#[derive(Clone, Debug, Default)]
pub(crate) struct Logger {
    logging: Logging,
}

impl Logger {
    pub(crate) fn new(logging: Logging) -> Self {
        Self { logging }
    }

    /// Logs an operation. The message is only built when logging is on.
    pub(crate) fn debug(&self, message: impl FnOnce() -> String) {
        match &self.logging {
            Logging::Off => {}
            Logging::Tracing => {
                let message = message();
                tracing::debug!(target: "tabula", "{message}");
            }
            Logging::Callback(sink) => {
                let message = message();
                tracing::debug!(target: "tabula", "{message}");
                sink(&message);
            }
        }
    }

    /// Reports a failure that does not abort the operation. Always emitted
    /// to `tracing`.
    pub(crate) fn warn(&self, message: &str) {
        tracing::warn!(target: "tabula", "{message}");
        if let Logging::Callback(sink) = &self.logging {
            sink(message);
        }
    }

    /// Sends a message to the callback sink only. Used where the message was
    /// already traced further down.
    pub(crate) fn notify(&self, message: impl FnOnce() -> String) {
        if let Logging::Callback(sink) = &self.logging {
            sink(&message());
        }
    }
}

use crate::config::HandlerConfig;
use crate::exception::hook::{Classify, Identity};
use crate::exception::{cause, trace};
use crate::failure::Failure;
use crate::record::{DEFAULT_ERROR_STATUS, ErrorRecord};
use axum::http::StatusCode;
use std::sync::Arc;

/// Prefix of the single trace line written when the trace could not be read.
pub const TRACE_ERROR_PREFIX: &str = "Error getting original stack trace: ";

/// Turns a failure into a fully populated [`ErrorRecord`].
///
/// Order of work: base record, classification hook, cause chain, trace. The
/// hook cannot influence the cause chain or the trace.
#[derive(Clone)]
pub struct ErrorClassifier {
    config: Arc<HandlerConfig>,
    hook: Arc<dyn Classify>,
}

impl ErrorClassifier {
    /// Turns on failure trace capture when `config` shows traces.
    pub fn new(config: Arc<HandlerConfig>) -> Self {
        if config.show_stack_trace {
            crate::failure::enable_trace_capture();
        }
        Self {
            config,
            hook: Arc::new(Identity),
        }
    }

    pub fn with_hook(mut self, hook: impl Classify) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Record built from the failure alone. `status` is the response status
    /// at failure time and is kept only when it already denotes an error.
    pub fn base_record(failure: &Failure, status: Option<StatusCode>, requested_url: &str) -> ErrorRecord {
        let status = status
            .map(|status| status.as_u16())
            .filter(|status| *status > 399)
            .unwrap_or(DEFAULT_ERROR_STATUS);

        let mut record = ErrorRecord::new(failure.message(), failure.kind()).with_status(status);
        record.requested_url = requested_url.to_string();
        record
    }

    pub fn classify(&self, failure: &Failure, status: Option<StatusCode>, requested_url: &str) -> ErrorRecord {
        let record = Self::base_record(failure, status, requested_url);
        let mut record = self.hook.classify(record, failure);

        record.inner_exception = cause::walk(failure.cause());

        if self.config.show_stack_trace {
            let lines = trace::filter(failure, &self.config.omit_sources)
                .unwrap_or_else(|err| vec![format!("{TRACE_ERROR_PREFIX}{err}")]);
            record.stack_trace = Some(lines);
        }

        record
    }
}

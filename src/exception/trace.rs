//! Filtering of captured call traces.
//!
//! Traces are read from the std backtrace text format:
//!
//! ```text
//!    0: my_app::handlers::create_order
//!              at ./src/handlers.rs:42:9
//!    1: <F as axum::handler::Handler<(M,T1),S>>::call::{{closure}}
//!              at /home/dev/.cargo/registry/src/axum-0.8.4/src/handler/mod.rs:254:52
//! ```
//!
//! Inlined frames show up as extra symbol lines without an index.

use crate::failure::{Failure, Trace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::backtrace::BacktraceStatus;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

static FRAME_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+:\s+)?(?P<symbol>.+)$").expect("frame header pattern"));

static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^at\s+(?P<file>.+?):(?P<line>\d+)(?::(?P<column>\d+))?$")
        .expect("location pattern")
});

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("backtraces are not supported on this platform")]
    Unsupported,

    #[error("source location `{0}` does not belong to any frame")]
    OrphanLocation(String),
}

/// One parsed call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Frame {
    fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    pub fn has_line_number(&self) -> bool {
        self.line.is_some()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)?;
        if let (Some(file), Some(line)) = (&self.file, self.line) {
            write!(f, " at {file}:{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        Ok(())
    }
}

/// Filtered, rendered frames of the failure's trace, in call order.
///
/// Frames without a line number and frames whose rendering contains any of
/// `omit_sources` are dropped. A failure without a trace gives an empty list.
pub fn filter(failure: &Failure, omit_sources: &BTreeSet<String>) -> Result<Vec<String>, TraceError> {
    match failure.trace() {
        Trace::Captured(backtrace) => match backtrace.status() {
            BacktraceStatus::Captured => filter_rendered(&backtrace.to_string(), omit_sources),
            BacktraceStatus::Unsupported => Err(TraceError::Unsupported),
            _ => Ok(Vec::new()),
        },
        Trace::Rendered(text) => filter_rendered(text, omit_sources),
        Trace::Absent => Ok(Vec::new()),
    }
}

/// [`filter`] over trace text in the std backtrace format.
pub fn filter_rendered(
    text: &str,
    omit_sources: &BTreeSet<String>,
) -> Result<Vec<String>, TraceError> {
    let lines = parse(text)?
        .into_iter()
        .filter(Frame::has_line_number)
        .map(|frame| frame.to_string())
        .filter(|rendered| !omit_sources.iter().any(|omit| rendered.contains(omit.as_str())))
        .collect();
    Ok(lines)
}

/// Parses trace text into frames, keeping their order.
pub fn parse(text: &str) -> Result<Vec<Frame>, TraceError> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("at ") {
            let frame = frames
                .last_mut()
                .ok_or_else(|| TraceError::OrphanLocation(line.to_string()))?;
            if frame.file.is_none() {
                if let Some(location) = LOCATION.captures(line) {
                    frame.file = Some(location["file"].to_string());
                    frame.line = location["line"].parse().ok();
                    frame.column = location
                        .name("column")
                        .and_then(|column| column.as_str().parse().ok());
                }
            }
            continue;
        }

        if let Some(header) = FRAME_HEADER.captures(line) {
            frames.push(Frame::new(&header["symbol"]));
        }
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc123/library/std/src/backtrace.rs:312:13
   1: json_exception_handler::failure::Failure::new
             at ./src/failure/mod.rs:80:20
   2: orders::create_order
             at ./src/orders.rs:42:9
      orders::validate
             at ./src/orders.rs:17:5
   3: __libc_start_main
   4: _start
             at ./src/interceptor/layer.rs:120";

    fn omit(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_parse_keeps_order_and_inlined_frames() {
        let frames = parse(SAMPLE).unwrap();
        let symbols: Vec<_> = frames.iter().map(|frame| frame.symbol.as_str()).collect();
        assert_eq!(
            symbols,
            [
                "std::backtrace::Backtrace::force_capture",
                "json_exception_handler::failure::Failure::new",
                "orders::create_order",
                "orders::validate",
                "__libc_start_main",
                "_start",
            ]
        );
        assert_eq!(frames[2].line, Some(42));
        assert_eq!(frames[2].column, Some(9));
        assert_eq!(frames[5].column, None);
        assert!(!frames[4].has_line_number());
    }

    #[test]
    fn test_frames_without_line_numbers_are_dropped() {
        let lines = filter_rendered(SAMPLE, &BTreeSet::new()).unwrap();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|line| !line.contains("__libc_start_main")));
        assert_eq!(lines[2], "orders::create_order at ./src/orders.rs:42:9");
        assert_eq!(lines[4], "_start at ./src/interceptor/layer.rs:120");
    }

    #[test]
    fn test_omitted_sources_are_dropped() {
        let lines = filter_rendered(SAMPLE, &omit(&["/rustc/", "interceptor/layer.rs"])).unwrap();
        assert_eq!(
            lines,
            [
                "json_exception_handler::failure::Failure::new at ./src/failure/mod.rs:80:20",
                "orders::create_order at ./src/orders.rs:42:9",
                "orders::validate at ./src/orders.rs:17:5",
            ]
        );
    }

    #[test]
    fn test_omission_matches_symbols_too() {
        let lines = filter_rendered(SAMPLE, &omit(&["orders::"])).unwrap();
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_location_without_frame_is_an_error() {
        let err = filter_rendered("at ./src/orphan.rs:1:1", &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, TraceError::OrphanLocation(_)));
    }

    #[test]
    fn test_absent_trace_is_empty() {
        let failure = Failure::from_boxed("no trace".into()).without_trace();
        assert!(filter(&failure, &BTreeSet::new()).unwrap().is_empty());
    }

    #[test]
    fn test_captured_trace_contains_this_test() {
        crate::failure::enable_trace_capture();
        let failure = Failure::new(std::fmt::Error);
        let lines = filter(&failure, &BTreeSet::new()).unwrap();
        assert!(!lines.is_empty());
        assert!(lines.iter().any(|line| line.contains("test_captured_trace_contains_this_test")));
    }
}

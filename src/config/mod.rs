use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;

/// Environment variable enabling stack traces in error documents.
pub const SHOW_STACK_TRACE_VAR: &str = "EXCEPTION_SHOW_STACK_TRACE";

/// Environment variable with comma separated frame omission substrings.
pub const OMIT_SOURCES_VAR: &str = "EXCEPTION_OMIT_SOURCES";

/// Options for the exception interceptor.
///
/// Built once at setup and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerConfig {
    /// Include the filtered call trace in error documents. Usually only
    /// enabled in development.
    pub show_stack_trace: bool,

    /// Substrings of file paths or symbols; frames containing any of them
    /// are left out of the trace.
    pub omit_sources: BTreeSet<String>,
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile for local development: traces are shown.
    pub fn development() -> Self {
        Self::default().with_stack_trace(true)
    }

    /// Reads the options from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the options through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let show_stack_trace = lookup(SHOW_STACK_TRACE_VAR)
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(false);

        let omit_sources = lookup(OMIT_SOURCES_VAR)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            show_stack_trace,
            omit_sources,
        }
    }

    pub fn with_stack_trace(mut self, show: bool) -> Self {
        self.show_stack_trace = show;
        self
    }

    pub fn omit_source(mut self, source: impl Into<String>) -> Self {
        self.omit_sources.insert(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert!(!config.show_stack_trace);
        assert!(config.omit_sources.is_empty());
        assert!(HandlerConfig::development().show_stack_trace);
    }

    #[test]
    fn test_from_lookup() {
        let config = HandlerConfig::from_lookup(lookup(&[
            (SHOW_STACK_TRACE_VAR, " TRUE "),
            (OMIT_SOURCES_VAR, "/rustc/, tokio-,,hyper"),
        ]));

        assert!(config.show_stack_trace);
        assert_eq!(
            config.omit_sources.iter().map(String::as_str).collect::<Vec<_>>(),
            ["/rustc/", "hyper", "tokio-"]
        );
    }

    #[test]
    fn test_from_lookup_without_variables() {
        let config = HandlerConfig::from_lookup(lookup(&[(SHOW_STACK_TRACE_VAR, "nope")]));
        assert_eq!(config, HandlerConfig::default());
    }

    #[test]
    fn test_deserializes_camel_case() {
        let config: HandlerConfig =
            serde_json::from_str(r#"{ "showStackTrace": true, "omitSources": ["tower-"] }"#).unwrap();
        assert!(config.show_stack_trace);
        assert!(config.omit_sources.contains("tower-"));

        let config: HandlerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HandlerConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = HandlerConfig::new().with_stack_trace(true).omit_source("tower-");
        assert!(config.show_stack_trace);
        assert!(config.omit_sources.contains("tower-"));
    }
}

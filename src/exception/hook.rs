//! Pluggable classification of failures.
//!
//! The base classifier only knows that something failed. Deployments teach it
//! about their own failure kinds through a [`Classify`] hook, which may
//! rewrite any field of the record: error type, status, behavior, validation
//! entries, even the title.

use crate::failure::{Cancelled, Failure, NotImplemented};
use crate::record::{ErrorKind, ErrorRecord};
use std::error::Error as StdError;

/// Classification hook run after the base record is built.
pub trait Classify: Send + Sync + 'static {
    fn classify(&self, record: ErrorRecord, failure: &Failure) -> ErrorRecord;
}

impl<F> Classify for F
where
    F: Fn(ErrorRecord, &Failure) -> ErrorRecord + Send + Sync + 'static,
{
    fn classify(&self, record: ErrorRecord, failure: &Failure) -> ErrorRecord {
        self(record, failure)
    }
}

/// Leaves the record untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Classify for Identity {
    fn classify(&self, record: ErrorRecord, _failure: &Failure) -> ErrorRecord {
        record
    }
}

type Apply = Box<dyn Fn(ErrorRecord, &Failure) -> ErrorRecord + Send + Sync>;

enum Matcher {
    Type(fn(&Failure) -> bool),
    Kind(String),
}

struct Rule {
    matcher: Matcher,
    apply: Apply,
}

impl Rule {
    fn matches(&self, failure: &Failure) -> bool {
        match &self.matcher {
            Matcher::Type(is_type) => is_type(failure),
            Matcher::Kind(kind) => failure.kind() == kind,
        }
    }
}

/// Classification rules keyed by failure type or kind name.
///
/// Rules are checked in registration order and the first match wins.
/// Failures no rule matches keep the base record.
///
/// ```rust,ignore
/// let table = ClassificationTable::standard()
///     .on::<OrderValidationError, _>(|record, err| {
///         record
///             .with_kind(ErrorKind::DataValidationError)
///             .with_status(400)
///             .with_validation_failures(err.failures())
///     })
///     .on_kind("Timeout", |record, _| record.with_kind(ErrorKind::NetworkError));
/// ```
#[derive(Default)]
pub struct ClassificationTable {
    rules: Vec<Rule>,
}

impl ClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample policies for the failure types this crate ships:
    /// [`Cancelled`] and cancelled tokio tasks map to
    /// [`ErrorKind::CancelledOperation`], [`NotImplemented`] maps to
    /// [`ErrorKind::NotImplemented`].
    pub fn standard() -> Self {
        Self::new()
            .on::<Cancelled, _>(|record, _| record.with_kind(ErrorKind::CancelledOperation))
            .on::<NotImplemented, _>(|record, _| record.with_kind(ErrorKind::NotImplemented))
            .on::<tokio::task::JoinError, _>(|record, err| {
                if err.is_cancelled() {
                    record.with_kind(ErrorKind::CancelledOperation)
                } else {
                    record
                }
            })
    }

    /// Adds a rule for failures wrapping an error of type `E`.
    pub fn on<E, F>(mut self, apply: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(ErrorRecord, &E) -> ErrorRecord + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            matcher: Matcher::Type(Failure::is::<E>),
            apply: Box::new(move |record, failure| match failure.downcast_ref::<E>() {
                Some(error) => apply(record, error),
                None => record,
            }),
        });
        self
    }

    /// Adds a rule for failures whose kind name equals `kind`.
    pub fn on_kind<F>(mut self, kind: impl Into<String>, apply: F) -> Self
    where
        F: Fn(ErrorRecord, &Failure) -> ErrorRecord + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            matcher: Matcher::Kind(kind.into()),
            apply: Box::new(apply),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Classify for ClassificationTable {
    fn classify(&self, record: ErrorRecord, failure: &Failure) -> ErrorRecord {
        match self.rules.iter().find(|rule| rule.matches(failure)) {
            Some(rule) => (rule.apply)(record, failure),
            None => record,
        }
    }
}

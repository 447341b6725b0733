use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One failed property check, listed in `validationErrors`.
///
/// Two entries are equal when they name the same property and attempted the
/// same value; the message is ignored so the same failure reported with
/// different wording deduplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub property_name: String,
    pub attempted_value: Value,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(
        property_name: impl Into<String>,
        attempted_value: impl Into<Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            attempted_value: attempted_value.into(),
            message: message.into(),
        }
    }

    /// The attempted value as text. Strings are taken verbatim, other values
    /// use their JSON rendering.
    pub fn attempted_value_text(&self) -> Cow<'_, str> {
        match &self.attempted_value {
            Value::String(text) => Cow::Borrowed(text),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl PartialEq for ValidationFailure {
    fn eq(&self, other: &Self) -> bool {
        self.property_name == other.property_name
            && self.attempted_value_text() == other.attempted_value_text()
    }
}

impl Eq for ValidationFailure {}

impl Hash for ValidationFailure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.property_name.hash(state);
        self.attempted_value_text().hash(state);
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_name, self.message)
    }
}

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on issues reported for a single instance.
pub const MAX_REPORTED_ISSUES: usize = 32;

/// One failed assertion, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    /// JSON pointer to the offending part of the instance.
    pub instance_path: String,
    /// JSON pointer to the keyword that failed.
    pub schema_path: String,
}

/// Outcome of validating one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// A compiled schema ready to validate instances.
pub struct CompiledValidator {
    inner: Validator,
    source: Option<String>,
}

impl CompiledValidator {
    pub(crate) fn new(inner: Validator, source: Option<String>) -> Self {
        Self { inner, source }
    }

    /// Validate an instance and collect its issues.
    pub fn validate(&self, instance: &Value) -> Verdict {
        let errors: Vec<ValidationIssue> = self
            .inner
            .iter_errors(instance)
            .take(MAX_REPORTED_ISSUES)
            .map(|err| ValidationIssue {
                message: err.to_string(),
                instance_path: err.instance_path().as_str().to_string(),
                schema_path: err.schema_path().as_str().to_string(),
            })
            .collect();

        Verdict {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.inner.is_valid(instance)
    }

    /// URL the schema was compiled from, if it came from one.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl std::fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Represents an error that occurred while evaluating a metadata condition.
#[derive(Debug)]
pub struct ConditionEvaluationError(Box<loot_condition_interpreter::Error>);

impl std::fmt::Display for ConditionEvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to evaluate condition")
    }
}

impl std::error::Error for ConditionEvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<loot_condition_interpreter::Error> for ConditionEvaluationError {
    fn from(value: loot_condition_interpreter::Error) -> Self {
        ConditionEvaluationError(Box::new(value))
    }
}

/// Represents an error that occurred while retrieving metadata for a plugin.
#[derive(Debug)]
pub struct MetadataRetrievalError(ConditionEvaluationError);

impl std::fmt::Display for MetadataRetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to retrieve metadata")
    }
}

impl std::error::Error for MetadataRetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<loot_condition_interpreter::Error> for MetadataRetrievalError {
    fn from(value: loot_condition_interpreter::Error) -> Self {
        MetadataRetrievalError(value.into())
    }
}

impl From<ConditionEvaluationError> for MetadataRetrievalError {
    fn from(value: ConditionEvaluationError) -> Self {
        MetadataRetrievalError(value)
    }
}

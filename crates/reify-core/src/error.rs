//! Runtime error types

/// Broad classification of a [`RuntimeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Null or malformed arguments (type-argument vectors, arity, argument kinds)
    Argument,
    /// Operation not valid in the current state (protocol violations)
    InvalidOperation,
    /// A per-instantiation static constructor failed
    TypeInitialization,
    /// An assignability check failed where success was required
    InvalidCast,
    /// A value of the wrong type was stored into an array slot
    ArrayTypeMismatch,
    /// An element index was outside its container
    IndexOutOfRange,
}

/// Errors raised by the type system and the object model
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// A required argument was null
    #[error("Value cannot be null (parameter '{name}')")]
    NullArgument {
        /// Parameter name
        name: &'static str,
    },

    /// An argument was present but malformed
    #[error("Argument error: {0}")]
    InvalidArgument(String),

    /// Wrong number of type arguments for a generic definition
    #[error("Type {type_name} expects {expected} type argument(s), got {actual}")]
    TypeArgumentCount {
        /// Generic definition name
        type_name: String,
        /// Declared arity
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Operation not valid for the receiver or the current protocol state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Static-data construction for an instantiation failed
    #[error("The type initializer for '{type_name}' threw an exception: {source}")]
    TypeInitialization {
        /// Instantiation being constructed
        type_name: String,
        /// Original failure
        #[source]
        source: Box<RuntimeError>,
    },

    /// Cast between incompatible types
    #[error("Unable to cast object of type '{source_type}' to type '{target_type}'")]
    InvalidCast {
        /// Runtime type of the value
        source_type: String,
        /// Requested type
        target_type: String,
    },

    /// Store of an incompatible value into an array
    #[error("Attempted to store an element of type '{actual}' into an array of '{expected}'")]
    ArrayTypeMismatch {
        /// Array element type
        expected: String,
        /// Type of the rejected value
        actual: String,
    },

    /// Element index out of bounds
    #[error("Index {index} was outside the bounds of the array (length {length})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Container length
        length: usize,
    },

    /// Failure raised by translator-supplied code
    #[error("{0}")]
    Host(String),
}

impl RuntimeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::NullArgument { .. }
            | RuntimeError::InvalidArgument(_)
            | RuntimeError::TypeArgumentCount { .. } => ErrorKind::Argument,
            RuntimeError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            RuntimeError::TypeInitialization { .. } | RuntimeError::Host(_) => {
                ErrorKind::TypeInitialization
            }
            RuntimeError::InvalidCast { .. } => ErrorKind::InvalidCast,
            RuntimeError::ArrayTypeMismatch { .. } => ErrorKind::ArrayTypeMismatch,
            RuntimeError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        }
    }

    /// Shorthand for an [`ErrorKind::Argument`] check
    pub fn is_argument_error(&self) -> bool {
        self.kind() == ErrorKind::Argument
    }
}

impl From<String> for RuntimeError {
    fn from(s: String) -> Self {
        RuntimeError::Host(s)
    }
}

impl From<&str> for RuntimeError {
    fn from(s: &str) -> Self {
        RuntimeError::Host(s.to_string())
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RuntimeError::NullArgument { name: "args" }.kind(),
            ErrorKind::Argument
        );
        assert!(RuntimeError::TypeArgumentCount {
            type_name: "Pair`2".to_string(),
            expected: 2,
            actual: 1,
        }
        .is_argument_error());
        assert_eq!(
            RuntimeError::InvalidOperation("x".to_string()).kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn test_type_initialization_keeps_cause() {
        let err = RuntimeError::TypeInitialization {
            type_name: "Cache`1[System.Int32]".to_string(),
            source: Box::new(RuntimeError::Host("boom".to_string())),
        };
        let message = err.to_string();
        assert!(message.contains("Cache`1[System.Int32]"));
        assert!(message.contains("boom"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_invalid_cast_names_both_types() {
        let err = RuntimeError::InvalidCast {
            source_type: "System.String".to_string(),
            target_type: "IProducer`1[Base]".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("System.String"));
        assert!(message.contains("IProducer`1[Base]"));
    }
}

//! Error types for option tracking.

use thiserror::Error;

use crate::field::FieldId;
use crate::value::OptionType;

/// Raised when a value cannot be converted to an option's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// Text could not be read as a finite number.
    #[error("value is not a number")]
    NotANumber {
        /// Text that failed to parse.
        value: String,
    },
}

/// Primary error type for option manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// The option was never registered with a default value.
    #[error("unknown option")]
    UnknownOption {
        /// Name of the unregistered option.
        option: String,
    },
    /// The incoming value could not be coerced to the option's type.
    #[error("option value has the wrong type")]
    Coercion {
        /// Option being written.
        option: String,
        /// Type the option was registered with.
        expected: OptionType,
        /// Underlying conversion failure.
        #[source]
        source: CoercionError,
    },
    /// A field event referenced a field that is not bound.
    #[error("field is not bound")]
    UnknownField {
        /// Identifier carried by the event.
        field: FieldId,
    },
}

/// Convenience alias for option manager results.
pub type OptionsResult<T> = Result<T, OptionsError>;

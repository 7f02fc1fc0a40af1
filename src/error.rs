//! Error taxonomy shared by the resolver and every kernel.

/// Result type for arrayfunc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or executing an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Operator name not known to this function
    #[error("operator not valid for this function")]
    InvalidOperator,

    /// Operation requested a vector path the platform cannot provide
    #[error("operator not valid for this platform")]
    InvalidPlatformOperator,

    /// Integer result or scalar coercion out of range
    #[error("arithmetic overflow")]
    Overflow,

    /// Non-finite floating point result
    #[error("arithmetic error in calculation")]
    ArithmeticError,

    #[error("division by zero")]
    DivideByZero,

    /// Required parameter absent
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Parameter present but not valid for the operation
    #[error("value not valid for this operation: {0}")]
    ValueError(&'static str),

    #[error("array and parameter type mismatch")]
    TypeMismatch,

    #[error("array length mismatch")]
    LengthMismatch,

    /// Effective length below one
    #[error("array length error")]
    InvalidLength,

    #[error("unknown array type")]
    UnknownElementType,
}

impl Error {
    /// Stable category name, used in logs and host error mapping.
    pub const fn code(self) -> &'static str {
        match self {
            Error::InvalidOperator => "invalid_operator",
            Error::InvalidPlatformOperator => "invalid_platform_operator",
            Error::Overflow => "overflow",
            Error::ArithmeticError => "arithmetic_error",
            Error::DivideByZero => "divide_by_zero",
            Error::MissingParameter(_) => "missing_parameter",
            Error::ValueError(_) => "value_error",
            Error::TypeMismatch => "type_mismatch",
            Error::LengthMismatch => "length_mismatch",
            Error::InvalidLength => "invalid_length",
            Error::UnknownElementType => "unknown_element_type",
        }
    }
}

//! Error types for netlist description loading and validation.

/// Errors that can occur when loading or validating a `netlist.toml` description.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the description file.
    #[error("failed to read netlist description: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed, or a value had the wrong format.
    #[error("failed to parse netlist description: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Two entries of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// `device` or `net`.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

//! Error types for the Cirsim network solver.
//!
//! This module provides a unified error type [`CirsimError`] that covers
//! board parsing, network editing, and simulation. Note that most numeric
//! trouble inside a tick (singular systems, short circuits) is reported as a
//! status on the tick rather than as an error.

use thiserror::Error;

/// Result type alias using [`CirsimError`].
pub type Result<T> = std::result::Result<T, CirsimError>;

/// Unified error type for all Cirsim operations.
#[derive(Error, Debug)]
pub enum CirsimError {
    // ============ Board Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid element definition
    #[error("Invalid component '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    /// Unknown element type prefix
    #[error("Unknown component type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// Duplicate element name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    // ============ Network Errors ============
    /// Element handle does not refer to a live element
    #[error("Element #{element} does not exist")]
    ElementNotFound { element: usize },

    /// Node handle does not refer to a live node
    #[error("Node #{node} does not exist")]
    NodeNotFound { node: usize },

    /// No element with the given name
    #[error("Component '{name}' not found in network")]
    ComponentNotFound { name: String },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit may have a short circuit or floating node")]
    SingularMatrix,

    /// Incidence, admittance and source vectors disagree in size
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ I/O Errors ============
    /// Error reading a board or record file
    #[error("Failed to read file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a record file
    #[error("Failed to write file '{path}': {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing the trace output
    #[error("Trace output error: {message}")]
    OutputError { message: String },

    /// Element records could not be (de)serialized
    #[cfg(any(feature = "cli", feature = "wasm"))]
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl CirsimError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid component error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }
}

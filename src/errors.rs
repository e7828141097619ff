/**
 * The error taxonomy for both phases of the pipeline. `StaticError` is reported
 * by the checker (`semantics`), counted, and never unwinds; `RuntimeError`
 * unwinds the evaluator and terminates the process.
 */

use thiserror::Error;

use crate::ast::Line;

fn fmt_line(line: Line) -> String {
    match line {
        Some(n) => n.to_string(),
        None => "?".to_string(),
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StaticError {
    #[error("Undeclared name '{name}'")]
    UndeclaredName { name: String, line: Line },

    #[error("Bad index on '{name}': {reason}")]
    BadIndex {
        name: String,
        reason: String,
        line: Line,
    },

    #[error("tensors of incompatible shapes in '{op}'")]
    ShapeMismatch { op: String, line: Line },

    #[error("{message}")]
    OpTypeMismatch { message: String, line: Line },

    #[error("range bounds must be int, got {found}")]
    BadRange { found: String, line: Line },

    #[error("condition must be an int, got {found}")]
    BadCondition { found: String, line: Line },

    #[error("'{command}' outside of a loop")]
    ControlFlowOutOfLoop { command: String, line: Line },

    #[error("tensor elements must share one type and shape")]
    HeterogeneousTensor { line: Line },
}

impl StaticError {
    pub fn line(&self) -> Line {
        match self {
            StaticError::UndeclaredName { line, .. }
            | StaticError::BadIndex { line, .. }
            | StaticError::ShapeMismatch { line, .. }
            | StaticError::OpTypeMismatch { line, .. }
            | StaticError::BadRange { line, .. }
            | StaticError::BadCondition { line, .. }
            | StaticError::ControlFlowOutOfLoop { line, .. }
            | StaticError::HeterogeneousTensor { line } => *line,
        }
    }

    /** `Error on line <n>: <message>` as printed to stderr, without color. */
    pub fn display_line(&self) -> String {
        format!("Error on line {}: {}", fmt_line(self.line()), self)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("name '{name}' is not bound")]
    NameUnbound { name: String, line: Line },

    #[error("division by zero")]
    DivisionByZero { line: Line },

    #[error("index out of bounds")]
    IndexOutOfBounds { line: Line },

    #[error("index must be int or range")]
    IndexKindInvalid { line: Line },

    #[error("{message}")]
    NumericBackendFailure { message: String, line: Line },
}

impl RuntimeError {
    pub fn line(&self) -> Line {
        match self {
            RuntimeError::NameUnbound { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::IndexOutOfBounds { line }
            | RuntimeError::IndexKindInvalid { line }
            | RuntimeError::NumericBackendFailure { line, .. } => *line,
        }
    }

    /** `<message>, line <n>` as printed to stderr. */
    pub fn display_line(&self) -> String {
        format!("{}, line {}", self, fmt_line(self.line()))
    }
}

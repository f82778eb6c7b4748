//! Error types for the field model and the script engine.

use glam::IVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::Wall;

/// Rejected mutations of a [`Field`](crate::Field).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field size must be positive (got {size})")]
    InvalidSize { size: i32 },

    #[error("wall {wall:?} lies outside a {size}x{size} field")]
    WallOutOfRange { wall: Wall, size: i32 },

    #[error("robot position ({}, {}) is outside a {size}x{size} field", .position.x, .position.y)]
    RobotOutOfBounds { position: IVec2, size: i32 },

    #[error("cell ({}, {}) is outside a {size}x{size} field", .cell.x, .cell.y)]
    CellOutOfBounds { cell: IVec2, size: i32 },

    #[error("field cannot be changed while a script is running")]
    Busy,
}

/// Why a condition text could not be understood.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,

    #[error("unknown side \"{0}\" (expected справа, снизу, слева or сверху)")]
    UnknownSide(String),

    #[error("unknown cell state \"{0}\" (expected свободно or стена)")]
    UnknownState(String),

    #[error("expected two words, found {0}")]
    Arity(usize),
}

/// Errors that abort a script run.
///
/// Every variant is fatal to the current run. Field changes made before the
/// failure are kept.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("line {line}: loop has no matching кц")]
    UnterminatedLoop { line: usize },

    #[error("line {line}: condition has no matching все")]
    UnterminatedConditional { line: usize },

    #[error(
        "line {line}: wall in the way, cannot move from ({}, {}) to ({}, {})",
        .from.x, .from.y, .to.x, .to.y
    )]
    BlockedMove { from: IVec2, to: IVec2, line: usize },

    #[error("line {line}: unknown command \"{keyword}\"")]
    UnknownCommand { keyword: String, line: usize },

    #[error("line {line}: invalid condition \"{text}\": {reason}")]
    InvalidCondition {
        text: String,
        line: usize,
        reason: ConditionError,
    },

    #[error("line {line}: кц without an open loop")]
    UnmatchedLoopEnd { line: usize },

    #[error("script exceeded the limit of {limit} steps")]
    StepLimitExceeded { limit: usize },

    #[error("a script is already running")]
    AlreadyRunning,
}

impl ExecutionError {
    /// Stable machine-readable tag for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnterminatedLoop { .. } => "unterminated_loop",
            Self::UnterminatedConditional { .. } => "unterminated_conditional",
            Self::BlockedMove { .. } => "blocked_move",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::InvalidCondition { .. } => "invalid_condition",
            Self::UnmatchedLoopEnd { .. } => "unmatched_loop_end",
            Self::StepLimitExceeded { .. } => "step_limit_exceeded",
            Self::AlreadyRunning => "already_running",
        }
    }

    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnterminatedLoop { line }
            | Self::UnterminatedConditional { line }
            | Self::BlockedMove { line, .. }
            | Self::UnknownCommand { line, .. }
            | Self::InvalidCondition { line, .. }
            | Self::UnmatchedLoopEnd { line } => Some(*line),
            Self::StepLimitExceeded { .. } | Self::AlreadyRunning => None,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind().to_string(),
            message: self.to_string(),
            line: self.line(),
        }
    }
}

/// Serializable form of an [`ExecutionError`] handed to collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

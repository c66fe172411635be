//! Runtime fault taxonomy.
//!
//! Every fault is fatal: the engine stops at the instruction that raised it and
//! the process exits with the fault's status. Nothing is recovered or rolled
//! back; output produced before the fault stands.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// The closed set of runtime fault kinds.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `FrameError` -> "FrameError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum FaultKind {
    /// Operation on a frame that does not currently exist (unset TF, empty frame stack).
    FrameError,
    /// Variable name absent from an existing target frame.
    UndefinedVariable,
    /// Variable or label name already present where uniqueness is enforced.
    DuplicateDefinition,
    /// Operator applied to disallowed or mismatched operand types.
    WrongOperandType,
    /// Read of an unassigned slot, or pop from an empty stack.
    MissingValue,
    /// Division by zero.
    ArithmeticError,
    /// Character access out of bounds, or invalid code-point conversion.
    StringIndexError,
    /// Control-transfer target missing from the label table.
    UndefinedLabel,
}

impl FaultKind {
    /// Process exit status associated with this fault kind.
    ///
    /// DuplicateDefinition and UndefinedLabel share a status: both are
    /// name-resolution faults in the source program.
    #[must_use]
    pub fn exit_status(self) -> u8 {
        match self {
            Self::DuplicateDefinition | Self::UndefinedLabel => 52,
            Self::WrongOperandType => 53,
            Self::UndefinedVariable => 54,
            Self::FrameError => 55,
            Self::MissingValue => 56,
            Self::ArithmeticError => 57,
            Self::StringIndexError => 58,
        }
    }
}

/// A runtime fault: a kind plus an optional human-readable detail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    message: Option<String>,
}

impl Fault {
    #[must_use]
    pub fn new(kind: FaultKind) -> Self {
        Self { kind, message: None }
    }

    #[must_use]
    pub fn with_message(kind: FaultKind, message: String) -> Self {
        Self {
            kind,
            message: Some(message),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Process exit status for this fault.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        self.kind.exit_status()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Fault {}

/// Result type for runtime operations.
pub type RunResult<T> = Result<T, Fault>;

/// Creates a [`Fault`] with a formatted message.
///
/// Usage: `fault_fmt!(FaultKind::FrameError; "TF is not defined")`.
macro_rules! fault_fmt {
    ($kind:expr; $($arg:tt)*) => {
        $crate::error::Fault::with_message($kind, format!($($arg)*))
    };
}
pub(crate) use fault_fmt;

/// Creates an `Err(Fault)` with a formatted message.
macro_rules! fault_err {
    ($kind:expr; $($arg:tt)*) => {
        Err($crate::error::fault_fmt!($kind; $($arg)*))
    };
}
pub(crate) use fault_err;

//! Error types for the two failure channels: compile time and runtime.
//!
//! Parse and compile errors are collected in lists so a single pass can
//! report everything it found; runtime errors halt the VM immediately.

use std::error::Error as StdError;
use std::fmt;

/// A single parse error with the source line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl StdError for ParseError {}

/// All parse errors collected for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl StdError for ParseErrors {}

/// A single compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An identifier that resolves to nothing — including a non-global free
    /// variable used inside a nested function.
    UndefinedIdentifier(String),
    /// An operator token the compiler has no opcode for.
    UnknownOperator(String),
    /// More than `u16::MAX + 1` constants in one compilation.
    ConstantsOverflow,
    /// A jump target that does not fit in a u16 operand.
    JumpTooFar(usize),
    /// A call with more arguments than the u8 operand can carry.
    TooManyArguments(usize),
    /// A function body with more locals than the u8 operand can address.
    TooManyLocals(usize),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedIdentifier(name) => write!(f, "undefined identifier {name}"),
            Self::UnknownOperator(op) => write!(f, "unknown operator {op}"),
            Self::ConstantsOverflow => f.write_str("constants pool full"),
            Self::JumpTooFar(offset) => write!(f, "jump offset {offset} exceeds u16"),
            Self::TooManyArguments(count) => {
                write!(f, "calls take at most 255 arguments, got {count}")
            }
            Self::TooManyLocals(count) => {
                write!(f, "functions hold at most 256 locals, got {count}")
            }
        }
    }
}

impl StdError for CompileError {}

/// All compile errors collected for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl StdError for CompileErrors {}

/// A runtime failure. Execution halts at the faulting opcode; nothing in the
/// language can catch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    StackOverflow,
    StackUnderflow,
    FrameOverflow,
    /// An opcode byte the dispatch loop does not recognise.
    UnknownOpcode(u8),
    /// Operand types a binary operator does not support. `op` is the
    /// operator's display symbol.
    UnsupportedBinary {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    UnsupportedNegation(&'static str),
    DivisionByZero,
    UnsupportedIndex {
        container: &'static str,
        index: &'static str,
    },
    UnhashableKey(&'static str),
    NotCallable(&'static str),
    WrongArity {
        want: usize,
        got: usize,
    },
    /// Builtin misuse; the message is produced at the call site.
    Builtin(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => f.write_str("stack overflow"),
            Self::StackUnderflow => f.write_str("stack underflow"),
            Self::FrameOverflow => f.write_str("frame stack overflow"),
            Self::UnknownOpcode(byte) => write!(f, "unknown opcode {byte}"),
            Self::UnsupportedBinary { op, left, right } => {
                write!(f, "unsupported types for binary operation: {left} {op} {right}")
            }
            Self::UnsupportedNegation(ty) => write!(f, "unsupported type for negation: {ty}"),
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::UnsupportedIndex { container, index } => {
                write!(f, "index operator not supported: {container}[{index}]")
            }
            Self::UnhashableKey(ty) => write!(f, "unusable as hash key: {ty}"),
            Self::NotCallable(ty) => write!(f, "calling non-function: {ty}"),
            Self::WrongArity { want, got } => {
                write!(f, "wrong number of arguments: want={want}, got={got}")
            }
            Self::Builtin(message) => f.write_str(message),
        }
    }
}

impl StdError for RuntimeError {}

/// Top-level error for the [`Executor`](crate::Executor) API.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseErrors),
    Compile(CompileErrors),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(errors) => write!(f, "{errors}"),
            Self::Compile(errors) => write!(f, "{errors}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl StdError for Error {}

impl From<ParseErrors> for Error {
    fn from(errors: ParseErrors) -> Self {
        Self::Parse(errors)
    }
}

impl From<CompileErrors> for Error {
    fn from(errors: CompileErrors) -> Self {
        Self::Compile(errors)
    }
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Self::Runtime(error)
    }
}

//! Opcode definitions for the bytecode VM.
//!
//! Bytecode is stored as raw bytes. The opcode occupies one byte, numbered
//! from 1; operands follow inline, big-endian, with widths declared in the
//! opcode's [`OpDef`].
//!
//! # Operand Encoding
//!
//! - No operand: `Add`, `Pop`, `True`, ...
//! - One u8: `Call`, `SetLocal`, `GetLocal`, `GetBuiltin`
//! - One u16: `Constant`, `Jump`, `JumpFalse`, `SetGlobal`, `GetGlobal`,
//!   `Array`, `Hash`

use strum::FromRepr;

/// A bytecode instruction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum Op {
    /// Push a constants-pool entry. Operand: u16 index.
    Constant = 1,
    /// Add two ints, or concatenate two strings.
    Add,
    /// Subtract: a - b.
    Sub,
    /// Multiply: a * b.
    Mul,
    /// Divide: a / b.
    Div,
    /// Discard top of stack, remembering it as the last popped value.
    Pop,
    /// Push the interned `true`.
    True,
    /// Push the interned `false`.
    False,
    /// Structural equality for int/bool/string, identity otherwise.
    Equal,
    /// Negated [`Op::Equal`].
    NotEqual,
    /// Int comparison. `<` is compiled as `>` with swapped operands.
    GreaterThan,
    /// Arithmetic negation of an int.
    Minus,
    /// Logical not of the operand's truthiness.
    Bang,
    /// Pop; jump to the absolute offset if falsy. Operand: u16 target.
    JumpFalse,
    /// Unconditional jump. Operand: u16 target.
    Jump,
    /// Push the interned `null`.
    Null,
    /// Pop into the globals store. Operand: u16 slot.
    SetGlobal,
    /// Push from the globals store. Operand: u16 slot.
    GetGlobal,
    /// Pop n elements, push an array. Operand: u16 count.
    Array,
    /// Pop n stack values as key/value pairs, push a hash. Operand: u16
    /// count (always even).
    Hash,
    /// Pop index then container, push the element or null.
    Index,
    /// Call the value below the k arguments on top. Operand: u8 arg count.
    Call,
    /// Pop the return value, tear down the frame, push it back.
    ReturnValue,
    /// Tear down the frame, push null.
    Return,
    /// Pop into a frame-local slot. Operand: u8 slot.
    SetLocal,
    /// Push from a frame-local slot. Operand: u8 slot.
    GetLocal,
    /// Push a builtin by registry index. Operand: u8 index.
    GetBuiltin,
}

/// Static description of an opcode: disassembly name, the short symbol used
/// in runtime error text, and operand byte widths in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDef {
    pub name: &'static str,
    pub symbol: &'static str,
    pub widths: &'static [usize],
}

impl Op {
    /// Returns the static definition for this opcode.
    pub fn def(self) -> OpDef {
        macro_rules! def {
            ($name:literal, $symbol:literal) => {
                OpDef {
                    name: $name,
                    symbol: $symbol,
                    widths: &[],
                }
            };
            ($name:literal, $symbol:literal, $($width:literal),+) => {
                OpDef {
                    name: $name,
                    symbol: $symbol,
                    widths: &[$($width),+],
                }
            };
        }
        match self {
            Self::Constant => def!("OpConstant", "constant", 2),
            Self::Add => def!("OpAdd", "+"),
            Self::Sub => def!("OpSub", "-"),
            Self::Mul => def!("OpMul", "*"),
            Self::Div => def!("OpDiv", "/"),
            Self::Pop => def!("OpPop", "pop"),
            Self::True => def!("OpTrue", "true"),
            Self::False => def!("OpFalse", "false"),
            Self::Equal => def!("OpEqual", "=="),
            Self::NotEqual => def!("OpNotEqual", "!="),
            Self::GreaterThan => def!("OpGreaterThan", ">"),
            Self::Minus => def!("OpMinus", "-"),
            Self::Bang => def!("OpBang", "!"),
            Self::JumpFalse => def!("OpJumpFalse", "jump_if_false", 2),
            Self::Jump => def!("OpJump", "jump", 2),
            Self::Null => def!("OpNull", "null"),
            Self::SetGlobal => def!("OpSetGlobal", "set_global", 2),
            Self::GetGlobal => def!("OpGetGlobal", "get_global", 2),
            Self::Array => def!("OpArray", "array", 2),
            Self::Hash => def!("OpHash", "hash", 2),
            Self::Index => def!("OpIndex", "index"),
            Self::Call => def!("OpCall", "call", 1),
            Self::ReturnValue => def!("OpReturnValue", "return_value"),
            Self::Return => def!("OpReturn", "return"),
            Self::SetLocal => def!("OpSetLocal", "set_local", 1),
            Self::GetLocal => def!("OpGetLocal", "get_local", 1),
            Self::GetBuiltin => def!("OpGetBuiltin", "get_builtin", 1),
        }
    }

    /// Total encoded size of an instruction with this opcode, in bytes.
    pub fn instruction_len(self) -> usize {
        1 + self.def().widths.iter().sum::<usize>()
    }
}

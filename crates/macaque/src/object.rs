//! The detached value representation returned to embedders.
//!
//! A [`MonkeyObject`] is a deep copy of a runtime [`Value`], independent of
//! the VM's heap, so it can outlive the execution that produced it. This is
//! what [`Executor::run`](crate::Executor::run) returns and what tests
//! compare against.

use std::fmt;

use crate::heap::{Heap, HeapData};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum MonkeyObject {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Array(Vec<MonkeyObject>),
    /// Pairs in the hash's iteration order.
    Hash(Vec<(MonkeyObject, MonkeyObject)>),
    /// A compiled function, identified by the address of its code.
    Function { addr: usize },
    /// A builtin, identified by its registry name.
    Builtin(&'static str),
}

impl MonkeyObject {
    /// Deep-copies `value` out of `heap`.
    pub fn from_value(value: &Value, heap: &Heap) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int(*i),
            Value::Builtin(builtin) => Self::Builtin(builtin.name()),
            Value::Function(func) => Self::Function {
                addr: std::rc::Rc::as_ptr(func) as usize,
            },
            Value::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => Self::Str(s.to_string()),
                HeapData::Array(elements) => Self::Array(
                    elements.iter().map(|e| Self::from_value(e, heap)).collect(),
                ),
                HeapData::Hash(hash) => Self::Hash(
                    hash.iter()
                        .map(|(k, v)| (Self::from_value(k, heap), Self::from_value(v, heap)))
                        .collect(),
                ),
            },
        }
    }
}

impl fmt::Display for MonkeyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Array(elements) => {
                let elems: Vec<String> = elements.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Self::Hash(pairs) => {
                let pairs: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Self::Function { addr } => write!(f, "CompiledFunction[0x{addr:x}]"),
            Self::Builtin(_) => f.write_str("builtin function"),
        }
    }
}

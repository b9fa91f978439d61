//! The fixed registry of host-provided builtin functions.

use std::fmt;
use std::str::FromStr;

use crate::error::RuntimeError;
use crate::heap::{Heap, HeapData};
use crate::io::PrintWriter;
use crate::value::Value;

/// Builtins enumerates every interpreter-native function, in registry order.
/// The discriminant doubles as the `OpGetBuiltin` operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Builtin {
    Len = 0,
    Puts = 1,
    First = 2,
    Last = 3,
    Rest = 4,
    Push = 5,
}

/// Parses a builtin from its source-level name.
impl FromStr for Builtin {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "len" => Ok(Self::Len),
            "puts" => Ok(Self::Puts),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "rest" => Ok(Self::Rest),
            "push" => Ok(Self::Push),
            _ => Err(()),
        }
    }
}

impl Builtin {
    /// All builtins, indexable by registry position.
    pub const REGISTRY: [Self; 6] = [
        Self::Len,
        Self::Puts,
        Self::First,
        Self::Last,
        Self::Rest,
        Self::Push,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::REGISTRY.get(usize::from(index)).copied()
    }

    /// Returns the canonical source spelling of the builtin.
    pub fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Puts => "puts",
            Self::First => "first",
            Self::Last => "last",
            Self::Rest => "rest",
            Self::Push => "push",
        }
    }

    /// Executes the builtin with the provided arguments.
    ///
    /// Arguments are borrowed from the caller's stack; the return value is a
    /// fresh owning value (element copies bump their reference counts).
    pub fn call(
        self,
        heap: &mut Heap,
        args: &[Value],
        writer: &mut impl PrintWriter,
    ) -> Result<Value, RuntimeError> {
        match self {
            Self::Len => {
                let arg = self.one_arg(args)?;
                match arg {
                    Value::Ref(id) => match heap.get(*id) {
                        HeapData::Str(s) => Ok(Value::Int(s.len() as i64)),
                        HeapData::Array(elements) => Ok(Value::Int(elements.len() as i64)),
                        HeapData::Hash(_) => Err(self.type_error("HASH")),
                    },
                    other => Err(self.type_error(other.type_name(heap))),
                }
            }
            Self::Puts => {
                for arg in args {
                    writer.print(&arg.display(heap));
                    writer.print("\n");
                }
                Ok(Value::Null)
            }
            Self::First => {
                let element = self.array_arg(args, heap)?.first().cloned();
                Ok(Self::own(element, heap))
            }
            Self::Last => {
                let element = self.array_arg(args, heap)?.last().cloned();
                Ok(Self::own(element, heap))
            }
            Self::Rest => {
                let elements = self.array_arg(args, heap)?;
                if elements.is_empty() {
                    return Ok(Value::Null);
                }
                let rest: Vec<Value> = elements[1..].to_vec();
                for element in &rest {
                    if let Value::Ref(id) = element {
                        heap.inc_ref(*id);
                    }
                }
                Ok(Value::Ref(heap.alloc(HeapData::Array(rest))))
            }
            Self::Push => {
                if args.len() != 2 {
                    return Err(self.arity_error(2, args.len()));
                }
                let elements = self.array_arg(&args[..1], heap)?;
                let mut pushed: Vec<Value> = elements.to_vec();
                pushed.push(args[1].clone());
                for element in &pushed {
                    if let Value::Ref(id) = element {
                        heap.inc_ref(*id);
                    }
                }
                Ok(Value::Ref(heap.alloc(HeapData::Array(pushed))))
            }
        }
    }

    /// Turns a borrowed element copy into an owning value, or maps absence
    /// to null.
    fn own(element: Option<Value>, heap: &mut Heap) -> Value {
        match element {
            Some(element) => {
                if let Value::Ref(id) = &element {
                    heap.inc_ref(*id);
                }
                element
            }
            None => Value::Null,
        }
    }

    fn one_arg<'a>(self, args: &'a [Value]) -> Result<&'a Value, RuntimeError> {
        match args {
            [arg] => Ok(arg),
            _ => Err(self.arity_error(1, args.len())),
        }
    }

    /// Borrows the elements of a single array argument.
    fn array_arg<'h>(self, args: &[Value], heap: &'h Heap) -> Result<&'h [Value], RuntimeError> {
        let arg = self.one_arg(args)?;
        match arg {
            Value::Ref(id) => match heap.get(*id) {
                HeapData::Array(elements) => Ok(elements),
                other => Err(RuntimeError::Builtin(format!(
                    "argument to `{}` must be ARRAY, got {}",
                    self.name(),
                    match other {
                        HeapData::Str(_) => "STRING",
                        HeapData::Array(_) => "ARRAY",
                        HeapData::Hash(_) => "HASH",
                    }
                ))),
            },
            other => Err(RuntimeError::Builtin(format!(
                "argument to `{}` must be ARRAY, got {}",
                self.name(),
                other.type_name(heap)
            ))),
        }
    }

    fn arity_error(self, want: usize, got: usize) -> RuntimeError {
        RuntimeError::Builtin(format!(
            "wrong number of arguments to `{}`. got={got}, want={want}",
            self.name()
        ))
    }

    fn type_error(self, got: &'static str) -> RuntimeError {
        RuntimeError::Builtin(format!(
            "argument to `{}` not supported, got {got}",
            self.name()
        ))
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

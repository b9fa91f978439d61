//! Public entry points: one-shot execution and persistent REPL sessions.

use std::mem;

use crate::builtins::Builtin;
use crate::compiler::{self, Bytecode, Compiler};
use crate::error::Error;
use crate::heap::Heap;
use crate::io::{PrintWriter, StdPrint};
use crate::object::MonkeyObject;
use crate::parser;
use crate::symbols::SymbolTable;
use crate::value::{Constant, Value};
use crate::vm::{self, Vm};

/// Parses, compiles and runs Monkey source code.
///
/// Construction does all the compile-time work; each `run` executes the
/// bytecode against a fresh globals store and heap.
///
/// # Example
/// ```
/// use macaque::{Executor, MonkeyObject};
///
/// let ex = Executor::new("1 + 2").unwrap();
/// assert_eq!(ex.run().unwrap(), MonkeyObject::Int(3));
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    bytecode: Bytecode,
}

impl Executor {
    /// Lexes, parses and compiles `source`.
    ///
    /// # Errors
    /// Returns `Error::Parse` or `Error::Compile` with every problem the
    /// respective pass collected.
    pub fn new(source: &str) -> Result<Self, Error> {
        let program = parser::parse(source)?;
        let bytecode = compiler::compile(&program)?;
        Ok(Self { bytecode })
    }

    /// Runs the program, printing through stdout, and returns the value of
    /// the last expression statement.
    ///
    /// # Errors
    /// Returns `Error::Runtime` if execution fails; the partial output
    /// printed so far is not rolled back.
    pub fn run(&self) -> Result<MonkeyObject, Error> {
        self.run_with_writer(&mut StdPrint)
    }

    /// Runs the program with a custom print writer.
    ///
    /// This allows capturing or redirecting everything `puts` writes.
    ///
    /// # Example
    /// ```
    /// use macaque::{CollectStringPrint, Executor};
    ///
    /// let ex = Executor::new(r#"puts("hello")"#).unwrap();
    /// let mut output = CollectStringPrint::new();
    /// ex.run_with_writer(&mut output).unwrap();
    /// assert_eq!(output.output(), "hello\n");
    /// ```
    pub fn run_with_writer(&self, writer: &mut impl PrintWriter) -> Result<MonkeyObject, Error> {
        let mut globals = vm::new_globals();
        let mut heap = Heap::new();
        let mut vm = Vm::new(&self.bytecode, &mut globals, &mut heap);
        vm.run(writer)?;
        Ok(vm.last_popped_object())
    }

    /// The compiled program, for disassembly and inspection.
    #[must_use]
    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }
}

/// An interactive session that keeps definitions alive between inputs.
///
/// The symbol table, constants pool, globals store and heap persist across
/// [`eval`](Session::eval) calls, so a `let` on one line is visible on the
/// next — this is what the REPL drives.
///
/// # Example
/// ```
/// use macaque::{MonkeyObject, NoPrint, Session};
///
/// let mut session = Session::new();
/// session.eval("let double = fn(x) { x * 2 };", &mut NoPrint).unwrap();
/// let result = session.eval("double(21)", &mut NoPrint).unwrap();
/// assert_eq!(result, MonkeyObject::Int(42));
/// ```
pub struct Session {
    symbols: SymbolTable,
    constants: Vec<Constant>,
    globals: Box<[Value]>,
    heap: Heap,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for builtin in Builtin::REGISTRY {
            symbols.define_builtin(builtin as u8, builtin.name());
        }
        Self {
            symbols,
            constants: Vec::new(),
            globals: vm::new_globals(),
            heap: Heap::new(),
        }
    }

    /// Compiles and runs one input against the session state, returning the
    /// value of its last expression statement.
    ///
    /// Symbols and constants defined by an input survive even when a later
    /// pass fails, mirroring how the compiler state is threaded; a runtime
    /// failure leaves all completed assignments in place.
    pub fn eval(
        &mut self,
        source: &str,
        writer: &mut impl PrintWriter,
    ) -> Result<MonkeyObject, Error> {
        let program = parser::parse(source)?;

        let mut compiler =
            Compiler::with_state(mem::take(&mut self.symbols), mem::take(&mut self.constants));
        let compiled = compiler.compile(&program);
        let bytecode = compiler.bytecode();
        (self.symbols, self.constants) = compiler.into_state();
        compiled?;

        let mut vm = Vm::new(&bytecode, &mut self.globals, &mut self.heap);
        vm.run(writer)?;
        Ok(vm.last_popped_object())
    }

    /// Number of live heap values owned by the session. Mostly useful for
    /// tests asserting that evaluations stay balanced.
    #[must_use]
    pub fn heap_entry_count(&self) -> usize {
        self.heap.entry_count()
    }
}

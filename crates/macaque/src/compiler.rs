//! The AST-to-bytecode compiler.
//!
//! A single depth-first, left-to-right pass over the program. Forward jumps
//! are emitted with a placeholder operand and backpatched once the target
//! offset is known. Per function being compiled the compiler keeps its own
//! instruction buffer plus the last two emitted instructions, which drive the
//! trailing-pop removal in if-arms and the implicit-return finalisation of
//! function bodies.

use std::rc::Rc;

use crate::ast::{BlockStatement, Expression, Program, Statement};
use crate::builtins::Builtin;
use crate::bytecode::{Instructions, Op};
use crate::error::{CompileError, CompileErrors};
use crate::symbols::{Symbol, SymbolScope, SymbolTable};
use crate::value::{CompiledFunction, Constant};

/// A compiled program: the top-level instruction stream plus the constants
/// pool it indexes into.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Constant>,
}

/// Compiles a program in a fresh compiler.
pub fn compile(program: &Program) -> Result<Bytecode, CompileErrors> {
    let mut compiler = Compiler::new();
    compiler.compile(program)?;
    Ok(compiler.bytecode())
}

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    op: Op,
    offset: usize,
}

/// Per-function compilation state. Entering a function literal pushes one,
/// finalising it pops.
#[derive(Debug, Default)]
struct CompilerScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

pub struct Compiler {
    constants: Vec<Constant>,
    symbols: SymbolTable,
    scopes: Vec<CompilerScope>,
    errors: Vec<CompileError>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for builtin in Builtin::REGISTRY {
            symbols.define_builtin(builtin as u8, builtin.name());
        }
        Self::with_state(symbols, Vec::new())
    }

    /// Creates a compiler that continues from existing symbol and constant
    /// state. This is how a REPL session keeps definitions across lines.
    pub fn with_state(symbols: SymbolTable, constants: Vec<Constant>) -> Self {
        Self {
            constants,
            symbols,
            scopes: vec![CompilerScope::default()],
            errors: Vec::new(),
        }
    }

    /// Hands the symbol table and constants pool back for the next
    /// compilation in a session.
    pub fn into_state(self) -> (SymbolTable, Vec<Constant>) {
        (self.symbols, self.constants)
    }

    /// Compiles `program` into the current top-level scope.
    ///
    /// Compilation keeps going after recoverable errors so one pass reports
    /// everything; the resulting bytecode must not be executed unless this
    /// returns `Ok`.
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileErrors> {
        for statement in &program.statements {
            self.compile_statement(statement);
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CompileErrors(std::mem::take(&mut self.errors)))
        }
    }

    /// Snapshots the compiled top-level instructions and constants.
    #[must_use]
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    fn compile_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Let { name, value } => {
                self.compile_expression(value);
                let symbol = self.symbols.define(name);
                self.store_symbol(&symbol);
            }
            Statement::Return(None) => {
                self.emit(Op::Return, &[]);
            }
            Statement::Return(Some(value)) => {
                self.compile_expression(value);
                self.emit(Op::ReturnValue, &[]);
            }
            Statement::Expression(expression) => {
                self.compile_expression(expression);
                self.emit(Op::Pop, &[]);
            }
        }
    }

    fn compile_block(&mut self, block: &BlockStatement) {
        for statement in &block.statements {
            self.compile_statement(statement);
        }
    }

    fn compile_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Constant::Int(*value));
                self.emit(Op::Constant, &[index]);
            }
            Expression::BooleanLiteral(true) => {
                self.emit(Op::True, &[]);
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Op::False, &[]);
            }
            Expression::StringLiteral(value) => {
                let index = self.add_constant(Constant::Str(Rc::from(value.as_str())));
                self.emit(Op::Constant, &[index]);
            }
            Expression::Identifier(name) => match self.symbols.resolve(name) {
                Some(symbol) => self.load_symbol(&symbol),
                None => self.error(CompileError::UndefinedIdentifier(name.clone())),
            },
            Expression::Prefix { op, right } => {
                self.compile_expression(right);
                match op.as_str() {
                    "!" => self.emit(Op::Bang, &[]),
                    "-" => self.emit(Op::Minus, &[]),
                    _ => {
                        self.error(CompileError::UnknownOperator(op.clone()));
                        return;
                    }
                };
            }
            Expression::Infix { op, left, right } => self.compile_infix(op, left, right),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expression::FunctionLiteral { parameters, body } => {
                self.compile_function(parameters, body);
            }
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function);
                for argument in arguments {
                    self.compile_expression(argument);
                }
                if arguments.len() > usize::from(u8::MAX) {
                    self.error(CompileError::TooManyArguments(arguments.len()));
                    return;
                }
                self.emit(Op::Call, &[arguments.len()]);
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element);
                }
                self.emit(Op::Array, &[elements.len()]);
            }
            Expression::HashLiteral(pairs) => {
                // keys are emitted in sorted textual order so compilation of
                // the same program is byte-for-byte reproducible
                let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());
                for (key, value) in sorted {
                    self.compile_expression(key);
                    self.compile_expression(value);
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left);
                self.compile_expression(index);
                self.emit(Op::Index, &[]);
            }
        }
    }

    fn compile_infix(&mut self, op: &str, left: &Expression, right: &Expression) {
        // `a < b` compiles as `b > a`; there is no less-than opcode
        if op == "<" {
            self.compile_expression(right);
            self.compile_expression(left);
            self.emit(Op::GreaterThan, &[]);
            return;
        }
        self.compile_expression(left);
        self.compile_expression(right);
        match op {
            "+" => self.emit(Op::Add, &[]),
            "-" => self.emit(Op::Sub, &[]),
            "*" => self.emit(Op::Mul, &[]),
            "/" => self.emit(Op::Div, &[]),
            ">" => self.emit(Op::GreaterThan, &[]),
            "==" => self.emit(Op::Equal, &[]),
            "!=" => self.emit(Op::NotEqual, &[]),
            _ => {
                self.error(CompileError::UnknownOperator(op.to_string()));
                return;
            }
        };
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) {
        self.compile_expression(condition);

        // placeholder target, backpatched below
        let jump_false_pos = self.emit(Op::JumpFalse, &[9999]);
        self.compile_block(consequence);
        if self.last_instruction_is(Op::Pop) {
            self.remove_last_instruction();
        }

        let jump_pos = self.emit(Op::Jump, &[9999]);
        self.change_operand(jump_false_pos, self.current_len());

        match alternative {
            None => {
                self.emit(Op::Null, &[]);
            }
            Some(alternative) => {
                self.compile_block(alternative);
                if self.last_instruction_is(Op::Pop) {
                    self.remove_last_instruction();
                }
            }
        }
        self.change_operand(jump_pos, self.current_len());
    }

    fn compile_function(&mut self, parameters: &[String], body: &BlockStatement) {
        self.enter_scope();
        for parameter in parameters {
            self.symbols.define(parameter);
        }
        self.compile_block(body);

        // an expression in tail position becomes the return value; a body
        // that does not end in a return gets an explicit null return
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_with_return_value();
        }
        if !self.last_instruction_is(Op::ReturnValue) && !self.last_instruction_is(Op::Return) {
            self.emit(Op::Return, &[]);
        }

        let (instructions, num_locals) = self.leave_scope();
        let function = CompiledFunction {
            instructions,
            num_locals: usize::from(num_locals),
            num_parameters: parameters.len(),
        };
        let index = self.add_constant(Constant::Function(Rc::new(function)));
        self.emit(Op::Constant, &[index]);
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilerScope::default());
        self.symbols.enter_scope();
    }

    fn leave_scope(&mut self) -> (Instructions, u16) {
        let scope = self.scopes.pop().expect("compiler scope stack is never empty");
        let num_locals = self.symbols.leave_scope();
        (scope.instructions, num_locals)
    }

    fn scope(&mut self) -> &mut CompilerScope {
        self.scopes.last_mut().expect("compiler scope stack is never empty")
    }

    fn current_len(&self) -> usize {
        self.scopes
            .last()
            .expect("compiler scope stack is never empty")
            .instructions
            .len()
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let scope = self.scope();
        let offset = scope.instructions.push(op, operands);
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction { op, offset });
        offset
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        self.scopes
            .last()
            .expect("compiler scope stack is never empty")
            .last
            .is_some_and(|ins| ins.op == op)
    }

    /// Removes the most recently emitted instruction in the current scope.
    fn remove_last_instruction(&mut self) {
        let scope = self.scope();
        let last = scope.last.expect("no instruction to remove");
        scope.instructions.truncate(last.offset);
        scope.last = scope.previous;
        scope.previous = None;
    }

    /// Rewrites a trailing `OpPop` into `OpReturnValue` in place.
    fn replace_last_with_return_value(&mut self) {
        let scope = self.scope();
        let last = scope.last.as_mut().expect("no instruction to replace");
        scope.instructions.replace_op(last.offset, Op::ReturnValue);
        last.op = Op::ReturnValue;
    }

    /// Backpatches the u16 operand of the instruction at `pos`.
    fn change_operand(&mut self, pos: usize, operand: usize) {
        if operand > usize::from(u16::MAX) {
            self.error(CompileError::JumpTooFar(operand));
            return;
        }
        self.scope().instructions.put_u16(pos + 1, operand as u16);
    }

    fn add_constant(&mut self, constant: Constant) -> usize {
        if self.constants.len() > usize::from(u16::MAX) {
            if !self.errors.contains(&CompileError::ConstantsOverflow) {
                self.error(CompileError::ConstantsOverflow);
            }
            return 0;
        }
        self.constants.push(constant);
        self.constants.len() - 1
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[usize::from(symbol.index)]),
            SymbolScope::Local => {
                if !self.check_local_index(symbol.index) {
                    return;
                }
                self.emit(Op::GetLocal, &[usize::from(symbol.index)])
            }
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[usize::from(symbol.index)]),
        };
    }

    fn store_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::SetGlobal, &[usize::from(symbol.index)]),
            SymbolScope::Local => {
                if !self.check_local_index(symbol.index) {
                    return;
                }
                self.emit(Op::SetLocal, &[usize::from(symbol.index)])
            }
            SymbolScope::Builtin => unreachable!("builtins are never assignment targets"),
        };
    }

    /// Local slots are addressed by a u8 operand; a 257th local in one
    /// function cannot be encoded.
    fn check_local_index(&mut self, index: u16) -> bool {
        if index > u16::from(u8::MAX) {
            self.error(CompileError::TooManyLocals(usize::from(index) + 1));
            false
        } else {
            true
        }
    }

    fn error(&mut self, error: CompileError) {
        self.errors.push(error);
    }
}

//! The abstract syntax tree produced by the parser.
//!
//! Nodes are plain tagged data; all dispatch over node kinds happens in the
//! compiler. `Display` reproduces a canonical source form — the compiler
//! relies on it to emit hash-literal keys in a deterministic order, and the
//! parser tests use it to check precedence grouping.

use std::fmt;

/// A parsed program: a sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let <name> = <value>;`
    Let { name: String, value: Expression },
    /// `return;` or `return <value>;`
    Return(Option<Expression>),
    /// A bare expression followed by an optional semicolon.
    Expression(Expression),
}

/// `{ <statements> }`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    IntegerLiteral(i64),
    BooleanLiteral(bool),
    StringLiteral(String),
    /// `<op><right>` where op is `-` or `!`.
    Prefix {
        op: String,
        right: Box<Expression>,
    },
    /// `<left> <op> <right>`. Operators travel as their source text; the
    /// compiler rejects the ones it does not know.
    Infix {
        op: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    FunctionLiteral {
        parameters: Vec<String>,
        body: BlockStatement,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ArrayLiteral(Vec<Expression>),
    /// Pairs in source order; the compiler sorts by key text before emitting.
    HashLiteral(Vec<(Expression, Expression)>),
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Let { name, value } => write!(f, "let {name} = {value};"),
            Self::Return(None) => write!(f, "return;"),
            Self::Return(Some(value)) => write!(f, "return {value};"),
            Self::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => f.write_str(name),
            Self::IntegerLiteral(value) => write!(f, "{value}"),
            Self::BooleanLiteral(value) => write!(f, "{value}"),
            Self::StringLiteral(value) => f.write_str(value),
            Self::Prefix { op, right } => write!(f, "({op}{right})"),
            Self::Infix { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {condition} {consequence}")?;
                if let Some(alt) = alternative {
                    write!(f, " else {alt}")?;
                }
                Ok(())
            }
            Self::FunctionLiteral { parameters, body } => {
                write!(f, "fn({}) {body}", parameters.join(", "))
            }
            Self::Call {
                function,
                arguments,
            } => {
                let args: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{function}({})", args.join(", "))
            }
            Self::ArrayLiteral(elements) => {
                let elems: Vec<String> = elements.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Self::HashLiteral(pairs) => {
                let pairs: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Self::Index { left, index } => write!(f, "({left}[{index}])"),
        }
    }
}

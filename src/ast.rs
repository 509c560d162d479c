use crate::stack::ensure_sufficient_stack;
use std::{
    fmt::{self, Display, Formatter},
    mem,
    rc::Rc,
};

/// A parsed source unit: the top-level statements in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A `{ ... }` body owned by an `si` branch or a function literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Let { name: String, value: Expression },
    Return(Expression),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Identifier(String),
    Integer(i64),
    Boolean(bool),
    String(String),
    Prefix {
        operator: UnaryOp,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    /// The body is shared with every closure created from this literal.
    Function {
        parameters: Vec<String>,
        body: Rc<Block>,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(_)
                | Expression::Integer(_)
                | Expression::Boolean(_)
                | Expression::String(_)
        )
    }

    /// Moves every compound child into `pending`, leaving leaves behind.
    fn detach_children(&mut self, pending: &mut Vec<Expression>) {
        fn detach(slot: &mut Expression, pending: &mut Vec<Expression>) {
            if !slot.is_leaf() {
                pending.push(mem::replace(slot, Expression::Boolean(false)));
            }
        }

        fn detach_block(block: &mut Block, pending: &mut Vec<Expression>) {
            for statement in block.statements.drain(..) {
                let (Statement::Let { value: expr, .. }
                | Statement::Return(expr)
                | Statement::Expression(expr)) = statement;
                if !expr.is_leaf() {
                    pending.push(expr);
                }
            }
        }

        match self {
            Expression::Identifier(_)
            | Expression::Integer(_)
            | Expression::Boolean(_)
            | Expression::String(_) => {}
            Expression::Prefix { right, .. } => detach(right, pending),
            Expression::Infix { left, right, .. } => {
                detach(left, pending);
                detach(right, pending);
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                detach(condition, pending);
                detach_block(consequence, pending);
                if let Some(alternative) = alternative {
                    detach_block(alternative, pending);
                }
            }
            // A body still shared with a live closure is released with it.
            Expression::Function { body, .. } => {
                if let Some(body) = Rc::get_mut(body) {
                    detach_block(body, pending);
                }
            }
            Expression::Call {
                function,
                arguments,
            } => {
                detach(function, pending);
                pending.extend(arguments.drain(..).filter(|arg| !arg.is_leaf()));
            }
        }
    }
}

// Long operator chains nest far deeper than the native stack allows for
// the recursive drop glue, so subtrees are torn down from a worklist.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    Greater,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Negate => write!(f, "-"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
        };
        write!(f, "{}", symbol)
    }
}

// The printers below emit source that parses back into the same tree:
// every prefix and infix expression is fully parenthesized and every
// statement is terminated.

fn write_statements(f: &mut Formatter<'_>, statements: &[Statement]) -> fmt::Result {
    for (i, statement) in statements.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", statement)?;
    }
    Ok(())
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_statements(f, &self.statements)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return write!(f, "{{ }}");
        }
        write!(f, "{{ ")?;
        write_statements(f, &self.statements)?;
        write!(f, " }}")
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "variable {} = {};", name, value),
            Statement::Return(value) => write!(f, "regresa {};", value),
            Statement::Expression(expr) => write!(f, "{};", expr),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Integer(value) => write!(f, "{}", value),
            Expression::Boolean(true) => write!(f, "verdadero"),
            Expression::Boolean(false) => write!(f, "falso"),
            Expression::String(value) => write!(f, "\"{}\"", value.escape_debug()),
            Expression::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "si ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " si_no {}", alternative)?;
                }
                Ok(())
            }
            Expression::Function { parameters, body } => {
                write!(f, "procedimiento({}) {}", parameters.join(", "), body)
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
        })
    }
}

use crate::{ast::Block, environment::Environment, error::RuntimeError};
use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

#[derive(Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    String(String),
    Function(Rc<Function>),
    Builtin(Builtin),
    Error(RuntimeError),
    Null,
}

/// A closure: the literal's parameters and shared body, plus the
/// environment that was active where the literal was evaluated.
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Rc<Block>,
    pub env: Environment,
}

pub type BuiltinFn = fn(&[Object]) -> Result<Object, RuntimeError>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Integer,
    Boolean,
    String,
    Function,
    Builtin,
    Error,
    Null,
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::String => "STRING",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::Error => "ERROR",
            ObjectType::Null => "NULL",
        };
        write!(f, "{}", name)
    }
}

impl Object {
    pub fn kind(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::String(_) => ObjectType::String,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::Error(_) => ObjectType::Error,
            Object::Null => ObjectType::Null,
        }
    }

    /// Only `falso` and `nulo` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }
}

// Functions compare by identity; everything else by value.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
            (Object::Error(a), Object::Error(b)) => a == b,
            (Object::Null, Object::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Object {}

impl Display for Object {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "{}", n),
            Object::Boolean(true) => write!(f, "verdadero"),
            Object::Boolean(false) => write!(f, "falso"),
            Object::String(s) => write!(f, "{}", s),
            Object::Function(func) => write!(f, "{}", func),
            Object::Builtin(builtin) => write!(f, "builtin {}", builtin.name),
            Object::Error(err) => write!(f, "Error: {}", err),
            Object::Null => write!(f, "nulo"),
        }
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Object::String(s) = self {
            write!(f, "\"{}\"", s.escape_debug())
        } else {
            write!(f, "{}", self)
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "procedimiento({}) {}",
            self.parameters.join(", "),
            self.body
        )
    }
}

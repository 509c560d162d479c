use crate::{
    error::RuntimeError,
    object::{Builtin, Object},
};

/// Host functions visible to every program. The evaluator consults this
/// table only after the environment chain, so user bindings shadow it.
const BUILTINS: &[Builtin] = &[Builtin {
    name: "longitud",
    func: longitud,
}];

pub fn lookup(name: &str) -> Option<Object> {
    BUILTINS
        .iter()
        .find(|builtin| builtin.name == name)
        .copied()
        .map(Object::Builtin)
}

fn expect_arity(args: &[Object], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::WrongArgumentCount {
            expected,
            got: args.len(),
        })
    }
}

fn longitud(args: &[Object]) -> Result<Object, RuntimeError> {
    expect_arity(args, 1)?;

    match &args[0] {
        Object::String(s) => Ok(Object::Integer(s.chars().count() as i64)),
        other => Err(RuntimeError::UnsupportedArgument {
            function: "longitud",
            got: other.kind(),
        }),
    }
}

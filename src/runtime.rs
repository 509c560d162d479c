use crate::{
    ast::{BinaryOp, Block, Expression, Program, Statement, UnaryOp},
    environment::Environment,
    error::{Error, Result, RuntimeError},
    object::{Function, Object},
    parser::parse,
    stack::ensure_sufficient_stack,
    stdlib,
};
use log::{debug, trace};
use std::rc::Rc;

/// Matches the recursion limit of the interpreter this language started on.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Why evaluation of a statement stopped early. `Return` unwinds to the
/// nearest call boundary, `Error` all the way to `evaluate`.
#[derive(Debug)]
pub enum Signal {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}

type EvalResult = std::result::Result<Object, Signal>;

/// Evaluates a program with the default call-depth limit.
pub fn evaluate(program: &Program, env: &Environment) -> Object {
    Evaluator::default().evaluate(program, env)
}

pub struct Evaluator {
    depth: usize,
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::with_max_call_depth(DEFAULT_MAX_CALL_DEPTH)
    }
}

impl Evaluator {
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    /// Runs `program` against `env`. A top-level `regresa` ends the program
    /// with its value; a runtime error comes back as `Object::Error`.
    pub fn evaluate(&mut self, program: &Program, env: &Environment) -> Object {
        self.depth = 0;

        match self.eval_statements(&program.statements, env) {
            Ok(value) | Err(Signal::Return(value)) => value,
            Err(Signal::Error(err)) => {
                debug!("runtime error: {}", err);
                Object::Error(err)
            }
        }
    }

    /// Parses `source` and evaluates it unless the parser reported errors.
    pub fn interpret(&mut self, source: &str, env: &Environment) -> Result<Object> {
        let (program, errors) = parse(source);
        if !errors.is_empty() {
            return Err(Error::Parser(errors));
        }
        Ok(self.evaluate(&program, env))
    }

    fn eval_statements(&mut self, statements: &[Statement], env: &Environment) -> EvalResult {
        let mut result = Object::Null;

        for statement in statements {
            result = self.eval_statement(statement, env)?;
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &Block, env: &Environment) -> EvalResult {
        self.eval_statements(&block.statements, env)
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Environment) -> EvalResult {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expression(value, env)?;
                env.set(name.as_str(), value);
                Ok(Object::Null)
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value, env)?;
                Err(Signal::Return(value))
            }
            Statement::Expression(expr) => self.eval_expression(expr, env),
        }
    }

    fn eval_expression(&mut self, expr: &Expression, env: &Environment) -> EvalResult {
        ensure_sufficient_stack(|| match expr {
            Expression::Identifier(name) => env
                .get(name)
                .or_else(|| stdlib::lookup(name))
                .ok_or_else(|| Signal::from(RuntimeError::IdentifierNotFound(name.clone()))),
            Expression::Integer(value) => Ok(Object::Integer(*value)),
            Expression::Boolean(value) => Ok(Object::Boolean(*value)),
            Expression::String(value) => Ok(Object::String(value.clone())),
            Expression::Prefix { operator, right } => {
                let right = self.eval_expression(right, env)?;
                eval_prefix(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env)?;
                let right = self.eval_expression(right, env)?;
                eval_infix(*operator, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env)?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Object::Null)
                }
            }
            Expression::Function { parameters, body } => {
                Ok(Object::Function(Rc::new(Function {
                    parameters: parameters.clone(),
                    body: Rc::clone(body),
                    env: env.clone(),
                })))
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env)?;
                if !matches!(function, Object::Function(_) | Object::Builtin(_)) {
                    return Err(RuntimeError::NotAFunction(function.kind()).into());
                }

                let mut evaluated_args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    evaluated_args.push(self.eval_expression(arg, env)?);
                }

                self.apply_function(function, evaluated_args)
            }
        })
    }

    fn apply_function(&mut self, function: Object, arguments: Vec<Object>) -> EvalResult {
        match function {
            Object::Function(function) => {
                if function.parameters.len() != arguments.len() {
                    return Err(RuntimeError::WrongArgumentCount {
                        expected: function.parameters.len(),
                        got: arguments.len(),
                    }
                    .into());
                }
                if self.depth >= self.max_depth {
                    return Err(RuntimeError::CallDepthExceeded(self.max_depth).into());
                }

                trace!("call {} at depth {}", function, self.depth);

                // The new frame hangs off the defining scope, not the caller's.
                let call_env = Environment::new_enclosed(&function.env);
                for (param, arg) in function.parameters.iter().zip(arguments) {
                    call_env.set(param.as_str(), arg);
                }

                self.depth += 1;
                let result = self.eval_block(&function.body, &call_env);
                self.depth -= 1;

                match result {
                    Err(Signal::Return(value)) => Ok(value),
                    other => other,
                }
            }
            Object::Builtin(builtin) => Ok((builtin.func)(&arguments)?),
            other => Err(RuntimeError::NotAFunction(other.kind()).into()),
        }
    }
}

fn eval_prefix(operator: UnaryOp, right: Object) -> EvalResult {
    match operator {
        UnaryOp::Not => Ok(Object::Boolean(!right.is_truthy())),
        UnaryOp::Negate => match right {
            Object::Integer(n) => n
                .checked_neg()
                .map(Object::Integer)
                .ok_or_else(|| RuntimeError::NegationOverflow(n).into()),
            other => Err(RuntimeError::UnknownPrefixOperator {
                operator: operator.to_string(),
                operand: other.kind(),
            }
            .into()),
        },
    }
}

fn eval_infix(operator: BinaryOp, left: Object, right: Object) -> EvalResult {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => eval_integer_infix(operator, a, b),
        (Object::String(a), Object::String(b)) => eval_string_infix(operator, a, b),
        (left, right) => match operator {
            BinaryOp::Equal => Ok(Object::Boolean(left == right)),
            BinaryOp::NotEqual => Ok(Object::Boolean(left != right)),
            _ if left.kind() != right.kind() => Err(RuntimeError::TypeMismatch {
                left: left.kind(),
                operator: operator.to_string(),
                right: right.kind(),
            }
            .into()),
            _ => Err(RuntimeError::UnknownInfixOperator {
                left: left.kind(),
                operator: operator.to_string(),
                right: right.kind(),
            }
            .into()),
        },
    }
}

fn eval_integer_infix(operator: BinaryOp, a: i64, b: i64) -> EvalResult {
    let value = match operator {
        BinaryOp::Add => a.checked_add(b).ok_or_else(|| overflow(a, operator, b))?,
        BinaryOp::Subtract => a.checked_sub(b).ok_or_else(|| overflow(a, operator, b))?,
        BinaryOp::Multiply => a.checked_mul(b).ok_or_else(|| overflow(a, operator, b))?,
        BinaryOp::Divide => floor_div(a, b)?,
        BinaryOp::Equal => return Ok(Object::Boolean(a == b)),
        BinaryOp::NotEqual => return Ok(Object::Boolean(a != b)),
        BinaryOp::Less => return Ok(Object::Boolean(a < b)),
        BinaryOp::Greater => return Ok(Object::Boolean(a > b)),
    };
    Ok(Object::Integer(value))
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> std::result::Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let quotient = a
        .checked_div(b)
        .ok_or_else(|| overflow(a, BinaryOp::Divide, b))?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn overflow(left: i64, operator: impl ToString, right: i64) -> RuntimeError {
    RuntimeError::IntegerOverflow {
        left,
        operator: operator.to_string(),
        right,
    }
}

fn eval_string_infix(operator: BinaryOp, a: String, b: String) -> EvalResult {
    match operator {
        BinaryOp::Add => Ok(Object::String(a + &b)),
        BinaryOp::Equal => Ok(Object::Boolean(a == b)),
        BinaryOp::NotEqual => Ok(Object::Boolean(a != b)),
        _ => Err(RuntimeError::UnknownInfixOperator {
            left: crate::object::ObjectType::String,
            operator: operator.to_string(),
            right: crate::object::ObjectType::String,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{object::ObjectType, parser::parse};
    use pretty_assertions::assert_eq;

    fn run_in(source: &str, env: &Environment) -> Object {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "{:?} for {}", errors, source);
        evaluate(&program, env)
    }

    fn run(source: &str) -> Object {
        run_in(source, &Environment::new())
    }

    #[test]
    fn test_integer_evaluation() {
        let cases = [
            ("5", 5),
            ("10", 10),
            ("-5", -5),
            ("-10", -10),
            ("5 + 5", 10),
            ("5 - 10", -5),
            ("2 * 2 * 2 * 2", 16),
            ("2 * 5 - 3", 7),
            ("50 / 2", 25),
            ("2 * (5 - 3)", 4),
            ("(2 + 7) / 3", 3),
            ("50 / 2 * 2 + 10", 60),
            ("5 / 2", 2),
            ("-7 / 2", -4),
            ("7 / -2", -4),
            ("-8 / 2", -4),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Integer(expected), "{}", source);
        }
    }

    #[test]
    fn test_boolean_evaluation() {
        let cases = [
            ("verdadero", true),
            ("falso", false),
            ("1 < 2", true),
            ("1 > 2", false),
            ("1 < 1", false),
            ("1 > 1", false),
            ("1 == 1", true),
            ("1 != 1", false),
            ("1 == 2", false),
            ("1 != 2", true),
            ("verdadero == verdadero", true),
            ("falso == falso", true),
            ("verdadero == falso", false),
            ("verdadero != falso", true),
            ("(1 < 2) == verdadero", true),
            ("(1 < 2) == falso", false),
            ("(1 > 2) == verdadero", false),
            ("(1 > 2) == falso", true),
            ("1 == verdadero", false),
            ("1 != verdadero", true),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Boolean(expected), "{}", source);
        }
    }

    #[test]
    fn test_bang_operator() {
        let cases = [
            ("!verdadero", false),
            ("!falso", true),
            ("!!verdadero", true),
            ("!!falso", false),
            ("!5", false),
            ("!!5", true),
            ("!0", false),
            ("!si (falso) { 1 }", true),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Boolean(expected), "{}", source);
        }
    }

    #[test]
    fn test_if_else_evaluation() {
        let cases = [
            ("si (verdadero) { 10 }", Object::Integer(10)),
            ("si (falso) { 10 }", Object::Null),
            ("si (1) { 10 }", Object::Integer(10)),
            ("si (0) { 10 }", Object::Integer(10)),
            ("si (1 < 2) { 10 }", Object::Integer(10)),
            ("si (1 > 2) { 10 }", Object::Null),
            ("si (1 < 2) { 10 } si_no { 20 }", Object::Integer(10)),
            ("si (1 > 2) { 10 } si_no { 20 }", Object::Integer(20)),
            ("si (verdadero) { }", Object::Null),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), expected, "{}", source);
        }
    }

    #[test]
    fn test_return_evaluation() {
        let cases = [
            ("regresa 10;", 10),
            ("regresa 10; 9;", 10),
            ("regresa 2 * 5; 9;", 10),
            ("9; regresa 3 * 6; 9;", 18),
            (
                "
                si (10 > 1) {
                    si (20 > 10) {
                        regresa 1;
                    }

                    regresa 0;
                }
                ",
                1,
            ),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Integer(expected), "{}", source);
        }
    }

    #[test]
    fn test_return_ends_the_function_body() {
        let source = "
            variable f = procedimiento(x) {
                si (x > 0) {
                    si (verdadero) {
                        regresa 1;
                    }
                    regresa 2;
                }
                regresa 3;
            };
            f(5) * 10 + f(-5);
        ";
        assert_eq!(run(source), Object::Integer(13));
    }

    #[test]
    fn test_error_handling() {
        let cases = [
            ("5 + verdadero", "type mismatch: INTEGER + BOOLEAN"),
            ("5 + verdadero; 9;", "type mismatch: INTEGER + BOOLEAN"),
            ("-verdadero", "unknown operator: -BOOLEAN"),
            ("verdadero + falso;", "unknown operator: BOOLEAN + BOOLEAN"),
            ("5; verdadero - falso; 10;", "unknown operator: BOOLEAN - BOOLEAN"),
            (
                "si (10 > 7) { regresa verdadero + falso; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            (
                "
                si (10 > 1) {
                    si (verdadero) {
                        regresa verdadero * falso
                    }
                    regresa 1;
                }
                ",
                "unknown operator: BOOLEAN * BOOLEAN",
            ),
            (
                "si (5 < 2) { regresa 1; } si_no { regresa verdadero / falso; }",
                "unknown operator: BOOLEAN / BOOLEAN",
            ),
            ("foobar;", "identifier not found: foobar"),
            ("\"Hola\" - \"Mundo\"", "unknown operator: STRING - STRING"),
            ("\"uno\" + 1", "type mismatch: STRING + INTEGER"),
            ("5(1)", "not a function: INTEGER"),
            ("1 / 0", "division by zero"),
            ("9223372036854775807 + 1", "integer overflow: 9223372036854775807 + 1"),
            (
                "-(0 - 9223372036854775807 - 1)",
                "integer overflow: -(-9223372036854775808)",
            ),
            (
                "procedimiento(x) { x }(1, 2)",
                "wrong number of arguments: expected 1, got 2",
            ),
            ("longitud(1)", "unsupported argument for longitud: got INTEGER"),
        ];
        for (source, expected) in cases {
            match run(source) {
                Object::Error(err) => assert_eq!(err.to_string(), expected, "{}", source),
                other => panic!("Expected error for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_assignment_statements() {
        let cases = [
            ("variable a = 5; a;", 5),
            ("variable a = 5 * 5; a;", 25),
            ("variable a = 5; variable b = a; b;", 5),
            ("variable a = 5; variable b = a; variable c = a + b + 5; c;", 15),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Integer(expected), "{}", source);
        }
        assert_eq!(run("variable a = 5;"), Object::Null);
    }

    #[test]
    fn test_function_object() {
        match run("procedimiento(x) { x + 2; };") {
            Object::Function(function) => {
                assert_eq!(function.parameters, vec!["x".to_string()]);
                assert_eq!(function.body.to_string(), "{ (x + 2); }");
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_calls() {
        let cases = [
            ("variable identidad = procedimiento(x) { x }; identidad(5);", 5),
            (
                "variable identidad = procedimiento(x) { regresa x; }; identidad(5);",
                5,
            ),
            (
                "variable doble = procedimiento(x) { regresa 2 * x; }; doble(5);",
                10,
            ),
            (
                "variable suma = procedimiento(x, y) { regresa x + y; }; suma(3, 8);",
                11,
            ),
            (
                "variable suma = procedimiento(x, y) { regresa x + y; }; suma(5 + 5, suma(10, 10));",
                30,
            ),
            ("procedimiento(x) { x }(5)", 5),
            (
                "variable aplica_dos_veces = procedimiento(f, x) { f(f(x)) };
                 aplica_dos_veces(procedimiento(x) { x + 1 }, 5);",
                7,
            ),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::Integer(expected), "{}", source);
        }
        assert_eq!(run("procedimiento() { }()"), Object::Null);
    }

    #[test]
    fn test_closures() {
        let env = Environment::new();
        let source = "
            variable sumador = procedimiento(x) {
                regresa procedimiento(y) { regresa x + y; };
            };
            variable suma_dos = sumador(2);
            suma_dos(5);
        ";
        assert_eq!(run_in(source, &env), Object::Integer(7));
        assert_eq!(run_in("sumador(5)(20);", &env), Object::Integer(25));
        assert_eq!(run_in("suma_dos(5);", &env), Object::Integer(7));
    }

    #[test]
    fn test_closure_sees_later_bindings_of_its_scope() {
        let source = "
            variable f = procedimiento() { tarde };
            variable tarde = 3;
            f();
        ";
        assert_eq!(run(source), Object::Integer(3));
    }

    #[test]
    fn test_recursion() {
        let source = "
            variable fibonacci = procedimiento(n) {
                si (n < 2) { regresa n; }
                regresa fibonacci(n - 1) + fibonacci(n - 2);
            };
            fibonacci(15);
        ";
        assert_eq!(run(source), Object::Integer(610));
    }

    #[test]
    fn test_conditionals_in_functions() {
        let env = Environment::new();
        run_in(
            "variable mayor_de_edad = procedimiento(edad) {
                si (edad > 18) { regresa verdadero; } si_no { regresa falso; }
            };",
            &env,
        );
        assert_eq!(run_in("mayor_de_edad(20);", &env), Object::Boolean(true));
        assert_eq!(run_in("mayor_de_edad(15);", &env), Object::Boolean(false));
    }

    #[test]
    fn test_shadowing_inside_function() {
        let source = "
            variable x = 1;
            variable f = procedimiento() { variable x = 2; x };
            f() * 10 + x;
        ";
        assert_eq!(run(source), Object::Integer(21));
    }

    #[test]
    fn test_argument_errors_short_circuit() {
        let env = Environment::new();
        let source = "
            variable contador = 0;
            variable f = procedimiento(a, b) { a };
            f(desconocido, contador_sube());
        ";
        assert_eq!(
            run_in(source, &env),
            Object::Error(RuntimeError::IdentifierNotFound("desconocido".to_string()))
        );
        assert_eq!(
            run_in("f(1, 2);", &env),
            Object::Integer(1),
            "environment survives the error"
        );
    }

    #[test]
    fn test_errors_are_not_bound() {
        let env = Environment::new();
        let result = run_in("variable x = 1 + verdadero;", &env);
        assert_eq!(result.kind(), ObjectType::Error);
        assert_eq!(env.get("x"), None);
    }

    #[test]
    fn test_string_evaluation() {
        let cases = [
            ("\"Hello world!\"", "Hello world!"),
            (
                "procedimiento() { regresa \"Platzi is great\"; }()",
                "Platzi is great",
            ),
            ("\"Hola\" + \" \" + \"mundo!\"", "Hola mundo!"),
        ];
        for (source, expected) in cases {
            assert_eq!(run(source), Object::String(expected.to_string()), "{}", source);
        }
        assert_eq!(run("\"a\" == \"a\""), Object::Boolean(true));
        assert_eq!(run("\"a\" != \"a\""), Object::Boolean(false));
    }

    #[test]
    fn test_builtins() {
        assert_eq!(run("longitud(\"\")"), Object::Integer(0));
        assert_eq!(run("longitud(\"cuatro\")"), Object::Integer(6));
        assert_eq!(
            run("longitud(\"uno\", \"dos\")"),
            Object::Error(RuntimeError::WrongArgumentCount {
                expected: 1,
                got: 2
            })
        );
        assert_eq!(
            run("variable longitud = procedimiento(s) { 99 }; longitud(\"a\")"),
            Object::Integer(99)
        );
    }

    #[test]
    fn test_function_equality_is_identity() {
        let source = "
            variable f = procedimiento() { 1 };
            variable g = f;
            (f == g) == (f != procedimiento() { 1 });
        ";
        assert_eq!(run(source), Object::Boolean(true));
    }

    #[test]
    fn test_long_expressions_evaluate() {
        let terms = 200_000;
        assert_eq!(
            run(&format!("1{}", " + 1".repeat(terms))),
            Object::Integer(terms as i64 + 1)
        );
        assert_eq!(run(&format!("{}1", "-".repeat(terms))), Object::Integer(1));
        assert_eq!(run(&format!("{}verdadero", "!".repeat(terms + 1))), Object::Boolean(false));
    }

    #[test]
    fn test_long_function_body_is_shared() {
        let env = Environment::new();
        let source = format!(
            "variable f = procedimiento() {{ 1{} }}; variable g = f; f();",
            " + 1".repeat(50_000)
        );
        assert_eq!(run_in(&source, &env), Object::Integer(50_001));

        match (env.get("f"), env.get("g")) {
            (Some(Object::Function(f)), Some(Object::Function(g))) => {
                assert!(Rc::ptr_eq(&f, &g));
                assert!(f.to_string().starts_with("procedimiento() { (((("));
            }
            other => panic!("Expected two bound functions, got {:?}", other),
        }
    }

    #[test]
    fn test_unbounded_recursion_is_an_error() {
        let source = "variable f = procedimiento(n) { f(n + 1) }; f(0);";
        assert_eq!(
            run(source),
            Object::Error(RuntimeError::CallDepthExceeded(DEFAULT_MAX_CALL_DEPTH))
        );

        let (program, _) = parse(source);
        let mut evaluator = Evaluator::with_max_call_depth(10);
        assert_eq!(
            evaluator.evaluate(&program, &Environment::new()),
            Object::Error(RuntimeError::CallDepthExceeded(10))
        );
    }

    #[test]
    fn test_depth_is_released_after_calls() {
        let source = "
            variable cuenta = procedimiento(n) {
                si (n == 0) { regresa 0; }
                regresa 1 + cuenta(n - 1);
            };
            cuenta(8) + cuenta(8);
        ";
        let (program, _) = parse(source);
        let mut evaluator = Evaluator::with_max_call_depth(10);
        assert_eq!(
            evaluator.evaluate(&program, &Environment::new()),
            Object::Integer(16)
        );
    }
}

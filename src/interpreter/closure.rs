use std::mem;
use std::rc::Rc;

use crate::error::EvalError;
use crate::interpreter::environment::Environment;
use crate::interpreter::evaluator::evaluate_expr;
use crate::interpreter::symbols::{SymbolId, SymbolTable, AS_ID, LAMBDA_ID, RETURNS_ID, SELF_ID};
use crate::interpreter::value::{Entity, TypeTag, Value};
use crate::parser::ast::Expr;

/// The shared, immutable part of a lambda: typed parameters, declared
/// return type and the unevaluated body form.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaDef {
    pub(crate) params: Vec<(SymbolId, TypeTag)>,
    pub(crate) return_type: TypeTag,
    pub(crate) body: Expr,
}

/// Capture state of a closure. `Pending` is the literal as produced by
/// `lambda`; the snapshot is replaced once, by the `let` freeze step, which
/// turns it into `Fixed`. There is no way back.
#[derive(Debug, Clone)]
pub enum ClosureEnv {
    Pending(Rc<Environment>),
    Fixed(Rc<Environment>),
}

#[derive(Debug, Clone)]
pub struct Closure {
    pub(crate) def: Rc<LambdaDef>,
    pub(crate) env: ClosureEnv,
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
            && mem::discriminant(&self.env) == mem::discriminant(&other.env)
    }
}

impl Closure {
    pub fn is_pending(&self) -> bool {
        matches!(self.env, ClosureEnv::Pending(_))
    }

    pub fn params(&self) -> &[(SymbolId, TypeTag)] {
        &self.def.params
    }

    pub fn return_type(&self) -> TypeTag {
        self.def.return_type
    }

    fn captured(&self) -> &Rc<Environment> {
        match &self.env {
            ClosureEnv::Pending(env) | ClosureEnv::Fixed(env) => env,
        }
    }

    pub(crate) fn render(&self) -> String {
        format!(
            "Lambda(({}) -> {})",
            self.def
                .params
                .iter()
                .map(|(_, t)| t.name().to_string())
                .collect::<Vec<String>>()
                .join(", "),
            self.def.return_type
        )
    }
}

fn soft(message: String) -> Result<Value, EvalError> {
    Ok(Value::Entity(Entity::error(message)))
}

/// `(lambda ((name as Type) ...) returns Type body)` produces a pending
/// closure capturing a clone of the current environment. A bare `self` body
/// is a hard syntax error: self-reference without a `let` binding cannot
/// terminate and is rejected outright.
pub(crate) fn evaluate_lambda(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &Environment,
) -> Result<Value, EvalError> {
    const SHAPE: &str = "invalid lambda syntax: expected (lambda (parameters) returns Type body)";

    if items.len() != 5 {
        return soft(SHAPE.to_string());
    }
    let Expr::Form(param_forms) = &items[1] else {
        return soft(SHAPE.to_string());
    };
    if !matches!(&items[2], Expr::Symbol(id) if *id == RETURNS_ID) {
        return soft(SHAPE.to_string());
    }
    let return_type = match &items[3] {
        Expr::Symbol(id) => TypeTag::from_symbol(*id),
        _ => None,
    };
    let Some(return_type) = return_type else {
        return soft(format!(
            "invalid type '{}' for lambda return",
            items[3].to_text(symbols)
        ));
    };

    let mut params: Vec<(SymbolId, TypeTag)> = Vec::new();
    for param in param_forms {
        let parts = match param {
            Expr::Form(parts) if parts.len() == 3 => parts,
            _ => return soft("invalid parameter: expected (name as Type)".to_string()),
        };
        let (Expr::Symbol(name), Expr::Symbol(marker), Expr::Symbol(type_id)) =
            (&parts[0], &parts[1], &parts[2])
        else {
            return soft("invalid parameter: expected (name as Type)".to_string());
        };
        if *marker != AS_ID {
            return soft("invalid parameter: expected (name as Type)".to_string());
        }
        let Some(param_type) = TypeTag::from_symbol(*type_id) else {
            return soft(format!(
                "invalid type '{}' for parameter '{}'",
                symbols.name(*type_id),
                symbols.name(*name)
            ));
        };
        if params.iter().any(|(existing, _)| existing == name) {
            return soft(format!("duplicate parameter '{}'", symbols.name(*name)));
        }
        params.push((*name, param_type));
    }

    let body = &items[4];
    if matches!(body, Expr::Symbol(id) if *id == SELF_ID) {
        return Err(EvalError::SelfReference);
    }

    Ok(Value::Closure(Closure {
        def: Rc::new(LambdaDef {
            params,
            return_type,
            body: body.clone(),
        }),
        env: ClosureEnv::Pending(Rc::new(env.clone())),
    }))
}

/// The `let` freeze step: every pending closure bound in the new scope gets
/// its capture replaced by a clone of that scope and becomes fixed. Declared
/// bindings freeze first, in declaration order, each written back before the
/// next snapshot is taken; any remaining pending closures (e.g. inherited
/// closure-valued parameters) follow by id.
pub(crate) fn freeze_pending(scope: &mut Environment, declared: &[SymbolId]) {
    let mut order: Vec<SymbolId> = declared.to_vec();
    let mut rest: Vec<SymbolId> = scope
        .bindings()
        .filter(|(id, value)| {
            !declared.contains(id) && matches!(value, Value::Closure(c) if c.is_pending())
        })
        .map(|(id, _)| id)
        .collect();
    rest.sort_unstable();
    order.extend(rest);

    for id in order {
        let pending = match scope.lookup(id) {
            Some(Value::Closure(c)) if c.is_pending() => Some(Rc::clone(&c.def)),
            _ => None,
        };
        if let Some(def) = pending {
            tracing::trace!(binding = id, "freezing closure environment");
            let snapshot = Rc::new(scope.clone());
            scope.bind(
                id,
                Value::Closure(Closure {
                    def,
                    env: ClosureEnv::Fixed(snapshot),
                }),
            );
        }
    }
}

/// Applies a closure to argument expressions, per the scoping policy:
/// the evaluation scope is a clone of the captured environment with the
/// caller's scope merged underneath it (captured side wins collisions), and
/// arguments evaluate against that merged scope.
pub(crate) fn apply(
    closure: &Closure,
    args: &[Expr],
    symbols: &SymbolTable,
    caller: &Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let def = &closure.def;
    tracing::debug!(params = def.params.len(), "applying closure");

    if args.len() != def.params.len() {
        return soft(format!(
            "argument count mismatch: expected {} but got {}",
            def.params.len(),
            args.len()
        ));
    }

    let mut scope = closure.captured().as_ref().clone();
    scope.merge_caller(caller);

    for ((name, param_type), arg) in def.params.iter().zip(args) {
        let value = evaluate_expr(arg, symbols, &mut scope, depth + 1)?;
        if matches!(value, Value::Nil) {
            return soft("nil argument not allowed".to_string());
        }
        let value = coerce_argument(*param_type, value);
        let matches_type = match (*param_type, &value) {
            (TypeTag::Lambda, Value::Closure(_)) => true,
            (expected, Value::Entity(e)) => e.kind == expected,
            _ => false,
        };
        if !matches_type {
            return soft(format!(
                "type mismatch for '{}': expected {} but got {}",
                symbols.name(*name),
                param_type,
                value.describe()
            ));
        }
        scope.bind(*name, value);
    }

    // A lambda-form body comes back as a fresh closure instead of being
    // invoked, so applications can return closures.
    if def.body.head_symbol() == Some(LAMBDA_ID) {
        let Expr::Form(body_items) = &def.body else {
            unreachable!("a form head implies a form")
        };
        return evaluate_lambda(body_items, symbols, &scope);
    }

    // A body that calls the closure being applied by name sees it unbound.
    scope.retain_bindings(|_, value| {
        !matches!(value, Value::Closure(c) if Rc::ptr_eq(&c.def, def))
    });

    let result = match evaluate_expr(&def.body, symbols, &mut scope, depth + 1) {
        Ok(value) => value,
        // Hard failures raised inside the body stop here, as error values.
        Err(failure) => return Ok(Value::Entity(Entity::error(failure.to_string()))),
    };

    match &result {
        Value::Closure(_) => Ok(result),
        Value::Entity(e) if e.kind == def.return_type => Ok(result),
        other => soft(format!(
            "return type mismatch: expected {} but got {}",
            def.return_type,
            other.describe()
        )),
    }
}

// Raw natives adapt to the declared parameter type; integers promote to
// float. Entities and closures pass through untouched.
fn coerce_argument(param_type: TypeTag, value: Value) -> Value {
    match (param_type, value) {
        (TypeTag::Integer, Value::Integer(x)) => Value::Entity(Entity::integer(x)),
        (TypeTag::Float, Value::Integer(x)) => Value::Entity(Entity::float(x as f32)),
        (TypeTag::Float, Value::Float(x)) => Value::Entity(Entity::float(x)),
        (TypeTag::Boolean, Value::Boolean(b)) => Value::Entity(Entity::boolean(b)),
        (TypeTag::String, Value::Str(s)) => Value::Entity(Entity::string(s)),
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::interpreter::value::{Payload, TypeTag, Value};
    use crate::{Error, EvalError, Interpreter};

    fn eval(source: &str) -> Value {
        Interpreter::new().evaluate(source).unwrap()
    }

    fn entity(value: &Value) -> &crate::Entity {
        match value {
            Value::Entity(e) => e,
            other => panic!("expected an entity, got {other:?}"),
        }
    }

    fn error_message(value: &Value) -> &str {
        let e = entity(value);
        assert!(e.is_error(), "expected an error entity, got {e:?}");
        e.message()
    }

    #[test]
    fn applies_a_typed_closure() {
        let value = eval(
            "(let ((inc be (lambda ((x as Integer)) returns Integer (add x 1)))) (inc 5))",
        );

        let e = entity(&value);
        assert_eq!(e.kind, TypeTag::Integer);
        assert_eq!(e.payload, Payload::Integer(6));
    }

    #[test]
    fn integer_argument_promotes_to_float_parameter() {
        let value = eval(
            "(let ((f be (lambda ((x as Float)) returns Float x))) (f 3))",
        );

        let e = entity(&value);
        assert_eq!(e.kind, TypeTag::Float);
        assert_eq!(e.payload, Payload::Float(3.0));
    }

    #[test]
    fn string_and_boolean_arguments_coerce() {
        let value = eval(
            r#"(let ((f be (lambda ((s as String)) returns String s))) (f "dog"))"#,
        );
        assert_eq!(
            entity(&value).payload,
            Payload::Str(Rc::new("dog".to_string()))
        );

        let value = eval(
            "(let ((f be (lambda ((b as Boolean)) returns Boolean b))) (f true))",
        );
        assert_eq!(entity(&value).payload, Payload::Boolean(true));
    }

    #[test]
    fn argument_count_must_match() {
        let value = eval(
            "(let ((inc be (lambda ((x as Integer)) returns Integer (add x 1)))) (inc 1 2))",
        );

        assert!(error_message(&value).contains("argument count mismatch"));
    }

    #[test]
    fn nil_arguments_are_rejected() {
        let value = eval(
            "(let ((f be (lambda ((x as Integer)) returns Integer x))) (f nil))",
        );

        assert_eq!(error_message(&value), "nil argument not allowed");
    }

    #[test]
    fn type_mismatch_names_the_parameter() {
        let value = eval(
            r#"(let ((f be (lambda ((x as Integer)) returns Integer x))) (f (entity Noun "dog")))"#,
        );

        assert!(error_message(&value).contains("type mismatch for 'x'"));
    }

    #[test]
    fn lambda_parameters_accept_closures() {
        let value = eval(
            "(let ((twice be (lambda ((f as Lambda) (x as Integer)) returns Integer (f (f x)))) \
                   (inc be (lambda ((x as Integer)) returns Integer (add x 1)))) \
               (twice inc 3))",
        );

        assert_eq!(entity(&value).payload, Payload::Integer(5));
    }

    #[test]
    fn nested_lambda_body_returns_a_closure() {
        let value = eval(
            "(let ((make be (lambda ((n as Integer)) returns Lambda \
                              (lambda ((x as Integer)) returns Integer (add x n))))) \
               ((make 2) 5))",
        );

        assert_eq!(entity(&value).payload, Payload::Integer(7));
    }

    #[test]
    fn capture_survives_the_defining_scope() {
        let value = eval(
            "(let ((y be (entity Integer 100))) \
               (let ((g be (let ((y be (entity Integer 41)) \
                                 (f be (lambda ((x as Integer)) returns Integer (add x y)))) \
                             f))) \
                 (g 1)))",
        );

        assert_eq!(entity(&value).payload, Payload::Integer(42));
    }

    #[test]
    fn closure_sees_siblings_declared_after_it() {
        let value = eval(
            "(let ((f be (lambda ((x as Integer)) returns Integer (add x y))) \
                   (y be (entity Integer 5))) \
               (f 1))",
        );

        assert_eq!(entity(&value).payload, Payload::Integer(6));
    }

    #[test]
    fn arguments_evaluate_in_the_merged_scope() {
        // The captured binding of y wins over the caller's rebinding, for
        // argument expressions too.
        let value = eval(
            "(let ((y be (entity Integer 10)) \
                   (f be (lambda ((x as Integer)) returns Integer x))) \
               (let ((y be (entity Integer 99))) \
                 (f y)))",
        );

        assert_eq!(entity(&value).payload, Payload::Integer(10));
    }

    #[test]
    fn self_recursion_reports_unbound() {
        let value = eval(
            "(let ((f be (lambda ((x as Integer)) returns Integer (f (add x -1))))) (f 5))",
        );

        assert!(error_message(&value).contains("Unbound variable: f"));
    }

    #[test]
    fn hard_failures_in_the_body_become_error_entities() {
        let value = eval(
            "(let ((f be (lambda ((x as Integer)) returns Integer (add x q)))) (f 1))",
        );

        assert!(error_message(&value).contains("Unbound variable: q"));
    }

    #[test]
    fn return_type_is_checked() {
        let value = eval(
            r#"(let ((f be (lambda ((x as Integer)) returns Noun x))) (f 1))"#,
        );

        assert!(error_message(&value).contains("return type mismatch"));
    }

    #[test]
    fn bare_self_body_is_a_hard_error() {
        let result =
            Interpreter::new().evaluate("(lambda ((x as Integer)) returns Integer self)");

        assert_eq!(result, Err(Error::Eval(EvalError::SelfReference)));
    }

    #[test]
    fn top_level_lambda_is_pending_until_let_binds_it() {
        let pending = eval("(lambda ((x as Integer)) returns Integer x)");
        let Value::Closure(c) = pending else {
            panic!("expected a closure")
        };
        assert!(c.is_pending());

        let fixed = eval("(let ((f be (lambda ((x as Integer)) returns Integer x))) f)");
        let Value::Closure(c) = fixed else {
            panic!("expected a closure")
        };
        assert!(!c.is_pending());
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let value = eval(
            "(lambda ((x as Integer) (x as Float)) returns Integer x)",
        );

        assert!(error_message(&value).contains("duplicate parameter 'x'"));
    }

    #[test]
    fn malformed_lambda_shapes_are_soft_failures() {
        assert!(error_message(&eval("(lambda (x) returns Integer x)"))
            .contains("invalid parameter"));
        assert!(error_message(&eval("(lambda ((x as Integer)) Integer x)"))
            .contains("invalid lambda syntax"));
        assert!(error_message(&eval("(lambda ((x as Animal)) returns Integer x)"))
            .contains("invalid type 'Animal'"));
    }
}

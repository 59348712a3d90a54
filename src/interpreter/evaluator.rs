use std::rc::Rc;

use nohash_hasher::IntMap;

use crate::error::EvalError;
use crate::interpreter::closure;
use crate::interpreter::environment::Environment;
use crate::interpreter::symbols::{
    SymbolId, SymbolTable, ADD_ID, ADJECTIVE_KEY_ID, BE_ID, ENTITY_ID, FOR_ID, IMPL_ID, LAMBDA_ID,
    LET_ID, LIST_ID, MAP_ID, NOUN_ID, OBJECT_ID, ROLE_ID, SUBJECT_ID,
};
use crate::interpreter::value::{Entity, Payload, TraitTag, TypeTag, Value};
use crate::parser::ast::Expr;
use crate::parser::grammar;

// Evaluation is plain call-stack recursion, one frame per nested form. The
// depth counter turns would-be stack exhaustion into a reported failure.
pub(crate) const MAX_DEPTH: usize = 1000;

const LISTABLE: [TypeTag; 5] = [
    TypeTag::Noun,
    TypeTag::Time,
    TypeTag::Verb,
    TypeTag::Integer,
    TypeTag::Float,
];

fn soft(message: String) -> Result<Value, EvalError> {
    Ok(Value::Entity(Entity::error(message)))
}

pub(crate) fn evaluate_expr(
    expr: &Expr,
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    if depth >= MAX_DEPTH {
        return Err(EvalError::RecursionLimit);
    }

    match expr {
        Expr::Integer(x) => Ok(Value::Integer(*x)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Nil => Ok(Value::Nil),
        Expr::Keyword(id) => Ok(Value::Keyword(*id)),
        Expr::Symbol(id) => match env.lookup(*id) {
            Some(value) => Ok(value.clone()),
            None => Err(EvalError::UnboundVariable(symbols.name(*id).to_string())),
        },
        Expr::Form(items) => evaluate_form(items, symbols, env, depth),
    }
}

fn evaluate_form(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let Some(head) = items.first() else {
        return Ok(Value::Nil);
    };

    if let Expr::Symbol(head_id) = head {
        if let Some(desugared) = desugar(items, *head_id) {
            return evaluate_entity(&desugared, symbols, env, depth);
        }

        return match *head_id {
            ENTITY_ID => evaluate_entity(items, symbols, env, depth),
            LIST_ID => evaluate_list(items, symbols, env, depth),
            ADD_ID => evaluate_add(items, symbols, env, depth),
            LET_ID => evaluate_let(items, symbols, env, depth),
            IMPL_ID => evaluate_impl(items, symbols, env),
            LAMBDA_ID => closure::evaluate_lambda(items, symbols, env),
            MAP_ID => Err(EvalError::UnknownOperator("map".to_string())),
            _ => match env.lookup(*head_id).cloned() {
                Some(Value::Closure(applied)) => {
                    closure::apply(&applied, &items[1..], symbols, env, depth)
                }
                Some(_) => Err(EvalError::UnknownOperator(symbols.name(*head_id).to_string())),
                None => Err(EvalError::UnboundVariable(symbols.name(*head_id).to_string())),
            },
        };
    }

    if let Expr::Form(_) = head {
        let head_value = evaluate_expr(head, symbols, env, depth + 1)?;
        return match head_value {
            Value::Closure(applied) => closure::apply(&applied, &items[1..], symbols, env, depth),
            other => Err(EvalError::UnknownOperator(other.describe())),
        };
    }

    Err(EvalError::UnknownOperator(head.to_text(symbols)))
}

// Rewrites a type-sugar form into the equivalent `entity` form before
// dispatch. `Subject`/`Object` are `Noun` sugar that injects a `role`
// attribute in front of any trailing key/value pairs.
fn desugar(items: &[Expr], head_id: SymbolId) -> Option<Vec<Expr>> {
    if head_id == SUBJECT_ID || head_id == OBJECT_ID {
        let role = if head_id == SUBJECT_ID {
            "subject"
        } else {
            "object"
        };
        let mut map_items = vec![
            Expr::Symbol(MAP_ID),
            Expr::Keyword(ROLE_ID),
            Expr::Str(Rc::new(role.to_string())),
        ];
        map_items.extend_from_slice(items.get(2..).unwrap_or(&[]));

        let mut entity_items = vec![Expr::Symbol(ENTITY_ID), Expr::Symbol(NOUN_ID)];
        if let Some(payload) = items.get(1) {
            entity_items.push(payload.clone());
            entity_items.push(Expr::Form(map_items));
        }
        return Some(entity_items);
    }

    if TypeTag::from_symbol(head_id).is_some() {
        let mut entity_items = vec![Expr::Symbol(ENTITY_ID)];
        entity_items.extend_from_slice(items);
        let Expr::Form(entity_items) = grammar::expand_map_shorthand(entity_items) else {
            unreachable!("shorthand expansion always yields a form")
        };
        return Some(entity_items);
    }

    None
}

fn evaluate_entity(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    if items.len() < 3 {
        return soft("invalid entity syntax: expected (entity Type value)".to_string());
    }

    let tag = match &items[1] {
        Expr::Symbol(id) => TypeTag::from_symbol(*id),
        _ => None,
    };
    let Some(tag) = tag else {
        return soft(format!("unknown type '{}'", items[1].to_text(symbols)));
    };

    let payload_value = evaluate_expr(&items[2], symbols, env, depth + 1)?;
    let payload = match Entity::coerce_payload(tag, &payload_value) {
        Ok(payload) => payload,
        Err(message) => return soft(message),
    };

    // A non-map third argument means no attributes.
    let attrs = match items.get(3) {
        Some(form @ Expr::Form(map_items)) if form.head_symbol() == Some(MAP_ID) => {
            match evaluate_attr_map(map_items, symbols, env, depth)? {
                Ok(attrs) => attrs,
                Err(error) => return Ok(Value::Entity(error)),
            }
        }
        _ => IntMap::default(),
    };

    Ok(Value::Entity(Entity::new(tag, payload, attrs)))
}

// Attribute values are evaluated once; only the reserved `adjective` key is
// additionally checked to produce an Adjective entity.
fn evaluate_attr_map(
    map_items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Result<IntMap<SymbolId, Value>, Entity>, EvalError> {
    let pairs = &map_items[1..];
    if pairs.len() % 2 != 0 {
        let key = pairs
            .last()
            .map(|k| k.to_text(symbols))
            .unwrap_or_default();
        return Ok(Err(Entity::error(format!("unpaired map key '{key}'"))));
    }

    let mut attrs = IntMap::default();
    for pair in pairs.chunks(2) {
        let Expr::Keyword(key) = &pair[0] else {
            return Ok(Err(Entity::error(format!(
                "invalid map key '{}': expected a keyword",
                pair[0].to_text(symbols)
            ))));
        };
        let key = *key;

        let value = evaluate_expr(&pair[1], symbols, env, depth + 1)?;
        if key == ADJECTIVE_KEY_ID {
            let is_adjective =
                matches!(&value, Value::Entity(e) if e.kind == TypeTag::Adjective);
            if !is_adjective {
                return Ok(Err(Entity::error(format!(
                    "attribute 'adjective' must evaluate to an Adjective entity, got {}",
                    value.describe()
                ))));
            }
        }
        attrs.insert(key, value);
    }
    Ok(Ok(attrs))
}

fn evaluate_list(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let mut seq = Vec::new();
    for item in &items[1..] {
        let value = evaluate_expr(item, symbols, env, depth + 1)?;
        match value {
            Value::Entity(e) if LISTABLE.contains(&e.kind) => seq.push(e),
            other => return soft(format!("cannot list {}", other.describe())),
        }
    }
    Ok(Value::Seq(seq))
}

fn evaluate_add(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let operands = &items[1..];
    if operands.is_empty() {
        return soft("insufficient arguments: 'add' requires at least one operand".to_string());
    }

    let mut int_sum: i64 = 0;
    let mut float_sum: f32 = 0.0;
    let mut saw_float = false;
    for operand in operands {
        let value = evaluate_expr(operand, symbols, env, depth + 1)?;
        let numeric = match &value {
            Value::Entity(e) => match (e.kind, &e.payload) {
                (TypeTag::Integer, Payload::Integer(x)) => {
                    int_sum += x;
                    true
                }
                (TypeTag::Float, Payload::Float(x)) => {
                    saw_float = true;
                    float_sum += x;
                    true
                }
                _ => false,
            },
            _ => false,
        };
        if !numeric {
            return soft(format!(
                "expected Numeric operand for 'add' but got {}",
                value.describe()
            ));
        }
    }

    if saw_float {
        Ok(Value::Entity(Entity::float(float_sum + int_sum as f32)))
    } else {
        Ok(Value::Entity(Entity::integer(int_sum)))
    }
}

fn evaluate_let(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let Some(Expr::Form(bindings)) = items.get(1) else {
        return soft("invalid binding: expected a list of (name be value) bindings".to_string());
    };

    let mut scope = env.child_scope();
    let mut declared = Vec::new();
    for binding in bindings {
        let parts = match binding {
            Expr::Form(parts) if parts.len() == 3 => parts,
            _ => return soft("invalid binding: expected (name be value)".to_string()),
        };
        let (Expr::Symbol(name), Expr::Symbol(marker)) = (&parts[0], &parts[1]) else {
            return soft("invalid binding: expected (name be value)".to_string());
        };
        if *marker != BE_ID {
            return soft("invalid binding: expected (name be value)".to_string());
        }

        // Later bindings see earlier ones.
        let value = evaluate_expr(&parts[2], symbols, &mut scope, depth + 1)?;
        scope.bind(*name, value);
        declared.push(*name);
    }

    closure::freeze_pending(&mut scope, &declared);

    let mut result = Value::Nil;
    for body in &items[2..] {
        result = evaluate_expr(body, symbols, &mut scope, depth + 1)?;
    }
    Ok(result)
}

fn evaluate_impl(
    items: &[Expr],
    symbols: &SymbolTable,
    env: &mut Environment,
) -> Result<Value, EvalError> {
    let shape = match items {
        [_, Expr::Symbol(capability), Expr::Symbol(marker), Expr::Symbol(tag)]
            if *marker == FOR_ID =>
        {
            Some((*capability, *tag))
        }
        _ => None,
    };
    let Some((capability_id, tag_id)) = shape else {
        return soft("invalid impl syntax: expected (impl Trait for Type)".to_string());
    };

    let Some(capability) = TraitTag::from_name(symbols.name(capability_id)) else {
        return soft(format!("invalid trait '{}'", symbols.name(capability_id)));
    };
    let Some(tag) = TypeTag::from_symbol(tag_id) else {
        return soft(format!("invalid type '{}'", symbols.name(tag_id)));
    };

    // Mutates the currently active environment in place: inside a `let`
    // that is the let's clone, at top level the long-lived environment.
    env.register_trait(tag, capability);
    Ok(Value::Entity(Entity::boolean(true)))
}

use std::fmt::Display;
use std::rc::Rc;

use nohash_hasher::IntMap;

use crate::interpreter::closure::Closure;
use crate::interpreter::symbols::{
    SymbolId, SymbolTable, ADJECTIVE_ID, ADVERB_ID, BOOLEAN_ID, ERROR_ID, FLOAT_ID, INTEGER_ID,
    LAMBDA_TYPE_ID, NOUN_ID, PREPOSITION_ID, PRONOUN_ID, STRING_ID, TIME_ID, VERB_ID,
};

/// The closed set of type tags an entity can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Noun,
    Verb,
    Time,
    Adverb,
    String,
    Integer,
    Float,
    Boolean,
    Pronoun,
    Preposition,
    Adjective,
    Error,
    Lambda,
}

impl TypeTag {
    pub(crate) fn from_symbol(id: SymbolId) -> Option<TypeTag> {
        match id {
            NOUN_ID => Some(TypeTag::Noun),
            VERB_ID => Some(TypeTag::Verb),
            TIME_ID => Some(TypeTag::Time),
            ADVERB_ID => Some(TypeTag::Adverb),
            STRING_ID => Some(TypeTag::String),
            INTEGER_ID => Some(TypeTag::Integer),
            FLOAT_ID => Some(TypeTag::Float),
            BOOLEAN_ID => Some(TypeTag::Boolean),
            PRONOUN_ID => Some(TypeTag::Pronoun),
            PREPOSITION_ID => Some(TypeTag::Preposition),
            ADJECTIVE_ID => Some(TypeTag::Adjective),
            ERROR_ID => Some(TypeTag::Error),
            LAMBDA_TYPE_ID => Some(TypeTag::Lambda),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Noun => "Noun",
            TypeTag::Verb => "Verb",
            TypeTag::Time => "Time",
            TypeTag::Adverb => "Adverb",
            TypeTag::String => "String",
            TypeTag::Integer => "Integer",
            TypeTag::Float => "Float",
            TypeTag::Boolean => "Boolean",
            TypeTag::Pronoun => "Pronoun",
            TypeTag::Preposition => "Preposition",
            TypeTag::Adjective => "Adjective",
            TypeTag::Error => "Error",
            TypeTag::Lambda => "Lambda",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The closed set of capabilities a type can be declared to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitTag {
    Numeric,
    Relatable,
    Comparable,
    Printable,
}

impl TraitTag {
    pub fn from_name(name: &str) -> Option<TraitTag> {
        match name {
            "Numeric" => Some(TraitTag::Numeric),
            "Relatable" => Some(TraitTag::Relatable),
            "Comparable" => Some(TraitTag::Comparable),
            "Printable" => Some(TraitTag::Printable),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TraitTag::Numeric => "Numeric",
            TraitTag::Relatable => "Relatable",
            TraitTag::Comparable => "Comparable",
            TraitTag::Printable => "Printable",
        }
    }
}

impl Display for TraitTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Str(Rc<String>),
    Integer(i64),
    Float(f32),
    Boolean(bool),
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Str(s) => write!(f, "\"{s}\""),
            Payload::Integer(x) => write!(f, "{x}"),
            Payload::Float(x) => write!(f, "{x}"),
            Payload::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// An immutable typed value. The payload always matches the kind: entities
/// only come out of [`Entity::coerce_payload`] plus the private constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: TypeTag,
    pub payload: Payload,
    pub attrs: IntMap<SymbolId, Value>,
}

impl Entity {
    pub(crate) fn new(kind: TypeTag, payload: Payload, attrs: IntMap<SymbolId, Value>) -> Self {
        Self {
            kind,
            payload,
            attrs,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            TypeTag::Error,
            Payload::Str(Rc::new(message.into())),
            IntMap::default(),
        )
    }

    pub fn integer(x: i64) -> Self {
        Self::new(TypeTag::Integer, Payload::Integer(x), IntMap::default())
    }

    pub fn float(x: f32) -> Self {
        Self::new(TypeTag::Float, Payload::Float(x), IntMap::default())
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(TypeTag::Boolean, Payload::Boolean(b), IntMap::default())
    }

    pub fn string(s: Rc<String>) -> Self {
        Self::new(TypeTag::String, Payload::Str(s), IntMap::default())
    }

    pub fn is_error(&self) -> bool {
        self.kind == TypeTag::Error
    }

    pub fn message(&self) -> &str {
        match &self.payload {
            Payload::Str(s) => s.as_str(),
            _ => "",
        }
    }

    /// Checks an evaluated payload expression against the validation table
    /// for `kind`. Only raw native values satisfy the table; anything else
    /// is a shape mismatch reported as a soft failure by the caller.
    pub(crate) fn coerce_payload(kind: TypeTag, value: &Value) -> Result<Payload, String> {
        let expected = match kind {
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::Lambda => {
                return Err("type Lambda cannot be constructed from a payload".to_string())
            }
            _ => "string",
        };

        let payload = match (kind, value) {
            (TypeTag::Integer, Value::Integer(x)) => Some(Payload::Integer(*x)),
            (TypeTag::Float, Value::Float(x)) => Some(Payload::Float(*x)),
            (TypeTag::Boolean, Value::Boolean(b)) => Some(Payload::Boolean(*b)),
            (TypeTag::Integer | TypeTag::Float | TypeTag::Boolean | TypeTag::Lambda, _) => None,
            (_, Value::Str(s)) => Some(Payload::Str(Rc::clone(s))),
            _ => None,
        };

        payload.ok_or_else(|| {
            format!(
                "expected {expected} for type {kind} but got {}",
                value.describe()
            )
        })
    }
}

/// Anything evaluation can produce: a typed entity, a closure, a sequence
/// out of `list`, a raw native, a keyword, or the nil marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Entity(Entity),
    Closure(Closure),
    Seq(Vec<Entity>),
    Integer(i64),
    Float(f32),
    Str(Rc<String>),
    Boolean(bool),
    Keyword(SymbolId),
    Nil,
}

impl Value {
    /// Short description used in soft-failure messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Value::Entity(e) => format!("entity of type {}", e.kind),
            Value::Closure(_) => "closure".to_string(),
            Value::Seq(_) => "list".to_string(),
            Value::Integer(x) => format!("{x}"),
            Value::Float(x) => format!("{x}"),
            Value::Str(s) => format!("\"{s}\""),
            Value::Boolean(b) => format!("{b}"),
            Value::Keyword(_) => "keyword".to_string(),
            Value::Nil => "nil".to_string(),
        }
    }

    pub fn render(&self, symbols: &SymbolTable) -> String {
        match self {
            Value::Entity(e) => {
                if e.attrs.is_empty() {
                    return format!("{}({})", e.kind, e.payload);
                }
                let mut attrs: Vec<(&str, String)> = e
                    .attrs
                    .iter()
                    .map(|(k, v)| (symbols.name(*k), v.render(symbols)))
                    .collect();
                attrs.sort_by_key(|(k, _)| *k);
                format!(
                    "{}({}) {{{}}}",
                    e.kind,
                    e.payload,
                    attrs
                        .iter()
                        .map(|(k, v)| format!(":{k} {v}"))
                        .collect::<Vec<String>>()
                        .join(", ")
                )
            }
            Value::Closure(c) => c.render(),
            Value::Seq(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|e| Value::Entity(e.clone()).render(symbols))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Value::Integer(x) => format!("{x}"),
            Value::Float(x) => format!("{x}"),
            Value::Str(s) => format!("\"{s}\""),
            Value::Boolean(b) => format!("{b}"),
            Value::Keyword(id) => format!(":{}", symbols.name(*id)),
            Value::Nil => "nil".to_string(),
        }
    }
}

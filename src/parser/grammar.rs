use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SyntaxError;
use crate::interpreter::symbols::{
    SymbolId, SymbolTable, ADD_ID, ENTITY_ID, FLOAT_ID, IMPL_ID, INTEGER_ID, LAMBDA_ID, LET_ID,
    LIST_ID, MAP_ID,
};
use crate::parser::ast::Expr;
use crate::parser::token_stream::{Token, TokenStream};

static INTEGER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").unwrap());

// Heads whose raw numeric elements get wrapped into explicit entity forms.
// `entity` itself and the sugar type names are exempt so literal payloads
// reach validation untouched.
const COERCING_HEADS: [SymbolId; 6] = [LIST_ID, ADD_ID, LET_ID, IMPL_ID, LAMBDA_ID, MAP_ID];

/// Consumes one balanced `(...)` group off the stream and applies the two
/// structural rewrites (literal coercion, map-shorthand expansion) bottom-up.
pub fn parse(stream: &mut TokenStream, symbols: &mut SymbolTable) -> Result<Expr, SyntaxError> {
    let expr = parse_group(stream, symbols)?;
    Ok(rewrite(expr))
}

/// The raw descent, without rewrites. Round-tripping through
/// `Expr::to_text` is lossless on this tree.
pub(crate) fn parse_group(
    stream: &mut TokenStream,
    symbols: &mut SymbolTable,
) -> Result<Expr, SyntaxError> {
    let open_info = match stream.advance() {
        Some(Token::Open(info)) => info,
        Some(token) => return Err(SyntaxError::ExpectedOpenParen { info: token.info() }),
        None => {
            return Err(SyntaxError::ExpectedOpenParen {
                info: stream.last_info(),
            })
        }
    };

    let mut items = Vec::new();
    loop {
        match stream.peek() {
            None => return Err(SyntaxError::UnclosedParenthesis { info: open_info }),
            Some(Token::Close(_)) => {
                stream.advance();
                return Ok(Expr::Form(items));
            }
            Some(Token::Open(_)) => items.push(parse_group(stream, symbols)?),
            Some(Token::Atom(_, _)) => {
                let Some(Token::Atom(text, _)) = stream.advance() else {
                    unreachable!("peeked an atom")
                };
                items.push(classify(&text, symbols)?);
            }
        }
    }
}

// Classification order matters: `true`/`false`/`nil` first, then strings,
// the single-quote rejection, numbers, keywords, and symbols as fallback.
fn classify(text: &str, symbols: &mut SymbolTable) -> Result<Expr, SyntaxError> {
    match text {
        "true" => Ok(Expr::Boolean(true)),
        "false" => Ok(Expr::Boolean(false)),
        "nil" => Ok(Expr::Nil),
        _ if text.starts_with('"') => {
            let inner = &text[1..];
            let inner = inner.strip_suffix('"').unwrap_or(inner);
            Ok(Expr::Str(Rc::new(inner.to_string())))
        }
        _ if text.starts_with('\'') => Err(SyntaxError::SingleQuote {
            token: text.to_string(),
        }),
        _ if INTEGER_REGEX.is_match(text) => Ok(Expr::Integer(text.parse().unwrap())),
        _ if FLOAT_REGEX.is_match(text) => Ok(Expr::Float(text.parse().unwrap())),
        _ if text.starts_with(':') => Ok(Expr::Keyword(symbols.get_id(&text[1..]))),
        _ => Ok(Expr::Symbol(symbols.get_id(text))),
    }
}

fn rewrite(expr: Expr) -> Expr {
    match expr {
        Expr::Form(items) => {
            let items = items.into_iter().map(rewrite).collect();
            expand_map_shorthand(coerce_literals(items))
        }
        other => other,
    }
}

fn coerce_literals(items: Vec<Expr>) -> Vec<Expr> {
    let coercing = matches!(
        items.first(),
        Some(Expr::Symbol(id)) if COERCING_HEADS.contains(id)
    );
    if !coercing {
        return items;
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if i == 0 {
                return item;
            }
            match item {
                Expr::Integer(x) => wrap_entity(INTEGER_ID, Expr::Integer(x)),
                Expr::Float(x) => wrap_entity(FLOAT_ID, Expr::Float(x)),
                other => other,
            }
        })
        .collect()
}

fn wrap_entity(type_id: SymbolId, literal: Expr) -> Expr {
    Expr::Form(vec![Expr::Symbol(ENTITY_ID), Expr::Symbol(type_id), literal])
}

// `(entity T v :k1 v1 :k2 v2)` becomes `(entity T v (map :k1 v1 :k2 v2))`
// when the 4th element is not already a form. The evaluator reuses this on
// type-sugar forms, which only become entity-headed after parsing.
pub(crate) fn expand_map_shorthand(items: Vec<Expr>) -> Expr {
    let is_entity = matches!(items.first(), Some(Expr::Symbol(id)) if *id == ENTITY_ID);
    if !is_entity || items.len() <= 3 || matches!(items[3], Expr::Form(_)) {
        return Expr::Form(items);
    }

    let mut items = items;
    let tail = items.split_off(3);
    let mut map_form = vec![Expr::Symbol(MAP_ID)];
    map_form.extend(tail);
    items.push(Expr::Form(coerce_literals(map_form)));
    Expr::Form(items)
}

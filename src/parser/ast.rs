use std::rc::Rc;

use crate::interpreter::symbols::{SymbolId, SymbolTable};

/// One node of the expression tree: an atomic literal or an ordered form.
/// Forms are never mutated after parsing; evaluation reads them as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f32),
    Str(Rc<String>),
    Boolean(bool),
    Nil,
    Symbol(SymbolId),
    Keyword(SymbolId),
    Form(Vec<Expr>),
}

impl Expr {
    pub(crate) fn head_symbol(&self) -> Option<SymbolId> {
        match self {
            Expr::Form(items) => match items.first() {
                Some(Expr::Symbol(id)) => Some(*id),
                _ => None,
            },
            _ => None,
        }
    }

    /// Serializes the node back to source text. On a tree built without the
    /// structural rewrites this is lossless up to whitespace and comments.
    pub fn to_text(&self, symbols: &SymbolTable) -> String {
        match self {
            Expr::Integer(x) => format!("{x}"),
            Expr::Float(x) => format!("{x:?}"),
            Expr::Str(s) => format!("\"{s}\""),
            Expr::Boolean(b) => format!("{b}"),
            Expr::Nil => "nil".to_string(),
            Expr::Symbol(id) => symbols.name(*id).to_string(),
            Expr::Keyword(id) => format!(":{}", symbols.name(*id)),
            Expr::Form(items) => format!(
                "({})",
                items
                    .iter()
                    .map(|item| item.to_text(symbols))
                    .collect::<Vec<String>>()
                    .join(" ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::interpreter::symbols::SymbolTable;

    use super::Expr;

    #[test]
    fn serializes_atoms_and_forms() {
        let mut symbols = SymbolTable::new();
        let dog = symbols.get_id("dog");

        let expr = Expr::Form(vec![
            Expr::Symbol(dog),
            Expr::Integer(-3),
            Expr::Float(2.5),
            Expr::Str(Rc::new("a dog".to_string())),
            Expr::Keyword(symbols.get_id("count")),
            Expr::Boolean(true),
            Expr::Nil,
        ]);

        assert_eq!(
            expr.to_text(&symbols),
            "(dog -3 2.5 \"a dog\" :count true nil)"
        );
    }

    #[test]
    fn float_serialization_keeps_decimal_point() {
        let symbols = SymbolTable::new();

        assert_eq!(Expr::Float(5.0).to_text(&symbols), "5.0");
    }
}

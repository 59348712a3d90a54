pub mod closure;
pub mod environment;
mod evaluator;
pub mod lexer;
pub mod symbols;
pub mod value;

use crate::error::Error;
use crate::interpreter::environment::Environment;
use crate::interpreter::lexer::Lexer;
use crate::interpreter::symbols::SymbolTable;
use crate::interpreter::value::Value;
use crate::parser::ast::Expr;
use crate::parser::grammar;

/// One interpreter instance: a symbol table plus the long-lived top-level
/// environment. `impl` forms evaluated at top level mutate that environment
/// and persist across `evaluate` calls; `let` and application scopes are
/// copies discarded on exit.
///
/// The interpreter is single-threaded (`Rc`-based and `!Send`). Evaluating
/// against one shared top-level environment from multiple threads is not
/// supported; use one interpreter per thread.
pub struct Interpreter {
    symbols: SymbolTable,
    env: Environment,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            env: Environment::new(),
        }
    }

    /// Tokenizes, parses and evaluates `source`. Top-level forms run left to
    /// right against the same environment; the last value is returned, and
    /// empty input yields the nil marker. Hard failures abort with `Err`;
    /// soft failures come back as `Error`-typed entities in `Ok`.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, Error> {
        tracing::debug!(source, "evaluating input");

        let mut stream = Lexer::token_stream(source)?;
        let mut result = Value::Nil;
        while stream.not_done() {
            let expr = grammar::parse(&mut stream, &mut self.symbols)?;
            result = evaluator::evaluate_expr(&expr, &self.symbols, &mut self.env, 0)?;
        }
        Ok(result)
    }

    /// Evaluates an already-parsed expression tree.
    pub fn evaluate_parsed(&mut self, expr: &Expr) -> Result<Value, Error> {
        Ok(evaluator::evaluate_expr(
            expr,
            &self.symbols,
            &mut self.env,
            0,
        )?)
    }

    /// Read-only view of the top-level environment, for inspection of
    /// registered traits and bindings.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Looks up a top-level binding by name without interning it.
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.symbols.lookup(name).and_then(|id| self.env.lookup(id))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

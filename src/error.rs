use crate::parser::token_stream::TokenInfo;

/// Structural failures raised while turning text into an expression tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unclosed quote at end of input")]
    UnclosedQuote,
    #[error("expected '(' at {info}")]
    ExpectedOpenParen { info: TokenInfo },
    #[error("unclosed parenthesis in group opened at {info}")]
    UnclosedParenthesis { info: TokenInfo },
    #[error("single quotes are not allowed: '{token}'")]
    SingleQuote { token: String },
}

/// Failures that abort an `evaluate` call outward instead of producing a
/// value. A closure-application boundary converts these into `Error`-typed
/// entities; everywhere else they propagate to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("lambda body cannot be a bare 'self' reference")]
    SelfReference,
    #[error("recursion limit exceeded")]
    RecursionLimit,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
}

pub mod ast;
pub mod grammar;
pub mod token_stream;

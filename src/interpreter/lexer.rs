use std::mem;
use std::rc::Rc;

use crate::error::SyntaxError;
use crate::parser::token_stream::{Token, TokenInfo, TokenStream};

pub struct Lexer;

impl Lexer {
    /// Splits source text into parenthesis and atom tokens. A double quote
    /// toggles quoting mode: while quoted, every character (parens,
    /// whitespace, `;`) is literal and accumulates into the current atom.
    /// Outside quotes `;` discards the rest of the line.
    pub fn token_stream(input: &str) -> Result<TokenStream, SyntaxError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut buffer = String::new();
        let mut buffer_start = TokenInfo::new(1, 1);
        let mut quoting = false;
        let mut in_comment = false;
        let mut line = 1;
        let mut col = 1;

        for c in input.chars() {
            let cur = TokenInfo::new(line, col);

            if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
            } else if quoting {
                if c == '"' {
                    quoting = false;
                }
                buffer.push(c);
            } else {
                match c {
                    '"' => {
                        if buffer.is_empty() {
                            buffer_start = cur;
                        }
                        buffer.push(c);
                        quoting = true;
                    }
                    '(' => {
                        Self::flush(&mut buffer, buffer_start, &mut tokens);
                        tokens.push(Token::Open(cur));
                    }
                    ')' => {
                        Self::flush(&mut buffer, buffer_start, &mut tokens);
                        tokens.push(Token::Close(cur));
                    }
                    ';' => {
                        Self::flush(&mut buffer, buffer_start, &mut tokens);
                        in_comment = true;
                    }
                    c if c.is_whitespace() => {
                        Self::flush(&mut buffer, buffer_start, &mut tokens);
                    }
                    _ => {
                        if buffer.is_empty() {
                            buffer_start = cur;
                        }
                        buffer.push(c);
                    }
                }
            }

            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }

        if quoting {
            return Err(SyntaxError::UnclosedQuote);
        }
        Self::flush(&mut buffer, buffer_start, &mut tokens);

        let last_info = match tokens.last() {
            Some(token) => token.info(),
            None => TokenInfo::new(1, 1),
        };
        Ok(TokenStream::new(Rc::new(tokens), last_info))
    }

    fn flush(buffer: &mut String, start: TokenInfo, tokens: &mut Vec<Token>) {
        if !buffer.is_empty() {
            tokens.push(Token::Atom(mem::take(buffer), start));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::parser::token_stream::{Token, TokenInfo, TokenStream};

    use super::Lexer;

    fn stream(tokens: Vec<Token>) -> TokenStream {
        let last_info = tokens.last().map(Token::info).unwrap_or(TokenInfo::new(1, 1));
        TokenStream::new(Rc::new(tokens), last_info)
    }

    #[test]
    fn test_identifier() {
        let result = Lexer::token_stream("identifier").unwrap();

        assert_eq!(
            result,
            stream(vec![Token::atom("identifier", TokenInfo::new(1, 1))])
        )
    }

    #[test]
    fn test_parenthesis_are_single_tokens() {
        let result = Lexer::token_stream("(add 1)(x)").unwrap();

        assert_eq!(
            result,
            stream(vec![
                Token::Open(TokenInfo::new(1, 1)),
                Token::atom("add", TokenInfo::new(1, 2)),
                Token::atom("1", TokenInfo::new(1, 6)),
                Token::Close(TokenInfo::new(1, 7)),
                Token::Open(TokenInfo::new(1, 8)),
                Token::atom("x", TokenInfo::new(1, 9)),
                Token::Close(TokenInfo::new(1, 10)),
            ])
        )
    }

    #[test]
    fn test_strings_keep_delimiters_and_inner_structure() {
        let result = Lexer::token_stream(r#"(entity Noun "a (dog); really")"#).unwrap();

        assert_eq!(
            result,
            stream(vec![
                Token::Open(TokenInfo::new(1, 1)),
                Token::atom("entity", TokenInfo::new(1, 2)),
                Token::atom("Noun", TokenInfo::new(1, 9)),
                Token::atom(r#""a (dog); really""#, TokenInfo::new(1, 14)),
                Token::Close(TokenInfo::new(1, 31)),
            ])
        )
    }

    #[test]
    fn test_comment_discards_to_end_of_line() {
        let result = Lexer::token_stream("ab;ignored (x)\ncd").unwrap();

        assert_eq!(
            result,
            stream(vec![
                Token::atom("ab", TokenInfo::new(1, 1)),
                Token::atom("cd", TokenInfo::new(2, 1)),
            ])
        )
    }

    #[test]
    fn test_trailing_token_is_flushed() {
        let result = Lexer::token_stream("  nil").unwrap();

        assert_eq!(result, stream(vec![Token::atom("nil", TokenInfo::new(1, 3))]))
    }

    #[test]
    fn test_unclosed_quote() {
        let result = Lexer::token_stream(r#"(entity Noun "open"#);

        assert_eq!(result, Err(crate::error::SyntaxError::UnclosedQuote))
    }

    #[test]
    fn test_empty_input() {
        let result = Lexer::token_stream(" ; only a comment\n").unwrap();

        assert!(!result.not_done())
    }
}

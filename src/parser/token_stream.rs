use std::fmt::Display;
use std::rc::Rc;

#[derive(Eq, PartialEq, Clone, Debug, Copy)]
pub struct TokenInfo {
    pub line: usize,
    pub col: usize,
}

impl TokenInfo {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Display for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Token {
    Open(TokenInfo),
    Close(TokenInfo),
    Atom(String, TokenInfo),
}

impl Token {
    pub fn atom(str: &str, info: TokenInfo) -> Self {
        Self::Atom(str.to_string(), info)
    }

    pub fn info(&self) -> TokenInfo {
        match self {
            Self::Open(info) | Self::Close(info) => *info,
            Self::Atom(_, info) => *info,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TokenStream {
    tokens: Rc<Vec<Token>>,
    start: usize,
    // token info of last token, to be used when stream end is reached
    last_info: TokenInfo,
}

impl TokenStream {
    pub fn new(tokens: Rc<Vec<Token>>, last_info: TokenInfo) -> Self {
        Self::with_offset(tokens, 0, last_info)
    }

    pub fn with_offset(tokens: Rc<Vec<Token>>, start: usize, last_info: TokenInfo) -> Self {
        Self {
            tokens,
            start,
            last_info,
        }
    }

    pub fn not_done(&self) -> bool {
        self.start < self.tokens.len()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.start)
    }

    pub fn last_info(&self) -> TokenInfo {
        self.last_info
    }

    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.start).cloned();
        if token.is_some() {
            self.start += 1;
        }
        token
    }
}

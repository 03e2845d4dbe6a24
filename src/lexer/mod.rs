use logos::Logos;

/// Every kind of token the scanner can hand to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character operators
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error,
    Eof,
}

/// A lexical unit. For `TokenKind::Error` the lexeme is the diagnostic
/// message rather than a slice of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub line: usize,
    pub lexeme: &'src str,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, lexeme: &'src str, line: usize) -> Self {
        Token { kind, line, lexeme }
    }
}

// Raw lexemes as matched by the generated automaton. Newlines survive so the
// scanner can keep its line counter; fractions are finished by hand because a
// bare trailing `.` must stay a separate token.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
enum Lexeme {
    #[token("\n")]
    Newline,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token(";")]
    Semicolon,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,

    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,

    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r#""[^"]*"#)]
    UnterminatedString,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    #[token("and")]
    And,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("fun")]
    Fun,
    #[token("if")]
    If,
    #[token("nil")]
    Nil,
    #[token("or")]
    Or,
    #[token("print")]
    Print,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,
}

impl Lexeme {
    /// Kind of the token this lexeme becomes. `None` for lexemes the scanner
    /// consumes itself.
    fn kind(self) -> Option<TokenKind> {
        use TokenKind as K;
        let kind = match self {
            Lexeme::Newline | Lexeme::UnterminatedString => return None,
            Lexeme::LeftParen => K::LeftParen,
            Lexeme::RightParen => K::RightParen,
            Lexeme::LeftBrace => K::LeftBrace,
            Lexeme::RightBrace => K::RightBrace,
            Lexeme::Comma => K::Comma,
            Lexeme::Dot => K::Dot,
            Lexeme::Minus => K::Minus,
            Lexeme::Plus => K::Plus,
            Lexeme::Semicolon => K::Semicolon,
            Lexeme::Slash => K::Slash,
            Lexeme::Star => K::Star,
            Lexeme::Bang => K::Bang,
            Lexeme::BangEqual => K::BangEqual,
            Lexeme::Equal => K::Equal,
            Lexeme::EqualEqual => K::EqualEqual,
            Lexeme::Greater => K::Greater,
            Lexeme::GreaterEqual => K::GreaterEqual,
            Lexeme::Less => K::Less,
            Lexeme::LessEqual => K::LessEqual,
            Lexeme::Integer => K::Number,
            Lexeme::String => K::String,
            Lexeme::Identifier => K::Identifier,
            Lexeme::And => K::And,
            Lexeme::Class => K::Class,
            Lexeme::Else => K::Else,
            Lexeme::False => K::False,
            Lexeme::For => K::For,
            Lexeme::Fun => K::Fun,
            Lexeme::If => K::If,
            Lexeme::Nil => K::Nil,
            Lexeme::Or => K::Or,
            Lexeme::Print => K::Print,
            Lexeme::Return => K::Return,
            Lexeme::Super => K::Super,
            Lexeme::This => K::This,
            Lexeme::True => K::True,
            Lexeme::Var => K::Var,
            Lexeme::While => K::While,
        };
        Some(kind)
    }
}

/// Pull-based scanner. Each call to [`Scanner::scan_token`] produces one
/// token; invalid input comes back as `TokenKind::Error` tokens, and once the
/// source is exhausted every further call yields `TokenKind::Eof`.
pub struct Scanner<'src> {
    lexer: logos::Lexer<'src, Lexeme>,
    line: usize,
    finished: bool,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            lexer: Lexeme::lexer(source),
            line: 1,
            finished: false,
        }
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        loop {
            let lexeme = match self.lexer.next() {
                None => return Token::new(TokenKind::Eof, "", self.line),
                Some(Ok(lexeme)) => lexeme,
                Some(Err(())) => return self.error_token("Unexpected character."),
            };

            match lexeme {
                Lexeme::Newline => {
                    self.line += 1;
                    continue;
                }
                Lexeme::Integer => self.fraction(),
                Lexeme::String => self.count_embedded_newlines(),
                Lexeme::UnterminatedString => {
                    self.count_embedded_newlines();
                    return self.error_token("Unterminated string.");
                }
                _ => {}
            }

            return match lexeme.kind() {
                Some(kind) => Token::new(kind, self.lexer.slice(), self.line),
                None => self.error_token("Unexpected character."),
            };
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token::new(TokenKind::Error, message, self.line)
    }

    // `12.5` is one number; `12.` leaves the dot for the next token.
    fn fraction(&mut self) {
        let rest = self.lexer.remainder().as_bytes();
        if rest.first() != Some(&b'.') {
            return;
        }
        let digits = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 {
            self.lexer.bump(1 + digits);
        }
    }

    fn count_embedded_newlines(&mut self) {
        self.line += self.lexer.slice().bytes().filter(|&b| b == b'\n').count();
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'src> Iterator for Scanner<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.scan_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

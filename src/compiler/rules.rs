use crate::lexer::TokenKind;

/// Binding power of an operator, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter. Binary operands parse at this level, which makes
    /// every binary operator left-associative.
    pub fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

/// Parselet tags. The compiler matches on these instead of storing
/// function pointers in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

const fn parse_rule(
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
) -> ParseRule {
    ParseRule { prefix, infix, precedence }
}

const NONE: ParseRule = parse_rule(None, None, Precedence::None);

/// The rule for a token kind. Kinds reserved for a richer grammar have no
/// parselets at all.
pub fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn::*;
    use TokenKind as K;
    match kind {
        K::LeftParen => parse_rule(Some(Grouping), None, Precedence::None),
        K::Minus => parse_rule(Some(Unary), Some(Binary), Precedence::Term),
        K::Plus => parse_rule(None, Some(Binary), Precedence::Term),
        K::Slash | K::Star => parse_rule(None, Some(Binary), Precedence::Factor),
        K::Bang => parse_rule(Some(Unary), None, Precedence::None),
        K::BangEqual | K::EqualEqual => parse_rule(None, Some(Binary), Precedence::Equality),
        K::Greater | K::GreaterEqual | K::Less | K::LessEqual => {
            parse_rule(None, Some(Binary), Precedence::Comparison)
        }
        K::Number => parse_rule(Some(Number), None, Precedence::None),
        K::False | K::Nil | K::True => parse_rule(Some(Literal), None, Precedence::None),
        K::RightParen
        | K::LeftBrace
        | K::RightBrace
        | K::Comma
        | K::Dot
        | K::Semicolon
        | K::Equal
        | K::Identifier
        | K::String
        | K::And
        | K::Class
        | K::Else
        | K::For
        | K::Fun
        | K::If
        | K::Or
        | K::Print
        | K::Return
        | K::Super
        | K::This
        | K::Var
        | K::While
        | K::Error
        | K::Eof => NONE,
    }
}

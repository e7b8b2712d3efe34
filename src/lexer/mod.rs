use logos::Logos;
use serde::Serialize;

use crate::unit::{NumberKind, Op, Scope, Span};

pub mod reader;
pub use reader::{Advance, Options, Reader, read_statement};

/// Outcome of walking a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberScan {
    Valid(NumberKind),
    /// A malformed prefix such as `0x` or `1e+`; scanning stopped at the
    /// first byte that could not continue the literal.
    Malformed,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    #[regex(r" +")]
    Blank,
    #[regex(r"\t+")]
    Tab,
    #[regex(r"[\r\n]+")]
    Newline,

    #[regex(r"[0-9.]", number_callback)]
    Number(NumberScan),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[token(",", |_| Op::Comma)]
    #[token(";", |_| Op::Semicolon)]
    #[token("(", |_| Op::Open(Scope::Group))]
    #[token(")", |_| Op::Close(Scope::Group))]
    #[token("[", |_| Op::Open(Scope::Index))]
    #[token("]", |_| Op::Close(Scope::Index))]
    #[token("{", |_| Op::Open(Scope::Array))]
    #[token("}", |_| Op::Close(Scope::Array))]
    #[token("+", |_| Op::Add)]
    #[token("-", |_| Op::Sub)]
    #[token("%", |_| Op::Mod)]
    #[token("*", |_| Op::Mul)]
    #[token("/", |_| Op::Div)]
    #[token("+=", |_| Op::AddAssign)]
    #[token("-=", |_| Op::SubAssign)]
    #[token("%=", |_| Op::ModAssign)]
    #[token("*=", |_| Op::MulAssign)]
    #[token("/=", |_| Op::DivAssign)]
    #[token("&", |_| Op::BitAnd)]
    #[token("|", |_| Op::BitOr)]
    #[token("^", |_| Op::BitXor)]
    #[token("<<", |_| Op::Shl)]
    #[token(">>", |_| Op::Shr)]
    #[token("!", |_| Op::Not)]
    #[token("~", |_| Op::BitNot)]
    #[token("&=", |_| Op::AndAssign)]
    #[token("|=", |_| Op::OrAssign)]
    #[token("^=", |_| Op::XorAssign)]
    #[token("<<=", |_| Op::ShlAssign)]
    #[token(">>=", |_| Op::ShrAssign)]
    #[token(">", |_| Op::Gt)]
    #[token("<", |_| Op::Lt)]
    #[token("<=", |_| Op::Le)]
    #[token(">=", |_| Op::Ge)]
    #[token("==", |_| Op::Eq)]
    #[token("!=", |_| Op::Ne)]
    #[token("&&", |_| Op::And)]
    #[token("||", |_| Op::Or)]
    #[token("=", |_| Op::Assign)]
    Operator(Op),
}

fn number_callback(lex: &mut logos::Lexer<Lexeme>) -> NumberScan {
    let start = lex.span().start;
    let (len, kind) = scan_number(&lex.source().as_bytes()[start..]);
    // the regex already consumed the lead byte
    lex.bump(len.saturating_sub(1));
    match kind {
        Some(kind) => NumberScan::Valid(kind),
        None => NumberScan::Malformed,
    }
}

#[derive(Clone, Copy)]
enum NumState {
    Zero,
    Decimal,
    LeadingDot,
    Dot,
    BinaryPrefix,
    HexPrefix,
    Binary,
    Octal,
    Hex,
    Fraction,
    ExponentMark,
    ExponentSign,
    Exponent,
}

/// Walk a numeric literal from the start of `bytes`.
///
/// Returns the number of bytes consumed and the literal's kind, or `None`
/// when the literal is malformed. A malformed literal still consumes the
/// bytes that were accepted before the failure.
pub fn scan_number(bytes: &[u8]) -> (usize, Option<NumberKind>) {
    use NumState::*;

    let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let mut state = match at(0) {
        b'0' => Zero,
        b'1'..=b'9' => Decimal,
        b'.' => LeadingDot,
        _ => return (0, None),
    };
    let mut i = 1;

    loop {
        let c = at(i);
        state = match state {
            Zero => match c {
                b'.' => Dot,
                b'b' => BinaryPrefix,
                b'x' => HexPrefix,
                b'0'..=b'7' => Octal,
                b'e' | b'E' => ExponentMark,
                _ => return (i, Some(NumberKind::Decimal)),
            },
            Decimal => match c {
                b'0'..=b'9' => Decimal,
                b'.' => Dot,
                b'e' | b'E' => ExponentMark,
                _ => return (i, Some(NumberKind::Decimal)),
            },
            LeadingDot => match c {
                b'0'..=b'9' => Fraction,
                b'e' | b'E' => ExponentMark,
                _ => return (i, None),
            },
            Dot | Fraction => match c {
                b'0'..=b'9' => Fraction,
                b'e' | b'E' => ExponentMark,
                _ => return (i, Some(NumberKind::Float)),
            },
            BinaryPrefix => match c {
                b'0' | b'1' => Binary,
                _ => return (i, None),
            },
            HexPrefix => match c {
                c if c.is_ascii_hexdigit() => Hex,
                _ => return (i, None),
            },
            Binary => match c {
                b'0' | b'1' => Binary,
                _ => return (i, Some(NumberKind::Binary)),
            },
            Octal => match c {
                b'0'..=b'7' => Octal,
                _ => return (i, Some(NumberKind::Octal)),
            },
            Hex => match c {
                c if c.is_ascii_hexdigit() => Hex,
                _ => return (i, Some(NumberKind::Hexadecimal)),
            },
            ExponentMark => match c {
                b'+' | b'-' => ExponentSign,
                b'0'..=b'9' => Exponent,
                _ => return (i, None),
            },
            ExponentSign => match c {
                b'0'..=b'9' => Exponent,
                _ => return (i, None),
            },
            Exponent => match c {
                b'0'..=b'9' => Exponent,
                _ => return (i, Some(NumberKind::Scientific)),
            },
        };
        i += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Whitespace {
    Blank,
    Tab,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Invalid {
    /// Printable byte outside the operator charset, or a control byte.
    Unknown,
    /// Non-ASCII character.
    Unicode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    End,
    Whitespace(Whitespace),
    /// `None` marks a malformed literal (not-a-number).
    Number(Option<NumberKind>),
    Identifier,
    Operator(Op),
    Invalid(Invalid),
}

impl TokenKind {
    /// Literals and identifiers: two of these may not be adjacent.
    pub fn is_operand(&self) -> bool {
        matches!(self, TokenKind::Number(_) | TokenKind::Identifier)
    }
}

/// A classified slice of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_nan(&self) -> bool {
        self.kind == TokenKind::Number(None)
    }

    pub fn op(&self) -> Option<Op> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }
}

/// Classify and slice the next lexeme at `cursor`.
///
/// Returns the token and the cursor just past it. At the end of input the
/// token is `TokenKind::End` and the cursor does not move.
pub fn next_token(source: &str, cursor: usize) -> (Token, usize) {
    let rest = source.get(cursor..).unwrap_or("");
    let mut lexer = Lexeme::lexer(rest);

    let Some(result) = lexer.next() else {
        let token = Token { kind: TokenKind::End, span: Span::new(cursor, cursor) };
        return (token, cursor);
    };

    let local = lexer.span();
    let span = Span::new(cursor + local.start, cursor + local.end);
    let kind = match result {
        Ok(Lexeme::Blank) => TokenKind::Whitespace(Whitespace::Blank),
        Ok(Lexeme::Tab) => TokenKind::Whitespace(Whitespace::Tab),
        Ok(Lexeme::Newline) => TokenKind::Whitespace(Whitespace::Newline),
        Ok(Lexeme::Number(NumberScan::Valid(kind))) => TokenKind::Number(Some(kind)),
        Ok(Lexeme::Number(NumberScan::Malformed)) => TokenKind::Number(None),
        Ok(Lexeme::Identifier) => TokenKind::Identifier,
        Ok(Lexeme::Operator(op)) => TokenKind::Operator(op),
        Err(()) => {
            let lead = rest.as_bytes().get(local.start).copied().unwrap_or(0);
            TokenKind::Invalid(if lead >= 0x80 { Invalid::Unicode } else { Invalid::Unknown })
        }
    };

    (Token { kind, span }, span.end)
}

/// Lex the whole source into raw tokens, whitespace included. Unlike the
/// reader this does no statement splitting and no separator or length checks.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    loop {
        let (token, next) = next_token(source, cursor);
        if token.kind == TokenKind::End {
            break;
        }
        tokens.push(token);
        cursor = next;
    }
    tokens
}

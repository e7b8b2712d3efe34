use crate::error::{ExceptionRecord, Position, Result, SyntaxError};
use crate::unit::Op;

use super::{Invalid, Token, TokenKind, Whitespace, next_token};

/// Lexer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Columns a tab advances.
    pub tab_width: usize,
    /// Longest identifier accepted.
    pub max_symbol_len: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { tab_width: 4, max_symbol_len: 32 }
    }
}

/// What the reader found next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Token(Token),
    EndOfStatement,
    EndOfInput,
}

/// Stateful token reader over a script buffer.
///
/// Skips whitespace, keeps the row/column position current and rejects
/// invalid bytes, malformed numbers, overlong symbols and adjacent operands.
pub struct Reader<'src> {
    source: &'src str,
    cursor: usize,
    position: Position,
    last: Option<TokenKind>,
    options: Options,
}

impl<'src> Reader<'src> {
    pub fn new(source: &'src str, options: Options) -> Self {
        Reader::resume(source, 0, Position { row: 1, col: 1 }, options)
    }

    /// Continue reading `source` from `cursor` with the position already reached.
    pub fn resume(source: &'src str, cursor: usize, position: Position, options: Options) -> Self {
        Reader { source, cursor, position, last: None, options }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// The next significant token, statement terminator or end of input.
    pub fn advance(&mut self) -> Result<Advance> {
        loop {
            let (token, next) = next_token(self.source, self.cursor);
            let at = self.position;
            self.cursor = next;
            let fail = |error: SyntaxError| {
                Err(ExceptionRecord::at(error, token.span).with_position(at))
            };

            match token.kind {
                TokenKind::End => return Ok(Advance::EndOfInput),
                TokenKind::Whitespace(ws) => {
                    let text = token.span.text(self.source);
                    match ws {
                        Whitespace::Blank => self.position.col += text.len(),
                        Whitespace::Tab => self.position.col += text.len() * self.options.tab_width,
                        Whitespace::Newline => {
                            self.position.row += count_lines(text);
                            self.position.col = 1;
                        }
                    }
                }
                TokenKind::Invalid(invalid) => {
                    self.position.col += 1;
                    return match invalid {
                        Invalid::Unknown => fail(SyntaxError::BeyondCharset),
                        Invalid::Unicode => fail(SyntaxError::UnicodeChar),
                    };
                }
                TokenKind::Operator(Op::Semicolon) => {
                    self.position.col += 1;
                    self.last = None;
                    return Ok(Advance::EndOfStatement);
                }
                kind => {
                    self.position.col += token.span.len();
                    let previous = self.last.replace(kind);
                    if token.is_nan() {
                        return fail(SyntaxError::InvalidNumberLiteral);
                    }
                    if kind == TokenKind::Identifier && token.span.len() > self.options.max_symbol_len {
                        return fail(SyntaxError::SymbolTooLong);
                    }
                    if kind.is_operand() && previous.is_some_and(|p| p.is_operand()) {
                        return fail(SyntaxError::ExpectSeparator);
                    }
                    return Ok(Advance::Token(token));
                }
            }
        }
    }
}

/// `\r\n` counts as one line break.
fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut lines = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            i += 2;
        } else {
            i += 1;
        }
        lines += 1;
    }
    lines
}

/// A prefix `+ - *` follows nothing or an operator other than a closer.
fn reclassify_prefix(op: Op, previous: Option<&Token>) -> Op {
    let prefix_position = match previous.and_then(|t| t.op()) {
        Some(p) => !p.is_close(),
        None => previous.is_none(),
    };
    if !prefix_position {
        return op;
    }
    match op {
        Op::Add => Op::Plus,
        Op::Sub => Op::Minus,
        Op::Mul => Op::Spread,
        other => other,
    }
}

/// Read tokens up to the next `;` or the end of input.
///
/// Returns `Ok(None)` once the input is exhausted with nothing left to
/// read; an empty statement such as `;;` yields an empty vector. On errors
/// the reader still consumes the rest of the statement and reports the
/// first error together with the number of errors seen.
pub fn read_statement(reader: &mut Reader<'_>) -> Result<Option<Vec<Token>>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut first_error: Option<ExceptionRecord> = None;
    let mut errors = 0;
    let mut terminated = false;
    let mut seen_anything = false;

    loop {
        match reader.advance() {
            Ok(Advance::Token(mut token)) => {
                seen_anything = true;
                if let TokenKind::Operator(op) = token.kind {
                    token.kind = TokenKind::Operator(reclassify_prefix(op, tokens.last()));
                }
                tokens.push(token);
            }
            Ok(Advance::EndOfStatement) => {
                terminated = true;
                break;
            }
            Ok(Advance::EndOfInput) => break,
            Err(e) => {
                seen_anything = true;
                errors += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(mut e) = first_error {
        e.count = errors;
        tracing::debug!(errors, "statement rejected by the reader");
        return Err(e);
    }
    if !terminated && !seen_anything {
        return Ok(None);
    }
    Ok(Some(tokens))
}

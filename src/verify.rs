//! Static replay of an RPN sequence.
//!
//! Tracks stack heights only, never values. Catches the arity errors the
//! parser cannot see (missing operands, stray commas, empty indices) and
//! records how deep each runtime stack gets so the interpreter can size
//! its buffers up front.

use serde::Serialize;

use crate::error::{ExceptionRecord, IndexError, Result, RuntimeError, SyntaxError};
use crate::unit::{Op, Scope, Unit};

/// A validated statement ready for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledUnitStream {
    pub max_element_frame: usize,
    pub max_moved_value_frame: usize,
    pub max_scope_frames: usize,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    base: usize,
    accepted: usize,
}

struct Replay {
    height: usize,
    moved: usize,
    /// The bottom frame is the statement itself and is never closed.
    frames: Vec<Frame>,
    max_height: usize,
    max_moved: usize,
    max_frames: usize,
}

impl Replay {
    fn new() -> Self {
        Replay {
            height: 0,
            moved: 0,
            frames: vec![Frame { base: 0, accepted: 0 }],
            max_height: 0,
            max_moved: 0,
            max_frames: 0,
        }
    }

    fn frame(&self) -> Frame {
        self.frames.last().copied().unwrap_or(Frame { base: 0, accepted: 0 })
    }

    fn push(&mut self) {
        self.height += 1;
        self.max_height = self.max_height.max(self.height);
    }

    fn open(&mut self) {
        self.frames.push(Frame { base: self.height, accepted: 0 });
        self.max_frames = self.max_frames.max(self.frames.len() - 1);
    }

    fn comma(&mut self, unit: &Unit) -> Result<()> {
        let height = self.height;
        let Some(frame) = self.frames.last_mut() else {
            return Err(ExceptionRecord::at(SyntaxError::InvalidSyntax, unit.span));
        };
        if height <= frame.base {
            return Err(ExceptionRecord::at(SyntaxError::TooManyCommas, unit.span));
        }
        frame.accepted += 1;
        self.height -= 1;
        self.moved += 1;
        self.max_moved = self.max_moved.max(self.moved);
        Ok(())
    }

    fn close(&mut self, scope: Scope, unit: &Unit) -> Result<()> {
        if self.frames.len() < 2 {
            return Err(ExceptionRecord::at(SyntaxError::InvalidSyntax, unit.span));
        }
        let Some(frame) = self.frames.pop() else {
            return Err(ExceptionRecord::at(SyntaxError::InvalidSyntax, unit.span));
        };

        let closing = if self.height > frame.base + 1 {
            return Err(ExceptionRecord::at(SyntaxError::MissingComma, unit.span));
        } else if self.height <= frame.base {
            if frame.accepted > 0 {
                return Err(ExceptionRecord::at(SyntaxError::TooManyCommas, unit.span));
            }
            0
        } else {
            frame.accepted + 1
        };

        self.moved -= frame.accepted;
        self.height = frame.base;

        match scope {
            Scope::Index => {
                if closing == 0 {
                    return Err(ExceptionRecord::at(IndexError::NoIndex, unit.span));
                }
                // the indexed value is replaced by the element
                if self.height == 0 {
                    return Err(ExceptionRecord::at(IndexError::MissingArray, unit.span));
                }
            }
            Scope::Call => {
                // the callee is replaced by the call result
                if self.height == 0 {
                    return Err(ExceptionRecord::at(RuntimeError::ExpectFunction, unit.span));
                }
            }
            Scope::Group | Scope::Array => self.push(),
        }
        Ok(())
    }

    fn prefix(&mut self, unit: &Unit) -> Result<()> {
        if self.height <= self.frame().base {
            return Err(ExceptionRecord::at(SyntaxError::MissingOperand, unit.span));
        }
        Ok(())
    }

    fn binary(&mut self, unit: &Unit) -> Result<()> {
        if self.height < self.frame().base + 2 {
            return Err(ExceptionRecord::at(SyntaxError::MissingOperand, unit.span));
        }
        self.height -= 1;
        Ok(())
    }

    fn step(&mut self, unit: &Unit) -> Result<()> {
        match unit.op() {
            None => self.push(),
            Some(Op::Open(_)) => self.open(),
            Some(Op::Close(scope)) => self.close(scope, unit)?,
            Some(Op::Comma) => self.comma(unit)?,
            Some(Op::Semicolon) => {}
            Some(op) if op.is_prefix() => self.prefix(unit)?,
            Some(_) => self.binary(unit)?,
        }
        Ok(())
    }
}

/// Validate an RPN sequence and annotate it with runtime stack capacities.
#[tracing::instrument(level = "trace", skip_all, fields(units = units.len()))]
pub fn to_stream(units: Vec<Unit>) -> Result<CompiledUnitStream> {
    let mut replay = Replay::new();
    for unit in &units {
        replay.step(unit)?;
    }
    if replay.height != 1 || replay.frames.len() != 1 {
        let span = units.last().map(|u| u.span).unwrap_or_default();
        return Err(ExceptionRecord::at(SyntaxError::InvalidSyntax, span));
    }

    let stream = CompiledUnitStream {
        max_element_frame: replay.max_height,
        max_moved_value_frame: replay.max_moved,
        max_scope_frames: replay.max_frames,
        units,
    };
    tracing::trace!(
        elements = stream.max_element_frame,
        moved = stream.max_moved_value_frame,
        scopes = stream.max_scope_frames,
        "stream built"
    );
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::{Options, Reader, read_statement};
    use crate::parser::to_rpn;
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> Result<CompiledUnitStream> {
        let mut reader = Reader::new(source, Options::default());
        let tokens = read_statement(&mut reader).unwrap().unwrap();
        to_stream(to_rpn(&tokens).unwrap())
    }

    fn capacities(source: &str) -> (usize, usize, usize) {
        let s = build(source).unwrap();
        (s.max_element_frame, s.max_moved_value_frame, s.max_scope_frames)
    }

    fn error(source: &str) -> ErrorKind {
        build(source).unwrap_err().error
    }

    #[test]
    fn simple_capacities() {
        assert_eq!(capacities("1 + 2 * 3"), (3, 0, 0));
        assert_eq!(capacities("f(1, 2, 3)"), (3, 2, 1));
        assert_eq!(capacities("{{1, 2}, {3}}[0][1]"), (2, 1, 2));
    }

    #[test]
    fn empty_scopes() {
        assert!(build("f()").is_ok());
        assert!(build("{}").is_ok());
        assert!(build("()").is_ok());
    }

    #[test]
    fn comma_errors() {
        assert_eq!(error("f(1,)"), ErrorKind::Syntax(SyntaxError::TooManyCommas));
        assert_eq!(error("f(,1)"), ErrorKind::Syntax(SyntaxError::TooManyCommas));
    }

    #[test]
    fn missing_comma_between_scopes() {
        assert_eq!(error("{(1) {2}}"), ErrorKind::Syntax(SyntaxError::MissingComma));
    }

    #[test]
    fn index_errors() {
        assert_eq!(error("a[]"), ErrorKind::Index(IndexError::NoIndex));
        assert_eq!(error("[0]"), ErrorKind::Index(IndexError::MissingArray));
    }

    #[test]
    fn operand_errors() {
        assert_eq!(error("1 +"), ErrorKind::Syntax(SyntaxError::MissingOperand));
        assert_eq!(error("-"), ErrorKind::Syntax(SyntaxError::MissingOperand));
        assert_eq!(error("f(-)"), ErrorKind::Syntax(SyntaxError::MissingOperand));
        assert_eq!(error("(1 +) 2"), ErrorKind::Syntax(SyntaxError::MissingOperand));
    }

    #[test]
    fn trailing_values_are_invalid() {
        assert_eq!(error("{1} 2"), ErrorKind::Syntax(SyntaxError::InvalidSyntax));
    }

    #[test]
    fn top_level_commas_are_allowed() {
        assert_eq!(capacities("1, 2, 3"), (2, 2, 0));
    }

    #[test]
    fn compiling_twice_is_identical() {
        let source = "a = f(*{1, 2}, b[0]) + 3";
        assert_eq!(build(source).unwrap(), build(source).unwrap());
    }
}

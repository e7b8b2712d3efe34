use std::fmt;
use std::num::IntErrorKind;

use serde::Serialize;

use crate::error::{ErrorKind, RuntimeError, SyntaxError, TypeError};
use crate::unit::{NumberKind, Op};

/// A numeric value. Integers are 32-bit and remember the radix they were
/// written in; overflow wraps and sets `overflow` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Number {
    Int { value: i32, kind: NumberKind, overflow: bool },
    Float(f64),
}

impl Number {
    pub fn int(value: i32) -> Self {
        Number::Int { value, kind: NumberKind::Decimal, overflow: false }
    }

    pub fn with_kind(value: i32, kind: NumberKind) -> Self {
        Number::Int { value, kind, overflow: false }
    }

    pub fn float(value: f64) -> Self {
        Number::Float(value)
    }

    pub fn bool(b: bool) -> Self {
        Number::int(b as i32)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn is_inf(&self) -> bool {
        match *self {
            Number::Int { overflow, .. } => overflow,
            Number::Float(f) => f.is_infinite(),
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(*self, Number::Float(f) if f.is_nan())
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int { value, .. } => value as f64,
            Number::Float(f) => f,
        }
    }

    /// The integer value, if this is a well-formed integer.
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Number::Int { value, overflow: false, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match *self {
            Number::Int { value, .. } => value != 0,
            Number::Float(f) => f != 0.0,
        }
    }

    /// Integer result from a checked operation; `None` marks overflow and
    /// keeps the wrapped value.
    fn checked(checked: Option<i32>, wrapped: i32, kind: NumberKind) -> Number {
        match checked {
            Some(value) => Number::Int { value, kind, overflow: false },
            None => Number::Int { value: wrapped, kind, overflow: true },
        }
    }

    fn guard(&self, rhs: Option<&Number>) -> Result<(), ErrorKind> {
        let bad = |n: &Number| n.is_nan() || n.is_inf();
        if bad(self) || rhs.is_some_and(bad) {
            return Err(RuntimeError::MathOperationWithNaNOrInf.into());
        }
        Ok(())
    }

    /// Apply a prefix operator.
    pub fn unary(&self, op: Op) -> Result<Number, ErrorKind> {
        self.guard(None)?;
        match (op, *self) {
            (Op::Plus, n) => Ok(n),
            (Op::Minus, Number::Float(f)) => Ok(Number::Float(-f)),
            (Op::Minus, Number::Int { value, .. }) => Ok(Number::checked(
                value.checked_neg(),
                value.wrapping_neg(),
                NumberKind::Decimal,
            )),
            (Op::Not, n) => Ok(Number::bool(!n.is_truthy())),
            (Op::BitNot, Number::Float(_)) => Err(TypeError::BitwiseOpWithFloat.into()),
            (Op::BitNot, Number::Int { value, kind, .. }) => Ok(Number::with_kind(!value, kind)),
            _ => Err(SyntaxError::InvalidSyntax.into()),
        }
    }

    /// Apply a binary operator with `self` on the left.
    pub fn binary(&self, op: Op, rhs: &Number) -> Result<Number, ErrorKind> {
        self.guard(Some(rhs))?;
        match op {
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => self.arithmetic(op, rhs),
            Op::Gt | Op::Ge | Op::Lt | Op::Le | Op::Eq | Op::Ne => Ok(self.compare(op, rhs)),
            Op::And => Ok(Number::bool(self.is_truthy() && rhs.is_truthy())),
            Op::Or => Ok(Number::bool(self.is_truthy() || rhs.is_truthy())),
            Op::BitAnd | Op::BitXor | Op::BitOr | Op::Shl | Op::Shr => self.bitwise(op, rhs),
            _ => Err(SyntaxError::InvalidSyntax.into()),
        }
    }

    fn arithmetic(&self, op: Op, rhs: &Number) -> Result<Number, ErrorKind> {
        if self.is_float() || rhs.is_float() {
            if op == Op::Mod {
                return Err(TypeError::ModuloWithFloat.into());
            }
            let (a, b) = (self.as_f64(), rhs.as_f64());
            let value = match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                _ => a / b,
            };
            return Ok(Number::Float(value));
        }

        let (Some(a), Some(b)) = (self.as_int(), rhs.as_int()) else {
            return Err(RuntimeError::MathOperationWithNaNOrInf.into());
        };
        let kind = NumberKind::Decimal;
        Ok(match op {
            Op::Add => Number::checked(a.checked_add(b), a.wrapping_add(b), kind),
            Op::Sub => Number::checked(a.checked_sub(b), a.wrapping_sub(b), kind),
            Op::Mul => Number::checked(a.checked_mul(b), a.wrapping_mul(b), kind),
            Op::Div | Op::Mod if b == 0 => return Err(RuntimeError::IntDivOrModByZero.into()),
            Op::Div => Number::checked(a.checked_div(b), a.wrapping_div(b), kind),
            _ => Number::checked(a.checked_rem(b), a.wrapping_rem(b), kind),
        })
    }

    fn compare(&self, op: Op, rhs: &Number) -> Number {
        let result = match (*self, *rhs) {
            (Number::Int { value: a, .. }, Number::Int { value: b, .. }) => match op {
                Op::Gt => a > b,
                Op::Ge => a >= b,
                Op::Lt => a < b,
                Op::Le => a <= b,
                Op::Eq => a == b,
                _ => a != b,
            },
            _ => {
                let (a, b) = (self.as_f64(), rhs.as_f64());
                match op {
                    Op::Gt => a > b,
                    Op::Ge => a >= b,
                    Op::Lt => a < b,
                    Op::Le => a <= b,
                    Op::Eq => a == b,
                    _ => a != b,
                }
            }
        };
        Number::bool(result)
    }

    fn bitwise(&self, op: Op, rhs: &Number) -> Result<Number, ErrorKind> {
        let (Number::Int { value: a, kind, .. }, Number::Int { value: b, .. }) = (*self, *rhs) else {
            return Err(TypeError::BitwiseOpWithFloat.into());
        };
        let shift = b as u32;
        let value = match op {
            Op::BitAnd => a & b,
            Op::BitXor => a ^ b,
            Op::BitOr => a | b,
            // counts outside 0..32 overflow
            Op::Shl => return Ok(Number::checked(a.checked_shl(shift), a.wrapping_shl(shift), kind)),
            _ => return Ok(Number::checked(a.checked_shr(shift), a.wrapping_shr(shift), kind)),
        };
        Ok(Number::with_kind(value, kind))
    }
}

/// Parse a numeric literal the lexer has already classified.
///
/// Integer literals beyond `i32::MAX` keep their wrapped value with the
/// overflow flag set; literals too wide for 64 bits saturate first. There are
/// no negative literals, so `-2147483648` negates an overflowed operand and
/// raises `MathOperationWithNaNOrInf`.
pub fn parse_number(text: &str, kind: NumberKind) -> Result<Number, ErrorKind> {
    let invalid = || ErrorKind::from(SyntaxError::InvalidNumberLiteral);
    let (digits, radix) = match kind {
        NumberKind::Binary => (text.get(2..).ok_or_else(invalid)?, 2),
        NumberKind::Hexadecimal => (text.get(2..).ok_or_else(invalid)?, 16),
        NumberKind::Octal => (text.get(1..).ok_or_else(invalid)?, 8),
        NumberKind::Decimal => (text, 10),
        NumberKind::Float | NumberKind::Scientific => {
            let value = match text.parse::<f64>() {
                Ok(v) => v,
                Err(_) => format!("0{text}").parse::<f64>().map_err(|_| invalid())?,
            };
            return Ok(Number::Float(value));
        }
    };

    let wide = match u64::from_str_radix(digits, radix) {
        Ok(wide) => wide,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u64::MAX,
        Err(_) => return Err(invalid()),
    };
    Ok(match i32::try_from(wide) {
        Ok(value) => Number::with_kind(value, kind),
        Err(_) => Number::Int { value: wide as i32, kind, overflow: true },
    })
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int { overflow: true, .. } => write!(f, "Inf"),
            Number::Int { value, kind, .. } => {
                let sign = if value < 0 { "-" } else { "" };
                let magnitude = value.unsigned_abs();
                match kind {
                    NumberKind::Binary => write!(f, "{sign}0b{magnitude:b}"),
                    NumberKind::Octal if magnitude != 0 => write!(f, "{sign}0{magnitude:o}"),
                    NumberKind::Hexadecimal => write!(f, "{sign}0x{magnitude:x}"),
                    _ => write!(f, "{value}"),
                }
            }
            Number::Float(v) if v.is_nan() => write!(f, "NaN"),
            Number::Float(v) if v.is_infinite() => {
                write!(f, "{}Inf", if v < 0.0 { "-" } else { "" })
            }
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

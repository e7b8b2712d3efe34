use crate::unit::Span;

/// 1-based row/column inside the loaded script. A tab advances the reader's
/// tab width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UnknownError {
    #[error("operation is not valid in the current context state")]
    ArgumentError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("invalid syntax")]
    InvalidSyntax,
    #[error("undefined identifier")]
    UndefinedIdentifier,
    #[error("unicode characters are not supported")]
    UnicodeChar,
    #[error("invalid number literal")]
    InvalidNumberLiteral,
    #[error("expected a separator between two operands")]
    ExpectSeparator,
    #[error("symbol is longer than the allowed maximum")]
    SymbolTooLong,
    #[error("missing left bracket")]
    NoLeftBracket,
    #[error("missing right bracket")]
    NoRightBracket,
    #[error("crossed brackets")]
    CrossedBrackets,
    #[error("missing comma")]
    MissingComma,
    #[error("too many commas")]
    TooManyCommas,
    #[error("missing operand")]
    MissingOperand,
    #[error("character outside the supported charset")]
    BeyondCharset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("object is not callable")]
    NonCallableObject,
    #[error("object is not indexable")]
    NonIndexableObject,
    #[error("object cannot be expanded")]
    NonExpandableObject,
    #[error("math operation on a non-number")]
    MathOperationAmongNonNumbers,
    #[error("modulo with a float operand")]
    ModuloWithFloat,
    #[error("bitwise operation with a float operand")]
    BitwiseOpWithFloat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("missing index")]
    NoIndex,
    #[error("missing array to index")]
    MissingArray,
    #[error("index must be a non-negative integer")]
    ExpectNonNegativeIntegerIndex,
    #[error("index out of range")]
    IndexOutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("missing function name or invalid function object")]
    ExpectFunction,
    #[error("invalid function call arguments")]
    BadFunctionCallArgs,
    #[error("wrong number of function call arguments")]
    BadFunctionCallArgc,
    #[error("wrong function call argument type")]
    BadFunctionCallArgType,
    #[error("cannot expand an empty array")]
    ExpandEmptyArray,
    #[error("cannot assign to an unnamed value")]
    AssignLeftValue,
    #[error("NaN or Inf in a math operation")]
    MathOperationWithNaNOrInf,
    #[error("integer division or modulo by zero")]
    IntDivOrModByZero,
    #[error("no available object id")]
    NoAvailableId,
    #[error("allocation failed")]
    BadAlloc,
    #[error("symbol insertion failed")]
    BadSymbolInsertion,
}

/// Category plus code of a raised exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("UnknownError: {0}")]
    Unknown(UnknownError),
    #[error("SyntaxError: {0}")]
    Syntax(SyntaxError),
    #[error("TypeError: {0}")]
    Type(TypeError),
    #[error("IndexError: {0}")]
    Index(IndexError),
    #[error("RuntimeError: {0}")]
    Runtime(RuntimeError),
    /// Raised by host-supplied callables.
    #[error("CustomError: code {0}")]
    Custom(u32),
}

impl ErrorKind {
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::Unknown(_) => "UnknownError",
            ErrorKind::Syntax(_) => "SyntaxError",
            ErrorKind::Type(_) => "TypeError",
            ErrorKind::Index(_) => "IndexError",
            ErrorKind::Runtime(_) => "RuntimeError",
            ErrorKind::Custom(_) => "CustomError",
        }
    }
}

impl From<SyntaxError> for ErrorKind {
    fn from(e: SyntaxError) -> Self {
        ErrorKind::Syntax(e)
    }
}

impl From<TypeError> for ErrorKind {
    fn from(e: TypeError) -> Self {
        ErrorKind::Type(e)
    }
}

impl From<IndexError> for ErrorKind {
    fn from(e: IndexError) -> Self {
        ErrorKind::Index(e)
    }
}

impl From<RuntimeError> for ErrorKind {
    fn from(e: RuntimeError) -> Self {
        ErrorKind::Runtime(e)
    }
}

impl From<UnknownError> for ErrorKind {
    fn from(e: UnknownError) -> Self {
        ErrorKind::Unknown(e)
    }
}

/// A raised exception: what went wrong and where.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct ExceptionRecord {
    pub error: ErrorKind,
    /// Offending unit or token in the loaded script.
    pub span: Option<Span>,
    /// Lexer errors report the row/column the reader was at.
    pub position: Option<Position>,
    /// Number of errors seen while reading the statement (at least 1).
    pub count: usize,
}

impl ExceptionRecord {
    pub fn new(error: impl Into<ErrorKind>) -> Self {
        ExceptionRecord {
            error: error.into(),
            span: None,
            position: None,
            count: 1,
        }
    }

    pub fn at(error: impl Into<ErrorKind>, span: Span) -> Self {
        ExceptionRecord::new(error).with_span(span)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach `span` unless the record already points somewhere.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn is(&self, error: impl Into<ErrorKind>) -> bool {
        self.error == error.into()
    }
}

pub type Result<T> = std::result::Result<T, ExceptionRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category() {
        let e = ExceptionRecord::new(TypeError::NonCallableObject);
        assert_eq!(e.to_string(), "TypeError: object is not callable");
        assert_eq!(e.error.category(), "TypeError");
    }

    #[test]
    fn or_span_keeps_existing() {
        let e = ExceptionRecord::at(IndexError::IndexOutOfRange, Span::new(1, 2))
            .or_span(Span::new(5, 9));
        assert_eq!(e.span, Some(Span::new(1, 2)));
        let e = ExceptionRecord::new(IndexError::IndexOutOfRange).or_span(Span::new(5, 9));
        assert_eq!(e.span, Some(Span::new(5, 9)));
    }

    #[test]
    fn is_matches_leaf_code() {
        let e = ExceptionRecord::new(RuntimeError::AssignLeftValue);
        assert!(e.is(RuntimeError::AssignLeftValue));
        assert!(!e.is(RuntimeError::BadAlloc));
    }
}

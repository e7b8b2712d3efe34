pub mod ansi;
pub mod json;
pub mod registry;

use crate::error::{ErrorKind, ExceptionRecord, IndexError, Position, RuntimeError, SyntaxError, TypeError};
use crate::lexer::Options;
use crate::unit::{SourceMap, Span};

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A rendered-ready view of an exception record.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub code: Option<&'static str>,
    pub label: Option<Label>,
    /// Row/column as reported by the reader; derived from the span otherwise.
    pub position: Option<Position>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
    /// Columns a tab advances, matching the reader that raised the error.
    pub tab_width: usize,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            code: None,
            label: None,
            position: None,
            notes: Vec::new(),
            suggestion: None,
            source: None,
            tab_width: Options::default().tab_width,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.label = Some(Label { span, message: label.into() });
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    /// Where the label starts: the reader's position if it gave one,
    /// otherwise counted from the source.
    pub fn location(&self) -> Option<Position> {
        let label = self.label.as_ref()?;
        let source = self.source.as_deref()?;
        Some(self.position.unwrap_or_else(|| SourceMap::new(source, self.tab_width).position(label.span.start)))
    }

    /// Describe `record`, which was raised while running `source`.
    pub fn from_record(record: &ExceptionRecord, source: &str) -> Self {
        let mut d = Diagnostic::error(record.error.to_string()).with_source(source);
        if let Some(code) = registry::code_of(&record.error) {
            d = d.with_code(code);
        }
        if let Some(span) = record.span {
            d = d.with_span(span, label(&record.error));
        }
        if let Some(position) = record.position {
            d = d.with_position(position);
        }
        if record.count > 1 {
            d = d.with_note(format!("{} errors in this statement, showing the first", record.count));
        }
        if let Some(hint) = suggestion(&record.error) {
            d = d.with_suggestion(hint);
        }
        d
    }
}

fn label(error: &ErrorKind) -> &'static str {
    match error {
        ErrorKind::Type(TypeError::NonCallableObject) => "called here",
        ErrorKind::Index(_) => "indexed here",
        ErrorKind::Runtime(RuntimeError::AssignLeftValue) => "assigned here",
        _ => "here",
    }
}

fn suggestion(error: &ErrorKind) -> Option<&'static str> {
    Some(match error {
        ErrorKind::Syntax(SyntaxError::ExpectSeparator) => "put an operator or `,` between the two operands",
        ErrorKind::Syntax(SyntaxError::TooManyCommas) => "remove the extra `,`",
        ErrorKind::Syntax(SyntaxError::MissingComma) => "separate list elements with `,`",
        ErrorKind::Syntax(SyntaxError::UnicodeChar) => "scripts are plain ASCII",
        ErrorKind::Type(TypeError::NonCallableObject) => "only functions can be called; is the name bound?",
        ErrorKind::Type(TypeError::ModuloWithFloat | TypeError::BitwiseOpWithFloat) => {
            "convert the operand with `int(...)` first"
        }
        ErrorKind::Index(IndexError::MissingArray) => "array literals use `{ }`",
        ErrorKind::Runtime(RuntimeError::AssignLeftValue) => "assign to a name, e.g. `a = ...`",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.message, "something went wrong");
        assert!(d.label.is_none());
        assert!(d.notes.is_empty());
        assert!(d.suggestion.is_none());
        assert!(d.code.is_none());
    }

    #[test]
    fn from_span_record() {
        let e = ExceptionRecord::at(TypeError::NonCallableObject, Span::new(9, 10));
        let d = Diagnostic::from_record(&e, "f(1, 2, 3)");
        assert_eq!(d.message, "TypeError: object is not callable");
        assert_eq!(d.code, Some("SE-T001"));
        let label = d.label.unwrap();
        assert_eq!(label.span, Span::new(9, 10));
        assert_eq!(label.message, "called here");
        assert!(d.suggestion.is_some());
        assert_eq!(d.source.as_deref(), Some("f(1, 2, 3)"));
    }

    #[test]
    fn from_reader_record_counts_errors() {
        let mut e = ExceptionRecord::at(SyntaxError::BeyondCharset, Span::new(2, 3))
            .with_position(Position { row: 1, col: 3 });
        e.count = 2;
        let d = Diagnostic::from_record(&e, "1 $ 2");
        assert_eq!(d.position, Some(Position { row: 1, col: 3 }));
        assert_eq!(d.notes, vec!["2 errors in this statement, showing the first"]);
        assert_eq!(d.code, Some("SE-S013"));
    }

    #[test]
    fn location_prefers_the_reader() {
        let e = ExceptionRecord::at(SyntaxError::BeyondCharset, Span::new(1, 2));
        let d = Diagnostic::from_record(&e, "\t$");
        assert_eq!(d.location(), Some(Position { row: 1, col: 5 }));
        assert_eq!(d.with_tab_width(8).location(), Some(Position { row: 1, col: 9 }));

        let e = e.with_position(Position { row: 3, col: 2 });
        assert_eq!(Diagnostic::from_record(&e, "\t$").location(), Some(Position { row: 3, col: 2 }));
        assert_eq!(Diagnostic::error("bad").location(), None);
    }

    #[test]
    fn custom_errors_render_without_code() {
        let e = ExceptionRecord::new(ErrorKind::Custom(12));
        let d = Diagnostic::from_record(&e, "");
        assert_eq!(d.message, "CustomError: code 12");
        assert!(d.code.is_none());
        assert!(d.label.is_none());
    }
}

use serde::Serialize;

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within the loaded script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text this span covers, or `""` if it lies outside `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

// ---- Numbers ----

/// Radix a numeric literal was written in. Integer results keep the radix
/// of their left operand for bitwise operators; arithmetic yields `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NumberKind {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
    Float,
    /// Scientific notation; always evaluates to a float.
    Scientific,
}

// ---- Operators ----

/// The four bracketed constructs. `Call` never appears in the token stream;
/// the parser reclassifies a grouping `(` into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    Group,
    Call,
    Index,
    Array,
}

impl Scope {
    pub fn open_symbol(self) -> &'static str {
        match self {
            Scope::Group | Scope::Call => "(",
            Scope::Index => "[",
            Scope::Array => "{",
        }
    }

    pub fn close_symbol(self) -> &'static str {
        match self {
            Scope::Group | Scope::Call => ")",
            Scope::Index => "]",
            Scope::Array => "}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Op {
    Open(Scope),
    Close(Scope),
    // prefix
    Plus,
    Minus,
    Spread,
    Not,
    BitNot,
    // binary
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    // assignment
    Assign,
    DivAssign,
    MulAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Comma,
    /// Statement terminator; never reaches the parser.
    Semicolon,
}

impl Op {
    /// Priority level, 1 binds tightest.
    ///
    /// | level | operators |
    /// |---|---|
    /// | 1 | `()` `[]` `{}` call |
    /// | 2 | unary `+` `-` `*` `!` `~` |
    /// | 3 | `*` `/` |
    /// | 4 | `%` |
    /// | 5 | `+` `-` |
    /// | 6 | `<<` `>>` |
    /// | 7 | `>` `>=` `<` `<=` |
    /// | 8 | `==` `!=` |
    /// | 9 | `&` |
    /// | 10 | `^` |
    /// | 11 | `\|` |
    /// | 12 | `&&` |
    /// | 13 | `\|\|` |
    /// | 14 | `=` and compound assignment |
    /// | 15 | `,` |
    pub fn priority(self) -> u8 {
        match self {
            Op::Open(_) | Op::Close(_) => 1,
            Op::Plus | Op::Minus | Op::Spread | Op::Not | Op::BitNot => 2,
            Op::Mul | Op::Div => 3,
            Op::Mod => 4,
            Op::Add | Op::Sub => 5,
            Op::Shl | Op::Shr => 6,
            Op::Gt | Op::Ge | Op::Lt | Op::Le => 7,
            Op::Eq | Op::Ne => 8,
            Op::BitAnd => 9,
            Op::BitXor => 10,
            Op::BitOr => 11,
            Op::And => 12,
            Op::Or => 13,
            Op::Assign
            | Op::DivAssign
            | Op::MulAssign
            | Op::ModAssign
            | Op::AddAssign
            | Op::SubAssign
            | Op::ShlAssign
            | Op::ShrAssign
            | Op::AndAssign
            | Op::XorAssign
            | Op::OrAssign => 14,
            Op::Comma => 15,
            Op::Semicolon => 16,
        }
    }

    /// Prefix operators and assignments group right-to-left.
    pub fn is_left_associative(self) -> bool {
        !matches!(self.priority(), 2 | 14)
    }

    pub fn is_prefix(self) -> bool {
        self.priority() == 2
    }

    pub fn is_open(self) -> bool {
        matches!(self, Op::Open(_))
    }

    pub fn is_close(self) -> bool {
        matches!(self, Op::Close(_))
    }

    /// The binary operator a compound assignment applies before storing.
    pub fn compound_base(self) -> Option<Op> {
        match self {
            Op::DivAssign => Some(Op::Div),
            Op::MulAssign => Some(Op::Mul),
            Op::ModAssign => Some(Op::Mod),
            Op::AddAssign => Some(Op::Add),
            Op::SubAssign => Some(Op::Sub),
            Op::ShlAssign => Some(Op::Shl),
            Op::ShrAssign => Some(Op::Shr),
            Op::AndAssign => Some(Op::BitAnd),
            Op::XorAssign => Some(Op::BitXor),
            Op::OrAssign => Some(Op::BitOr),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Open(Scope::Call) => "call(",
            Op::Open(scope) => scope.open_symbol(),
            Op::Close(Scope::Call) => ")call",
            Op::Close(scope) => scope.close_symbol(),
            Op::Plus => "+x",
            Op::Minus => "-x",
            Op::Spread => "*x",
            Op::Not => "!",
            Op::BitNot => "~",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::BitAnd => "&",
            Op::BitXor => "^",
            Op::BitOr => "|",
            Op::And => "&&",
            Op::Or => "||",
            Op::Assign => "=",
            Op::DivAssign => "/=",
            Op::MulAssign => "*=",
            Op::ModAssign => "%=",
            Op::AddAssign => "+=",
            Op::SubAssign => "-=",
            Op::ShlAssign => "<<=",
            Op::ShrAssign => ">>=",
            Op::AndAssign => "&=",
            Op::XorAssign => "^=",
            Op::OrAssign => "|=",
            Op::Comma => ",",
            Op::Semicolon => ";",
        }
    }
}

// ---- Units ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitKind {
    Number(NumberKind),
    Identifier,
    Operator(Op),
}

/// One element of the RPN / compiled stream. Literals and identifiers
/// keep the span of their text; operators keep theirs for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub span: Span,
    /// Bracket nesting depth at emission. Only used when printing.
    pub depth: u16,
}

impl Unit {
    pub fn new(kind: UnitKind, span: Span) -> Self {
        Unit { kind, span, depth: 0 }
    }

    pub fn op(&self) -> Option<Op> {
        match self.kind {
            UnitKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Human-readable form of the unit, e.g. `12`, `a`, `call(`.
    pub fn render(&self, source: &str) -> String {
        match self.kind {
            UnitKind::Number(_) | UnitKind::Identifier => self.span.text(source).to_string(),
            UnitKind::Operator(op) => op.symbol().to_string(),
        }
    }
}

/// Render an RPN sequence on one line, separated by spaces.
pub fn render_units(units: &[Unit], source: &str) -> String {
    units
        .iter()
        .map(|u| u.render(source))
        .collect::<Vec<_>>()
        .join(" ")
}

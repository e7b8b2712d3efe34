use crate::error::{ErrorKind, IndexError, RuntimeError, SyntaxError, TypeError, UnknownError};

/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,
    /// Full explanation printed by `--explain`.
    pub long: &'static str,
}

/// Stable code of an error kind. Host-raised custom errors have none.
pub fn code_of(error: &ErrorKind) -> Option<&'static str> {
    let code = match error {
        ErrorKind::Unknown(UnknownError::ArgumentError) => "SE-U001",

        ErrorKind::Syntax(e) => match e {
            SyntaxError::InvalidSyntax => "SE-S001",
            SyntaxError::UndefinedIdentifier => "SE-S002",
            SyntaxError::UnicodeChar => "SE-S003",
            SyntaxError::InvalidNumberLiteral => "SE-S004",
            SyntaxError::ExpectSeparator => "SE-S005",
            SyntaxError::SymbolTooLong => "SE-S006",
            SyntaxError::NoLeftBracket => "SE-S007",
            SyntaxError::NoRightBracket => "SE-S008",
            SyntaxError::CrossedBrackets => "SE-S009",
            SyntaxError::MissingComma => "SE-S010",
            SyntaxError::TooManyCommas => "SE-S011",
            SyntaxError::MissingOperand => "SE-S012",
            SyntaxError::BeyondCharset => "SE-S013",
        },

        ErrorKind::Type(e) => match e {
            TypeError::NonCallableObject => "SE-T001",
            TypeError::NonIndexableObject => "SE-T002",
            TypeError::NonExpandableObject => "SE-T003",
            TypeError::MathOperationAmongNonNumbers => "SE-T004",
            TypeError::ModuloWithFloat => "SE-T005",
            TypeError::BitwiseOpWithFloat => "SE-T006",
        },

        ErrorKind::Index(e) => match e {
            IndexError::NoIndex => "SE-I001",
            IndexError::MissingArray => "SE-I002",
            IndexError::ExpectNonNegativeIntegerIndex => "SE-I003",
            IndexError::IndexOutOfRange => "SE-I004",
        },

        ErrorKind::Runtime(e) => match e {
            RuntimeError::ExpectFunction => "SE-R001",
            RuntimeError::BadFunctionCallArgs => "SE-R002",
            RuntimeError::BadFunctionCallArgc => "SE-R003",
            RuntimeError::BadFunctionCallArgType => "SE-R004",
            RuntimeError::ExpandEmptyArray => "SE-R005",
            RuntimeError::AssignLeftValue => "SE-R006",
            RuntimeError::MathOperationWithNaNOrInf => "SE-R007",
            RuntimeError::IntDivOrModByZero => "SE-R008",
            RuntimeError::NoAvailableId => "SE-R009",
            RuntimeError::BadAlloc => "SE-R010",
            RuntimeError::BadSymbolInsertion => "SE-R011",
        },

        ErrorKind::Custom(_) => return None,
    };
    Some(code)
}

/// All stable error codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Context ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SE-U001",
        short: "operation not valid in the current state",
        long: r#"## SE-U001: operation not valid in the current state

A context runs each statement through `forward`, `parse` and `execute`
in that order. Calling `parse` before a statement was read, or `execute`
before it was parsed, raises this error. The context itself is unchanged.
"#,
    },

    // ── Reader ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SE-S001",
        short: "invalid syntax",
        long: r#"## SE-S001: invalid syntax

The statement does not form a single expression. Usually an operator is
missing its operands, or two expressions sit side by side.

**Example:**

    1 +
"#,
    },
    ErrorEntry {
        code: "SE-S002",
        short: "undefined identifier",
        long: r#"## SE-S002: undefined identifier

A name was used in a position that needs it to be bound already.
Reading an unbound name on its own yields `nil`.
"#,
    },
    ErrorEntry {
        code: "SE-S003",
        short: "unicode character",
        long: r#"## SE-S003: unicode character

Scripts are ASCII. Any byte above 0x7F is rejected.

**Example:**

    a = 1 × 2

Use `*` for multiplication.
"#,
    },
    ErrorEntry {
        code: "SE-S004",
        short: "invalid number literal",
        long: r#"## SE-S004: invalid number literal

Number literals are one of:

    0b101     binary
    017       octal (leading zero)
    42        decimal
    0x2a      hexadecimal
    1.5  .5   float
    1e3 2.5E-2  scientific

Anything else starting with a digit or a dot, such as `0b2`, `1.2.3` or
`1e`, is rejected.
"#,
    },
    ErrorEntry {
        code: "SE-S005",
        short: "missing separator between operands",
        long: r#"## SE-S005: missing separator between operands

Two numbers or names follow each other with nothing in between.

**Example:**

    a b

**Fix:** put an operator or a comma between them: `a + b`, `a, b`.
"#,
    },
    ErrorEntry {
        code: "SE-S006",
        short: "symbol too long",
        long: r#"## SE-S006: symbol too long

Identifiers are limited to 32 characters by default.
"#,
    },
    ErrorEntry {
        code: "SE-S007",
        short: "missing left bracket",
        long: r#"## SE-S007: missing left bracket

A closing `)`, `]` or `}` has no matching opening bracket.

**Example:**

    1 + 2)
"#,
    },
    ErrorEntry {
        code: "SE-S008",
        short: "missing right bracket",
        long: r#"## SE-S008: missing right bracket

An opening `(`, `[` or `{` is never closed before the end of the
statement.

**Example:**

    sum(1, 2
"#,
    },
    ErrorEntry {
        code: "SE-S009",
        short: "crossed brackets",
        long: r#"## SE-S009: crossed brackets

A bracket is closed by a bracket of a different kind.

**Example:**

    {1, 2)
"#,
    },
    ErrorEntry {
        code: "SE-S010",
        short: "missing comma",
        long: r#"## SE-S010: missing comma

A bracketed list holds two expressions with no comma between them.

**Example:**

    {(1) {2}}
"#,
    },
    ErrorEntry {
        code: "SE-S011",
        short: "too many commas",
        long: r#"## SE-S011: too many commas

A list has a comma with nothing after it, or two commas in a row.

**Example:**

    {1, 2,}
"#,
    },
    ErrorEntry {
        code: "SE-S012",
        short: "missing operand",
        long: r#"## SE-S012: missing operand

An operator does not have enough values to work on.

**Example:**

    (* 2)
"#,
    },
    ErrorEntry {
        code: "SE-S013",
        short: "character outside the charset",
        long: r#"## SE-S013: character outside the charset

The character is not part of any number, name or operator.

**Example:**

    a = $1
"#,
    },

    // ── Types ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SE-T001",
        short: "object is not callable",
        long: r#"## SE-T001: object is not callable

Only functions can be called. Calling an unbound name, a number or an
array raises this error at the closing parenthesis of the call.

**Example:**

    f(1, 2, 3)    -- f was never bound
"#,
    },
    ErrorEntry {
        code: "SE-T002",
        short: "object is not indexable",
        long: r#"## SE-T002: object is not indexable

Only arrays can be indexed.

**Example:**

    3[0]
"#,
    },
    ErrorEntry {
        code: "SE-T003",
        short: "object cannot be expanded",
        long: r#"## SE-T003: object cannot be expanded

The prefix `*` spreads the elements of an array into the surrounding
list. Applying it to anything else is an error.

**Example:**

    sum(*1)
"#,
    },
    ErrorEntry {
        code: "SE-T004",
        short: "math on a non-number",
        long: r#"## SE-T004: math on a non-number

Arithmetic, comparison and logic operators work on numbers only.
Unbound names read as `nil`.

**Example:**

    {1} + 1
"#,
    },
    ErrorEntry {
        code: "SE-T005",
        short: "modulo with a float",
        long: r#"## SE-T005: modulo with a float

`%` and `%=` need two integers. Convert first with `int`.
"#,
    },
    ErrorEntry {
        code: "SE-T006",
        short: "bitwise operation with a float",
        long: r#"## SE-T006: bitwise operation with a float

`& | ^ ~ << >>` need integers. Convert first with `int`.
"#,
    },

    // ── Indexing ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SE-I001",
        short: "missing index",
        long: r#"## SE-I001: missing index

An index expression has nothing between its brackets.

**Example:**

    a[]
"#,
    },
    ErrorEntry {
        code: "SE-I002",
        short: "missing array",
        long: r#"## SE-I002: missing array

A `[` starts the statement, so there is nothing to index.

**Example:**

    [0]

Use `{ }` for array literals.
"#,
    },
    ErrorEntry {
        code: "SE-I003",
        short: "index must be a non-negative integer",
        long: r#"## SE-I003: index must be a non-negative integer

Indexes start at 0. Floats and negative numbers are rejected.

**Example:**

    {1, 2}[-1]
"#,
    },
    ErrorEntry {
        code: "SE-I004",
        short: "index out of range",
        long: r#"## SE-I004: index out of range

The index is past the last element.

**Example:**

    {1, 2, 3}[5]
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SE-R001",
        short: "missing function",
        long: r#"## SE-R001: missing function

A call has no callee in front of it.
"#,
    },
    ErrorEntry {
        code: "SE-R002",
        short: "invalid call arguments",
        long: r#"## SE-R002: invalid call arguments

A function rejected its arguments as a whole.
"#,
    },
    ErrorEntry {
        code: "SE-R003",
        short: "wrong number of arguments",
        long: r#"## SE-R003: wrong number of arguments

The function takes a fixed number of arguments, or at least one for
`sum` and `mul`.

**Example:**

    sin(1, 2)
"#,
    },
    ErrorEntry {
        code: "SE-R004",
        short: "wrong argument type",
        long: r#"## SE-R004: wrong argument type

Builtin functions take numbers. `factorial` takes a non-negative
integer.

**Example:**

    sin({1})
"#,
    },
    ErrorEntry {
        code: "SE-R005",
        short: "cannot expand an empty array",
        long: r#"## SE-R005: cannot expand an empty array

**Example:**

    sum(*{})
"#,
    },
    ErrorEntry {
        code: "SE-R006",
        short: "cannot assign to an unnamed value",
        long: r#"## SE-R006: cannot assign to an unnamed value

The left side of `=` or a compound assignment must be a name or an
element of a named array.

**Example:**

    1 = 2

**Fix:**

    a = 2
"#,
    },
    ErrorEntry {
        code: "SE-R007",
        short: "NaN or Inf in a math operation",
        long: r#"## SE-R007: NaN or Inf in a math operation

A value that is NaN, infinite or an overflowed integer (shown as `Inf`)
cannot be used as an operand.

**Example:**

    (2147483647 + 1) * 2
"#,
    },
    ErrorEntry {
        code: "SE-R008",
        short: "integer division or modulo by zero",
        long: r#"## SE-R008: integer division or modulo by zero

Float division by zero yields `Inf`; integer division does not.

**Example:**

    1 / 0
"#,
    },
    ErrorEntry {
        code: "SE-R009",
        short: "no available object id",
        long: r#"## SE-R009: no available object id

Every named value and array element uses one of 65535 ids. Ids return to
the pool when values are released.
"#,
    },
    ErrorEntry {
        code: "SE-R010",
        short: "allocation failed",
        long: r#"## SE-R010: allocation failed

The runtime could not obtain memory for a value.
"#,
    },
    ErrorEntry {
        code: "SE-R011",
        short: "symbol insertion failed",
        long: r#"## SE-R011: symbol insertion failed

A name could not be added to the symbol table because it is already
present.
"#,
    },
];

/// Look up an error entry by code (e.g. `"SE-T001"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}

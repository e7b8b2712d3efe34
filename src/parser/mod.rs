use crate::error::{ExceptionRecord, Result, SyntaxError};
use crate::lexer::{Token, TokenKind};
use crate::unit::{Op, Scope, Unit, UnitKind};

/// Shunting-yard compiler from a statement's tokens to reverse-Polish units.
///
/// Openers are emitted into the output as well as pushed, so the
/// validator and interpreter see where every scope begins.
pub struct Parser {
    output: Vec<Unit>,
    pending: Vec<Unit>,
    depth: u16,
}

impl Parser {
    pub fn new(capacity: usize) -> Self {
        Parser {
            output: Vec::with_capacity(capacity),
            pending: Vec::new(),
            depth: 0,
        }
    }

    fn emit(&mut self, mut unit: Unit) {
        unit.depth = self.depth;
        self.output.push(unit);
    }

    /// `(` opens a call when it directly follows an identifier or a `)`/`]`.
    fn opens_call(previous: Option<&Token>) -> bool {
        match previous.map(|t| t.kind) {
            Some(TokenKind::Identifier) => true,
            Some(TokenKind::Operator(Op::Close(Scope::Group | Scope::Index))) => true,
            _ => false,
        }
    }

    fn open(&mut self, scope: Scope, token: &Token) {
        let unit = Unit::new(UnitKind::Operator(Op::Open(scope)), token.span);
        self.emit(unit);
        self.pending.push(unit);
        self.depth += 1;
    }

    fn close(&mut self, scope: Scope, token: &Token) -> Result<()> {
        loop {
            let Some(top) = self.pending.pop() else {
                return Err(ExceptionRecord::at(SyntaxError::NoLeftBracket, token.span));
            };
            let Some(Op::Open(opened)) = top.op() else {
                self.emit(top);
                continue;
            };
            let closed = match (opened, scope) {
                (Scope::Call, Scope::Group) => Scope::Call,
                (a, b) if a == b => a,
                _ => return Err(ExceptionRecord::at(SyntaxError::CrossedBrackets, token.span)),
            };
            self.depth = self.depth.saturating_sub(1);
            self.emit(Unit::new(UnitKind::Operator(Op::Close(closed)), token.span));
            return Ok(());
        }
    }

    fn operator(&mut self, op: Op, token: &Token) {
        while let Some(top) = self.pending.last().copied() {
            let Some(top_op) = top.op() else { break };
            if top_op.is_open() {
                break;
            }
            let binds_later = op.priority() > top_op.priority()
                || (op.priority() == top_op.priority() && op.is_left_associative());
            if !binds_later {
                break;
            }
            self.pending.pop();
            self.emit(top);
        }
        self.pending.push(Unit::new(UnitKind::Operator(op), token.span));
    }

    fn push_token(&mut self, token: &Token, previous: Option<&Token>) -> Result<()> {
        match token.kind {
            TokenKind::Number(Some(kind)) => {
                self.emit(Unit::new(UnitKind::Number(kind), token.span));
            }
            TokenKind::Identifier => {
                self.emit(Unit::new(UnitKind::Identifier, token.span));
            }
            TokenKind::Operator(Op::Open(Scope::Group)) if Self::opens_call(previous) => {
                self.open(Scope::Call, token);
            }
            TokenKind::Operator(Op::Open(scope)) => self.open(scope, token),
            TokenKind::Operator(Op::Close(scope)) => self.close(scope, token)?,
            TokenKind::Operator(Op::Semicolon) => {}
            TokenKind::Operator(op) => self.operator(op, token),
            TokenKind::Number(None) => {
                return Err(ExceptionRecord::at(SyntaxError::InvalidNumberLiteral, token.span));
            }
            TokenKind::End | TokenKind::Whitespace(_) | TokenKind::Invalid(_) => {
                return Err(ExceptionRecord::at(SyntaxError::InvalidSyntax, token.span));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Unit>> {
        while let Some(top) = self.pending.pop() {
            if top.op().is_some_and(Op::is_open) {
                return Err(ExceptionRecord::at(SyntaxError::NoRightBracket, top.span));
            }
            self.emit(top);
        }
        Ok(self.output)
    }
}

/// Compile one statement's tokens into reverse-Polish units.
#[tracing::instrument(level = "trace", skip_all, fields(tokens = tokens.len()))]
pub fn to_rpn(tokens: &[Token]) -> Result<Vec<Unit>> {
    let mut parser = Parser::new(tokens.len());
    let mut previous = None;
    for token in tokens {
        parser.push_token(token, previous)?;
        previous = Some(token);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Options, Reader, read_statement};
    use crate::unit::render_units;
    use pretty_assertions::assert_eq;

    fn tokens(source: &str) -> Vec<Token> {
        let mut reader = Reader::new(source, Options::default());
        read_statement(&mut reader).unwrap().unwrap()
    }

    fn rpn(source: &str) -> String {
        render_units(&to_rpn(&tokens(source)).unwrap(), source)
    }

    fn rpn_err(source: &str) -> ExceptionRecord {
        to_rpn(&tokens(source)).unwrap_err()
    }

    #[test]
    fn precedence() {
        assert_eq!(rpn("1 + 2 * 3"), "1 2 3 * +");
        assert_eq!(rpn("(1 + 2) * 3"), "( 1 2 + ) 3 *");
        assert_eq!(rpn("a % b * c"), "a b c * %");
        assert_eq!(rpn("1 < 2 == 3 > 4"), "1 2 < 3 4 > ==");
    }

    #[test]
    fn left_associativity() {
        assert_eq!(rpn("1 - 2 - 3"), "1 2 - 3 -");
        assert_eq!(rpn("a << 1 >> 2"), "a 1 << 2 >>");
    }

    #[test]
    fn right_associativity() {
        assert_eq!(rpn("a = b = 1"), "a b 1 = =");
        assert_eq!(rpn("a += b -= 2"), "a b 2 -= +=");
        assert_eq!(rpn("- - 1"), "1 -x -x");
        assert_eq!(rpn("!~a"), "a ~ !");
    }

    #[test]
    fn prefix_binds_tighter_than_binary() {
        assert_eq!(rpn("-a * b"), "a -x b *");
        assert_eq!(rpn("a * -b"), "a b -x *");
    }

    #[test]
    fn calls_and_indexing() {
        assert_eq!(rpn("f(1, 2)"), "f call( 1 2 , )call");
        assert_eq!(rpn("f()"), "f call( )call");
        assert_eq!(rpn("f(1)(2)"), "f call( 1 )call call( 2 )call");
        assert_eq!(rpn("a[1][2]"), "a [ 1 ] [ 2 ]");
        assert_eq!(rpn("a[0](3)"), "a [ 0 ] call( 3 )call");
    }

    #[test]
    fn grouping_after_operator_is_not_a_call() {
        assert_eq!(rpn("2 * (3)"), "2 ( 3 ) *");
        assert_eq!(rpn("{1}(2)"), "{ 1 } ( 2 )");
    }

    #[test]
    fn array_literals_and_spread() {
        assert_eq!(rpn("{1, 2, 3}"), "{ 1 2 , 3 , }");
        assert_eq!(rpn("f(*{1, 2})"), "f call( { 1 2 , } *x )call");
        assert_eq!(rpn("{}"), "{ }");
    }

    #[test]
    fn assignment_with_comma_list() {
        assert_eq!(rpn("a = {1, 2}[0]"), "a { 1 2 , } [ 0 ] =");
    }

    #[test]
    fn depth_tracks_nesting() {
        let units = to_rpn(&tokens("(1 + (2))")).unwrap();
        let depths: Vec<u16> = units.iter().map(|u| u.depth).collect();
        // ( 1 ( 2 ) + ) with the `+` emitted at the outer closer
        assert_eq!(depths, vec![0, 1, 1, 2, 1, 1, 0]);
    }

    #[test]
    fn bracket_errors() {
        assert!(rpn_err("1)").is(SyntaxError::NoLeftBracket));
        assert!(rpn_err("(1").is(SyntaxError::NoRightBracket));
        assert!(rpn_err("(1]").is(SyntaxError::CrossedBrackets));
        assert!(rpn_err("{1)").is(SyntaxError::CrossedBrackets));
        assert!(rpn_err("f(1]").is(SyntaxError::CrossedBrackets));
    }

    #[test]
    fn bracket_error_points_at_closer() {
        let e = rpn_err("(1 + 2]");
        assert_eq!(e.span, Some(crate::unit::Span::new(6, 7)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn balanced() -> impl Strategy<Value = String> {
            let leaf = prop_oneof![
                (0u32..1000).prop_map(|n| n.to_string()),
                "[a-e]".prop_map(String::from),
            ];
            leaf.prop_recursive(4, 32, 4, |inner| {
                prop_oneof![
                    inner.clone().prop_map(|e| format!("({e})")),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} * {b}")),
                    prop::collection::vec(inner.clone(), 1..4)
                        .prop_map(|v| format!("{{{}}}", v.join(", "))),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("f({a}, {b})")),
                ]
            })
        }

        /// Net stack effect of a unit sequence; every prefix stays above zero.
        fn net_height(units: &[Unit]) -> i64 {
            let mut frames: Vec<(i64, i64)> = vec![(0, 0)];
            let mut height = 0i64;
            for unit in units {
                match unit.op() {
                    None => height += 1,
                    Some(Op::Open(_)) => frames.push((height, 0)),
                    Some(Op::Comma) => {
                        height -= 1;
                        if let Some(frame) = frames.last_mut() {
                            frame.1 += 1;
                        }
                    }
                    Some(Op::Close(scope)) => {
                        let (base, _) = frames.pop().unwrap();
                        height = base;
                        if matches!(scope, Scope::Group | Scope::Array) {
                            height += 1;
                        }
                    }
                    Some(op) if op.is_prefix() => {}
                    Some(_) => height -= 1,
                }
                assert!(height >= 0);
            }
            height
        }

        proptest! {
            #[test]
            fn balanced_brackets_compile(source in balanced()) {
                let units = to_rpn(&tokens(&source));
                prop_assert!(units.is_ok(), "{source}: {:?}", units.as_ref().err());
                prop_assert_eq!(net_height(&units.unwrap()), 1);
            }
        }
    }
}

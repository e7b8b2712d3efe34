use crate::error::{ExceptionRecord, IndexError, Result, RuntimeError, SyntaxError, TypeError};
use crate::object::{Args, Array, Number, Object, Reference, Store, View, parse_number};
use crate::unit::{Op, Scope, Unit, UnitKind};
use crate::verify::CompiledUnitStream;

/// Values a spread staged while earlier comma-separated elements of the
/// same scope were still waiting to be moved.
struct Staged {
    /// Commas still to come before these values join the moved stack.
    remaining: usize,
    values: Vec<Object>,
}

struct Frame {
    scope: Scope,
    /// Element-stack height when the scope opened.
    base: usize,
    /// Values moved aside by commas and spreads.
    accepted: usize,
    staged: Vec<Staged>,
}

impl Frame {
    fn new(scope: Scope, base: usize) -> Self {
        Frame { scope, base, accepted: 0, staged: Vec::new() }
    }
}

struct Machine<'a> {
    store: &'a mut Store,
    source: &'a str,
    elements: Vec<Object>,
    moved: Vec<Object>,
    frames: Vec<Frame>,
}

fn invalid() -> ExceptionRecord {
    ExceptionRecord::new(SyntaxError::InvalidSyntax)
}

impl<'a> Machine<'a> {
    fn new(store: &'a mut Store, source: &'a str, stream: &CompiledUnitStream) -> Self {
        let mut frames = Vec::with_capacity(stream.max_scope_frames + 1);
        frames.push(Frame::new(Scope::Group, 0));
        Machine {
            store,
            source,
            elements: Vec::with_capacity(stream.max_element_frame),
            moved: Vec::with_capacity(stream.max_moved_value_frame),
            frames,
        }
    }

    fn pop(&mut self) -> Result<Object> {
        self.elements.pop().ok_or_else(invalid)
    }

    fn frame(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(invalid)
    }

    fn release_all(&mut self, objects: Vec<Object>) {
        for obj in objects {
            self.store.release(obj);
        }
    }

    fn number(&self, obj: &Object) -> Result<Number> {
        match self.store.view(obj) {
            View::Number(n) => Ok(*n),
            _ => Err(ExceptionRecord::new(TypeError::MathOperationAmongNonNumbers)),
        }
    }

    fn step(&mut self, unit: &Unit) -> Result<()> {
        match unit.kind {
            UnitKind::Number(kind) => {
                let n = parse_number(unit.span.text(self.source), kind).map_err(ExceptionRecord::new)?;
                self.elements.push(Object::Number(n));
            }
            UnitKind::Identifier => {
                let id = self.store.intern(unit.span.text(self.source))?;
                self.elements.push(Object::Reference(Reference::Writable(id)));
            }
            UnitKind::Operator(op) => match op {
                Op::Open(scope) => {
                    let base = self.elements.len();
                    self.frames.push(Frame::new(scope, base));
                }
                Op::Close(scope) => self.close(scope)?,
                Op::Comma => self.comma()?,
                Op::Spread => self.spread()?,
                Op::Assign => self.assign()?,
                Op::Semicolon => {}
                op if op.compound_base().is_some() => self.compound(op)?,
                op if op.is_prefix() => self.unary(op)?,
                op => self.binary(op)?,
            },
        }
        Ok(())
    }

    /// Move the oldest pending element of the current scope aside.
    fn comma(&mut self) -> Result<()> {
        let base = self.frame()?.base;
        if self.elements.len() <= base {
            return Err(ExceptionRecord::new(SyntaxError::TooManyCommas));
        }
        let oldest = self.elements.remove(base);
        self.moved.push(oldest);

        let frame = self.frames.last_mut().ok_or_else(invalid)?;
        frame.accepted += 1;
        let mut ready = Vec::new();
        frame.staged.retain_mut(|entry| {
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining == 0 {
                ready.append(&mut entry.values);
                false
            } else {
                true
            }
        });
        self.moved.extend(ready);
        Ok(())
    }

    fn spread(&mut self) -> Result<()> {
        let obj = self.pop()?;
        let Some((slots, writable)) = self.store.array_of(&obj) else {
            self.store.release(obj);
            return Err(ExceptionRecord::new(TypeError::NonExpandableObject));
        };
        if slots.is_empty() {
            self.store.release(obj);
            return Err(ExceptionRecord::new(RuntimeError::ExpandEmptyArray));
        }

        let mut values: Vec<Object> = slots.iter().map(|&slot| self.store.element(slot, writable)).collect();
        self.store.release(obj);
        let Some(last) = values.pop() else {
            return Err(ExceptionRecord::new(RuntimeError::ExpandEmptyArray));
        };

        let pending = self.elements.len();
        let frame = self.frames.last_mut().ok_or_else(invalid)?;
        let pending = pending.saturating_sub(frame.base);
        frame.accepted += values.len();
        if pending == 0 {
            self.moved.extend(values);
        } else if !values.is_empty() {
            frame.staged.push(Staged { remaining: pending, values });
        }
        self.elements.push(last);
        Ok(())
    }

    fn close(&mut self, scope: Scope) -> Result<()> {
        if self.frames.len() < 2 {
            return Err(invalid());
        }
        let frame = self.frames.pop().ok_or_else(invalid)?;
        debug_assert!(frame.scope == scope);

        for entry in frame.staged {
            self.moved.extend(entry.values);
        }
        let start = self.moved.len().saturating_sub(frame.accepted);
        let mut items = self.moved.split_off(start);
        items.extend(self.elements.split_off(frame.base.min(self.elements.len())));

        match scope {
            Scope::Group => {
                let result = items.pop().unwrap_or(Object::Nil);
                self.release_all(items);
                self.elements.push(result);
            }
            Scope::Index => {
                let Some(index) = items.pop() else {
                    return Err(ExceptionRecord::new(IndexError::NoIndex));
                };
                self.release_all(items);
                let Some(target) = self.elements.pop() else {
                    self.store.release(index);
                    return Err(ExceptionRecord::new(IndexError::MissingArray));
                };
                let result = self.index(&target, &index);
                self.store.release(index);
                self.store.release(target);
                self.elements.push(result?);
            }
            Scope::Call => {
                let Some(callee) = self.elements.pop() else {
                    self.release_all(items);
                    return Err(ExceptionRecord::new(RuntimeError::ExpectFunction));
                };
                let result = match self.store.view(&callee) {
                    View::Function(function) => {
                        let function = function.clone();
                        tracing::trace!(function = function.name(), argc = items.len(), "call");
                        function.invoke(&Args::new(self.store, &items))
                    }
                    _ => Err(ExceptionRecord::new(TypeError::NonCallableObject)),
                };
                self.release_all(items);
                self.store.release(callee);
                self.elements.push(result?);
            }
            Scope::Array => {
                let mut slots = Vec::with_capacity(items.len());
                let mut items = items.into_iter();
                while let Some(item) = items.next() {
                    let request = self.store.request_reference(&item, true);
                    match self.store.materialize_reference(item, request) {
                        Ok(handle) => slots.push(handle.id()),
                        Err(e) => {
                            self.release_all(items.collect());
                            self.store.release(Object::Array(Array::new(slots)));
                            return Err(e);
                        }
                    }
                }
                self.elements.push(Object::Array(Array::new(slots)));
            }
        }
        Ok(())
    }

    fn index(&mut self, target: &Object, index: &Object) -> Result<Object> {
        let (position, overflow) = match self.store.view(index) {
            View::Number(Number::Int { value, overflow, .. }) if *value >= 0 => (*value as usize, *overflow),
            _ => return Err(ExceptionRecord::new(IndexError::ExpectNonNegativeIntegerIndex)),
        };
        let Some((slots, writable)) = self.store.array_of(target) else {
            return Err(ExceptionRecord::new(TypeError::NonIndexableObject));
        };
        match slots.get(position) {
            Some(&slot) if !overflow => Ok(self.store.element(slot, writable)),
            _ => Err(ExceptionRecord::new(IndexError::IndexOutOfRange)),
        }
    }

    fn unary(&mut self, op: Op) -> Result<()> {
        let obj = self.pop()?;
        let result = self
            .number(&obj)
            .and_then(|n| n.unary(op).map_err(ExceptionRecord::new));
        self.store.release(obj);
        self.elements.push(Object::Number(result?));
        Ok(())
    }

    fn apply(&self, op: Op, lhs: &Object, rhs: &Object) -> Result<Number> {
        let a = self.number(lhs)?;
        let b = self.number(rhs)?;
        a.binary(op, &b).map_err(ExceptionRecord::new)
    }

    fn binary(&mut self, op: Op) -> Result<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = self.apply(op, &lhs, &rhs);
        self.store.release(lhs);
        self.store.release(rhs);
        self.elements.push(Object::Number(result?));
        Ok(())
    }

    fn assign(&mut self) -> Result<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let Object::Reference(Reference::Writable(id)) = lhs else {
            self.store.release(lhs);
            self.store.release(rhs);
            return Err(ExceptionRecord::new(RuntimeError::AssignLeftValue));
        };
        if rhs.id() != id {
            self.store.bind(id, rhs)?;
        }
        self.elements.push(lhs);
        Ok(())
    }

    /// `a op= b` computes `a op b` on a copy of `a` and stores it back.
    fn compound(&mut self, op: Op) -> Result<()> {
        let base = op.compound_base().ok_or_else(invalid)?;
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = self.apply(base, &lhs, &rhs);
        self.store.release(rhs);
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                self.store.release(lhs);
                return Err(e);
            }
        };
        let Object::Reference(Reference::Writable(id)) = lhs else {
            self.store.release(lhs);
            return Err(ExceptionRecord::new(RuntimeError::AssignLeftValue));
        };
        self.store.bind(id, Object::Number(value))?;
        self.elements.push(lhs);
        Ok(())
    }

    fn finish(&mut self) -> Result<Object> {
        if self.frames.len() != 1 {
            return Err(invalid());
        }
        let staged: Vec<Staged> = self.frame()?.staged.drain(..).collect();
        for entry in staged {
            self.release_all(entry.values);
        }
        let moved = std::mem::take(&mut self.moved);
        self.release_all(moved);
        if self.elements.len() != 1 {
            return Err(invalid());
        }
        self.pop()
    }

    /// Release everything still held after a failure.
    fn abandon(&mut self) {
        let mut leftovers = std::mem::take(&mut self.elements);
        leftovers.append(&mut self.moved);
        for frame in std::mem::take(&mut self.frames) {
            for mut entry in frame.staged {
                leftovers.append(&mut entry.values);
            }
        }
        self.release_all(leftovers);
    }
}

/// Execute a validated stream against `store`.
///
/// The result may be a reference into the store; the caller owns it and
/// must eventually hand it back through [`Store::release`].
#[tracing::instrument(level = "trace", skip_all, fields(units = stream.units.len()))]
pub fn run(stream: &CompiledUnitStream, store: &mut Store, source: &str) -> Result<Object> {
    let mut machine = Machine::new(store, source, stream);
    let outcome = stream
        .units
        .iter()
        .try_for_each(|unit| machine.step(unit).map_err(|e| e.or_span(unit.span)))
        .and_then(|()| machine.finish());
    if outcome.is_err() {
        machine.abandon();
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::error::ErrorKind;
    use crate::lexer::{Options, Reader, read_statement};
    use crate::object::{Arity, Function, Value};
    use crate::parser::to_rpn;
    use crate::verify::to_stream;

    struct Harness {
        store: Store,
    }

    impl Harness {
        fn new() -> Self {
            let mut store = Store::new();
            for function in builtins::registry().iter() {
                store.define(function.name(), Object::Function(function.clone())).unwrap();
            }
            Harness { store }
        }

        fn eval(&mut self, source: &str) -> Result<Value> {
            let mut reader = Reader::new(source, Options::default());
            let tokens = read_statement(&mut reader)?.unwrap_or_default();
            let stream = to_stream(to_rpn(&tokens)?)?;
            let result = run(&stream, &mut self.store, source);
            let value = result.map(|obj| {
                let value = self.store.snapshot(&obj);
                self.store.release(obj);
                value
            });
            self.store.sweep();
            value
        }

        fn value(&mut self, source: &str) -> String {
            self.eval(source).unwrap().to_string()
        }

        fn error(&mut self, source: &str) -> ErrorKind {
            self.eval(source).unwrap_err().error
        }
    }

    #[test]
    fn arithmetic() {
        let mut h = Harness::new();
        assert_eq!(h.value("1 + 2 * 3"), "7");
        assert_eq!(h.value("(1 + 2) * 3"), "9");
        assert_eq!(h.value("7 % 4 - -1"), "4");
        assert_eq!(h.value("1 / 2.0"), "0.5");
        assert_eq!(h.value("0x0f | 0xf0"), "0xff");
    }

    #[test]
    fn variables_persist_across_runs() {
        let mut h = Harness::new();
        assert_eq!(h.value("a = 5"), "5");
        assert_eq!(h.value("a + 1"), "6");
        assert_eq!(h.value("a"), "5");
    }

    #[test]
    fn undefined_variables_are_nil() {
        let mut h = Harness::new();
        assert_eq!(h.value("nothing"), "nil");
        assert_eq!(h.error("nothing + 1"), ErrorKind::Type(TypeError::MathOperationAmongNonNumbers));
    }

    #[test]
    fn chained_and_compound_assignment() {
        let mut h = Harness::new();
        assert_eq!(h.value("a = b = 2"), "2");
        assert_eq!(h.value("a += 3"), "5");
        assert_eq!(h.value("b"), "2");
        assert_eq!(h.value("b <<= 2"), "8");
    }

    #[test]
    fn assignment_needs_a_name() {
        let mut h = Harness::new();
        assert_eq!(h.error("1 = 2"), ErrorKind::Runtime(RuntimeError::AssignLeftValue));
        assert_eq!(h.error("1 += 2"), ErrorKind::Runtime(RuntimeError::AssignLeftValue));
    }

    #[test]
    fn arrays_and_indexing() {
        let mut h = Harness::new();
        assert_eq!(h.value("{1, 2, 3}[1]"), "2");
        assert_eq!(h.value("{}"), "{}");
        assert_eq!(h.value("a = {1, {2, 3}}"), "{1, {2, 3}}");
        assert_eq!(h.value("a[1][0]"), "2");
        assert_eq!(h.value("a[1][0] = 9"), "9");
        assert_eq!(h.value("a"), "{1, {9, 3}}");
    }

    #[test]
    fn arrays_alias_through_assignment() {
        let mut h = Harness::new();
        h.eval("a = {1, 2}").unwrap();
        h.eval("b = a").unwrap();
        h.eval("b[0] = 5").unwrap();
        assert_eq!(h.value("a"), "{5, 2}");
        // rebinding b leaves a alone
        h.eval("b = 0").unwrap();
        assert_eq!(h.value("a"), "{5, 2}");
    }

    #[test]
    fn index_errors() {
        let mut h = Harness::new();
        assert_eq!(h.error("{1, 2, 3}[5]"), ErrorKind::Index(IndexError::IndexOutOfRange));
        assert_eq!(h.error("{1}[-1]"), ErrorKind::Index(IndexError::ExpectNonNegativeIntegerIndex));
        assert_eq!(h.error("{1}[0.5]"), ErrorKind::Index(IndexError::ExpectNonNegativeIntegerIndex));
        assert_eq!(h.error("3[0]"), ErrorKind::Type(TypeError::NonIndexableObject));
    }

    #[test]
    fn index_with_comma_list_uses_last() {
        let mut h = Harness::new();
        assert_eq!(h.value("{10, 20, 30}[0, 2]"), "30");
    }

    #[test]
    fn grouping_yields_last_value() {
        let mut h = Harness::new();
        assert_eq!(h.value("(1, 2, 3)"), "3");
        assert_eq!(h.value("()"), "nil");
        assert_eq!(h.value("1, 2"), "2");
    }

    #[test]
    fn calls() {
        let mut h = Harness::new();
        assert_eq!(h.value("sum(1, 2, 3)"), "6");
        assert_eq!(h.value("int(2.9) + floor(-0.5)"), "1");
        assert_eq!(h.error("f(1, 2, 3)"), ErrorKind::Type(TypeError::NonCallableObject));
        assert_eq!(h.error("sin(1, 2)"), ErrorKind::Runtime(RuntimeError::BadFunctionCallArgc));
    }

    #[test]
    fn call_error_points_at_call() {
        let mut h = Harness::new();
        let e = h.eval("f(1, 2, 3)").unwrap_err();
        assert_eq!(e.span.map(|s| s.text("f(1, 2, 3)")), Some(")"));
    }

    #[test]
    fn spread_expands_in_order() {
        let mut h = Harness::new();
        let order = Function::new("order", Arity::Variadic, |args| {
            let digits = args
                .numbers()?
                .iter()
                .fold(0, |acc, n| acc * 10 + n.as_int().unwrap_or(0));
            Ok(Object::Number(Number::int(digits)))
        });
        h.store.define("order", Object::Function(order)).unwrap();

        assert_eq!(h.value("order(*{1, 2, 3})"), "123");
        assert_eq!(h.value("order(*{1, 2}, 3)"), "123");
        assert_eq!(h.value("order(1, *{2, 3}, 4)"), "1234");
        assert_eq!(h.value("order(1, 2, *{3, 4}, 5, *{6})"), "123456");
        assert_eq!(h.value("{0, *{1, 2}, 3}"), "{0, 1, 2, 3}");
    }

    #[test]
    fn spread_errors() {
        let mut h = Harness::new();
        assert_eq!(h.error("sum(*{})"), ErrorKind::Runtime(RuntimeError::ExpandEmptyArray));
        assert_eq!(h.error("sum(*1)"), ErrorKind::Type(TypeError::NonExpandableObject));
    }

    #[test]
    fn spread_of_a_variable() {
        let mut h = Harness::new();
        h.eval("xs = {4, 5, 6}").unwrap();
        assert_eq!(h.value("sum(*xs)"), "15");
        assert_eq!(h.value("xs"), "{4, 5, 6}");
    }

    #[test]
    fn math_errors() {
        let mut h = Harness::new();
        assert_eq!(h.error("1 / 0"), ErrorKind::Runtime(RuntimeError::IntDivOrModByZero));
        assert_eq!(h.error("1.5 % 1"), ErrorKind::Type(TypeError::ModuloWithFloat));
        assert_eq!(h.error("1.5 & 1"), ErrorKind::Type(TypeError::BitwiseOpWithFloat));
        assert_eq!(h.error("{1} + 1"), ErrorKind::Type(TypeError::MathOperationAmongNonNumbers));
        assert_eq!(h.value("2147483647 + 1"), "Inf");
        assert_eq!(h.error("(2147483647 + 1) * 2"), ErrorKind::Runtime(RuntimeError::MathOperationWithNaNOrInf));
    }

    #[test]
    fn literals_are_reclaimed() {
        let mut h = Harness::new();
        let baseline = h.store.live_literals();
        h.eval("a = {1, 2, {3}}").unwrap();
        assert_eq!(h.store.live_literals(), baseline + 5);
        h.eval("a = 0").unwrap();
        assert_eq!(h.store.live_literals(), baseline + 1);
        h.eval("{7, 8}[0] + 1").unwrap();
        assert_eq!(h.store.live_literals(), baseline + 1);
    }

    #[test]
    fn failures_release_their_operands() {
        let mut h = Harness::new();
        let baseline = h.store.live_literals();
        h.eval("{1, 2}[9]").unwrap_err();
        h.eval("sum({1}, 2)").unwrap_err();
        h.eval("missing(*{1, 2}, {3})").unwrap_err();
        assert_eq!(h.store.live_literals(), baseline);
    }
}

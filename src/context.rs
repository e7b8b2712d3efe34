//! Incremental evaluation: one statement at a time over a persistent store.

use crate::builtins;
use crate::error::{ExceptionRecord, Position, Result, UnknownError};
use crate::interpreter;
use crate::lexer::{Options, Reader, Token, read_statement};
use crate::object::{Function, Id, Object, Reference, Store, Value};
use crate::parser::to_rpn;
use crate::verify::{CompiledUnitStream, to_stream};

/// Where a context is in the read → parse → execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing left to read.
    Unloaded,
    /// A statement has been read and waits to be compiled.
    Unbuilt,
    /// A compiled stream waits to be executed.
    Wait,
    /// The last statement ran to completion.
    Done,
    /// The last stage failed; the next `forward` moves on.
    Error,
}

const START: Position = Position { row: 1, col: 1 };

pub struct Context {
    store: Store,
    options: Options,
    script: String,
    cursor: usize,
    position: Position,
    state: State,
    tokens: Vec<Token>,
    stream: Option<CompiledUnitStream>,
    result: Option<Object>,
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Context {
    /// A context with the builtin functions bound.
    pub fn new() -> Self {
        let mut ctx = Context::bare();
        for function in builtins::registry().iter() {
            // names in the registry are unique and the store is empty
            if let Err(e) = ctx.bind_function(function.clone()) {
                tracing::warn!(function = function.name(), error = %e, "builtin not bound");
            }
        }
        ctx
    }

    /// A context with no symbols at all.
    pub fn bare() -> Self {
        Context {
            store: Store::new(),
            options: Options::default(),
            script: String::new(),
            cursor: 0,
            position: START,
            state: State::Unloaded,
            tokens: Vec::new(),
            stream: None,
            result: None,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The loaded script. Spans in exception records index into it.
    pub fn script(&self) -> &str {
        &self.script
    }

    fn transition(&mut self, state: State) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "context state");
        }
        self.state = state;
    }

    fn fail(&mut self, e: ExceptionRecord) -> ExceptionRecord {
        self.tokens.clear();
        self.stream = None;
        self.transition(State::Error);
        e
    }

    fn misuse(&self, operation: &str) -> ExceptionRecord {
        tracing::debug!(operation, state = ?self.state, "operation not valid in this state");
        ExceptionRecord::new(UnknownError::ArgumentError)
    }

    /// Add `text` to the script. Text that has not been read yet is kept and
    /// separated from the new text by a statement terminator.
    pub fn load(&mut self, text: &str) {
        if self.complete() {
            self.script.clear();
            self.script.push_str(text);
            self.cursor = 0;
            self.position = START;
        } else {
            self.script.push(';');
            self.script.push_str(text);
        }
        tracing::debug!(bytes = text.len(), "script loaded");
    }

    /// Whether every statement of the script has been read and none is
    /// waiting to be compiled or executed.
    pub fn complete(&self) -> bool {
        if matches!(self.state, State::Unbuilt | State::Wait) {
            return false;
        }
        self.script
            .get(self.cursor..)
            .unwrap_or("")
            .trim_matches(|c: char| c.is_ascii_whitespace() || c == ';')
            .is_empty()
    }

    /// Read the next non-empty statement. `Ok(false)` means the script is
    /// exhausted.
    pub fn forward(&mut self) -> Result<bool> {
        self.tokens.clear();
        self.stream = None;
        loop {
            let mut reader = Reader::resume(&self.script, self.cursor, self.position, self.options);
            let outcome = read_statement(&mut reader);
            self.cursor = reader.cursor();
            self.position = reader.position();
            match outcome {
                Ok(None) => {
                    self.transition(State::Unloaded);
                    return Ok(false);
                }
                Ok(Some(tokens)) if tokens.is_empty() => continue,
                Ok(Some(tokens)) => {
                    self.tokens = tokens;
                    self.transition(State::Unbuilt);
                    return Ok(true);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Compile the statement read by [`Context::forward`].
    pub fn parse(&mut self) -> Result<()> {
        if self.state != State::Unbuilt {
            return Err(self.misuse("parse"));
        }
        let tokens = std::mem::take(&mut self.tokens);
        match to_rpn(&tokens).and_then(to_stream) {
            Ok(stream) => {
                tracing::trace!(
                    elements = stream.max_element_frame,
                    moved = stream.max_moved_value_frame,
                    scopes = stream.max_scope_frames,
                    "statement compiled"
                );
                self.stream = Some(stream);
                self.transition(State::Wait);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run the compiled statement. The result replaces the previous one.
    pub fn execute(&mut self) -> Result<&Object> {
        if self.state != State::Wait {
            return Err(self.misuse("execute"));
        }
        let Some(stream) = self.stream.take() else {
            return Err(self.misuse("execute"));
        };
        if let Some(previous) = self.result.take() {
            self.store.release(previous);
        }

        let outcome = interpreter::run(&stream, &mut self.store, &self.script).and_then(|obj| {
            // held read-only so rebinding the name leaves it intact
            let request = self.store.request_reference(&obj, false);
            self.store.materialize_reference(obj, request)
        });
        self.store.sweep();

        match outcome {
            Ok(obj) => {
                tracing::debug!(result = %self.store.snapshot(&obj), "statement done");
                self.transition(State::Done);
                Ok(&*self.result.insert(obj))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// The result of the last successful execution.
    pub fn result(&self) -> Option<&Object> {
        self.result.as_ref()
    }

    /// Detached copy of the last result.
    pub fn value(&self) -> Option<Value> {
        self.result.as_ref().map(|obj| self.store.snapshot(obj))
    }

    /// Bind a host callable to its name, replacing any previous binding.
    pub fn bind_function(&mut self, function: Function) -> Result<Id> {
        let name = function.name().to_string();
        self.store.define(&name, Object::Function(function))
    }

    /// Current value of a named symbol.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let id = self.store.lookup(name)?;
        Some(self.store.snapshot(&Object::Reference(Reference::Writable(id))))
    }

    /// Drop every symbol, the retained result and the script. Returns the
    /// number of literals reclaimed.
    pub fn teardown(&mut self) -> usize {
        if let Some(result) = self.result.take() {
            self.store.release(result);
        }
        let reclaimed = self.store.teardown();
        self.script.clear();
        self.cursor = 0;
        self.position = START;
        self.tokens.clear();
        self.stream = None;
        self.transition(State::Unloaded);
        reclaimed
    }

    fn skip_remaining(&mut self) {
        self.cursor = self.script.len();
    }
}

/// Load `text` and run each of its statements, returning the last result.
///
/// On failure the rest of `text` is dropped so the context is ready for the
/// next call.
pub fn evaluate_statement(ctx: &mut Context, text: &str) -> Result<Value> {
    ctx.load(text);
    let outcome = run_all(ctx);
    if outcome.is_err() {
        ctx.skip_remaining();
    }
    outcome
}

fn run_all(ctx: &mut Context) -> Result<Value> {
    let mut last = Value::Nil;
    while ctx.forward()? {
        ctx.parse()?;
        ctx.execute()?;
        last = ctx.value().unwrap_or(Value::Nil);
    }
    Ok(last)
}

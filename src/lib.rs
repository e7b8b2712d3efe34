//! A small expression language: a reader that splits a script into
//! statements, a shunting-yard compiler to reverse-Polish units, a validator
//! that sizes the interpreter stacks, and an interpreter over a
//! reference-counted object store that persists across statements.
//!
//! Tracing is emitted at stage boundaries (`debug` for context state,
//! `trace` per stage). The library never installs a subscriber.

pub mod builtins;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod unit;
pub mod verify;

pub use context::{Context, State, evaluate_statement};
pub use error::{ErrorKind, ExceptionRecord, Result};
pub use object::{Arity, Function, Number, Object, Value};

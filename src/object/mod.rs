use std::fmt;

pub mod function;
pub mod number;
pub mod store;

pub use function::{Args, Arity, Function, NativeFn, Registry};
pub use number::{Number, parse_number};
pub use store::{LiteralId, LiteralKind, ReferenceRequest, ReferenceSource, Store, SymbolTable, View};

/// Slot id in the store. 0 means unnamed and unassignable.
pub type Id = u16;

/// Highest slot id the store hands out.
pub const MAX_ID: Id = 0xFFFF;

/// Ordered element slots of an array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Array {
    elements: Vec<Id>,
}

impl Array {
    pub fn new(elements: Vec<Id>) -> Self {
        Array { elements }
    }

    pub fn elements(&self) -> &[Id] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<Id> {
        self.elements.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn into_elements(self) -> Vec<Id> {
        self.elements
    }
}

/// Aliasing handle into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Shares a literal and holds one count on it.
    ReadOnly(LiteralId),
    /// Names a slot; assignment redirects the slot without touching other
    /// aliases of the literal it pointed at.
    Writable(Id),
}

/// A value on the interpreter stacks.
///
/// Not `Clone`: a transient array owns its element slots and a read-only
/// reference owns a count, so disposal goes through [`Store::release`].
#[derive(Debug, PartialEq)]
pub enum Object {
    Nil,
    Number(Number),
    Function(Function),
    Array(Array),
    Reference(Reference),
}

impl Object {
    pub fn id(&self) -> Id {
        match self {
            Object::Reference(Reference::Writable(id)) => *id,
            _ => 0,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Object::Reference(Reference::Writable(_)))
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self, Object::Reference(Reference::ReadOnly(_)))
    }
}

impl From<Number> for Object {
    fn from(n: Number) -> Self {
        Object::Number(n)
    }
}

/// A detached copy of an object's contents, safe to keep after the store
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Number(Number),
    Function(Function),
    Array(Vec<Value>),
    /// An array that contains itself.
    Cycle,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Function(func) => write!(f, "{func}"),
            Value::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Value::Cycle => write!(f, "{{...}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::NumberKind;

    #[test]
    fn only_writable_references_have_ids() {
        assert_eq!(Object::Reference(Reference::Writable(7)).id(), 7);
        assert_eq!(Object::Number(Number::int(7)).id(), 0);
        assert!(Object::Reference(Reference::Writable(1)).is_writable());
        assert!(!Object::Nil.is_readonly());
    }

    #[test]
    fn value_display() {
        let v = Value::Array(vec![
            Value::Number(Number::int(1)),
            Value::Array(vec![Value::Number(Number::with_kind(2, NumberKind::Hexadecimal)), Value::Nil]),
            Value::Cycle,
        ]);
        assert_eq!(v.to_string(), "{1, {0x2, nil}, {...}}");
        assert_eq!(Value::Array(vec![]).to_string(), "{}");
    }
}

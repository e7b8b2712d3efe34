use std::fmt;
use std::rc::Rc;

use crate::error::{ExceptionRecord, Result, RuntimeError};

use super::{Id, Number, Object, Store, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Fixed(n) => n == argc,
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => write!(f, "..."),
        }
    }
}

pub type NativeFn = dyn Fn(&Args<'_>) -> Result<Object>;

/// A callable registered with a context.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    arity: Arity,
    call: Rc<NativeFn>,
}

impl Function {
    pub fn new(
        name: &str,
        arity: Arity,
        call: impl Fn(&Args<'_>) -> Result<Object> + 'static,
    ) -> Self {
        Function { name: Rc::from(name), arity, call: Rc::new(call) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Check the argument count and dispatch.
    pub fn invoke(&self, args: &Args<'_>) -> Result<Object> {
        if !self.arity.accepts(args.len()) {
            return Err(ExceptionRecord::new(RuntimeError::BadFunctionCallArgc));
        }
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.call, &other.call) && self.name == other.name
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function<{}>: {}]", self.arity, self.name)
    }
}

/// Read access to the arguments of a call.
pub struct Args<'a> {
    store: &'a Store,
    objects: &'a [Object],
}

impl<'a> Args<'a> {
    pub fn new(store: &'a Store, objects: &'a [Object]) -> Self {
        Args { store, objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn view(&self, i: usize) -> View<'a> {
        match self.objects.get(i) {
            Some(obj) => self.store.view(obj),
            None => View::Nil,
        }
    }

    /// Id of the i-th argument; 0 when it is not addressable.
    pub fn id(&self, i: usize) -> Id {
        self.objects.get(i).map(Object::id).unwrap_or(0)
    }

    pub fn number(&self, i: usize) -> Result<Number> {
        match self.view(i) {
            View::Number(n) => Ok(*n),
            _ => Err(ExceptionRecord::new(RuntimeError::BadFunctionCallArgType)),
        }
    }

    pub fn numbers(&self) -> Result<Vec<Number>> {
        (0..self.len()).map(|i| self.number(i)).collect()
    }
}

/// A set of callables to import into a context.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: Vec<Function>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register(&mut self, function: Function) -> &mut Self {
        self.functions.push(function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

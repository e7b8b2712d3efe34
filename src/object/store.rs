use std::collections::HashMap;

use crate::error::{ExceptionRecord, Result, RuntimeError};

use super::{Array, Function, Id, MAX_ID, Number, Object, Reference, Value};

/// Index of a literal in the store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiteralId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    Function,
    Array,
}

#[derive(Debug)]
enum Payload {
    Number(Number),
    Function(Function),
    Array(Array),
}

#[derive(Debug)]
struct Literal {
    payload: Payload,
    /// Slots bound to this literal plus live read-only handles.
    refs: u32,
}

#[derive(Debug, Default)]
struct Slot {
    target: Option<LiteralId>,
}

/// Where the literal behind a requested reference comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Nil,
    /// Share an existing literal.
    Alias(LiteralId),
    /// Move a plain value into new storage.
    Fresh(LiteralKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceRequest {
    pub source: ReferenceSource,
    /// Wrap the result in a new slot.
    pub writable: bool,
}

/// Borrowed view of what an object resolves to.
#[derive(Debug, Clone, Copy)]
pub enum View<'a> {
    Nil,
    Number(&'a Number),
    Function(&'a Function),
    Array(&'a Array),
}

/// Name → slot id map.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: HashMap<String, Id>,
}

impl SymbolTable {
    pub fn find(&self, name: &str) -> Option<Id> {
        self.map.get(name).copied()
    }

    pub fn insert(&mut self, name: &str, id: Id) -> Result<()> {
        if self.map.contains_key(name) {
            return Err(ExceptionRecord::new(RuntimeError::BadSymbolInsertion));
        }
        self.map.insert(name.to_string(), id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn drain(&mut self) -> Vec<Id> {
        self.map.drain().map(|(_, id)| id).collect()
    }
}

/// Owns every literal and slot of a context.
///
/// Literals live in an arena with a reference count. A count that drops to
/// zero queues the literal; [`Store::sweep`] reclaims queued literals that
/// are still unreferenced, so handles taken during one execution stay valid
/// until it ends.
#[derive(Debug)]
pub struct Store {
    literals: Vec<Option<Literal>>,
    vacant: Vec<u32>,
    /// Indexed by id; index 0 is never used.
    slots: Vec<Option<Slot>>,
    free_ids: Vec<Id>,
    symbols: SymbolTable,
    beyond_life_cycle: Vec<LiteralId>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            literals: Vec::new(),
            vacant: Vec::new(),
            slots: vec![None],
            free_ids: Vec::new(),
            symbols: SymbolTable::default(),
            beyond_life_cycle: Vec::new(),
        }
    }

    // ---- ids and symbols ----

    /// Hand out a slot id, reusing released ids first.
    pub fn allocate_id(&mut self) -> Result<Id> {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let next = self.slots.len();
                if next > MAX_ID as usize {
                    return Err(ExceptionRecord::new(RuntimeError::NoAvailableId));
                }
                self.slots.push(None);
                next as Id
            }
        };
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = Some(Slot::default());
        }
        Ok(id)
    }

    /// Drop a slot, release what it pointed at and recycle its id.
    pub fn free_slot(&mut self, id: Id) {
        let Some(slot) = self.slots.get_mut(id as usize).and_then(Option::take) else {
            return;
        };
        if let Some(target) = slot.target {
            self.decrement(target);
        }
        self.free_ids.push(id);
    }

    pub fn lookup(&self, name: &str) -> Option<Id> {
        self.symbols.find(name)
    }

    /// The slot bound to `name`, created empty on first use.
    pub fn intern(&mut self, name: &str) -> Result<Id> {
        if let Some(id) = self.symbols.find(name) {
            return Ok(id);
        }
        let id = self.allocate_id()?;
        if let Err(e) = self.symbols.insert(name, id) {
            self.free_slot(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Bind `name` to `obj`, creating the symbol if needed.
    pub fn define(&mut self, name: &str, obj: Object) -> Result<Id> {
        let id = self.intern(name)?;
        self.bind(id, obj)?;
        Ok(id)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    // ---- literals ----

    fn insert_literal(&mut self, payload: Payload) -> LiteralId {
        let literal = Some(Literal { payload, refs: 1 });
        match self.vacant.pop() {
            Some(index) => {
                if let Some(entry) = self.literals.get_mut(index as usize) {
                    *entry = literal;
                }
                LiteralId(index)
            }
            None => {
                self.literals.push(literal);
                LiteralId((self.literals.len() - 1) as u32)
            }
        }
    }

    fn literal(&self, id: LiteralId) -> Option<&Literal> {
        self.literals.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn increment(&mut self, id: LiteralId) {
        if let Some(literal) = self.literals.get_mut(id.0 as usize).and_then(Option::as_mut) {
            literal.refs += 1;
        }
    }

    fn decrement(&mut self, id: LiteralId) {
        if let Some(literal) = self.literals.get_mut(id.0 as usize).and_then(Option::as_mut) {
            debug_assert!(literal.refs > 0, "literal {} released more often than referenced", id.0);
            literal.refs = literal.refs.saturating_sub(1);
            if literal.refs == 0 {
                self.beyond_life_cycle.push(id);
            }
        }
    }

    pub fn refcount(&self, id: LiteralId) -> Option<u32> {
        self.literal(id).map(|l| l.refs)
    }

    pub fn live_literals(&self) -> usize {
        self.literals.iter().filter(|l| l.is_some()).count()
    }

    pub fn live_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The literal a slot currently points at.
    pub fn target(&self, id: Id) -> Option<LiteralId> {
        self.slots.get(id as usize)?.as_ref()?.target
    }

    // ---- references ----

    /// Decide how to obtain a reference to `obj` without changing any count.
    pub fn request_reference(&self, obj: &Object, writable: bool) -> ReferenceRequest {
        let source = match obj {
            Object::Nil => ReferenceSource::Nil,
            Object::Number(_) => ReferenceSource::Fresh(LiteralKind::Number),
            Object::Function(_) => ReferenceSource::Fresh(LiteralKind::Function),
            Object::Array(_) => ReferenceSource::Fresh(LiteralKind::Array),
            Object::Reference(Reference::ReadOnly(l)) => ReferenceSource::Alias(*l),
            Object::Reference(Reference::Writable(id)) => match self.target(*id) {
                Some(l) => ReferenceSource::Alias(l),
                None => ReferenceSource::Nil,
            },
        };
        ReferenceRequest { source, writable }
    }

    /// Carry out `request`, consuming `obj`.
    ///
    /// Read-only requests yield `Reference::ReadOnly` (or `Nil`); writable
    /// requests yield a new slot the caller owns.
    pub fn materialize_reference(&mut self, obj: Object, request: ReferenceRequest) -> Result<Object> {
        let target = match request.source {
            ReferenceSource::Nil => {
                self.release(obj);
                None
            }
            ReferenceSource::Alias(l) => {
                self.increment(l);
                self.release(obj);
                Some(l)
            }
            ReferenceSource::Fresh(_) => {
                let payload = match obj {
                    Object::Number(n) => Payload::Number(n),
                    Object::Function(f) => Payload::Function(f),
                    Object::Array(a) => Payload::Array(a),
                    other => {
                        self.release(other);
                        return Ok(Object::Nil);
                    }
                };
                Some(self.insert_literal(payload))
            }
        };

        if !request.writable {
            return Ok(match target {
                Some(l) => Object::Reference(Reference::ReadOnly(l)),
                None => Object::Nil,
            });
        }
        let id = match self.allocate_id() {
            Ok(id) => id,
            Err(e) => {
                if let Some(l) = target {
                    self.decrement(l);
                }
                return Err(e);
            }
        };
        if let Some(slot) = self.slots.get_mut(id as usize).and_then(Option::as_mut) {
            slot.target = target;
        }
        Ok(Object::Reference(Reference::Writable(id)))
    }

    /// Point slot `id` at `obj`, releasing whatever it pointed at before.
    pub fn bind(&mut self, id: Id, obj: Object) -> Result<()> {
        let request = self.request_reference(&obj, false);
        let target = match self.materialize_reference(obj, request)? {
            Object::Reference(Reference::ReadOnly(l)) => Some(l),
            _ => None,
        };
        let Some(slot) = self.slots.get_mut(id as usize).and_then(Option::as_mut) else {
            if let Some(l) = target {
                self.decrement(l);
            }
            return Err(ExceptionRecord::new(RuntimeError::AssignLeftValue));
        };
        let previous = std::mem::replace(&mut slot.target, target);
        if let Some(old) = previous {
            self.decrement(old);
        }
        Ok(())
    }

    /// Give up `obj`. Literals whose count reaches zero wait for [`Store::sweep`].
    pub fn release(&mut self, obj: Object) {
        match obj {
            Object::Array(array) => {
                for id in array.into_elements() {
                    self.free_slot(id);
                }
            }
            Object::Reference(Reference::ReadOnly(l)) => self.decrement(l),
            _ => {}
        }
    }

    // ---- reading ----

    fn view_literal(&self, id: LiteralId) -> View<'_> {
        match self.literal(id).map(|l| &l.payload) {
            Some(Payload::Number(n)) => View::Number(n),
            Some(Payload::Function(f)) => View::Function(f),
            Some(Payload::Array(a)) => View::Array(a),
            None => View::Nil,
        }
    }

    /// What `obj` resolves to after following references. Dead slots read as nil.
    pub fn view<'a>(&'a self, obj: &'a Object) -> View<'a> {
        match obj {
            Object::Nil => View::Nil,
            Object::Number(n) => View::Number(n),
            Object::Function(f) => View::Function(f),
            Object::Array(a) => View::Array(a),
            Object::Reference(Reference::ReadOnly(l)) => self.view_literal(*l),
            Object::Reference(Reference::Writable(id)) => match self.target(*id) {
                Some(l) => self.view_literal(l),
                None => View::Nil,
            },
        }
    }

    /// The elements of the array behind `obj`, and whether they were
    /// reached through a writable reference.
    pub fn array_of(&self, obj: &Object) -> Option<(Vec<Id>, bool)> {
        match self.view(obj) {
            View::Array(a) => Some((a.elements().to_vec(), obj.is_writable())),
            _ => None,
        }
    }

    /// A handle to element slot `slot`: the slot itself when writable,
    /// otherwise a read-only alias of its literal.
    pub fn element(&mut self, slot: Id, writable: bool) -> Object {
        if writable {
            return Object::Reference(Reference::Writable(slot));
        }
        match self.target(slot) {
            Some(l) => {
                self.increment(l);
                Object::Reference(Reference::ReadOnly(l))
            }
            None => Object::Nil,
        }
    }

    /// Detached copy of what `obj` resolves to.
    pub fn snapshot(&self, obj: &Object) -> Value {
        let mut path = Vec::new();
        match obj {
            Object::Reference(Reference::ReadOnly(l)) => self.snapshot_literal(*l, &mut path),
            Object::Reference(Reference::Writable(id)) => match self.target(*id) {
                Some(l) => self.snapshot_literal(l, &mut path),
                None => Value::Nil,
            },
            Object::Nil => Value::Nil,
            Object::Number(n) => Value::Number(*n),
            Object::Function(f) => Value::Function(f.clone()),
            Object::Array(a) => self.snapshot_array(a, &mut path),
        }
    }

    fn snapshot_literal(&self, id: LiteralId, path: &mut Vec<LiteralId>) -> Value {
        if path.contains(&id) {
            return Value::Cycle;
        }
        match self.literal(id).map(|l| &l.payload) {
            Some(Payload::Number(n)) => Value::Number(*n),
            Some(Payload::Function(f)) => Value::Function(f.clone()),
            Some(Payload::Array(a)) => {
                path.push(id);
                let value = self.snapshot_array(a, path);
                path.pop();
                value
            }
            None => Value::Nil,
        }
    }

    fn snapshot_array(&self, array: &Array, path: &mut Vec<LiteralId>) -> Value {
        let items = array
            .elements()
            .iter()
            .map(|&slot| match self.target(slot) {
                Some(l) => self.snapshot_literal(l, path),
                None => Value::Nil,
            })
            .collect();
        Value::Array(items)
    }

    // ---- reclamation ----

    /// Reclaim queued literals that are still unreferenced. Reclaiming an
    /// array frees its element slots, which may queue more literals.
    pub fn sweep(&mut self) -> usize {
        let mut reclaimed = 0;
        while let Some(id) = self.beyond_life_cycle.pop() {
            let entry = self.literals.get_mut(id.0 as usize);
            let Some(entry) = entry else { continue };
            if !entry.as_ref().is_some_and(|l| l.refs == 0) {
                continue;
            }
            let Some(literal) = entry.take() else { continue };
            self.vacant.push(id.0);
            reclaimed += 1;
            if let Payload::Array(array) = literal.payload {
                for slot in array.into_elements() {
                    self.free_slot(slot);
                }
            }
        }
        if reclaimed > 0 {
            tracing::trace!(reclaimed, "swept literals");
        }
        reclaimed
    }

    /// Unbind every symbol and reclaim every literal, including arrays
    /// that reference themselves. Returns how many literals were reclaimed.
    pub fn teardown(&mut self) -> usize {
        for id in self.symbols.drain() {
            self.free_slot(id);
        }
        let swept = self.sweep();
        let stranded = self.live_literals();
        *self = Store::new();
        tracing::debug!(swept, stranded, "store torn down");
        swept + stranded
    }
}

use crate::object::Object;
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};

/// A scope frame shared by reference.
///
/// Cloning an `Environment` clones the handle, not the bindings: every
/// closure created in a frame sees later `variable` declarations made in
/// that frame, which is what lets a function call itself by name.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Default)]
struct Scope {
    bindings: FxHashMap<String, Object>,
    outer: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: &Environment) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            bindings: FxHashMap::default(),
            outer: Some(outer.clone()),
        })))
    }

    /// Looks `name` up in this frame, then in each enclosing frame.
    pub fn get(&self, name: &str) -> Option<Object> {
        let scope = self.0.borrow();
        match scope.bindings.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }

    /// Binds in this frame only, shadowing any outer binding.
    pub fn set(&self, name: impl Into<String>, value: Object) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }
}

pub fn new_root_environment() -> Environment {
    Environment::new()
}

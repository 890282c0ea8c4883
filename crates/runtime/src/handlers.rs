//! Handler registry
//!
//! Handlers run in registration order, once per drained message. The list
//! only grows; there is no way to remove a handler.

use crate::context::Context;
use cns_core::Value;
use std::rc::Rc;

/// A message handler; receives the context it runs in and the message
pub type Handler = Rc<dyn Fn(&Context, &Value)>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    /// Copy of the current list, for a drain to iterate while the
    /// registry stays free to grow
    pub fn snapshot(&self) -> Vec<Handler> {
        self.handlers.clone()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

//! Function and custom-tag registries.
//!
//! The registry is an injected dependency of every render call rather than
//! process-global state. Names are upper-cased on registration and lookup.
//! The maps are read-mostly: populated at startup, then shared across any
//! number of concurrent renders; `RwLock` covers the rare late
//! registration.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::node::Element;
use crate::render::Renderer;
use crate::value::{Scope, Value};

/// A callable usable from expressions: `len(ids)`.
pub type SqlFunction = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Handler for an element name the interpreter does not know.
///
/// A handler receives the same destinations the interpreter itself writes
/// to (output buffer and ordered parameter list) plus the renderer, so it
/// can re-enter the walk for its children via [`Renderer::render_children`].
pub type TagHandler = Arc<
    dyn Fn(&Renderer, &Element, &mut Scope, &mut String, &mut Vec<Value>) -> Result<()>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct Registry {
    functions: RwLock<HashMap<String, SqlFunction>>,
    tags: RwLock<HashMap<String, TagHandler>>,
}

impl Registry {
    /// An empty registry, no functions, no tags.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry preloaded with the stock functions. Currently that is
    /// `len`: length of a sequence, 0 for anything else.
    pub fn with_builtins() -> Registry {
        let registry = Registry::new();
        registry.register_function("len", |args: &[Value]| match args {
            [Value::Seq(items)] => Value::Int(items.len() as i64),
            _ => Value::Int(0),
        });
        registry
    }

    pub fn register_function<F>(&self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions
            .write()
            .expect("function registry poisoned")
            .insert(name.to_uppercase(), Arc::new(func));
    }

    pub fn register_tag<H>(&self, name: &str, handler: H)
    where
        H: Fn(&Renderer, &Element, &mut Scope, &mut String, &mut Vec<Value>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.tags
            .write()
            .expect("tag registry poisoned")
            .insert(name.to_uppercase(), Arc::new(handler));
    }

    pub fn function(&self, name: &str) -> Option<SqlFunction> {
        self.functions
            .read()
            .expect("function registry poisoned")
            .get(&name.to_uppercase())
            .cloned()
    }

    pub fn tag(&self, name: &str) -> Option<TagHandler> {
        self.tags
            .read()
            .expect("tag registry poisoned")
            .get(&name.to_uppercase())
            .cloned()
    }
}

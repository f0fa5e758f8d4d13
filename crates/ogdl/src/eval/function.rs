//! Native function objects bound to graph nodes by type tag.
//!
//! A node declares `!type` with a tag child; the registry maps that tag to a
//! factory, and the evaluator invokes methods on the constructed object
//! through path call syntax (`math.Sin(1.0)`).

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::CallError;
use crate::eval::engine::Value;

/// A callable native object.
pub trait Function {
    /// Invokes `method` with already evaluated arguments.
    ///
    /// Return [`CallError::UnknownMethod`] for a method the object does not
    /// have; the evaluator reports it as an unresolved function.
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError>;
}

impl<F> Function for F
where
    F: FnMut(&str, &[Value]) -> Result<Value, CallError>,
{
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        self(method, args)
    }
}

/// Zero-argument constructor for a function object.
pub type Factory = Arc<dyn Fn() -> Box<dyn Function> + Send + Sync>;

/// Type tag to factory mapping.
///
/// Fill it before evaluation starts; evaluators only read it.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    factories: FxHashMap<String, Factory>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `tag`, replacing any earlier registration.
    ///
    /// Returns true if a previous factory was replaced.
    pub fn register<F, T>(&mut self, tag: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Function + 'static,
    {
        let tag = tag.into();
        let factory: Factory = Arc::new(move || Box::new(factory()) as Box<dyn Function>);
        let replaced = self.factories.insert(tag.clone(), factory).is_some();
        if replaced {
            tracing::debug!(tag = %tag, "function factory replaced");
        }
        replaced
    }

    /// True if `tag` has a factory.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Constructs a fresh object for `tag`.
    pub fn instantiate(&self, tag: &str) -> Option<Box<dyn Function>> {
        self.factories.get(tag).map(|factory| factory())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

//! Registration contract consumed by digwire-generated wiring modules.
//!
//! Generated code erases constructor functions into [`Provider`] entries and
//! hands them to [`must_provide`] from a module-load initializer. The DI
//! container drains the accumulated [`Registration`]s with
//! [`take_registrations`] and performs its own dependency-graph resolution;
//! that resolution is outside this crate's concern.

use std::any::Any;
use std::sync::{Mutex, OnceLock};

pub use ctor::ctor;

/// Error type returned by generated constructors and lifecycle methods.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A type-erased constructor entry produced by the [`providers!`] macro.
pub struct Provider {
    name: &'static str,
    constructor: Box<dyn Any + Send + Sync>,
}

impl Provider {
    /// Wraps an erased constructor under its source-level name.
    #[must_use]
    pub fn new(name: &'static str, constructor: Box<dyn Any + Send + Sync>) -> Self {
        Self { name, constructor }
    }

    /// Source-level name of the constructor function.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The erased constructor, for the container to downcast.
    #[must_use]
    pub fn constructor(&self) -> &(dyn Any + Send + Sync) {
        &*self.constructor
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("name", &self.name).finish()
    }
}

/// Binding options attached to a registration bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvideOption {
    /// Collect the providers' outputs into the named multi-value group.
    Group(String),
    /// Register the providers under a named binding.
    Name(String),
}

/// Requests a grouped (multi-value) binding.
#[must_use]
pub fn group(group: &str) -> ProvideOption {
    ProvideOption::Group(group.to_owned())
}

/// Requests a named binding.
#[must_use]
pub fn name(name: &str) -> ProvideOption {
    ProvideOption::Name(name.to_owned())
}

/// One aggregate registration call: a bucket of providers plus its options.
#[derive(Debug)]
pub struct Registration {
    /// Erased constructors registered together.
    pub providers: Vec<Provider>,
    /// Binding options shared by every provider in the bucket.
    pub options: Vec<ProvideOption>,
}

fn registry() -> &'static Mutex<Vec<Registration>> {
    static REGISTRY: OnceLock<Mutex<Vec<Registration>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Records one registration bucket for the container to consume.
///
/// # Errors
///
/// Returns an error when the process-global registry is poisoned.
pub fn provide(providers: Vec<Provider>, options: Vec<ProvideOption>) -> Result<(), Error> {
    let mut entries = registry()
        .lock()
        .map_err(|_| -> Error { "digwire registry poisoned".into() })?;
    entries.push(Registration { providers, options });
    Ok(())
}

/// Records one registration bucket, panicking on failure.
///
/// Generated initializers call this at module load, where there is no caller
/// to propagate an error to.
///
/// # Panics
///
/// Panics when [`provide`] fails.
pub fn must_provide(providers: Vec<Provider>, options: Vec<ProvideOption>) {
    if let Err(err) = provide(providers, options) {
        panic!("digwire must_provide failed: {err}");
    }
}

/// Drains every recorded registration, in registration order.
#[must_use]
pub fn take_registrations() -> Vec<Registration> {
    registry().lock().map_or_else(|_| Vec::new(), |mut entries| entries.drain(..).collect())
}

/// Erases a list of constructor functions into [`Provider`] entries.
#[macro_export]
macro_rules! providers {
    ($($ctor:path),* $(,)?) => {
        vec![$($crate::Provider::new(stringify!($ctor), Box::new($ctor))),*]
    };
}

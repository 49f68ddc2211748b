//! Decorations post-process resolved values without owning their construction. Two modes are
//! supported:
//!
//! * [DecorationMode::Decorate] - the step receives the current value and its result becomes the
//!   new value
//! * [DecorationMode::Configure] - the step observes the current value and its result is discarded
//!
//! Decorations are registered for an exact note, so `"genie:foo"` decorates only the `foo` value
//! of `genie`. Configuration is possible only for unnamed notes. Steps registered on ancestor
//! registries run before steps registered on derived ones, and within one registry in
//! registration order.
//!
//! A step is an [Injectable] receiving the value as its last positional argument, after any
//! positional dependencies from its own annotation.

use crate::annotation::{fulfill_regardless, Injectable, Signature};
use crate::error::{RegistrationError, ResolveError};
use crate::note::Note;
use crate::resolver::{downcast_value, NoteResolver, ValuePtr};
use fxhash::FxHashMap;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use tracing::debug;

pub type DecorationRegistryPtr = Rc<DecorationRegistry>;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DecorationMode {
    Decorate,
    Configure,
}

impl Display for DecorationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecorationMode::Decorate => write!(f, "decorate"),
            DecorationMode::Configure => write!(f, "configure"),
        }
    }
}

/// A single registered decoration step.
#[derive(Clone, Debug)]
pub struct DecorationEntry {
    pub note: Note,
    pub mode: DecorationMode,
    pub step: Injectable<ValuePtr>,
}

/// One node of a decoration registry chain.
#[derive(Debug, Default)]
pub struct DecorationRegistry {
    parent: Option<DecorationRegistryPtr>,
    entries: RefCell<FxHashMap<Note, Vec<DecorationEntry>>>,
}

impl DecorationRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry inheriting from `parent`.
    pub fn with_parent(parent: DecorationRegistryPtr) -> Self {
        Self {
            parent: Some(parent),
            entries: Default::default(),
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<&DecorationRegistryPtr> {
        self.parent.as_ref()
    }

    /// Appends a step for given note.
    pub fn register(
        &self,
        note: Note,
        mode: DecorationMode,
        step: Injectable<ValuePtr>,
    ) -> Result<(), RegistrationError> {
        if mode == DecorationMode::Configure && note.is_named() {
            return Err(RegistrationError::UnsupportedConfiguration(note));
        }

        debug!(%note, %mode, step = step.name(), "Registering decoration.");

        self.entries
            .borrow_mut()
            .entry(note.clone())
            .or_default()
            .push(DecorationEntry { note, mode, step });

        Ok(())
    }

    /// Returns all steps for given note, ancestors first.
    pub fn decorations(&self, note: &Note) -> Vec<DecorationEntry> {
        let mut registries: Vec<&DecorationRegistry> =
            std::iter::successors(Some(self), |registry| registry.parent.as_deref()).collect();
        registries.reverse();

        registries
            .into_iter()
            .flat_map(|registry| {
                registry
                    .entries
                    .borrow()
                    .get(note)
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Passes the value through all steps for given note. Step dependencies are resolved right
    /// before each step runs.
    pub fn apply(
        &self,
        note: &Note,
        value: ValuePtr,
        resolver: &mut dyn NoteResolver,
    ) -> Result<ValuePtr, ResolveError> {
        let mut value = value;
        for DecorationEntry { mode, step, .. } in self.decorations(note) {
            let mut arguments = fulfill_regardless(step.annotation(), resolver)?;
            arguments.push(value.clone());

            let result = step.call(arguments)?;
            if mode == DecorationMode::Decorate {
                value = result;
            }
        }

        Ok(value)
    }
}

/// Creates an unannotated step from a function on type-erased values.
pub fn step<N, F>(name: N, f: F) -> Injectable<ValuePtr>
where
    N: Into<Cow<'static, str>>,
    F: Fn(ValuePtr) -> Result<ValuePtr, ResolveError> + 'static,
{
    Injectable::new(name, Signature::new().positional("value"), move |arguments| {
        arguments.positional_as::<ValuePtr>(0).and_then(&f)
    })
}

/// Creates an unannotated step from a function on concrete values.
pub fn typed<T, U, N, F>(name: N, f: F) -> Injectable<ValuePtr>
where
    T: 'static,
    U: 'static,
    N: Into<Cow<'static, str>>,
    F: Fn(Rc<T>) -> Result<U, ResolveError> + 'static,
{
    step(name, move |value| {
        f(downcast_value("decorated value", value)?).map(|result| Rc::new(result) as ValuePtr)
    })
}

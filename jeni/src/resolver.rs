use crate::error::ResolveError;
use crate::note::{IntoNote, Note};
#[cfg(test)]
use mockall::automock;
use std::any::{type_name, Any};
use std::rc::Rc;

/// Type-erased resolved value.
pub type ValuePtr = Rc<dyn Any + 'static>;

/// Generic resolver of notes into values. Implemented by the
/// [Injector](crate::injector::Injector), but kept separate so parameter binding and decoration
/// only depend on the ability to resolve.
#[cfg_attr(test, automock)]
pub trait NoteResolver {
    /// Resolves a single parsed note into a value.
    fn resolve_note(&mut self, note: &Note) -> Result<ValuePtr, ResolveError>;
}

/// Helper trait for [NoteResolver] providing strongly-typed access.
pub trait TypedNoteResolver {
    /// Resolves anything note-like and downcasts the value to `T`.
    fn resolve_typed<T: 'static, N: IntoNote>(&mut self, note: N) -> Result<Rc<T>, ResolveError>;

    /// Tries to resolve a value like [TypedNoteResolver::resolve_typed] does, but returns `None`
    /// when the value is currently unset.
    fn resolve_option<T: 'static, N: IntoNote>(
        &mut self,
        note: N,
    ) -> Result<Option<Rc<T>>, ResolveError>;
}

impl<R: NoteResolver + ?Sized> TypedNoteResolver for R {
    fn resolve_typed<T: 'static, N: IntoNote>(&mut self, note: N) -> Result<Rc<T>, ResolveError> {
        let note = note.into_note()?;
        self.resolve_note(&note)
            .and_then(|value| downcast_value(&note.to_string(), value))
    }

    fn resolve_option<T: 'static, N: IntoNote>(
        &mut self,
        note: N,
    ) -> Result<Option<Rc<T>>, ResolveError> {
        match self.resolve_typed(note) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_unset() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Downcasts a resolved value, describing the mismatch using `target`.
pub fn downcast_value<T: 'static>(target: &str, value: ValuePtr) -> Result<Rc<T>, ResolveError> {
    value
        .downcast::<T>()
        .map_err(|_| ResolveError::IncompatibleValue {
            target: target.to_string(),
            expected: type_name::<T>(),
        })
}

/// Wraps a concrete value for storage.
#[inline]
pub fn value_ptr<T: 'static>(value: T) -> ValuePtr {
    Rc::new(value) as ValuePtr
}

use crate::note::{BaseKey, Note};
use itertools::Itertools;
use std::error::Error;
use std::rc::Rc;
use thiserror::Error;

/// Type-erased error returned by user code: factories, constructors and decoration steps.
pub type ErrorPtr = Rc<dyn Error + 'static>;

/// Errors related to the shape of a note.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum NoteError {
    #[error("Malformed note: {0}")]
    Malformed(String),
}

/// Errors related to attaching an [Annotation](crate::annotation::Annotation) to a callable.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum AnnotationError {
    #[error("Callable '{0}' is already annotated")]
    AlreadyAnnotated(String),
    #[error("Callable '{callable}' does not declare annotated parameter: {parameter}")]
    UnexpectedAnnotation { callable: String, parameter: String },
}

/// Errors related to provider and decoration registries.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error("Configuration of named notes is not supported: {0}")]
    UnsupportedConfiguration(Note),
    #[error("Attempted to re-register a provider for: {0}")]
    DuplicateRegistration(BaseKey),
}

/// Errors related to resolving notes and applying callables.
#[derive(Error, Clone, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error("No provider registered for note: {0}")]
    UnresolvedNote(Note),
    #[error("{}", format_unset(.note.as_ref(), .chain, .reason.as_deref()))]
    Unset {
        /// The innermost note which could not be provided.
        note: Option<Note>,
        /// Notes the error propagated through, innermost first.
        chain: Vec<Note>,
        reason: Option<String>,
    },
    #[error("Provider does not support named access: '{name}'")]
    UnsupportedNamedAccess { name: String },
    #[error("Provider protocol violation: {0}")]
    ProviderProtocol(String),
    #[error("Injector is already closed")]
    AlreadyClosed,
    #[error("Callable '{0}' is not annotated")]
    NotAnnotated(String),
    #[error("Detected dependency cycle for: {0}")]
    DependencyCycle(Note),
    #[error("Missing argument: {0}")]
    MissingArgument(String),
    #[error("Value for {target} is not of type {expected}")]
    IncompatibleValue {
        target: String,
        expected: &'static str,
    },
    #[error("Error in provider: {0}")]
    ProviderError(ErrorPtr),
    #[error("Errors closing providers: {}", .0.iter().map(|(key, error)| format!("{key}: {error}")).join("; "))]
    Close(Vec<(BaseKey, ResolveError)>),
}

impl ResolveError {
    /// Signals a dependency which can be provided in principle, but currently has no value.
    pub fn unset() -> Self {
        Self::Unset {
            note: None,
            chain: Vec::new(),
            reason: None,
        }
    }

    /// Like [ResolveError::unset], with a human readable reason.
    pub fn unset_because<T: ToString>(reason: T) -> Self {
        Self::Unset {
            note: None,
            chain: Vec::new(),
            reason: Some(reason.to_string()),
        }
    }

    /// Wraps any error coming from user code.
    pub fn provider<E: Error + 'static>(error: E) -> Self {
        Self::ProviderError(Rc::new(error))
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset { .. })
    }

    /// Returns the innermost note of an `Unset` error, if known.
    pub fn unset_note(&self) -> Option<&Note> {
        match self {
            Self::Unset { note, .. } => note.as_ref(),
            _ => None,
        }
    }

    /// Records that an `Unset` error passed through resolution of `note`. Other errors are
    /// returned unchanged.
    pub fn with_note(self, note: &Note) -> Self {
        match self {
            Self::Unset {
                note: original,
                mut chain,
                reason,
            } => {
                if chain.last() != Some(note) {
                    chain.push(note.clone());
                }

                Self::Unset {
                    note: original.or_else(|| Some(note.clone())),
                    chain,
                    reason,
                }
            }
            error => error,
        }
    }
}

fn format_unset(note: Option<&Note>, chain: &[Note], reason: Option<&str>) -> String {
    let mut message = match note {
        Some(note) => format!("Note is currently unset: '{note}'"),
        None => "Note is currently unset".to_string(),
    };

    if chain.len() > 1 {
        message.push_str(&format!(
            " (required by {})",
            chain.iter().skip(1).map(|note| format!("'{note}'")).join(" <- ")
        ));
    }

    if let Some(reason) = reason {
        message.push_str(": ");
        message.push_str(reason);
    }

    message
}

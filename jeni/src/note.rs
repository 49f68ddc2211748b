//! A [Note] identifies a dependency: a [BaseKey] selecting the provider, optionally qualified with
//! an instance name. Notes are usually written as strings:
//!
//! * `"hello"` - the canonical, unnamed value of `hello`
//! * `"hello:world"` - the value named `world` of the very same `hello` provider
//! * `"a\:b:c"` - a backslash escapes a colon, so this is the value `c` of the base key `a:b`
//!
//! Besides strings, any Rust type can serve as an opaque base key via [BaseKey::of].

use crate::error::NoteError;
use itertools::Itertools;
use std::any::{type_name, TypeId};
use std::fmt::{Display, Formatter};

const SEPARATOR: char = ':';
const ESCAPE: char = '\\';

/// Identity of a provider.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum BaseKey {
    /// Plain string key.
    Name(String),
    /// Opaque key derived from a Rust type. The name is kept for diagnostics only.
    Type { id: TypeId, name: &'static str },
}

impl BaseKey {
    /// Creates an opaque key for the given type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

impl Display for BaseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseKey::Name(name) => {
                for c in name.chars() {
                    if c == SEPARATOR || c == ESCAPE {
                        write!(f, "{ESCAPE}")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            BaseKey::Type { name, .. } => write!(f, "<{name}>"),
        }
    }
}

impl From<&str> for BaseKey {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for BaseKey {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

/// A dependency key with an optional instance name.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Note {
    base: BaseKey,
    name: Option<String>,
}

impl Note {
    pub fn new<B: Into<BaseKey>>(base: B, name: Option<String>) -> Self {
        Self {
            base: base.into(),
            name: name.filter(|name| !name.is_empty()),
        }
    }

    /// Creates an unnamed note for the given base key.
    #[inline]
    pub fn unnamed<B: Into<BaseKey>>(base: B) -> Self {
        Self::new(base, None)
    }

    /// Creates a note with a name for the given base key.
    #[inline]
    pub fn named<B: Into<BaseKey>, N: Into<String>>(base: B, name: N) -> Self {
        Self::new(base, Some(name.into()))
    }

    /// Parses a string note, splitting it on the first unescaped `:`.
    pub fn parse(note: &str) -> Self {
        let mut base = String::with_capacity(note.len());
        let mut chars = note.char_indices().peekable();

        while let Some((index, c)) = chars.next() {
            match c {
                ESCAPE => match chars.peek() {
                    Some(&(_, escaped)) if escaped == SEPARATOR || escaped == ESCAPE => {
                        base.push(escaped);
                        chars.next();
                    }
                    _ => base.push(ESCAPE),
                },
                SEPARATOR => {
                    let name = &note[index + SEPARATOR.len_utf8()..];
                    return Self::new(base, Some(name.to_string()));
                }
                c => base.push(c),
            }
        }

        Self::unnamed(base)
    }

    /// Builds a note from an explicit `(base, name)` sequence, which must have exactly two
    /// elements.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Result<Self, NoteError> {
        match parts {
            [base, name] => Ok(Self::named(base.as_ref(), name.as_ref())),
            _ => Err(NoteError::Malformed(format!(
                "expected (base, name) pair, got [{}]",
                parts.iter().map(|part| part.as_ref()).join(", ")
            ))),
        }
    }

    #[inline]
    pub fn base(&self) -> &BaseKey {
        &self.base
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Returns the canonical note for the same base key.
    pub fn to_unnamed(&self) -> Self {
        Self::unnamed(self.base.clone())
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}{SEPARATOR}{name}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

impl From<&str> for Note {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Note {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&Note> for Note {
    fn from(value: &Note) -> Self {
        value.clone()
    }
}

impl From<BaseKey> for Note {
    fn from(value: BaseKey) -> Self {
        Self::unnamed(value)
    }
}

impl<B: Into<BaseKey>, N: Into<String>> From<(B, N)> for Note {
    fn from((base, name): (B, N)) -> Self {
        Self::named(base, name)
    }
}

/// Conversion of anything note-like into a [Note]. Unlike `Into<Note>`, the conversion can fail,
/// which is the case for sequences not being exactly a `(base, name)` pair.
pub trait IntoNote {
    fn into_note(self) -> Result<Note, NoteError>;
}

impl IntoNote for Note {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(self)
    }
}

impl IntoNote for &Note {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(self.clone())
    }
}

impl IntoNote for &str {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(Note::parse(self))
    }
}

impl IntoNote for String {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(Note::parse(&self))
    }
}

impl IntoNote for &String {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(Note::parse(self))
    }
}

impl IntoNote for BaseKey {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(Note::unnamed(self))
    }
}

impl<B: Into<BaseKey>, N: Into<String>> IntoNote for (B, N) {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Ok(self.into())
    }
}

impl<S: AsRef<str>> IntoNote for &[S] {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Note::from_parts(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoNote for [S; N] {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Note::from_parts(&self)
    }
}

impl<S: AsRef<str>> IntoNote for Vec<S> {
    #[inline]
    fn into_note(self) -> Result<Note, NoteError> {
        Note::from_parts(&self)
    }
}

//! Callables with declared dependencies. Instead of inspecting functions at runtime, every
//! [Injectable] carries an explicit [Signature] describing its parameters and, optionally, an
//! [Annotation] pairing those parameters with [notes](crate::note::Note).
//!
//! ```
//! use jeni::annotation::{Annotation, Injectable, Signature};
//!
//! let greet = Injectable::new(
//!     "greet",
//!     Signature::new().positional("hello").keyword("punctuation"),
//!     |arguments| {
//!         let hello = arguments.get::<String>(0)?;
//!         let punctuation = arguments.keyword::<String>("punctuation")?;
//!         Ok(format!("{hello}{}", punctuation.as_deref().map_or("", String::as_str)))
//!     },
//! )
//! .with_annotation(Annotation::new().arg("hello:world").kwarg("punctuation", "bang"))
//! .unwrap();
//!
//! assert!(greet.has_annotation());
//! ```
//!
//! Positional notes are bound to positional parameters in declaration order and must always be
//! resolvable. Keyword notes are bound by parameter name and silently left out when their value
//! is currently unset, letting the callable fall back to its own default.

use crate::error::{AnnotationError, ResolveError};
use crate::note::Note;
use crate::resolver::{downcast_value, NoteResolver, ValuePtr};
use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::Any;
use std::borrow::Cow;
use std::rc::Rc;
use tracing::debug;

/// Reserved keyword carrying the instance name during named provider access.
pub const NAME_KEYWORD: &str = "name";

/// Declared parameters of a callable.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Signature {
    positional: Vec<String>,
    keyword: Vec<String>,
    accepts_extra_keywords: bool,
}

impl Signature {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next positional parameter.
    pub fn positional<T: Into<String>>(mut self, name: T) -> Self {
        self.positional.push(name.into());
        self
    }

    /// Declares a keyword parameter, which the callable can live without.
    pub fn keyword<T: Into<String>>(mut self, name: T) -> Self {
        self.keyword.push(name.into());
        self
    }

    /// Declares a catch-all for arbitrary keyword arguments.
    pub fn extra_keywords(mut self) -> Self {
        self.accepts_extra_keywords = true;
        self
    }

    #[inline]
    pub fn positional_parameters(&self) -> &[String] {
        &self.positional
    }

    #[inline]
    pub fn keyword_parameters(&self) -> &[String] {
        &self.keyword
    }

    #[inline]
    pub fn accepts_extra_keywords(&self) -> bool {
        self.accepts_extra_keywords
    }

    /// Checks if a keyword argument with given name can be passed.
    pub fn accepts_keyword(&self, keyword: &str) -> bool {
        self.accepts_extra_keywords || self.keyword.iter().any(|name| name == keyword)
    }
}

/// Notes for the parameters of a callable.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Annotation {
    positional: Vec<Note>,
    keyword: Vec<(String, Note)>,
}

impl Annotation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a note for the next positional parameter.
    pub fn arg<N: Into<Note>>(mut self, note: N) -> Self {
        self.positional.push(note.into());
        self
    }

    /// Adds a note for the keyword parameter with given name.
    pub fn kwarg<K: Into<String>, N: Into<Note>>(mut self, keyword: K, note: N) -> Self {
        self.keyword.push((keyword.into(), note.into()));
        self
    }

    #[inline]
    pub fn positional_notes(&self) -> &[Note] {
        &self.positional
    }

    #[inline]
    pub fn keyword_notes(&self) -> &[(String, Note)] {
        &self.keyword
    }

    fn validate(&self, callable: &str, signature: &Signature) -> Result<(), AnnotationError> {
        if self.positional.len() > signature.positional.len() {
            let index = signature.positional.len();
            return Err(AnnotationError::UnexpectedAnnotation {
                callable: callable.to_string(),
                parameter: format!("#{index} ({})", self.positional[index]),
            });
        }

        match self
            .keyword
            .iter()
            .find(|(keyword, _)| !signature.accepts_keyword(keyword))
        {
            Some((keyword, _)) => Err(AnnotationError::UnexpectedAnnotation {
                callable: callable.to_string(),
                parameter: keyword.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Values passed to a callable.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct Arguments {
    #[derivative(Debug = "ignore")]
    positional: Vec<ValuePtr>,
    #[derivative(Debug = "ignore")]
    keyword: FxHashMap<String, ValuePtr>,
}

impl Arguments {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    pub fn push(&mut self, value: ValuePtr) {
        self.positional.push(value);
    }

    /// Sets a keyword value, replacing any previous one.
    pub fn insert<K: Into<String>>(&mut self, keyword: K, value: ValuePtr) {
        self.keyword.insert(keyword.into(), value);
    }

    /// Builder-style [Arguments::push] for concrete values.
    pub fn with<T: Any>(mut self, value: T) -> Self {
        self.push(Rc::new(value));
        self
    }

    /// Builder-style [Arguments::insert] for concrete values.
    pub fn with_keyword<K: Into<String>, T: Any>(mut self, keyword: K, value: T) -> Self {
        self.insert(keyword, Rc::new(value));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    #[inline]
    pub fn value(&self, index: usize) -> Option<&ValuePtr> {
        self.positional.get(index)
    }

    #[inline]
    pub fn keyword_value(&self, keyword: &str) -> Option<&ValuePtr> {
        self.keyword.get(keyword)
    }

    #[inline]
    pub fn contains_keyword(&self, keyword: &str) -> bool {
        self.keyword.contains_key(keyword)
    }

    /// Returns the positional value at `index`, downcast to `T`.
    pub fn get<T: 'static>(&self, index: usize) -> Result<Rc<T>, ResolveError> {
        let target = format!("argument #{index}");
        let value = self
            .value(index)
            .cloned()
            .ok_or_else(|| ResolveError::MissingArgument(target.clone()))?;

        downcast_value(&target, value)
    }

    /// Returns the keyword value, downcast to `T`, or `None` when not passed.
    pub fn keyword<T: 'static>(&self, keyword: &str) -> Result<Option<Rc<T>>, ResolveError> {
        self.keyword_value(keyword)
            .cloned()
            .map(|value| downcast_value(&format!("keyword '{keyword}'"), value))
            .transpose()
    }

    /// Converts the positional value at `index` to `T`.
    pub fn positional_as<T: FromArgument>(&self, index: usize) -> Result<T, ResolveError> {
        let target = format!("argument #{index}");
        let value = self
            .value(index)
            .cloned()
            .ok_or_else(|| ResolveError::MissingArgument(target.clone()))?;

        T::from_argument(&target, value)
    }

    /// Converts the keyword value to `T`, if passed.
    pub fn keyword_as<T: FromArgument>(&self, keyword: &str) -> Result<Option<T>, ResolveError> {
        self.keyword_value(keyword)
            .cloned()
            .map(|value| T::from_argument(&format!("keyword '{keyword}'"), value))
            .transpose()
    }

    /// Returns the instance name passed for named provider access.
    pub fn name(&self) -> Option<&str> {
        self.keyword_value(NAME_KEYWORD)
            .and_then(|value| value.downcast_ref::<String>())
            .map(String::as_str)
    }

    /// Appends positional values of `other` and overrides keywords with its keyword values.
    pub fn extend(&mut self, other: Arguments) {
        self.positional.extend(other.positional);
        self.keyword.extend(other.keyword);
    }
}

/// Conversion of a type-erased argument into a parameter type.
pub trait FromArgument: Sized {
    fn from_argument(target: &str, value: ValuePtr) -> Result<Self, ResolveError>;
}

impl<T: 'static> FromArgument for Rc<T> {
    #[inline]
    fn from_argument(target: &str, value: ValuePtr) -> Result<Self, ResolveError> {
        downcast_value(target, value)
    }
}

impl FromArgument for ValuePtr {
    #[inline]
    fn from_argument(_target: &str, value: ValuePtr) -> Result<Self, ResolveError> {
        Ok(value)
    }
}

/// Body of an [Injectable].
pub type CallableFn<R> = Rc<dyn Fn(Arguments) -> Result<R, ResolveError>>;

/// A named callable together with its declared parameters and dependency notes.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub struct Injectable<R> {
    name: Cow<'static, str>,
    signature: Signature,
    annotation: Option<Annotation>,
    #[derivative(Debug = "ignore")]
    body: CallableFn<R>,
}

impl<R: 'static> Injectable<R> {
    /// Creates an unannotated callable.
    pub fn new<N, F>(name: N, signature: Signature, body: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(Arguments) -> Result<R, ResolveError> + 'static,
    {
        Self {
            name: name.into(),
            signature,
            annotation: None,
            body: Rc::new(body),
        }
    }

    /// Creates a callable without parameters, producing values with given function.
    pub fn from_fn<N, F>(name: N, body: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn() -> Result<R, ResolveError> + 'static,
    {
        Self::new(name, Signature::new(), move |_| body())
    }

    /// Attaches an annotation. A callable can be annotated only once, and only for the
    /// parameters its signature declares.
    pub fn annotate(&mut self, annotation: Annotation) -> Result<(), AnnotationError> {
        if self.annotation.is_some() {
            return Err(AnnotationError::AlreadyAnnotated(self.name.to_string()));
        }

        annotation.validate(&self.name, &self.signature)?;
        self.annotation = Some(annotation);
        Ok(())
    }

    /// Builder-style [Injectable::annotate].
    pub fn with_annotation(mut self, annotation: Annotation) -> Result<Self, AnnotationError> {
        self.annotate(annotation)?;
        Ok(self)
    }
}

impl<R> Injectable<R> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    #[inline]
    pub fn has_annotation(&self) -> bool {
        self.annotation.is_some()
    }

    /// Calls the underlying function with given arguments.
    #[inline]
    pub fn call(&self, arguments: Arguments) -> Result<R, ResolveError> {
        (self.body)(arguments)
    }
}

/// A callable with its dependencies already resolved.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub struct Partial<R> {
    callable: Injectable<R>,
    bound: Arguments,
}

impl<R> Partial<R> {
    pub(crate) fn new(callable: Injectable<R>, bound: Arguments) -> Self {
        Self { callable, bound }
    }

    #[inline]
    pub fn bound(&self) -> &Arguments {
        &self.bound
    }

    /// Calls the callable with bound arguments only.
    pub fn call(&self) -> Result<R, ResolveError> {
        self.callable.call(self.bound.clone())
    }

    /// Calls the callable with additional arguments: positional values are appended after the
    /// bound ones, keyword values override the bound ones.
    pub fn call_with(&self, extra: Arguments) -> Result<R, ResolveError> {
        let mut arguments = self.bound.clone();
        arguments.extend(extra);
        self.callable.call(arguments)
    }
}

/// Reads the notes of an annotated callable.
pub fn bind<R>(callable: &Injectable<R>) -> Result<(&[Note], &[(String, Note)]), ResolveError> {
    callable
        .annotation()
        .map(|annotation| (annotation.positional_notes(), annotation.keyword_notes()))
        .ok_or_else(|| ResolveError::NotAnnotated(callable.name().to_string()))
}

/// Resolves notes into arguments. Positional failures abort; keyword notes which are currently
/// unset are left out of the result.
pub fn fulfill(
    positional: &[Note],
    keyword: &[(String, Note)],
    resolver: &mut dyn NoteResolver,
) -> Result<Arguments, ResolveError> {
    let mut arguments = Arguments::new();

    for note in positional {
        let value = resolver
            .resolve_note(note)
            .map_err(|error| error.with_note(note))?;
        arguments.push(value);
    }

    for (name, note) in keyword {
        match resolver.resolve_note(note) {
            Ok(value) => arguments.insert(name.clone(), value),
            Err(error) if error.is_unset() => {
                debug!(keyword = %name, %note, "Omitting unset keyword argument.");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(arguments)
}

/// Resolves arguments for the annotation, if present. Callables without annotation get no
/// arguments.
pub fn fulfill_regardless(
    annotation: Option<&Annotation>,
    resolver: &mut dyn NoteResolver,
) -> Result<Arguments, ResolveError> {
    match annotation {
        Some(annotation) => fulfill(
            annotation.positional_notes(),
            annotation.keyword_notes(),
            resolver,
        ),
        None => Ok(Arguments::new()),
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::annotation::{Annotation, Arguments, Injectable, Signature};
    use crate::error::ResolveError;
    use std::rc::Rc;

    /// Creates an annotated callable whose annotation has been validated at compile time.
    pub fn annotated<R, F>(
        name: &'static str,
        signature: Signature,
        annotation: Annotation,
        body: F,
    ) -> Injectable<R>
    where
        F: Fn(Arguments) -> Result<R, ResolveError> + 'static,
    {
        Injectable {
            name: name.into(),
            signature,
            annotation: Some(annotation),
            body: Rc::new(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::annotation::{
        bind, fulfill, Annotation, Arguments, Injectable, Partial, Signature, NAME_KEYWORD,
    };
    use crate::error::{AnnotationError, ResolveError};
    use crate::note::Note;
    use crate::resolver::{value_ptr, MockNoteResolver};
    use mockall::predicate::*;
    use std::rc::Rc;

    fn pair() -> Injectable<String> {
        Injectable::new(
            "pair",
            Signature::new()
                .positional("first")
                .positional("second")
                .keyword("suffix"),
            |arguments| {
                let suffix = arguments.keyword::<String>("suffix")?;
                Ok(format!(
                    "{} {}{}",
                    arguments.get::<String>(0)?,
                    arguments.get::<String>(1)?,
                    suffix.as_deref().map_or("", String::as_str)
                ))
            },
        )
    }

    #[test]
    fn should_reject_double_annotation() {
        let mut callable = pair();
        callable
            .annotate(Annotation::new().arg("spam").arg("eggs"))
            .unwrap();

        assert_eq!(
            callable
                .annotate(Annotation::new().arg("baz").arg("quux"))
                .unwrap_err(),
            AnnotationError::AlreadyAnnotated("pair".to_string())
        );
        assert_eq!(
            callable.annotation().unwrap().positional_notes(),
            &[Note::parse("spam"), Note::parse("eggs")]
        );
    }

    #[test]
    fn should_reject_undeclared_keyword() {
        assert!(matches!(
            pair()
                .with_annotation(Annotation::new().kwarg("unknown", "spam"))
                .unwrap_err(),
            AnnotationError::UnexpectedAnnotation { parameter, .. } if parameter == "unknown"
        ));
    }

    #[test]
    fn should_reject_too_many_positional_notes() {
        assert!(matches!(
            pair()
                .with_annotation(Annotation::new().arg("a").arg("b").arg("c"))
                .unwrap_err(),
            AnnotationError::UnexpectedAnnotation { .. }
        ));
    }

    #[test]
    fn should_accept_any_keyword_with_catch_all() {
        let callable = Injectable::new(
            "catch_all",
            Signature::new().extra_keywords(),
            |arguments| Ok(arguments.contains_keyword("anything")),
        )
        .with_annotation(Annotation::new().kwarg("anything", "spam"))
        .unwrap();

        assert!(callable.has_annotation());
    }

    #[test]
    fn should_bind_only_annotated_callables() {
        assert!(matches!(
            bind(&pair()).unwrap_err(),
            ResolveError::NotAnnotated(name) if name == "pair"
        ));

        let callable = pair()
            .with_annotation(Annotation::new().arg("spam").kwarg("suffix", "bang"))
            .unwrap();
        let (positional, keyword) = bind(&callable).unwrap();
        assert_eq!(positional, &[Note::parse("spam")]);
        assert_eq!(
            keyword,
            &[("suffix".to_string(), Note::parse("bang"))]
        );
    }

    #[test]
    fn should_fulfill_positional_in_order() {
        let mut resolver = MockNoteResolver::new();
        resolver
            .expect_resolve_note()
            .times(2)
            .returning(|note| Ok(value_ptr(note.to_string())));

        let arguments = fulfill(
            &[Note::parse("spam"), Note::parse("eggs:2")],
            &[],
            &mut resolver,
        )
        .unwrap();

        assert_eq!(*arguments.get::<String>(0).unwrap(), "spam");
        assert_eq!(*arguments.get::<String>(1).unwrap(), "eggs:2");
    }

    #[test]
    fn should_abort_on_unset_positional() {
        let mut resolver = MockNoteResolver::new();
        resolver
            .expect_resolve_note()
            .with(eq(Note::parse("error")))
            .times(1)
            .returning(|_| Err(ResolveError::unset()));

        let error = fulfill(&[Note::parse("error")], &[], &mut resolver).unwrap_err();
        assert_eq!(error.unset_note(), Some(&Note::parse("error")));
    }

    #[test]
    fn should_omit_unset_keyword() {
        let mut resolver = MockNoteResolver::new();
        resolver
            .expect_resolve_note()
            .with(eq(Note::parse("error")))
            .times(1)
            .returning(|_| Err(ResolveError::unset()));
        resolver
            .expect_resolve_note()
            .with(eq(Note::parse("hello")))
            .times(1)
            .returning(|_| Ok(value_ptr("hello".to_string())));

        let arguments = fulfill(
            &[],
            &[
                ("unused".to_string(), Note::parse("error")),
                ("greeting".to_string(), Note::parse("hello")),
            ],
            &mut resolver,
        )
        .unwrap();

        assert!(!arguments.contains_keyword("unused"));
        assert_eq!(
            *arguments.keyword::<String>("greeting").unwrap().unwrap(),
            "hello"
        );
    }

    #[test]
    fn should_propagate_unresolved_keyword() {
        let mut resolver = MockNoteResolver::new();
        resolver
            .expect_resolve_note()
            .returning(|note| Err(ResolveError::UnresolvedNote(note.clone())));

        assert!(matches!(
            fulfill(
                &[],
                &[("unused".to_string(), Note::parse("nothing"))],
                &mut resolver
            )
            .unwrap_err(),
            ResolveError::UnresolvedNote(..)
        ));
    }

    #[test]
    fn should_call_partial_with_extra_arguments() {
        let partial = Partial::new(
            pair(),
            Arguments::new()
                .with("spam".to_string())
                .with_keyword("suffix", "!".to_string()),
        );

        assert!(matches!(
            partial.call().unwrap_err(),
            ResolveError::MissingArgument(..)
        ));
        assert_eq!(
            partial
                .call_with(Arguments::new().with("eggs".to_string()))
                .unwrap(),
            "spam eggs!"
        );
        assert_eq!(
            partial
                .call_with(
                    Arguments::new()
                        .with("ham".to_string())
                        .with_keyword("suffix", "?".to_string())
                )
                .unwrap(),
            "spam ham?"
        );
    }

    #[test]
    fn should_read_name_keyword() {
        let arguments = Arguments::new().with_keyword(NAME_KEYWORD, "thing".to_string());
        assert_eq!(arguments.name(), Some("thing"));
        assert_eq!(Arguments::new().name(), None);
    }

    #[test]
    fn should_report_incompatible_argument() {
        let arguments = Arguments::new().with(1u8);
        assert!(matches!(
            arguments.get::<String>(0).unwrap_err(),
            ResolveError::IncompatibleValue { .. }
        ));
        assert!(matches!(
            arguments.positional_as::<Rc<String>>(1).unwrap_err(),
            ResolveError::MissingArgument(..)
        ));
        assert_eq!(*arguments.positional_as::<Rc<u8>>(0).unwrap(), 1);
    }
}

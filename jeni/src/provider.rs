//! Providers produce values for a base key. Three shapes are supported:
//!
//! * a plain callable, wrapped in [FactoryProvider] - invoked for every uncached request
//! * a class provider - any type implementing [Provider], constructed once per
//!   [Injector](crate::injector::Injector)
//! * a two-phase [Stateful] provider, driven by the [StatefulProvider] state machine - initialized
//!   once, yielding its canonical value, then optionally resumed with names
//!
//! Class providers and stateful providers own their resources: acquire them on construction or
//! initialization and release them in [Provider::close].

use crate::annotation::{Annotation, Arguments, Injectable, NAME_KEYWORD};
use crate::error::ResolveError;
use crate::resolver::ValuePtr;
use derivative::Derivative;
use std::rc::Rc;

pub type ProviderPtr = Box<dyn Provider>;

/// A materialized provider, owned by a single injector.
pub trait Provider {
    /// Returns the canonical value when `name` is `None`, or the value for given name.
    /// `arguments` are resolved from [Provider::annotation].
    fn get(&mut self, arguments: Arguments, name: Option<&str>) -> Result<ValuePtr, ResolveError>;

    /// Dependencies of [Provider::get].
    fn annotation(&self) -> Option<Annotation> {
        None
    }

    /// Whether [Provider::get] accepts a name. Named requests to a provider returning `false`
    /// fail before any dependency is resolved.
    fn supports_name(&self) -> bool {
        true
    }

    /// Releases resources. Called exactly once, when the owning injector closes.
    fn close(&mut self) -> Result<(), ResolveError> {
        Ok(())
    }
}

/// Provider calling a plain function for each request. Named requests pass the name as the
/// [NAME_KEYWORD] keyword argument, so the function must declare it.
#[derive(Clone, Debug)]
pub struct FactoryProvider {
    factory: Injectable<ValuePtr>,
}

impl FactoryProvider {
    pub fn new(factory: Injectable<ValuePtr>) -> Self {
        Self { factory }
    }
}

impl Provider for FactoryProvider {
    fn get(
        &mut self,
        mut arguments: Arguments,
        name: Option<&str>,
    ) -> Result<ValuePtr, ResolveError> {
        if let Some(name) = name {
            if !self.factory.signature().accepts_keyword(NAME_KEYWORD) {
                return Err(ResolveError::UnsupportedNamedAccess {
                    name: name.to_string(),
                });
            }

            arguments.insert(NAME_KEYWORD, Rc::new(name.to_string()));
        }

        self.factory.call(arguments)
    }

    fn annotation(&self) -> Option<Annotation> {
        self.factory.annotation().cloned()
    }

    fn supports_name(&self) -> bool {
        self.factory.signature().accepts_keyword(NAME_KEYWORD)
    }
}

/// Result of advancing a [Stateful] provider.
#[derive(Derivative)]
#[derivative(Debug)]
pub enum Step {
    Yielded(#[derivative(Debug = "ignore")] ValuePtr),
    Complete,
}

/// A producer which is started once and then can be resumed with names, until asked to finish.
pub trait Stateful {
    /// Performs setup and yields the initial value.
    fn start(&mut self) -> Result<Step, ResolveError>;

    /// Resumes the producer with a name, expecting the value for that name. Only called on
    /// providers registered with name support.
    fn resume(&mut self, _name: &str) -> Result<Step, ResolveError> {
        Ok(Step::Complete)
    }

    /// Asks the producer to wrap up. A converging producer completes without yielding.
    fn finish(&mut self) -> Result<Step, ResolveError> {
        Ok(Step::Complete)
    }
}

impl<S: Stateful + ?Sized> Stateful for Box<S> {
    #[inline]
    fn start(&mut self) -> Result<Step, ResolveError> {
        (**self).start()
    }

    #[inline]
    fn resume(&mut self, name: &str) -> Result<Step, ResolveError> {
        (**self).resume(name)
    }

    #[inline]
    fn finish(&mut self) -> Result<Step, ResolveError> {
        (**self).finish()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StatefulState {
    Uninitialized,
    AwaitingName,
    Finalized,
}

/// Explicit state machine driving a [Stateful] producer. The initial value is fixed at
/// [StatefulProvider::init] and never revisited; named values come from resuming the producer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct StatefulProvider {
    #[derivative(Debug = "ignore")]
    inner: Box<dyn Stateful>,
    supports_name: bool,
    state: StatefulState,
    #[derivative(Debug = "ignore")]
    initial: Option<ValuePtr>,
}

impl StatefulProvider {
    pub fn new<S: Stateful + 'static>(inner: S, supports_name: bool) -> Self {
        Self::from_boxed(Box::new(inner), supports_name)
    }

    pub fn from_boxed(inner: Box<dyn Stateful>, supports_name: bool) -> Self {
        Self {
            inner,
            supports_name,
            state: StatefulState::Uninitialized,
            initial: None,
        }
    }

    #[inline]
    pub fn state(&self) -> StatefulState {
        self.state
    }

    /// Starts the producer and returns its initial value.
    pub fn init(&mut self) -> Result<ValuePtr, ResolveError> {
        if self.state != StatefulState::Uninitialized {
            return Err(ResolveError::ProviderProtocol(
                "provider is already initialized".to_string(),
            ));
        }

        match self.inner.start() {
            Ok(Step::Yielded(value)) => {
                self.state = StatefulState::AwaitingName;
                self.initial = Some(value.clone());
                Ok(value)
            }
            Ok(Step::Complete) => {
                self.state = StatefulState::Finalized;
                Err(ResolveError::ProviderProtocol(
                    "provider did not yield an initial value".to_string(),
                ))
            }
            Err(error) => {
                self.state = StatefulState::Finalized;
                Err(error)
            }
        }
    }

    /// Returns the initial value, or resumes the producer with given name.
    pub fn value(&mut self, name: Option<&str>) -> Result<ValuePtr, ResolveError> {
        let initial = match (self.state, &self.initial) {
            (StatefulState::AwaitingName, Some(initial)) => initial.clone(),
            (StatefulState::Finalized, _) => {
                return Err(ResolveError::ProviderProtocol(
                    "provider is already finalized".to_string(),
                ))
            }
            _ => {
                return Err(ResolveError::ProviderProtocol(
                    "provider is not initialized".to_string(),
                ))
            }
        };

        let name = match name {
            Some(name) => name,
            None => return Ok(initial),
        };

        if !self.supports_name {
            return Err(ResolveError::UnsupportedNamedAccess {
                name: name.to_string(),
            });
        }

        match self.inner.resume(name)? {
            Step::Yielded(value) => Ok(value),
            Step::Complete => {
                self.state = StatefulState::Finalized;
                Err(ResolveError::ProviderProtocol(format!(
                    "provider stopped instead of yielding a value for name '{name}'"
                )))
            }
        }
    }

    /// Finishes the producer. The finalization pass happens at most once; subsequent calls do
    /// nothing.
    pub fn finalize(&mut self) -> Result<(), ResolveError> {
        match self.state {
            StatefulState::Uninitialized => Err(ResolveError::ProviderProtocol(
                "cannot finalize a provider which is not initialized".to_string(),
            )),
            StatefulState::Finalized => Ok(()),
            StatefulState::AwaitingName => {
                self.state = StatefulState::Finalized;
                self.initial = None;

                match self.inner.finish()? {
                    Step::Complete => Ok(()),
                    Step::Yielded(_) => Err(ResolveError::ProviderProtocol(
                        "provider kept yielding after being asked to finish".to_string(),
                    )),
                }
            }
        }
    }
}

impl Provider for StatefulProvider {
    #[inline]
    fn get(&mut self, _arguments: Arguments, name: Option<&str>) -> Result<ValuePtr, ResolveError> {
        self.value(name)
    }

    #[inline]
    fn supports_name(&self) -> bool {
        self.supports_name
    }

    #[inline]
    fn close(&mut self) -> Result<(), ResolveError> {
        self.finalize()
    }
}

type StartFn = Box<dyn FnMut() -> Result<ValuePtr, ResolveError>>;
type ResumeFn = Box<dyn FnMut(&str) -> Result<ValuePtr, ResolveError>>;
type FinishFn = Box<dyn FnMut() -> Result<(), ResolveError>>;

/// [Stateful] producer assembled from closures: `start` yields the initial value, the optional
/// `on_name` yields named values and the optional `on_finish` runs teardown.
pub struct FnStateful {
    start: StartFn,
    resume: Option<ResumeFn>,
    finish: Option<FinishFn>,
}

impl FnStateful {
    pub fn new<F>(start: F) -> Self
    where
        F: FnMut() -> Result<ValuePtr, ResolveError> + 'static,
    {
        Self {
            start: Box::new(start),
            resume: None,
            finish: None,
        }
    }

    pub fn on_name<F>(mut self, resume: F) -> Self
    where
        F: FnMut(&str) -> Result<ValuePtr, ResolveError> + 'static,
    {
        self.resume = Some(Box::new(resume));
        self
    }

    pub fn on_finish<F>(mut self, finish: F) -> Self
    where
        F: FnMut() -> Result<(), ResolveError> + 'static,
    {
        self.finish = Some(Box::new(finish));
        self
    }
}

impl Stateful for FnStateful {
    fn start(&mut self) -> Result<Step, ResolveError> {
        (self.start)().map(Step::Yielded)
    }

    fn resume(&mut self, name: &str) -> Result<Step, ResolveError> {
        match &mut self.resume {
            Some(resume) => resume(name).map(Step::Yielded),
            None => Ok(Step::Complete),
        }
    }

    fn finish(&mut self) -> Result<Step, ResolveError> {
        if let Some(finish) = &mut self.finish {
            finish()?;
        }

        Ok(Step::Complete)
    }
}

#[cfg(test)]
mod tests {
    use crate::annotation::{Arguments, Injectable, Signature, NAME_KEYWORD};
    use crate::error::ResolveError;
    use crate::provider::{
        FactoryProvider, FnStateful, Provider, Stateful, StatefulProvider, StatefulState, Step,
    };
    use crate::resolver::{value_ptr, ValuePtr};
    use std::cell::Cell;
    use std::rc::Rc;

    fn answer() -> StatefulProvider {
        StatefulProvider::new(FnStateful::new(|| Ok(value_ptr(42))), false)
    }

    fn spam() -> StatefulProvider {
        StatefulProvider::new(
            FnStateful::new(|| Ok(value_ptr("spam".to_string()))).on_name(|count| {
                count
                    .parse::<usize>()
                    .map(|count| value_ptr("spam".repeat(count)))
                    .map_err(ResolveError::provider)
            }),
            true,
        )
    }

    fn string(value: ValuePtr) -> String {
        value.downcast::<String>().unwrap().to_string()
    }

    #[test]
    fn should_return_initial_value() {
        let mut provider = answer();
        provider.init().unwrap();

        assert_eq!(*provider.value(None).unwrap().downcast::<i32>().unwrap(), 42);
        assert_eq!(*provider.value(None).unwrap().downcast::<i32>().unwrap(), 42);
        assert!(matches!(
            provider.value(Some("name")).unwrap_err(),
            ResolveError::UnsupportedNamedAccess { .. }
        ));
    }

    #[test]
    fn should_resume_with_names() {
        let mut provider = spam();
        assert_eq!(string(provider.init().unwrap()), "spam");
        assert_eq!(string(provider.value(Some("2")).unwrap()), "spamspam");
        assert_eq!(string(provider.value(Some("3")).unwrap()), "spamspamspam");
        assert!(matches!(
            provider.value(Some("forty")).unwrap_err(),
            ResolveError::ProviderError(..)
        ));
        assert_eq!(string(provider.value(None).unwrap()), "spam");
    }

    #[test]
    fn should_require_initialization() {
        let mut provider = answer();
        assert!(matches!(
            provider.value(None).unwrap_err(),
            ResolveError::ProviderProtocol(..)
        ));
        assert!(matches!(
            provider.finalize().unwrap_err(),
            ResolveError::ProviderProtocol(..)
        ));
    }

    #[test]
    fn should_finalize_once() {
        let finished = Rc::new(Cell::new(0));
        let counter = finished.clone();
        let mut provider = StatefulProvider::new(
            FnStateful::new(|| Ok(value_ptr(42))).on_finish(move || {
                counter.set(counter.get() + 1);
                Ok(())
            }),
            false,
        );

        provider.init().unwrap();
        provider.close().unwrap();
        provider.close().unwrap();

        assert_eq!(finished.get(), 1);
        assert_eq!(provider.state(), StatefulState::Finalized);
    }

    struct Unyielding;

    impl Stateful for Unyielding {
        fn start(&mut self) -> Result<Step, ResolveError> {
            Ok(Step::Complete)
        }
    }

    #[test]
    fn should_reject_unyielding_provider() {
        let mut provider = StatefulProvider::new(Unyielding, false);
        assert!(matches!(
            provider.init().unwrap_err(),
            ResolveError::ProviderProtocol(..)
        ));
    }

    #[test]
    fn should_reject_broken_name_support() {
        let mut provider = StatefulProvider::new(FnStateful::new(|| Ok(value_ptr(42))), true);
        provider.init().unwrap();

        assert_eq!(*provider.value(None).unwrap().downcast::<i32>().unwrap(), 42);
        assert!(matches!(
            provider.value(Some("name")).unwrap_err(),
            ResolveError::ProviderProtocol(..)
        ));
    }

    struct KeepsYielding;

    impl Stateful for KeepsYielding {
        fn start(&mut self) -> Result<Step, ResolveError> {
            Ok(Step::Yielded(value_ptr("one")))
        }

        fn finish(&mut self) -> Result<Step, ResolveError> {
            Ok(Step::Yielded(value_ptr("two")))
        }
    }

    #[test]
    fn should_reject_provider_which_keeps_yielding() {
        let mut provider = StatefulProvider::new(KeepsYielding, false);
        provider.init().unwrap();

        assert!(matches!(
            provider.finalize().unwrap_err(),
            ResolveError::ProviderProtocol(..)
        ));
    }

    #[test]
    fn should_pass_name_to_factory() {
        let mut provider = FactoryProvider::new(Injectable::new(
            "be_boring",
            Signature::new().keyword(NAME_KEYWORD),
            |arguments| {
                Ok(value_ptr(format!(
                    "{} is boring",
                    arguments.name().unwrap_or("this injector")
                )))
            },
        ));

        assert_eq!(
            string(provider.get(Arguments::new(), None).unwrap()),
            "this injector is boring"
        );
        assert_eq!(
            string(provider.get(Arguments::new(), Some("x")).unwrap()),
            "x is boring"
        );
    }

    #[test]
    fn should_reject_name_for_factory_without_name_support() {
        let mut provider = FactoryProvider::new(Injectable::from_fn("eggs", || {
            Ok(value_ptr("eggs!".to_string()))
        }));

        assert!(matches!(
            provider.get(Arguments::new(), Some("thing")).unwrap_err(),
            ResolveError::UnsupportedNamedAccess { name } if name == "thing"
        ));
    }
}

//! Core resolution functionality. An [InjectorClass] is a node in an explicit hierarchy, holding
//! its own provider and decoration registries chained to its parent's. An [Injector] is a single
//! resolution session of a class, owning materialized providers and cached values until closed.
//!
//! ```
//! use jeni::injector::InjectorClass;
//! use jeni::resolver::TypedNoteResolver;
//!
//! let class = InjectorClass::new("app");
//! class.register_value("answer", 42).unwrap();
//!
//! let mut injector = class.injector();
//! assert_eq!(*injector.resolve_typed::<i32, _>("answer").unwrap(), 42);
//! injector.close().unwrap();
//! ```
//!
//! Resolving a note goes through the following steps:
//!
//! 1. An unnamed note with a cached value returns that value.
//! 2. The provider for the base key is materialized, if not already. Stateful providers are
//!    initialized and their decorated initial value becomes the cached unnamed value.
//! 3. The provider is asked for the value, with the name of the note, if any.
//! 4. The value is decorated and, when unnamed, cached.

use crate::annotation::{bind, fulfill, fulfill_regardless, Injectable, Partial};
use crate::config::InjectorConfig;
use crate::decoration::{DecorationMode, DecorationRegistry, DecorationRegistryPtr};
use crate::error::{RegistrationError, ResolveError};
use crate::note::{BaseKey, IntoNote, Note};
use crate::provider::{FactoryProvider, ProviderPtr, Stateful, StatefulProvider};
use crate::registry::{ProviderDefinition, ProviderRegistry, ProviderRegistryPtr};
use crate::resolver::{value_ptr, NoteResolver, ValuePtr};
use derivative::Derivative;
use fxhash::{FxBuildHasher, FxHashMap, FxHashSet};
use indexmap::IndexMap;
use itertools::Itertools;
use std::borrow::Cow;
use std::rc::Rc;
use tracing::{debug, warn};

pub type InjectorClassPtr = Rc<InjectorClass>;

/// Registration scope for providers and decorations. Subclasses see everything registered on
/// their ancestors, including registrations made after the subclass was created, and can shadow
/// providers without affecting ancestors.
#[derive(Debug)]
pub struct InjectorClass {
    name: Cow<'static, str>,
    parent: Option<InjectorClassPtr>,
    providers: ProviderRegistryPtr,
    decorations: DecorationRegistryPtr,
    config: InjectorConfig,
}

impl InjectorClass {
    /// Creates a root class with default config.
    pub fn new<N: Into<Cow<'static, str>>>(name: N) -> InjectorClassPtr {
        Self::with_config(name, InjectorConfig::default())
    }

    /// Creates a root class with given config.
    pub fn with_config<N: Into<Cow<'static, str>>>(
        name: N,
        config: InjectorConfig,
    ) -> InjectorClassPtr {
        Rc::new(Self {
            name: name.into(),
            parent: None,
            providers: Rc::new(ProviderRegistry::new(config.allow_definition_overriding)),
            decorations: Rc::new(DecorationRegistry::new()),
            config,
        })
    }

    /// Creates a class inheriting all registrations and the config of this one.
    pub fn subclass<N: Into<Cow<'static, str>>>(self: &Rc<Self>, name: N) -> InjectorClassPtr {
        Rc::new(Self {
            name: name.into(),
            parent: Some(self.clone()),
            providers: Rc::new(ProviderRegistry::with_parent(self.providers.clone())),
            decorations: Rc::new(DecorationRegistry::with_parent(self.decorations.clone())),
            config: self.config.clone(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<&InjectorClassPtr> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    #[inline]
    pub fn providers(&self) -> &ProviderRegistryPtr {
        &self.providers
    }

    #[inline]
    pub fn decorations(&self) -> &DecorationRegistryPtr {
        &self.decorations
    }

    /// Registers a raw provider definition. Only the base key of the note is used.
    pub fn register_provider<N: IntoNote>(
        &self,
        note: N,
        definition: ProviderDefinition,
    ) -> Result<(), RegistrationError> {
        self.providers.register(&note.into_note()?, definition)
    }

    /// Registers a function called for every uncached request. To support named access, the
    /// function should declare the [NAME_KEYWORD](crate::annotation::NAME_KEYWORD) keyword.
    pub fn register_factory<N: IntoNote>(
        &self,
        note: N,
        factory: Injectable<ValuePtr>,
    ) -> Result<(), RegistrationError> {
        self.register_provider(note, ProviderDefinition::Factory(factory))
    }

    /// Registers a constructor of a class provider.
    pub fn register_class<N: IntoNote>(
        &self,
        note: N,
        constructor: Injectable<ProviderPtr>,
    ) -> Result<(), RegistrationError> {
        self.register_provider(note, ProviderDefinition::Class(constructor))
    }

    /// Registers a constructor of a two-phase provider.
    pub fn register_stateful<N: IntoNote>(
        &self,
        note: N,
        constructor: Injectable<Box<dyn Stateful>>,
        supports_name: bool,
    ) -> Result<(), RegistrationError> {
        self.register_provider(
            note,
            ProviderDefinition::Stateful {
                constructor,
                supports_name,
            },
        )
    }

    /// Registers a constant value.
    pub fn register_value<N: IntoNote, T: 'static>(
        &self,
        note: N,
        value: T,
    ) -> Result<(), RegistrationError> {
        let note = note.into_note()?;
        let value = value_ptr(value);

        self.register_factory(
            &note,
            Injectable::from_fn(format!("value of {}", note.base()), move || {
                Ok(value.clone())
            }),
        )
    }

    /// Registers a decoration step for the exact note.
    pub fn register_decoration<N: IntoNote>(
        &self,
        note: N,
        mode: DecorationMode,
        step: Injectable<ValuePtr>,
    ) -> Result<(), RegistrationError> {
        self.decorations.register(note.into_note()?, mode, step)
    }

    /// Registers a step replacing the value.
    #[inline]
    pub fn decorate<N: IntoNote>(
        &self,
        note: N,
        step: Injectable<ValuePtr>,
    ) -> Result<(), RegistrationError> {
        self.register_decoration(note, DecorationMode::Decorate, step)
    }

    /// Registers a step observing the value. Only unnamed notes can be configured.
    #[inline]
    pub fn configure<N: IntoNote>(
        &self,
        note: N,
        step: Injectable<ValuePtr>,
    ) -> Result<(), RegistrationError> {
        self.register_decoration(note, DecorationMode::Configure, step)
    }

    /// Starts a new resolution session.
    #[inline]
    pub fn injector(self: &Rc<Self>) -> Injector {
        Injector::new(self.clone())
    }
}

/// A single resolution session. Providers are materialized at most once per base key and closed
/// together with the injector, in materialization order.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Injector {
    class: InjectorClassPtr,
    #[derivative(Debug = "ignore")]
    instances: IndexMap<BaseKey, ProviderPtr, FxBuildHasher>,
    #[derivative(Debug = "ignore")]
    values: FxHashMap<BaseKey, ValuePtr>,
    notes_under_resolution: FxHashSet<Note>,
    bases_under_construction: FxHashSet<BaseKey>,
    closed: bool,
}

impl Injector {
    pub fn new(class: InjectorClassPtr) -> Self {
        Self {
            class,
            instances: Default::default(),
            values: Default::default(),
            notes_under_resolution: Default::default(),
            bases_under_construction: Default::default(),
            closed: false,
        }
    }

    #[inline]
    pub fn class(&self) -> &InjectorClassPtr {
        &self.class
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Checks if a provider for given base key has been materialized in this session.
    #[inline]
    pub fn is_materialized(&self, base: &BaseKey) -> bool {
        self.instances.contains_key(base)
    }

    /// Resolves anything note-like into a value.
    pub fn resolve<N: IntoNote>(&mut self, note: N) -> Result<ValuePtr, ResolveError> {
        let note = note.into_note()?;
        self.resolve_note(&note)
    }

    /// Calls an annotated callable with its dependencies resolved.
    pub fn apply<R: 'static>(&mut self, callable: &Injectable<R>) -> Result<R, ResolveError> {
        self.ensure_open()?;

        let (positional, keyword) = bind(callable)?;
        let arguments = fulfill(positional, keyword, self)?;
        callable.call(arguments)
    }

    /// Resolves dependencies of an annotated callable and binds them, so the callable can be
    /// called later, possibly with additional arguments.
    pub fn partial<R: 'static>(
        &mut self,
        callable: &Injectable<R>,
    ) -> Result<Partial<R>, ResolveError> {
        self.ensure_open()?;

        let (positional, keyword) = bind(callable)?;
        let arguments = fulfill(positional, keyword, self)?;
        Ok(Partial::new(callable.clone(), arguments))
    }

    /// Closes all materialized providers, in the order they were materialized. Every provider is
    /// closed even if others fail; all failures are returned together.
    pub fn close(&mut self) -> Result<(), ResolveError> {
        self.ensure_open()?;
        self.closed = true;
        self.values.clear();

        debug!(
            class = %self.class.name,
            providers = self.instances.len(),
            "Closing injector."
        );

        let errors = self
            .instances
            .drain(..)
            .filter_map(|(base, mut provider)| {
                debug!(note = %base, "Closing provider.");
                provider.close().err().map(|error| {
                    warn!(note = %base, %error, "Error closing provider.");
                    (base, error)
                })
            })
            .collect_vec();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::Close(errors))
        }
    }

    #[inline]
    fn ensure_open(&self) -> Result<(), ResolveError> {
        if self.closed {
            Err(ResolveError::AlreadyClosed)
        } else {
            Ok(())
        }
    }

    fn resolve_uncached(&mut self, note: &Note) -> Result<ValuePtr, ResolveError> {
        let base = note.base();

        if !self.instances.contains_key(base) {
            let definition = self.class.providers.definition(note)?;
            let (provider, initial) = self.materialize(note, &definition)?;
            self.instances.insert(base.clone(), provider);

            if let Some(initial) = initial {
                let value = self.decorate(&note.to_unnamed(), initial)?;
                self.values.insert(base.clone(), value.clone());

                if !note.is_named() {
                    return Ok(value);
                }
            }
        }

        let provider = self
            .instances
            .get(base)
            .ok_or_else(|| ResolveError::UnresolvedNote(note.clone()))?;
        if let Some(name) = note.name() {
            if !provider.supports_name() {
                return Err(ResolveError::UnsupportedNamedAccess {
                    name: name.to_string(),
                });
            }
        }

        let annotation = provider.annotation();
        let arguments = fulfill_regardless(annotation.as_ref(), self)?;

        let value = self
            .instances
            .get_mut(base)
            .ok_or_else(|| ResolveError::UnresolvedNote(note.clone()))?
            .get(arguments, note.name())?;
        let value = self.decorate(note, value)?;

        if !note.is_named() {
            self.values.insert(base.clone(), value.clone());
        }

        Ok(value)
    }

    fn materialize(
        &mut self,
        note: &Note,
        definition: &ProviderDefinition,
    ) -> Result<(ProviderPtr, Option<ValuePtr>), ResolveError> {
        let base = note.base();
        if !self.bases_under_construction.insert(base.clone()) {
            return Err(ResolveError::DependencyCycle(note.clone()));
        }

        debug!(
            note = %base,
            provider = definition.callable_name(),
            "Materializing provider."
        );

        let result = self.construct(definition);
        self.bases_under_construction.remove(base);
        result
    }

    fn construct(
        &mut self,
        definition: &ProviderDefinition,
    ) -> Result<(ProviderPtr, Option<ValuePtr>), ResolveError> {
        match definition {
            ProviderDefinition::Factory(factory) => {
                Ok((Box::new(FactoryProvider::new(factory.clone())), None))
            }
            ProviderDefinition::Class(constructor) => {
                let arguments = fulfill_regardless(constructor.annotation(), self)?;
                Ok((constructor.call(arguments)?, None))
            }
            ProviderDefinition::Stateful {
                constructor,
                supports_name,
            } => {
                let arguments = fulfill_regardless(constructor.annotation(), self)?;
                let mut provider =
                    StatefulProvider::from_boxed(constructor.call(arguments)?, *supports_name);
                let initial = provider.init()?;

                Ok((Box::new(provider), Some(initial)))
            }
        }
    }

    fn decorate(&mut self, note: &Note, value: ValuePtr) -> Result<ValuePtr, ResolveError> {
        let decorations = self.class.decorations.clone();
        decorations.apply(note, value, self)
    }
}

impl NoteResolver for Injector {
    fn resolve_note(&mut self, note: &Note) -> Result<ValuePtr, ResolveError> {
        self.ensure_open()?;

        if !note.is_named() {
            if let Some(value) = self.values.get(note.base()) {
                return Ok(value.clone());
            }
        }

        if !self.notes_under_resolution.insert(note.clone()) {
            return Err(ResolveError::DependencyCycle(note.clone()));
        }

        let result = self.resolve_uncached(note);
        self.notes_under_resolution.remove(note);

        result.map_err(|error| error.with_note(note))
    }
}

impl Drop for Injector {
    fn drop(&mut self) {
        if self.closed || !self.class.config.close_on_drop {
            return;
        }

        debug!(class = %self.class.name, "Injector dropped without being closed.");
        if let Err(error) = self.close() {
            warn!(class = %self.class.name, %error, "Error closing dropped injector.");
        }
    }
}

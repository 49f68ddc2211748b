//! Functionality related to registering provider definitions. Registries form a chain mirroring
//! [InjectorClass](crate::injector::InjectorClass) inheritance: each node owns its own table and
//! lookups walk from the most derived node towards the root, so a derived registration shadows
//! the inherited one without touching the parent table.

use crate::annotation::Injectable;
use crate::error::{RegistrationError, ResolveError};
use crate::note::{BaseKey, Note};
use crate::provider::{ProviderPtr, Stateful};
use crate::resolver::ValuePtr;
use fxhash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

pub type ProviderRegistryPtr = Rc<ProviderRegistry>;

/// Describes how to materialize a provider for a base key.
#[derive(Clone, Debug)]
pub enum ProviderDefinition {
    /// Stateless function invoked on each uncached request.
    Factory(Injectable<ValuePtr>),

    /// Constructor of a class provider, instantiated once per injector.
    Class(Injectable<ProviderPtr>),

    /// Constructor of a two-phase provider, started once per injector.
    Stateful {
        constructor: Injectable<Box<dyn Stateful>>,
        supports_name: bool,
    },
}

impl ProviderDefinition {
    /// Name of the underlying callable, for diagnostics.
    pub fn callable_name(&self) -> &str {
        match self {
            ProviderDefinition::Factory(factory) => factory.name(),
            ProviderDefinition::Class(constructor) => constructor.name(),
            ProviderDefinition::Stateful { constructor, .. } => constructor.name(),
        }
    }
}

/// One node of a provider registry chain.
#[derive(Debug)]
pub struct ProviderRegistry {
    parent: Option<ProviderRegistryPtr>,
    definitions: RefCell<FxHashMap<BaseKey, Rc<ProviderDefinition>>>,
    allow_definition_overriding: bool,
}

impl ProviderRegistry {
    /// Creates a root registry.
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            parent: None,
            definitions: Default::default(),
            allow_definition_overriding,
        }
    }

    /// Creates an empty registry inheriting from `parent`.
    pub fn with_parent(parent: ProviderRegistryPtr) -> Self {
        Self {
            allow_definition_overriding: parent.allow_definition_overriding,
            parent: Some(parent),
            definitions: Default::default(),
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<&ProviderRegistryPtr> {
        self.parent.as_ref()
    }

    /// Registers a definition for the base key of `note` in this node. An existing registration
    /// in this node is replaced, unless overriding is disabled.
    pub fn register(
        &self,
        note: &Note,
        definition: ProviderDefinition,
    ) -> Result<(), RegistrationError> {
        let base = note.base();
        let mut definitions = self.definitions.borrow_mut();

        if let Some(existing) = definitions.get(base) {
            if !self.allow_definition_overriding {
                return Err(RegistrationError::DuplicateRegistration(base.clone()));
            }

            warn!(
                note = %base,
                previous = existing.callable_name(),
                current = definition.callable_name(),
                "Overriding provider registration."
            );
        } else {
            debug!(note = %base, provider = definition.callable_name(), "Registering provider.");
        }

        definitions.insert(base.clone(), Rc::new(definition));
        Ok(())
    }

    /// Finds the most derived definition for given base key.
    pub fn lookup(&self, base: &BaseKey) -> Option<Rc<ProviderDefinition>> {
        self.ancestry()
            .find_map(|registry| registry.definitions.borrow().get(base).cloned())
    }

    /// Like [ProviderRegistry::lookup], but fails with [ResolveError::UnresolvedNote].
    pub fn definition(&self, note: &Note) -> Result<Rc<ProviderDefinition>, ResolveError> {
        self.lookup(note.base())
            .ok_or_else(|| ResolveError::UnresolvedNote(note.clone()))
    }

    /// Checks if given base key is registered in this node or any ancestor.
    #[inline]
    pub fn is_registered(&self, base: &BaseKey) -> bool {
        self.lookup(base).is_some()
    }

    /// Checks if given base key is registered in this very node.
    #[inline]
    pub fn is_registered_locally(&self, base: &BaseKey) -> bool {
        self.definitions.borrow().contains_key(base)
    }

    /// Iterates from this node towards the root.
    pub fn ancestry(&self) -> impl Iterator<Item = &ProviderRegistry> {
        std::iter::successors(Some(self), |registry| registry.parent.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use crate::annotation::Injectable;
    use crate::error::{RegistrationError, ResolveError};
    use crate::note::{BaseKey, Note};
    use crate::registry::{ProviderDefinition, ProviderRegistry};
    use crate::resolver::value_ptr;
    use std::rc::Rc;

    fn definition(name: &'static str) -> ProviderDefinition {
        ProviderDefinition::Factory(Injectable::from_fn(name, move || Ok(value_ptr(name))))
    }

    #[test]
    fn should_register_definition() {
        let registry = ProviderRegistry::new(true);
        registry
            .register(&Note::parse("eggs"), definition("eggs"))
            .unwrap();

        assert!(registry.is_registered(&BaseKey::from("eggs")));
        assert_eq!(
            registry
                .lookup(&BaseKey::from("eggs"))
                .unwrap()
                .callable_name(),
            "eggs"
        );
        assert!(matches!(
            registry.definition(&Note::parse("nothing")).unwrap_err(),
            ResolveError::UnresolvedNote(..)
        ));
    }

    #[test]
    fn should_register_named_note_under_base_key() {
        let registry = ProviderRegistry::new(true);
        registry
            .register(&Note::parse("hello:name"), definition("hello"))
            .unwrap();

        assert!(registry.is_registered(&BaseKey::from("hello")));
        assert!(registry.definition(&Note::parse("hello:other")).is_ok());
    }

    #[test]
    fn should_override_at_same_node() {
        let registry = ProviderRegistry::new(true);
        registry
            .register(&Note::parse("answer"), definition("first"))
            .unwrap();
        registry
            .register(&Note::parse("answer"), definition("second"))
            .unwrap();

        assert_eq!(
            registry
                .lookup(&BaseKey::from("answer"))
                .unwrap()
                .callable_name(),
            "second"
        );
    }

    #[test]
    fn should_not_override_when_disabled() {
        let registry = ProviderRegistry::new(false);
        registry
            .register(&Note::parse("answer"), definition("first"))
            .unwrap();

        assert_eq!(
            registry
                .register(&Note::parse("answer"), definition("second"))
                .unwrap_err(),
            RegistrationError::DuplicateRegistration(BaseKey::from("answer"))
        );
    }

    #[test]
    fn should_shadow_parent_registration() {
        let parent = Rc::new(ProviderRegistry::new(true));
        parent
            .register(&Note::parse("answer"), definition("answer"))
            .unwrap();
        parent
            .register(&Note::parse("eggs"), definition("eggs"))
            .unwrap();

        let child = ProviderRegistry::with_parent(parent.clone());
        child
            .register(&Note::parse("answer"), definition("sub_answer"))
            .unwrap();

        assert_eq!(
            child
                .lookup(&BaseKey::from("answer"))
                .unwrap()
                .callable_name(),
            "sub_answer"
        );
        assert_eq!(
            child.lookup(&BaseKey::from("eggs")).unwrap().callable_name(),
            "eggs"
        );
        assert_eq!(
            parent
                .lookup(&BaseKey::from("answer"))
                .unwrap()
                .callable_name(),
            "answer"
        );
        assert!(!child.is_registered_locally(&BaseKey::from("eggs")));
    }

    #[test]
    fn should_see_late_parent_registrations() {
        let parent = Rc::new(ProviderRegistry::new(true));
        let child = ProviderRegistry::with_parent(parent.clone());

        parent
            .register(&Note::parse("late"), definition("late"))
            .unwrap();

        assert!(child.is_registered(&BaseKey::from("late")));
    }
}

//! Dependency injection based on notes. A [note](note::Note) names a dependency, optionally
//! qualified with an instance name (`"database"`, `"database:replica"`). Providers registered on an
//! [InjectorClass](injector::InjectorClass) produce values for notes, while an
//! [Injector](injector::Injector) resolves them, caches unnamed values and applies
//! [decorations](decoration) registered for the resolved note.
//!
//! ```
//! use jeni::annotation::{Annotation, Injectable, Signature};
//! use jeni::injector::InjectorClass;
//!
//! let class = InjectorClass::new("app");
//! class.register_value("hello", "Hello".to_string()).unwrap();
//!
//! let greet = Injectable::new("greet", Signature::new().positional("hello"), |arguments| {
//!     Ok(format!("{}, world!", arguments.get::<String>(0)?))
//! })
//! .with_annotation(Annotation::new().arg("hello"))
//! .unwrap();
//!
//! let mut injector = class.injector();
//! assert_eq!(injector.apply(&greet).unwrap(), "Hello, world!");
//! injector.close().unwrap();
//! ```
//!
//! With the `derive` feature (enabled by default), plain functions can be annotated with
//! [annotate], which generates the [Injectable](annotation::Injectable) for them.

pub mod annotation;
pub mod config;
pub mod decoration;
pub mod error;
pub mod injector;
pub mod note;
pub mod provider;
pub mod registry;
pub mod resolver;

#[cfg(feature = "derive")]
pub use jeni_derive::annotate;

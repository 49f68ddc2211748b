#[cfg(feature = "derive")]
mod annotate_test {
    use jeni::annotate;
    use jeni::annotation::{Arguments, Injectable, Signature, NAME_KEYWORD};
    use jeni::error::ResolveError;
    use jeni::injector::{InjectorClass, InjectorClassPtr};
    use jeni::note::Note;
    use jeni::resolver::{value_ptr, TypedNoteResolver, ValuePtr};
    use std::rc::Rc;

    #[annotate("hello", "hello:x", "eggs")]
    fn greeting(hello: Rc<String>, hello_x: Rc<String>, eggs: Rc<String>) -> String {
        format!("{hello} {hello_x} {eggs}")
    }

    #[annotate("spam", "eggs")]
    fn spam_eggs(spam: Rc<String>, eggs: Rc<String>, name: Option<String>) -> ValuePtr {
        match name {
            Some(name) => value_ptr(format!("{spam} {eggs} {name}")),
            None => value_ptr(format!("{spam} {eggs}")),
        }
    }

    #[annotate("hello", unused = "error")]
    fn unset_kwarg(hello: Rc<String>, unused: Option<Rc<String>>) -> Option<Rc<String>> {
        assert!(!hello.is_empty());
        unused
    }

    #[annotate("error")]
    fn unset_arg(_unused: ValuePtr) -> Result<(), ResolveError> {
        Err(ResolveError::ProviderProtocol("should not be called".to_string()))
    }

    #[annotate("hello")]
    fn shout(hello: Rc<String>, suffix: Rc<String>) -> String {
        format!("{}{suffix}", hello.to_uppercase())
    }

    #[annotate]
    fn constant() -> i32 {
        42
    }

    fn test_class() -> InjectorClassPtr {
        let class = InjectorClass::new("AnnotatedInjector");
        class
            .register_factory(
                "hello",
                Injectable::new(
                    "hello",
                    Signature::new().keyword(NAME_KEYWORD),
                    |arguments| {
                        Ok(value_ptr(format!(
                            "Hello, {}!",
                            arguments.name().unwrap_or("world")
                        )))
                    },
                ),
            )
            .unwrap();
        class.register_value("eggs", "eggs!".to_string()).unwrap();
        class.register_value("spam", "spam".to_string()).unwrap();
        class
            .register_factory(
                "error",
                Injectable::from_fn("error", || Err(ResolveError::unset())),
            )
            .unwrap();
        class
    }

    #[test]
    fn should_generate_annotated_injectable() {
        let injectable = greeting_injectable();
        assert_eq!(injectable.name(), "greeting");

        let annotation = injectable.annotation().unwrap();
        assert_eq!(
            annotation.positional_notes(),
            &[
                Note::parse("hello"),
                Note::parse("hello:x"),
                Note::parse("eggs")
            ]
        );
        assert!(annotation.keyword_notes().is_empty());
    }

    #[test]
    fn should_apply_annotated_function() {
        assert_eq!(
            test_class().injector().apply(&greeting_injectable()).unwrap(),
            "Hello, world! Hello, x! eggs!"
        );
        assert_eq!(
            test_class().injector().apply(&constant_injectable()).unwrap(),
            42
        );
    }

    #[test]
    fn should_register_annotated_factory_with_name() {
        let class = test_class();
        class.register_factory("dish", spam_eggs_injectable()).unwrap();

        let mut injector = class.injector();
        assert_eq!(
            *injector.resolve_typed::<String, _>("dish").unwrap(),
            "spam eggs!"
        );
        assert_eq!(
            *injector.resolve_typed::<String, _>("dish:eel").unwrap(),
            "spam eggs! eel"
        );
    }

    #[test]
    fn should_omit_unset_keyword() {
        assert!(test_class()
            .injector()
            .apply(&unset_kwarg_injectable())
            .unwrap()
            .is_none());
    }

    #[test]
    fn should_abort_on_unset_positional() {
        let error = test_class()
            .injector()
            .apply(&unset_arg_injectable())
            .unwrap_err();
        assert_eq!(error.unset_note(), Some(&Note::parse("error")));
    }

    #[test]
    fn should_keep_original_function_callable() {
        assert_eq!(
            shout(Rc::new("hi".to_string()), Rc::new("?".to_string())),
            "HI?"
        );
    }

    #[test]
    fn should_pass_caller_arguments_to_partial() {
        let partial = test_class()
            .injector()
            .partial(&shout_injectable())
            .unwrap();

        assert!(matches!(
            partial.call().unwrap_err(),
            ResolveError::MissingArgument(..)
        ));
        assert_eq!(
            partial
                .call_with(Arguments::new().with("!".to_string()))
                .unwrap(),
            "HELLO, WORLD!!"
        );
    }
}

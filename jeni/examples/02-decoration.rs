// note: this example assumes you've analyzed the previous ones

use jeni::decoration::typed;
use jeni::injector::InjectorClass;
use jeni::resolver::TypedNoteResolver;
use std::rc::Rc;

fn main() {
    let class = InjectorClass::new("app");
    class
        .register_value("it", "abc".to_string())
        .expect("error registering it");

    // decorations post-process resolved values in the order of registration
    class
        .decorate(
            "it",
            typed("reverse", |value: Rc<String>| {
                Ok(value.chars().rev().collect::<String>())
            }),
        )
        .expect("error registering reverse");

    // configuration can observe the value, but never replaces it
    class
        .configure(
            "it",
            typed("log", |value: Rc<String>| {
                println!("Resolved it: {value}");
                Ok(())
            }),
        )
        .expect("error registering log");

    // subclasses inherit providers and decorations - their own decorations run after inherited
    // ones
    let sub = class.subclass("sub");
    sub.decorate(
        "it",
        typed("double", |value: Rc<String>| Ok(format!("{value}{value}"))),
    )
    .expect("error registering double");

    // prints "cba"
    println!("{}", class.injector().resolve_typed::<String, _>("it").unwrap());

    // prints "cbacba"
    println!("{}", sub.injector().resolve_typed::<String, _>("it").unwrap());
}

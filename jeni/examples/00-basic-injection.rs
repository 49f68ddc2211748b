use jeni::annotate;
use jeni::injector::InjectorClass;
use std::rc::Rc;

// this is a plain function with its dependencies described by notes: "greeting" will be resolved
// into the first parameter and "name" into the second one
#[annotate("greeting", "name")]
fn greet(greeting: Rc<String>, name: Rc<String>) -> String {
    format!("{greeting}, {name}!")
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // providers are registered on an InjectorClass, which can later create any number of injectors
    let class = InjectorClass::new("app");
    class
        .register_value("greeting", "Hello".to_string())
        .expect("error registering greeting");
    class
        .register_value("name", "world".to_string())
        .expect("error registering name");

    // an injector resolves notes, caching resolved values until closed
    let mut injector = class.injector();

    // the annotate macro generated greet_injectable(), which the injector knows how to call
    let greeting = injector
        .apply(&greet_injectable())
        .expect("error applying greet");

    // prints "Hello, world!"
    println!("{greeting}");

    injector.close().expect("error closing injector");
}

// note: this example assumes you've analyzed the previous one

use jeni::annotation::Injectable;
use jeni::injector::InjectorClass;
use jeni::provider::{FnStateful, Stateful};
use jeni::resolver::{value_ptr, TypedNoteResolver};

// stateful providers are started once per injector and yield their initial value, which is used
// for unnamed notes like "spam"; when declared with name support, they are then resumed for
// each named note like "spam:3"
fn spam() -> Injectable<Box<dyn Stateful>> {
    Injectable::from_fn("spam", || {
        Ok(Box::new(
            FnStateful::new(|| {
                println!("Opening the spam can.");
                Ok(value_ptr("spam".to_string()))
            })
            .on_name(|count| {
                let count = count.parse::<usize>().unwrap_or(1);
                Ok(value_ptr(vec!["spam"; count].join(" ")))
            })
            // resources acquired on start should be released on finish, which happens when the
            // injector is closed
            .on_finish(|| {
                println!("Closing the spam can.");
                Ok(())
            }),
        ) as Box<dyn Stateful>)
    })
}

fn main() {
    let class = InjectorClass::new("app");
    class
        .register_stateful("spam", spam(), true)
        .expect("error registering spam");

    let mut injector = class.injector();

    // prints "spam" after opening the can, which happens only once
    println!("{}", injector.resolve_typed::<String, _>("spam").unwrap());
    println!("{}", injector.resolve_typed::<String, _>("spam").unwrap());

    // prints "spam spam spam"
    println!("{}", injector.resolve_typed::<String, _>("spam:3").unwrap());

    injector.close().expect("error closing injector");
}

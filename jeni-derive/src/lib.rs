use crate::annotate::expand_annotate;
use crate::attributes::AnnotateAttributes;
use proc_macro::TokenStream;
use syn::{parse_macro_input, Error, ItemFn};

mod annotate;
mod attributes;

/// Annotates a free function with notes for its parameters and generates a sibling
/// `<function>_injectable()` returning the corresponding `jeni::annotation::Injectable`.
///
/// Positional notes bind to the leading parameters, which should be `Rc<T>` or `ValuePtr`.
/// Keyword notes (`parameter = "note"`) bind to `Option<_>` parameters of the same name, left
/// `None` when the dependency is currently unset. A parameter called `name` receives the instance
/// name during named provider access, as `Option<String>`. All other parameters are positional
/// arguments supplied by the caller.
///
/// Functions returning `Result<T, E>` produce an `Injectable<T>`, with `E` converted into
/// `jeni::error::ResolveError`.
#[proc_macro_attribute]
pub fn annotate(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attributes = parse_macro_input!(attr as AnnotateAttributes);
    let item = parse_macro_input!(item as ItemFn);
    expand_annotate(&attributes, &item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

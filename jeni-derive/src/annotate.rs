use crate::attributes::AnnotateAttributes;
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Error, FnArg, GenericArgument, ItemFn, Pat, PatType, PathArguments, Result, ReturnType, Type,
};

const ANNOTATE: &str = "annotate";
const NAME_KEYWORD: &str = "name";

enum Parameter {
    Positional(usize),
    Keyword(String),
    Name,
}

fn is_annotate_attribute(attribute: &syn::Attribute) -> bool {
    attribute
        .path()
        .segments
        .last()
        .map(|segment| segment.ident == ANNOTATE)
        .unwrap_or(false)
}

fn parameter_ident(argument: &FnArg) -> Result<&Ident> {
    match argument {
        FnArg::Typed(PatType { pat, .. }) => match pat.as_ref() {
            Pat::Ident(pat) => Ok(&pat.ident),
            _ => Err(Error::new(
                pat.span(),
                "Only plain identifiers are supported as annotated parameters!",
            )),
        },
        FnArg::Receiver(receiver) => Err(Error::new(
            receiver.span(),
            "Cannot annotate functions taking self!",
        )),
    }
}

// Result<T, E> returns are unwrapped into T, with E converted into the resolution error
fn extract_result_type(output: &ReturnType) -> Option<&Type> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };

    let Type::Path(path) = ty.as_ref() else {
        return None;
    };

    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    match arguments.args.iter().collect_vec().as_slice() {
        [GenericArgument::Type(ty), GenericArgument::Type(_)] => Some(ty),
        _ => None,
    }
}

pub fn expand_annotate(attributes: &AnnotateAttributes, item: &ItemFn) -> Result<TokenStream> {
    if let Some(attribute) = item.attrs.iter().find(|attr| is_annotate_attribute(attr)) {
        return Err(Error::new(
            attribute.span(),
            format!("Function '{}' is already annotated!", item.sig.ident),
        ));
    }

    if !item.sig.generics.params.is_empty() {
        return Err(Error::new(
            item.sig.generics.span(),
            "Cannot annotate generic functions!",
        ));
    }

    if let Some(asyncness) = &item.sig.asyncness {
        return Err(Error::new(
            asyncness.span(),
            "Cannot annotate async functions!",
        ));
    }

    let ident = &item.sig.ident;
    let parameters = item
        .sig
        .inputs
        .iter()
        .map(parameter_ident)
        .collect::<Result<Vec<_>>>()?;

    if attributes.positional.len() > parameters.len() {
        let note = &attributes.positional[parameters.len()];
        return Err(Error::new(
            note.span(),
            format!("Function '{ident}' does not declare a parameter for this note!"),
        ));
    }

    for (keyword, _) in &attributes.keyword {
        let index = parameters.iter().position(|parameter| *parameter == keyword);
        match index {
            None => {
                return Err(Error::new(
                    keyword.span(),
                    format!("Function '{ident}' does not declare parameter '{keyword}'!"),
                ))
            }
            Some(index) if index < attributes.positional.len() => {
                return Err(Error::new(
                    keyword.span(),
                    format!("Parameter '{keyword}' already has a positional note!"),
                ))
            }
            _ => {}
        }
    }

    let mut positional_count = 0;
    let mut positional_names = Vec::new();
    let mut keyword_names = Vec::new();

    let kinds = parameters
        .iter()
        .enumerate()
        .map(|(index, parameter)| {
            let name = parameter.to_string();
            if index >= attributes.positional.len()
                && attributes.keyword.iter().any(|(keyword, _)| keyword == *parameter)
            {
                keyword_names.push(name.clone());
                Parameter::Keyword(name)
            } else if index >= attributes.positional.len() && name == NAME_KEYWORD {
                keyword_names.push(name);
                Parameter::Name
            } else {
                positional_names.push(name);
                positional_count += 1;
                Parameter::Positional(positional_count - 1)
            }
        })
        .collect_vec();

    let arguments = kinds.iter().map(|kind| match kind {
        Parameter::Positional(index) => quote! { arguments.positional_as(#index)? },
        Parameter::Keyword(keyword) => quote! { arguments.keyword_as(#keyword)? },
        Parameter::Name => quote! { arguments.name().map(::std::string::ToString::to_string) },
    });

    let (result_type, call) = match extract_result_type(&item.sig.output) {
        Some(ty) => (
            quote! { #ty },
            quote! { #ident(#(#arguments),*).map_err(::std::convert::Into::into) },
        ),
        None => {
            let ty = match &item.sig.output {
                ReturnType::Default => quote! { () },
                ReturnType::Type(_, ty) => quote! { #ty },
            };
            (ty, quote! { ::std::result::Result::Ok(#ident(#(#arguments),*)) })
        }
    };

    let positional_notes = &attributes.positional;
    let keyword_notes = attributes.keyword.iter().map(|(keyword, note)| {
        let keyword = keyword.to_string();
        quote! { .kwarg(#keyword, #note) }
    });

    let vis = &item.vis;
    let name = ident.to_string();
    let constructor = format_ident!("{}_injectable", ident);

    Ok(quote! {
        #item

        #[doc = concat!("Annotated [Injectable](::jeni::annotation::Injectable) for [", #name, "].")]
        #[allow(unused_variables)]
        #vis fn #constructor() -> ::jeni::annotation::Injectable<#result_type> {
            ::jeni::annotation::internal::annotated(
                #name,
                ::jeni::annotation::Signature::new()
                    #(.positional(#positional_names))*
                    #(.keyword(#keyword_names))*,
                ::jeni::annotation::Annotation::new()
                    #(.arg(#positional_notes))*
                    #(#keyword_notes)*,
                |arguments: ::jeni::annotation::Arguments| -> ::std::result::Result<#result_type, ::jeni::error::ResolveError> {
                    #call
                },
            )
        }
    })
}

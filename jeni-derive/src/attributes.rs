use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Ident, LitStr, Token};

pub enum NoteArgument {
    Positional(LitStr),
    Keyword(Ident, LitStr),
}

impl Parse for NoteArgument {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return input.parse().map(NoteArgument::Positional);
        }

        let keyword = input.parse()?;
        input.parse::<Token![=]>()?;
        Ok(NoteArgument::Keyword(keyword, input.parse()?))
    }
}

pub struct AnnotateAttributes {
    pub positional: Vec<LitStr>,
    pub keyword: Vec<(Ident, LitStr)>,
}

impl Parse for AnnotateAttributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut positional = Vec::new();
        let mut keyword: Vec<(Ident, LitStr)> = Vec::new();

        for argument in Punctuated::<NoteArgument, Token![,]>::parse_terminated(input)? {
            match argument {
                NoteArgument::Positional(note) => {
                    if !keyword.is_empty() {
                        return Err(Error::new(
                            note.span(),
                            "Positional notes must precede keyword notes!",
                        ));
                    }

                    positional.push(note);
                }
                NoteArgument::Keyword(name, note) => {
                    if keyword.iter().any(|(existing, _)| *existing == name) {
                        return Err(Error::new(
                            name.span(),
                            format!("Keyword '{name}' is annotated more than once!"),
                        ));
                    }

                    keyword.push((name, note));
                }
            }
        }

        Ok(Self {
            positional,
            keyword,
        })
    }
}

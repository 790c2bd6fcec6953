use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    parenthesized,
    parse_macro_input,
    DeriveInput,
    Generics,
    Ident,
    Meta,
    Path,
    Token,
};

pub fn derive(input: TokenStream) -> TokenStream {
    let DeriveSchema { ident, generics, components, bases } =
        parse_macro_input!(input);
    let (impl_generics, type_generics, where_clause) =
        generics.split_for_impl();

    let component_calls = components.iter().map(|path| {
        quote! { schema.component::<#path>(); }
    });
    let base_calls = bases.iter().map(|path| {
        quote! { schema.base::<#path>(); }
    });

    quote! {
        #[automatically_derived]
        impl #impl_generics ::stratum::Schema for #ident #type_generics
        #where_clause
        {
            fn define(schema: &mut ::stratum::SchemaDef) {
                #(#component_calls)*
                #(#base_calls)*
            }
        }
    }
    .into()
}

struct DeriveSchema {
    ident: Ident,
    generics: Generics,
    components: Vec<Path>,
    bases: Vec<Path>,
}

impl Parse for DeriveSchema {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let DeriveInput { ident, generics, attrs, .. } = input.parse()?;

        let mut components = Vec::new();
        let mut bases = Vec::new();

        for attr in attrs {
            if !attr.path().is_ident("schema") {
                continue;
            }

            let span = attr.meta.span();

            let Meta::List(list) = attr.meta else {
                return Err(syn::Error::new(
                    span,
                    "expected `#[schema(components(..), bases(..))]`",
                ));
            };

            list.parse_args_with(|input: ParseStream| {
                let parse_section =
                    |section: &mut Vec<Path>,
                     input: ParseStream,
                     span|
                     -> syn::Result<()> {
                        if !section.is_empty() {
                            return Err(syn::Error::new(
                                span,
                                "duplicate section",
                            ));
                        }

                        let content;

                        parenthesized!(content in input);

                        section.extend(
                            Punctuated::<Path, Token![,]>::parse_terminated(
                                &content,
                            )?,
                        );

                        Ok(())
                    };

                loop {
                    if input.is_empty() {
                        break;
                    }

                    let section: Ident = input.parse()?;
                    let span = section.span();

                    if section == "components" {
                        parse_section(&mut components, input, span)?;
                    } else if section == "bases" {
                        parse_section(&mut bases, input, span)?;
                    } else {
                        return Err(syn::Error::new(
                            span,
                            "expected `components` or `bases`",
                        ));
                    }

                    if input.is_empty() {
                        break;
                    }

                    input.parse::<Token![,]>()?;
                }

                Ok(())
            })?;
        }

        Ok(Self { ident, generics, components, bases })
    }
}

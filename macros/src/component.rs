use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, DeriveInput, Generics, Ident};

pub fn derive(input: TokenStream) -> TokenStream {
    let DeriveComponent { ident, generics } = parse_macro_input!(input);
    let (impl_generics, type_generics, where_clause) =
        generics.split_for_impl();

    quote! {
        #[automatically_derived]
        impl #impl_generics ::stratum::Component for #ident #type_generics
        #where_clause
        {
        }
    }
    .into()
}

struct DeriveComponent {
    ident: Ident,
    generics: Generics,
}

impl Parse for DeriveComponent {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let DeriveInput { ident, generics, .. } = input.parse()?;

        Ok(Self { ident, generics })
    }
}

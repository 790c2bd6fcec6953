use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{
    parse_macro_input,
    Data,
    DataStruct,
    DeriveInput,
    Field,
    Fields,
    Generics,
    Ident,
    Index,
};

pub fn derive(input: TokenStream) -> TokenStream {
    let DeriveBundle { ident, generics, fields } = parse_macro_input!(input);
    let (impl_generics, type_generics, where_clause) =
        generics.split_for_impl();

    let component_calls = fields.iter().map(|Field { ty, .. }| {
        quote! { <#ty as ::stratum::Bundle>::components(out); }
    });
    let write_calls =
        fields.iter().enumerate().map(|(i, Field { ident, .. })| {
            let member = if let Some(ident) = ident {
                quote! { #ident }
            } else {
                let index = Index { index: i as u32, span: Span::call_site() };

                quote! { #index }
            };

            quote! { ::stratum::Bundle::write(self.#member, writer); }
        });

    quote! {
        #[automatically_derived]
        impl #impl_generics ::stratum::Bundle for #ident #type_generics
        #where_clause
        {
            fn components(out: &mut ::std::vec::Vec<::stratum::ComponentInfo>) {
                #(#component_calls)*
            }

            fn write(self, writer: &mut ::stratum::BundleWriter<'_>) {
                #(#write_calls)*
            }
        }
    }
    .into()
}

struct DeriveBundle {
    ident: Ident,
    generics: Generics,
    fields: Fields,
}

impl Parse for DeriveBundle {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let DeriveInput { ident, generics, data, .. } = input.parse()?;
        let Data::Struct(DataStruct { fields, .. }) = data else {
            return Err(input.error("`Bundle` can only be derived for structs"));
        };

        Ok(Self { ident, generics, fields })
    }
}

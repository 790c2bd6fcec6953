//! Derive macros for `stratum`.
//!
//! See the documentation of the main crate for usage.

use proc_macro::TokenStream;

mod bundle;
mod component;
mod schema;

/// Derives `Component` for a type.
///
/// The derive places no requirements on the input: any `Send + Sync +
/// 'static` type can be a component. Zero-sized types become tag components.
#[proc_macro_derive(Component)]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::derive(input)
}

/// Derives `Bundle` for a struct whose fields are all bundles themselves
/// (components or nested bundles).
#[proc_macro_derive(Bundle)]
pub fn derive_bundle(input: TokenStream) -> TokenStream {
    bundle::derive(input)
}

/// Derives `Schema` for a manager marker type.
///
/// Local components and direct bases are declared with the `#[schema(...)]`
/// attribute, in order:
///
/// ```ignore
/// #[derive(Schema)]
/// #[schema(components(Position, Velocity))]
/// struct Physics;
///
/// #[derive(Schema)]
/// #[schema(components(Dead), bases(Physics))]
/// struct Gameplay;
/// ```
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    schema::derive(input)
}

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod db_enum;
mod pojo;

/// Derives `rowmap::Pojo` for a struct with named fields.
///
/// Struct level: `#[rowmap(table = "...", schema = "...", column_order("a", "b"))]`
/// and `#[rowmap(accessor(name = "...", get = path, set = path, ...))]`.
///
/// Field level: `id`, `generated`, `transient`, `immutable`, `decimal`,
/// `ordinal`, `string`, `column = "..."` or `column(name = "...", length = 64, ...)`,
/// `serializer = Type` and `converter = Type`.
#[proc_macro_derive(Pojo, attributes(rowmap))]
pub fn derive_pojo(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match pojo::impl_pojo(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Derives `rowmap::DbEnum` and the value conversions for a fieldless enum.
///
/// The enum must also derive `Clone` and `Copy`.
#[proc_macro_derive(DbEnum)]
pub fn derive_db_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match db_enum::impl_db_enum(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

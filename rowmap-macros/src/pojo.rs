use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::{AccessorAttrs, StructAttrs, parse_member_attrs, parse_struct_attrs};

pub fn impl_pojo(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Pojo derive only supports structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Pojo derive requires named fields",
        ));
    };

    let struct_attrs = parse_struct_attrs(&input.attrs)?;
    let type_name = struct_name.to_string();

    let mut fields = Vec::new();
    for field in &named.named {
        let Some(ident) = &field.ident else { continue };
        let member = parse_member_attrs(&field.attrs)?;
        // never persisted, and the type may not be mappable at all
        if member.transient || member.immutable {
            continue;
        }
        let name = ident.to_string();
        let constructor = if member.serializer.is_some() {
            quote!(serialized)
        } else {
            quote!(new)
        };
        let data_type = member
            .decimal
            .then(|| quote!(.data_type(::rowmap::DataType::Decimal)));
        let annotations = member.annotations();
        fields.push(quote! {
            .field(
                ::rowmap::FieldDef::<Self>::#constructor(
                    #name,
                    |row: &Self| &row.#ident,
                    |row: &mut Self| &mut row.#ident,
                )
                #data_type
                .annotated(#annotations)
            )
        });
    }

    let accessors = struct_attrs.accessors.iter().map(accessor_tokens);
    let table = table_tokens(&struct_attrs, &type_name);
    let column_order = struct_attrs.column_order.as_ref().map(|names| {
        quote!(.column_order([ #( #names ),* ]))
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::rowmap::Pojo for #struct_name #ty_generics #where_clause {
            fn schema() -> ::rowmap::PojoSchema<Self> {
                ::rowmap::PojoSchema::new(#type_name)
                    #table
                    #column_order
                    #( #fields )*
                    #( #accessors )*
            }
        }
    })
}

fn table_tokens(attrs: &StructAttrs, type_name: &str) -> Option<TokenStream> {
    match (&attrs.schema, &attrs.table) {
        (Some(schema), Some(table)) => Some(quote!(.table_in_schema(#schema, #table))),
        (None, Some(table)) => Some(quote!(.table(#table))),
        (Some(schema), None) => Some(quote!(.table_in_schema(#schema, #type_name))),
        (None, None) => None,
    }
}

fn accessor_tokens(accessor: &AccessorAttrs) -> TokenStream {
    let name = &accessor.name;
    let get = &accessor.get;
    let annotations = accessor.member.annotations();
    let def = match &accessor.set {
        Some(set) => quote! {
            ::rowmap::AccessorDef::<Self>::new(
                #name,
                |row: &Self| #get(row),
                |row: &mut Self, value| #set(row, value),
            )
        },
        None => quote! {
            ::rowmap::AccessorDef::<Self>::getter(#name, |row: &Self| #get(row))
        },
    };
    quote! {
        .accessor(#def.annotated(#annotations))
    }
}

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

pub fn impl_db_enum(input: &DeriveInput) -> syn::Result<TokenStream> {
    let enum_name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            enum_name,
            "DbEnum derive only supports enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "DbEnum derive does not support generic enums",
        ));
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            enum_name,
            "DbEnum derive requires at least one variant",
        ));
    }

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "DbEnum variants cannot carry data",
            ));
        }
        variants.push(&variant.ident);
    }
    let names: Vec<String> = variants.iter().map(|ident| ident.to_string()).collect();
    let ordinals: Vec<usize> = (0..variants.len()).collect();
    let type_name = enum_name.to_string();

    Ok(quote! {
        impl ::rowmap::DbEnum for #enum_name {
            const CONSTANTS: &'static [&'static str] = &[ #( #names ),* ];

            fn ordinal(&self) -> usize {
                match self {
                    #( Self::#variants => #ordinals, )*
                }
            }

            fn from_ordinal(ordinal: usize) -> ::std::option::Option<Self> {
                match ordinal {
                    #( #ordinals => ::std::option::Option::Some(Self::#variants), )*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::rowmap::SqlType for #enum_name {
            const DATA_TYPE: ::rowmap::DataType = ::rowmap::DataType::Enum;
            const ENUM_CONSTANTS: ::std::option::Option<&'static [&'static str]> =
                ::std::option::Option::Some(<Self as ::rowmap::DbEnum>::CONSTANTS);
        }

        impl ::rowmap::ToValue for #enum_name {
            fn to_value(&self) -> ::rowmap::Value {
                let ordinal = <Self as ::rowmap::DbEnum>::ordinal(self);
                ::rowmap::Value::Enum(::rowmap::EnumConst {
                    ordinal,
                    name: <Self as ::rowmap::DbEnum>::CONSTANTS[ordinal],
                })
            }
        }

        impl ::rowmap::FromValue for #enum_name {
            fn from_value(value: ::rowmap::Value) -> ::rowmap::RowmapResult<Self> {
                match value {
                    ::rowmap::Value::Enum(constant) => {
                        <Self as ::rowmap::DbEnum>::from_ordinal(constant.ordinal).ok_or_else(|| {
                            ::rowmap::RowmapError::mapping(::std::format!(
                                "ordinal {} is out of range for {}",
                                constant.ordinal,
                                #type_name,
                            ))
                        })
                    }
                    ::rowmap::Value::Text(text) => match text.as_str() {
                        #( #names => ::std::result::Result::Ok(Self::#variants), )*
                        _ => ::std::result::Result::Err(::rowmap::RowmapError::mapping(::std::format!(
                            "no constant named '{}' in {}",
                            text,
                            #type_name,
                        ))),
                    },
                    other => ::std::result::Result::Err(::rowmap::type_mismatch(#type_name, &other)),
                }
            }
        }
    })
}

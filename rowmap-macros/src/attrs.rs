use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, LitBool, LitInt, LitStr, Path, Token};

/// `#[rowmap(...)]` on the struct.
#[derive(Default)]
pub struct StructAttrs {
    pub table: Option<LitStr>,
    pub schema: Option<LitStr>,
    pub column_order: Option<Vec<LitStr>>,
    pub accessors: Vec<AccessorAttrs>,
}

/// `accessor(name = "...", get = path, ...)` inside the struct attribute.
pub struct AccessorAttrs {
    pub name: LitStr,
    pub get: Path,
    pub set: Option<Path>,
    pub member: MemberAttrs,
}

/// Annotations shared by fields and accessors.
#[derive(Default)]
pub struct MemberAttrs {
    pub id: bool,
    pub generated: bool,
    pub transient: bool,
    pub immutable: bool,
    pub decimal: bool,
    pub ordinal: bool,
    pub string: bool,
    pub column: Option<ColumnAttrs>,
    pub serializer: Option<Path>,
    pub converter: Option<Path>,
}

#[derive(Default)]
pub struct ColumnAttrs {
    pub name: Option<LitStr>,
    pub length: Option<LitInt>,
    pub precision: Option<LitInt>,
    pub scale: Option<LitInt>,
    pub nullable: Option<LitBool>,
    pub unique: bool,
    pub definition: Option<LitStr>,
}

pub fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut parsed = StructAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("rowmap")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                parsed.table = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("schema") {
                parsed.schema = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("column_order") {
                let content;
                syn::parenthesized!(content in meta.input);
                let names = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                parsed.column_order = Some(names.into_iter().collect());
            } else if meta.path.is_ident("accessor") {
                parsed.accessors.push(parse_accessor(&meta)?);
            } else {
                return Err(meta.error("unsupported rowmap struct attribute"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_accessor(meta: &ParseNestedMeta<'_>) -> syn::Result<AccessorAttrs> {
    let mut name = None;
    let mut get = None;
    let mut set = None;
    let mut member = MemberAttrs::default();
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            name = Some(inner.value()?.parse::<LitStr>()?);
        } else if inner.path.is_ident("get") {
            get = Some(inner.value()?.parse::<Path>()?);
        } else if inner.path.is_ident("set") {
            set = Some(inner.value()?.parse::<Path>()?);
        } else {
            parse_member_flag(&inner, &mut member)?;
        }
        Ok(())
    })?;
    let name = name.ok_or_else(|| meta.error("accessor requires `name = \"...\"`"))?;
    let get = get.ok_or_else(|| meta.error("accessor requires `get = path`"))?;
    Ok(AccessorAttrs {
        name,
        get,
        set,
        member,
    })
}

pub fn parse_member_attrs(attrs: &[Attribute]) -> syn::Result<MemberAttrs> {
    let mut member = MemberAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("rowmap")) {
        attr.parse_nested_meta(|meta| parse_member_flag(&meta, &mut member))?;
    }
    if member.ordinal && member.string {
        return Err(syn::Error::new_spanned(
            attrs.iter().find(|attr| attr.path().is_ident("rowmap")),
            "`ordinal` and `string` are mutually exclusive",
        ));
    }
    Ok(member)
}

fn parse_member_flag(meta: &ParseNestedMeta<'_>, member: &mut MemberAttrs) -> syn::Result<()> {
    let path = &meta.path;
    if path.is_ident("id") {
        member.id = true;
    } else if path.is_ident("generated") {
        member.generated = true;
    } else if path.is_ident("transient") {
        member.transient = true;
    } else if path.is_ident("immutable") {
        member.immutable = true;
    } else if path.is_ident("decimal") {
        member.decimal = true;
    } else if path.is_ident("ordinal") {
        member.ordinal = true;
    } else if path.is_ident("string") {
        member.string = true;
    } else if path.is_ident("serializer") {
        member.serializer = Some(meta.value()?.parse()?);
    } else if path.is_ident("converter") {
        member.converter = Some(meta.value()?.parse()?);
    } else if path.is_ident("column") {
        member.column = Some(parse_column(meta)?);
    } else {
        return Err(meta.error("unsupported rowmap attribute"));
    }
    Ok(())
}

fn parse_column(meta: &ParseNestedMeta<'_>) -> syn::Result<ColumnAttrs> {
    let mut column = ColumnAttrs::default();
    if meta.input.peek(Token![=]) {
        column.name = Some(meta.value()?.parse()?);
        return Ok(column);
    }
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            column.name = Some(inner.value()?.parse()?);
        } else if inner.path.is_ident("length") {
            column.length = Some(inner.value()?.parse()?);
        } else if inner.path.is_ident("precision") {
            column.precision = Some(inner.value()?.parse()?);
        } else if inner.path.is_ident("scale") {
            column.scale = Some(inner.value()?.parse()?);
        } else if inner.path.is_ident("nullable") {
            column.nullable = Some(inner.value()?.parse()?);
        } else if inner.path.is_ident("unique") {
            column.unique = true;
        } else if inner.path.is_ident("definition") {
            column.definition = Some(inner.value()?.parse()?);
        } else {
            return Err(inner.error("unsupported column attribute"));
        }
        Ok(())
    })?;
    Ok(column)
}

impl ColumnAttrs {
    fn to_tokens(&self) -> TokenStream {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(quote!(name: ::std::option::Option::Some(::std::string::String::from(#name))));
        }
        if let Some(length) = &self.length {
            fields.push(quote!(length: #length));
        }
        if let Some(precision) = &self.precision {
            fields.push(quote!(precision: #precision));
        }
        if let Some(scale) = &self.scale {
            fields.push(quote!(scale: #scale));
        }
        if let Some(nullable) = &self.nullable {
            fields.push(quote!(nullable: #nullable));
        }
        if self.unique {
            fields.push(quote!(unique: true));
        }
        if let Some(definition) = &self.definition {
            fields.push(quote!(
                definition: ::std::option::Option::Some(::std::string::String::from(#definition))
            ));
        }
        quote! {
            ::rowmap::Column {
                #( #fields, )*
                ..::rowmap::Column::default()
            }
        }
    }
}

impl MemberAttrs {
    /// The `Annotations` literal for this member.
    pub fn annotations(&self) -> TokenStream {
        let column = match &self.column {
            Some(column) => {
                let column = column.to_tokens();
                quote!(::std::option::Option::Some(#column))
            }
            None => quote!(::std::option::Option::None),
        };
        let id = self.id;
        let generated = self.generated;
        let transient = self.transient;
        let enumerated = if self.ordinal {
            quote!(::std::option::Option::Some(::rowmap::EnumType::Ordinal))
        } else if self.string {
            quote!(::std::option::Option::Some(::rowmap::EnumType::String))
        } else {
            quote!(::std::option::Option::None)
        };
        let serializer = match &self.serializer {
            Some(path) => quote!(::std::option::Option::Some(::rowmap::SerializerFactory::of::<#path>())),
            None => quote!(::std::option::Option::None),
        };
        let converter = match &self.converter {
            Some(path) => quote!(::std::option::Option::Some(::rowmap::ConverterFactory::of::<#path>())),
            None => quote!(::std::option::Option::None),
        };
        quote! {
            ::rowmap::Annotations {
                column: #column,
                id: #id,
                generated: #generated,
                enumerated: #enumerated,
                transient: #transient,
                serializer: #serializer,
                converter: #converter,
            }
        }
    }
}

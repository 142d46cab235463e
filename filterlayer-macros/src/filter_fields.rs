use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, LitStr, Path, Result, Token,
    meta::ParseNestedMeta,
    spanned::Spanned,
};

use crate::case;

/// Container-level options.
struct ContainerAttrs {
    krate: Path,
    rename_all: Option<String>,
}

impl ContainerAttrs {
    fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut krate = None;
        let mut rename_all = None;

        for attr in attrs {
            if attr.path().is_ident("filter") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("crate") {
                        let value: LitStr = meta.value()?.parse()?;
                        krate = Some(value.parse::<Path>()?);
                        Ok(())
                    } else {
                        Err(meta.error("unsupported filter container attribute"))
                    }
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename_all") {
                        let value: LitStr = meta.value()?.parse()?;
                        let rule = value.value();
                        if case::rename_all(&rule, "field").is_none() {
                            return Err(meta.error(format!("unsupported rename_all rule {rule:?}")));
                        }
                        rename_all = Some(rule);
                        Ok(())
                    } else {
                        skip_meta(&meta)
                    }
                })?;
            }
        }

        Ok(Self {
            krate: krate.unwrap_or_else(|| syn::parse_quote!(::filterlayer)),
            rename_all,
        })
    }
}

/// Per-field options.
#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    key: Option<String>,
    skip: bool,
}

impl FieldAttrs {
    fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut parsed = FieldAttrs::default();

        for attr in attrs {
            if attr.path().is_ident("filter") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.name = Some(value.value());
                        Ok(())
                    } else if meta.path.is_ident("skip") {
                        parsed.skip = true;
                        Ok(())
                    } else {
                        Err(meta.error("unsupported filter field attribute"))
                    }
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.key = Some(value.value());
                        Ok(())
                    } else if meta.path.is_ident("skip") {
                        parsed.skip = true;
                        Ok(())
                    } else {
                        skip_meta(&meta)
                    }
                })?;
            }
        }

        Ok(parsed)
    }
}

/// Consumes a serde option this derive doesn't use, whatever its shape.
fn skip_meta(meta: &ParseNestedMeta<'_>) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }

    Ok(())
}

pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "FilterFields can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(data.fields.span(), "FilterFields requires named fields"));
    };

    let container = ContainerAttrs::from_attrs(&input.attrs)?;
    let krate = &container.krate;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut constants = Vec::new();

    for field in &fields.named {
        let attrs = FieldAttrs::from_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let Some(field_ident) = &field.ident else {
            continue;
        };
        let raw = field_ident.to_string();
        let raw = raw.trim_start_matches("r#");

        let name = attrs
            .name
            .unwrap_or_else(|| case::pascal_case(raw));
        let key = match (attrs.key, &container.rename_all) {
            (Some(key), _) => key,
            (None, Some(rule)) => case::rename_all(rule, raw).unwrap_or_else(|| raw.to_string()),
            (None, None) => raw.to_string(),
        };
        let constant = format_ident!("{}", case::screaming_snake_case(raw));
        let ty = &field.ty;
        let doc = format!("Filter descriptor for `{raw}`: filter name `{name}`, document key `{key}`.");

        constants.push(quote! {
            #[doc = #doc]
            pub const #constant: #krate::filter::Field<Self, #ty> = #krate::filter::Field::new(#name, #key);
        });
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#constants)*
        }
    })
}

//! colprefix Procedural Macros
//!
//! This crate provides `#[derive(Model)]`, which publishes the shape of a
//! struct so colprefix can build column lists from it.
//!
//! # Usage
//!
//! ```ignore
//! #[derive(Model)]
//! struct User {
//!     #[db("id")]
//!     id: i64,
//!     #[db("addr")]        // nested model: tag is its alias
//!     address: Address,
//!     #[db("-")]           // skipped
//!     password_hash: String,
//!     session: Session,    // no tag: skipped
//! }
//! ```
//!
//! Skipped fields place no requirement on their type. Tagged fields need a
//! type implementing `colprefix::Reflect`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Expr, ExprLit, Fields, Lit, LitStr, Meta};

/// Tag value that excludes a field.
const EXCLUDE_TAG: &str = "-";

/// Derive `colprefix::Reflect` for a struct with named fields.
///
/// Generic, tuple and unit structs, enums and unions are rejected.
#[proc_macro_derive(Model, attributes(db))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Model can only be derived for structs",
            ));
        }
    };

    let ident = &input.ident;
    let name = ident.unraw().to_string();
    let entries = fields
        .iter()
        .map(field_entry)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        #[automatically_derived]
        impl ::colprefix::Reflect for #ident {
            fn type_info() -> ::colprefix::TypeInfo {
                const FIELDS: &[::colprefix::FieldInfo] = &[#(#entries),*];
                ::colprefix::TypeInfo::record(
                    #name,
                    ::core::concat!(::core::module_path!(), "::", #name),
                    FIELDS,
                )
            }
        }
    })
}

/// Emit the `FieldInfo` for one field.
fn field_entry(field: &syn::Field) -> syn::Result<TokenStream2> {
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };
    let name = ident.unraw().to_string();
    let ty = &field.ty;

    let entry = match db_tag(field)? {
        Some(tag) if !tag.is_empty() && tag != EXCLUDE_TAG => quote! {
            ::colprefix::FieldInfo::new(
                #name,
                ::core::option::Option::Some(#tag),
                ::colprefix::TypeRef::Lazy(<#ty as ::colprefix::Reflect>::type_info),
            )
        },
        Some(tag) => quote! {
            ::colprefix::FieldInfo::new(
                #name,
                ::core::option::Option::Some(#tag),
                ::colprefix::TypeRef::Opaque,
            )
        },
        None => quote! {
            ::colprefix::FieldInfo::new(#name, ::core::option::Option::None, ::colprefix::TypeRef::Opaque)
        },
    };

    Ok(entry)
}

/// Read `#[db("column")]` or `#[db = "column"]`.
fn db_tag(field: &syn::Field) -> syn::Result<Option<String>> {
    let mut tag: Option<LitStr> = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("db")) {
        if tag.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[db] attribute"));
        }

        let lit = match &attr.meta {
            Meta::List(_) => attr.parse_args::<LitStr>()?,
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.clone(),
                other => {
                    return Err(syn::Error::new_spanned(other, "expected a string literal column name"));
                }
            },
            Meta::Path(_) => {
                return Err(syn::Error::new_spanned(attr, "expected #[db(\"column\")]"));
            }
        };
        tag = Some(lit);
    }

    Ok(tag.map(|lit| lit.value()))
}

//! Procedural macros for the docmodel project.
//!
//! Provides `#[derive(Model)]`, which implements `docmodel::model::Model` from a
//! `#[model(...)]` attribute:
//!
//! ```ignore
//! #[derive(Model)]
//! #[model(collection = "test-collection", fillables = ["id", "firstname", "lastname"])]
//! pub struct TestModel;
//! ```
//!
//! Recognized keys:
//!
//! - `collection = "..."`: collection name. Defaults to the snake_case struct name plus `s`.
//! - `fillables = ["a", "b"]`: field names positional values bind to. Defaults to the struct's
//!   named fields, in declaration order.
//! - `timestamps = false`: skip `created_at`/`updated_at` on save.
//! - `soft_delete`: add a `deleted_at` field on save.

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Expr, ExprArray, ExprLit, Fields, Lit, LitBool, LitStr,
};

struct ModelArgs {
    collection: Option<String>,
    fillables: Option<Vec<String>>,
    timestamps: bool,
    soft_delete: bool,
}

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_model(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_model(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let args = parse_args(input)?;

    let collection = args
        .collection
        .unwrap_or_else(|| format!("{}s", to_snake_case(&name.to_string())));
    let fillables = match args.fillables {
        Some(fillables) => fillables,
        None => named_fields(input),
    };
    let timestamps = args.timestamps;
    let soft_delete = args.soft_delete;

    Ok(quote! {
        impl #impl_generics ::docmodel::model::Model for #name #ty_generics #where_clause {
            fn collection_name() -> &'static str {
                #collection
            }

            fn fillables() -> &'static [&'static str] {
                &[#(#fillables),*]
            }

            fn timestamps() -> bool {
                #timestamps
            }

            fn soft_delete() -> bool {
                #soft_delete
            }
        }
    })
}

fn parse_args(input: &DeriveInput) -> syn::Result<ModelArgs> {
    let mut args = ModelArgs {
        collection: None,
        fillables: None,
        timestamps: true,
        soft_delete: false,
    };

    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                args.collection = Some(value.value());
            } else if meta.path.is_ident("fillables") {
                let value: ExprArray = meta.value()?.parse()?;
                args.fillables = Some(
                    value
                        .elems
                        .iter()
                        .map(string_literal)
                        .collect::<syn::Result<Vec<_>>>()?,
                );
            } else if meta.path.is_ident("timestamps") {
                let value: LitBool = meta.value()?.parse()?;
                args.timestamps = value.value;
            } else if meta.path.is_ident("soft_delete") {
                args.soft_delete = match meta.value() {
                    Ok(value) => value.parse::<LitBool>()?.value,
                    Err(_) => true,
                };
            } else {
                return Err(meta.error("unsupported model attribute"));
            }

            Ok(())
        })?;
    }

    Ok(args)
}

fn string_literal(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => Ok(value.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn named_fields(input: &DeriveInput) -> Vec<String> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

//! Derive macro for `wprpc::Record`.
//!
//! Generates, for a struct with named fields:
//!
//! - the static `FIELDS` table (declared name plus optional wire tag),
//! - positional `bind_field` / `encode_field` dispatch,
//! - `Bind` and `Encode` impls so the record nests inside other records,
//!   vectors and options.
//!
//! ```ignore
//! #[derive(Record, Default)]
//! struct User {
//!     #[xmlrpc(name = "user_id")]
//!     id: String,
//!     username: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse_macro_input;
use syn::parse_quote;
use syn::Data;
use syn::DeriveInput;
use syn::Fields;
use syn::LitStr;

#[proc_macro_derive(Record, attributes(xmlrpc))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Reads `#[xmlrpc(name = "...")]` off a field, if present.
fn wire_tag(field: &syn::Field) -> syn::Result<Option<String>> {
    let mut tag = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("xmlrpc") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                tag = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported xmlrpc attribute; expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(tag)
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(name, "Record can only be derived for structs"));
        }
    };

    let mut table = Vec::with_capacity(fields.len());
    let mut bind_arms = Vec::with_capacity(fields.len());
    let mut encode_arms = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = &field.ident else {
            return Err(syn::Error::new_spanned(field, "unnamed field"));
        };
        let declared = ident.unraw().to_string();
        let tag = match wire_tag(field)? {
            Some(tag) => quote! { ::core::option::Option::Some(#tag) },
            None => quote! { ::core::option::Option::None },
        };

        table.push(quote! {
            ::wprpc::Field { name: #declared, tag: #tag }
        });
        bind_arms.push(quote! {
            #index => ::wprpc::Bind::bind(&mut self.#ident, value),
        });
        encode_arms.push(quote! {
            #index => ::wprpc::Encode::encode(&self.#ident, w),
        });
    }

    let count = fields.len();

    // Type parameters bind into fresh defaults and encode as values.
    let mut generics = input.generics.clone();
    let params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    let predicates = &mut generics.make_where_clause().predicates;
    for param in params {
        predicates.push(parse_quote! {
            #param: ::wprpc::Bind + ::wprpc::Encode + ::core::default::Default
        });
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::wprpc::Record for #name #ty_generics #where_clause {
            const FIELDS: &'static [::wprpc::Field] = &[ #(#table),* ];

            fn bind_field(&mut self, index: usize, value: &::wprpc::Value) -> ::wprpc::Result<()> {
                match index {
                    #(#bind_arms)*
                    _ => ::core::result::Result::Err(::wprpc::Error::ArityMismatch {
                        expected: #count,
                        actual: index + 1,
                    }),
                }
            }

            fn encode_field(&self, index: usize, w: &mut ::wprpc::Writer) -> ::wprpc::Result<()> {
                match index {
                    #(#encode_arms)*
                    _ => ::core::result::Result::Err(::wprpc::Error::ArityMismatch {
                        expected: #count,
                        actual: index + 1,
                    }),
                }
            }
        }

        impl #impl_generics ::wprpc::Bind for #name #ty_generics #where_clause {
            fn bind(&mut self, value: &::wprpc::Value) -> ::wprpc::Result<()> {
                ::wprpc::bind::bind_struct(self, value)
            }
        }

        impl #impl_generics ::wprpc::Encode for #name #ty_generics #where_clause {
            fn encode(&self, w: &mut ::wprpc::Writer) -> ::wprpc::Result<()> {
                ::wprpc::encode::encode_struct(self, w)
            }
        }
    })
}

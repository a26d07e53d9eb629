//! Derive macros for `cbor-compat`.
//!
//! Structs with named fields become records: an array of field values in declaration order, or a
//! map keyed by field name when the encoder is configured for keyed records. `#[cbor(keyed)]` or
//! `#[cbor(positional)]` on the struct pins the layout regardless of configuration.
//!
//! Field attributes: `#[cbor(rename = "...")]`, `#[cbor(skip)]`, `#[cbor(default)]`. `Option`
//! fields default to `None` when absent. A single-field tuple struct encodes as its field; other
//! tuple structs encode as arrays; unit structs as `null`.

extern crate proc_macro;

mod attrs;
mod decode;
mod encode;
mod record;
mod shape;
mod types;
mod util;

use proc_macro::TokenStream;
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput};

use crate::attrs::parse_cbor_struct_attrs;

fn unsupported(input: &DeriveInput, derive: &str) -> syn::Error {
    let span = match &input.data {
        Data::Enum(e) => e.enum_token.span(),
        Data::Union(u) => u.union_token.span(),
        Data::Struct(s) => s.struct_token.span(),
    };
    syn::Error::new(span, format!("{derive} can only be derived for structs"))
}

#[proc_macro_derive(CborEncode, attributes(cbor))]
pub fn derive_cbor_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => parse_cbor_struct_attrs(&input.attrs)
            .and_then(|layout| encode::encode_struct(&input.ident, &input.generics, data, layout)),
        _ => Err(unsupported(&input, "CborEncode")),
    };
    TokenStream::from(out.unwrap_or_else(syn::Error::into_compile_error))
}

#[proc_macro_derive(CborDecode, attributes(cbor))]
pub fn derive_cbor_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => parse_cbor_struct_attrs(&input.attrs)
            .and_then(|_| decode::decode_struct(&input.ident, &input.generics, data)),
        _ => Err(unsupported(&input, "CborDecode")),
    };
    TokenStream::from(out.unwrap_or_else(syn::Error::into_compile_error))
}

#[proc_macro_derive(CborShape, attributes(cbor))]
pub fn derive_cbor_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => parse_cbor_struct_attrs(&input.attrs)
            .and_then(|layout| shape::shape_struct(&input.ident, &input.generics, data, layout)),
        _ => Err(unsupported(&input, "CborShape")),
    };
    TokenStream::from(out.unwrap_or_else(syn::Error::into_compile_error))
}

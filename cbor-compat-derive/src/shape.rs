use quote::quote;
use syn::{spanned::Spanned, DataStruct, Fields, Generics, Ident, LitStr};

use crate::attrs::Layout;
use crate::record::record_fields;
use crate::types::type_mentions_self;
use crate::util::{add_where_bound, empty_where_clause};

pub(crate) fn shape_struct(
    name: &Ident,
    generics: &Generics,
    data: &DataStruct,
    layout: Option<Layout>,
) -> syn::Result<proc_macro2::TokenStream> {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let mut shape_where_clause = where_clause.cloned();
    let wc = shape_where_clause.get_or_insert_with(empty_where_clause);

    let body = match &data.fields {
        Fields::Named(fields) => {
            let record_name = LitStr::new(&name.to_string(), name.span());
            let mut pushes = Vec::new();
            for field in record_fields(fields)? {
                if field.skip {
                    continue;
                }
                let (ty, key) = (field.ty, &field.key);
                if !type_mentions_self(ty, name) {
                    add_where_bound(wc, ty, quote!(::cbor_compat::CborShape));
                }
                pushes.push(quote! {
                    .field(#key, <#ty as ::cbor_compat::CborShape>::shape())
                });
            }
            let pin = layout.map(|l| {
                let l = l.to_tokens();
                quote!(.layout(#l))
            });
            quote! {
                ::cbor_compat::Shape::Record(
                    ::cbor_compat::RecordDescriptor::new(#record_name) #(#pushes)* #pin
                )
            }
        }
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let ty = &fields.unnamed[0].ty;
            if !type_mentions_self(ty, name) {
                add_where_bound(wc, ty, quote!(::cbor_compat::CborShape));
            }
            quote!(<#ty as ::cbor_compat::CborShape>::shape())
        }
        Fields::Unnamed(fields) => {
            return Err(syn::Error::new(
                fields.span(),
                "CborShape needs named fields or a single-field tuple struct",
            ));
        }
        Fields::Unit => quote!(::cbor_compat::Shape::Null),
    };

    Ok(quote! {
        impl #impl_generics ::cbor_compat::CborShape for #name #ty_generics #shape_where_clause {
            fn shape() -> ::cbor_compat::Shape {
                #body
            }
        }
    })
}

use quote::quote;
use syn::{DataStruct, Fields, Generics, Ident};

use crate::attrs::{ensure_no_cbor_attrs, Layout};
use crate::record::record_fields;
use crate::types::type_mentions_self;
use crate::util::{add_where_bound, empty_where_clause};

pub(crate) fn encode_struct(
    name: &Ident,
    generics: &Generics,
    data: &DataStruct,
    layout: Option<Layout>,
) -> syn::Result<proc_macro2::TokenStream> {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let mut encode_where_clause = where_clause.cloned();
    let wc = encode_where_clause.get_or_insert_with(empty_where_clause);

    let body = match &data.fields {
        Fields::Named(fields) => {
            let mut writes = Vec::new();
            for field in record_fields(fields)? {
                if field.skip {
                    continue;
                }
                let (ident, key) = (field.ident, &field.key);
                if !type_mentions_self(field.ty, name) {
                    add_where_bound(wc, field.ty, quote!(::cbor_compat::CborEncode));
                }
                writes.push(quote! { r.field(#key, &self.#ident)?; });
            }
            let len = writes.len();
            match layout {
                Some(layout) => {
                    let layout = layout.to_tokens();
                    quote!(enc.record_as(#layout, #len, |r| { #(#writes)* Ok(()) }))
                }
                None => quote!(enc.record(#len, |r| { #(#writes)* Ok(()) })),
            }
        }

        // A single-field tuple struct is transparent.
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let field = &fields.unnamed[0];
            ensure_no_cbor_attrs(&field.attrs, "tuple struct fields")?;
            if !type_mentions_self(&field.ty, name) {
                add_where_bound(wc, &field.ty, quote!(::cbor_compat::CborEncode));
            }
            quote!(::cbor_compat::CborEncode::encode(&self.0, enc))
        }

        Fields::Unnamed(fields) => {
            let mut items = Vec::new();
            for (idx, field) in fields.unnamed.iter().enumerate() {
                ensure_no_cbor_attrs(&field.attrs, "tuple struct fields")?;
                let index = syn::Index::from(idx);
                if !type_mentions_self(&field.ty, name) {
                    add_where_bound(wc, &field.ty, quote!(::cbor_compat::CborEncode));
                }
                items.push(quote! { a.value(&self.#index)?; });
            }
            let len = items.len();
            quote!(enc.array(#len, |a| { #(#items)* Ok(()) }))
        }

        Fields::Unit => quote!(enc.null()),
    };

    Ok(quote! {
        impl #impl_generics ::cbor_compat::CborEncode for #name #ty_generics #encode_where_clause {
            fn encode(&self, enc: &mut ::cbor_compat::Encoder) -> ::core::result::Result<(), ::cbor_compat::CborError> {
                #body
            }
        }

        impl #impl_generics ::cbor_compat::CborArrayElem for #name #ty_generics #encode_where_clause {}
    })
}

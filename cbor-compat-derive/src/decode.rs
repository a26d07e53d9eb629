use quote::{format_ident, quote};
use syn::{DataStruct, Fields, GenericParam, Generics, Ident, Lifetime, LifetimeParam};

use crate::attrs::ensure_no_cbor_attrs;
use crate::record::record_fields;
use crate::types::type_mentions_self;
use crate::util::{add_where_bound, empty_where_clause};

/// Add a fresh decode lifetime that outlives every lifetime of the input generics.
fn decode_lifetime(generics: &Generics) -> (Generics, Lifetime) {
    let mut out = generics.clone();
    let mut name = "__cbor".to_string();
    let mut counter = 0usize;
    while out
        .lifetimes()
        .any(|lt| lt.lifetime.ident == name.as_str())
    {
        counter += 1;
        name = format!("__cbor{counter}");
    }
    let lt = Lifetime::new(&format!("'{name}"), proc_macro2::Span::call_site());
    out.params
        .insert(0, GenericParam::Lifetime(LifetimeParam::new(lt.clone())));

    let wc = out.make_where_clause();
    for lifetime in generics.lifetimes() {
        let lt_ident = &lifetime.lifetime;
        wc.predicates.push(syn::parse_quote!(#lt: #lt_ident));
    }

    (out, lt)
}

fn decode_named(
    name: &Ident,
    fields: &syn::FieldsNamed,
    wc: &mut syn::WhereClause,
    decode_lt: &Lifetime,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut names = Vec::new();
    let mut slots = Vec::new();
    let mut arms = Vec::new();
    let mut finals = Vec::new();
    let mut required = false;

    for field in record_fields(fields)? {
        let (ident, ty) = (field.ident, field.ty);
        if field.skip {
            add_where_bound(wc, ty, quote!(::core::default::Default));
            finals.push(quote! { #ident: ::core::default::Default::default(), });
            continue;
        }
        if !type_mentions_self(ty, name) {
            add_where_bound(wc, ty, quote!(::cbor_compat::CborDecode<#decode_lt>));
        }

        let idx = names.len();
        let key = &field.key;
        names.push(quote!(#key));
        let var = format_ident!("__{ident}");
        slots.push(
            quote! { let mut #var: ::core::option::Option<#ty> = ::core::option::Option::None; },
        );
        arms.push(quote! {
            #idx => {
                if #var.is_some() {
                    return Err(::cbor_compat::CborError::new(
                        ::cbor_compat::ErrorCode::DuplicateMapKey,
                        decoder.position(),
                    ));
                }
                #var = ::core::option::Option::Some(::cbor_compat::CborDecode::decode(decoder)?);
            }
        });

        if field.defaultable {
            add_where_bound(wc, ty, quote!(::core::default::Default));
            finals.push(quote! { #ident: #var.unwrap_or_default(), });
        } else {
            required = true;
            finals.push(quote! {
                #ident: #var.ok_or_else(|| {
                    ::cbor_compat::CborError::new(::cbor_compat::ErrorCode::MissingField, __start)
                })?,
            });
        }
    }

    let start = required.then(|| quote! { let __start = decoder.position(); });
    Ok(quote! {
        #start
        #(#slots)*
        decoder.record(&[#(#names),*], |__idx, decoder| {
            match __idx {
                #(#arms)*
                _ => decoder.skip_value()?,
            }
            Ok(())
        })?;
        Ok(Self { #(#finals)* })
    })
}

fn decode_tuple(
    name: &Ident,
    fields: &syn::FieldsUnnamed,
    wc: &mut syn::WhereClause,
    decode_lt: &Lifetime,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut vars = Vec::new();
    let mut decodes = Vec::new();
    for (idx, field) in fields.unnamed.iter().enumerate() {
        ensure_no_cbor_attrs(&field.attrs, "tuple struct fields")?;
        if !type_mentions_self(&field.ty, name) {
            add_where_bound(wc, &field.ty, quote!(::cbor_compat::CborDecode<#decode_lt>));
        }
        let var = format_ident!("v{idx}");
        decodes.push(quote! { let #var = ::cbor_compat::CborDecode::decode(decoder)?; });
        vars.push(var);
    }

    if vars.len() == 1 {
        return Ok(quote! {
            #(#decodes)*
            Ok(Self(#(#vars),*))
        });
    }

    let expected = vars.len();
    Ok(quote! {
        let __off = decoder.position();
        if let ::core::option::Option::Some(len) = decoder.begin_array()? {
            if len != #expected {
                return Err(::cbor_compat::CborError::length(
                    ::cbor_compat::ErrorCode::LengthMismatch,
                    #expected as u64,
                    len as u64,
                    __off,
                ));
            }
        }
        #(#decodes)*
        decoder.end_array()?;
        Ok(Self(#(#vars),*))
    })
}

pub(crate) fn decode_struct(
    name: &Ident,
    generics: &Generics,
    data: &DataStruct,
) -> syn::Result<proc_macro2::TokenStream> {
    let (impl_generics2, decode_lt) = decode_lifetime(generics);
    let (impl_generics, _, where_clause) = impl_generics2.split_for_impl();
    let (_, ty_generics, _) = generics.split_for_impl();

    let mut where_clause = where_clause.cloned();
    let wc = where_clause.get_or_insert_with(empty_where_clause);

    let body = match &data.fields {
        Fields::Named(fields) => decode_named(name, fields, wc, &decode_lt)?,
        Fields::Unnamed(fields) => decode_tuple(name, fields, wc, &decode_lt)?,
        Fields::Unit => quote! {
            decoder.null()?;
            Ok(Self)
        },
    };

    Ok(quote! {
        impl #impl_generics ::cbor_compat::CborDecode<#decode_lt> for #name #ty_generics #where_clause {
            fn decode(decoder: &mut ::cbor_compat::Decoder<#decode_lt>) -> ::core::result::Result<Self, ::cbor_compat::CborError> {
                #body
            }
        }
    })
}

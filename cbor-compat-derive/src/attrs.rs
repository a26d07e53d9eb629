use proc_macro2::Span;
use quote::quote;
use syn::{spanned::Spanned, Attribute, LitStr};

#[derive(Default, Clone)]
pub(crate) struct CborFieldAttr {
    pub(crate) rename: Option<LitStr>,
    pub(crate) skip: bool,
    pub(crate) default: bool,
}

/// Record layout forced by `#[cbor(keyed)]` or `#[cbor(positional)]` on the struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    Positional,
    Keyed,
}

impl Layout {
    pub(crate) fn to_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Self::Positional => quote!(::cbor_compat::RecordEncoding::Positional),
            Self::Keyed => quote!(::cbor_compat::RecordEncoding::Keyed),
        }
    }
}

pub(crate) fn ensure_no_cbor_attrs(attrs: &[Attribute], ctx: &str) -> syn::Result<()> {
    for a in attrs {
        if a.path().is_ident("cbor") {
            return Err(syn::Error::new(
                a.span(),
                format!("`#[cbor(...)]` is not supported on {ctx}"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn parse_cbor_field_attrs(attrs: &[Attribute]) -> syn::Result<CborFieldAttr> {
    let mut out = CborFieldAttr::default();
    for attr in attrs {
        if !attr.path().is_ident("cbor") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                if out.skip {
                    return Err(meta.error("duplicate `cbor(skip)`"));
                }
                out.skip = true;
                return Ok(());
            }
            if meta.path.is_ident("default") {
                if out.default {
                    return Err(meta.error("duplicate `cbor(default)`"));
                }
                out.default = true;
                return Ok(());
            }
            if meta.path.is_ident("rename") {
                if out.rename.is_some() {
                    return Err(meta.error("duplicate `cbor(rename=...)`"));
                }
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit);
                return Ok(());
            }
            Err(meta
                .error("unsupported `cbor(...)` field attribute (allowed: rename, skip, default)"))
        })?;
    }

    if out.skip && (out.rename.is_some() || out.default) {
        return Err(syn::Error::new(
            Span::call_site(),
            "`cbor(skip)` cannot be combined with `rename` or `default`",
        ));
    }

    Ok(out)
}

pub(crate) fn parse_cbor_struct_attrs(attrs: &[Attribute]) -> syn::Result<Option<Layout>> {
    let mut layout = None;
    for attr in attrs {
        if !attr.path().is_ident("cbor") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let next = if meta.path.is_ident("keyed") {
                Layout::Keyed
            } else if meta.path.is_ident("positional") {
                Layout::Positional
            } else {
                return Err(meta.error(
                    "unsupported `cbor(...)` struct attribute (allowed: keyed, positional)",
                ));
            };
            if layout.is_some() {
                return Err(meta.error("record layout given more than once"));
            }
            layout = Some(next);
            Ok(())
        })?;
    }
    Ok(layout)
}

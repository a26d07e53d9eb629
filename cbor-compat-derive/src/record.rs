use syn::{FieldsNamed, Ident, LitStr, Type};

use crate::attrs::parse_cbor_field_attrs;
use crate::types::is_option_type;

/// A named struct field after attribute parsing.
pub(crate) struct RecordField<'a> {
    pub(crate) ident: &'a Ident,
    pub(crate) ty: &'a Type,
    pub(crate) key: LitStr,
    pub(crate) skip: bool,
    /// Absent on the wire falls back to `Default::default()`.
    pub(crate) defaultable: bool,
}

pub(crate) fn record_fields(fields: &FieldsNamed) -> syn::Result<Vec<RecordField<'_>>> {
    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let attr = parse_cbor_field_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let key = attr
            .rename
            .unwrap_or_else(|| LitStr::new(ident.to_string().trim_start_matches("r#"), ident.span()));
        out.push(RecordField {
            ident,
            ty: &field.ty,
            key,
            skip: attr.skip,
            defaultable: attr.default || is_option_type(&field.ty),
        });
    }
    Ok(out)
}

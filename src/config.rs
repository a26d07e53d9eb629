use crate::limits::DecodeLimits;

/// Wire layout for records (structs with named fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordEncoding {
    /// An array of field values in declaration order.
    #[default]
    Positional,
    /// A map from field name (text) to field value, in declaration order.
    Keyed,
}

/// Per-call codec configuration.
///
/// `records` only affects encoding: the decoder accepts either layout for a record and
/// recognises it from the container's major type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Record layout used when encoding.
    pub records: RecordEncoding,
    /// Reject bytes after the decoded item with `TrailingBytes`.
    pub deny_trailing_bytes: bool,
    /// Decode limits. `None` derives limits from the input length.
    pub limits: Option<DecodeLimits>,
}

impl Config {
    /// Positional records, trailing bytes allowed, limits derived from input.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: RecordEncoding::Positional,
            deny_trailing_bytes: false,
            limits: None,
        }
    }

    /// Shorthand for `Config::new().with_records(RecordEncoding::Keyed)`.
    #[must_use]
    pub const fn keyed() -> Self {
        Self::new().with_records(RecordEncoding::Keyed)
    }

    /// Set the record layout.
    #[must_use]
    pub const fn with_records(mut self, records: RecordEncoding) -> Self {
        self.records = records;
        self
    }

    /// Set explicit decode limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Reject trailing bytes after the top-level item.
    #[must_use]
    pub const fn deny_trailing_bytes(mut self) -> Self {
        self.deny_trailing_bytes = true;
        self
    }

    pub(crate) fn limits_for(&self, input_len: usize) -> DecodeLimits {
        self.limits
            .unwrap_or_else(|| DecodeLimits::for_bytes(input_len))
    }
}

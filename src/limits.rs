/// Default maximum nesting depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Floor for the container length and total item limits derived from a message size.
///
/// Use [`DecodeLimits::with_max_container_len`] for a tighter cap.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1 << 16;

/// Decode-time resource limits.
///
/// Limits are enforced deterministically and must not depend on background timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum total input length in bytes.
    pub max_input_bytes: usize,
    /// Maximum nesting depth.
    pub max_depth: usize,
    /// Maximum total count of container items:
    /// `sum(array_len) + sum(2 * map_pairs)` across the entire decoded item
    /// (maps count both keys and values).
    pub max_total_items: usize,
    /// Maximum array length.
    pub max_array_len: usize,
    /// Maximum map length (pairs).
    pub max_map_len: usize,
    /// Maximum byte-string length.
    pub max_bytes_len: usize,
    /// Maximum text-string length in UTF-8 bytes.
    pub max_text_len: usize,
}

impl DecodeLimits {
    /// Construct conservative limits derived from a maximum message size.
    ///
    /// The defaults are:
    /// - `max_input_bytes`, `max_bytes_len` and `max_text_len` equal `max_message_bytes`
    /// - `max_array_len`, `max_map_len` and `max_total_items` are the larger of
    ///   `max_message_bytes` and `DEFAULT_MAX_CONTAINER_LEN`
    ///
    /// Every item takes at least one input byte, so any well-formed message of
    /// `max_message_bytes` fits these limits. A short container that declares more items than
    /// the input holds is reported as `TruncatedStructure` rather than a limit error.
    /// Preallocation is clamped to the remaining input either way.
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        let max_items = max_message_bytes.max(DEFAULT_MAX_CONTAINER_LEN);
        Self {
            max_input_bytes: max_message_bytes,
            max_depth: DEFAULT_MAX_DEPTH,
            max_total_items: max_items,
            max_array_len: max_items,
            max_map_len: max_items,
            max_bytes_len: max_message_bytes,
            max_text_len: max_message_bytes,
        }
    }

    /// No limits beyond what the address space allows.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_input_bytes: usize::MAX,
            max_depth: usize::MAX,
            max_total_items: usize::MAX,
            max_array_len: usize::MAX,
            max_map_len: usize::MAX,
            max_bytes_len: usize::MAX,
            max_text_len: usize::MAX,
        }
    }

    /// Replace the nesting depth limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace both container length limits.
    #[must_use]
    pub const fn with_max_container_len(mut self, len: usize) -> Self {
        self.max_array_len = len;
        self.max_map_len = len;
        self
    }

    /// Replace the total item limit.
    #[must_use]
    pub const fn with_max_total_items(mut self, items: usize) -> Self {
        self.max_total_items = items;
        self
    }
}

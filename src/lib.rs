//! # cbor-compat
//!
//! An RFC 8949 CBOR codec whose output is readable by other CBOR implementations and which reads
//! theirs.
//!
//! ## Design principles
//!
//! - **Floats are bit-exact.**
//!   `f32` is always written as a 4-byte float (`0xfa`) and `f64` as an 8-byte float (`0xfb`),
//!   never shortened. NaN payloads, infinities and `-0.0` survive a round trip. Half precision
//!   input is accepted and widened.
//! - **Integers and lengths are minimal.**
//!   Every header uses the shortest argument form.
//! - **Walker-driven protocol.**
//!   [`Encoder`] and [`Decoder`] expose begin/end calls for arrays, maps and records, so a type
//!   can be (de)serialized field by field without building a tree.
//! - **Structural errors are precise.**
//!   Input that ends at an item boundary inside a container fails with
//!   [`ErrorCode::TruncatedStructure`]; input that ends inside an item fails with
//!   [`ErrorCode::UnexpectedEndOfInput`]. Every [`CborError`] carries the byte offset.
//!
//! ## Records
//!
//! A record (a struct with named fields) is written as an array of field values in declaration
//! order by default ([`RecordEncoding::Positional`]), or as a map from field name to value
//! ([`RecordEncoding::Keyed`]). Decoding accepts either layout.
//!
//! ```
//! use cbor_compat::{decode, encode_to_vec, CborDecode, CborEncode};
//!
//! #[derive(Debug, PartialEq, CborEncode, CborDecode)]
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! let bytes = encode_to_vec(&Point { x: 1, y: -2 }).unwrap();
//! assert_eq!(bytes, [0x82, 0x01, 0x21]);
//! assert_eq!(decode::<Point>(&bytes).unwrap(), Point { x: 1, y: -2 });
//! ```
//!
//! ## Feature flags
//!
//! - `std` *(default)*: implements `std::error::Error` for [`CborError`] and codecs for `HashMap`.
//! - `serde` *(default)*: [`to_vec`] and [`from_slice`] for any serde type.
//! - `tracing` *(default)*: trace events on container entry and debug events on failure.
//! - `simdutf8`: SIMD-accelerated UTF-8 validation.
//!
//! ## `no_std`
//!
//! Without `std` the crate needs only `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

extern crate alloc;

mod alloc_util;
mod codec;
mod config;
mod decode;
mod encode;
mod error;
mod limits;
mod shape;
mod sink;
pub(crate) mod utf8;
mod value;
mod wire;

#[cfg(feature = "serde")]
mod de;
#[cfg(feature = "serde")]
mod ser;

pub use crate::codec::{
    decode, decode_prefix, decode_with, encode_to_vec, encode_to_vec_with, CborArrayElem,
    CborDecode, CborEncode,
};
pub use crate::config::{Config, RecordEncoding};
pub use crate::decode::Decoder;
pub use crate::encode::{ArrayEncoder, Encoder, MapEncoder, RecordEncoder};
pub use crate::error::{CborError, ErrorCode, ErrorDetail};
pub use crate::limits::{DecodeLimits, DEFAULT_MAX_CONTAINER_LEN, DEFAULT_MAX_DEPTH};
pub use crate::shape::{
    decode_shaped, encode_shaped, CborShape, FieldDescriptor, RecordDescriptor, Shape,
};
pub use crate::value::{decode_value, Value};
pub use crate::wire::{Arg, CborKind, Header, MajorType};

#[cfg(feature = "serde")]
pub use crate::de::{from_slice, from_slice_with};
#[cfg(feature = "serde")]
pub use crate::ser::{to_vec, to_vec_with, Compound};

pub use cbor_compat_derive::{CborDecode, CborEncode, CborShape};

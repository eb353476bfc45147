//! Low-level primitives shared by the key codec.

/// Order-preserving byte encoders and a slice cursor.
///
/// Everything the codec writes must compare byte-wise in the same order as
/// the values it came from, so these helpers never emit length prefixes.
pub mod bytes;

#![forbid(unsafe_code)]
//! Order-preserving encoders and buffer utilities used by the key codec.

pub mod ord {
    //! Order-preserving encoders for numeric and string key elements.

    use core::convert::TryInto;

    const U64_LEN: usize = core::mem::size_of::<u64>();
    const SIGN_BIT: u64 = 1 << 63;

    /// Escape byte introducing either an escaped zero or a terminator.
    pub const ESCAPE: u8 = 0x00;
    /// Follows [`ESCAPE`] to encode a literal zero byte.
    pub const ESCAPED_ZERO: u8 = 0xFF;
    /// Follows [`ESCAPE`] to terminate an escaped string.
    pub const TERMINATOR: u8 = 0x01;

    /// Appends an f64 with order preservation (NaN not allowed).
    pub fn put_f64_be(dst: &mut Vec<u8>, v: f64) {
        debug_assert!(!v.is_nan(), "NaN keys are not allowed");
        let bits = encode_f64_bits(v);
        dst.extend_from_slice(&bits.to_be_bytes());
    }

    /// Decodes an order-preserving f64 from the head of `src`.
    pub fn get_f64_be(src: &[u8]) -> Option<f64> {
        let head: [u8; U64_LEN] = src.get(..U64_LEN)?.try_into().ok()?;
        let decoded = decode_f64_bits(u64::from_be_bytes(head));
        Some(f64::from_bits(decoded))
    }

    /// Appends `s` so that shorter strings sort before their extensions.
    ///
    /// Zero bytes are written as `00 FF` and the string ends with `00 01`.
    pub fn put_escaped(dst: &mut Vec<u8>, s: &[u8]) {
        for &b in s {
            if b == ESCAPE {
                dst.push(ESCAPE);
                dst.push(ESCAPED_ZERO);
            } else {
                dst.push(b);
            }
        }
        dst.push(ESCAPE);
        dst.push(TERMINATOR);
    }

    /// Splits an escaped string off the head of `src`, returning the raw
    /// bytes and the number of encoded bytes consumed.
    pub fn split_escaped(src: &[u8]) -> Option<(Vec<u8>, usize)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < src.len() {
            let b = src[i];
            if b != ESCAPE {
                out.push(b);
                i += 1;
                continue;
            }
            match src.get(i + 1)? {
                &ESCAPED_ZERO => out.push(ESCAPE),
                &TERMINATOR => return Some((out, i + 2)),
                _ => return None,
            }
            i += 2;
        }
        None
    }

    fn encode_f64_bits(v: f64) -> u64 {
        let bits = v.to_bits();
        if bits & SIGN_BIT != 0 {
            !bits
        } else {
            bits ^ SIGN_BIT
        }
    }

    fn decode_f64_bits(encoded: u64) -> u64 {
        if encoded & SIGN_BIT != 0 {
            encoded ^ SIGN_BIT
        } else {
            !encoded
        }
    }
}

pub mod buf {
    //! A simple slice-backed cursor for ergonomic parsing.

    use core::fmt;

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, or `None` if fewer remain.
        pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
            let end = self.off.checked_add(n)?;
            let slice = self.buf.get(self.off..end)?;
            self.off = end;
            Some(slice)
        }

        /// Returns the next byte without consuming it.
        pub fn peek(&self) -> Option<u8> {
            self.buf.get(self.off).copied()
        }

        /// Returns the unread tail of the buffer.
        pub fn rest(&self) -> &'a [u8] {
            self.buf.get(self.off..).unwrap_or(&[])
        }

        /// Advances past `n` bytes already inspected through [`Self::rest`].
        pub fn skip(&mut self, n: usize) {
            self.off = (self.off + n).min(self.buf.len());
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}

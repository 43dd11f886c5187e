use num_bigint::{BigInt, Sign};

use crate::error::Error;

const TAG_POSITIVE_BIGNUM: u64 = 2;
const TAG_NEGATIVE_BIGNUM: u64 = 3;

#[derive(Debug, Clone, Copy)]
struct Frame {
    expected: u64,
    written: u64,
}

/// Canonical CBOR writer.
///
/// Always emits minimum-length integer headers and definite-length
/// aggregates. Open aggregates are tracked so that under-filled frames are
/// reported as [`Error::InvalidOperation`] when the output is finalized.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    frames: Vec<Frame>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    /// Finalizes the writer and hands out the encoded bytes.
    pub fn encoded(self) -> Result<Vec<u8>, Error> {
        if !self.frames.is_empty() {
            return Err(Error::InvalidOperation(
                "finalized with an under-filled array or map frame",
            ));
        }

        Ok(self.buf)
    }

    pub fn encoded_hex(self) -> Result<String, Error> {
        Ok(hex::encode(self.encoded()?))
    }

    fn note_item(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.written += 1;
        }
    }

    fn close_full_frames(&mut self) {
        while matches!(self.frames.last(), Some(f) if f.written == f.expected) {
            self.frames.pop();
        }
    }

    fn put_head(&mut self, major: u8, arg: u64) {
        let major = major << 5;
        match arg {
            0..=23 => self.buf.push(major | arg as u8),
            24..=0xff => {
                self.buf.push(major | 24);
                self.buf.push(arg as u8);
            }
            0x100..=0xffff => {
                self.buf.push(major | 25);
                self.buf.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(major | 26);
                self.buf.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.buf.push(major | 27);
                self.buf.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }

    fn put_scalar(&mut self, major: u8, arg: u64) -> Result<(), Error> {
        self.note_item();
        self.put_head(major, arg);
        self.close_full_frames();
        Ok(())
    }

    pub fn write_uint(&mut self, value: u64) -> Result<(), Error> {
        self.put_scalar(0, value)
    }

    pub fn write_int(&mut self, value: i64) -> Result<(), Error> {
        if value >= 0 {
            self.put_scalar(0, value as u64)
        } else {
            self.put_scalar(1, !(value as u64))
        }
    }

    /// Writes an integer in the full CBOR range `[-2^64, 2^64 - 1]`.
    pub fn write_integer(&mut self, value: i128) -> Result<(), Error> {
        if value >= 0 {
            let v = u64::try_from(value).map_err(|_| Error::IntegerOutOfRange)?;
            self.put_scalar(0, v)
        } else {
            let v = u64::try_from(-1 - value).map_err(|_| Error::IntegerOutOfRange)?;
            self.put_scalar(1, v)
        }
    }

    /// Writes an unbounded integer: a plain integer when it fits the 64-bit
    /// headers, a tag 2/3 bignum with a minimal big-endian magnitude
    /// otherwise.
    pub fn write_bigint(&mut self, value: &BigInt) -> Result<(), Error> {
        if let Ok(v) = u64::try_from(value) {
            return self.put_scalar(0, v);
        }

        match value.sign() {
            Sign::Minus => {
                let offset = BigInt::from(-1) - value;
                if let Ok(v) = u64::try_from(&offset) {
                    return self.put_scalar(1, v);
                }

                self.write_tag(TAG_NEGATIVE_BIGNUM)?;
                self.write_byte_string(&offset.to_bytes_be().1)
            }
            _ => {
                self.write_tag(TAG_POSITIVE_BIGNUM)?;
                self.write_byte_string(&value.to_bytes_be().1)
            }
        }
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.put_scalar(7, if value { 21 } else { 20 })
    }

    pub fn write_null(&mut self) -> Result<(), Error> {
        self.put_scalar(7, 22)
    }

    pub fn write_undefined(&mut self) -> Result<(), Error> {
        self.put_scalar(7, 23)
    }

    pub fn write_byte_string(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.note_item();
        self.put_head(2, bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self.close_full_frames();
        Ok(())
    }

    pub fn write_text_string(&mut self, text: &str) -> Result<(), Error> {
        self.note_item();
        self.put_head(3, text.len() as u64);
        self.buf.extend_from_slice(text.as_bytes());
        self.close_full_frames();
        Ok(())
    }

    pub fn write_start_array(&mut self, len: u64) -> Result<(), Error> {
        self.note_item();
        self.put_head(4, len);
        self.frames.push(Frame {
            expected: len,
            written: 0,
        });
        self.close_full_frames();
        Ok(())
    }

    pub fn write_start_map(&mut self, len: u64) -> Result<(), Error> {
        self.note_item();
        self.put_head(5, len);
        let items = len
            .checked_mul(2)
            .ok_or(Error::InvalidOperation("map length overflow"))?;
        self.frames.push(Frame {
            expected: items,
            written: 0,
        });
        self.close_full_frames();
        Ok(())
    }

    pub fn write_tag(&mut self, tag: u64) -> Result<(), Error> {
        // the tagged value that follows completes the item, so a tag does
        // not count toward the enclosing frame by itself
        self.put_head(6, tag);
        Ok(())
    }

    /// Appends a pre-encoded CBOR item verbatim, counting it as one item of
    /// the enclosing frame.
    pub fn write_encoded_value(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.note_item();
        self.buf.extend_from_slice(bytes);
        self.close_full_frames();
        Ok(())
    }

    /// Emits a map from pre-encoded entries, sorted by the lexicographic
    /// byte order of the encoded keys. Equal keys are a [`Error::DuplicateKey`].
    pub fn write_sorted_map(&mut self, mut entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Error> {
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if entries.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(Error::DuplicateKey);
        }

        self.write_start_map(entries.len() as u64)?;
        for (key, value) in entries {
            self.write_encoded_value(&key)?;
            self.write_encoded_value(&value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Writer) -> Result<(), Error>) -> String {
        let mut w = Writer::new();
        f(&mut w).unwrap();
        w.encoded_hex().unwrap()
    }

    #[test]
    fn minimal_headers() {
        assert_eq!(encoded(|w| w.write_uint(0)), "00");
        assert_eq!(encoded(|w| w.write_uint(23)), "17");
        assert_eq!(encoded(|w| w.write_uint(24)), "1818");
        assert_eq!(encoded(|w| w.write_uint(255)), "18ff");
        assert_eq!(encoded(|w| w.write_uint(256)), "190100");
        assert_eq!(encoded(|w| w.write_uint(65536)), "1a00010000");
        assert_eq!(encoded(|w| w.write_uint(u64::MAX)), "1bffffffffffffffff");
    }

    #[test]
    fn negative_integers() {
        assert_eq!(encoded(|w| w.write_int(-1)), "20");
        assert_eq!(encoded(|w| w.write_int(-10)), "29");
        assert_eq!(encoded(|w| w.write_int(i64::MIN)), "3b7fffffffffffffff");
        assert_eq!(
            encoded(|w| w.write_integer(-18446744073709551616)),
            "3bffffffffffffffff"
        );
    }

    #[test]
    fn bignum_falls_back_to_tag_only_outside_u64() {
        assert_eq!(encoded(|w| w.write_bigint(&BigInt::from(18))), "12");
        assert_eq!(
            encoded(|w| w.write_bigint(&(BigInt::from(u64::MAX) + 1))),
            "c249010000000000000000"
        );
        assert_eq!(
            encoded(|w| w.write_bigint(&(BigInt::from(-2) - BigInt::from(u64::MAX)))),
            "c349010000000000000000"
        );
    }

    #[test]
    fn under_filled_frame_is_rejected() {
        let mut w = Writer::new();
        w.write_start_array(2).unwrap();
        w.write_uint(1).unwrap();
        assert_eq!(
            w.encoded(),
            Err(Error::InvalidOperation(
                "finalized with an under-filled array or map frame"
            ))
        );
    }

    #[test]
    fn sorted_map_orders_by_encoded_key() {
        let mut w = Writer::new();
        let entries = vec![
            (vec![0x18, 0x64], vec![0x02]), // key 100
            (vec![0x01], vec![0x01]),       // key 1
        ];
        w.write_sorted_map(entries).unwrap();
        assert_eq!(w.encoded_hex().unwrap(), "a20101186402");
    }

    #[test]
    fn duplicate_sorted_map_keys_are_rejected() {
        let mut w = Writer::new();
        let entries = vec![(vec![0x01], vec![0x01]), (vec![0x01], vec![0x02])];
        assert_eq!(w.write_sorted_map(entries), Err(Error::DuplicateKey));
    }
}

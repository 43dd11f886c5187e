use num_bigint::{BigInt, BigUint, Sign};

use crate::error::{CborType, Error};

/// Parsed initial byte + argument of a single data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Head {
    Uint(u64),
    Nint(u64),
    Bytes(u64),
    BytesIndef,
    Text(u64),
    TextIndef,
    Array(u64),
    ArrayIndef,
    Map(u64),
    MapIndef,
    Tag(u64),
    Simple(u8),
    Break,
}

impl Head {
    fn cbor_type(&self) -> CborType {
        match self {
            Head::Uint(_) => CborType::UnsignedInteger,
            Head::Nint(_) => CborType::NegativeInteger,
            Head::Bytes(_) | Head::BytesIndef => CborType::ByteString,
            Head::Text(_) | Head::TextIndef => CborType::TextString,
            Head::Array(_) | Head::ArrayIndef => CborType::Array,
            Head::Map(_) | Head::MapIndef => CborType::Map,
            Head::Tag(_) => CborType::Tag,
            Head::Simple(_) | Head::Break => CborType::Simple,
        }
    }
}

/// Non-consuming lookahead over the next data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekState {
    /// Major type of the next item.
    pub cbor_type: CborType,
    /// Integer value, string/aggregate length, tag number or simple value,
    /// depending on the major type.
    pub value: u64,
    /// Whether the next item announces an indefinite length.
    pub indefinite: bool,
}

pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NULL: u8 = 22;
pub const SIMPLE_UNDEFINED: u8 = 23;

const TAG_POSITIVE_BIGNUM: u64 = 2;
const TAG_NEGATIVE_BIGNUM: u64 = 3;

/// Sequential reader over a CBOR byte slice.
///
/// The reader is lenient by default: non-minimal integer headers and
/// indefinite-length aggregates are accepted so that any historical on-chain
/// data decodes. The [`Reader::strict`] constructor enforces the
/// deterministic subset instead, rejecting both with
/// [`Error::NotCanonical`].
///
/// Cloning the reader snapshots its position, which is the supported way to
/// look ahead with rewind.
#[derive(Debug, Clone)]
pub struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
    strict: bool,
}

impl<'b> Reader<'b> {
    pub fn new(bytes: &'b [u8]) -> Self {
        Reader {
            bytes,
            pos: 0,
            strict: false,
        }
    }

    pub fn strict(bytes: &'b [u8]) -> Self {
        Reader {
            bytes,
            pos: 0,
            strict: true,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'b [u8], Error> {
        if self.remaining() < n {
            return Err(Error::EndOfBuffer);
        }

        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;

        Ok(out)
    }

    /// Consumes and parses the initial byte plus argument of the next item.
    fn item_head(&mut self) -> Result<Head, Error> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;

        let arg = match info {
            0..=23 => Some(info as u64),
            24 => {
                let v = self.take(1)?[0] as u64;
                if self.strict && v < 24 {
                    return Err(Error::NotCanonical("non-minimal integer header"));
                }
                Some(v)
            }
            25 => {
                let b = self.take(2)?;
                let v = u16::from_be_bytes([b[0], b[1]]) as u64;
                if self.strict && v <= u8::MAX as u64 {
                    return Err(Error::NotCanonical("non-minimal integer header"));
                }
                Some(v)
            }
            26 => {
                let b = self.take(4)?;
                let v = u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64;
                if self.strict && v <= u16::MAX as u64 {
                    return Err(Error::NotCanonical("non-minimal integer header"));
                }
                Some(v)
            }
            27 => {
                let b = self.take(8)?;
                let v = u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
                if self.strict && v <= u32::MAX as u64 {
                    return Err(Error::NotCanonical("non-minimal integer header"));
                }
                Some(v)
            }
            31 => None,
            _ => {
                return Err(Error::MalformedTag {
                    expected: 0,
                    actual: info as u64,
                })
            }
        };

        let head = match (major, arg) {
            (0, Some(v)) => Head::Uint(v),
            (1, Some(v)) => Head::Nint(v),
            (2, Some(v)) => Head::Bytes(v),
            (2, None) => Head::BytesIndef,
            (3, Some(v)) => Head::Text(v),
            (3, None) => Head::TextIndef,
            (4, Some(v)) => Head::Array(v),
            (4, None) => Head::ArrayIndef,
            (5, Some(v)) => Head::Map(v),
            (5, None) => Head::MapIndef,
            (6, Some(v)) => Head::Tag(v),
            (7, Some(v)) if info <= 24 => Head::Simple(v as u8),
            (7, None) => Head::Break,
            _ => {
                // floats and reserved simple encodings are outside the
                // deterministic subset the ledger uses
                return Err(Error::NotCanonical("unsupported simple or float value"));
            }
        };

        if self.strict {
            match head {
                Head::BytesIndef | Head::TextIndef => {
                    return Err(Error::NotCanonical("indefinite-length string"))
                }
                Head::ArrayIndef | Head::MapIndef => {
                    return Err(Error::NotCanonical("indefinite-length aggregate"))
                }
                _ => (),
            }
        }

        Ok(head)
    }

    /// Non-consuming lookahead of the next item's major type and argument.
    pub fn peek_state(&self) -> Result<PeekState, Error> {
        let mut probe = self.clone();
        // lookahead reports the shape even in strict mode; the consuming
        // read is where canonicity is enforced
        probe.strict = false;
        let head = probe.item_head()?;

        Ok(PeekState {
            cbor_type: head.cbor_type(),
            value: match head {
                Head::Uint(v)
                | Head::Nint(v)
                | Head::Bytes(v)
                | Head::Text(v)
                | Head::Array(v)
                | Head::Map(v)
                | Head::Tag(v) => v,
                Head::Simple(v) => v as u64,
                _ => 0,
            },
            indefinite: matches!(
                head,
                Head::BytesIndef | Head::TextIndef | Head::ArrayIndef | Head::MapIndef
            ),
        })
    }

    /// Convenience lookahead of the next item's major type only.
    pub fn peek_type(&self) -> Result<CborType, Error> {
        Ok(self.peek_state()?.cbor_type)
    }

    fn unexpected(expected: CborType, head: Head) -> Error {
        Error::UnexpectedCborType {
            expected,
            actual: head.cbor_type(),
        }
    }

    pub fn read_uint(&mut self) -> Result<u64, Error> {
        match self.item_head()? {
            Head::Uint(v) => Ok(v),
            head => Err(Self::unexpected(CborType::UnsignedInteger, head)),
        }
    }

    /// Reads an integer in the full CBOR range `[-2^64, 2^64 - 1]`.
    pub fn read_integer(&mut self) -> Result<i128, Error> {
        match self.item_head()? {
            Head::Uint(v) => Ok(v as i128),
            Head::Nint(v) => Ok(-1 - v as i128),
            head => Err(Self::unexpected(CborType::UnsignedInteger, head)),
        }
    }

    pub fn read_int(&mut self) -> Result<i64, Error> {
        let v = self.read_integer()?;
        i64::try_from(v).map_err(|_| Error::IntegerOutOfRange)
    }

    /// Reads either a plain integer or a tag 2/3 bignum into an unbounded
    /// integer.
    pub fn read_bigint(&mut self) -> Result<BigInt, Error> {
        match self.peek_state()?.cbor_type {
            CborType::Tag => {
                let tag = self.read_tag()?;
                let magnitude = BigUint::from_bytes_be(&self.read_byte_string()?);

                match tag {
                    TAG_POSITIVE_BIGNUM => Ok(BigInt::from_biguint(Sign::Plus, magnitude)),
                    TAG_NEGATIVE_BIGNUM => {
                        Ok(BigInt::from(-1) - BigInt::from_biguint(Sign::Plus, magnitude))
                    }
                    actual => Err(Error::MalformedTag {
                        expected: TAG_POSITIVE_BIGNUM,
                        actual,
                    }),
                }
            }
            _ => Ok(BigInt::from(self.read_integer()?)),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        match self.item_head()? {
            Head::Simple(SIMPLE_FALSE) => Ok(false),
            Head::Simple(SIMPLE_TRUE) => Ok(true),
            head => Err(Self::unexpected(CborType::Simple, head)),
        }
    }

    pub fn read_null(&mut self) -> Result<(), Error> {
        match self.item_head()? {
            Head::Simple(SIMPLE_NULL) => Ok(()),
            head => Err(Self::unexpected(CborType::Simple, head)),
        }
    }

    pub fn read_undefined(&mut self) -> Result<(), Error> {
        match self.item_head()? {
            Head::Simple(SIMPLE_UNDEFINED) => Ok(()),
            head => Err(Self::unexpected(CborType::Simple, head)),
        }
    }

    fn take_len(&mut self, len: u64) -> Result<&'b [u8], Error> {
        let len = usize::try_from(len).map_err(|_| Error::EndOfBuffer)?;
        self.take(len)
    }

    pub fn read_byte_string(&mut self) -> Result<Vec<u8>, Error> {
        match self.item_head()? {
            Head::Bytes(len) => Ok(self.take_len(len)?.to_vec()),
            Head::BytesIndef => {
                // lenient mode only; chunks are concatenated
                let mut out = Vec::new();
                loop {
                    match self.item_head()? {
                        Head::Bytes(len) => out.extend_from_slice(self.take_len(len)?),
                        Head::Break => break,
                        head => return Err(Self::unexpected(CborType::ByteString, head)),
                    }
                }
                Ok(out)
            }
            head => Err(Self::unexpected(CborType::ByteString, head)),
        }
    }

    pub fn read_text_string(&mut self) -> Result<String, Error> {
        let bytes = match self.item_head()? {
            Head::Text(len) => self.take_len(len)?.to_vec(),
            Head::TextIndef => {
                let mut out = Vec::new();
                loop {
                    match self.item_head()? {
                        Head::Text(len) => out.extend_from_slice(self.take_len(len)?),
                        Head::Break => break,
                        head => return Err(Self::unexpected(CborType::TextString, head)),
                    }
                }
                out
            }
            head => return Err(Self::unexpected(CborType::TextString, head)),
        };

        String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Reads an array header. Returns the announced length, `None` meaning
    /// indefinite (lenient mode only). When `expected` is given, a definite
    /// length must match it exactly.
    pub fn read_start_array(&mut self, expected: Option<u64>) -> Result<Option<u64>, Error> {
        let len = match self.item_head()? {
            Head::Array(len) => Some(len),
            Head::ArrayIndef => None,
            head => return Err(Self::unexpected(CborType::Array, head)),
        };

        if let (Some(expected), Some(actual)) = (expected, len) {
            if expected != actual {
                return Err(Error::InvalidArraySize { expected, actual });
            }
        }

        Ok(len)
    }

    /// Closes an array opened with [`Reader::read_start_array`]. Consumes
    /// the break byte for indefinite arrays; a no-op for definite ones.
    pub fn read_end_array(&mut self, len: Option<u64>) -> Result<(), Error> {
        match len {
            Some(_) => Ok(()),
            None => match self.item_head()? {
                Head::Break => Ok(()),
                head => Err(Self::unexpected(CborType::Simple, head)),
            },
        }
    }

    /// Validates the announced length of a definite array against the shape
    /// a decoder expects. Indefinite lengths pass; their end is validated by
    /// [`Reader::read_end_array`].
    pub fn expect_array_len(&self, announced: Option<u64>, expected: u64) -> Result<(), Error> {
        match announced {
            Some(actual) if actual != expected => Err(Error::InvalidArraySize { expected, actual }),
            _ => Ok(()),
        }
    }

    /// Reads a map header; semantics mirror [`Reader::read_start_array`].
    pub fn read_start_map(&mut self, expected: Option<u64>) -> Result<Option<u64>, Error> {
        let len = match self.item_head()? {
            Head::Map(len) => Some(len),
            Head::MapIndef => None,
            head => return Err(Self::unexpected(CborType::Map, head)),
        };

        if let (Some(expected), Some(actual)) = (expected, len) {
            if expected != actual {
                return Err(Error::InvalidMapSize { expected, actual });
            }
        }

        Ok(len)
    }

    pub fn read_end_map(&mut self, len: Option<u64>) -> Result<(), Error> {
        self.read_end_array(len)
    }

    /// True while an aggregate opened with announced length `len` still has
    /// entries, driving decode loops over both the definite and the
    /// indefinite form. `consumed` counts entries already read.
    pub fn has_entries(&self, len: Option<u64>, consumed: u64) -> Result<bool, Error> {
        match len {
            Some(n) => Ok(consumed < n),
            None => Ok(!self.peek_break()?),
        }
    }

    pub fn read_tag(&mut self) -> Result<u64, Error> {
        match self.item_head()? {
            Head::Tag(tag) => Ok(tag),
            head => Err(Self::unexpected(CborType::Tag, head)),
        }
    }

    pub fn read_tag_expect(&mut self, expected: u64) -> Result<(), Error> {
        let actual = self.read_tag()?;
        if actual != expected {
            return Err(Error::MalformedTag { expected, actual });
        }
        Ok(())
    }

    /// Re-emits the raw bytes of the next complete item without interpreting
    /// it, advancing past it. Used to feed pre-encoded items into hash
    /// computations and [`crate::Writer::write_encoded_value`].
    pub fn read_encoded_value(&mut self) -> Result<&'b [u8], Error> {
        let start = self.pos;
        self.skip_item()?;
        Ok(&self.bytes[start..self.pos])
    }

    pub fn skip_item(&mut self) -> Result<(), Error> {
        // frames of items still to consume; None marks an indefinite frame
        // closed only by a break byte
        let mut frames: Vec<Option<u64>> = vec![Some(1)];

        while let Some(top) = frames.last_mut() {
            match top {
                Some(0) => {
                    frames.pop();
                    continue;
                }
                Some(n) => *n -= 1,
                None => (),
            }

            match self.item_head()? {
                Head::Uint(_) | Head::Nint(_) | Head::Simple(_) => (),
                Head::Bytes(len) | Head::Text(len) => {
                    self.take_len(len)?;
                }
                Head::BytesIndef | Head::TextIndef | Head::ArrayIndef | Head::MapIndef => {
                    frames.push(None);
                }
                Head::Array(len) => {
                    if len > 0 {
                        frames.push(Some(len));
                    }
                }
                Head::Map(len) => {
                    let items = len.checked_mul(2).ok_or(Error::IntegerOutOfRange)?;
                    if items > 0 {
                        frames.push(Some(items));
                    }
                }
                Head::Tag(_) => frames.push(Some(1)),
                Head::Break => match frames.pop() {
                    Some(None) => (),
                    _ => return Err(Error::NotCanonical("unexpected break byte")),
                },
            }
        }

        Ok(())
    }

    /// True when the next byte closes an indefinite aggregate.
    pub fn peek_break(&self) -> Result<bool, Error> {
        if self.is_at_end() {
            return Err(Error::EndOfBuffer);
        }
        Ok(self.bytes[self.pos] == 0xff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_uint_widths() {
        for (hex, expected) in [
            ("00", 0u64),
            ("17", 23),
            ("1818", 24),
            ("18ff", 255),
            ("190100", 256),
            ("1a00010000", 65536),
            ("1b0000000100000000", 4294967296),
        ] {
            let bytes = hex::decode(hex).unwrap();
            assert_eq!(Reader::new(&bytes).read_uint().unwrap(), expected);
            assert_eq!(Reader::strict(&bytes).read_uint().unwrap(), expected);
        }
    }

    #[test]
    fn lenient_accepts_overlong_header_strict_rejects() {
        let bytes = hex::decode("1817").unwrap();
        assert_eq!(Reader::new(&bytes).read_uint().unwrap(), 23);
        assert_eq!(
            Reader::strict(&bytes).read_uint(),
            Err(Error::NotCanonical("non-minimal integer header"))
        );
    }

    #[test]
    fn negative_integers() {
        let bytes = hex::decode("29").unwrap();
        assert_eq!(Reader::new(&bytes).read_int().unwrap(), -10);

        // -2^64 does not fit an i64 but is a valid cbor integer
        let bytes = hex::decode("3bffffffffffffffff").unwrap();
        assert_eq!(Reader::new(&bytes).read_int(), Err(Error::IntegerOutOfRange));
        assert_eq!(
            Reader::new(&bytes).read_integer().unwrap(),
            -18446744073709551616i128
        );
    }

    #[test]
    fn indefinite_byte_string_concatenates_in_lenient_mode() {
        let bytes = hex::decode("5f42010243030405ff").unwrap();
        assert_eq!(
            Reader::new(&bytes).read_byte_string().unwrap(),
            vec![1, 2, 3, 4, 5]
        );
        assert!(matches!(
            Reader::strict(&bytes).read_byte_string(),
            Err(Error::NotCanonical(_))
        ));
    }

    #[test]
    fn array_size_mismatch() {
        let bytes = hex::decode("820102").unwrap();
        let mut r = Reader::new(&bytes);
        assert_eq!(
            r.read_start_array(Some(3)),
            Err(Error::InvalidArraySize {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn read_encoded_value_spans_one_item() {
        // [1, [2, 3], "ab"] followed by a trailing uint
        let bytes = hex::decode("830182020342616205").unwrap();
        let mut r = Reader::new(&bytes);
        let raw = r.read_encoded_value().unwrap().to_vec();
        assert_eq!(hex::encode(raw), "8301820203426162");
        assert_eq!(r.read_uint().unwrap(), 5);
        assert!(r.is_at_end());
    }

    #[test]
    fn peek_does_not_consume() {
        let bytes = hex::decode("c249010000000000000000").unwrap();
        let r = Reader::new(&bytes);
        let state = r.peek_state().unwrap();
        assert_eq!(state.cbor_type, CborType::Tag);
        assert_eq!(state.value, 2);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn bignum_round_values() {
        // tag 2 with 9 bytes: 2^64
        let bytes = hex::decode("c249010000000000000000").unwrap();
        let v = Reader::new(&bytes).read_bigint().unwrap();
        assert_eq!(v, BigInt::from(u64::MAX) + 1);

        // plain integers also parse as bigint
        let bytes = hex::decode("187b").unwrap();
        assert_eq!(Reader::new(&bytes).read_bigint().unwrap(), BigInt::from(123));
    }
}

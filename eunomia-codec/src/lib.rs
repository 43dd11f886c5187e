//! Deterministic CBOR engine for Cardano on-chain data.
//!
//! The reader accepts anything the ledger ever produced (lenient by
//! default, strict on request); the writer only emits the canonical subset:
//! minimum-length headers, definite-length aggregates and byte-sorted map
//! keys.

mod error;
mod reader;
mod writer;

/// Round-trip friendly common helper structs
pub mod utils;

pub use error::{CborType, Error};
pub use reader::{PeekState, Reader};
pub use writer::Writer;

/// Constructs a value from its CBOR representation.
pub trait FromCbor: Sized {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error>;

    fn from_cbor_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        Self::from_cbor(&mut r)
    }

    fn from_cbor_hex(hex_str: &str) -> Result<Self, Error> {
        let bytes =
            hex::decode(hex_str).map_err(|_| Error::invariant("invalid hex input"))?;
        Self::from_cbor_bytes(&bytes)
    }
}

/// Serializes a value into canonical CBOR.
pub trait ToCbor {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error>;

    fn to_cbor_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut w = Writer::new();
        self.to_cbor(&mut w)?;
        w.encoded()
    }

    fn to_cbor_hex(&self) -> Result<String, Error> {
        Ok(hex::encode(self.to_cbor_bytes()?))
    }
}

impl<T: ToCbor + ?Sized> ToCbor for &T {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        (**self).to_cbor(w)
    }
}

macro_rules! uint_cbor {
    ($($t:ty),*) => {
        $(
            impl FromCbor for $t {
                fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
                    <$t>::try_from(r.read_uint()?).map_err(|_| Error::IntegerOutOfRange)
                }
            }

            impl ToCbor for $t {
                fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
                    w.write_uint(*self as u64)
                }
            }
        )*
    };
}

uint_cbor!(u8, u16, u32, u64);

impl FromCbor for i64 {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        r.read_int()
    }
}

impl ToCbor for i64 {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_int(*self)
    }
}

impl FromCbor for bool {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        r.read_bool()
    }
}

impl ToCbor for bool {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_bool(*self)
    }
}

impl FromCbor for String {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        r.read_text_string()
    }
}

impl ToCbor for String {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_text_string(self)
    }
}

impl<T: FromCbor> FromCbor for Vec<T> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let mut out = match len {
            Some(n) => Vec::with_capacity(n.min(1024) as usize),
            None => Vec::new(),
        };

        while r.has_entries(len, out.len() as u64)? {
            out.push(T::from_cbor(r)?);
        }
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl<T: ToCbor> ToCbor for Vec<T> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(self.len() as u64)?;
        for item in self {
            item.to_cbor(w)?;
        }
        Ok(())
    }
}

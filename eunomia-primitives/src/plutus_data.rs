use num_bigint::{BigInt as NumBigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};

use eunomia_codec::utils::{Bytes, Int, KeyValuePairs};
use eunomia_codec::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

const TAG_POSITIVE_BIGNUM: u64 = 2;
const TAG_NEGATIVE_BIGNUM: u64 = 3;

/*
plutus_data =
    constr<plutus_data>
  / { * plutus_data => plutus_data }
  / [ * plutus_data ]
  / big_int
  / bounded_bytes
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum PlutusData {
    Constr(Constr<PlutusData>),
    Map(KeyValuePairs<PlutusData, PlutusData>),
    BigInt(BigInt),
    BoundedBytes(Bytes),
    Array(Vec<PlutusData>),
}

impl FromCbor for PlutusData {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::Tag => {
                let tag = r.peek_state()?.value;

                match tag {
                    TAG_POSITIVE_BIGNUM | TAG_NEGATIVE_BIGNUM => {
                        Ok(Self::BigInt(BigInt::from_cbor(r)?))
                    }
                    (121..=127) | (1280..=1400) | 102 => Ok(Self::Constr(Constr::from_cbor(r)?)),
                    tag => Err(Error::MalformedTag {
                        expected: 121,
                        actual: tag,
                    }),
                }
            }
            CborType::UnsignedInteger | CborType::NegativeInteger => {
                Ok(Self::BigInt(BigInt::from_cbor(r)?))
            }
            CborType::Map => Ok(Self::Map(KeyValuePairs::from_cbor(r)?)),
            CborType::ByteString => Ok(Self::BoundedBytes(Bytes::from_cbor(r)?)),
            CborType::Array => Ok(Self::Array(Vec::from_cbor(r)?)),
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Array,
                actual,
            }),
        }
    }
}

impl ToCbor for PlutusData {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Self::Constr(x) => x.to_cbor(w),
            Self::Map(x) => x.to_cbor(w),
            Self::BigInt(x) => x.to_cbor(w),
            Self::BoundedBytes(x) => x.to_cbor(w),
            Self::Array(x) => x.to_cbor(w),
        }
    }
}

/*
big_int = int / big_uint / big_nint
big_uint = #6.2(bounded_bytes)
big_nint = #6.3(bounded_bytes)
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum BigInt {
    Int(Int),
    BigUInt(Bytes),
    BigNInt(Bytes),
}

impl BigInt {
    /// The mathematical value, regardless of the wire representation.
    pub fn to_big_int(&self) -> NumBigInt {
        match self {
            BigInt::Int(x) => NumBigInt::from(i128::from(*x)),
            BigInt::BigUInt(bytes) => {
                NumBigInt::from_biguint(Sign::Plus, BigUint::from_bytes_be(bytes))
            }
            BigInt::BigNInt(bytes) => {
                NumBigInt::from(-1)
                    - NumBigInt::from_biguint(Sign::Plus, BigUint::from_bytes_be(bytes))
            }
        }
    }
}

impl FromCbor for BigInt {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::UnsignedInteger | CborType::NegativeInteger => {
                Ok(BigInt::Int(Int::from_cbor(r)?))
            }
            CborType::Tag => match r.read_tag()? {
                TAG_POSITIVE_BIGNUM => Ok(BigInt::BigUInt(Bytes::from_cbor(r)?)),
                TAG_NEGATIVE_BIGNUM => Ok(BigInt::BigNInt(Bytes::from_cbor(r)?)),
                actual => Err(Error::MalformedTag {
                    expected: TAG_POSITIVE_BIGNUM,
                    actual,
                }),
            },
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::UnsignedInteger,
                actual,
            }),
        }
    }
}

impl ToCbor for BigInt {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            BigInt::Int(x) => x.to_cbor(w),
            BigInt::BigUInt(x) => {
                w.write_tag(TAG_POSITIVE_BIGNUM)?;
                x.to_cbor(w)
            }
            BigInt::BigNInt(x) => {
                w.write_tag(TAG_NEGATIVE_BIGNUM)?;
                x.to_cbor(w)
            }
        }
    }
}

/*
constr<a> =
    #6.121([* a])
  / #6.122([* a])
  ...
  / #6.102([uint, [* a]])
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct Constr<A> {
    pub tag: u64,
    pub any_constructor: Option<u64>,
    pub fields: Vec<A>,
}

impl<A> Constr<A> {
    /// The constructor index the tag (or the explicit field for tag 102)
    /// stands for.
    pub fn constructor(&self) -> Option<u64> {
        match self.tag {
            121..=127 => Some(self.tag - 121),
            1280..=1400 => Some(self.tag - 1280 + 7),
            102 => self.any_constructor,
            _ => None,
        }
    }
}

impl<A: FromCbor> FromCbor for Constr<A> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let tag = r.read_tag()?;

        match tag {
            121..=127 | 1280..=1400 => Ok(Constr {
                tag,
                any_constructor: None,
                fields: Vec::from_cbor(r)?,
            }),
            102 => {
                let len = r.read_start_array(Some(2))?;
                let any_constructor = r.read_uint()?;
                let fields = Vec::from_cbor(r)?;
                r.read_end_array(len)?;

                Ok(Constr {
                    tag,
                    any_constructor: Some(any_constructor),
                    fields,
                })
            }
            actual => Err(Error::MalformedTag {
                expected: 121,
                actual,
            }),
        }
    }
}

impl<A: ToCbor> ToCbor for Constr<A> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_tag(self.tag)?;

        match self.tag {
            102 => {
                w.write_start_array(2)?;
                w.write_uint(self.any_constructor.unwrap_or_default())?;
                self.fields.to_cbor(w)
            }
            _ => self.fields.to_cbor(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_constr() {
        // constr 0 with no fields
        let cbor = hex::decode("d87980").unwrap();
        let data = PlutusData::from_cbor_bytes(&cbor).unwrap();

        match &data {
            PlutusData::Constr(c) => {
                assert_eq!(c.constructor(), Some(0));
                assert!(c.fields.is_empty());
            }
            other => panic!("unexpected plutus data: {other:?}"),
        }

        assert_eq!(data.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn nested_data_roundtrip() {
        // constr 1 [42, h'abcd', [-1]]
        let cbor = hex::decode("d87a83182a42abcd8120").unwrap();
        let data = PlutusData::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(data.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn bignum_values() {
        let cbor = hex::decode("c249010000000000000000").unwrap();
        let data = PlutusData::from_cbor_bytes(&cbor).unwrap();

        match &data {
            PlutusData::BigInt(big) => {
                assert_eq!(big.to_big_int(), NumBigInt::from(u64::MAX) + 1)
            }
            other => panic!("unexpected plutus data: {other:?}"),
        }

        assert_eq!(data.to_cbor_bytes().unwrap(), cbor);
    }
}

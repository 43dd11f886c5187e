//! Typed Conway-era ledger objects and their deterministic CBOR codecs.
//!
//! Handcrafted, idiomatic rust artifacts based on the [Conway CDDL](https://github.com/IntersectMBO/cardano-ledger/blob/master/eras/conway/impl/cddl-files/conway.cddl) file in IntersectMBO repo.

mod hash;
mod plutus_data;

pub mod conway;
pub mod scripts;

pub use hash::Hash;
pub use plutus_data::*;

pub use eunomia_codec::utils::{
    Bytes, Int, KeyValuePairs, NonEmptyKeyValuePairs, NonEmptySet, Nullable, Set,
};
pub use eunomia_codec::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

use serde::{Deserialize, Serialize};

/// Blake2b-256 provider injected by the consumer; the library never links a
/// hashing implementation directly.
pub trait Hasher {
    fn blake2b_256(&self, bytes: &[u8]) -> [u8; 32];
}

/// Ed25519 signature provider injected by the consumer, producing witnesses
/// over the 32-byte transaction body hash.
pub trait Ed25519Signer {
    fn public_key(&self) -> [u8; 32];
    fn sign(&self, message: &[u8; 32]) -> [u8; 64];
}

#[cfg(feature = "json")]
pub trait ToCanonicalJson {
    fn to_json(&self) -> serde_json::Value;
}

// ----- Common type definitions

pub type AddrKeyhash = Hash<28>;

pub type Coin = u64;

pub type DatumHash = Hash<32>;

pub type DnsName = String;

pub type Epoch = u64;

pub type Genesishash = Hash<28>;

pub type IPv4 = Bytes;

pub type IPv6 = Bytes;

pub type PolicyId = Hash<28>;

pub type PoolKeyhash = Hash<28>;

pub type PoolMetadataHash = Hash<32>;

pub type Port = u32;

pub type RewardAccount = Bytes;

pub type ScriptHash = Hash<28>;

pub type VrfKeyhash = Hash<32>;

/// Maximum byte length of an anchor url.
pub const MAX_ANCHOR_URL_LENGTH: usize = 128;

/// Maximum byte length of a metadatum text or byte string per ledger rules.
pub const MAX_METADATUM_CHUNK_LENGTH: usize = 64;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl FromCbor for ExUnits {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = ExUnits {
            mem: r.read_uint()?,
            steps: r.read_uint()?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for ExUnits {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        w.write_uint(self.mem)?;
        w.write_uint(self.steps)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ExUnitPrices {
    pub mem_price: PositiveInterval,
    pub step_price: PositiveInterval,
}

impl FromCbor for ExUnitPrices {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = ExUnitPrices {
            mem_price: RationalNumber::from_cbor(r)?,
            step_price: RationalNumber::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for ExUnitPrices {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.mem_price.to_cbor(w)?;
        self.step_price.to_cbor(w)
    }
}

/// CBOR tag marking a rational number.
pub const TAG_RATIONAL: u64 = 30;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct RationalNumber {
    pub numerator: u64,
    pub denominator: u64,
}

pub type PositiveInterval = RationalNumber;

pub type UnitInterval = RationalNumber;

impl RationalNumber {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, Error> {
        if denominator == 0 {
            return Err(Error::invariant("rational denominator must not be zero"));
        }

        Ok(RationalNumber {
            numerator,
            denominator,
        })
    }

    /// A rational constrained to `[0, 1]`, e.g. a pool margin or a voting
    /// threshold.
    pub fn unit_interval(numerator: u64, denominator: u64) -> Result<Self, Error> {
        let out = Self::new(numerator, denominator)?;
        if numerator > denominator {
            return Err(Error::invariant("unit interval numerator exceeds denominator"));
        }

        Ok(out)
    }

    pub fn to_double(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl FromCbor for RationalNumber {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        r.read_tag_expect(TAG_RATIONAL)?;
        let len = r.read_start_array(Some(2))?;
        let numerator = r.read_uint()?;
        let denominator = r.read_uint()?;
        r.read_end_array(len)?;

        if denominator == 0 {
            return Err(Error::invariant("rational denominator must not be zero"));
        }

        Ok(RationalNumber {
            numerator,
            denominator,
        })
    }
}

impl ToCbor for RationalNumber {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_tag(TAG_RATIONAL)?;
        w.write_start_array(2)?;
        w.write_uint(self.numerator)?;
        w.write_uint(self.denominator)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct ProtocolVersion {
    pub major: u64,
    pub minor: u64,
}

impl FromCbor for ProtocolVersion {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = ProtocolVersion {
            major: r.read_uint()?,
            minor: r.read_uint()?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for ProtocolVersion {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        w.write_uint(self.major)?;
        w.write_uint(self.minor)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct Anchor {
    pub url: String,
    pub content_hash: Hash<32>,
}

impl Anchor {
    pub fn new(url: String, content_hash: Hash<32>) -> Result<Self, Error> {
        if url.len() > MAX_ANCHOR_URL_LENGTH {
            return Err(Error::invariant("anchor url exceeds 128 bytes"));
        }

        Ok(Anchor { url, content_hash })
    }
}

impl FromCbor for Anchor {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = Anchor {
            url: r.read_text_string()?,
            content_hash: Hash::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Anchor {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        w.write_text_string(&self.url)?;
        self.content_hash.to_cbor(w)
    }
}

/// A key-hash or script-hash credential, the two ways the ledger identifies
/// an actor.
#[derive(Serialize, Deserialize, Debug, PartialEq, PartialOrd, Eq, Ord, Clone, Copy, Hash)]
pub enum Credential {
    KeyHash(AddrKeyhash),
    ScriptHash(ScriptHash),
}

pub type StakeCredential = Credential;

pub type DRepCredential = Credential;

pub type CommitteeColdCredential = Credential;

pub type CommitteeHotCredential = Credential;

impl Credential {
    pub fn as_key_hash(&self) -> Option<&AddrKeyhash> {
        match self {
            Credential::KeyHash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_script_hash(&self) -> Option<&ScriptHash> {
        match self {
            Credential::ScriptHash(h) => Some(h),
            _ => None,
        }
    }
}

impl FromCbor for Credential {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = match r.read_uint()? {
            0 => Credential::KeyHash(Hash::from_cbor(r)?),
            1 => Credential::ScriptHash(Hash::from_cbor(r)?),
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Credential {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        match self {
            Credential::KeyHash(h) => {
                w.write_uint(0)?;
                h.to_cbor(w)
            }
            Credential::ScriptHash(h) => {
                w.write_uint(1)?;
                h.to_cbor(w)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum NetworkId {
    Testnet,
    Mainnet,
}

impl From<NetworkId> for u8 {
    fn from(network_id: NetworkId) -> u8 {
        match network_id {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }
}

impl TryFrom<u8> for NetworkId {
    type Error = ();

    fn try_from(i: u8) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(Self::Testnet),
            1 => Ok(Self::Mainnet),
            _ => Err(()),
        }
    }
}

impl FromCbor for NetworkId {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.read_uint()? {
            0 => Ok(NetworkId::Testnet),
            1 => Ok(NetworkId::Mainnet),
            variant => Err(Error::UnknownDiscriminator(variant)),
        }
    }
}

impl ToCbor for NetworkId {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_uint(u8::from(*self) as u64)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Relay {
    SingleHostAddr(Nullable<Port>, Nullable<IPv4>, Nullable<IPv6>),
    SingleHostName(Nullable<Port>, DnsName),
    MultiHostName(DnsName),
}

impl FromCbor for Relay {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let out = match r.read_uint()? {
            0 => {
                r.expect_array_len(len, 4)?;
                Relay::SingleHostAddr(
                    Nullable::from_cbor(r)?,
                    Nullable::from_cbor(r)?,
                    Nullable::from_cbor(r)?,
                )
            }
            1 => {
                r.expect_array_len(len, 3)?;
                Relay::SingleHostName(Nullable::from_cbor(r)?, r.read_text_string()?)
            }
            2 => {
                r.expect_array_len(len, 2)?;
                Relay::MultiHostName(r.read_text_string()?)
            }
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Relay {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Relay::SingleHostAddr(port, ipv4, ipv6) => {
                w.write_start_array(4)?;
                w.write_uint(0)?;
                port.to_cbor(w)?;
                ipv4.to_cbor(w)?;
                ipv6.to_cbor(w)
            }
            Relay::SingleHostName(port, dns) => {
                w.write_start_array(3)?;
                w.write_uint(1)?;
                port.to_cbor(w)?;
                w.write_text_string(dns)
            }
            Relay::MultiHostName(dns) => {
                w.write_start_array(2)?;
                w.write_uint(2)?;
                w.write_text_string(dns)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: PoolMetadataHash,
}

impl FromCbor for PoolMetadata {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = PoolMetadata {
            url: r.read_text_string()?,
            hash: Hash::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for PoolMetadata {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        w.write_text_string(&self.url)?;
        self.hash.to_cbor(w)
    }
}

#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, std::hash::Hash,
)]
pub struct TransactionInput {
    pub transaction_id: Hash<32>,
    pub index: u64,
}

impl FromCbor for TransactionInput {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = TransactionInput {
            transaction_id: Hash::from_cbor(r)?,
            index: r.read_uint()?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for TransactionInput {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.transaction_id.to_cbor(w)?;
        w.write_uint(self.index)
    }
}

// ----- Transaction metadata

pub type MetadatumLabel = u64;

pub type Metadata = KeyValuePairs<MetadatumLabel, Metadatum>;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum Metadatum {
    Int(Int),
    Bytes(Bytes),
    Text(String),
    Array(Vec<Metadatum>),
    Map(KeyValuePairs<Metadatum, Metadatum>),
}

impl Metadatum {
    /// Checks the ledger's 64-byte cap on text and byte chunks. Decoding
    /// never enforces this so that any historical metadata round-trips;
    /// builders call it before submission.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Metadatum::Int(_) => Ok(()),
            Metadatum::Bytes(b) => {
                if b.len() > MAX_METADATUM_CHUNK_LENGTH {
                    return Err(Error::invariant("metadatum bytes exceed 64 bytes"));
                }
                Ok(())
            }
            Metadatum::Text(t) => {
                if t.len() > MAX_METADATUM_CHUNK_LENGTH {
                    return Err(Error::invariant("metadatum text exceeds 64 bytes"));
                }
                Ok(())
            }
            Metadatum::Array(xs) => xs.iter().try_for_each(Metadatum::validate),
            Metadatum::Map(kvp) => kvp.iter().try_for_each(|(k, v)| {
                k.validate()?;
                v.validate()
            }),
        }
    }
}

impl FromCbor for Metadatum {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::UnsignedInteger | CborType::NegativeInteger => {
                Ok(Metadatum::Int(Int::from_cbor(r)?))
            }
            CborType::ByteString => Ok(Metadatum::Bytes(Bytes::from_cbor(r)?)),
            CborType::TextString => Ok(Metadatum::Text(r.read_text_string()?)),
            CborType::Array => Ok(Metadatum::Array(Vec::from_cbor(r)?)),
            CborType::Map => Ok(Metadatum::Map(KeyValuePairs::from_cbor(r)?)),
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Map,
                actual,
            }),
        }
    }
}

impl ToCbor for Metadatum {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Metadatum::Int(x) => x.to_cbor(w),
            Metadatum::Bytes(x) => x.to_cbor(w),
            Metadatum::Text(x) => w.write_text_string(x),
            Metadatum::Array(x) => x.to_cbor(w),
            Metadatum::Map(x) => x.to_cbor(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ex_unit_prices_decode_to_expected_rationals() {
        let cbor = hex::decode("82d81e820102d81e820103").unwrap();
        let prices = ExUnitPrices::from_cbor_bytes(&cbor).unwrap();

        assert_eq!(prices.mem_price, RationalNumber::new(1, 2).unwrap());
        assert_eq!(prices.step_price, RationalNumber::new(1, 3).unwrap());
        assert!((prices.mem_price.to_double() - 0.5).abs() < f64::EPSILON);

        assert_eq!(prices.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn unit_interval_bounds() {
        assert_eq!(
            RationalNumber::unit_interval(0, 1).unwrap().to_cbor_hex().unwrap(),
            "d81e820001"
        );
        assert_eq!(
            RationalNumber::unit_interval(1, 1).unwrap().to_cbor_hex().unwrap(),
            "d81e820101"
        );
        assert!(RationalNumber::unit_interval(2, 1).is_err());
        assert!(RationalNumber::new(1, 0).is_err());
    }

    #[test]
    fn credential_cbor_shape() {
        let cbor =
            hex::decode("8200581c00000000000000000000000000000000000000000000000000000000")
                .unwrap();
        let credential = Credential::from_cbor_bytes(&cbor).unwrap();
        assert!(matches!(credential, Credential::KeyHash(_)));
        assert_eq!(credential.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn metadatum_validation_flags_long_text_but_decodes_it() {
        let long = "x".repeat(65);
        let mut w = Writer::new();
        w.write_text_string(&long).unwrap();
        let bytes = w.encoded().unwrap();

        let metadatum = Metadatum::from_cbor_bytes(&bytes).unwrap();
        assert!(metadatum.validate().is_err());
        assert_eq!(metadatum.to_cbor_bytes().unwrap(), bytes);
    }
}

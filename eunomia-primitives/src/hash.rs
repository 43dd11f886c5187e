use std::{fmt, ops::Deref, str::FromStr};

use eunomia_codec::{Error, FromCbor, Reader, ToCbor, Writer};

/// Data that is a cryptographic hash of `BYTES` length.
///
/// Possible values with Cardano are 32 bytes long (block hash, transaction
/// hash, vrf key hash) or 28 bytes long (credentials, policy ids, pool
/// ids). Construction from a slice rejects any other length; equality is
/// byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

impl<const BYTES: usize> Hash<BYTES> {
    #[inline]
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    #[inline]
    fn from(bytes: [u8; BYTES]) -> Self {
        Self::new(bytes)
    }
}

impl<const BYTES: usize> TryFrom<&[u8]> for Hash<BYTES> {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; BYTES] = value
            .try_into()
            .map_err(|_| Error::invariant(format!("expected {BYTES}-byte hash")))?;

        Ok(Self::new(bytes))
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{size}>", size = BYTES))
            .field(&hex::encode(self))
            .finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::new(bytes))
    }
}

impl<const BYTES: usize> FromCbor for Hash<BYTES> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        Hash::try_from(r.read_byte_string()?.as_slice())
    }
}

impl<const BYTES: usize> ToCbor for Hash<BYTES> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_byte_string(&self.0)
    }
}

impl<const BYTES: usize> serde::Serialize for Hash<BYTES> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, const BYTES: usize> serde::Deserialize<'de> for Hash<BYTES> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str() {
        let _digest: Hash<28> = "276fd18711931e2c0e21430192dbeac0e458093cd9d1fcd7210f64b3"
            .parse()
            .unwrap();

        let _digest: Hash<32> = "0d8d00cdd4657ac84d82f0a56067634a7adfdf43da41cb534bcaa45060973d21"
            .parse()
            .unwrap();
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!("27".parse::<Hash<28>>().is_err());

        // a 27-byte string under a 28-byte field
        let cbor = hex::decode("581b276fd18711931e2c0e21430192dbeac0e458093cd9d1fcd7210f").unwrap();
        assert!(Hash::<28>::from_cbor_bytes(&cbor).is_err());
    }

    #[test]
    fn cbor_roundtrip() {
        let cbor = hex::decode("581c276fd18711931e2c0e21430192dbeac0e458093cd9d1fcd7210f64b3")
            .unwrap();
        let digest = Hash::<28>::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(digest.to_cbor_bytes().unwrap(), cbor);
    }
}

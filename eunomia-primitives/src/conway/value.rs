use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eunomia_codec::utils::{Bytes, KeyValuePairs};
use eunomia_codec::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

use crate::{Coin, PolicyId};

/// Maximum byte length of an asset name.
pub const MAX_ASSET_NAME_LENGTH: usize = 32;

/// A native asset name: 0 to 32 arbitrary bytes under a policy id.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
#[serde(transparent)]
pub struct AssetName(Bytes);

impl AssetName {
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl TryFrom<Vec<u8>> for AssetName {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Error> {
        if value.len() > MAX_ASSET_NAME_LENGTH {
            return Err(Error::invariant("asset name exceeds 32 bytes"));
        }

        Ok(AssetName(value.into()))
    }
}

impl FromCbor for AssetName {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        AssetName::try_from(r.read_byte_string()?)
    }
}

impl ToCbor for AssetName {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        self.0.to_cbor(w)
    }
}

/// Policy-then-asset-keyed amounts. The coefficient is signed so the same
/// shape serves mints (negative burns) and outputs (strictly positive); the
/// wire encoding is identical.
pub type Multiasset = KeyValuePairs<PolicyId, KeyValuePairs<AssetName, i64>>;

pub type Mint = Multiasset;

pub(crate) fn check_multiasset(assets: &Multiasset) -> Result<(), Error> {
    if assets.iter().any(|(_, inner)| inner.is_empty()) {
        return Err(Error::invariant("multiasset with an empty inner map"));
    }

    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("value subtraction underflows an asset or the coin")]
    InsufficientFunds,

    #[error("value arithmetic overflows")]
    NumericOverflow,
}

/*
value = coin / [coin, multiasset<positive_coin>]
 */
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Value {
    Coin(Coin),
    Multiasset(Coin, Multiasset),
}

impl Value {
    pub fn zero() -> Self {
        Value::Coin(0)
    }

    pub fn coin(&self) -> Coin {
        match self {
            Value::Coin(coin) => *coin,
            Value::Multiasset(coin, _) => *coin,
        }
    }

    pub fn assets(&self) -> Option<&Multiasset> {
        match self {
            Value::Coin(_) => None,
            Value::Multiasset(_, assets) => Some(assets),
        }
    }

    fn normalized(&self) -> (Coin, BTreeMap<PolicyId, BTreeMap<AssetName, i64>>) {
        let mut out: BTreeMap<PolicyId, BTreeMap<AssetName, i64>> = BTreeMap::new();

        if let Value::Multiasset(_, assets) = self {
            for (policy, inner) in assets.iter() {
                for (name, amount) in inner.iter() {
                    if *amount != 0 {
                        *out.entry(*policy).or_default().entry(name.clone()).or_insert(0) +=
                            amount;
                    }
                }
            }
            out.retain(|_, inner| {
                inner.retain(|_, amount| *amount != 0);
                !inner.is_empty()
            });
        }

        (self.coin(), out)
    }

    fn from_normalized(coin: Coin, assets: BTreeMap<PolicyId, BTreeMap<AssetName, i64>>) -> Self {
        if assets.is_empty() {
            return Value::Coin(coin);
        }

        let assets = assets
            .into_iter()
            .map(|(policy, inner)| (policy, inner.into_iter().collect::<Vec<_>>().into()))
            .collect::<Vec<_>>()
            .into();

        Value::Multiasset(coin, assets)
    }

    /// Drops zero coefficients and empty policies, collapsing to the bare
    /// coin form when no assets remain.
    pub fn canonical(&self) -> Self {
        let (coin, assets) = self.normalized();
        Value::from_normalized(coin, assets)
    }

    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        let coin = self
            .coin()
            .checked_add(other.coin())
            .ok_or(ValueError::NumericOverflow)?;

        let (_, mut assets) = self.normalized();
        for (policy, inner) in other.normalized().1 {
            for (name, amount) in inner {
                let slot = assets.entry(policy).or_default().entry(name).or_insert(0);
                *slot = slot.checked_add(amount).ok_or(ValueError::NumericOverflow)?;
            }
        }
        assets.retain(|_, inner| {
            inner.retain(|_, amount| *amount != 0);
            !inner.is_empty()
        });

        Ok(Value::from_normalized(coin, assets))
    }

    /// Fails with [`ValueError::InsufficientFunds`] if the coin or any asset
    /// would go negative.
    pub fn subtract(&self, other: &Value) -> Result<Value, ValueError> {
        let coin = self
            .coin()
            .checked_sub(other.coin())
            .ok_or(ValueError::InsufficientFunds)?;

        let (_, mut assets) = self.normalized();
        for (policy, inner) in other.normalized().1 {
            for (name, amount) in inner {
                let slot = assets.entry(policy).or_default().entry(name).or_insert(0);
                *slot = slot.checked_sub(amount).ok_or(ValueError::NumericOverflow)?;
                if *slot < 0 {
                    return Err(ValueError::InsufficientFunds);
                }
            }
        }
        assets.retain(|_, inner| {
            inner.retain(|_, amount| *amount != 0);
            !inner.is_empty()
        });

        Ok(Value::from_normalized(coin, assets))
    }
}

// equality is structural after canonicalization: a value with zero
// coefficients or empty inner maps compares equal to its pruned form
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Value {}

impl FromCbor for Value {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::UnsignedInteger => Ok(Value::Coin(r.read_uint()?)),
            CborType::Array => {
                let len = r.read_start_array(Some(2))?;
                let coin = r.read_uint()?;
                let assets = Multiasset::from_cbor(r)?;
                r.read_end_array(len)?;

                check_multiasset(&assets)?;

                Ok(Value::Multiasset(coin, assets))
            }
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Array,
                actual,
            }),
        }
    }
}

impl ToCbor for Value {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Value::Coin(coin) => w.write_uint(*coin),
            Value::Multiasset(coin, assets) if assets.is_empty() => w.write_uint(*coin),
            Value::Multiasset(coin, assets) => {
                w.write_start_array(2)?;
                w.write_uint(*coin)?;
                assets.to_cbor(w)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(n: u8) -> PolicyId {
        PolicyId::new([n; 28])
    }

    fn name(text: &str) -> AssetName {
        AssetName::try_from(text.as_bytes().to_vec()).unwrap()
    }

    fn tokens(coin: Coin, entries: &[(u8, &str, i64)]) -> Value {
        let mut assets: BTreeMap<PolicyId, Vec<(AssetName, i64)>> = BTreeMap::new();
        for (p, n, amount) in entries {
            assets.entry(policy(*p)).or_default().push((name(n), *amount));
        }

        let assets: Vec<_> = assets
            .into_iter()
            .map(|(p, inner)| (p, KeyValuePairs::from(inner)))
            .collect();

        Value::Multiasset(coin, assets.into())
    }

    #[test]
    fn add_merges_assets() {
        let a = tokens(5, &[(1, "tsla", 10)]);
        let b = tokens(7, &[(1, "tsla", 5), (2, "pslc", 1)]);

        let sum = a.add(&b).unwrap();
        assert_eq!(sum, tokens(12, &[(1, "tsla", 15), (2, "pslc", 1)]));
    }

    #[test]
    fn sub_recovers_the_addend() {
        let a = tokens(5, &[(1, "tsla", 10)]);
        let b = tokens(7, &[(2, "pslc", 3)]);

        let sum = a.add(&b).unwrap();
        assert_eq!(sum.subtract(&b).unwrap(), a);
    }

    #[test]
    fn zero_is_the_identity_and_add_commutes() {
        let a = tokens(5, &[(1, "tsla", 10)]);
        let b = tokens(9, &[(1, "tsla", 1)]);

        assert_eq!(a.add(&Value::zero()).unwrap(), a);
        assert_eq!(a.add(&b).unwrap(), b.add(&a).unwrap());
    }

    #[test]
    fn subtraction_underflow_is_insufficient_funds() {
        let a = tokens(5, &[(1, "tsla", 1)]);
        let b = tokens(5, &[(1, "tsla", 2)]);

        assert_eq!(a.subtract(&b), Err(ValueError::InsufficientFunds));
        assert_eq!(Value::Coin(1).subtract(&Value::Coin(2)), Err(ValueError::InsufficientFunds));
    }

    #[test]
    fn equality_ignores_zero_coefficients() {
        let pruned = Value::Coin(5);
        let noisy = tokens(5, &[(1, "tsla", 0)]);
        assert_eq!(pruned, noisy);
    }

    #[test]
    fn empty_assets_encode_as_bare_coin() {
        let value = Value::Multiasset(42, KeyValuePairs::new());
        assert_eq!(value.to_cbor_hex().unwrap(), "182a");
    }

    #[test]
    fn multiasset_value_roundtrip() {
        // the output value of the reference utxo fixture
        let cbor = hex::decode(concat!(
            "821af0078c21a2581c1ec85dcee27f2d90ec1f9a1e4ce74a667dc9be8b184463",
            "223f9c9601a14350584c05581c659f2917fb63f12b33667463ee575eeac1845b",
            "bc736b9c0bbc40ba82a14454534c410a"
        ))
        .unwrap();

        let value = Value::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(value.coin(), 4027025441);
        assert_eq!(value.to_cbor_bytes().unwrap(), cbor);
    }
}

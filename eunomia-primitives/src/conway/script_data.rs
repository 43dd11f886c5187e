use serde::{Deserialize, Serialize};

use eunomia_codec::utils::NonEmptySet;
use eunomia_codec::{Error, ToCbor, Writer};

use super::governance::{CostModel, CostModels};
use super::tx::{Redeemers, WitnessSet};
use crate::{Hash, Hasher, PlutusData};

// Plutus V1 language views reproduce a historical encoding quirk of the
// ledger: the key is the cbor of the integer 0 wrapped in a byte string and
// the value byte-wraps an indefinite-length cost array. Later languages use
// plain canonical pairs. The map orders pairs by encoded key, which puts the
// V1 entry (0x4100) after every small integer key.
fn v1_language_view(costs: &CostModel) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let mut key = Writer::new();
    key.write_byte_string(&0u64.to_cbor_bytes()?)?;

    let mut inner = vec![0x9f];
    for cost in costs {
        inner.extend(cost.to_cbor_bytes()?);
    }
    inner.push(0xff);

    let mut value = Writer::new();
    value.write_byte_string(&inner)?;

    Ok((key.encoded()?, value.encoded()?))
}

fn canonical_language_view(tag: u64, costs: &CostModel) -> Result<(Vec<u8>, Vec<u8>), Error> {
    Ok((tag.to_cbor_bytes()?, costs.to_cbor_bytes()?))
}

/// The exact byte string hashed into `script_data_hash` for the given cost
/// models. This is the sole place the library deliberately emits
/// non-canonical CBOR; anything else would change an on-chain hash.
pub fn language_views_encoding(cost_models: &CostModels) -> Result<Vec<u8>, Error> {
    let mut entries = Vec::new();

    if let Some(costs) = &cost_models.plutus_v1 {
        entries.push(v1_language_view(costs)?);
    }
    if let Some(costs) = &cost_models.plutus_v2 {
        entries.push(canonical_language_view(1, costs)?);
    }
    if let Some(costs) = &cost_models.plutus_v3 {
        entries.push(canonical_language_view(2, costs)?);
    }
    for (tag, costs) in cost_models.unknown.iter() {
        entries.push(canonical_language_view(*tag, costs)?);
    }

    let mut w = Writer::new();
    w.write_sorted_map(entries)?;
    w.encoded()
}

/// The plutus-relevant parts of a transaction, assembled for hashing.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScriptData {
    pub redeemers: Option<Redeemers>,
    pub datums: Option<NonEmptySet<PlutusData>>,
    pub cost_models: Option<CostModels>,
}

impl ScriptData {
    /// Collects redeemers and datums from a witness set. Returns `None` when
    /// the transaction has nothing plutus-relevant, in which case the body
    /// must not carry a script data hash at all. Cost models only
    /// participate when redeemers do.
    pub fn build_for(witness_set: &WitnessSet, cost_models: Option<&CostModels>) -> Option<Self> {
        let redeemers = witness_set.redeemer.clone();
        let datums = witness_set.plutus_data.clone();

        if redeemers.is_none() && datums.is_none() {
            return None;
        }

        let cost_models = if redeemers.is_some() {
            cost_models.cloned()
        } else {
            None
        };

        Some(ScriptData {
            redeemers,
            datums,
            cost_models,
        })
    }

    /// `hash = blake2b_256(encode(redeemers) || encode(datums) ||
    /// language_views)`, each segment contributing nothing when its
    /// component is absent or empty. Returns `None` when every segment is
    /// empty so callers cannot emit a zeroed hash.
    pub fn hash(&self, hasher: &impl Hasher) -> Result<Option<Hash<32>>, Error> {
        let mut preimage = Vec::new();

        if let Some(redeemers) = &self.redeemers {
            if !redeemers.is_empty() {
                preimage.extend(redeemers.to_cbor_bytes()?);
            }
        }

        if let Some(datums) = &self.datums {
            if !datums.is_empty() {
                preimage.extend(datums.to_cbor_bytes()?);
            }
        }

        if let Some(cost_models) = &self.cost_models {
            if !cost_models.is_empty() {
                preimage.extend(language_views_encoding(cost_models)?);
            }
        }

        if preimage.is_empty() {
            return Ok(None);
        }

        Ok(Some(Hash::new(hasher.blake2b_256(&preimage))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conway::{Redeemer, RedeemerTag};
    use crate::scripts::Language;
    use crate::{BigInt, ExUnits};

    struct XorHasher;

    // a stand-in for blake2b that still depends on every input byte
    impl Hasher for XorHasher {
        fn blake2b_256(&self, bytes: &[u8]) -> [u8; 32] {
            let mut out = [0u8; 32];
            for (i, b) in bytes.iter().enumerate() {
                out[i % 32] ^= b;
            }
            out
        }
    }

    #[test]
    fn v1_views_use_the_historical_quirk() {
        let mut models = CostModels::default();
        models.plutus_v1 = Some(vec![3]);
        models.plutus_v2 = Some(vec![1, 2]);

        assert_eq!(
            hex::encode(language_views_encoding(&models).unwrap()),
            "a2018201024100439f03ff"
        );
    }

    #[test]
    fn v2_views_are_canonical() {
        let mut models = CostModels::default();
        models.plutus_v2 = Some(vec![1, 2, 3]);

        assert_eq!(
            hex::encode(language_views_encoding(&models).unwrap()),
            "a10183010203"
        );
    }

    #[test]
    fn empty_script_data_has_no_hash() {
        let script_data = ScriptData {
            redeemers: None,
            datums: None,
            cost_models: None,
        };

        assert_eq!(script_data.hash(&XorHasher).unwrap(), None);
    }

    #[test]
    fn build_for_skips_cost_models_without_redeemers() {
        let datum = PlutusData::BigInt(BigInt::Int(7i64.into()));
        let witness_set = WitnessSet {
            plutus_data: NonEmptySet::try_from(vec![datum]).ok(),
            ..WitnessSet::default()
        };

        let mut models = CostModels::default();
        models.insert(Language::PlutusV2, vec![0; 175]).unwrap();

        let script_data = ScriptData::build_for(&witness_set, Some(&models)).unwrap();
        assert!(script_data.cost_models.is_none());
        assert!(script_data.hash(&XorHasher).unwrap().is_some());
    }

    #[test]
    fn hash_covers_each_present_segment() {
        let redeemers = Redeemers::sorted_list(vec![Redeemer {
            tag: RedeemerTag::Spend,
            index: 0,
            data: PlutusData::BigInt(BigInt::Int(1i64.into())),
            ex_units: ExUnits { mem: 1, steps: 1 },
        }]);

        let with_redeemers = ScriptData {
            redeemers: Some(redeemers),
            datums: None,
            cost_models: None,
        };

        let without = ScriptData {
            redeemers: None,
            datums: None,
            cost_models: None,
        };

        assert_ne!(
            with_redeemers.hash(&XorHasher).unwrap(),
            without.hash(&XorHasher).unwrap()
        );
    }
}

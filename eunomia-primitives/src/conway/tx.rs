use serde::{Deserialize, Serialize};

use eunomia_codec::utils::{
    Bytes, CborWrap, KeyValuePairs, MapEntries, NonEmptyKeyValuePairs, NonEmptySet, Nullable,
    Set,
};
use eunomia_codec::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

use super::certs::Certificate;
use super::governance::{ProposalProcedure, VotingProcedures};
use super::value::{check_multiasset, Multiasset, Value};
use crate::scripts::{NativeScript, PlutusScript, Script};
use crate::{
    AddrKeyhash, Coin, DatumHash, Ed25519Signer, Hash, Hasher, Metadata, NetworkId, PlutusData,
    RewardAccount, TransactionInput,
};

pub type Withdrawals = NonEmptyKeyValuePairs<RewardAccount, Coin>;

pub type RequiredSigners = NonEmptySet<AddrKeyhash>;

/*
transaction_output = shelley_transaction_output / babbage_transaction_output
shelley_transaction_output = [address, amount : value, ? datum_hash : hash32]
babbage_transaction_output =
  { 0 : address, 1 : value, ? 2 : datum_option, ? 3 : script_ref }
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct LegacyTransactionOutput {
    pub address: Bytes,
    pub value: Value,
    pub datum_hash: Option<DatumHash>,
}

impl FromCbor for LegacyTransactionOutput {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let address = Bytes::from_cbor(r)?;
        let value = Value::from_cbor(r)?;

        let datum_hash = match len {
            Some(2) => None,
            Some(3) => Some(Hash::from_cbor(r)?),
            Some(actual) => {
                return Err(Error::InvalidArraySize {
                    expected: 2,
                    actual,
                })
            }
            None => {
                if r.peek_break()? {
                    None
                } else {
                    Some(Hash::from_cbor(r)?)
                }
            }
        };
        r.read_end_array(len)?;

        Ok(LegacyTransactionOutput {
            address,
            value,
            datum_hash,
        })
    }
}

impl ToCbor for LegacyTransactionOutput {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match &self.datum_hash {
            None => {
                w.write_start_array(2)?;
                self.address.to_cbor(w)?;
                self.value.to_cbor(w)
            }
            Some(datum_hash) => {
                w.write_start_array(3)?;
                self.address.to_cbor(w)?;
                self.value.to_cbor(w)?;
                datum_hash.to_cbor(w)
            }
        }
    }
}

pub type ScriptRef = CborWrap<Script>;

// datum_option = [0, $hash32 // 1, data]
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum DatumOption {
    Hash(DatumHash),
    Data(CborWrap<PlutusData>),
}

impl FromCbor for DatumOption {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = match r.read_uint()? {
            0 => DatumOption::Hash(Hash::from_cbor(r)?),
            1 => DatumOption::Data(CborWrap::from_cbor(r)?),
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for DatumOption {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        match self {
            DatumOption::Hash(hash) => {
                w.write_uint(0)?;
                hash.to_cbor(w)
            }
            DatumOption::Data(data) => {
                w.write_uint(1)?;
                data.to_cbor(w)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PostAlonzoTransactionOutput {
    pub address: Bytes,
    pub value: Value,
    pub datum_option: Option<DatumOption>,
    pub script_ref: Option<ScriptRef>,
}

impl FromCbor for PostAlonzoTransactionOutput {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_map(None)?;
        let mut address = None;
        let mut value = None;
        let mut datum_option = None;
        let mut script_ref = None;

        let mut consumed = 0u64;
        while r.has_entries(len, consumed)? {
            consumed += 1;
            match r.read_uint()? {
                0 => address = Some(Bytes::from_cbor(r)?),
                1 => value = Some(Value::from_cbor(r)?),
                2 => datum_option = Some(DatumOption::from_cbor(r)?),
                3 => script_ref = Some(CborWrap::from_cbor(r)?),
                key => return Err(Error::UnknownDiscriminator(key)),
            }
        }
        r.read_end_map(len)?;

        Ok(PostAlonzoTransactionOutput {
            address: address.ok_or_else(|| Error::invariant("output without address"))?,
            value: value.ok_or_else(|| Error::invariant("output without value"))?,
            datum_option,
            script_ref,
        })
    }
}

impl ToCbor for PostAlonzoTransactionOutput {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push(0, &self.address)?;
        entries.push(1, &self.value)?;
        entries.push_opt(2, &self.datum_option)?;
        entries.push_opt(3, &self.script_ref)?;

        entries.write(w)
    }
}

/// A transaction output in either wire form. The array (Shelley) form is
/// chosen for newly built outputs unless an inline datum, a script
/// reference, or an explicit post-Alonzo opt-in calls for the map form.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum TransactionOutput {
    Legacy(LegacyTransactionOutput),
    PostAlonzo(PostAlonzoTransactionOutput),
}

impl TransactionOutput {
    pub fn new(address: Bytes, value: Value) -> Self {
        TransactionOutput::Legacy(LegacyTransactionOutput {
            address,
            value,
            datum_hash: None,
        })
    }

    /// Explicit opt-in to the map (Babbage) form.
    pub fn post_alonzo(address: Bytes, value: Value) -> Self {
        TransactionOutput::PostAlonzo(PostAlonzoTransactionOutput {
            address,
            value,
            datum_option: None,
            script_ref: None,
        })
    }

    fn promote(self) -> PostAlonzoTransactionOutput {
        match self {
            TransactionOutput::Legacy(legacy) => PostAlonzoTransactionOutput {
                address: legacy.address,
                value: legacy.value,
                datum_option: legacy.datum_hash.map(DatumOption::Hash),
                script_ref: None,
            },
            TransactionOutput::PostAlonzo(output) => output,
        }
    }

    pub fn with_datum_hash(self, datum_hash: DatumHash) -> Self {
        match self {
            TransactionOutput::Legacy(mut legacy) => {
                legacy.datum_hash = Some(datum_hash);
                TransactionOutput::Legacy(legacy)
            }
            TransactionOutput::PostAlonzo(mut output) => {
                output.datum_option = Some(DatumOption::Hash(datum_hash));
                TransactionOutput::PostAlonzo(output)
            }
        }
    }

    /// An inline datum forces the map form.
    pub fn with_inline_datum(self, datum: PlutusData) -> Self {
        let mut output = self.promote();
        output.datum_option = Some(DatumOption::Data(CborWrap(datum)));
        TransactionOutput::PostAlonzo(output)
    }

    /// A script reference forces the map form.
    pub fn with_script_ref(self, script: Script) -> Self {
        let mut output = self.promote();
        output.script_ref = Some(CborWrap(script));
        TransactionOutput::PostAlonzo(output)
    }

    pub fn address(&self) -> &Bytes {
        match self {
            TransactionOutput::Legacy(x) => &x.address,
            TransactionOutput::PostAlonzo(x) => &x.address,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            TransactionOutput::Legacy(x) => &x.value,
            TransactionOutput::PostAlonzo(x) => &x.value,
        }
    }
}

impl FromCbor for TransactionOutput {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::Array => Ok(TransactionOutput::Legacy(LegacyTransactionOutput::from_cbor(
                r,
            )?)),
            CborType::Map => Ok(TransactionOutput::PostAlonzo(
                PostAlonzoTransactionOutput::from_cbor(r)?,
            )),
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Map,
                actual,
            }),
        }
    }
}

impl ToCbor for TransactionOutput {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            TransactionOutput::Legacy(x) => x.to_cbor(w),
            TransactionOutput::PostAlonzo(x) => x.to_cbor(w),
        }
    }
}

/// An unspent output: the input pointing at it paired with the output
/// itself.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Utxo {
    pub input: TransactionInput,
    pub output: TransactionOutput,
}

impl FromCbor for Utxo {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = Utxo {
            input: TransactionInput::from_cbor(r)?,
            output: TransactionOutput::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Utxo {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.input.to_cbor(w)?;
        self.output.to_cbor(w)
    }
}

#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash,
)]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
    Vote,
    Propose,
}

impl FromCbor for RedeemerTag {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.read_uint()? {
            0 => Ok(RedeemerTag::Spend),
            1 => Ok(RedeemerTag::Mint),
            2 => Ok(RedeemerTag::Cert),
            3 => Ok(RedeemerTag::Reward),
            4 => Ok(RedeemerTag::Vote),
            5 => Ok(RedeemerTag::Propose),
            variant => Err(Error::UnknownDiscriminator(variant)),
        }
    }
}

impl ToCbor for RedeemerTag {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_uint(match self {
            RedeemerTag::Spend => 0,
            RedeemerTag::Mint => 1,
            RedeemerTag::Cert => 2,
            RedeemerTag::Reward => 3,
            RedeemerTag::Vote => 4,
            RedeemerTag::Propose => 5,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: crate::ExUnits,
}

impl FromCbor for Redeemer {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(4))?;
        let out = Redeemer {
            tag: RedeemerTag::from_cbor(r)?,
            index: u32::from_cbor(r)?,
            data: PlutusData::from_cbor(r)?,
            ex_units: crate::ExUnits::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Redeemer {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(4)?;
        self.tag.to_cbor(w)?;
        w.write_uint(self.index as u64)?;
        self.data.to_cbor(w)?;
        self.ex_units.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, PartialOrd, Ord, Hash)]
pub struct RedeemersKey {
    pub tag: RedeemerTag,
    pub index: u32,
}

impl FromCbor for RedeemersKey {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = RedeemersKey {
            tag: RedeemerTag::from_cbor(r)?,
            index: u32::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for RedeemersKey {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.tag.to_cbor(w)?;
        w.write_uint(self.index as u64)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct RedeemersValue {
    pub data: PlutusData,
    pub ex_units: crate::ExUnits,
}

impl FromCbor for RedeemersValue {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = RedeemersValue {
            data: PlutusData::from_cbor(r)?,
            ex_units: crate::ExUnits::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for RedeemersValue {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.data.to_cbor(w)?;
        self.ex_units.to_cbor(w)
    }
}

/// Script-execution inputs, in either the legacy list form or the Conway
/// map form; the decoded form is preserved on re-encode.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Redeemers {
    List(Vec<Redeemer>),
    Map(KeyValuePairs<RedeemersKey, RedeemersValue>),
}

impl Redeemers {
    /// Builder-facing constructor: orders the list by `(tag, index)`.
    pub fn sorted_list(mut redeemers: Vec<Redeemer>) -> Self {
        redeemers.sort_by(|a, b| (a.tag, a.index).cmp(&(b.tag, b.index)));
        Redeemers::List(redeemers)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Redeemers::List(xs) => xs.is_empty(),
            Redeemers::Map(xs) => xs.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Redeemers::List(xs) => xs.len(),
            Redeemers::Map(xs) => xs.len(),
        }
    }
}

impl FromCbor for Redeemers {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::Array => Ok(Redeemers::List(Vec::from_cbor(r)?)),
            CborType::Map => Ok(Redeemers::Map(KeyValuePairs::from_cbor(r)?)),
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Map,
                actual,
            }),
        }
    }
}

impl ToCbor for Redeemers {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Redeemers::List(xs) => xs.to_cbor(w),
            Redeemers::Map(xs) => xs.to_cbor(w),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct VKeyWitness {
    pub vkey: Bytes,
    pub signature: Bytes,
}

impl VKeyWitness {
    /// Builds the witness for a transaction body hash through the injected
    /// signer.
    pub fn from_signer(signer: &impl Ed25519Signer, message: &Hash<32>) -> Self {
        VKeyWitness {
            vkey: signer.public_key().to_vec().into(),
            signature: signer.sign(message).to_vec().into(),
        }
    }
}

impl FromCbor for VKeyWitness {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = VKeyWitness {
            vkey: Bytes::from_cbor(r)?,
            signature: Bytes::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for VKeyWitness {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.vkey.to_cbor(w)?;
        self.signature.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct BootstrapWitness {
    pub public_key: Bytes,
    pub signature: Bytes,
    pub chain_code: Bytes,
    pub attributes: Bytes,
}

impl FromCbor for BootstrapWitness {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(4))?;
        let out = BootstrapWitness {
            public_key: Bytes::from_cbor(r)?,
            signature: Bytes::from_cbor(r)?,
            chain_code: Bytes::from_cbor(r)?,
            attributes: Bytes::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for BootstrapWitness {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(4)?;
        self.public_key.to_cbor(w)?;
        self.signature.to_cbor(w)?;
        self.chain_code.to_cbor(w)?;
        self.attributes.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct WitnessSet {
    pub vkeywitness: Option<NonEmptySet<VKeyWitness>>,
    pub native_script: Option<NonEmptySet<NativeScript>>,
    pub bootstrap_witness: Option<NonEmptySet<BootstrapWitness>>,
    pub plutus_v1_script: Option<NonEmptySet<PlutusScript<1>>>,
    pub plutus_data: Option<NonEmptySet<PlutusData>>,
    pub redeemer: Option<Redeemers>,
    pub plutus_v2_script: Option<NonEmptySet<PlutusScript<2>>>,
    pub plutus_v3_script: Option<NonEmptySet<PlutusScript<3>>>,
}

impl WitnessSet {
    pub fn add_vkey_witness(&mut self, witness: VKeyWitness) {
        match self.vkeywitness.take() {
            Some(set) => {
                let mut witnesses = set.to_vec();
                witnesses.push(witness);
                self.vkeywitness = NonEmptySet::try_from(witnesses).ok();
            }
            None => self.vkeywitness = NonEmptySet::try_from(vec![witness]).ok(),
        }
    }

    /// Signs the given transaction body hash through the injected signer and
    /// integrates the resulting witness.
    pub fn sign(&mut self, signer: &impl Ed25519Signer, tx_body_hash: &Hash<32>) {
        self.add_vkey_witness(VKeyWitness::from_signer(signer, tx_body_hash));
    }
}

impl FromCbor for WitnessSet {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_map(None)?;
        let mut witness_set = WitnessSet::default();

        let mut consumed = 0u64;
        while r.has_entries(len, consumed)? {
            consumed += 1;
            match r.read_uint()? {
                0 => witness_set.vkeywitness = Some(NonEmptySet::from_cbor(r)?),
                1 => witness_set.native_script = Some(NonEmptySet::from_cbor(r)?),
                2 => witness_set.bootstrap_witness = Some(NonEmptySet::from_cbor(r)?),
                3 => witness_set.plutus_v1_script = Some(NonEmptySet::from_cbor(r)?),
                4 => witness_set.plutus_data = Some(NonEmptySet::from_cbor(r)?),
                5 => witness_set.redeemer = Some(Redeemers::from_cbor(r)?),
                6 => witness_set.plutus_v2_script = Some(NonEmptySet::from_cbor(r)?),
                7 => witness_set.plutus_v3_script = Some(NonEmptySet::from_cbor(r)?),
                key => return Err(Error::UnknownDiscriminator(key)),
            }
        }
        r.read_end_map(len)?;

        Ok(witness_set)
    }
}

impl ToCbor for WitnessSet {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push_opt(0, &self.vkeywitness)?;
        entries.push_opt(1, &self.native_script)?;
        entries.push_opt(2, &self.bootstrap_witness)?;
        entries.push_opt(3, &self.plutus_v1_script)?;
        entries.push_opt(4, &self.plutus_data)?;
        entries.push_opt(5, &self.redeemer)?;
        entries.push_opt(6, &self.plutus_v2_script)?;
        entries.push_opt(7, &self.plutus_v3_script)?;

        entries.write(w)
    }
}

/// CBOR tag marking a post-Alonzo auxiliary data map.
pub const TAG_AUXILIARY_DATA: u64 = 259;

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct PostAlonzoAuxiliaryData {
    pub metadata: Option<Metadata>,
    pub native_scripts: Option<Vec<NativeScript>>,
    pub plutus_v1_scripts: Option<Vec<PlutusScript<1>>>,
    pub plutus_v2_scripts: Option<Vec<PlutusScript<2>>>,
    pub plutus_v3_scripts: Option<Vec<PlutusScript<3>>>,
}

impl PostAlonzoAuxiliaryData {
    fn read_fields(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_map(None)?;
        let mut aux = PostAlonzoAuxiliaryData::default();

        let mut consumed = 0u64;
        while r.has_entries(len, consumed)? {
            consumed += 1;
            match r.read_uint()? {
                0 => aux.metadata = Some(Metadata::from_cbor(r)?),
                1 => aux.native_scripts = Some(Vec::from_cbor(r)?),
                2 => aux.plutus_v1_scripts = Some(Vec::from_cbor(r)?),
                3 => aux.plutus_v2_scripts = Some(Vec::from_cbor(r)?),
                4 => aux.plutus_v3_scripts = Some(Vec::from_cbor(r)?),
                key => return Err(Error::UnknownDiscriminator(key)),
            }
        }
        r.read_end_map(len)?;

        Ok(aux)
    }

    fn write_fields(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push_opt(0, &self.metadata)?;
        entries.push_opt(1, &self.native_scripts)?;
        entries.push_opt(2, &self.plutus_v1_scripts)?;
        entries.push_opt(3, &self.plutus_v2_scripts)?;
        entries.push_opt(4, &self.plutus_v3_scripts)?;

        entries.write(w)
    }
}

/// Transaction auxiliary data in any of its three historical wire forms.
/// Newly built data uses the tagged post-Alonzo map.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum AuxiliaryData {
    Shelley(Metadata),
    ShelleyMa {
        transaction_metadata: Metadata,
        auxiliary_scripts: Vec<NativeScript>,
    },
    PostAlonzo(PostAlonzoAuxiliaryData),
}

impl From<PostAlonzoAuxiliaryData> for AuxiliaryData {
    fn from(aux: PostAlonzoAuxiliaryData) -> Self {
        AuxiliaryData::PostAlonzo(aux)
    }
}

impl FromCbor for AuxiliaryData {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::Map => Ok(AuxiliaryData::Shelley(Metadata::from_cbor(r)?)),
            CborType::Array => {
                let len = r.read_start_array(Some(2))?;
                let out = AuxiliaryData::ShelleyMa {
                    transaction_metadata: Metadata::from_cbor(r)?,
                    auxiliary_scripts: Vec::from_cbor(r)?,
                };
                r.read_end_array(len)?;

                Ok(out)
            }
            CborType::Tag => {
                r.read_tag_expect(TAG_AUXILIARY_DATA)?;
                Ok(AuxiliaryData::PostAlonzo(
                    PostAlonzoAuxiliaryData::read_fields(r)?,
                ))
            }
            actual => Err(Error::UnexpectedCborType {
                expected: CborType::Map,
                actual,
            }),
        }
    }
}

impl ToCbor for AuxiliaryData {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            AuxiliaryData::Shelley(metadata) => metadata.to_cbor(w),
            AuxiliaryData::ShelleyMa {
                transaction_metadata,
                auxiliary_scripts,
            } => {
                w.write_start_array(2)?;
                transaction_metadata.to_cbor(w)?;
                auxiliary_scripts.to_cbor(w)
            }
            AuxiliaryData::PostAlonzo(aux) => {
                w.write_tag(TAG_AUXILIARY_DATA)?;
                aux.write_fields(w)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct TransactionBody {
    pub inputs: Set<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Coin,
    pub ttl: Option<u64>,
    pub certificates: Option<NonEmptySet<Certificate>>,
    pub withdrawals: Option<Withdrawals>,
    pub auxiliary_data_hash: Option<Hash<32>>,
    pub validity_interval_start: Option<u64>,
    pub mint: Option<Multiasset>,
    pub script_data_hash: Option<Hash<32>>,
    pub collateral: Option<NonEmptySet<TransactionInput>>,
    pub required_signers: Option<RequiredSigners>,
    pub network_id: Option<NetworkId>,
    pub collateral_return: Option<TransactionOutput>,
    pub total_collateral: Option<Coin>,
    pub reference_inputs: Option<NonEmptySet<TransactionInput>>,
    pub voting_procedures: Option<VotingProcedures>,
    pub proposal_procedures: Option<NonEmptySet<ProposalProcedure>>,
    pub treasury_value: Option<Coin>,
    pub donation: Option<Coin>,
}

impl TransactionBody {
    pub fn new(inputs: Set<TransactionInput>, outputs: Vec<TransactionOutput>, fee: Coin) -> Self {
        TransactionBody {
            inputs,
            outputs,
            fee,
            ttl: None,
            certificates: None,
            withdrawals: None,
            auxiliary_data_hash: None,
            validity_interval_start: None,
            mint: None,
            script_data_hash: None,
            collateral: None,
            required_signers: None,
            network_id: None,
            collateral_return: None,
            total_collateral: None,
            reference_inputs: None,
            voting_procedures: None,
            proposal_procedures: None,
            treasury_value: None,
            donation: None,
        }
    }

    /// The 32-byte body hash a vkey witness signs, through the injected
    /// hasher.
    pub fn hash(&self, hasher: &impl Hasher) -> Result<Hash<32>, Error> {
        Ok(Hash::new(hasher.blake2b_256(&self.to_cbor_bytes()?)))
    }
}

impl FromCbor for TransactionBody {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_map(None)?;

        let mut inputs = None;
        let mut outputs = None;
        let mut fee = None;
        let mut body = TransactionBody::new(Set::new(), Vec::new(), 0);

        let mut consumed = 0u64;
        while r.has_entries(len, consumed)? {
            consumed += 1;
            match r.read_uint()? {
                0 => inputs = Some(Set::from_cbor(r)?),
                1 => outputs = Some(Vec::from_cbor(r)?),
                2 => fee = Some(r.read_uint()?),
                3 => body.ttl = Some(r.read_uint()?),
                4 => body.certificates = Some(NonEmptySet::from_cbor(r)?),
                5 => body.withdrawals = Some(Withdrawals::from_cbor(r)?),
                7 => body.auxiliary_data_hash = Some(Hash::from_cbor(r)?),
                8 => body.validity_interval_start = Some(r.read_uint()?),
                9 => {
                    let mint = Multiasset::from_cbor(r)?;
                    check_multiasset(&mint)?;
                    body.mint = Some(mint);
                }
                11 => body.script_data_hash = Some(Hash::from_cbor(r)?),
                13 => body.collateral = Some(NonEmptySet::from_cbor(r)?),
                14 => body.required_signers = Some(RequiredSigners::from_cbor(r)?),
                15 => body.network_id = Some(NetworkId::from_cbor(r)?),
                16 => body.collateral_return = Some(TransactionOutput::from_cbor(r)?),
                17 => body.total_collateral = Some(r.read_uint()?),
                18 => body.reference_inputs = Some(NonEmptySet::from_cbor(r)?),
                19 => body.voting_procedures = Some(VotingProcedures::from_cbor(r)?),
                20 => body.proposal_procedures = Some(NonEmptySet::from_cbor(r)?),
                21 => body.treasury_value = Some(r.read_uint()?),
                22 => {
                    let donation = r.read_uint()?;
                    if donation == 0 {
                        return Err(Error::invariant("donation must be a positive coin"));
                    }
                    body.donation = Some(donation);
                }
                key => return Err(Error::UnknownDiscriminator(key)),
            }
        }
        r.read_end_map(len)?;

        body.inputs = inputs.ok_or_else(|| Error::invariant("transaction body without inputs"))?;
        body.outputs =
            outputs.ok_or_else(|| Error::invariant("transaction body without outputs"))?;
        body.fee = fee.ok_or_else(|| Error::invariant("transaction body without fee"))?;

        Ok(body)
    }
}

impl ToCbor for TransactionBody {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push(0, &self.inputs)?;
        entries.push(1, &self.outputs)?;
        entries.push(2, &self.fee)?;
        entries.push_opt(3, &self.ttl)?;
        entries.push_opt(4, &self.certificates)?;
        entries.push_opt(5, &self.withdrawals)?;
        entries.push_opt(7, &self.auxiliary_data_hash)?;
        entries.push_opt(8, &self.validity_interval_start)?;
        entries.push_opt(9, &self.mint)?;
        entries.push_opt(11, &self.script_data_hash)?;
        entries.push_opt(13, &self.collateral)?;
        entries.push_opt(14, &self.required_signers)?;
        entries.push_opt(15, &self.network_id)?;
        entries.push_opt(16, &self.collateral_return)?;
        entries.push_opt(17, &self.total_collateral)?;
        entries.push_opt(18, &self.reference_inputs)?;
        entries.push_opt(19, &self.voting_procedures)?;
        entries.push_opt(20, &self.proposal_procedures)?;
        entries.push_opt(21, &self.treasury_value)?;
        entries.push_opt(22, &self.donation)?;

        entries.write(w)
    }
}

/// A full transaction: body, witnesses, the phase-2 validity flag and
/// optional auxiliary data.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Tx {
    pub transaction_body: TransactionBody,
    pub transaction_witness_set: WitnessSet,
    pub success: bool,
    pub auxiliary_data: Nullable<AuxiliaryData>,
}

impl FromCbor for Tx {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(4))?;
        let out = Tx {
            transaction_body: TransactionBody::from_cbor(r)?,
            transaction_witness_set: WitnessSet::from_cbor(r)?,
            success: r.read_bool()?,
            auxiliary_data: Nullable::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Tx {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(4)?;
        self.transaction_body.to_cbor(w)?;
        self.transaction_witness_set.to_cbor(w)?;
        w.write_bool(self.success)?;
        self.auxiliary_data.to_cbor(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTXO_CBOR: &str = concat!(
        "82825820bb217abaca60fc0ca68c1555eca6a96d2478547818ae76ce6836133f",
        "3cc546e001a200583900287a7e37219128cfb05322626daa8b19d1ad37c6779d",
        "21853f7b94177c16240714ea0e12b41a914f2945784ac494bb19573f0ca61a08",
        "afa801821af0078c21a2581c1ec85dcee27f2d90ec1f9a1e4ce74a667dc9be8b",
        "184463223f9c9601a14350584c05581c659f2917fb63f12b33667463ee575eea",
        "c1845bbc736b9c0bbc40ba82a14454534c410a"
    );

    #[test]
    fn utxo_isomorphic_decoding_encoding() {
        let bytes = hex::decode(UTXO_CBOR).unwrap();
        let utxo = Utxo::from_cbor_bytes(&bytes).unwrap();

        assert_eq!(utxo.input.index, 1);
        assert_eq!(
            utxo.input.transaction_id.to_string(),
            "bb217abaca60fc0ca68c1555eca6a96d2478547818ae76ce6836133f3cc546e0"
        );
        assert!(matches!(utxo.output, TransactionOutput::PostAlonzo(_)));
        assert_eq!(utxo.output.value().coin(), 4027025441);

        assert_eq!(utxo.to_cbor_bytes().unwrap(), bytes);
    }

    #[test]
    fn output_form_selection() {
        let address = Bytes::from(vec![0x01; 29]);

        let plain = TransactionOutput::new(address.clone(), Value::Coin(5));
        assert!(matches!(plain, TransactionOutput::Legacy(_)));

        let hashed = plain.clone().with_datum_hash(Hash::new([9; 32]));
        assert!(matches!(hashed, TransactionOutput::Legacy(_)));

        let inline = plain
            .clone()
            .with_inline_datum(PlutusData::BigInt(crate::BigInt::Int(42i64.into())));
        assert!(matches!(inline, TransactionOutput::PostAlonzo(_)));

        let opted_in = TransactionOutput::post_alonzo(address, Value::Coin(5));
        assert!(matches!(opted_in, TransactionOutput::PostAlonzo(_)));
    }

    #[test]
    fn legacy_output_with_datum_hash_roundtrip() {
        let output = TransactionOutput::new(Bytes::from(vec![0x01; 29]), Value::Coin(5))
            .with_datum_hash(Hash::new([9; 32]));

        let bytes = output.to_cbor_bytes().unwrap();
        assert_eq!(TransactionOutput::from_cbor_bytes(&bytes).unwrap(), output);
    }

    #[test]
    fn redeemers_sorted_list_orders_by_tag_then_index() {
        let redeemer = |tag, index| Redeemer {
            tag,
            index,
            data: PlutusData::BigInt(crate::BigInt::Int(0i64.into())),
            ex_units: crate::ExUnits { mem: 1, steps: 2 },
        };

        let redeemers = Redeemers::sorted_list(vec![
            redeemer(RedeemerTag::Mint, 0),
            redeemer(RedeemerTag::Spend, 7),
            redeemer(RedeemerTag::Spend, 2),
        ]);

        match &redeemers {
            Redeemers::List(xs) => {
                let order: Vec<_> = xs.iter().map(|x| (x.tag, x.index)).collect();
                assert_eq!(
                    order,
                    vec![
                        (RedeemerTag::Spend, 2),
                        (RedeemerTag::Spend, 7),
                        (RedeemerTag::Mint, 0),
                    ]
                );
            }
            other => panic!("unexpected redeemers: {other:?}"),
        }
    }

    #[test]
    fn minimal_transaction_roundtrip() {
        let input = TransactionInput {
            transaction_id: Hash::new([7; 32]),
            index: 0,
        };
        let output = TransactionOutput::new(Bytes::from(vec![0x01; 29]), Value::Coin(1000000));

        let body = TransactionBody::new(vec![input].into(), vec![output], 170000);
        let tx = Tx {
            transaction_body: body,
            transaction_witness_set: WitnessSet::default(),
            success: true,
            auxiliary_data: Nullable::Null,
        };

        let bytes = tx.to_cbor_bytes().unwrap();
        let decoded = Tx::from_cbor_bytes(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.to_cbor_bytes().unwrap(), bytes);
    }

    #[test]
    fn witness_set_signing_integrates_a_witness() {
        struct FakeSigner;

        impl Ed25519Signer for FakeSigner {
            fn public_key(&self) -> [u8; 32] {
                [3; 32]
            }

            fn sign(&self, message: &[u8; 32]) -> [u8; 64] {
                let mut out = [0; 64];
                out[..32].copy_from_slice(message);
                out[32..].copy_from_slice(&[5; 32]);
                out
            }
        }

        let mut witness_set = WitnessSet::default();
        witness_set.sign(&FakeSigner, &Hash::new([8; 32]));

        let witnesses = witness_set.vkeywitness.expect("witness missing");
        assert_eq!(witnesses.len(), 1);
        assert_eq!(witnesses[0].vkey.as_slice(), [3u8; 32].as_slice());
        assert_eq!(&witnesses[0].signature.as_slice()[..32], [8u8; 32].as_slice());
    }

    #[test]
    fn auxiliary_data_forms_roundtrip() {
        // shelley: bare metadata map {674: "hello"}
        let shelley = hex::decode("a11902a26568656c6c6f").unwrap();
        let aux = AuxiliaryData::from_cbor_bytes(&shelley).unwrap();
        assert!(matches!(aux, AuxiliaryData::Shelley(_)));
        assert_eq!(aux.to_cbor_bytes().unwrap(), shelley);

        // shelley-ma: [metadata, scripts]
        let shelley_ma = hex::decode("82a11902a26568656c6c6f80").unwrap();
        let aux = AuxiliaryData::from_cbor_bytes(&shelley_ma).unwrap();
        assert!(matches!(aux, AuxiliaryData::ShelleyMa { .. }));
        assert_eq!(aux.to_cbor_bytes().unwrap(), shelley_ma);

        // post-alonzo: tag 259 map
        let post_alonzo = hex::decode("d90103a100a11902a26568656c6c6f").unwrap();
        let aux = AuxiliaryData::from_cbor_bytes(&post_alonzo).unwrap();
        assert!(matches!(aux, AuxiliaryData::PostAlonzo(_)));
        assert_eq!(aux.to_cbor_bytes().unwrap(), post_alonzo);
    }
}

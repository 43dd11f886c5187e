use serde::{Deserialize, Serialize};

use eunomia_codec::utils::{KeyValuePairs, MapEntries, Nullable, Set};
use eunomia_codec::{Error, FromCbor, Reader, ToCbor, Writer};

use crate::scripts::Language;
use crate::{
    AddrKeyhash, Anchor, Coin, CommitteeColdCredential, Epoch, ExUnitPrices, ExUnits, Genesishash,
    Hash, ProtocolVersion, RationalNumber, RewardAccount, ScriptHash, UnitInterval,
};

pub type CostModel = Vec<i64>;

/// Expected operation counts per plutus language, used by the checked
/// [`CostModels`] insertion API. Raw protocol-parameter decoding stays
/// lenient so historical data is never rejected.
pub const COST_MODEL_SIZES: [(Language, usize); 3] = [
    (Language::PlutusV1, 166),
    (Language::PlutusV2, 175),
    (Language::PlutusV3, 251),
];

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct CostModels {
    pub plutus_v1: Option<CostModel>,
    pub plutus_v2: Option<CostModel>,
    pub plutus_v3: Option<CostModel>,
    pub unknown: KeyValuePairs<u64, CostModel>,
}

impl CostModels {
    pub fn is_empty(&self) -> bool {
        self.plutus_v1.is_none()
            && self.plutus_v2.is_none()
            && self.plutus_v3.is_none()
            && self.unknown.is_empty()
    }

    /// Validated insertion: the cost array must carry the exact operation
    /// count the language defines.
    pub fn insert(&mut self, language: Language, costs: CostModel) -> Result<(), Error> {
        let expected = COST_MODEL_SIZES
            .iter()
            .find(|(l, _)| *l == language)
            .map(|(_, n)| *n)
            .unwrap_or_default();

        if costs.len() != expected {
            return Err(Error::invariant(format!(
                "cost model for {language:?} expects {expected} operations, got {}",
                costs.len()
            )));
        }

        match language {
            Language::PlutusV1 => self.plutus_v1 = Some(costs),
            Language::PlutusV2 => self.plutus_v2 = Some(costs),
            Language::PlutusV3 => self.plutus_v3 = Some(costs),
        }

        Ok(())
    }

    pub fn get(&self, language: Language) -> Option<&CostModel> {
        match language {
            Language::PlutusV1 => self.plutus_v1.as_ref(),
            Language::PlutusV2 => self.plutus_v2.as_ref(),
            Language::PlutusV3 => self.plutus_v3.as_ref(),
        }
    }
}

impl FromCbor for CostModels {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let models = KeyValuePairs::<u64, CostModel>::from_cbor(r)?;

        let mut out = CostModels::default();
        let mut unknown = Vec::new();

        for (key, costs) in models.to_vec() {
            match key {
                0 => out.plutus_v1 = Some(costs),
                1 => out.plutus_v2 = Some(costs),
                2 => out.plutus_v3 = Some(costs),
                _ => unknown.push((key, costs)),
            }
        }

        out.unknown = unknown.into();
        Ok(out)
    }
}

impl ToCbor for CostModels {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push_opt(0, &self.plutus_v1)?;
        entries.push_opt(1, &self.plutus_v2)?;
        entries.push_opt(2, &self.plutus_v3)?;
        for (key, costs) in self.unknown.iter() {
            entries.push(*key, costs)?;
        }

        entries.write(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PoolVotingThresholds {
    pub motion_no_confidence: UnitInterval,
    pub committee_normal: UnitInterval,
    pub committee_no_confidence: UnitInterval,
    pub hard_fork_initiation: UnitInterval,
    pub security_voting_threshold: UnitInterval,
}

impl FromCbor for PoolVotingThresholds {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(5))?;
        let out = PoolVotingThresholds {
            motion_no_confidence: UnitInterval::from_cbor(r)?,
            committee_normal: UnitInterval::from_cbor(r)?,
            committee_no_confidence: UnitInterval::from_cbor(r)?,
            hard_fork_initiation: UnitInterval::from_cbor(r)?,
            security_voting_threshold: UnitInterval::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for PoolVotingThresholds {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(5)?;
        self.motion_no_confidence.to_cbor(w)?;
        self.committee_normal.to_cbor(w)?;
        self.committee_no_confidence.to_cbor(w)?;
        self.hard_fork_initiation.to_cbor(w)?;
        self.security_voting_threshold.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct DRepVotingThresholds {
    pub motion_no_confidence: UnitInterval,
    pub committee_normal: UnitInterval,
    pub committee_no_confidence: UnitInterval,
    pub update_constitution: UnitInterval,
    pub hard_fork_initiation: UnitInterval,
    pub pp_network_group: UnitInterval,
    pub pp_economic_group: UnitInterval,
    pub pp_technical_group: UnitInterval,
    pub pp_governance_group: UnitInterval,
    pub treasury_withdrawal: UnitInterval,
}

impl FromCbor for DRepVotingThresholds {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(10))?;
        let out = DRepVotingThresholds {
            motion_no_confidence: UnitInterval::from_cbor(r)?,
            committee_normal: UnitInterval::from_cbor(r)?,
            committee_no_confidence: UnitInterval::from_cbor(r)?,
            update_constitution: UnitInterval::from_cbor(r)?,
            hard_fork_initiation: UnitInterval::from_cbor(r)?,
            pp_network_group: UnitInterval::from_cbor(r)?,
            pp_economic_group: UnitInterval::from_cbor(r)?,
            pp_technical_group: UnitInterval::from_cbor(r)?,
            pp_governance_group: UnitInterval::from_cbor(r)?,
            treasury_withdrawal: UnitInterval::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for DRepVotingThresholds {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(10)?;
        self.motion_no_confidence.to_cbor(w)?;
        self.committee_normal.to_cbor(w)?;
        self.committee_no_confidence.to_cbor(w)?;
        self.update_constitution.to_cbor(w)?;
        self.hard_fork_initiation.to_cbor(w)?;
        self.pp_network_group.to_cbor(w)?;
        self.pp_economic_group.to_cbor(w)?;
        self.pp_technical_group.to_cbor(w)?;
        self.pp_governance_group.to_cbor(w)?;
        self.treasury_withdrawal.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ProtocolParamUpdate {
    pub minfee_a: Option<u64>,
    pub minfee_b: Option<u64>,
    pub max_block_body_size: Option<u64>,
    pub max_transaction_size: Option<u64>,
    pub max_block_header_size: Option<u64>,
    pub key_deposit: Option<Coin>,
    pub pool_deposit: Option<Coin>,
    pub maximum_epoch: Option<Epoch>,
    pub desired_number_of_stake_pools: Option<u64>,
    pub pool_pledge_influence: Option<RationalNumber>,
    pub expansion_rate: Option<UnitInterval>,
    pub treasury_growth_rate: Option<UnitInterval>,
    pub min_pool_cost: Option<Coin>,
    pub ada_per_utxo_byte: Option<Coin>,
    pub cost_models_for_script_languages: Option<CostModels>,
    pub execution_costs: Option<ExUnitPrices>,
    pub max_tx_ex_units: Option<ExUnits>,
    pub max_block_ex_units: Option<ExUnits>,
    pub max_value_size: Option<u64>,
    pub collateral_percentage: Option<u64>,
    pub max_collateral_inputs: Option<u64>,
    pub pool_voting_thresholds: Option<PoolVotingThresholds>,
    pub drep_voting_thresholds: Option<DRepVotingThresholds>,
    pub min_committee_size: Option<u64>,
    pub committee_term_limit: Option<Epoch>,
    pub governance_action_validity_period: Option<Epoch>,
    pub governance_action_deposit: Option<Coin>,
    pub drep_deposit: Option<Coin>,
    pub drep_inactivity_period: Option<Epoch>,
    pub minfee_refscript_cost_per_byte: Option<UnitInterval>,
}

impl FromCbor for ProtocolParamUpdate {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_map(None)?;
        let mut update = ProtocolParamUpdate::default();

        let mut consumed = 0u64;
        while r.has_entries(len, consumed)? {
            consumed += 1;
            match r.read_uint()? {
                0 => update.minfee_a = Some(r.read_uint()?),
                1 => update.minfee_b = Some(r.read_uint()?),
                2 => update.max_block_body_size = Some(r.read_uint()?),
                3 => update.max_transaction_size = Some(r.read_uint()?),
                4 => update.max_block_header_size = Some(r.read_uint()?),
                5 => update.key_deposit = Some(r.read_uint()?),
                6 => update.pool_deposit = Some(r.read_uint()?),
                7 => update.maximum_epoch = Some(r.read_uint()?),
                8 => update.desired_number_of_stake_pools = Some(r.read_uint()?),
                9 => update.pool_pledge_influence = Some(RationalNumber::from_cbor(r)?),
                10 => update.expansion_rate = Some(UnitInterval::from_cbor(r)?),
                11 => update.treasury_growth_rate = Some(UnitInterval::from_cbor(r)?),
                16 => update.min_pool_cost = Some(r.read_uint()?),
                17 => update.ada_per_utxo_byte = Some(r.read_uint()?),
                18 => {
                    update.cost_models_for_script_languages = Some(CostModels::from_cbor(r)?)
                }
                19 => update.execution_costs = Some(ExUnitPrices::from_cbor(r)?),
                20 => update.max_tx_ex_units = Some(ExUnits::from_cbor(r)?),
                21 => update.max_block_ex_units = Some(ExUnits::from_cbor(r)?),
                22 => update.max_value_size = Some(r.read_uint()?),
                23 => update.collateral_percentage = Some(r.read_uint()?),
                24 => update.max_collateral_inputs = Some(r.read_uint()?),
                25 => update.pool_voting_thresholds = Some(PoolVotingThresholds::from_cbor(r)?),
                26 => update.drep_voting_thresholds = Some(DRepVotingThresholds::from_cbor(r)?),
                27 => update.min_committee_size = Some(r.read_uint()?),
                28 => update.committee_term_limit = Some(r.read_uint()?),
                29 => update.governance_action_validity_period = Some(r.read_uint()?),
                30 => update.governance_action_deposit = Some(r.read_uint()?),
                31 => update.drep_deposit = Some(r.read_uint()?),
                32 => update.drep_inactivity_period = Some(r.read_uint()?),
                33 => update.minfee_refscript_cost_per_byte = Some(UnitInterval::from_cbor(r)?),
                key => return Err(Error::UnknownDiscriminator(key)),
            }
        }
        r.read_end_map(len)?;

        Ok(update)
    }
}

impl ToCbor for ProtocolParamUpdate {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        let mut entries = MapEntries::new();
        entries.push_opt(0, &self.minfee_a)?;
        entries.push_opt(1, &self.minfee_b)?;
        entries.push_opt(2, &self.max_block_body_size)?;
        entries.push_opt(3, &self.max_transaction_size)?;
        entries.push_opt(4, &self.max_block_header_size)?;
        entries.push_opt(5, &self.key_deposit)?;
        entries.push_opt(6, &self.pool_deposit)?;
        entries.push_opt(7, &self.maximum_epoch)?;
        entries.push_opt(8, &self.desired_number_of_stake_pools)?;
        entries.push_opt(9, &self.pool_pledge_influence)?;
        entries.push_opt(10, &self.expansion_rate)?;
        entries.push_opt(11, &self.treasury_growth_rate)?;
        entries.push_opt(16, &self.min_pool_cost)?;
        entries.push_opt(17, &self.ada_per_utxo_byte)?;
        entries.push_opt(18, &self.cost_models_for_script_languages)?;
        entries.push_opt(19, &self.execution_costs)?;
        entries.push_opt(20, &self.max_tx_ex_units)?;
        entries.push_opt(21, &self.max_block_ex_units)?;
        entries.push_opt(22, &self.max_value_size)?;
        entries.push_opt(23, &self.collateral_percentage)?;
        entries.push_opt(24, &self.max_collateral_inputs)?;
        entries.push_opt(25, &self.pool_voting_thresholds)?;
        entries.push_opt(26, &self.drep_voting_thresholds)?;
        entries.push_opt(27, &self.min_committee_size)?;
        entries.push_opt(28, &self.committee_term_limit)?;
        entries.push_opt(29, &self.governance_action_validity_period)?;
        entries.push_opt(30, &self.governance_action_deposit)?;
        entries.push_opt(31, &self.drep_deposit)?;
        entries.push_opt(32, &self.drep_inactivity_period)?;
        entries.push_opt(33, &self.minfee_refscript_cost_per_byte)?;

        entries.write(w)
    }
}

/// Pre-Conway protocol-parameter update envelope, kept so historical update
/// proposals remain decodable.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Update {
    pub proposed_protocol_parameter_updates: KeyValuePairs<Genesishash, ProtocolParamUpdate>,
    pub epoch: Epoch,
}

impl FromCbor for Update {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = Update {
            proposed_protocol_parameter_updates: KeyValuePairs::from_cbor(r)?,
            epoch: r.read_uint()?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Update {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.proposed_protocol_parameter_updates.to_cbor(w)?;
        w.write_uint(self.epoch)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Vote {
    No,
    Yes,
    Abstain,
}

impl FromCbor for Vote {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.read_uint()? {
            0 => Ok(Vote::No),
            1 => Ok(Vote::Yes),
            2 => Ok(Vote::Abstain),
            variant => Err(Error::UnknownDiscriminator(variant)),
        }
    }
}

impl ToCbor for Vote {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_uint(match self {
            Vote::No => 0,
            Vote::Yes => 1,
            Vote::Abstain => 2,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, PartialOrd, Ord, Hash)]
pub struct GovActionId {
    pub transaction_id: Hash<32>,
    pub action_index: u64,
}

impl FromCbor for GovActionId {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = GovActionId {
            transaction_id: Hash::from_cbor(r)?,
            action_index: r.read_uint()?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for GovActionId {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.transaction_id.to_cbor(w)?;
        w.write_uint(self.action_index)
    }
}

/// The five ballot-casting roles. The derived order is `(type tag, hash)`,
/// which coincides with the byte order of the encodings and therefore with
/// the canonical key order of the voting-procedures map.
#[derive(Serialize, Deserialize, Debug, PartialEq, PartialOrd, Eq, Ord, Clone, Copy, Hash)]
pub enum Voter {
    ConstitutionalCommitteeKey(AddrKeyhash),
    ConstitutionalCommitteeScript(ScriptHash),
    DRepKey(AddrKeyhash),
    DRepScript(ScriptHash),
    StakePoolKey(AddrKeyhash),
}

impl Voter {
    pub fn hash(&self) -> &Hash<28> {
        match self {
            Voter::ConstitutionalCommitteeKey(h)
            | Voter::ConstitutionalCommitteeScript(h)
            | Voter::DRepKey(h)
            | Voter::DRepScript(h)
            | Voter::StakePoolKey(h) => h,
        }
    }
}

impl FromCbor for Voter {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = match r.read_uint()? {
            0 => Voter::ConstitutionalCommitteeKey(Hash::from_cbor(r)?),
            1 => Voter::ConstitutionalCommitteeScript(Hash::from_cbor(r)?),
            2 => Voter::DRepKey(Hash::from_cbor(r)?),
            3 => Voter::DRepScript(Hash::from_cbor(r)?),
            4 => Voter::StakePoolKey(Hash::from_cbor(r)?),
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Voter {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        let (tag, hash) = match self {
            Voter::ConstitutionalCommitteeKey(h) => (0, h),
            Voter::ConstitutionalCommitteeScript(h) => (1, h),
            Voter::DRepKey(h) => (2, h),
            Voter::DRepScript(h) => (3, h),
            Voter::StakePoolKey(h) => (4, h),
        };
        w.write_uint(tag)?;
        hash.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct VotingProcedure {
    pub vote: Vote,
    pub anchor: Nullable<Anchor>,
}

impl FromCbor for VotingProcedure {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = VotingProcedure {
            vote: Vote::from_cbor(r)?,
            anchor: Nullable::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for VotingProcedure {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.vote.to_cbor(w)?;
        self.anchor.to_cbor(w)
    }
}

/// Ballots by voter, then by governance action. No voter key ever maps to
/// an empty inner map; both nesting levels encode in canonical key order.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(transparent)]
pub struct VotingProcedures(
    KeyValuePairs<Voter, KeyValuePairs<GovActionId, VotingProcedure>>,
);

impl VotingProcedures {
    pub fn new() -> Self {
        VotingProcedures::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, voter: Voter, action_id: GovActionId, procedure: VotingProcedure) {
        match self.0.iter().position(|(v, _)| *v == voter) {
            Some(slot) => {
                let mut pairs = std::mem::take(&mut self.0).to_vec();
                pairs[slot].1.push(action_id, procedure);
                self.0 = pairs.into();
            }
            None => {
                let inner = KeyValuePairs::from(vec![(action_id, procedure)]);
                self.0.push(voter, inner);
            }
        }
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = &(Voter, KeyValuePairs<GovActionId, VotingProcedure>)> {
        self.0.iter()
    }
}

impl FromCbor for VotingProcedures {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let outer =
            KeyValuePairs::<Voter, KeyValuePairs<GovActionId, VotingProcedure>>::from_cbor(r)?;

        if outer.iter().any(|(_, inner)| inner.is_empty()) {
            return Err(Error::invariant("voter maps to an empty ballot map"));
        }

        Ok(VotingProcedures(outer))
    }
}

impl ToCbor for VotingProcedures {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        if self.0.iter().any(|(_, inner)| inner.is_empty()) {
            return Err(Error::invariant("voter maps to an empty ballot map"));
        }

        self.0.to_cbor(w)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Constitution {
    pub anchor: Anchor,
    pub guardrail_script: Nullable<ScriptHash>,
}

impl FromCbor for Constitution {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = Constitution {
            anchor: Anchor::from_cbor(r)?,
            guardrail_script: Nullable::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Constitution {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.anchor.to_cbor(w)?;
        self.guardrail_script.to_cbor(w)
    }
}

/// The seven governance action kinds. Where an action replaces a previously
/// enacted one of the same kind, it carries that action's id.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum GovAction {
    ParameterChange(
        Nullable<GovActionId>,
        Box<ProtocolParamUpdate>,
        Nullable<ScriptHash>,
    ),
    HardForkInitiation(Nullable<GovActionId>, ProtocolVersion),
    TreasuryWithdrawals(KeyValuePairs<RewardAccount, Coin>, Nullable<ScriptHash>),
    NoConfidence(Nullable<GovActionId>),
    UpdateCommittee(
        Nullable<GovActionId>,
        Set<CommitteeColdCredential>,
        KeyValuePairs<CommitteeColdCredential, Epoch>,
        UnitInterval,
    ),
    NewConstitution(Nullable<GovActionId>, Constitution),
    Information,
}

impl GovAction {
    /// The id of the previously enacted action this one supersedes, for the
    /// kinds that chain.
    pub fn previous_action_id(&self) -> Option<&GovActionId> {
        let id = match self {
            GovAction::ParameterChange(id, _, _)
            | GovAction::HardForkInitiation(id, _)
            | GovAction::NoConfidence(id)
            | GovAction::UpdateCommittee(id, _, _, _)
            | GovAction::NewConstitution(id, _) => id,
            GovAction::TreasuryWithdrawals(_, _) | GovAction::Information => return None,
        };

        match id {
            Nullable::Some(id) => Some(id),
            _ => None,
        }
    }
}

impl FromCbor for GovAction {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let out = match r.read_uint()? {
            0 => {
                r.expect_array_len(len, 4)?;
                GovAction::ParameterChange(
                    Nullable::from_cbor(r)?,
                    Box::new(ProtocolParamUpdate::from_cbor(r)?),
                    Nullable::from_cbor(r)?,
                )
            }
            1 => {
                r.expect_array_len(len, 3)?;
                GovAction::HardForkInitiation(
                    Nullable::from_cbor(r)?,
                    ProtocolVersion::from_cbor(r)?,
                )
            }
            2 => {
                r.expect_array_len(len, 3)?;
                GovAction::TreasuryWithdrawals(
                    KeyValuePairs::from_cbor(r)?,
                    Nullable::from_cbor(r)?,
                )
            }
            3 => {
                r.expect_array_len(len, 2)?;
                GovAction::NoConfidence(Nullable::from_cbor(r)?)
            }
            4 => {
                r.expect_array_len(len, 5)?;
                GovAction::UpdateCommittee(
                    Nullable::from_cbor(r)?,
                    Set::from_cbor(r)?,
                    KeyValuePairs::from_cbor(r)?,
                    UnitInterval::from_cbor(r)?,
                )
            }
            5 => {
                r.expect_array_len(len, 3)?;
                GovAction::NewConstitution(Nullable::from_cbor(r)?, Constitution::from_cbor(r)?)
            }
            6 => {
                r.expect_array_len(len, 1)?;
                GovAction::Information
            }
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for GovAction {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            GovAction::ParameterChange(id, update, policy) => {
                w.write_start_array(4)?;
                w.write_uint(0)?;
                id.to_cbor(w)?;
                update.as_ref().to_cbor(w)?;
                policy.to_cbor(w)
            }
            GovAction::HardForkInitiation(id, version) => {
                w.write_start_array(3)?;
                w.write_uint(1)?;
                id.to_cbor(w)?;
                version.to_cbor(w)
            }
            GovAction::TreasuryWithdrawals(withdrawals, policy) => {
                w.write_start_array(3)?;
                w.write_uint(2)?;
                withdrawals.to_cbor(w)?;
                policy.to_cbor(w)
            }
            GovAction::NoConfidence(id) => {
                w.write_start_array(2)?;
                w.write_uint(3)?;
                id.to_cbor(w)
            }
            GovAction::UpdateCommittee(id, removed, added, threshold) => {
                w.write_start_array(5)?;
                w.write_uint(4)?;
                id.to_cbor(w)?;
                removed.to_cbor(w)?;
                added.to_cbor(w)?;
                threshold.to_cbor(w)
            }
            GovAction::NewConstitution(id, constitution) => {
                w.write_start_array(3)?;
                w.write_uint(5)?;
                id.to_cbor(w)?;
                constitution.to_cbor(w)
            }
            GovAction::Information => {
                w.write_start_array(1)?;
                w.write_uint(6)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ProposalProcedure {
    pub deposit: Coin,
    pub reward_account: RewardAccount,
    pub gov_action: GovAction,
    pub anchor: Anchor,
}

impl FromCbor for ProposalProcedure {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(4))?;
        let out = ProposalProcedure {
            deposit: r.read_uint()?,
            reward_account: RewardAccount::from_cbor(r)?,
            gov_action: GovAction::from_cbor(r)?,
            anchor: Anchor::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for ProposalProcedure {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(4)?;
        w.write_uint(self.deposit)?;
        self.reward_account.to_cbor(w)?;
        self.gov_action.to_cbor(w)?;
        self.anchor.to_cbor(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;
    use test_case::test_case;

    fn fake_hash(prefix: &str) -> Hash<28> {
        let null_hash: [u8; 28] = [0; 28];
        Hash::try_from(&[prefix.as_bytes(), &null_hash].concat()[0..28]).unwrap()
    }

    fn cc_key(prefix: &str) -> Voter {
        Voter::ConstitutionalCommitteeKey(fake_hash(prefix))
    }

    fn cc_script(prefix: &str) -> Voter {
        Voter::ConstitutionalCommitteeScript(fake_hash(prefix))
    }

    fn drep_key(prefix: &str) -> Voter {
        Voter::DRepKey(fake_hash(prefix))
    }

    fn drep_script(prefix: &str) -> Voter {
        Voter::DRepScript(fake_hash(prefix))
    }

    fn spo(prefix: &str) -> Voter {
        Voter::StakePoolKey(fake_hash(prefix))
    }

    #[test_case(cc_key("alice"), cc_key("alice") => Ordering::Equal)]
    #[test_case(cc_key("alice"), cc_script("alice") => Ordering::Less)]
    #[test_case(cc_key("alice"), drep_key("alice") => Ordering::Less)]
    #[test_case(cc_script("alice"), drep_key("alice") => Ordering::Less)]
    #[test_case(cc_key("bob"), cc_key("alice") => Ordering::Greater)]
    #[test_case(drep_script("alice"), drep_key("alice") => Ordering::Greater)]
    #[test_case(drep_script("alice"), spo("alice") => Ordering::Less)]
    #[test_case(spo("alice"), drep_key("bob") => Ordering::Greater)]
    fn voter_ordering(left: Voter, right: Voter) -> Ordering {
        left.cmp(&right)
    }

    #[test]
    fn voter_order_matches_encoded_byte_order() {
        let voters = [
            cc_key("a"),
            cc_script("a"),
            drep_key("b"),
            drep_script("a"),
            spo("z"),
        ];

        for left in &voters {
            for right in &voters {
                let bytes_order = left
                    .to_cbor_bytes()
                    .unwrap()
                    .cmp(&right.to_cbor_bytes().unwrap());
                assert_eq!(left.cmp(right), bytes_order);
            }
        }
    }

    #[test]
    fn voter_comparator_on_reference_vectors() {
        let zero =
            Voter::from_cbor_hex("8200581c00000000000000000000000000000000000000000000000000000000")
                .unwrap();
        let same =
            Voter::from_cbor_hex("8200581c00000000000000000000000000000000000000000000000000000000")
                .unwrap();
        let one =
            Voter::from_cbor_hex("8200581c00000000000000000000000000000000000000000000000000000001")
                .unwrap();

        assert_eq!(zero, same);
        assert_eq!(one.cmp(&zero), Ordering::Greater);
    }

    #[test]
    fn voting_procedures_reject_empty_inner_map() {
        let outer: KeyValuePairs<Voter, KeyValuePairs<GovActionId, VotingProcedure>> =
            vec![(cc_key("alice"), KeyValuePairs::new())].into();
        let procedures = VotingProcedures(outer);

        assert!(procedures.to_cbor_bytes().is_err());
    }

    #[test]
    fn info_action_roundtrip() {
        let cbor = hex::decode("8106").unwrap();
        let action = GovAction::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(action, GovAction::Information);
        assert_eq!(action.previous_action_id(), None);
        assert_eq!(action.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn cost_models_validate_known_sizes() {
        let mut models = CostModels::default();
        assert!(models.insert(Language::PlutusV1, vec![0; 166]).is_ok());
        assert!(models.insert(Language::PlutusV2, vec![0; 166]).is_err());
        assert!(models.insert(Language::PlutusV3, vec![1; 251]).is_ok());
        assert_eq!(models.get(Language::PlutusV1), Some(&vec![0i64; 166]));
    }

    #[test]
    fn cost_models_decode_keeps_unknown_languages() {
        // {2: [1, 2], 9: [3]}
        let cbor = hex::decode("a202820102098103").unwrap();
        let models = CostModels::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(models.plutus_v3, Some(vec![1, 2]));
        assert_eq!(models.unknown.len(), 1);
        assert_eq!(models.to_cbor_bytes().unwrap(), cbor);
    }
}

use serde::{Deserialize, Serialize};

use eunomia_codec::utils::{KeyValuePairs, Nullable, Set};
use eunomia_codec::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

use crate::{
    AddrKeyhash, Anchor, Coin, CommitteeColdCredential, CommitteeHotCredential, DRepCredential,
    Epoch, Hash, PoolKeyhash, PoolMetadata, Relay, RewardAccount, ScriptHash, StakeCredential,
    UnitInterval, VrfKeyhash,
};

#[derive(Serialize, Deserialize, Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum DRep {
    Key(AddrKeyhash),
    Script(ScriptHash),
    Abstain,
    NoConfidence,
}

impl FromCbor for DRep {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let out = match r.read_uint()? {
            0 => {
                r.expect_array_len(len, 2)?;
                DRep::Key(Hash::from_cbor(r)?)
            }
            1 => {
                r.expect_array_len(len, 2)?;
                DRep::Script(Hash::from_cbor(r)?)
            }
            2 => {
                r.expect_array_len(len, 1)?;
                DRep::Abstain
            }
            3 => {
                r.expect_array_len(len, 1)?;
                DRep::NoConfidence
            }
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for DRep {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            DRep::Key(hash) => {
                w.write_start_array(2)?;
                w.write_uint(0)?;
                hash.to_cbor(w)
            }
            DRep::Script(hash) => {
                w.write_start_array(2)?;
                w.write_uint(1)?;
                hash.to_cbor(w)
            }
            DRep::Abstain => {
                w.write_start_array(1)?;
                w.write_uint(2)
            }
            DRep::NoConfidence => {
                w.write_start_array(1)?;
                w.write_uint(3)
            }
        }
    }
}

/// The operational parameters a pool registers with.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PoolParams {
    pub operator: PoolKeyhash,
    pub vrf_keyhash: VrfKeyhash,
    pub pledge: Coin,
    pub cost: Coin,
    pub margin: UnitInterval,
    pub reward_account: RewardAccount,
    pub pool_owners: Set<AddrKeyhash>,
    pub relays: Vec<Relay>,
    pub pool_metadata: Nullable<PoolMetadata>,
}

impl PoolParams {
    fn read_fields(r: &mut Reader) -> Result<Self, Error> {
        Ok(PoolParams {
            operator: Hash::from_cbor(r)?,
            vrf_keyhash: Hash::from_cbor(r)?,
            pledge: r.read_uint()?,
            cost: r.read_uint()?,
            margin: UnitInterval::from_cbor(r)?,
            reward_account: RewardAccount::from_cbor(r)?,
            pool_owners: Set::from_cbor(r)?,
            relays: Vec::from_cbor(r)?,
            pool_metadata: Nullable::from_cbor(r)?,
        })
    }

    fn write_fields(&self, w: &mut Writer) -> Result<(), Error> {
        self.operator.to_cbor(w)?;
        self.vrf_keyhash.to_cbor(w)?;
        w.write_uint(self.pledge)?;
        w.write_uint(self.cost)?;
        self.margin.to_cbor(w)?;
        self.reward_account.to_cbor(w)?;
        self.pool_owners.to_cbor(w)?;
        self.relays.to_cbor(w)?;
        self.pool_metadata.to_cbor(w)
    }
}

/*
move_instantaneous_reward = [ 0 / 1, { * stake_credential => delta_coin } / coin ]
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, PartialOrd, Clone)]
pub enum InstantaneousRewardSource {
    Reserves,
    Treasury,
}

impl FromCbor for InstantaneousRewardSource {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.read_uint()? {
            0 => Ok(Self::Reserves),
            1 => Ok(Self::Treasury),
            variant => Err(Error::UnknownDiscriminator(variant)),
        }
    }
}

impl ToCbor for InstantaneousRewardSource {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Self::Reserves => w.write_uint(0),
            Self::Treasury => w.write_uint(1),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum InstantaneousRewardTarget {
    StakeCredentials(KeyValuePairs<StakeCredential, i64>),
    OtherAccountingPot(Coin),
}

impl FromCbor for InstantaneousRewardTarget {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.peek_type()? {
            CborType::Map => Ok(Self::StakeCredentials(KeyValuePairs::from_cbor(r)?)),
            _ => Ok(Self::OtherAccountingPot(r.read_uint()?)),
        }
    }
}

impl ToCbor for InstantaneousRewardTarget {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Self::StakeCredentials(creds) => creds.to_cbor(w),
            Self::OtherAccountingPot(coin) => w.write_uint(*coin),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct MoveInstantaneousReward {
    pub source: InstantaneousRewardSource,
    pub target: InstantaneousRewardTarget,
}

impl FromCbor for MoveInstantaneousReward {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = MoveInstantaneousReward {
            source: InstantaneousRewardSource::from_cbor(r)?,
            target: InstantaneousRewardTarget::from_cbor(r)?,
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for MoveInstantaneousReward {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        self.source.to_cbor(w)?;
        self.target.to_cbor(w)
    }
}

/// The certificate kinds a Conway transaction may carry, including the
/// legacy MIR form (discriminator 6) so pre-Conway data stays readable. The
/// discriminator is the first element of the enclosing array.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum Certificate {
    StakeRegistration(StakeCredential),
    StakeDeregistration(StakeCredential),
    StakeDelegation(StakeCredential, PoolKeyhash),
    PoolRegistration(PoolParams),
    PoolRetirement(PoolKeyhash, Epoch),
    MoveInstantaneousRewardsCert(MoveInstantaneousReward),
    Reg(StakeCredential, Coin),
    UnReg(StakeCredential, Coin),
    VoteDeleg(StakeCredential, DRep),
    StakeVoteDeleg(StakeCredential, PoolKeyhash, DRep),
    StakeRegDeleg(StakeCredential, PoolKeyhash, Coin),
    VoteRegDeleg(StakeCredential, DRep, Coin),
    StakeVoteRegDeleg(StakeCredential, PoolKeyhash, DRep, Coin),
    AuthCommitteeHot(CommitteeColdCredential, CommitteeHotCredential),
    ResignCommitteeCold(CommitteeColdCredential, Nullable<Anchor>),
    RegDRepCert(DRepCredential, Coin, Nullable<Anchor>),
    UnRegDRepCert(DRepCredential, Coin),
    UpdateDRepCert(DRepCredential, Nullable<Anchor>),
}

impl Certificate {
    pub fn as_pool_registration(&self) -> Option<&PoolParams> {
        match self {
            Certificate::PoolRegistration(params) => Some(params),
            _ => None,
        }
    }

    pub fn as_stake_credential(&self) -> Option<&StakeCredential> {
        match self {
            Certificate::StakeRegistration(c)
            | Certificate::StakeDeregistration(c)
            | Certificate::StakeDelegation(c, _)
            | Certificate::Reg(c, _)
            | Certificate::UnReg(c, _)
            | Certificate::VoteDeleg(c, _)
            | Certificate::StakeVoteDeleg(c, _, _)
            | Certificate::StakeRegDeleg(c, _, _)
            | Certificate::VoteRegDeleg(c, _, _)
            | Certificate::StakeVoteRegDeleg(c, _, _, _)
            | Certificate::RegDRepCert(c, _, _)
            | Certificate::UnRegDRepCert(c, _)
            | Certificate::UpdateDRepCert(c, _)
            | Certificate::AuthCommitteeHot(c, _)
            | Certificate::ResignCommitteeCold(c, _) => Some(c),
            _ => None,
        }
    }

    pub fn as_mir(&self) -> Option<&MoveInstantaneousReward> {
        match self {
            Certificate::MoveInstantaneousRewardsCert(mir) => Some(mir),
            _ => None,
        }
    }
}

impl FromCbor for Certificate {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let variant = r.read_uint()?;

        let out = match variant {
            0 => {
                r.expect_array_len(len, 2)?;
                Certificate::StakeRegistration(StakeCredential::from_cbor(r)?)
            }
            1 => {
                r.expect_array_len(len, 2)?;
                Certificate::StakeDeregistration(StakeCredential::from_cbor(r)?)
            }
            2 => {
                r.expect_array_len(len, 3)?;
                Certificate::StakeDelegation(StakeCredential::from_cbor(r)?, Hash::from_cbor(r)?)
            }
            3 => {
                r.expect_array_len(len, 10)?;
                Certificate::PoolRegistration(PoolParams::read_fields(r)?)
            }
            4 => {
                r.expect_array_len(len, 3)?;
                Certificate::PoolRetirement(Hash::from_cbor(r)?, r.read_uint()?)
            }
            6 => {
                r.expect_array_len(len, 2)?;
                Certificate::MoveInstantaneousRewardsCert(MoveInstantaneousReward::from_cbor(r)?)
            }
            7 => {
                r.expect_array_len(len, 3)?;
                Certificate::Reg(StakeCredential::from_cbor(r)?, r.read_uint()?)
            }
            8 => {
                r.expect_array_len(len, 3)?;
                Certificate::UnReg(StakeCredential::from_cbor(r)?, r.read_uint()?)
            }
            9 => {
                r.expect_array_len(len, 3)?;
                Certificate::VoteDeleg(StakeCredential::from_cbor(r)?, DRep::from_cbor(r)?)
            }
            10 => {
                r.expect_array_len(len, 4)?;
                Certificate::StakeVoteDeleg(
                    StakeCredential::from_cbor(r)?,
                    Hash::from_cbor(r)?,
                    DRep::from_cbor(r)?,
                )
            }
            11 => {
                r.expect_array_len(len, 4)?;
                Certificate::StakeRegDeleg(
                    StakeCredential::from_cbor(r)?,
                    Hash::from_cbor(r)?,
                    r.read_uint()?,
                )
            }
            12 => {
                r.expect_array_len(len, 4)?;
                Certificate::VoteRegDeleg(
                    StakeCredential::from_cbor(r)?,
                    DRep::from_cbor(r)?,
                    r.read_uint()?,
                )
            }
            13 => {
                r.expect_array_len(len, 5)?;
                Certificate::StakeVoteRegDeleg(
                    StakeCredential::from_cbor(r)?,
                    Hash::from_cbor(r)?,
                    DRep::from_cbor(r)?,
                    r.read_uint()?,
                )
            }
            14 => {
                r.expect_array_len(len, 3)?;
                Certificate::AuthCommitteeHot(
                    CommitteeColdCredential::from_cbor(r)?,
                    CommitteeHotCredential::from_cbor(r)?,
                )
            }
            15 => {
                r.expect_array_len(len, 3)?;
                Certificate::ResignCommitteeCold(
                    CommitteeColdCredential::from_cbor(r)?,
                    Nullable::from_cbor(r)?,
                )
            }
            16 => {
                r.expect_array_len(len, 4)?;
                Certificate::RegDRepCert(
                    DRepCredential::from_cbor(r)?,
                    r.read_uint()?,
                    Nullable::from_cbor(r)?,
                )
            }
            17 => {
                r.expect_array_len(len, 3)?;
                Certificate::UnRegDRepCert(DRepCredential::from_cbor(r)?, r.read_uint()?)
            }
            18 => {
                r.expect_array_len(len, 3)?;
                Certificate::UpdateDRepCert(DRepCredential::from_cbor(r)?, Nullable::from_cbor(r)?)
            }
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Certificate {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Certificate::StakeRegistration(credential) => {
                w.write_start_array(2)?;
                w.write_uint(0)?;
                credential.to_cbor(w)
            }
            Certificate::StakeDeregistration(credential) => {
                w.write_start_array(2)?;
                w.write_uint(1)?;
                credential.to_cbor(w)
            }
            Certificate::StakeDelegation(credential, pool) => {
                w.write_start_array(3)?;
                w.write_uint(2)?;
                credential.to_cbor(w)?;
                pool.to_cbor(w)
            }
            Certificate::PoolRegistration(params) => {
                w.write_start_array(10)?;
                w.write_uint(3)?;
                params.write_fields(w)
            }
            Certificate::PoolRetirement(pool, epoch) => {
                w.write_start_array(3)?;
                w.write_uint(4)?;
                pool.to_cbor(w)?;
                w.write_uint(*epoch)
            }
            Certificate::MoveInstantaneousRewardsCert(mir) => {
                w.write_start_array(2)?;
                w.write_uint(6)?;
                mir.to_cbor(w)
            }
            Certificate::Reg(credential, deposit) => {
                w.write_start_array(3)?;
                w.write_uint(7)?;
                credential.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::UnReg(credential, deposit) => {
                w.write_start_array(3)?;
                w.write_uint(8)?;
                credential.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::VoteDeleg(credential, drep) => {
                w.write_start_array(3)?;
                w.write_uint(9)?;
                credential.to_cbor(w)?;
                drep.to_cbor(w)
            }
            Certificate::StakeVoteDeleg(credential, pool, drep) => {
                w.write_start_array(4)?;
                w.write_uint(10)?;
                credential.to_cbor(w)?;
                pool.to_cbor(w)?;
                drep.to_cbor(w)
            }
            Certificate::StakeRegDeleg(credential, pool, deposit) => {
                w.write_start_array(4)?;
                w.write_uint(11)?;
                credential.to_cbor(w)?;
                pool.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::VoteRegDeleg(credential, drep, deposit) => {
                w.write_start_array(4)?;
                w.write_uint(12)?;
                credential.to_cbor(w)?;
                drep.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::StakeVoteRegDeleg(credential, pool, drep, deposit) => {
                w.write_start_array(5)?;
                w.write_uint(13)?;
                credential.to_cbor(w)?;
                pool.to_cbor(w)?;
                drep.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::AuthCommitteeHot(cold, hot) => {
                w.write_start_array(3)?;
                w.write_uint(14)?;
                cold.to_cbor(w)?;
                hot.to_cbor(w)
            }
            Certificate::ResignCommitteeCold(cold, anchor) => {
                w.write_start_array(3)?;
                w.write_uint(15)?;
                cold.to_cbor(w)?;
                anchor.to_cbor(w)
            }
            Certificate::RegDRepCert(credential, deposit, anchor) => {
                w.write_start_array(4)?;
                w.write_uint(16)?;
                credential.to_cbor(w)?;
                w.write_uint(*deposit)?;
                anchor.to_cbor(w)
            }
            Certificate::UnRegDRepCert(credential, deposit) => {
                w.write_start_array(3)?;
                w.write_uint(17)?;
                credential.to_cbor(w)?;
                w.write_uint(*deposit)
            }
            Certificate::UpdateDRepCert(credential, anchor) => {
                w.write_start_array(3)?;
                w.write_uint(18)?;
                credential.to_cbor(w)?;
                anchor.to_cbor(w)
            }
        }
    }
}

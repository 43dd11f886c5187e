use serde::{Deserialize, Serialize};

use eunomia_codec::utils::Bytes;
use eunomia_codec::{Error, FromCbor, Reader, ToCbor, Writer};

use crate::AddrKeyhash;

#[cfg(feature = "json")]
pub mod json;

/*
native_script =
  [ script_pubkey
  // script_all
  // script_any
  // script_n_of_k
  // invalid_before
  // invalid_hereafter
  ]
 */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum NativeScript {
    ScriptPubkey(AddrKeyhash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK(u32, Vec<NativeScript>),
    InvalidBefore(u64),
    InvalidHereafter(u64),
}

impl FromCbor for NativeScript {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(None)?;
        let out = match r.read_uint()? {
            0 => {
                r.expect_array_len(len, 2)?;
                NativeScript::ScriptPubkey(crate::Hash::from_cbor(r)?)
            }
            1 => {
                r.expect_array_len(len, 2)?;
                NativeScript::ScriptAll(Vec::from_cbor(r)?)
            }
            2 => {
                r.expect_array_len(len, 2)?;
                NativeScript::ScriptAny(Vec::from_cbor(r)?)
            }
            3 => {
                r.expect_array_len(len, 3)?;
                NativeScript::ScriptNOfK(u32::from_cbor(r)?, Vec::from_cbor(r)?)
            }
            4 => {
                r.expect_array_len(len, 2)?;
                NativeScript::InvalidBefore(r.read_uint()?)
            }
            5 => {
                r.expect_array_len(len, 2)?;
                NativeScript::InvalidHereafter(r.read_uint()?)
            }
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for NativeScript {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            NativeScript::ScriptPubkey(hash) => {
                w.write_start_array(2)?;
                w.write_uint(0)?;
                hash.to_cbor(w)
            }
            NativeScript::ScriptAll(scripts) => {
                w.write_start_array(2)?;
                w.write_uint(1)?;
                scripts.to_cbor(w)
            }
            NativeScript::ScriptAny(scripts) => {
                w.write_start_array(2)?;
                w.write_uint(2)?;
                scripts.to_cbor(w)
            }
            NativeScript::ScriptNOfK(n, scripts) => {
                w.write_start_array(3)?;
                w.write_uint(3)?;
                w.write_uint(*n as u64)?;
                scripts.to_cbor(w)
            }
            NativeScript::InvalidBefore(slot) => {
                w.write_start_array(2)?;
                w.write_uint(4)?;
                w.write_uint(*slot)
            }
            NativeScript::InvalidHereafter(slot) => {
                w.write_start_array(2)?;
                w.write_uint(5)?;
                w.write_uint(*slot)
            }
        }
    }
}

/// Opaque plutus script bytes, tagged at the type level with the plutus
/// language version.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct PlutusScript<const VERSION: usize>(pub Bytes);

impl<const VERSION: usize> AsRef<[u8]> for PlutusScript<VERSION> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl<const VERSION: usize> FromCbor for PlutusScript<VERSION> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        Ok(PlutusScript(Bytes::from_cbor(r)?))
    }
}

impl<const VERSION: usize> ToCbor for PlutusScript<VERSION> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        self.0.to_cbor(w)
    }
}

/// The plutus language tag, as used by cost models and language views.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum Language {
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl Language {
    pub fn tag(&self) -> u64 {
        match self {
            Language::PlutusV1 => 0,
            Language::PlutusV2 => 1,
            Language::PlutusV3 => 2,
        }
    }
}

impl FromCbor for Language {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        match r.read_uint()? {
            0 => Ok(Language::PlutusV1),
            1 => Ok(Language::PlutusV2),
            2 => Ok(Language::PlutusV3),
            variant => Err(Error::UnknownDiscriminator(variant)),
        }
    }
}

impl ToCbor for Language {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_uint(self.tag())
    }
}

// script = [0, native_script // 1, plutus_v1_script // 2, plutus_v2_script //
// 3, plutus_v3_script]
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Script {
    NativeScript(NativeScript),
    PlutusV1Script(PlutusScript<1>),
    PlutusV2Script(PlutusScript<2>),
    PlutusV3Script(PlutusScript<3>),
}

impl Script {
    pub fn as_native(&self) -> Option<&NativeScript> {
        match self {
            Script::NativeScript(x) => Some(x),
            _ => None,
        }
    }
}

impl FromCbor for Script {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let len = r.read_start_array(Some(2))?;
        let out = match r.read_uint()? {
            0 => Script::NativeScript(NativeScript::from_cbor(r)?),
            1 => Script::PlutusV1Script(PlutusScript::from_cbor(r)?),
            2 => Script::PlutusV2Script(PlutusScript::from_cbor(r)?),
            3 => Script::PlutusV3Script(PlutusScript::from_cbor(r)?),
            variant => return Err(Error::UnknownDiscriminator(variant)),
        };
        r.read_end_array(len)?;

        Ok(out)
    }
}

impl ToCbor for Script {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_start_array(2)?;
        match self {
            Script::NativeScript(x) => {
                w.write_uint(0)?;
                x.to_cbor(w)
            }
            Script::PlutusV1Script(x) => {
                w.write_uint(1)?;
                x.to_cbor(w)
            }
            Script::PlutusV2Script(x) => {
                w.write_uint(2)?;
                x.to_cbor(w)
            }
            Script::PlutusV3Script(x) => {
                w.write_uint(3)?;
                x.to_cbor(w)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_script_cbor() {
        let cbor =
            hex::decode("8200581c966e394a544f242081e41d1965137b1bb412ac230d40ed5407821c37")
                .unwrap();
        let script = NativeScript::from_cbor_bytes(&cbor).unwrap();
        assert!(matches!(script, NativeScript::ScriptPubkey(_)));
        assert_eq!(script.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn invalid_hereafter_cbor() {
        let cbor = hex::decode("8205190bb8").unwrap();
        let script = NativeScript::from_cbor_bytes(&cbor).unwrap();
        assert_eq!(script, NativeScript::InvalidHereafter(3000));
        assert_eq!(script.to_cbor_bytes().unwrap(), cbor);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let cbor = hex::decode("820619045d").unwrap();
        assert_eq!(
            NativeScript::from_cbor_bytes(&cbor),
            Err(Error::UnknownDiscriminator(6))
        );
    }

    #[test]
    fn compound_script_roundtrip() {
        let cbor = hex::decode(concat!(
            "8201828200581c966e394a544f242081e41d1965137b1bb412ac230d40ed5407",
            "821c378205190bb8"
        ))
        .unwrap();
        let script = NativeScript::from_cbor_bytes(&cbor).unwrap();

        match &script {
            NativeScript::ScriptAll(scripts) => assert_eq!(scripts.len(), 2),
            other => panic!("unexpected script: {other:?}"),
        }

        assert_eq!(script.to_cbor_bytes().unwrap(), cbor);
    }
}

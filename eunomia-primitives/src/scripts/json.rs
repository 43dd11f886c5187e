use serde_json::{json, Value};
use thiserror::Error;

use crate::scripts::NativeScript;
use crate::ToCanonicalJson;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    #[error("invalid native script json: {0}")]
    InvalidJson(String),

    #[error("unknown native script kind: {0}")]
    UnknownScriptKind(String),
}

fn invalid(msg: impl Into<String>) -> JsonError {
    JsonError::InvalidJson(msg.into())
}

// The textual form used by cardano-cli. Note the slot kinds: textual
// "before" is the expiry (invalid_hereafter opcode) and "after" the start
// (invalid_before opcode) — the ledger convention inverts the direction
// relative to the opcode names.
impl ToCanonicalJson for NativeScript {
    fn to_json(&self) -> Value {
        match self {
            NativeScript::ScriptPubkey(hash) => {
                json!({ "type": "sig", "keyHash": hash.to_string() })
            }
            NativeScript::ScriptAll(scripts) => {
                let scripts: Vec<_> = scripts.iter().map(|s| s.to_json()).collect();
                json!({ "type": "all", "scripts": scripts })
            }
            NativeScript::ScriptAny(scripts) => {
                let scripts: Vec<_> = scripts.iter().map(|s| s.to_json()).collect();
                json!({ "type": "any", "scripts": scripts })
            }
            NativeScript::ScriptNOfK(required, scripts) => {
                let scripts: Vec<_> = scripts.iter().map(|s| s.to_json()).collect();
                json!({ "type": "atLeast", "required": required, "scripts": scripts })
            }
            NativeScript::InvalidBefore(slot) => {
                json!({ "type": "after", "slot": slot })
            }
            NativeScript::InvalidHereafter(slot) => {
                json!({ "type": "before", "slot": slot })
            }
        }
    }
}

impl NativeScript {
    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("expected a json object"))?;

        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing \"type\" field"))?;

        let scripts = |field: &str| -> Result<Vec<NativeScript>, JsonError> {
            obj.get(field)
                .and_then(Value::as_array)
                .ok_or_else(|| invalid(format!("missing \"{field}\" array")))?
                .iter()
                .map(NativeScript::from_json)
                .collect()
        };

        let slot = || -> Result<u64, JsonError> {
            obj.get("slot")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid("missing \"slot\" field"))
        };

        match kind {
            "sig" => {
                let key_hash = obj
                    .get("keyHash")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("missing \"keyHash\" field"))?;

                let hash = key_hash
                    .parse()
                    .map_err(|_| invalid("keyHash is not a 28-byte hex string"))?;

                Ok(NativeScript::ScriptPubkey(hash))
            }
            "all" => Ok(NativeScript::ScriptAll(scripts("scripts")?)),
            "any" => Ok(NativeScript::ScriptAny(scripts("scripts")?)),
            "atLeast" => {
                let required = obj
                    .get("required")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| invalid("missing \"required\" field"))?;

                Ok(NativeScript::ScriptNOfK(required, scripts("scripts")?))
            }
            "after" => Ok(NativeScript::InvalidBefore(slot()?)),
            "before" => Ok(NativeScript::InvalidHereafter(slot()?)),
            other => Err(JsonError::UnknownScriptKind(other.to_string())),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, JsonError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| JsonError::InvalidJson(e.to_string()))?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eunomia_codec::ToCbor;

    #[test]
    fn pubkey_json_to_cbor() {
        let script = NativeScript::from_json_str(
            r#"{"type":"sig","keyHash":"966e394a544f242081e41d1965137b1bb412ac230d40ed5407821c37"}"#,
        )
        .unwrap();

        assert_eq!(
            script.to_cbor_hex().unwrap(),
            "8200581c966e394a544f242081e41d1965137b1bb412ac230d40ed5407821c37"
        );
    }

    #[test]
    fn textual_before_is_the_expiry() {
        let script = NativeScript::from_json_str(r#"{"type":"before","slot":3000}"#).unwrap();
        assert_eq!(script, NativeScript::InvalidHereafter(3000));
        assert_eq!(script.to_cbor_hex().unwrap(), "8205190bb8");

        let script = NativeScript::from_json_str(r#"{"type":"after","slot":3000}"#).unwrap();
        assert_eq!(script, NativeScript::InvalidBefore(3000));
        assert_eq!(script.to_cbor_hex().unwrap(), "8204190bb8");
    }

    #[test]
    fn json_roundtrip_is_cbor_stable() {
        let text = r#"
        {
            "type": "atLeast",
            "required": 2,
            "scripts": [
                {"type":"sig","keyHash":"966e394a544f242081e41d1965137b1bb412ac230d40ed5407821c37"},
                {"type":"before","slot":3000},
                {"type":"all","scripts":[{"type":"after","slot":500}]}
            ]
        }"#;

        let script = NativeScript::from_json_str(text).unwrap();
        let reparsed = NativeScript::from_json(&script.to_json()).unwrap();

        assert_eq!(
            script.to_cbor_bytes().unwrap(),
            reparsed.to_cbor_bytes().unwrap()
        );
    }

    #[test]
    fn unknown_kind_and_broken_json() {
        assert_eq!(
            NativeScript::from_json_str(r#"{"type":"tickle","slot":1}"#),
            Err(JsonError::UnknownScriptKind("tickle".to_string()))
        );
        assert!(matches!(
            NativeScript::from_json_str("{not json"),
            Err(JsonError::InvalidJson(_))
        ));
    }
}

//! `EvmAbi`: the `AbiCodec` implementation backed by a JSON ABI.
//!
//! # Usage
//! ```ignore
//! let abi = EvmAbi::from_json(ERC20_ABI)?;
//! let calldata = abi.encode_call("transfer", &[
//!     AbiValue::address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
//!     AbiValue::Uint(1_000_000),
//! ])?;
//! ```

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::Specifier;
use alloy_json_abi::{Event, EventParam, Function, JsonAbi, Param};
use alloy_primitives::{Bytes, B256};
use chainbind_core::{AbiCodec, AbiValue, BindError, EventFields};

use crate::{fingerprint, normalizer, value};

/// ABI codec for one EVM contract.
///
/// Every parameter type is resolved when the ABI is loaded, so a codec that
/// constructs successfully never fails on an unparseable type later.
#[derive(Debug, Clone)]
pub struct EvmAbi {
    abi: JsonAbi,
}

impl EvmAbi {
    /// Parse a standard Ethereum ABI JSON document.
    pub fn from_json(abi_json: &str) -> Result<Self, BindError> {
        let abi: JsonAbi = serde_json::from_str(abi_json).map_err(|e| BindError::InvalidAbi {
            reason: format!("invalid ABI JSON: {e}"),
        })?;
        Self::from_abi(abi)
    }

    pub fn from_abi(abi: JsonAbi) -> Result<Self, BindError> {
        for func in abi.functions() {
            for p in func.inputs.iter().chain(func.outputs.iter()) {
                resolve_param(p).map_err(|reason| BindError::InvalidAbi {
                    reason: format!("function '{}': {reason}", func.name),
                })?;
            }
        }
        for ev in abi.events() {
            for p in &ev.inputs {
                resolve_event_param(p).map_err(|reason| BindError::InvalidAbi {
                    reason: format!("event '{}': {reason}", ev.name),
                })?;
            }
        }
        tracing::debug!(
            functions = abi.functions().count(),
            events = abi.events().count(),
            "loaded contract ABI"
        );
        Ok(Self { abi })
    }

    pub fn json_abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// The overload of `method` taking `arity` arguments.
    fn function_for(&self, method: &str, arity: usize) -> Result<&Function, BindError> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| BindError::UnknownMethod {
                name: method.to_string(),
            })?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| BindError::Encoding {
                method: method.to_string(),
                reason: format!(
                    "argument count mismatch: ABI accepts {}, got {arity}",
                    overloads
                        .iter()
                        .map(|f| f.inputs.len().to_string())
                        .collect::<Vec<_>>()
                        .join(" or ")
                ),
            })
    }

    fn first_function(&self, method: &str) -> Result<&Function, BindError> {
        self.abi
            .function(method)
            .and_then(|o| o.first())
            .ok_or_else(|| BindError::UnknownMethod {
                name: method.to_string(),
            })
    }

    fn event(&self, name: &str) -> Result<&Event, BindError> {
        self.abi
            .event(name)
            .and_then(|o| o.first())
            .ok_or_else(|| BindError::UnknownEvent {
                name: name.to_string(),
            })
    }
}

fn resolve_param(p: &Param) -> Result<DynSolType, String> {
    p.resolve().map_err(|e| format!("param '{}': {e}", p.name))
}

fn resolve_event_param(p: &EventParam) -> Result<DynSolType, String> {
    p.resolve().map_err(|e| format!("param '{}': {e}", p.name))
}

fn field_name(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}

/// Indexed strings, bytes, arrays and tuples are stored as the keccak256
/// of their encoding; the original value is not recoverable from the topic.
fn is_hashed_in_topic(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_)
    )
}

fn decode_topic(topic: &B256, ty: &DynSolType) -> Result<AbiValue, String> {
    if is_hashed_in_topic(ty) {
        return Ok(AbiValue::Bytes(topic.to_vec()));
    }
    ty.abi_decode(topic.as_slice())
        .map(normalizer::normalize)
        .map_err(|e| format!("topic decode: {e}"))
}

fn decode_tuple(types: Vec<DynSolType>, data: &[u8]) -> Result<Vec<DynSolValue>, String> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types).abi_decode_params(data) {
        Ok(DynSolValue::Tuple(vals)) => Ok(vals),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(e.to_string()),
    }
}

impl AbiCodec for EvmAbi {
    fn encode_call(&self, method: &str, args: &[AbiValue]) -> Result<Bytes, BindError> {
        let func = self.function_for(method, args.len())?;

        let mut values = Vec::with_capacity(args.len());
        for (i, (param, arg)) in func.inputs.iter().zip(args).enumerate() {
            let encoding_err = |reason: String| BindError::Encoding {
                method: method.to_string(),
                reason,
            };
            let ty = resolve_param(param).map_err(encoding_err)?;
            let v = value::to_dyn_value(arg, &ty)
                .map_err(|e| encoding_err(format!("{}: {e}", field_name(&param.name, i))))?;
            values.push(v);
        }

        let mut calldata = func.selector().to_vec();
        calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
        Ok(Bytes::from(calldata))
    }

    fn decode_output(&self, method: &str, data: &[u8]) -> Result<Vec<AbiValue>, BindError> {
        let func = self.first_function(method)?;
        if func.outputs.is_empty() {
            return Ok(Vec::new());
        }
        if data.is_empty() {
            return Err(BindError::decoding(format!(
                "'{method}' returned no data; is there contract code at this address?"
            )));
        }

        let types = func
            .outputs
            .iter()
            .map(resolve_param)
            .collect::<Result<Vec<_>, _>>()
            .map_err(BindError::decoding)?;
        let vals = decode_tuple(types, data)
            .map_err(|e| BindError::decoding(format!("'{method}' output: {e}")))?;

        Ok(vals
            .into_iter()
            .zip(&func.outputs)
            .map(|(v, p)| component_value(v, &p.components))
            .collect())
    }

    fn event_topic(&self, event: &str) -> Result<Option<B256>, BindError> {
        let ev = self.event(event)?;
        Ok((!ev.anonymous).then(|| ev.selector()))
    }

    fn encode_topic(
        &self,
        event: &str,
        position: usize,
        value: &AbiValue,
    ) -> Result<B256, BindError> {
        let ev = self.event(event)?;
        let encoding_err = |reason: String| BindError::Encoding {
            method: event.to_string(),
            reason,
        };
        let param = ev
            .inputs
            .iter()
            .filter(|p| p.indexed)
            .nth(position)
            .ok_or_else(|| encoding_err(format!("no indexed parameter at position {position}")))?;
        let ty = resolve_event_param(param).map_err(encoding_err)?;

        match (&ty, value) {
            // A 32-byte value for a hashed type is taken as the topic itself
            (t, AbiValue::Bytes(b)) if is_hashed_in_topic(t) && b.len() == 32 => {
                Ok(B256::from_slice(b))
            }
            (DynSolType::String, AbiValue::Str(s)) => Ok(fingerprint::keccak256(s.as_bytes())),
            (DynSolType::Bytes, AbiValue::Bytes(b)) => Ok(fingerprint::keccak256(b)),
            (t, _) if is_hashed_in_topic(t) => Err(encoding_err(format!(
                "indexed '{}' of type {t} must be given as its 32-byte topic hash",
                param.name
            ))),
            _ => {
                let v = value::to_dyn_value(value, &ty).map_err(encoding_err)?;
                v.as_word()
                    .ok_or_else(|| encoding_err(format!("{ty} is not a single-word type")))
            }
        }
    }

    fn decode_log(
        &self,
        event: &str,
        topics: &[B256],
        data: &[u8],
    ) -> Result<EventFields, BindError> {
        let ev = self.event(event)?;
        let skip = usize::from(!ev.anonymous);
        let indexed_count = ev.inputs.iter().filter(|p| p.indexed).count();
        if topics.len() != skip + indexed_count {
            return Err(BindError::decoding(format!(
                "'{event}' expects {} topics, got {}",
                skip + indexed_count,
                topics.len()
            )));
        }

        let body_types = ev
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(resolve_event_param)
            .collect::<Result<Vec<_>, _>>()
            .map_err(BindError::decoding)?;
        let mut body = decode_tuple(body_types, data)
            .map_err(|e| BindError::decoding(format!("'{event}' data: {e}")))?
            .into_iter();
        let mut indexed_topics = topics[skip..].iter();

        let mut fields = EventFields::new(&ev.name);
        for (i, param) in ev.inputs.iter().enumerate() {
            let name = field_name(&param.name, i);
            let val = if param.indexed {
                let ty = resolve_event_param(param).map_err(BindError::decoding)?;
                let topic = indexed_topics
                    .next()
                    .ok_or_else(|| BindError::decoding(format!("missing topic for '{name}'")))?;
                decode_topic(topic, &ty)
                    .map_err(|e| BindError::decoding(format!("'{event}.{name}': {e}")))?
            } else {
                let v = body
                    .next()
                    .ok_or_else(|| BindError::decoding(format!("missing data for '{name}'")))?;
                component_value(v, &param.components)
            };
            fields.fields.push((name, val));
        }
        Ok(fields)
    }

    fn has_method(&self, method: &str) -> bool {
        self.abi.function(method).is_some()
    }

    fn has_event(&self, event: &str) -> bool {
        self.abi.event(event).is_some()
    }
}

fn component_value(v: DynSolValue, components: &[Param]) -> AbiValue {
    if components.is_empty() {
        normalizer::normalize(v)
    } else {
        let names: Vec<String> = components.iter().map(|c| c.name.clone()).collect();
        normalizer::normalize_named(v, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"name","stateMutability":"view",
         "inputs":[],"outputs":[{"name":"","type":"string"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]},
        {"type":"event","name":"Note","anonymous":true,
         "inputs":[{"name":"tag","type":"string","indexed":true},
                   {"name":"","type":"uint8","indexed":false}]}
    ]"#;

    const ALICE: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const BOB: &str = "0x000000000000000000000000000000000000bEEF";

    fn abi() -> EvmAbi {
        EvmAbi::from_json(ERC20_ABI).unwrap()
    }

    fn word(n: u64) -> Vec<u8> {
        let mut w = [0u8; 32];
        w[24..].copy_from_slice(&n.to_be_bytes());
        w.to_vec()
    }

    fn address_topic(addr: &str) -> B256 {
        let a: alloy_primitives::Address = addr.parse().unwrap();
        a.into_word()
    }

    #[test]
    fn invalid_json_is_invalid_abi() {
        assert!(matches!(
            EvmAbi::from_json("not json"),
            Err(BindError::InvalidAbi { .. })
        ));
    }

    #[test]
    fn unparseable_type_is_invalid_abi() {
        let bad = r#"[{"type":"function","name":"f","stateMutability":"view",
            "inputs":[{"name":"x","type":"uint257"}],"outputs":[]}]"#;
        assert!(matches!(EvmAbi::from_json(bad), Err(BindError::InvalidAbi { .. })));
    }

    #[test]
    fn encode_transfer_calldata() {
        let data = abi()
            .encode_call("transfer", &[AbiValue::address(BOB), AbiValue::Uint(1_000)])
            .unwrap();
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[4 + 32..], word(1_000).as_slice());
    }

    #[test]
    fn encode_unknown_method() {
        assert!(matches!(
            abi().encode_call("mint", &[]),
            Err(BindError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn encode_wrong_arity_and_type() {
        let abi = abi();
        assert!(matches!(
            abi.encode_call("transfer", &[AbiValue::address(BOB)]),
            Err(BindError::Encoding { .. })
        ));
        assert!(matches!(
            abi.encode_call("transfer", &[AbiValue::Bool(true), AbiValue::Uint(1)]),
            Err(BindError::Encoding { .. })
        ));
    }

    #[test]
    fn decode_balance_output() {
        let out = abi().decode_output("balanceOf", &word(42)).unwrap();
        assert_eq!(out, vec![AbiValue::Uint(42)]);
    }

    #[test]
    fn decode_string_output() {
        let encoded = DynSolValue::Tuple(vec![DynSolValue::String("Token".into())]).abi_encode_params();
        let out = abi().decode_output("name", &encoded).unwrap();
        assert_eq!(out, vec![AbiValue::Str("Token".into())]);
    }

    #[test]
    fn empty_output_is_decoding_error() {
        let err = abi().decode_output("balanceOf", &[]).unwrap_err();
        assert!(matches!(err, BindError::Decoding { ref reason } if reason.contains("no data")));
    }

    #[test]
    fn truncated_output_is_decoding_error() {
        assert!(matches!(
            abi().decode_output("balanceOf", &[0u8; 8]),
            Err(BindError::Decoding { .. })
        ));
    }

    #[test]
    fn transfer_topic_and_anonymous() {
        let abi = abi();
        let topic = abi.event_topic("Transfer").unwrap().unwrap();
        assert_eq!(topic, fingerprint::event_topic("Transfer(address,address,uint256)"));
        assert_eq!(abi.event_topic("Note").unwrap(), None);
        assert!(matches!(abi.event_topic("Approval"), Err(BindError::UnknownEvent { .. })));
    }

    #[test]
    fn decode_transfer_log() {
        let abi = abi();
        let topics = vec![
            abi.event_topic("Transfer").unwrap().unwrap(),
            address_topic(ALICE),
            address_topic(BOB),
        ];
        let fields = abi.decode_log("Transfer", &topics, &word(500)).unwrap();
        assert_eq!(fields.name, "Transfer");
        assert_eq!(fields.get("from"), Some(&AbiValue::address(ALICE)));
        assert_eq!(fields.get("to"), Some(&AbiValue::address(BOB)));
        assert_eq!(fields.get("value"), Some(&AbiValue::Uint(500)));
    }

    #[test]
    fn decode_log_wrong_topic_count() {
        let abi = abi();
        let topics = vec![abi.event_topic("Transfer").unwrap().unwrap()];
        assert!(matches!(
            abi.decode_log("Transfer", &topics, &word(1)),
            Err(BindError::Decoding { .. })
        ));
    }

    #[test]
    fn decode_log_short_data() {
        let abi = abi();
        let topics = vec![
            abi.event_topic("Transfer").unwrap().unwrap(),
            address_topic(ALICE),
            address_topic(BOB),
        ];
        assert!(matches!(
            abi.decode_log("Transfer", &topics, &[0u8; 4]),
            Err(BindError::Decoding { .. })
        ));
    }

    #[test]
    fn anonymous_event_hashed_string_and_unnamed_field() {
        let abi = abi();
        let tag_hash = fingerprint::keccak256(b"hello");
        let fields = abi.decode_log("Note", &[tag_hash], &word(7)).unwrap();
        assert_eq!(fields.get("tag"), Some(&AbiValue::Bytes(tag_hash.to_vec())));
        assert_eq!(fields.get("arg1"), Some(&AbiValue::Uint(7)));
    }

    #[test]
    fn encode_indexed_topics() {
        let abi = abi();
        assert_eq!(
            abi.encode_topic("Transfer", 1, &AbiValue::address(BOB)).unwrap(),
            address_topic(BOB)
        );
        assert_eq!(
            abi.encode_topic("Note", 0, &AbiValue::Str("hello".into())).unwrap(),
            fingerprint::keccak256(b"hello")
        );
        assert!(matches!(
            abi.encode_topic("Transfer", 2, &AbiValue::Uint(1)),
            Err(BindError::Encoding { .. })
        ));
    }

    #[test]
    fn overload_selected_by_arity() {
        let json = r#"[
            {"type":"function","name":"f","stateMutability":"view","inputs":[],"outputs":[]},
            {"type":"function","name":"f","stateMutability":"view",
             "inputs":[{"name":"x","type":"uint8"}],"outputs":[]}
        ]"#;
        let abi = EvmAbi::from_json(json).unwrap();
        let zero = abi.encode_call("f", &[]).unwrap();
        let one = abi.encode_call("f", &[AbiValue::Uint(1)]).unwrap();
        assert_eq!(&zero[..], &fingerprint::selector("f()")[..]);
        assert_eq!(&one[..4], &fingerprint::selector("f(uint8)")[..]);
    }
}

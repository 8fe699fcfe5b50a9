//! Converts ChainBind `AbiValue` → alloy `DynSolValue` for a declared type.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, I256, U256};
use chainbind_core::AbiValue;
use std::str::FromStr;

/// Convert `val` to the alloy value of type `expected`, checking widths.
pub fn to_dyn_value(val: &AbiValue, expected: &DynSolType) -> Result<DynSolValue, String> {
    match (val, expected) {
        (AbiValue::Bool(b), DynSolType::Bool) => Ok(DynSolValue::Bool(*b)),

        (AbiValue::Uint(u), DynSolType::Uint(bits)) => uint(U256::from(*u), *bits),
        (AbiValue::BigUint(s), DynSolType::Uint(bits)) => {
            let u = U256::from_str(s).map_err(|e| format!("uint parse: {e}"))?;
            uint(u, *bits)
        }

        (AbiValue::Int(i), DynSolType::Int(bits)) => {
            let v = I256::try_from(*i).map_err(|e| e.to_string())?;
            int(v, *bits)
        }
        (AbiValue::BigInt(s), DynSolType::Int(bits)) => {
            let v = I256::from_str(s).map_err(|e| format!("int parse: {e}"))?;
            int(v, *bits)
        }

        (AbiValue::Address(s), DynSolType::Address) => {
            let addr = Address::from_str(s).map_err(|e| format!("address parse: {e}"))?;
            Ok(DynSolValue::Address(addr))
        }

        (AbiValue::Bytes(b), DynSolType::Bytes) => Ok(DynSolValue::Bytes(b.clone())),

        // bytesN is left-aligned in its word
        (AbiValue::Bytes(b), DynSolType::FixedBytes(n)) => {
            if b.len() > *n {
                return Err(format!("bytes{n}: got {} bytes", b.len()));
            }
            let mut word = B256::ZERO;
            word[..b.len()].copy_from_slice(b);
            Ok(DynSolValue::FixedBytes(word, *n))
        }

        (AbiValue::Str(s), DynSolType::String) => Ok(DynSolValue::String(s.clone())),

        (AbiValue::Array(elems), DynSolType::Array(inner)) => {
            let items: Result<Vec<_>, _> = elems.iter().map(|e| to_dyn_value(e, inner)).collect();
            Ok(DynSolValue::Array(items?))
        }

        (AbiValue::Array(elems), DynSolType::FixedArray(inner, len)) => {
            if elems.len() != *len {
                return Err(format!(
                    "fixed array length mismatch: expected {len}, got {}",
                    elems.len()
                ));
            }
            let items: Result<Vec<_>, _> = elems.iter().map(|e| to_dyn_value(e, inner)).collect();
            Ok(DynSolValue::FixedArray(items?))
        }

        (AbiValue::Tuple(fields), DynSolType::Tuple(types)) => {
            if fields.len() != types.len() {
                return Err(format!(
                    "tuple arity mismatch: expected {}, got {}",
                    types.len(),
                    fields.len()
                ));
            }
            let items: Result<Vec<_>, _> = fields
                .iter()
                .zip(types.iter())
                .map(|((_, v), t)| to_dyn_value(v, t))
                .collect();
            Ok(DynSolValue::Tuple(items?))
        }

        _ => Err(format!("cannot convert {} to {expected}", val.kind())),
    }
}

fn uint(u: U256, bits: usize) -> Result<DynSolValue, String> {
    if u.bit_len() > bits {
        return Err(format!("{u} overflows uint{bits}"));
    }
    Ok(DynSolValue::Uint(u, bits))
}

fn int(v: I256, bits: usize) -> Result<DynSolValue, String> {
    if bits < 256 {
        let bound = I256::ONE << (bits - 1);
        if v >= bound || v < -bound {
            return Err(format!("{v} overflows int{bits}"));
        }
    }
    Ok(DynSolValue::Int(v, bits))
}

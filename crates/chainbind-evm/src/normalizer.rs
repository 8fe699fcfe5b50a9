//! Converts alloy `DynSolValue` → ChainBind `AbiValue`.

use alloy_core::dyn_abi::DynSolValue;
use chainbind_core::AbiValue;

/// Convert a decoded `DynSolValue` into an `AbiValue`.
pub fn normalize(val: DynSolValue) -> AbiValue {
    match val {
        DynSolValue::Bool(b) => AbiValue::Bool(b),

        // Narrow to the native width when the value fits, whatever the declared width
        DynSolValue::Int(i, _bits) => match i128::try_from(i) {
            Ok(v) => AbiValue::Int(v),
            Err(_) => AbiValue::BigInt(i.to_string()),
        },

        DynSolValue::Uint(u, _bits) => match u128::try_from(u) {
            Ok(v) => AbiValue::Uint(v),
            Err(_) => AbiValue::BigUint(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => AbiValue::Bytes(word[..size].to_vec()),

        DynSolValue::Bytes(b) => AbiValue::Bytes(b),

        DynSolValue::String(s) => AbiValue::Str(s),

        DynSolValue::Address(a) => AbiValue::Address(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            AbiValue::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Tuple(fields) => AbiValue::Tuple(
            fields
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), normalize(v)))
                .collect(),
        ),

        DynSolValue::Function(f) => AbiValue::Bytes(f.to_vec()),
    }
}

/// Normalize a tuple component, attaching the ABI component names when
/// the declared type is a named struct.
pub fn normalize_named(val: DynSolValue, names: &[String]) -> AbiValue {
    match normalize(val) {
        AbiValue::Tuple(fields) if names.len() == fields.len() => AbiValue::Tuple(
            fields
                .into_iter()
                .zip(names)
                .map(|((pos, v), name)| (if name.is_empty() { pos } else { name.clone() }, v))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256, U256};

    #[test]
    fn uint256_small_narrows() {
        assert_eq!(normalize(DynSolValue::Uint(U256::from(42u64), 256)), AbiValue::Uint(42));
    }

    #[test]
    fn uint256_large_is_decimal_string() {
        let v = normalize(DynSolValue::Uint(U256::MAX, 256));
        assert!(matches!(v, AbiValue::BigUint(ref s) if s.starts_with("115792")));
    }

    #[test]
    fn negative_int() {
        let v = normalize(DynSolValue::Int(I256::try_from(-5i64).unwrap(), 256));
        assert_eq!(v, AbiValue::Int(-5));
    }

    #[test]
    fn fixed_bytes_keep_declared_width() {
        let mut word = B256::ZERO;
        word[0] = 0xab;
        word[1] = 0xcd;
        assert_eq!(
            normalize(DynSolValue::FixedBytes(word, 2)),
            AbiValue::Bytes(vec![0xab, 0xcd])
        );
    }

    #[test]
    fn address_is_checksummed() {
        let addr: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".parse().unwrap();
        assert_eq!(
            normalize(DynSolValue::Address(addr)),
            AbiValue::Address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into())
        );
    }

    #[test]
    fn named_tuple_components() {
        let v = normalize_named(
            DynSolValue::Tuple(vec![DynSolValue::Bool(true), DynSolValue::Uint(U256::from(1u8), 8)]),
            &["ok".to_string(), String::new()],
        );
        assert_eq!(
            v,
            AbiValue::Tuple(vec![
                ("ok".into(), AbiValue::Bool(true)),
                ("1".into(), AbiValue::Uint(1)),
            ])
        );
    }
}

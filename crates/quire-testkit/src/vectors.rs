//! Golden test vectors for canonical encoding.
//!
//! Every node must produce these exact bytes for these payloads, or
//! signatures made elsewhere will not verify here.

use quire_core::{canonicalize, Payload};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input payload as JSON text.
    pub json: &'static str,
    /// Expected canonical bytes (hex).
    pub canonical_hex: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty object",
            json: "{}",
            canonical_hex: "a0",
        },
        GoldenVector {
            name: "single text field",
            json: r#"{"text":"hi"}"#,
            canonical_hex: "a16474657874626869",
        },
        GoldenVector {
            name: "signature is not signed",
            json: r#"{"signature":"ab","text":"hi"}"#,
            canonical_hex: "a16474657874626869",
        },
        GoldenVector {
            name: "keys sorted by encoded length first",
            json: r#"{"owner":"o","id":"1","text":"t"}"#,
            canonical_hex: "a3626964613164746578746174656f776e6572616f",
        },
        GoldenVector {
            name: "shorter key first even if lexically later",
            json: r#"{"aa":1,"b":2}"#,
            canonical_hex: "a261620262616101",
        },
        GoldenVector {
            name: "negative and two-byte integers",
            json: r#"{"a":-1,"b":500}"#,
            canonical_hex: "a261612061621901f4",
        },
        GoldenVector {
            name: "four-byte negative integer",
            json: r#"{"neg":-1000000}"#,
            canonical_hex: "a1636e65673a000f423f",
        },
        GoldenVector {
            name: "fraction is binary64",
            json: r#"{"n":1.5}"#,
            canonical_hex: "a1616efb3ff8000000000000",
        },
        GoldenVector {
            name: "integral float is an integer",
            json: r#"{"whole":2.0}"#,
            canonical_hex: "a16577686f6c6502",
        },
        GoldenVector {
            name: "integral float outside i64 stays binary64",
            json: r#"{"big":1e300}"#,
            canonical_hex: "a163626967fb7e37e43c8800759c",
        },
        GoldenVector {
            name: "utf-8 text",
            json: r#"{"name":"café"}"#,
            canonical_hex: "a1646e616d6565636166c3a9",
        },
        GoldenVector {
            name: "nested array and object",
            json: r#"{"list":[1,true,null],"obj":{"z":1,"a":2}}"#,
            canonical_hex: "a2636f626aa2616102617a01646c6973748301f5f6",
        },
    ]
}

/// Canonical bytes of a vector's payload, hex-encoded.
pub fn compute(vector: &GoldenVector) -> Result<String, quire_core::CoreError> {
    let payload = Payload::from_json(vector.json.as_bytes())?;
    Ok(hex::encode(canonicalize(&payload)))
}

/// Check every vector: `(name, matches, computed hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let computed = compute(v).unwrap_or_else(|e| format!("error: {e}"));
            (v.name.to_string(), computed == v.canonical_hex, computed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, computed) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {computed}");
        }
    }

    #[test]
    fn test_vector_names_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }
}

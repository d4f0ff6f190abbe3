//! Canonical CBOR encoding of instance payloads.
//!
//! Payloads arrive as JSON objects, but JSON text is not stable across
//! serializers. The bytes that get signed are instead the RFC 8949 Core
//! Deterministic CBOR encoding of the payload with the `signature` key
//! removed:
//! - Map keys: text strings, sorted by their CBOR-encoded bytes
//! - Integers: smallest valid encoding
//! - Non-integral numbers: always binary64
//! - Integral numbers that fit in i64: encoded as integers, so `1` and `1.0`
//!   canonicalize identically
//! - Lengths: definite only
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use ciborium::value::{Integer, Value as Cbor};
use serde_json::{Map, Number, Value as Json};

use crate::instance::{keys, Payload};

/// Domain separation prefix for instance signatures.
pub const SIGN_DOMAIN: &[u8] = b"quire/instance-sig/v1";

/// Canonical bytes of a payload: the exact input to signing and verification.
///
/// The `signature` key, if present, is excluded.
pub fn canonicalize(payload: &Payload) -> Vec<u8> {
    let entries = payload
        .as_map()
        .iter()
        .filter(|(k, _)| k.as_str() != keys::SIGNATURE)
        .map(|(k, v)| (Cbor::Text(k.clone()), json_to_cbor(v)))
        .collect();
    encode_cbor_canonical(&Cbor::Map(entries))
}

/// Canonical bytes of an arbitrary JSON value.
pub fn canonical_json(value: &Json) -> Vec<u8> {
    encode_cbor_canonical(&json_to_cbor(value))
}

/// Build the message to sign (with domain separation).
pub fn sign_message(canonical: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + canonical.len());
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(canonical);
    msg
}

fn json_to_cbor(value: &Json) -> Cbor {
    match value {
        Json::Null => Cbor::Null,
        Json::Bool(b) => Cbor::Bool(*b),
        Json::Number(n) => number_to_cbor(n),
        Json::String(s) => Cbor::Text(s.clone()),
        Json::Array(items) => Cbor::Array(items.iter().map(json_to_cbor).collect()),
        Json::Object(map) => object_to_cbor(map),
    }
}

fn object_to_cbor(map: &Map<String, Json>) -> Cbor {
    Cbor::Map(
        map.iter()
            .map(|(k, v)| (Cbor::Text(k.clone()), json_to_cbor(v)))
            .collect(),
    )
}

fn number_to_cbor(n: &Number) -> Cbor {
    if let Some(u) = n.as_u64() {
        return Cbor::Integer(Integer::from(u));
    }
    if let Some(i) = n.as_i64() {
        return Cbor::Integer(Integer::from(i));
    }
    // serde_json numbers are always finite.
    let f = n.as_f64().unwrap_or_default();
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return Cbor::Integer(Integer::from(f as i64));
    }
    Cbor::Float(f)
}

/// Encode a CBOR value to canonical bytes.
fn encode_cbor_canonical(value: &Cbor) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
///
/// Only the value kinds produced by [`json_to_cbor`] can reach this function.
fn encode_value(buf: &mut Vec<u8>, value: &Cbor) {
    match value {
        Cbor::Integer(i) => encode_integer(buf, *i),
        Cbor::Float(f) => encode_float(buf, *f),
        Cbor::Bytes(b) => encode_bytes(buf, b),
        Cbor::Text(s) => encode_text(buf, s),
        Cbor::Array(arr) => encode_array(buf, arr),
        Cbor::Map(entries) => encode_map(buf, entries),
        Cbor::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        _ => buf.push(0xf6),
    }
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_float(buf: &mut Vec<u8>, f: f64) {
    buf.push(0xfb);
    buf.extend_from_slice(&f.to_bits().to_be_bytes());
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Cbor]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item);
    }
}

fn encode_map(buf: &mut Vec<u8>, entries: &[(Cbor, Cbor)]) {
    // RFC 8949 canonical: sort keys by CBOR-encoded bytes
    let mut sorted: Vec<_> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_bytes = Vec::new();
            encode_value(&mut key_bytes, k);
            (key_bytes, v)
        })
        .collect();

    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, sorted.len() as u64);
    for (key_bytes, v) in sorted {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, v);
    }
}

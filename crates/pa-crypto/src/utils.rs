//! Byte helpers shared by the envelope and KDF code.

use constant_time_eq::constant_time_eq;

/// Compares authentication tags without leaking the position of the first
/// differing byte. Slices of different length compare unequal.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}

/// Concatenates byte slices into a fresh buffer.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(len);
    for p in parts {
        out.extend_from_slice(p);
    }
    out
}

//! Stable token fingerprinting.
//!
//! Preprocessing stages that map tokens into bounded integer ranges (OOV
//! buckets, hash bins, crossed-feature bins) all route through the same
//! fingerprint so bucket assignments are reproducible across runs and
//! platforms. The function is CityHash64, ported from
//! <https://github.com/google/cityhash> (src/city.cc). It is frozen:
//! changing it would silently remap every hashed feature in every trained
//! model downstream.
//!
//! Integer tokens are fingerprinted through their canonical decimal
//! representation, so the string `"42"` and the integer `42` land in the same
//! bucket.

use crate::error::{LayerError, Result};
use featflow_tensor::{DType, Scalar};
use std::borrow::Cow;

const K0: u64 = 0xc3a5c85c97cb3127;
const K1: u64 = 0xb492b66fbe98f273;
const K2: u64 = 0x9ae16a3b2f90404f;

#[inline]
fn fetch64(s: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&s[..8]);
    u64::from_le_bytes(b)
}

#[inline]
fn fetch32(s: &[u8]) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&s[..4]);
    u32::from_le_bytes(b)
}

#[inline]
fn rotate(val: u64, shift: u32) -> u64 {
    // Matches city.cc behavior: shift==0 => val, otherwise rotate.
    if shift == 0 {
        val
    } else {
        val.rotate_right(shift)
    }
}

#[inline]
fn shift_mix(val: u64) -> u64 {
    val ^ (val >> 47)
}

#[inline]
fn hash128to64(u: u64, v: u64) -> u64 {
    // city.h Hash128to64.
    const K_MUL: u64 = 0x9ddfea08eb382d69;
    let mut a = (u ^ v).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b = b.wrapping_mul(K_MUL);
    b
}

#[inline]
fn hash_len16(u: u64, v: u64) -> u64 {
    hash128to64(u, v)
}

#[inline]
fn hash_len16_mul(u: u64, v: u64, mul: u64) -> u64 {
    let mut a = (u ^ v).wrapping_mul(mul);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(mul);
    b ^= b >> 47;
    b = b.wrapping_mul(mul);
    b
}

fn hash_len0to16(s: &[u8]) -> u64 {
    let len = s.len();
    if len >= 8 {
        let mul = K2.wrapping_add((len as u64).wrapping_mul(2));
        let a = fetch64(s).wrapping_add(K2);
        let b = fetch64(&s[len - 8..]);
        let c = rotate(b, 37).wrapping_mul(mul).wrapping_add(a);
        let d = rotate(a, 25).wrapping_add(b).wrapping_mul(mul);
        return hash_len16_mul(c, d, mul);
    }
    if len >= 4 {
        let mul = K2.wrapping_add((len as u64).wrapping_mul(2));
        let a = fetch32(s) as u64;
        let b = fetch32(&s[len - 4..]) as u64;
        return hash_len16_mul((len as u64).wrapping_add(a << 3), b, mul);
    }
    if len > 0 {
        let a = s[0] as u64;
        let b = s[len >> 1] as u64;
        let c = s[len - 1] as u64;
        let y = a.wrapping_add(b << 8);
        let z = (len as u64).wrapping_add(c << 2);
        return shift_mix(y.wrapping_mul(K2) ^ z.wrapping_mul(K0)).wrapping_mul(K2);
    }
    K2
}

fn hash_len17to32(s: &[u8]) -> u64 {
    let len = s.len();
    let mul = K2.wrapping_add((len as u64).wrapping_mul(2));
    let a = fetch64(s).wrapping_mul(K1);
    let b = fetch64(&s[8..]);
    let c = fetch64(&s[len - 8..]).wrapping_mul(mul);
    let d = fetch64(&s[len - 16..]).wrapping_mul(K2);
    hash_len16_mul(
        rotate(a.wrapping_add(b), 43)
            .wrapping_add(rotate(c, 30))
            .wrapping_add(d),
        a.wrapping_add(rotate(b.wrapping_add(K2), 18)).wrapping_add(c),
        mul,
    )
}

fn hash_len33to64(s: &[u8]) -> u64 {
    let len = s.len();
    let mul = K2.wrapping_add((len as u64).wrapping_mul(2));
    let mut a = fetch64(s).wrapping_mul(K2);
    let b = fetch64(&s[8..]);
    let c = fetch64(&s[len - 24..]);
    let d = fetch64(&s[len - 32..]);
    let e = fetch64(&s[16..]).wrapping_mul(K2);
    let f = fetch64(&s[24..]).wrapping_mul(9);
    let g = fetch64(&s[len - 8..]);
    let h = fetch64(&s[len - 16..]).wrapping_mul(mul);
    let u = rotate(a.wrapping_add(g), 43).wrapping_add(rotate(b, 30).wrapping_add(c).wrapping_mul(9));
    let v = a.wrapping_add(g) ^ d;
    let v = v.wrapping_add(f).wrapping_add(1);
    let w = (u.wrapping_add(v)).wrapping_mul(mul).swap_bytes().wrapping_add(h);
    let x = rotate(e.wrapping_add(f), 42).wrapping_add(c);
    let y = (v.wrapping_add(w)).wrapping_mul(mul).swap_bytes().wrapping_add(g).wrapping_mul(mul);
    let z = e.wrapping_add(f).wrapping_add(c);
    a = (x.wrapping_add(z)).wrapping_mul(mul).wrapping_add(y).swap_bytes().wrapping_add(b);
    let b2 = shift_mix(z.wrapping_add(a).wrapping_mul(mul).wrapping_add(d).wrapping_add(h))
        .wrapping_mul(mul);
    b2.wrapping_add(x)
}

fn weak_hash_len32_with_seeds(w: u64, x: u64, y: u64, z: u64, mut a: u64, mut b: u64) -> (u64, u64) {
    a = a.wrapping_add(w);
    b = rotate(b.wrapping_add(a).wrapping_add(z), 21);
    let c = a;
    a = a.wrapping_add(x);
    a = a.wrapping_add(y);
    b = b.wrapping_add(rotate(a, 44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

fn weak_hash_len32_with_seeds_bytes(s: &[u8], a: u64, b: u64) -> (u64, u64) {
    weak_hash_len32_with_seeds(
        fetch64(s),
        fetch64(&s[8..]),
        fetch64(&s[16..]),
        fetch64(&s[24..]),
        a,
        b,
    )
}

/// CityHash64 over a byte string.
///
/// Deterministic across runs and platforms; this function is a compatibility
/// contract and must never change.
pub fn fingerprint64(s: &[u8]) -> u64 {
    let len = s.len();
    if len <= 32 {
        if len <= 16 {
            return hash_len0to16(s);
        }
        return hash_len17to32(s);
    }
    if len <= 64 {
        return hash_len33to64(s);
    }

    // For strings over 64 bytes we hash the end first, and then as we loop we
    // keep 56 bytes of state: v, w, x, y, and z.
    let mut x = fetch64(&s[len - 40..]);
    let mut y = fetch64(&s[len - 16..]).wrapping_add(fetch64(&s[len - 56..]));
    let mut z = hash_len16(
        fetch64(&s[len - 48..]).wrapping_add(len as u64),
        fetch64(&s[len - 24..]),
    );
    let mut v = weak_hash_len32_with_seeds_bytes(&s[len - 64..], len as u64, z);
    let mut w = weak_hash_len32_with_seeds_bytes(&s[len - 32..], y.wrapping_add(K1), x);
    x = x.wrapping_mul(K1).wrapping_add(fetch64(s));

    // Decrease len to the nearest multiple of 64, and operate on 64-byte chunks.
    let mut pos = 0usize;
    let mut remaining = (len - 1) & !63usize;
    while remaining != 0 {
        x = rotate(
            x.wrapping_add(y)
                .wrapping_add(v.0)
                .wrapping_add(fetch64(&s[pos + 8..])),
            37,
        )
        .wrapping_mul(K1);
        y = rotate(
            y.wrapping_add(v.1).wrapping_add(fetch64(&s[pos + 48..])),
            42,
        )
        .wrapping_mul(K1);
        x ^= w.1;
        y = y.wrapping_add(v.0).wrapping_add(fetch64(&s[pos + 40..]));
        z = rotate(z.wrapping_add(w.0), 33).wrapping_mul(K1);
        v = weak_hash_len32_with_seeds_bytes(&s[pos..], v.1.wrapping_mul(K1), x.wrapping_add(w.0));
        w = weak_hash_len32_with_seeds_bytes(
            &s[pos + 32..],
            z.wrapping_add(w.1),
            y.wrapping_add(fetch64(&s[pos + 16..])),
        );
        std::mem::swap(&mut z, &mut x);
        pos += 64;
        remaining -= 64;
    }

    hash_len16(
        hash_len16(v.0, w.0)
            .wrapping_add(shift_mix(y).wrapping_mul(K1))
            .wrapping_add(z),
        hash_len16(v.1, w.1).wrapping_add(x),
    )
}

/// Salted CityHash64, per city.cc `CityHash64WithSeeds(s, K2, salt)`.
///
/// The salt decorrelates independent hashing layers over the same token
/// space; it perturbs the overall bucket assignment, it does not re-key the
/// hash cryptographically.
pub fn fingerprint64_salted(s: &[u8], salt: u64) -> u64 {
    hash_len16(fingerprint64(s).wrapping_sub(K2), salt)
}

/// Returns the canonical byte encoding of a token: UTF-8 bytes for strings,
/// the decimal representation for integers.
///
/// # Errors
///
/// Returns [`LayerError::TypeMismatch`] for float input; floats are not
/// tokens.
pub(crate) fn token_bytes(token: &Scalar) -> Result<Cow<'_, [u8]>> {
    match token {
        Scalar::Str(s) => Ok(Cow::Borrowed(s.as_bytes())),
        Scalar::I64(v) => Ok(Cow::Owned(v.to_string().into_bytes())),
        Scalar::F32(_) => Err(LayerError::TypeMismatch {
            expected: DType::Str,
            got: DType::F32,
        }),
    }
}

/// Maps a token into `[0, num_bins)` via the (optionally salted) fingerprint.
pub fn bucket(token: &Scalar, num_bins: usize, salt: Option<u64>) -> Result<i64> {
    if num_bins == 0 {
        return Err(LayerError::Config {
            message: "num_bins must be positive".to_string(),
        });
    }
    let bytes = token_bytes(token)?;
    let hash = match salt {
        Some(salt) => fingerprint64_salted(&bytes, salt),
        None => fingerprint64(&bytes),
    };
    Ok((hash % num_bins as u64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let mid = "x".repeat(40);
        let long = "y".repeat(200);
        for token in ["", "a", "category", mid.as_str(), long.as_str()] {
            assert_eq!(fingerprint64(token.as_bytes()), fingerprint64(token.as_bytes()));
        }
        assert_eq!(
            fingerprint64_salted(b"category", 7),
            fingerprint64_salted(b"category", 7)
        );
    }

    #[test]
    fn test_low_bits_match_reference_vector() {
        // CityHash64 over the 8 little-endian bytes of 185, masked to 49
        // bits, per the reference C++ implementation.
        let hash = fingerprint64(&185u64.to_le_bytes());
        assert_eq!(hash & ((1u64 << 49) - 1), 27547852289312);
    }

    #[test]
    fn test_salt_changes_assignment() {
        let tokens: Vec<String> = (0..64).map(|i| format!("token_{}", i)).collect();
        let unsalted: Vec<i64> = tokens
            .iter()
            .map(|t| bucket(&Scalar::from(t.as_str()), 16, None).unwrap())
            .collect();
        let salted: Vec<i64> = tokens
            .iter()
            .map(|t| bucket(&Scalar::from(t.as_str()), 16, Some(1)).unwrap())
            .collect();
        assert_ne!(unsalted, salted);
    }

    #[test]
    fn test_int_and_decimal_string_agree() {
        let a = bucket(&Scalar::I64(42), 1000, None).unwrap();
        let b = bucket(&Scalar::from("42"), 1000, None).unwrap();
        assert_eq!(a, b);

        let a = bucket(&Scalar::I64(-5), 1000, None).unwrap();
        let b = bucket(&Scalar::from("-5"), 1000, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bucket_in_range() {
        for i in 0..100i64 {
            let b = bucket(&Scalar::I64(i), 7, None).unwrap();
            assert!((0..7).contains(&b));
        }
    }

    #[test]
    fn test_bucket_rejects_floats_and_zero_bins() {
        assert!(bucket(&Scalar::F32(1.0), 4, None).is_err());
        assert!(bucket(&Scalar::I64(1), 0, None).is_err());
    }
}

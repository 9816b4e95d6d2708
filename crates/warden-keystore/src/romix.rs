//! scrypt without the `log_n < 16 * r` restriction.
//!
//! RFC 7914 bounds `n` by `2^(128 * r / 8)`, which rules out the `r = 1`,
//! `n = 2^18` parameters geth writes for its scrypt documents. The `scrypt`
//! crate enforces that bound, so documents it rejects are derived here:
//! PBKDF2-HMAC-SHA256 on both ends with Salsa20/8 ROMix in between.
//! Callers validate `n`, `r` and `p` first.

use pbkdf2::pbkdf2_hmac;
use salsa20::cipher::typenum::U4;
use salsa20::cipher::StreamCipherCore;
use salsa20::SalsaCore;
use sha2::Sha256;
use zeroize::Zeroizing;

type Salsa20_8 = SalsaCore<U4>;

const BLOCK: usize = 64;

/// Derive `out.len()` bytes. `n` must be a power of two, `r` and `p` non-zero.
pub(crate) fn scrypt(password: &[u8], salt: &[u8], n: usize, r: usize, p: usize, out: &mut [u8]) {
    let len = 128 * r;
    let mut b = Zeroizing::new(vec![0u8; p * len]);
    pbkdf2_hmac::<Sha256>(password, salt, 1, &mut b);

    let mut v = Zeroizing::new(vec![0u8; n * len]);
    let mut t = Zeroizing::new(vec![0u8; len]);
    for chunk in b.chunks_mut(len) {
        ro_mix(chunk, &mut v, &mut t, n);
    }

    pbkdf2_hmac::<Sha256>(password, &b, 1, out);
}

fn ro_mix(b: &mut [u8], v: &mut [u8], t: &mut [u8], n: usize) {
    let len = b.len();
    for chunk in v.chunks_mut(len) {
        chunk.copy_from_slice(b);
        block_mix(chunk, b);
    }
    for _ in 0..n {
        let j = integerify(b) & (n - 1);
        xor(b, &v[j * len..(j + 1) * len], t);
        block_mix(t, b);
    }
}

/// Low bits of the last block's first word, little-endian.
fn integerify(b: &[u8]) -> usize {
    let mut word = [0u8; 8];
    word.copy_from_slice(&b[b.len() - BLOCK..b.len() - BLOCK + 8]);
    u64::from_le_bytes(word) as usize
}

fn block_mix(input: &[u8], output: &mut [u8]) {
    let half = input.len() / 2;
    let mut x = [0u8; BLOCK];
    x.copy_from_slice(&input[input.len() - BLOCK..]);

    let mut t = [0u8; BLOCK];
    for (i, chunk) in input.chunks(BLOCK).enumerate() {
        xor(&x, chunk, &mut t);
        let mut state = [0u32; 16];
        for (word, bytes) in state.iter_mut().zip(t.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Salsa20_8::from_raw_state(state).write_keystream_block((&mut x).into());

        // Even blocks fill the first half, odd blocks the second.
        let pos = (i / 2) * BLOCK + if i % 2 == 0 { 0 } else { half };
        output[pos..pos + BLOCK].copy_from_slice(&x);
    }
}

fn xor(a: &[u8], b: &[u8], out: &mut [u8]) {
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x ^ y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(password: &[u8], salt: &[u8], log_n: u8, r: u32, p: u32, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        scrypt(password, salt, 1 << log_n, r as usize, p as usize, &mut out);
        out
    }

    #[test]
    fn test_rfc7914_vectors() {
        assert_eq!(
            hex::encode(derive(b"", b"", 4, 1, 1, 64)),
            "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442\
             fcd0069ded0948f8326a753a0fc81f17e8d3e0fb2e0d3628cf35e20c38d18906"
        );
        assert_eq!(
            hex::encode(derive(b"password", b"NaCl", 10, 8, 16, 64)),
            "fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b373162\
             2eaf30d92e22a3886ff109279d9830dac727afb94a83ee6d8360cbdfa2cc0640"
        );
    }

    #[test]
    fn test_matches_scrypt_crate_where_both_apply() {
        for (log_n, r, p) in [(1u8, 1u32, 1u32), (8, 1, 3), (4, 8, 1), (10, 2, 2)] {
            let params = ::scrypt::Params::new(log_n, r, p, 32).unwrap();
            let mut expected = [0u8; 32];
            ::scrypt::scrypt(b"pw", b"salt", &params, &mut expected).unwrap();
            assert_eq!(
                derive(b"pw", b"salt", log_n, r, p, 32),
                expected.to_vec(),
                "log_n = {}, r = {}, p = {}",
                log_n,
                r,
                p
            );
        }
    }

    #[test]
    fn test_handles_params_scrypt_crate_rejects() {
        // log_n = 16 with r = 1 fails the RFC bound.
        assert!(::scrypt::Params::new(16, 1, 1, 32).is_err());
        let a = derive(b"pw", b"salt", 16, 1, 1, 32);
        let b = derive(b"pw", b"salt", 16, 1, 1, 32);
        assert_eq!(a, b);
        assert_ne!(a, derive(b"pw", b"salt", 16, 1, 2, 32));
    }
}

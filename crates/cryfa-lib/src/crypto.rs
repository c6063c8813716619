//! Password-derived key/IV and the AES-CBC envelope.
//!
//! The derivation walks the password through the minstd LCG with fixed
//! salt constants, once for the key and once for the IV. The exact
//! arithmetic is part of the file format; it is not a modern KDF, and
//! the watermark versioning leaves room for one.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CryfaError, Result};
use crate::shuffle::MinStd;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const VERSION_MAJOR: u32 = 1;
const VERSION_MINOR: u32 = 0;

pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

/// The non-secret first line of every encrypted file.
pub fn watermark() -> String {
    format!("#cryfa v{VERSION_MAJOR}.{VERSION_MINOR}\n")
}

/// Derive the 16 AES key bytes from the password.
pub fn derive_key(password: &[u8]) -> [u8; KEY_LEN] {
    debug_assert!(password.len() >= 8, "password is validated before derivation");
    let f = u64::from(password[0]) * u64::from(password[2]);
    derive_bytes(password, 24593, 49157, f)
}

/// Derive the 16 IV bytes from the password.
pub fn derive_iv(password: &[u8]) -> [u8; IV_LEN] {
    debug_assert!(password.len() >= 8, "password is validated before derivation");
    let f = u64::from(password[2]) * u64::from(password[5]);
    derive_bytes(password, 7919, 75653, f)
}

/// Shared derivation: seed an LCG with `c1·f + c2`, fold the password
/// into a 32-bit seed, then draw the output bytes as `rand() mod 255`.
fn derive_bytes(password: &[u8], c1: u64, c2: u64, f: u64) -> [u8; 16] {
    let mut lcg = MinStd::new(c1.wrapping_mul(f).wrapping_add(c2));
    let mut seed = 0u64;
    for &b in password {
        let pair = u64::from(lcg.next()).wrapping_add(u64::from(lcg.next()));
        seed = seed.wrapping_add(u64::from(b).wrapping_mul(pair));
    }
    let seed = seed % 0xFFFF_FFFF;

    let mut out_rng = MinStd::new(seed);
    let mut out = [0u8; 16];
    for byte in &mut out {
        *byte = (out_rng.next() % 255) as u8;
    }
    out
}

/// Wrap the packed stream: watermark line followed by the CBC
/// ciphertext (PKCS#7 padded).
pub fn encrypt(packed: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let key = derive_key(password);
    let iv = derive_iv(password);
    let ciphertext =
        Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(packed);

    let mut out = watermark().into_bytes();
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Unwrap an envelope produced by [`encrypt`]: verify and strip the
/// watermark, then CBC-decrypt the remainder.
pub fn decrypt(envelope: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let mark = watermark();
    let ciphertext = envelope
        .strip_prefix(mark.as_bytes())
        .ok_or(CryfaError::InvalidCiphertext)?;

    let key = derive_key(password);
    let iv = derive_iv(password);
    Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CryfaError::CipherFailure(e.to_string()))
}

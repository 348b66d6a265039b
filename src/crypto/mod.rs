use crate::error::{GatewayError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub mod rijndael;

use rijndael::Rijndael;

pub const PAYLOAD_BLOCK_LEN: usize = 32;

/// CBC-mode Rijndael-256 over base64 text, as exchanged with AsanPardakht.
pub struct PayloadCipher {
    cipher: Rijndael,
    iv: Vec<u8>,
}

impl PayloadCipher {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != PAYLOAD_BLOCK_LEN {
            return Err(GatewayError::Cipher(format!(
                "iv must be {PAYLOAD_BLOCK_LEN} bytes, got {}",
                iv.len()
            )));
        }
        Ok(Self {
            cipher: Rijndael::new(&normalize_key(key)?, PAYLOAD_BLOCK_LEN)?,
            iv: iv.to_vec(),
        })
    }

    pub fn from_base64(key: &str, iv: &str) -> Result<Self> {
        let key = BASE64
            .decode(key.trim())
            .map_err(|e| GatewayError::Cipher(format!("key is not base64: {e}")))?;
        let iv = BASE64
            .decode(iv.trim())
            .map_err(|e| GatewayError::Cipher(format!("iv is not base64: {e}")))?;
        Self::new(&key, &iv)
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut data = add_padding(plaintext.as_bytes(), PAYLOAD_BLOCK_LEN);
        let mut prev = self.iv.clone();
        for block in data.chunks_exact_mut(PAYLOAD_BLOCK_LEN) {
            for (b, p) in block.iter_mut().zip(&prev) {
                *b ^= p;
            }
            self.cipher.encrypt_block(block);
            prev.copy_from_slice(block);
        }
        BASE64.encode(data)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        // Form decoding may have turned '+' into ' '.
        let normalized = ciphertext.trim().replace(' ', "+");
        let mut data = BASE64
            .decode(normalized)
            .map_err(|e| GatewayError::Cipher(format!("payload is not base64: {e}")))?;
        if data.is_empty() || data.len() % PAYLOAD_BLOCK_LEN != 0 {
            return Err(GatewayError::Cipher(format!(
                "payload length {} is not a multiple of {PAYLOAD_BLOCK_LEN}",
                data.len()
            )));
        }

        let mut prev = self.iv.clone();
        for block in data.chunks_exact_mut(PAYLOAD_BLOCK_LEN) {
            let saved = block.to_vec();
            self.cipher.decrypt_block(block);
            for (b, p) in block.iter_mut().zip(&prev) {
                *b ^= p;
            }
            prev = saved;
        }

        let plain = strip_padding(&data)
            .ok_or_else(|| GatewayError::Cipher("invalid padding".to_string()))?;
        String::from_utf8(plain.to_vec())
            .map_err(|_| GatewayError::Cipher("payload is not utf-8".to_string()))
    }
}

/// Short keys are zero-padded up to the next Rijndael key size.
fn normalize_key(key: &[u8]) -> Result<Vec<u8>> {
    let target = match key.len() {
        1..=16 => 16,
        17..=24 => 24,
        25..=32 => 32,
        n => {
            return Err(GatewayError::Cipher(format!("unsupported key length {n}")));
        }
    };
    let mut out = key.to_vec();
    out.resize(target, 0);
    Ok(out)
}

/// Always appends between 1 and `block_len` bytes, each holding the pad length.
pub fn add_padding(data: &[u8], block_len: usize) -> Vec<u8> {
    let pad = block_len - data.len() % block_len;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad as u8).take(pad));
    out
}

pub fn strip_padding(data: &[u8]) -> Option<&[u8]> {
    let pad = *data.last()? as usize;
    if pad == 0 || pad > data.len() {
        return None;
    }
    let (body, tail) = data.split_at(data.len() - pad);
    tail.iter().all(|&b| b as usize == pad).then_some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> PayloadCipher {
        let key: Vec<u8> = (1u8..=32).collect();
        let iv: Vec<u8> = (32u8..64).collect();
        PayloadCipher::from_base64(&BASE64.encode(key), &BASE64.encode(iv)).unwrap()
    }

    #[test]
    fn padding_always_adds_a_block_fragment() {
        assert_eq!(add_padding(b"abc", 32).len(), 32);
        assert_eq!(add_padding(&[7u8; 32], 32).len(), 64);
        assert_eq!(*add_padding(&[7u8; 32], 32).last().unwrap(), 32);
        assert_eq!(strip_padding(&add_padding(b"abc", 32)), Some(&b"abc"[..]));
    }

    #[test]
    fn strip_padding_rejects_garbage() {
        assert_eq!(strip_padding(&[]), None);
        assert_eq!(strip_padding(&[1, 2, 0]), None);
        assert_eq!(strip_padding(&[1, 2, 3]), None);
        assert_eq!(strip_padding(&[9, 9]), None);
    }

    #[test]
    fn encrypts_and_decrypts_payloads() {
        let c = cipher();
        let plain = "1,user,pass,42,15000,20240101 101010,,http://shop/callback?transaction_id=42,0";
        let encrypted = c.encrypt(plain);
        assert_ne!(encrypted, plain);
        assert_eq!(c.decrypt(&encrypted).unwrap(), plain);
    }

    #[test]
    fn same_plaintext_differs_across_blocks_in_cbc() {
        let c = cipher();
        let encrypted = BASE64.decode(c.encrypt(&"a".repeat(64))).unwrap();
        assert_ne!(encrypted[..32], encrypted[32..64]);
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let c = cipher();
        assert!(c.decrypt(&BASE64.encode([0u8; 31])).is_err());
        assert!(c.decrypt("not base64!").is_err());
    }

    #[test]
    fn rejects_short_iv() {
        assert!(PayloadCipher::new(&[0u8; 32], &[0u8; 16]).is_err());
    }
}

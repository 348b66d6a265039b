//! Rijndael block cipher with a configurable block size.
//!
//! AES is the 128-bit block subset of Rijndael; AsanPardakht's payloads use the
//! 256-bit block variant, which no maintained crate exposes.

use crate::error::{GatewayError, Result};
use std::sync::OnceLock;

struct SBoxes {
    forward: [u8; 256],
    inverse: [u8; 256],
}

fn sboxes() -> &'static SBoxes {
    static TABLES: OnceLock<SBoxes> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut forward = [0u8; 256];
        let mut inverse = [0u8; 256];
        for x in 0..=255u8 {
            let inv = if x == 0 {
                0
            } else {
                (1..=255u8).find(|&y| gmul(x, y) == 1).unwrap_or(0)
            };
            let s = inv
                ^ inv.rotate_left(1)
                ^ inv.rotate_left(2)
                ^ inv.rotate_left(3)
                ^ inv.rotate_left(4)
                ^ 0x63;
            forward[x as usize] = s;
            inverse[s as usize] = x;
        }
        SBoxes { forward, inverse }
    })
}

fn xtime(a: u8) -> u8 {
    (a << 1) ^ if a & 0x80 != 0 { 0x1b } else { 0 }
}

fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut p = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            p ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    p
}

pub struct Rijndael {
    nb: usize,
    nr: usize,
    shifts: [usize; 4],
    round_keys: Vec<[u8; 4]>,
}

impl Rijndael {
    /// `key` must be 16, 24 or 32 bytes; `block_len` 16, 24 or 32.
    pub fn new(key: &[u8], block_len: usize) -> Result<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(GatewayError::Cipher(format!(
                "unsupported key length {}",
                key.len()
            )));
        }
        if !matches!(block_len, 16 | 24 | 32) {
            return Err(GatewayError::Cipher(format!(
                "unsupported block length {block_len}"
            )));
        }

        let nk = key.len() / 4;
        let nb = block_len / 4;
        let nr = nk.max(nb) + 6;
        let shifts = if nb == 8 { [0, 1, 3, 4] } else { [0, 1, 2, 3] };

        let sbox = &sboxes().forward;
        let total = nb * (nr + 1);
        let mut w: Vec<[u8; 4]> = key
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        let mut rcon = 1u8;
        for i in nk..total {
            let mut temp = w[i - 1];
            if i % nk == 0 {
                temp.rotate_left(1);
                for b in temp.iter_mut() {
                    *b = sbox[*b as usize];
                }
                temp[0] ^= rcon;
                rcon = xtime(rcon);
            } else if nk > 6 && i % nk == 4 {
                for b in temp.iter_mut() {
                    *b = sbox[*b as usize];
                }
            }
            let prev = w[i - nk];
            w.push([
                prev[0] ^ temp[0],
                prev[1] ^ temp[1],
                prev[2] ^ temp[2],
                prev[3] ^ temp[3],
            ]);
        }

        Ok(Self {
            nb,
            nr,
            shifts,
            round_keys: w,
        })
    }

    pub fn block_len(&self) -> usize {
        self.nb * 4
    }

    pub fn encrypt_block(&self, state: &mut [u8]) {
        debug_assert_eq!(state.len(), self.block_len());
        self.add_round_key(state, 0);
        for round in 1..self.nr {
            self.sub_bytes(state, &sboxes().forward);
            self.shift_rows(state);
            self.mix_columns(state);
            self.add_round_key(state, round);
        }
        self.sub_bytes(state, &sboxes().forward);
        self.shift_rows(state);
        self.add_round_key(state, self.nr);
    }

    pub fn decrypt_block(&self, state: &mut [u8]) {
        debug_assert_eq!(state.len(), self.block_len());
        self.add_round_key(state, self.nr);
        for round in (1..self.nr).rev() {
            self.inv_shift_rows(state);
            self.sub_bytes(state, &sboxes().inverse);
            self.add_round_key(state, round);
            self.inv_mix_columns(state);
        }
        self.inv_shift_rows(state);
        self.sub_bytes(state, &sboxes().inverse);
        self.add_round_key(state, 0);
    }

    fn add_round_key(&self, state: &mut [u8], round: usize) {
        for c in 0..self.nb {
            let word = self.round_keys[round * self.nb + c];
            for r in 0..4 {
                state[r + 4 * c] ^= word[r];
            }
        }
    }

    fn sub_bytes(&self, state: &mut [u8], table: &[u8; 256]) {
        for b in state.iter_mut() {
            *b = table[*b as usize];
        }
    }

    fn shift_rows(&self, state: &mut [u8]) {
        for r in 1..4 {
            let row: Vec<u8> = (0..self.nb).map(|c| state[r + 4 * c]).collect();
            for c in 0..self.nb {
                state[r + 4 * c] = row[(c + self.shifts[r]) % self.nb];
            }
        }
    }

    fn inv_shift_rows(&self, state: &mut [u8]) {
        for r in 1..4 {
            let row: Vec<u8> = (0..self.nb).map(|c| state[r + 4 * c]).collect();
            for c in 0..self.nb {
                state[r + 4 * ((c + self.shifts[r]) % self.nb)] = row[c];
            }
        }
    }

    fn mix_columns(&self, state: &mut [u8]) {
        for col in state.chunks_exact_mut(4) {
            let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
            col[0] = gmul(a0, 2) ^ gmul(a1, 3) ^ a2 ^ a3;
            col[1] = a0 ^ gmul(a1, 2) ^ gmul(a2, 3) ^ a3;
            col[2] = a0 ^ a1 ^ gmul(a2, 2) ^ gmul(a3, 3);
            col[3] = gmul(a0, 3) ^ a1 ^ a2 ^ gmul(a3, 2);
        }
    }

    fn inv_mix_columns(&self, state: &mut [u8]) {
        for col in state.chunks_exact_mut(4) {
            let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
            col[0] = gmul(a0, 14) ^ gmul(a1, 11) ^ gmul(a2, 13) ^ gmul(a3, 9);
            col[1] = gmul(a0, 9) ^ gmul(a1, 14) ^ gmul(a2, 11) ^ gmul(a3, 13);
            col[2] = gmul(a0, 13) ^ gmul(a1, 9) ^ gmul(a2, 14) ^ gmul(a3, 11);
            col[3] = gmul(a0, 11) ^ gmul(a1, 13) ^ gmul(a2, 9) ^ gmul(a3, 14);
        }
    }
}

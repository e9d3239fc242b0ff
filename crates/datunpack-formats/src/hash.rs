//! Name hash used by DAT archive indices
//!
//! Every record in a DAT index identifies its payload only by a 32-bit hash
//! of the original asset path. The hash is a bit-serial shift register: for
//! each input bit the state is shifted left by one and the new low bit is
//! the XOR of four feedback taps (bits 31, 21, 1 and 0) with the input bit.
//! Input bytes are consumed least significant bit first.
//!
//! Names are hashed as single-byte (Latin-1) strings. A name containing a
//! character outside that range hashes to `0`.

use tracing::warn;

/// Initial shift register state, also the hash of the empty string
pub const INITIAL_STATE: u32 = 1;

const TAP_31: u32 = 0x8000_0000;
const TAP_21: u32 = 0x0020_0000;
const TAP_1: u32 = 0x0000_0002;
const TAP_0: u32 = 0x0000_0001;

/// Hash a name the way DAT archive indices do
///
/// Returns `0` when `name` contains a character that cannot be encoded as a
/// single Latin-1 byte.
///
/// # Examples
///
/// ```
/// use datunpack_formats::hash::dat_hash;
///
/// assert_eq!(dat_hash(""), 1);
/// assert_eq!(dat_hash("test"), 0x88e8_bb66);
/// ```
pub fn dat_hash(name: &str) -> u32 {
    if name.is_empty() {
        return INITIAL_STATE;
    }

    let Some(bytes) = encode_latin1(name) else {
        warn!("Name is not representable as Latin-1, hashing to 0: {name:?}");
        return 0;
    };

    hash_bytes(&bytes)
}

/// Hash raw single-byte input
///
/// The register is advanced once per input bit. When the byte cursor runs
/// past the end of the input before the final iteration the loop stops early,
/// leaving the register partially advanced.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut state = INITIAL_STATE;
    let bit_budget = bytes.len() * 8;
    if bit_budget == 0 {
        return state;
    }

    let mut byte_index = 0usize;
    let mut mask = 1u32;

    for iteration in 0..bit_budget {
        let d = state & TAP_31 != 0;
        let a = state & TAP_21 != 0;
        let b = state & TAP_1 != 0;
        let c = state & TAP_0 != 0;

        state <<= 1;

        let x = bytes
            .get(byte_index)
            .is_some_and(|&byte| u32::from(byte) & mask != 0);

        if d ^ a ^ b ^ c ^ x {
            state |= 1;
        }

        mask <<= 1;
        if mask > 0xFF {
            mask = 1;
            byte_index += 1;
        }

        if byte_index >= bytes.len() && iteration < bit_budget - 1 {
            warn!(
                "Hash truncated after {} of {} bits",
                iteration + 1,
                bit_budget
            );
            break;
        }
    }

    state
}

/// Encode a string as Latin-1, one byte per character
pub fn encode_latin1(name: &str) -> Option<Vec<u8>> {
    name.chars().map(|ch| u8::try_from(u32::from(ch)).ok()).collect()
}

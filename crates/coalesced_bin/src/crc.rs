//! String hash used by the compressed format
//!
//! The hash is [`crc::CRC_32_BZIP2`] (polynomial `0x04C11DB7`, not reflected, seed and final
//! xor `0xFFFFFFFF`) over the low byte of every UTF-16 code unit of the string.

use crc::{Crc, CRC_32_BZIP2};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Hash a string the way the compressed string table stores it
pub fn hash(s: &str) -> u32 {
    let mut digest = CRC32.digest();
    for unit in s.encode_utf16() {
        digest.update(&[unit as u8]);
    }
    digest.finalize()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::crc::hash;

    const POLYNOMIAL: u32 = 0x04C1_1DB7;

    fn reference_table() -> [u32; 256] {
        let mut table = [0u32; 256];
        table[1] = POLYNOMIAL;
        for (i, entry) in table.iter_mut().enumerate().skip(2) {
            let mut value = (i as u32) << 24;
            for _ in 0..8 {
                value = if value & 0x8000_0000 != 0 {
                    (value << 1) ^ POLYNOMIAL
                } else {
                    value << 1
                };
            }
            *entry = value;
        }
        table
    }

    fn reference_hash(table: &[u32; 256], s: &str) -> u32 {
        let mut hash = 0xFFFF_FFFFu32;
        for unit in s.encode_utf16() {
            let x = hash ^ ((unit as u8 as u32) << 24);
            hash = (x << 8) ^ table[(x >> 24) as usize];
        }
        !hash
    }

    #[test]
    fn known_vectors() {
        assert_eq!(hash(""), 0);
        assert_eq!(hash("123456789"), 0xFC89_1918);
        assert_eq!(hash("engine.ini"), hash("engine.ini"));
    }

    #[test]
    fn matches_table_driven_hash() {
        let table = reference_table();
        for s in [
            "",
            "a",
            "core.system",
            "sfxgame.sfxgameinfo",
            "Mixed Case",
            "caf\u{e9}",
            "\u{3042}\u{3044}",
        ] {
            assert_eq!(hash(s), reference_hash(&table, s), "{s:?}");
        }
    }
}

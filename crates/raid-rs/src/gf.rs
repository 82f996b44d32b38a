//! GF(2^8) arithmetic over the Rijndael primitive polynomial
//! `x^8 + x^4 + x^3 + x + 1` (0x11B).
//!
//! The table layout follows the classic log/antilog scheme: `gfilog`
//! (antilog) is built to double length so a sum of two in-range logs
//! (each at most 254) never needs a modulo to index back in.

#[cfg(test)]
mod gf_tests;

use std::sync::OnceLock;

const POLY: u16 = 0x11B;

struct GfTables {
    /// `gfilog[i] == alpha^i` for `alpha = 2`, `i in 0..510`.
    gfilog: [u8; 510],
    /// `gflog[gfilog[i]] == i` for `i in 0..255`; index 0 is unused.
    gflog: [u8; 256],
}

fn tables() -> &'static GfTables {
    static TABLES: OnceLock<GfTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut gfilog = [0u8; 510];
        let mut gflog = [0u8; 256];

        let mut value: u16 = 1;
        for exp in 0..255usize {
            gfilog[exp] = value as u8;
            gflog[value as usize] = exp as u8;
            value <<= 1;
            if value & 0x100 != 0 {
                value ^= POLY;
            }
        }
        for exp in 255..510usize {
            gfilog[exp] = gfilog[exp - 255];
        }

        GfTables { gfilog, gflog }
    })
}

/// `alpha^exp` for `exp` in `0..510` (the doubled range avoids a modulo
/// when summing two logs that are each already within `0..255`).
#[inline]
#[must_use]
pub fn pow_alpha(exp: usize) -> u8 {
    tables().gfilog[exp]
}

/// `a + b` and `a - b`: both are XOR in GF(2^8).
#[inline]
#[must_use]
pub const fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// `a * b` in GF(2^8); zero short-circuits without touching `gflog[0]`.
#[inline]
#[must_use]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    let la = t.gflog[a as usize] as usize;
    let lb = t.gflog[b as usize] as usize;
    t.gfilog[la + lb]
}

/// `a / b` in GF(2^8).
///
/// # Panics
/// Panics if `b == 0`; division by zero is undefined and the RAID
/// recovery paths never construct such a call (the column weights
/// `alpha^j` are always non-zero).
#[inline]
#[must_use]
pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(2^8)");
    if a == 0 {
        return 0;
    }
    let t = tables();
    let la = t.gflog[a as usize] as usize;
    let lb = t.gflog[b as usize] as usize;
    t.gfilog[255 + la - lb]
}

/// `a^-1` in GF(2^8).
///
/// # Panics
/// Panics if `a == 0`; zero has no multiplicative inverse.
#[inline]
#[must_use]
pub fn inv(a: u8) -> u8 {
    assert!(a != 0, "zero has no inverse in GF(2^8)");
    let t = tables();
    let la = t.gflog[a as usize] as usize;
    t.gfilog[255 - la]
}

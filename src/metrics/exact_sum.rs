//! Exact summation of `f64` samples.
//!
//! Every finite `f64` is an integer multiple of 2^-1074, so a sum of them is
//! an integer in those units. [`ExactSum`] keeps that integer in two's
//! complement across fixed limbs. Adding and merging never round, and the
//! state for a given multiset of samples is unique, so any grouping of the
//! same samples compares equal and converts to the same `f64`.

use std::fmt;

/// 34 limbs cover bit 2097 (the top bit of `f64::MAX` in 2^-1074 units)
/// plus 64 bits of carry headroom and a sign bit.
const LIMBS: usize = 34;

const FRACTION_BITS: u32 = 52;
const FRACTION_MASK: u64 = (1 << FRACTION_BITS) - 1;

/// Lossless running sum of `f64` values.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactSum {
    limbs: [u64; LIMBS],
}

impl ExactSum {
    /// An empty sum, equal to zero
    pub const fn new() -> Self {
        Self { limbs: [0; LIMBS] }
    }

    /// Adds one sample. Non-finite samples are ignored.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() || x == 0.0 {
            return;
        }
        let bits = x.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> FRACTION_BITS) & 0x7ff) as u32;
        let fraction = bits & FRACTION_MASK;

        // Position of the mantissa's lowest bit, in 2^-1074 units
        let (mantissa, shift) = if biased == 0 {
            (fraction, 0)
        } else {
            (fraction | (1u64 << FRACTION_BITS), biased - 1)
        };

        let start = (shift / 64) as usize;
        let offset = shift % 64;
        let low = mantissa << offset;
        let high = if offset == 0 { 0 } else { mantissa >> (64 - offset) };

        if negative {
            self.sub_words(start, [low, high]);
        } else {
            self.add_words(start, [low, high]);
        }
    }

    /// Adds another sum into this one.
    pub fn merge(&mut self, other: &ExactSum) {
        let mut carry = false;
        for (limb, word) in self.limbs.iter_mut().zip(other.limbs) {
            let (v, c1) = limb.overflowing_add(word);
            let (v, c2) = v.overflowing_add(u64::from(carry));
            *limb = v;
            carry = c1 || c2;
        }
    }

    /// The sum rounded to the nearest `f64`, ties to even.
    pub fn value(&self) -> f64 {
        let negative = self.limbs[LIMBS - 1] >> 63 == 1;
        let magnitude = if negative { negated(self.limbs) } else { self.limbs };

        let Some(top) = magnitude.iter().rposition(|&w| w != 0) else {
            return 0.0;
        };
        let high_bit = top * 64 + 63 - magnitude[top].leading_zeros() as usize;

        let value = if high_bit <= FRACTION_BITS as usize {
            // Fits in the mantissa, exact even when subnormal
            magnitude[0] as f64 * f64::from_bits(1)
        } else {
            round_to_f64(&magnitude, high_bit)
        };

        if negative {
            -value
        } else {
            value
        }
    }

    fn add_words(&mut self, start: usize, words: [u64; 2]) {
        let mut carry = false;
        for i in start..LIMBS {
            let word = words.get(i - start).copied().unwrap_or(0);
            if word == 0 && !carry && i >= start + words.len() {
                break;
            }
            let (v, c1) = self.limbs[i].overflowing_add(word);
            let (v, c2) = v.overflowing_add(u64::from(carry));
            self.limbs[i] = v;
            carry = c1 || c2;
        }
    }

    fn sub_words(&mut self, start: usize, words: [u64; 2]) {
        let mut borrow = false;
        for i in start..LIMBS {
            let word = words.get(i - start).copied().unwrap_or(0);
            if word == 0 && !borrow && i >= start + words.len() {
                break;
            }
            let (v, b1) = self.limbs[i].overflowing_sub(word);
            let (v, b2) = v.overflowing_sub(u64::from(borrow));
            self.limbs[i] = v;
            borrow = b1 || b2;
        }
    }
}

impl Default for ExactSum {
    fn default() -> Self {
        Self::new()
    }
}

impl From<f64> for ExactSum {
    fn from(x: f64) -> Self {
        let mut sum = Self::new();
        sum.add(x);
        sum
    }
}

impl FromIterator<f64> for ExactSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = Self::new();
        for x in iter {
            sum.add(x);
        }
        sum
    }
}

impl fmt::Debug for ExactSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExactSum").field(&self.value()).finish()
    }
}

fn negated(mut limbs: [u64; LIMBS]) -> [u64; LIMBS] {
    let mut carry = true;
    for limb in limbs.iter_mut() {
        *limb = !*limb;
        if carry {
            let (v, c) = limb.overflowing_add(1);
            *limb = v;
            carry = c;
        }
    }
    limbs
}

/// 64 bits of `limbs` starting at bit `start`.
fn bits_at(limbs: &[u64; LIMBS], start: usize) -> u64 {
    let index = start / 64;
    let offset = start % 64;
    let low = limbs[index] >> offset;
    let high = if offset == 0 || index + 1 >= LIMBS {
        0
    } else {
        limbs[index + 1] << (64 - offset)
    };
    low | high
}

/// True when any bit below `end` is set.
fn any_below(limbs: &[u64; LIMBS], end: usize) -> bool {
    let index = end / 64;
    let offset = end % 64;
    limbs[..index].iter().any(|&w| w != 0) || (offset > 0 && limbs[index] & ((1u64 << offset) - 1) != 0)
}

/// Rounds a magnitude whose highest set bit is above the mantissa width.
fn round_to_f64(magnitude: &[u64; LIMBS], high_bit: usize) -> f64 {
    // 53 mantissa bits plus one round bit
    let round_pos = high_bit - (FRACTION_BITS as usize + 1);
    let window = bits_at(magnitude, round_pos) & ((1u64 << (FRACTION_BITS + 2)) - 1);
    let sticky = any_below(magnitude, round_pos);

    let mut mantissa = window >> 1;
    let round = window & 1 == 1;
    if round && (sticky || mantissa & 1 == 1) {
        mantissa += 1;
    }

    let mut exponent = high_bit;
    if mantissa == 1u64 << (FRACTION_BITS + 1) {
        mantissa >>= 1;
        exponent += 1;
    }

    // Bit 0 weighs 2^-1074, so the unbiased exponent is high_bit - 1074
    let biased = exponent as u64 - 51;
    if biased >= 0x7ff {
        return f64::INFINITY;
    }
    f64::from_bits((biased << FRACTION_BITS) | (mantissa & FRACTION_MASK))
}

//! Four-valued logic constants

use crate::error::{NetlistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One four-valued logic bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bit {
    Zero,
    One,
    X,
    Z,
}

impl Bit {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            'x' | 'X' => Some(Bit::X),
            'z' | 'Z' | '?' => Some(Bit::Z),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Bit::Zero => '0',
            Bit::One => '1',
            Bit::X => 'x',
            Bit::Z => 'z',
        }
    }

    /// Small enumerant used by thread instructions: 0, 1, 2 (x), 3 (z)
    pub fn code(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
            Bit::X => 2,
            Bit::Z => 3,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Bit::Zero | Bit::One)
    }

    pub fn not(self) -> Bit {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
            _ => Bit::X,
        }
    }

    pub fn and(self, other: Bit) -> Bit {
        match (self, other) {
            (Bit::Zero, _) | (_, Bit::Zero) => Bit::Zero,
            (Bit::One, Bit::One) => Bit::One,
            _ => Bit::X,
        }
    }

    pub fn or(self, other: Bit) -> Bit {
        match (self, other) {
            (Bit::One, _) | (_, Bit::One) => Bit::One,
            (Bit::Zero, Bit::Zero) => Bit::Zero,
            _ => Bit::X,
        }
    }

    pub fn xor(self, other: Bit) -> Bit {
        match (self, other) {
            (Bit::Zero, b) | (b, Bit::Zero) if b.is_defined() => b,
            (Bit::One, Bit::One) => Bit::Zero,
            _ => Bit::X,
        }
    }
}

/// Fixed-width vector of four-valued bits, stored LSB first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BitVector {
    bits: Vec<Bit>,
}

impl BitVector {
    pub fn new(bits: Vec<Bit>) -> Self {
        Self { bits }
    }

    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|idx| {
                if idx < 64 && (value >> idx) & 1 == 1 {
                    Bit::One
                } else {
                    Bit::Zero
                }
            })
            .collect();
        Self { bits }
    }

    pub fn filled(bit: Bit, width: usize) -> Self {
        Self {
            bits: vec![bit; width],
        }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// Bit at `idx`, or zero past the end
    pub fn bit(&self, idx: usize) -> Bit {
        self.bits.get(idx).copied().unwrap_or(Bit::Zero)
    }

    pub fn is_defined(&self) -> bool {
        self.bits.iter().all(|b| b.is_defined())
    }

    /// Unsigned value, if every bit is 0/1 and it fits in 64 bits
    pub fn to_u64(&self) -> Option<u64> {
        let mut value = 0u64;
        for (idx, bit) in self.bits.iter().enumerate() {
            match bit {
                Bit::Zero => {}
                Bit::One if idx < 64 => value |= 1 << idx,
                _ => return None,
            }
        }
        Some(value)
    }

    /// Resize to `width`: truncate, or extend with zero (x/z when the top bit is x/z)
    pub fn resized(&self, width: usize) -> BitVector {
        let pad = match self.bits.last() {
            Some(Bit::X) => Bit::X,
            Some(Bit::Z) => Bit::Z,
            _ => Bit::Zero,
        };
        let mut bits = self.bits.clone();
        bits.resize(width, pad);
        BitVector { bits }
    }

    pub fn map(&self, f: impl Fn(Bit) -> Bit) -> BitVector {
        BitVector {
            bits: self.bits.iter().map(|b| f(*b)).collect(),
        }
    }

    pub fn zip_with(&self, other: &BitVector, f: impl Fn(Bit, Bit) -> Bit) -> BitVector {
        let width = self.width().max(other.width());
        let (a, b) = (self.resized(width), other.resized(width));
        BitVector {
            bits: a.bits.iter().zip(&b.bits).map(|(x, y)| f(*x, *y)).collect(),
        }
    }
}

impl FromStr for BitVector {
    type Err = NetlistError;

    /// Parses Verilog-style literals: `4'b10x1`, `8'hff`, `'d12`, or a plain
    /// decimal which is taken as a 32-bit unsized number.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NetlistError::InvalidNumber(s.to_string());
        let text: String = s.chars().filter(|c| *c != '_').collect();

        let Some((size, rest)) = text.split_once('\'') else {
            let value: u64 = text.trim().parse().map_err(|_| invalid())?;
            return Ok(BitVector::from_u64(value, 32));
        };

        let width = if size.trim().is_empty() {
            None
        } else {
            Some(size.trim().parse::<usize>().map_err(|_| invalid())?)
        };
        let rest = rest.trim_start_matches(['s', 'S']);
        let mut chars = rest.chars();
        let radix = chars.next().ok_or_else(invalid)?;
        let digits: Vec<char> = chars.collect();
        if digits.is_empty() {
            return Err(invalid());
        }

        let mut msb_first: Vec<Bit> = Vec::new();
        match radix.to_ascii_lowercase() {
            'b' => {
                for c in &digits {
                    msb_first.push(Bit::from_char(*c).ok_or_else(invalid)?);
                }
            }
            'h' => {
                for c in &digits {
                    if let Some(bit) = Bit::from_char(*c).filter(|b| !b.is_defined()) {
                        msb_first.extend([bit; 4]);
                        continue;
                    }
                    let nibble = c.to_digit(16).ok_or_else(invalid)?;
                    for shift in (0..4).rev() {
                        msb_first.push(if (nibble >> shift) & 1 == 1 {
                            Bit::One
                        } else {
                            Bit::Zero
                        });
                    }
                }
            }
            'd' => {
                let value: u64 = digits
                    .iter()
                    .collect::<String>()
                    .parse()
                    .map_err(|_| invalid())?;
                let vec = BitVector::from_u64(value, width.unwrap_or(32));
                return Ok(vec);
            }
            _ => return Err(invalid()),
        }

        msb_first.reverse();
        let vec = BitVector::new(msb_first);
        Ok(match width {
            Some(w) => vec.resized(w),
            None => vec.resized(vec.width().max(32)),
        })
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'b", self.width())?;
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit.as_char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for BitVector {
    type Error = NetlistError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BitVector> for String {
    fn from(value: BitVector) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_literal() {
        let v: BitVector = "4'b1010".parse().unwrap();
        assert_eq!(v.width(), 4);
        assert_eq!(v.bits(), &[Bit::Zero, Bit::One, Bit::Zero, Bit::One]);
        assert_eq!(v.to_u64(), Some(10));
        assert_eq!(v.to_string(), "4'b1010");
    }

    #[test]
    fn test_parse_hex_and_decimal() {
        let h: BitVector = "8'hA5".parse().unwrap();
        assert_eq!(h.to_u64(), Some(0xa5));
        let d: BitVector = "6'd12".parse().unwrap();
        assert_eq!(d.width(), 6);
        assert_eq!(d.to_u64(), Some(12));
        let plain: BitVector = "7".parse().unwrap();
        assert_eq!(plain.width(), 32);
        assert_eq!(plain.to_u64(), Some(7));
    }

    #[test]
    fn test_four_state_digits() {
        let v: BitVector = "3'bx1z".parse().unwrap();
        assert_eq!(v.bits(), &[Bit::Z, Bit::One, Bit::X]);
        assert!(!v.is_defined());
        assert_eq!(v.to_u64(), None);
        assert_eq!(Bit::X.code(), 2);
        assert_eq!(Bit::Z.code(), 3);
    }

    #[test]
    fn test_resize_extends_unknown_msb() {
        let v: BitVector = "2'bx0".parse().unwrap();
        assert_eq!(v.resized(4).bits(), &[Bit::Zero, Bit::X, Bit::X, Bit::X]);
        let w: BitVector = "2'b10".parse().unwrap();
        assert_eq!(w.resized(4).to_u64(), Some(2));
        assert_eq!(w.resized(1).to_u64(), Some(0));
    }

    #[test]
    fn test_invalid_literal() {
        assert!("4'q12".parse::<BitVector>().is_err());
        assert!("4'b102".parse::<BitVector>().is_err());
        assert!("".parse::<BitVector>().is_err());
    }
}

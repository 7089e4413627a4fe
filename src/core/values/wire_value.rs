use crate::core::errors::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single wire bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitState {
    One,
    Zero,
    /// Not driven
    Z,
}

impl BitState {
    /// Character used by the textual renderings
    pub fn repr(self) -> char {
        match self {
            BitState::One => '1',
            BitState::Zero => '0',
            BitState::Z => 'z',
        }
    }

    /// Logical negation; a floating bit stays floating
    pub fn negate(self) -> Self {
        match self {
            BitState::One => BitState::Zero,
            BitState::Zero => BitState::One,
            BitState::Z => BitState::Z,
        }
    }
}

/// Fixed-width tri-state bit vector carried by a link.
///
/// Bit 0 is the least significant bit. The width never changes after
/// construction; every operation combining two values requires equal widths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireValue {
    bits: Vec<BitState>,
}

impl WireValue {
    /// Create an undriven value of the given width
    pub fn new(bit_size: usize) -> Self {
        Self::filled(bit_size, BitState::Z)
    }

    /// Create a value with every bit set to `state`
    pub fn filled(bit_size: usize, state: BitState) -> Self {
        Self {
            bits: vec![state; bit_size],
        }
    }

    /// Create a value from explicit bits, least significant first
    pub fn from_bits(bits: Vec<BitState>) -> Self {
        Self { bits }
    }

    /// Create a fully driven value from the low `bit_size` bits of `value`
    pub fn of(value: u64, bit_size: usize) -> Self {
        let mut wire = Self::new(bit_size);
        wire.set_value(value);
        wire
    }

    /// Copy of this value with a different width; new high bits are ZERO
    pub fn resized(&self, new_size: usize) -> Self {
        let bits = (0..new_size)
            .map(|i| self.bits.get(i).copied().unwrap_or(BitState::Zero))
            .collect();
        Self { bits }
    }

    pub fn bit_size(&self) -> usize {
        self.bits.len()
    }

    pub fn bits(&self) -> &[BitState] {
        &self.bits
    }

    /// Get a single bit.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn bit(&self, index: usize) -> BitState {
        self.bits[index]
    }

    /// Set a single bit.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn set_bit(&mut self, index: usize, state: BitState) {
        self.bits[index] = state;
    }

    /// Overwrite this value with `other`, which must have the same width
    pub fn set(&mut self, other: &WireValue) -> Result<&mut Self> {
        self.check_size(other)?;
        self.bits.copy_from_slice(&other.bits);
        Ok(self)
    }

    /// Drive every bit from the low bits of `value`
    pub fn set_value(&mut self, value: u64) -> &mut Self {
        for (i, bit) in self.bits.iter_mut().enumerate() {
            let one = i < u64::BITS as usize && value & (1u64 << i) != 0;
            *bit = if one { BitState::One } else { BitState::Zero };
        }
        self
    }

    pub fn set_all_bits(&mut self, state: BitState) {
        self.bits.fill(state);
    }

    /// Merge another driver's value into this one.
    ///
    /// Per bit, Z yields to the driven value and equal values are kept.
    /// Two differing driven bits raise [`SimulationError::ShortCircuit`]
    /// carrying both operands; bits before the conflict stay merged, so the
    /// receiver must be treated as garbage after an error.
    pub fn merge(&mut self, other: &WireValue) -> Result<&mut Self> {
        self.check_size(other)?;
        for i in 0..self.bits.len() {
            match (self.bits[i], other.bits[i]) {
                (BitState::Z, theirs) => self.bits[i] = theirs,
                (_, BitState::Z) => {}
                (ours, theirs) if ours != theirs => {
                    return Err(SimulationError::ShortCircuit {
                        value1: self.clone(),
                        value2: other.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// Non-mutating form of [`WireValue::merge`]
    pub fn merged(&self, other: &WireValue) -> Result<WireValue> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// True when the value has at least one bit and none of them float
    pub fn is_valid_value(&self) -> bool {
        !self.bits.is_empty() && self.bits.iter().all(|bit| *bit != BitState::Z)
    }

    /// Pack the bits into an integer.
    ///
    /// Fails with [`SimulationError::InvalidValue`] if any bit is Z or a
    /// bit above the 64th is ONE.
    pub fn value(&self) -> Result<u64> {
        let mut value = 0u64;
        for (i, bit) in self.bits.iter().enumerate() {
            match bit {
                BitState::Z => {
                    return Err(SimulationError::InvalidValue(format!(
                        "bit {} of {} is floating",
                        i, self
                    )))
                }
                BitState::One if i >= u64::BITS as usize => {
                    return Err(SimulationError::InvalidValue(format!(
                        "bit {} of {} does not fit in 64 bits",
                        i, self
                    )))
                }
                BitState::One => value |= 1u64 << i,
                BitState::Zero => {}
            }
        }
        Ok(value)
    }

    /// Zero-padded hexadecimal rendering, `z`s when not fully driven
    pub fn hex_string(&self) -> String {
        let width = hex_width(self.bit_size());
        if !self.is_valid_value() {
            return "z".repeat(width);
        }
        self.bits
            .chunks(4)
            .rev()
            .map(|nibble| {
                let digit = nibble
                    .iter()
                    .enumerate()
                    .filter(|(_, bit)| **bit == BitState::One)
                    .fold(0u32, |acc, (i, _)| acc | 1 << i);
                std::char::from_digit(digit, 16).unwrap_or('0')
            })
            .collect()
    }

    /// Zero-padded decimal rendering, `z`s when not fully driven
    pub fn dec_string(&self) -> String {
        let width = dec_width(self.bit_size());
        if !self.is_valid_value() {
            return "z".repeat(width);
        }
        // little-endian decimal digits, doubled once per bit from the top
        let mut digits: Vec<u8> = vec![0];
        for bit in self.bits.iter().rev() {
            let mut carry = u8::from(*bit == BitState::One);
            for digit in digits.iter_mut() {
                let doubled = *digit * 2 + carry;
                *digit = doubled % 10;
                carry = doubled / 10;
            }
            if carry > 0 {
                digits.push(carry);
            }
        }
        let rendered: String = digits.iter().rev().map(|d| char::from(b'0' + d)).collect();
        format!("{:0>width$}", rendered, width = width)
    }

    fn check_size(&self, other: &WireValue) -> Result<()> {
        if other.bit_size() != self.bit_size() {
            return Err(SimulationError::BitSizeMismatch {
                expected: self.bit_size(),
                found: other.bit_size(),
            });
        }
        Ok(())
    }
}

fn hex_width(bit_size: usize) -> usize {
    1 + bit_size.saturating_sub(1) / 4
}

fn dec_width(bit_size: usize) -> usize {
    (bit_size as f64 / 3.322).ceil() as usize
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit.repr())?;
        }
        Ok(())
    }
}

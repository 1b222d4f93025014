//! Minimal ABI plumbing for the handful of view methods the collectors call.

use sha3::{Digest, Keccak256};

use crate::error::{AppError, Result};

pub const STAKER_NUMBER: &str = "stakerNumber()";
pub const POOL_SUMMARY: &str = "poolSummary()";
pub const STAKER_ADDRESS: &str = "stakerAddress(uint256)";
pub const USER_SUMMARY: &str = "userSummary(address)";
pub const BALANCE_OF: &str = "balanceOf(address)";

/// First four bytes of Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a method taking no arguments.
pub fn encode_call(signature: &str) -> Vec<u8> {
    selector(signature).to_vec()
}

/// Calldata for a method taking one `uint256`.
pub fn encode_call_uint(signature: &str, arg: u128) -> Vec<u8> {
    let mut data = encode_call(signature);
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&arg.to_be_bytes());
    data.extend_from_slice(&word);
    data
}

/// Calldata for a method taking one `address` (`0x` + 40 hex chars).
pub fn encode_call_address(signature: &str, address: &str) -> Result<Vec<u8>> {
    let raw = parse_address(address)?;
    let mut data = encode_call(signature);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&raw);
    Ok(data)
}

fn parse_address(address: &str) -> Result<[u8; 20]> {
    let hex_part = address.trim().trim_start_matches("0x");
    let bytes = hex::decode(hex_part)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| AppError::Decode(format!("address must be 20 bytes, got {}", b.len())))
}

/// Decode `0x`-prefixed hex returned by a JSON-RPC node.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// EIP-55 mixed-case rendering of a 20-byte address.
pub fn checksum_address(raw: &[u8; 20]) -> String {
    let lower = hex::encode(raw);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Reads a return blob as a sequence of fixed-width big-endian words.
#[derive(Debug, Clone, Copy)]
pub struct WordDecoder {
    word_size: usize,
}

impl WordDecoder {
    pub fn new(word_size: usize) -> Self {
        Self { word_size }
    }

    pub fn word<'a>(&self, data: &'a [u8], index: usize) -> Result<&'a [u8]> {
        if self.word_size == 0 {
            return Err(AppError::Decode("word size is zero".into()));
        }
        let start = index * self.word_size;
        data.get(start..start + self.word_size).ok_or_else(|| {
            AppError::Decode(format!(
                "word {index} out of range: {} bytes, {}-byte words",
                data.len(),
                self.word_size
            ))
        })
    }

    /// Word `index` as an unsigned integer. Errors if the value exceeds `u128`.
    pub fn uint(&self, data: &[u8], index: usize) -> Result<u128> {
        let word = self.word(data, index)?;
        let split = word.len().saturating_sub(16);
        let (high, low) = word.split_at(split);
        if high.iter().any(|&b| b != 0) {
            return Err(AppError::Decode(format!("word {index} overflows u128")));
        }
        Ok(low.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
    }

    pub fn uint_u64(&self, data: &[u8], index: usize) -> Result<u64> {
        let v = self.uint(data, index)?;
        u64::try_from(v).map_err(|_| AppError::Decode(format!("word {index} overflows u64")))
    }

    /// Word `index` as a checksummed address (low 20 bytes).
    pub fn address(&self, data: &[u8], index: usize) -> Result<String> {
        let word = self.word(data, index)?;
        if word.len() < 20 {
            return Err(AppError::Decode("word narrower than an address".into()));
        }
        let (pad, tail) = word.split_at(word.len() - 20);
        if pad.iter().any(|&b| b != 0) {
            return Err(AppError::Decode(format!("word {index} is not an address")));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(tail);
        Ok(checksum_address(&raw))
    }
}

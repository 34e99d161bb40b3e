//! Types for decoding ERC-20 token transfer logs.

use {
  serde_with::{DeserializeFromStr, SerializeDisplay},
  sha3::{Digest, Keccak256},
  std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
  },
  thiserror::Error,
};

pub use {
  address::Address,
  h256::H256,
  log::Log,
  transfer::{DecodeError, Transfer, TransferKind},
};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
  Keccak256::digest(data).into()
}

const fn decode_hex<const N: usize>(hex: &str) -> [u8; N] {
  const fn nibble(c: u8) -> u8 {
    match c {
      b'0'..=b'9' => c - b'0',
      b'a'..=b'f' => c - b'a' + 10,
      b'A'..=b'F' => c - b'A' + 10,
      _ => panic!("invalid hex digit"),
    }
  }

  let bytes = hex.as_bytes();

  let offset = if bytes.len() >= 2 && bytes[0] == b'0' && bytes[1] == b'x' {
    2
  } else {
    0
  };

  assert!(bytes.len() - offset == N * 2, "invalid hex length");

  let mut out = [0; N];
  let mut i = 0;
  while i < N {
    out[i] = (nibble(bytes[offset + i * 2]) << 4) | nibble(bytes[offset + i * 2 + 1]);
    i += 1;
  }
  out
}

fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
  let digits = s.strip_prefix("0x").unwrap_or(s);

  if digits.len() != N * 2 {
    return Err(HexError::Length {
      expected: N * 2,
      actual: digits.len(),
    });
  }

  let mut out = [0; N];
  hex::decode_to_slice(digits, &mut out).map_err(HexError::Hex)?;
  Ok(out)
}

#[derive(Debug, PartialEq, Error)]
pub enum HexError {
  #[error("expected {expected} hex digits but found {actual}")]
  Length { expected: usize, actual: usize },
  #[error("{0}")]
  Hex(hex::FromHexError),
}

mod address;
mod h256;
mod log;
mod transfer;

use super::*;

/// A 32-byte word: event topics and transaction hashes.
#[derive(
  Copy,
  Clone,
  Debug,
  Default,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  DeserializeFromStr,
  SerializeDisplay,
)]
pub struct H256(pub [u8; 32]);

impl H256 {
  pub const fn from_hex(hex: &str) -> Self {
    Self(decode_hex(hex))
  }

  pub fn from_signature(signature: &str) -> Self {
    Self(keccak256(signature.as_bytes()))
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}

impl From<Address> for H256 {
  fn from(address: Address) -> Self {
    let mut word = [0; 32];
    word[12..].copy_from_slice(address.as_bytes());
    Self(word)
  }
}

impl From<u64> for H256 {
  fn from(n: u64) -> Self {
    let mut word = [0; 32];
    word[24..].copy_from_slice(&n.to_be_bytes());
    Self(word)
  }
}

impl Display for H256 {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl FromStr for H256 {
  type Err = HexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    parse_hex(s).map(Self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_address() {
    let word = H256::from(Address([0xaa; 20]));
    assert_eq!(word.0[..12], [0; 12]);
    assert_eq!(word.0[12..], [0xaa; 20]);
    assert_eq!(Address::from_word(word.as_bytes()), Address([0xaa; 20]));
  }

  #[test]
  fn from_u64() {
    assert_eq!(
      H256::from(0x0102u64).to_string(),
      "0x0000000000000000000000000000000000000000000000000000000000000102"
    );
  }

  #[test]
  fn round_trip_through_string() {
    let hash = H256::from_signature("Transfer(address,address,uint256)");
    assert_eq!(hash.to_string().parse::<H256>().unwrap(), hash);
  }
}

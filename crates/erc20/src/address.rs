use super::*;

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
pub struct Address(pub [u8; 20]);

impl Address {
  pub const LEN: usize = 20;

  pub const fn from_hex(hex: &str) -> Self {
    Self(decode_hex(hex))
  }

  /// The address held in the low 20 bytes of a 32-byte ABI word.
  pub fn from_word(word: &[u8; 32]) -> Self {
    let mut bytes = [0; Self::LEN];
    bytes.copy_from_slice(&word[12..]);
    Self(bytes)
  }

  pub fn as_bytes(&self) -> &[u8; 20] {
    &self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl FromStr for Address {
  type Err = HexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    parse_hex(s).map(Self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(
      Address([0xab; 20]).to_string(),
      "0xabababababababababababababababababababab"
    );
  }

  #[test]
  fn from_str() {
    assert_eq!(
      "0xdAC17F958D2ee523a2206206994597C13D831ec7"
        .parse::<Address>()
        .unwrap(),
      Address::from_hex("0xdac17f958d2ee523a2206206994597c13d831ec7"),
    );
    assert_eq!(
      "dac17f958d2ee523a2206206994597c13d831ec7"
        .parse::<Address>()
        .unwrap(),
      Address::from_hex("dac17f958d2ee523a2206206994597c13d831ec7"),
    );
    assert_eq!(
      "0x1234".parse::<Address>().unwrap_err(),
      HexError::Length {
        expected: 40,
        actual: 4
      },
    );
    assert!("0xzz17f958d2ee523a2206206994597c13d831ec7"
      .parse::<Address>()
      .is_err());
  }

  #[test]
  fn from_word() {
    let mut word = [0xff; 32];
    word[12..].copy_from_slice(&[7; 20]);
    assert_eq!(Address::from_word(&word), Address([7; 20]));
  }

  #[test]
  fn serde() {
    let address = Address([1; 20]);
    let json = "\"0x0101010101010101010101010101010101010101\"";
    assert_eq!(serde_json::to_string(&address).unwrap(), json);
    assert_eq!(serde_json::from_str::<Address>(json).unwrap(), address);
  }
}

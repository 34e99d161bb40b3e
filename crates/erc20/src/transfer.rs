use super::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferKind {
  Transfer,
  Issue,
  Redeem,
  DestroyedBlackFunds,
}

impl TransferKind {
  pub const ALL: [Self; 4] = [
    Self::Transfer,
    Self::Issue,
    Self::Redeem,
    Self::DestroyedBlackFunds,
  ];

  pub fn topic(self) -> H256 {
    match self {
      Self::Transfer => {
        H256::from_hex("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
      }
      Self::Issue => {
        H256::from_hex("0xcb8241adb0c3fdb35b70c24ce35c5eb0c17af7431c99f827d44a445ca624176a")
      }
      Self::Redeem => {
        H256::from_hex("0x702d5967f45f6513a38ffc42d6ba9bf230bd40e8f53b16363c7eb4fd2deb9a44")
      }
      Self::DestroyedBlackFunds => {
        H256::from_hex("0x61e6e66b0d6339b2980aecc6ccc0039736791f0ccde9ed512e789a7fbdd698c6")
      }
    }
  }

  pub fn signature(self) -> &'static str {
    match self {
      Self::Transfer => "Transfer(address,address,uint256)",
      Self::Issue => "Issue(uint256)",
      Self::Redeem => "Redeem(uint256)",
      Self::DestroyedBlackFunds => "DestroyedBlackFunds(address,uint256)",
    }
  }

  pub fn from_topic(topic: &H256) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.topic() == *topic)
  }

  pub fn topics() -> Vec<H256> {
    Self::ALL.into_iter().map(Self::topic).collect()
  }
}

#[derive(Debug, PartialEq, Error)]
pub enum DecodeError {
  #[error("log is missing topic {0}")]
  MissingTopic(usize),
  #[error("log data is {actual} bytes but at least {expected} are required")]
  ShortData { expected: usize, actual: usize },
  #[error("amount 0x{} does not fit in 64 bits", hex::encode(.0))]
  AmountOverflow([u8; 32]),
}

/// A balance movement decoded from one log. A missing `from` is a mint, a
/// missing `to` is a burn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transfer {
  pub kind: TransferKind,
  pub from: Option<Address>,
  pub to: Option<Address>,
  pub amount: u64,
  pub block: u64,
}

impl Transfer {
  /// Decode `log`. Unrecognized topics and zero amounts yield `None`.
  pub fn decipher(log: &Log, treasury: Address) -> Result<Option<Self>, DecodeError> {
    let Some(kind) = TransferKind::from_topic(log.topic(0)?) else {
      return Ok(None);
    };

    let (from, to, amount) = match kind {
      TransferKind::Transfer => (
        Some(Address::from_word(log.topic(1)?.as_bytes())),
        Some(Address::from_word(log.topic(2)?.as_bytes())),
        amount(log.word(0)?)?,
      ),
      TransferKind::Issue => (None, Some(treasury), amount(log.word(0)?)?),
      TransferKind::Redeem => (Some(treasury), None, amount(log.word(0)?)?),
      TransferKind::DestroyedBlackFunds => (
        Some(Address::from_word(log.word(0)?)),
        None,
        amount(log.word(1)?)?,
      ),
    };

    if amount == 0 {
      return Ok(None);
    }

    Ok(Some(Self {
      kind,
      from,
      to,
      amount,
      block: log.block_number,
    }))
  }
}

fn amount(word: &[u8; 32]) -> Result<u64, DecodeError> {
  if word[..24].iter().any(|byte| *byte != 0) {
    return Err(DecodeError::AmountOverflow(*word));
  }

  let mut bytes = [0; 8];
  bytes.copy_from_slice(&word[24..]);
  Ok(u64::from_be_bytes(bytes))
}

use super::*;

/// A raw event log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
  pub address: Address,
  pub topics: Vec<H256>,
  pub data: Vec<u8>,
  pub block_number: u64,
  pub transaction_hash: H256,
  pub log_index: u64,
  pub removed: bool,
}

impl Log {
  pub fn topic(&self, i: usize) -> Result<&H256, DecodeError> {
    self.topics.get(i).ok_or(DecodeError::MissingTopic(i))
  }

  pub fn word(&self, i: usize) -> Result<&[u8; 32], DecodeError> {
    self
      .data
      .get(i * 32..(i + 1) * 32)
      .and_then(|word| word.try_into().ok())
      .ok_or(DecodeError::ShortData {
        expected: (i + 1) * 32,
        actual: self.data.len(),
      })
  }
}

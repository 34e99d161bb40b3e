use super::*;

/// Bloom filter over addresses known to the store. Never yields a false
/// negative.
pub(crate) struct MembershipFilter {
  bits: Vec<u64>,
  len: u64,
  hashes: u32,
}

impl MembershipFilter {
  pub(crate) fn new(capacity: u64, false_positive_rate: f64) -> Self {
    let n = capacity.max(1) as f64;
    let p = false_positive_rate.clamp(f64::MIN_POSITIVE, 0.5);

    let len = ((-n * p.ln()) / (LN_2 * LN_2)).ceil().max(64.0) as u64;
    let hashes = ((len as f64 / n) * LN_2).round().clamp(1.0, 32.0) as u32;

    Self {
      bits: vec![0; usize::try_from(len.div_ceil(64)).unwrap_or(usize::MAX)],
      len,
      hashes,
    }
  }

  pub(crate) fn insert(&mut self, address: Address) {
    let (h1, h2) = Self::hash(address);
    for i in 0..self.hashes {
      let bit = self.bit(h1, h2, i);
      self.bits[bit / 64] |= 1 << (bit % 64);
    }
  }

  pub(crate) fn contains(&self, address: Address) -> bool {
    let (h1, h2) = Self::hash(address);
    (0..self.hashes).all(|i| {
      let bit = self.bit(h1, h2, i);
      self.bits[bit / 64] & (1 << (bit % 64)) != 0
    })
  }

  pub(crate) fn len(&self) -> u64 {
    self.len
  }

  pub(crate) fn hashes(&self) -> u32 {
    self.hashes
  }

  fn hash(address: Address) -> (u64, u64) {
    let digest = erc20::keccak256(address.as_bytes());
    let mut a = [0; 8];
    let mut b = [0; 8];
    a.copy_from_slice(&digest[..8]);
    b.copy_from_slice(&digest[8..16]);
    (u64::from_le_bytes(a), u64::from_le_bytes(b) | 1)
  }

  fn bit(&self, h1: u64, h2: u64, i: u32) -> usize {
    (h1.wrapping_add(h2.wrapping_mul(i.into())) % self.len) as usize
  }
}

use {
  super::*,
  rpc::Header,
  std::cell::{Cell, RefCell},
};

pub(crate) fn address(n: u8) -> Address {
  Address([n; 20])
}

pub(crate) fn transfer_log(block: u64, from: Address, to: Address, amount: u64) -> Log {
  Log {
    topics: vec![TransferKind::Transfer.topic(), from.into(), to.into()],
    data: H256::from(amount).0.to_vec(),
    block_number: block,
    ..default()
  }
}

pub(crate) fn issue_log(block: u64, amount: u64) -> Log {
  Log {
    topics: vec![TransferKind::Issue.topic()],
    data: H256::from(amount).0.to_vec(),
    block_number: block,
    ..default()
  }
}

pub(crate) fn redeem_log(block: u64, amount: u64) -> Log {
  Log {
    topics: vec![TransferKind::Redeem.topic()],
    data: H256::from(amount).0.to_vec(),
    block_number: block,
    ..default()
  }
}

pub(crate) fn destroy_log(block: u64, from: Address, amount: u64) -> Log {
  let mut data = H256::from(from).0.to_vec();
  data.extend_from_slice(&H256::from(amount).0);
  Log {
    topics: vec![TransferKind::DestroyedBlackFunds.topic()],
    data,
    block_number: block,
    ..default()
  }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
  pub(crate) accounts: BTreeMap<Address, AccountEntry>,
  pub(crate) commits: u64,
  pub(crate) fail_writes: bool,
  pub(crate) meta: BTreeMap<String, String>,
  pub(crate) reads: Cell<u64>,
  pub(crate) statistics: BTreeMap<u32, DayStatistic>,
  pub(crate) writes: u64,
}

impl MemoryStore {
  fn write(&mut self) -> Result {
    ensure!(!self.fail_writes, "store is read-only");
    self.writes += 1;
    Ok(())
  }
}

impl Store for MemoryStore {
  fn account(&self, address: Address) -> Result<Option<AccountEntry>> {
    self.reads.set(self.reads.get() + 1);
    Ok(self.accounts.get(&address).copied())
  }

  fn for_each_account(&self, f: &mut dyn FnMut(Address, AccountEntry)) -> Result<u64> {
    for (address, entry) in &self.accounts {
      f(*address, *entry);
    }
    Ok(self.accounts.len().try_into()?)
  }

  fn save_accounts(&mut self, accounts: &[(Address, AccountEntry)]) -> Result {
    self.write()?;
    self.accounts.extend(accounts.iter().copied());
    Ok(())
  }

  fn meta(&mut self, key: Meta, default: &str) -> Result<String> {
    Ok(
      self
        .meta
        .entry(key.key().into())
        .or_insert_with(|| default.into())
        .clone(),
    )
  }

  fn set_meta(&mut self, key: Meta, value: &str) -> Result {
    self.meta.insert(key.key().into(), value.into());
    Ok(())
  }

  fn day_statistic(&self, day: Day) -> Result<Option<DayStatistic>> {
    Ok(self.statistics.get(&day.key()).copied())
  }

  fn save_day_statistic(&mut self, statistic: DayStatistic) -> Result {
    self.statistics.insert(statistic.day.key(), statistic);
    Ok(())
  }

  fn commit(&mut self, accounts: &[(Address, AccountEntry)], meta: &[(Meta, String)]) -> Result {
    self.write()?;
    self.commits += 1;
    self.accounts.extend(accounts.iter().copied());
    for (key, value) in meta {
      self.meta.insert(key.key().into(), value.clone());
    }
    Ok(())
  }
}

/// Scripted chain. Blocks without an explicit header are dated `timestamp`.
#[derive(Default)]
pub(crate) struct MockChain {
  headers: BTreeMap<u64, u64>,
  timestamp: Option<u64>,
  logs: Vec<Log>,
  tip: Cell<u64>,
  log_failures: Cell<u32>,
  header_failures: Cell<u32>,
  header_calls: Cell<u64>,
  log_calls: RefCell<Vec<(u64, u64)>>,
}

impl MockChain {
  pub(crate) fn header(mut self, block: u64, timestamp: i64) -> Self {
    self.headers.insert(block, timestamp.try_into().unwrap());
    self
  }

  pub(crate) fn timestamp(mut self, timestamp: i64) -> Self {
    self.timestamp = Some(timestamp.try_into().unwrap());
    self
  }

  pub(crate) fn log(mut self, log: Log) -> Self {
    self.logs.push(log);
    self
  }

  pub(crate) fn tip(self, tip: u64) -> Self {
    self.tip.set(tip);
    self
  }

  pub(crate) fn fail_logs(self, n: u32) -> Self {
    self.log_failures.set(n);
    self
  }

  pub(crate) fn fail_headers(self, n: u32) -> Self {
    self.header_failures.set(n);
    self
  }

  pub(crate) fn header_calls(&self) -> u64 {
    self.header_calls.get()
  }

  pub(crate) fn log_calls(&self) -> Vec<(u64, u64)> {
    self.log_calls.borrow().clone()
  }
}

impl ChainSource for MockChain {
  fn block_number(&self) -> Result<u64, SnafuError> {
    Ok(self.tip.get())
  }

  fn logs(
    &self,
    from: u64,
    to: u64,
    _contract: Address,
    topics: &[H256],
  ) -> Result<Vec<Log>, SnafuError> {
    self.log_calls.borrow_mut().push((from, to));

    if self.log_failures.get() > 0 {
      self.log_failures.set(self.log_failures.get() - 1);
      return Err(
        error::RpcResponse {
          method: "eth_getLogs",
          code: -32000,
          message: "upstream timeout",
        }
        .build(),
      );
    }

    Ok(
      self
        .logs
        .iter()
        .filter(|log| (from..=to).contains(&log.block_number))
        .filter(|log| log.topics.first().is_some_and(|topic| topics.contains(topic)))
        .cloned()
        .collect(),
    )
  }

  fn header(&self, block: u64) -> Result<Header, SnafuError> {
    self.header_calls.set(self.header_calls.get() + 1);

    if self.header_failures.get() > 0 {
      self.header_failures.set(self.header_failures.get() - 1);
      return Err(error::BlockNotFound { block }.build());
    }

    self
      .headers
      .get(&block)
      .copied()
      .or(self.timestamp)
      .map(|timestamp| Header {
        number: block,
        timestamp,
      })
      .ok_or_else(|| error::BlockNotFound { block }.build())
  }
}

/// Resolves only the timestamps it was given, anything else is in the future.
#[derive(Default)]
pub(crate) struct MockResolver {
  blocks: BTreeMap<i64, u64>,
  failures: Cell<u32>,
  calls: RefCell<Vec<i64>>,
}

impl MockResolver {
  pub(crate) fn block(mut self, timestamp: i64, block: u64) -> Self {
    self.blocks.insert(timestamp, block);
    self
  }

  pub(crate) fn fail(self, n: u32) -> Self {
    self.failures.set(n);
    self
  }

  pub(crate) fn calls(&self) -> Vec<i64> {
    self.calls.borrow().clone()
  }
}

impl BlockResolver for MockResolver {
  fn block_at_or_after(&self, timestamp: i64) -> Result<u64, SnafuError> {
    self.calls.borrow_mut().push(timestamp);

    if self.failures.get() > 0 {
      self.failures.set(self.failures.get() - 1);
      return Err(
        error::ResolverResponse {
          message: "NOTOK",
          result: "Max rate limit reached",
        }
        .build(),
      );
    }

    self
      .blocks
      .get(&timestamp)
      .copied()
      .ok_or_else(|| error::FutureTimestamp { timestamp }.build())
  }
}

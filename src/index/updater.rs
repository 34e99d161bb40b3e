use super::*;

pub(crate) struct Delays {
  /// After a failed `eth_blockNumber` or `eth_getLogs`.
  pub(crate) fetch: Duration,
  /// When the index has reached the chain tip.
  pub(crate) poll: Duration,
  /// Before retrying a log or a watermark lookup.
  pub(crate) retry: Duration,
}

impl Default for Delays {
  fn default() -> Self {
    Self {
      fetch: Duration::from_secs(12),
      poll: Duration::from_secs(1),
      retry: Duration::from_secs(1),
    }
  }
}

struct Reporter {
  block: u64,
  time: Instant,
}

impl Reporter {
  const BLOCKS: u64 = 10_000;
  const INTERVAL: Duration = Duration::from_secs(60);

  fn report<S: Store>(&mut self, ledger: &Ledger<S>, tip: u64) {
    let block = ledger.last_tracked_block();
    let elapsed = self.time.elapsed();

    if block < self.block + Self::BLOCKS && elapsed < Self::INTERVAL {
      return;
    }

    let lookups = ledger.lookups();

    log::info!(
      "Tracked block {block} ({:.1} blocks/s, {} behind tip): {} resident accounts, {} pending, \
       filter tested {} matched {} rehydrated {}, {} anomalies",
      (block - self.block) as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
      tip.saturating_sub(block),
      ledger.resident(),
      ledger.pending(),
      lookups.tested,
      lookups.matched,
      lookups.rehydrated,
      ledger.anomalies(),
    );

    self.block = block;
    self.time = Instant::now();
  }
}

pub(crate) struct Updater<'a, S> {
  batch_size: u64,
  chain: &'a dyn ChainSource,
  contract: Address,
  pub(crate) delays: Delays,
  height_limit: Option<u64>,
  ledger: Ledger<S>,
  reporter: Reporter,
  resolver: &'a dyn BlockResolver,
  retries: u32,
  topics: Vec<H256>,
}

impl<'a, S: Store> Updater<'a, S> {
  pub(crate) fn new(
    ledger: Ledger<S>,
    chain: &'a dyn ChainSource,
    resolver: &'a dyn BlockResolver,
    settings: &Settings,
  ) -> Self {
    Self {
      batch_size: settings.batch_size(),
      chain,
      contract: settings.contract(),
      delays: Delays::default(),
      height_limit: settings.height_limit(),
      reporter: Reporter {
        block: ledger.last_tracked_block(),
        time: Instant::now(),
      },
      ledger,
      resolver,
      retries: settings.resolver_retries(),
      topics: TransferKind::topics(),
    }
  }

  /// Index until shut down or past the height limit, then commit.
  pub(crate) fn run(&mut self) -> Result {
    log::info!(
      "Indexing {} from block {}",
      self.contract,
      self.ledger.last_tracked_block() + 1
    );

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
      if self
        .height_limit
        .is_some_and(|limit| self.ledger.last_tracked_block() >= limit)
      {
        break;
      }

      self.step()?;
    }

    self.ledger.flush(true)?;

    Ok(())
  }

  fn step(&mut self) -> Result {
    let tip = match self.chain.block_number() {
      Ok(tip) => tip,
      Err(err) => {
        log::warn!("Failed to fetch block number: {err}");
        thread::sleep(self.delays.fetch);
        return Ok(());
      }
    };

    let tracked = self.ledger.last_tracked_block();

    if tip <= tracked {
      thread::sleep(self.delays.poll);
      return Ok(());
    }

    let from = tracked + 1;

    let mut to = if tip - tracked > self.batch_size {
      tracked + self.batch_size
    } else {
      from
    };

    if let Some(limit) = self.height_limit {
      to = to.min(limit);
    }

    let logs = match self.chain.logs(from, to, self.contract, &self.topics) {
      Ok(logs) => logs,
      Err(err) => {
        log::warn!("Failed to fetch logs for blocks {from}..={to}: {err}");
        thread::sleep(self.delays.fetch);
        return Ok(());
      }
    };

    log::debug!("Fetched {} logs for blocks {from}..={to}", logs.len());

    let upstream = Upstream {
      chain: self.chain,
      resolver: self.resolver,
      retries: self.retries,
      retry_delay: self.delays.retry,
      today: Day::today(),
    };

    for log in &logs {
      Self::retry(self.delays.retry, || self.ledger.process(log, &upstream))?;
    }

    Self::retry(self.delays.retry, || self.ledger.advance(to, &upstream))?;

    self.reporter.report(&self.ledger, tip);

    Ok(())
  }

  /// Run `f` until it succeeds or fails with a non-transient error.
  fn retry(delay: Duration, mut f: impl FnMut() -> Result) -> Result {
    loop {
      match f() {
        Err(err) if error::is_transient(&err) => {
          log::warn!("{err}, retrying in {delay:?}");
          thread::sleep(delay);
        }
        result => return result,
      }
    }
  }

  pub(crate) fn ledger(&self) -> &Ledger<S> {
    &self.ledger
  }
}

#[cfg(test)]
mod tests {
  use {super::*, crate::testing::*, pretty_assertions::assert_eq};

  const GENESIS: Address = Address([0xaa; 20]);

  fn day(key: u32) -> Day {
    Day::from_key(key).unwrap()
  }

  fn ledger() -> Ledger<MemoryStore> {
    Ledger::load(
      MemoryStore::default(),
      LedgerConfig {
        capacity: 1_000,
        start_block: 100,
        first_day_start_block: 1_000_000,
        start_day: day(171128),
        genesis_holder: GENESIS,
        initial_supply: 1_000,
        ..default()
      },
    )
    .unwrap()
  }

  fn chain() -> MockChain {
    MockChain::default().timestamp(day(171128).start_timestamp() + 60)
  }

  fn settings(height_limit: u64) -> Settings {
    Settings::merge(
      Options {
        data_dir: Some(env::temp_dir().join("tally-updater-test")),
        height_limit: Some(height_limit),
        ..default()
      },
      default(),
    )
    .unwrap()
  }

  fn run<'a>(
    chain: &'a MockChain,
    resolver: &'a MockResolver,
    height_limit: u64,
  ) -> Updater<'a, MemoryStore> {
    let mut updater = Updater::new(ledger(), chain, resolver, &settings(height_limit));
    updater.delays = Delays {
      fetch: Duration::ZERO,
      poll: Duration::ZERO,
      retry: Duration::ZERO,
    };
    updater.run().unwrap();
    updater
  }

  #[test]
  fn indexes_in_batches_up_to_height_limit() {
    let chain = chain()
      .tip(350)
      .log(transfer_log(150, GENESIS, address(1), 10))
      .log(transfer_log(250, address(1), address(2), 4))
      .log(transfer_log(320, address(2), address(3), 1));
    let resolver = MockResolver::default();

    let updater = run(&chain, &resolver, 300);

    assert_eq!(chain.log_calls(), [(101, 200), (201, 300)]);

    let ledger = updater.ledger();
    assert_eq!(ledger.last_tracked_block(), 300);
    assert_eq!(ledger.account(address(2)).unwrap().entry.balance, 4);
    assert!(ledger.account(address(3)).is_none());

    let store = ledger.store();
    assert_eq!(store.commits, 1);
    assert_eq!(store.accounts[&address(1)].balance, 6);
    assert_eq!(
      store.meta.get("tracked_block_num").map(String::as_str),
      Some("300")
    );
  }

  #[test]
  fn near_tip_indexes_one_block_at_a_time() {
    let chain = chain().tip(103);
    let resolver = MockResolver::default();

    run(&chain, &resolver, 103);

    assert_eq!(chain.log_calls(), [(101, 101), (102, 102), (103, 103)]);
  }

  #[test]
  fn failed_log_fetch_is_retried() {
    let chain = chain()
      .tip(102)
      .fail_logs(1)
      .log(transfer_log(101, GENESIS, address(1), 10));
    let resolver = MockResolver::default();

    let updater = run(&chain, &resolver, 101);

    assert_eq!(chain.log_calls(), [(101, 101), (101, 101)]);
    assert_eq!(
      updater.ledger().account(address(1)).unwrap().entry.balance,
      10
    );
  }

  #[test]
  fn failed_header_fetch_retries_the_same_log() {
    let chain = chain()
      .tip(102)
      .fail_headers(2)
      .log(transfer_log(101, GENESIS, address(1), 10))
      .log(transfer_log(101, GENESIS, address(2), 5));
    let resolver = MockResolver::default();

    let updater = run(&chain, &resolver, 101);
    let ledger = updater.ledger();

    assert_eq!(ledger.account(address(1)).unwrap().entry.balance, 10);
    assert_eq!(ledger.account(address(2)).unwrap().entry.balance, 5);
    assert_eq!(ledger.account(GENESIS).unwrap().entry.balance, 985);
    assert_eq!(chain.header_calls(), 3);
  }

  #[test]
  fn store_failure_aborts_without_commit() {
    let chain = chain().tip(200);
    let resolver = MockResolver::default();
    let mut ledger = ledger();
    ledger.store_mut().fail_writes = true;

    let mut updater = Updater::new(ledger, &chain, &resolver, &settings(150));
    updater.delays = Delays {
      fetch: Duration::ZERO,
      poll: Duration::ZERO,
      retry: Duration::ZERO,
    };

    assert!(updater.run().is_err());
    assert_eq!(updater.ledger().store().commits, 0);
  }
}

use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
  /// Expected number of distinct addresses, used to size the filter.
  pub capacity: u64,
  pub false_positive_rate: f64,
  /// Pending zero-balance accounts that trigger a soft flush.
  pub flush_threshold: u64,
  /// Most accounts evicted by one soft flush.
  pub eviction_batch: usize,
  /// Accounts per store write.
  pub save_batch: usize,
  pub start_block: u64,
  pub first_day_start_block: u64,
  pub start_day: Day,
  pub treasury: Address,
  pub genesis_holder: Address,
  pub initial_supply: u64,
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      capacity: 50_000_000,
      false_positive_rate: 0.02,
      flush_threshold: 2_000_000,
      eviction_batch: 1_000_000,
      save_batch: 100,
      start_block: 4634748,
      first_day_start_block: 4640667,
      start_day: Day::from_ymd(2017, 11, 28).expect("valid date"),
      treasury: Address::from_hex("0xc6cde7c39eb2f0f0095f41570af89efc2c1ea828"),
      genesis_holder: Address::from_hex("0x36928500bc1dcd7af6a2b4008875cc336b927d57"),
      initial_supply: 100_000_000_000,
    }
  }
}

/// A resident account.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct Account {
  pub(crate) entry: AccountEntry,
  pub(crate) last_update_block: u64,
  pub(crate) pending_flush: bool,
}

impl Account {
  fn rehydrate(entry: AccountEntry) -> Self {
    Self {
      entry,
      last_update_block: 0,
      pending_flush: false,
    }
  }

  /// Returns how much of `amount` did not fit in the balance.
  fn credit(&mut self, amount: u64, block: u64) -> u64 {
    let overflow = amount.saturating_sub(u64::MAX - self.entry.balance);
    self.entry.balance = self.entry.balance.saturating_add(amount);
    self.entry.transfer_in += 1;
    self.last_update_block = block;
    overflow
  }

  /// Returns how far the balance fell short of `amount`.
  fn debit(&mut self, amount: u64, block: u64) -> u64 {
    let shortfall = amount.saturating_sub(self.entry.balance);
    self.entry.balance = self.entry.balance.saturating_sub(amount);
    self.entry.transfer_out += 1;
    self.last_update_block = block;
    shortfall
  }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct Lookups {
  /// Non-resident addresses tested against the filter.
  pub(crate) tested: u64,
  pub(crate) matched: u64,
  pub(crate) rehydrated: u64,
}

pub(crate) struct Ledger<S> {
  accounts: HashMap<Address, Account>,
  anomalies: u64,
  checkpoint: Checkpoint,
  config: LedgerConfig,
  filter: MembershipFilter,
  lookups: Lookups,
  overflow: u64,
  pending: u64,
  shortfall: u64,
  store: S,
  supply_changes: u64,
}

impl<S: Store> Ledger<S> {
  /// Build the ledger from a full scan of `store`. Every persisted address
  /// enters the filter and accounts with a positive balance become resident.
  pub(crate) fn load(mut store: S, config: LedgerConfig) -> Result<Self> {
    let checkpoint = Checkpoint::load(&mut store, &config)?;

    let mut filter = MembershipFilter::new(config.capacity, config.false_positive_rate);
    let mut accounts = HashMap::new();

    let start = Instant::now();

    let total = store.for_each_account(&mut |address, entry| {
      filter.insert(address);

      if entry.balance > 0 {
        accounts.insert(address, Account::rehydrate(entry));

        if accounts.len() % 200_000 == 0 {
          log::info!("Loaded {} accounts", accounts.len());
        }
      }
    })?;

    log::info!(
      "Loaded {} of {total} accounts in {:.1}s, filter has {} bits and {} hashes",
      accounts.len(),
      start.elapsed().as_secs_f64(),
      filter.len(),
      filter.hashes(),
    );

    if checkpoint.last_tracked_block == config.start_block
      && !accounts.contains_key(&config.genesis_holder)
    {
      log::info!(
        "Seeding {} with initial supply {}",
        config.genesis_holder,
        config.initial_supply
      );

      filter.insert(config.genesis_holder);
      accounts.insert(
        config.genesis_holder,
        Account {
          entry: AccountEntry {
            balance: config.initial_supply,
            ..default()
          },
          ..default()
        },
      );
    }

    Ok(Self {
      accounts,
      anomalies: 0,
      checkpoint,
      config,
      filter,
      lookups: Lookups::default(),
      overflow: 0,
      pending: 0,
      shortfall: 0,
      store,
      supply_changes: 0,
    })
  }

  /// Decode and apply one log. The checkpoint advances to the log's block
  /// before its balance effect, including for logs that decode to nothing.
  pub(crate) fn process(&mut self, raw: &Log, upstream: &Upstream) -> Result {
    self.advance(raw.block_number, upstream)?;

    match Transfer::decipher(raw, self.config.treasury) {
      Ok(Some(transfer)) => self.apply(transfer, raw.transaction_hash),
      Ok(None) => Ok(()),
      Err(err) => {
        log::warn!(
          "Skipping malformed log {} of tx {}: {err}",
          raw.log_index,
          raw.transaction_hash
        );
        self.anomalies += 1;
        Ok(())
      }
    }
  }

  pub(crate) fn advance(&mut self, block: u64, upstream: &Upstream) -> Result {
    let accounts = &self.accounts;
    self
      .checkpoint
      .advance(block, &mut self.store, upstream, || holders(accounts))
  }

  fn apply(&mut self, transfer: Transfer, tx: H256) -> Result {
    // store reads happen before any mutation so a failed read leaves the
    // ledger untouched
    if let Some(from) = transfer.from {
      self.has_account(from)?;
    }

    if let Some(to) = transfer.to {
      self.has_account(to)?;
    }

    if transfer.kind != TransferKind::Transfer {
      log::info!(
        "{:?} log found in tx {tx}: {} at block {}",
        transfer.kind,
        transfer.amount,
        transfer.block
      );
      self.supply_changes += 1;
    }

    if let Some(from) = transfer.from {
      let mut materialized = false;

      let account = self.accounts.entry(from).or_insert_with(|| {
        materialized = true;
        Account::default()
      });

      if materialized {
        log::warn!("Sender {from} of tx {tx} has no account");
        self.anomalies += 1;
        self.filter.insert(from);
      }

      if transfer.to.is_some() && account.entry.transfer_out == 0 {
        self.checkpoint.statistic.new_from += 1;
      }

      let balance = account.entry.balance;
      let shortfall = account.debit(transfer.amount, transfer.block);

      if shortfall > 0 {
        log::error!(
          "Sender {from} with balance {balance} cannot cover {} in tx {tx}, short by {shortfall}",
          transfer.amount
        );
        self.anomalies += 1;
        self.shortfall += shortfall;
      }

      if account.entry.balance == 0 && !account.pending_flush {
        account.pending_flush = true;
        self.pending += 1;
      }
    }

    if let Some(to) = transfer.to {
      let mut created = false;

      let account = self.accounts.entry(to).or_insert_with(|| {
        created = true;
        Account::default()
      });

      if created {
        self.filter.insert(to);
        self.checkpoint.statistic.new_to += 1;
      }

      let balance = account.entry.balance;
      let overflow = account.credit(transfer.amount, transfer.block);

      if overflow > 0 {
        log::error!(
          "Receiver {to} with balance {balance} cannot hold {} more in tx {tx}, over by {overflow}",
          transfer.amount
        );
        self.anomalies += 1;
        self.overflow += overflow;
      }

      if account.pending_flush {
        account.pending_flush = false;
        self.pending -= 1;
      }
    }

    if self.pending >= self.config.flush_threshold {
      self.flush(false)?;
    }

    Ok(())
  }

  /// Whether `address` has an account, rehydrating it from the store if it
  /// is not resident. The store is only read when the filter matches.
  pub(crate) fn has_account(&mut self, address: Address) -> Result<bool> {
    if self.accounts.contains_key(&address) {
      return Ok(true);
    }

    self.lookups.tested += 1;

    if !self.filter.contains(address) {
      return Ok(false);
    }

    self.lookups.matched += 1;

    let Some(entry) = self.store.account(address)? else {
      return Ok(false);
    };

    self.lookups.rehydrated += 1;
    self.accounts.insert(address, Account::rehydrate(entry));

    Ok(true)
  }

  /// Persist accounts and return how many remain pending.
  ///
  /// A soft flush evicts up to `eviction_batch` pending accounts, oldest
  /// first. A forced flush commits every resident account together with the
  /// checkpoint and then drops the zero-balance ones.
  pub(crate) fn flush(&mut self, force: bool) -> Result<u64> {
    let start = Instant::now();

    if force {
      let mut accounts = self
        .accounts
        .iter()
        .map(|(address, account)| (*address, account.entry))
        .collect::<Vec<(Address, AccountEntry)>>();

      accounts.sort_unstable_by_key(|(address, _)| *address);

      self.store.commit(&accounts, &self.checkpoint.meta())?;

      self.accounts.retain(|_, account| account.entry.balance > 0);
      self.pending = 0;

      log::info!(
        "Committed {} accounts at block {} in {:.1}s",
        accounts.len(),
        self.checkpoint.last_tracked_block,
        start.elapsed().as_secs_f64(),
      );

      return Ok(0);
    }

    let mut candidates = self
      .accounts
      .iter()
      .filter(|(_, account)| account.pending_flush)
      .map(|(address, account)| (account.last_update_block, *address))
      .collect::<Vec<(u64, Address)>>();

    candidates.sort_unstable();
    candidates.truncate(self.config.eviction_batch);

    let mut evicted = 0;

    for chunk in candidates.chunks(self.config.save_batch.max(1)) {
      let batch = chunk
        .iter()
        .filter_map(|(_, address)| {
          self
            .accounts
            .get(address)
            .map(|account| (*address, account.entry))
        })
        .collect::<Vec<(Address, AccountEntry)>>();

      self.store.save_accounts(&batch)?;

      for (_, address) in chunk {
        if self.accounts.remove(address).is_some() {
          self.pending -= 1;
          evicted += 1;
        }
      }
    }

    log::info!(
      "Evicted {evicted} zero balance accounts in {:.1}s, {} remain pending",
      start.elapsed().as_secs_f64(),
      self.pending,
    );

    Ok(self.pending)
  }

  pub(crate) fn last_tracked_block(&self) -> u64 {
    self.checkpoint.last_tracked_block
  }

  pub(crate) fn checkpoint(&self) -> &Checkpoint {
    &self.checkpoint
  }

  pub(crate) fn resident(&self) -> usize {
    self.accounts.len()
  }

  pub(crate) fn pending(&self) -> u64 {
    self.pending
  }

  pub(crate) fn lookups(&self) -> Lookups {
    self.lookups
  }

  pub(crate) fn anomalies(&self) -> u64 {
    self.anomalies
  }

  pub(crate) fn shortfall(&self) -> u64 {
    self.shortfall
  }

  /// Credits lost to a balance that would not fit in 64 bits.
  pub(crate) fn overflow(&self) -> u64 {
    self.overflow
  }

  /// Issue, redeem and destroy events applied since load.
  pub(crate) fn supply_changes(&self) -> u64 {
    self.supply_changes
  }

  #[cfg(test)]
  pub(crate) fn account(&self, address: Address) -> Option<&Account> {
    self.accounts.get(&address)
  }

  #[cfg(test)]
  pub(crate) fn store(&self) -> &S {
    &self.store
  }

  #[cfg(test)]
  pub(crate) fn store_mut(&mut self) -> &mut S {
    &mut self.store
  }

  #[cfg(test)]
  pub(crate) fn into_store(self) -> S {
    self.store
  }
}

fn holders(accounts: &HashMap<Address, Account>) -> u64 {
  accounts
    .values()
    .filter(|account| account.entry.balance > 0)
    .count()
    .try_into()
    .unwrap_or(u64::MAX)
}

use super::*;

/// Keys of the metadata table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Meta {
  ActiveDay,
  ActiveDayNewFrom,
  ActiveDayNewTo,
  HistoricalHolders,
  LastTrackedBlock,
  NextDayStartBlock,
  SchemaVersion,
}

impl Meta {
  pub fn key(self) -> &'static str {
    match self {
      Self::ActiveDay => "active_day",
      Self::ActiveDayNewFrom => "active_day_new_from",
      Self::ActiveDayNewTo => "active_day_new_to",
      Self::HistoricalHolders => "historical_holders",
      Self::LastTrackedBlock => "tracked_block_num",
      Self::NextDayStartBlock => "next_day_start_block_num",
      Self::SchemaVersion => "schema_version",
    }
  }
}

/// Persistent account, metadata and day statistic storage.
///
/// Account writes are idempotent upserts keyed by address. Only finished days
/// are saved as statistics. The running day lives in metadata so that it is
/// only ever persisted together with the checkpoint it belongs to.
pub trait Store {
  fn account(&self, address: Address) -> Result<Option<AccountEntry>>;

  /// Visit every persisted account, returning how many were visited.
  fn for_each_account(&self, f: &mut dyn FnMut(Address, AccountEntry)) -> Result<u64>;

  fn save_accounts(&mut self, accounts: &[(Address, AccountEntry)]) -> Result;

  /// Read `key`, storing and returning `default` if it is absent.
  fn meta(&mut self, key: Meta, default: &str) -> Result<String>;

  fn set_meta(&mut self, key: Meta, value: &str) -> Result;

  fn day_statistic(&self, day: Day) -> Result<Option<DayStatistic>>;

  fn save_day_statistic(&mut self, statistic: DayStatistic) -> Result;

  /// Persist accounts and metadata as a single transaction.
  fn commit(&mut self, accounts: &[(Address, AccountEntry)], meta: &[(Meta, String)]) -> Result;
}

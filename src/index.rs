use {
  self::{
    checkpoint::{Checkpoint, Upstream},
    entry::{AccountEntryValue, AddressValue, DayStatisticValue, Entry},
    filter::MembershipFilter,
  },
  super::*,
  redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition},
};

pub use self::{
  checkpoint::Watermark,
  entry::{AccountEntry, DayStatistic},
  ledger::LedgerConfig,
  store::{Meta, Store},
};

pub(crate) use {ledger::Ledger, updater::Updater};

mod checkpoint;
mod entry;
mod filter;
mod ledger;
mod store;
mod updater;

const SCHEMA_VERSION: u64 = 2;

macro_rules! define_table {
  ($name:ident, $key:ty, $value:ty) => {
    const $name: TableDefinition<$key, $value> = TableDefinition::new(stringify!($name));
  };
}

define_table! { ADDRESS_TO_ACCOUNT, &AddressValue, AccountEntryValue }
define_table! { DAY_TO_STATISTIC, u32, DayStatisticValue }
define_table! { META, &str, &str }

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Info {
  pub accounts: u64,
  pub day_statistics: u64,
  pub index_file_size: u64,
  pub index_path: PathBuf,
  pub meta: BTreeMap<String, String>,
}

pub struct Index {
  database: Database,
  path: PathBuf,
}

impl Index {
  pub fn open(settings: &Settings) -> Result<Self> {
    Self::open_at(&settings.index_path()?)
  }

  pub(crate) fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create data dir `{}`", parent.display()))?;
    }

    let database = Database::builder()
      .create(path)
      .with_context(|| format!("failed to open index `{}`", path.display()))?;

    let wtx = database.begin_write()?;

    wtx.open_table(ADDRESS_TO_ACCOUNT)?;
    wtx.open_table(DAY_TO_STATISTIC)?;

    {
      let mut meta = wtx.open_table(META)?;

      let version = meta
        .get(Meta::SchemaVersion.key())?
        .map(|version| version.value().to_string());

      match version {
        Some(version) => ensure!(
          version == SCHEMA_VERSION.to_string(),
          "index at `{}` has schema version {version} but this version of tally requires {SCHEMA_VERSION}, \
           index into a new data directory",
          path.display(),
        ),
        None => {
          meta.insert(
            Meta::SchemaVersion.key(),
            SCHEMA_VERSION.to_string().as_str(),
          )?;
        }
      }
    }

    wtx.commit()?;

    log::info!("Opened index at `{}`", path.display());

    Ok(Self {
      database,
      path: path.into(),
    })
  }

  pub fn info(&self) -> Result<Info> {
    let rtx = self.database.begin_read()?;

    let mut meta = BTreeMap::new();
    for result in rtx.open_table(META)?.iter()? {
      let (key, value) = result?;
      meta.insert(key.value().to_string(), value.value().to_string());
    }

    Ok(Info {
      accounts: rtx.open_table(ADDRESS_TO_ACCOUNT)?.len()?,
      day_statistics: rtx.open_table(DAY_TO_STATISTIC)?.len()?,
      index_file_size: fs::metadata(&self.path)?.len(),
      index_path: self.path.clone(),
      meta,
    })
  }

  pub fn day_statistics(&self) -> Result<Vec<DayStatistic>> {
    let rtx = self.database.begin_read()?;

    let mut statistics = Vec::new();
    for result in rtx.open_table(DAY_TO_STATISTIC)?.iter()? {
      let (key, value) = result?;
      let day = Day::from_key(key.value())
        .with_context(|| format!("invalid day key {} in index", key.value()))?;
      statistics.push(DayStatistic::load(day, value.value()));
    }

    Ok(statistics)
  }

  fn save_statistic(
    table: &mut redb::Table<u32, DayStatisticValue>,
    statistic: DayStatistic,
  ) -> Result {
    let (key, value) = statistic.store();
    table.insert(key, value)?;
    Ok(())
  }
}

impl Store for Index {
  fn account(&self, address: Address) -> Result<Option<AccountEntry>> {
    let entry = self
      .database
      .begin_read()?
      .open_table(ADDRESS_TO_ACCOUNT)?
      .get(&address.store())?
      .map(|entry| AccountEntry::load(entry.value()));

    Ok(entry)
  }

  fn for_each_account(&self, f: &mut dyn FnMut(Address, AccountEntry)) -> Result<u64> {
    let rtx = self.database.begin_read()?;

    let mut count = 0;
    for result in rtx.open_table(ADDRESS_TO_ACCOUNT)?.iter()? {
      let (address, entry) = result?;
      f(Address::load(*address.value()), AccountEntry::load(entry.value()));
      count += 1;
    }

    Ok(count)
  }

  fn save_accounts(&mut self, accounts: &[(Address, AccountEntry)]) -> Result {
    let wtx = self.database.begin_write()?;

    {
      let mut address_to_account = wtx.open_table(ADDRESS_TO_ACCOUNT)?;
      for (address, entry) in accounts {
        address_to_account.insert(&address.store(), entry.store())?;
      }
    }

    wtx.commit()?;

    Ok(())
  }

  fn meta(&mut self, key: Meta, default: &str) -> Result<String> {
    let value = self
      .database
      .begin_read()?
      .open_table(META)?
      .get(key.key())?
      .map(|value| value.value().to_string());

    if let Some(value) = value {
      return Ok(value);
    }

    self.set_meta(key, default)?;

    Ok(default.into())
  }

  fn set_meta(&mut self, key: Meta, value: &str) -> Result {
    let wtx = self.database.begin_write()?;
    wtx.open_table(META)?.insert(key.key(), value)?;
    wtx.commit()?;
    Ok(())
  }

  fn day_statistic(&self, day: Day) -> Result<Option<DayStatistic>> {
    let statistic = self
      .database
      .begin_read()?
      .open_table(DAY_TO_STATISTIC)?
      .get(day.key())?
      .map(|value| DayStatistic::load(day, value.value()));

    Ok(statistic)
  }

  fn save_day_statistic(&mut self, statistic: DayStatistic) -> Result {
    let wtx = self.database.begin_write()?;
    Self::save_statistic(&mut wtx.open_table(DAY_TO_STATISTIC)?, statistic)?;
    wtx.commit()?;
    Ok(())
  }

  fn commit(&mut self, accounts: &[(Address, AccountEntry)], meta: &[(Meta, String)]) -> Result {
    let wtx = self.database.begin_write()?;

    {
      let mut address_to_account = wtx.open_table(ADDRESS_TO_ACCOUNT)?;
      for (address, entry) in accounts {
        address_to_account.insert(&address.store(), entry.store())?;
      }

      let mut meta_table = wtx.open_table(META)?;
      for (key, value) in meta {
        meta_table.insert(key.key(), value.as_str())?;
      }
    }

    wtx.commit()?;

    Ok(())
  }
}

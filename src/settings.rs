use super::*;

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
  batch_size: Option<u64>,
  config: Option<PathBuf>,
  contract: Option<Address>,
  data_dir: Option<PathBuf>,
  etherscan_api_key: Option<String>,
  eviction_batch: Option<usize>,
  false_positive_rate: Option<f64>,
  filter_capacity: Option<u64>,
  first_day_start_block: Option<u64>,
  flush_threshold: Option<u64>,
  genesis_holder: Option<Address>,
  height_limit: Option<u64>,
  index: Option<PathBuf>,
  initial_supply: Option<u64>,
  resolver_retries: Option<u32>,
  resolver_url: Option<String>,
  rpc_url: Option<String>,
  save_batch: Option<usize>,
  start_block: Option<u64>,
  start_day: Option<Day>,
  treasury: Option<Address>,
}

impl Settings {
  pub(crate) const DEFAULT_CONTRACT: Address =
    Address::from_hex("0xdac17f958d2ee523a2206206994597c13d831ec7");

  pub(crate) fn load(options: Options) -> Result<Settings> {
    let mut env = BTreeMap::<String, String>::new();

    for (var, value) in env::vars_os() {
      let Some(var) = var.to_str() else {
        continue;
      };

      let Some(key) = var.strip_prefix("TALLY_") else {
        continue;
      };

      env.insert(
        key.into(),
        value.into_string().map_err(|value| {
          anyhow!(
            "environment variable `{var}` not valid unicode: `{}`",
            value.to_string_lossy()
          )
        })?,
      );
    }

    Self::merge(options, env)
  }

  /// Combine, in decreasing priority, `options`, `env`, the config file and
  /// defaults.
  pub(crate) fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
    let settings = Settings::from_options(options).or(Settings::from_env(env)?);

    let data_dir = settings.data_dir_or_default()?;

    let config_path = match &settings.config {
      Some(path) => Some(path.clone()),
      None => {
        let path = data_dir.join("tally.yaml");
        path.exists().then_some(path)
      }
    };

    let config = match config_path {
      Some(path) => {
        let file = File::open(&path)
          .with_context(|| format!("failed to open config file `{}`", path.display()))?;
        serde_yaml::from_reader(file)
          .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?
      }
      None => Settings::default(),
    };

    let mut settings = settings.or(config);
    settings.data_dir = Some(settings.data_dir_or_default()?);

    Ok(settings)
  }

  fn data_dir_or_default(&self) -> Result<PathBuf> {
    match &self.data_dir {
      Some(data_dir) => Ok(data_dir.clone()),
      None => Ok(
        dirs::data_dir()
          .context("could not get data dir, specify one with `--data-dir`")?
          .join("tally"),
      ),
    }
  }

  pub(crate) fn or(self, source: Settings) -> Self {
    Self {
      batch_size: self.batch_size.or(source.batch_size),
      config: self.config.or(source.config),
      contract: self.contract.or(source.contract),
      data_dir: self.data_dir.or(source.data_dir),
      etherscan_api_key: self.etherscan_api_key.or(source.etherscan_api_key),
      eviction_batch: self.eviction_batch.or(source.eviction_batch),
      false_positive_rate: self.false_positive_rate.or(source.false_positive_rate),
      filter_capacity: self.filter_capacity.or(source.filter_capacity),
      first_day_start_block: self.first_day_start_block.or(source.first_day_start_block),
      flush_threshold: self.flush_threshold.or(source.flush_threshold),
      genesis_holder: self.genesis_holder.or(source.genesis_holder),
      height_limit: self.height_limit.or(source.height_limit),
      index: self.index.or(source.index),
      initial_supply: self.initial_supply.or(source.initial_supply),
      resolver_retries: self.resolver_retries.or(source.resolver_retries),
      resolver_url: self.resolver_url.or(source.resolver_url),
      rpc_url: self.rpc_url.or(source.rpc_url),
      save_batch: self.save_batch.or(source.save_batch),
      start_block: self.start_block.or(source.start_block),
      start_day: self.start_day.or(source.start_day),
      treasury: self.treasury.or(source.treasury),
    }
  }

  pub(crate) fn from_options(options: Options) -> Self {
    Self {
      config: options.config,
      contract: options.contract,
      data_dir: options.data_dir,
      etherscan_api_key: options.etherscan_api_key,
      flush_threshold: options.flush_threshold,
      height_limit: options.height_limit,
      index: options.index,
      resolver_url: options.resolver_url,
      rpc_url: options.rpc_url,
      ..default()
    }
  }

  pub(crate) fn from_env(env: BTreeMap<String, String>) -> Result<Self> {
    fn get<T>(env: &BTreeMap<String, String>, key: &str) -> Result<Option<T>>
    where
      T: FromStr,
      T::Err: std::error::Error + Send + Sync + 'static,
    {
      env
        .get(key)
        .map(|value| {
          value
            .parse::<T>()
            .with_context(|| format!("failed to parse environment variable TALLY_{key}"))
        })
        .transpose()
    }

    Ok(Self {
      batch_size: get(&env, "BATCH_SIZE")?,
      config: get(&env, "CONFIG")?,
      contract: get(&env, "CONTRACT")?,
      data_dir: get(&env, "DATA_DIR")?,
      etherscan_api_key: get(&env, "ETHERSCAN_API_KEY")?,
      eviction_batch: get(&env, "EVICTION_BATCH")?,
      false_positive_rate: get(&env, "FALSE_POSITIVE_RATE")?,
      filter_capacity: get(&env, "FILTER_CAPACITY")?,
      first_day_start_block: get(&env, "FIRST_DAY_START_BLOCK")?,
      flush_threshold: get(&env, "FLUSH_THRESHOLD")?,
      genesis_holder: get(&env, "GENESIS_HOLDER")?,
      height_limit: get(&env, "HEIGHT_LIMIT")?,
      index: get(&env, "INDEX")?,
      initial_supply: get(&env, "INITIAL_SUPPLY")?,
      resolver_retries: get(&env, "RESOLVER_RETRIES")?,
      resolver_url: get(&env, "RESOLVER_URL")?,
      rpc_url: get(&env, "RPC_URL")?,
      save_batch: get(&env, "SAVE_BATCH")?,
      start_block: get(&env, "START_BLOCK")?,
      start_day: get(&env, "START_DAY")?,
      treasury: get(&env, "TREASURY")?,
    })
  }

  pub(crate) fn batch_size(&self) -> u64 {
    self.batch_size.unwrap_or(100).max(1)
  }

  pub(crate) fn contract(&self) -> Address {
    self.contract.unwrap_or(Self::DEFAULT_CONTRACT)
  }

  pub(crate) fn data_dir(&self) -> Result<PathBuf> {
    self.data_dir_or_default()
  }

  pub(crate) fn etherscan_api_key(&self) -> Option<String> {
    self.etherscan_api_key.clone()
  }

  pub(crate) fn height_limit(&self) -> Option<u64> {
    self.height_limit
  }

  pub(crate) fn index_path(&self) -> Result<PathBuf> {
    match &self.index {
      Some(index) => Ok(index.clone()),
      None => Ok(self.data_dir()?.join("index.redb")),
    }
  }

  pub(crate) fn resolver_retries(&self) -> u32 {
    self.resolver_retries.unwrap_or(3)
  }

  pub(crate) fn resolver_url(&self) -> &str {
    self
      .resolver_url
      .as_deref()
      .unwrap_or("https://api.etherscan.io/api")
  }

  pub(crate) fn rpc_url(&self) -> &str {
    self.rpc_url.as_deref().unwrap_or("http://127.0.0.1:8545")
  }

  pub(crate) fn ledger_config(&self) -> LedgerConfig {
    let defaults = LedgerConfig::default();

    LedgerConfig {
      capacity: self.filter_capacity.unwrap_or(defaults.capacity),
      false_positive_rate: self
        .false_positive_rate
        .unwrap_or(defaults.false_positive_rate),
      flush_threshold: self.flush_threshold.unwrap_or(defaults.flush_threshold),
      eviction_batch: self.eviction_batch.unwrap_or(defaults.eviction_batch),
      save_batch: self.save_batch.unwrap_or(defaults.save_batch),
      start_block: self.start_block.unwrap_or(defaults.start_block),
      first_day_start_block: self
        .first_day_start_block
        .unwrap_or(defaults.first_day_start_block),
      start_day: self.start_day.unwrap_or(defaults.start_day),
      treasury: self.treasury.unwrap_or(defaults.treasury),
      genesis_holder: self.genesis_holder.unwrap_or(defaults.genesis_holder),
      initial_supply: self.initial_supply.unwrap_or(defaults.initial_supply),
    }
  }
}

#[cfg(test)]
mod tests {
  use {super::*, pretty_assertions::assert_eq, tempfile::TempDir};

  fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
      .iter()
      .map(|(key, value)| (key.to_string(), value.to_string()))
      .collect()
  }

  fn options(data_dir: &Path) -> Options {
    Options {
      data_dir: Some(data_dir.into()),
      ..default()
    }
  }

  #[test]
  fn defaults() {
    let tempdir = TempDir::new().unwrap();
    let settings = Settings::merge(options(tempdir.path()), default()).unwrap();

    assert_eq!(settings.contract(), Settings::DEFAULT_CONTRACT);
    assert_eq!(settings.batch_size(), 100);
    assert_eq!(settings.resolver_retries(), 3);
    assert_eq!(settings.rpc_url(), "http://127.0.0.1:8545");
    assert_eq!(settings.height_limit(), None);
    assert_eq!(
      settings.index_path().unwrap(),
      tempdir.path().join("index.redb")
    );
    assert_eq!(settings.ledger_config(), LedgerConfig::default());
  }

  #[test]
  fn env_is_parsed() {
    let tempdir = TempDir::new().unwrap();
    let settings = Settings::merge(
      options(tempdir.path()),
      env(&[
        ("START_DAY", "180101"),
        ("TREASURY", "0x0101010101010101010101010101010101010101"),
        ("FLUSH_THRESHOLD", "10"),
      ]),
    )
    .unwrap();

    let config = settings.ledger_config();
    assert_eq!(config.start_day, Day::from_ymd(2018, 1, 1).unwrap());
    assert_eq!(config.treasury, Address([1; 20]));
    assert_eq!(config.flush_threshold, 10);
  }

  #[test]
  fn invalid_env_is_an_error() {
    let tempdir = TempDir::new().unwrap();
    assert_eq!(
      Settings::merge(options(tempdir.path()), env(&[("START_BLOCK", "soon")]))
        .unwrap_err()
        .to_string(),
      "failed to parse environment variable TALLY_START_BLOCK"
    );
  }

  #[test]
  fn options_override_env_override_config() {
    let tempdir = TempDir::new().unwrap();

    fs::write(
      tempdir.path().join("tally.yaml"),
      "rpc-url: http://config\nflush-threshold: 5\nsave-batch: 7\nstart-day: '171201'\n",
    )
    .unwrap();

    let settings = Settings::merge(
      Options {
        rpc_url: Some("http://options".into()),
        ..options(tempdir.path())
      },
      env(&[("RPC_URL", "http://env"), ("FLUSH_THRESHOLD", "6")]),
    )
    .unwrap();

    assert_eq!(settings.rpc_url(), "http://options");

    let config = settings.ledger_config();
    assert_eq!(config.flush_threshold, 6);
    assert_eq!(config.save_batch, 7);
    assert_eq!(config.start_day, Day::from_key(171201).unwrap());
  }

  #[test]
  fn explicit_config_path() {
    let tempdir = TempDir::new().unwrap();
    let path = tempdir.path().join("custom.yaml");
    fs::write(&path, "height-limit: 42\n").unwrap();

    let settings = Settings::merge(
      Options {
        config: Some(path),
        ..options(tempdir.path())
      },
      default(),
    )
    .unwrap();

    assert_eq!(settings.height_limit(), Some(42));
  }

  #[test]
  fn unknown_config_keys_are_rejected() {
    let tempdir = TempDir::new().unwrap();
    fs::write(tempdir.path().join("tally.yaml"), "colour: blue\n").unwrap();

    assert!(Settings::merge(options(tempdir.path()), default()).is_err());
  }
}

use super::*;

/// Collaborators and tunables used while advancing the checkpoint.
pub(crate) struct Upstream<'a> {
  pub(crate) chain: &'a dyn ChainSource,
  pub(crate) resolver: &'a dyn BlockResolver,
  pub(crate) retries: u32,
  pub(crate) retry_delay: Duration,
  pub(crate) today: Day,
}

/// First block of the day after the active one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub enum Watermark {
  Block(u64),
  /// The resolver could not answer yet. Header dates drive rollover until it
  /// does.
  Unresolved,
  /// The active day is today.
  Unbounded,
}

impl Watermark {
  fn reached(self, block: u64) -> bool {
    match self {
      Self::Block(watermark) => block >= watermark,
      Self::Unresolved | Self::Unbounded => false,
    }
  }
}

impl Display for Watermark {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::Block(block) => write!(f, "{block}"),
      Self::Unresolved => write!(f, "unresolved"),
      Self::Unbounded => write!(f, "{}", u64::MAX),
    }
  }
}

impl FromStr for Watermark {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s == "unresolved" {
      return Ok(Self::Unresolved);
    }

    Ok(match s.parse()? {
      u64::MAX => Self::Unbounded,
      block => Self::Block(block),
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Checkpoint {
  pub(crate) last_tracked_block: u64,
  pub(crate) watermark: Watermark,
  pub(crate) historical_holders: u64,
  pub(crate) statistic: DayStatistic,
}

fn parse_meta<T: FromStr>(key: Meta, value: String) -> Result<T> {
  value.parse().map_err(|_| {
    error::MetaParse {
      key: key.key(),
      value,
    }
    .build()
    .into()
  })
}

impl Checkpoint {
  pub(crate) fn load(store: &mut impl Store, config: &LedgerConfig) -> Result<Self> {
    let last_tracked_block = parse_meta(
      Meta::LastTrackedBlock,
      store.meta(Meta::LastTrackedBlock, &config.start_block.to_string())?,
    )?;

    let watermark = parse_meta(
      Meta::NextDayStartBlock,
      store.meta(
        Meta::NextDayStartBlock,
        &config.first_day_start_block.to_string(),
      )?,
    )?;

    let historical_holders = parse_meta(
      Meta::HistoricalHolders,
      store.meta(Meta::HistoricalHolders, "0")?,
    )?;

    let day: Day = parse_meta(
      Meta::ActiveDay,
      store.meta(Meta::ActiveDay, &config.start_day.to_string())?,
    )?;

    let statistic = DayStatistic {
      new_from: parse_meta(
        Meta::ActiveDayNewFrom,
        store.meta(Meta::ActiveDayNewFrom, "0")?,
      )?,
      new_to: parse_meta(
        Meta::ActiveDayNewTo,
        store.meta(Meta::ActiveDayNewTo, "0")?,
      )?,
      ..DayStatistic::new(day)
    };

    Ok(Self {
      last_tracked_block,
      watermark,
      historical_holders,
      statistic,
    })
  }

  pub(crate) fn meta(&self) -> Vec<(Meta, String)> {
    vec![
      (Meta::LastTrackedBlock, self.last_tracked_block.to_string()),
      (Meta::NextDayStartBlock, self.watermark.to_string()),
      (Meta::HistoricalHolders, self.historical_holders.to_string()),
      (Meta::ActiveDay, self.statistic.day.to_string()),
      (Meta::ActiveDayNewFrom, self.statistic.new_from.to_string()),
      (Meta::ActiveDayNewTo, self.statistic.new_to.to_string()),
    ]
  }

  /// Move `last_tracked_block` forward to `block`, finishing every day that
  /// ended before it. Chain failures are returned before any state changes.
  pub(crate) fn advance(
    &mut self,
    block: u64,
    store: &mut impl Store,
    upstream: &Upstream,
    holders: impl Fn() -> u64,
  ) -> Result {
    if block <= self.last_tracked_block {
      return Ok(());
    }

    if self.watermark == Watermark::Unresolved {
      self.resolve_watermark(upstream);
    }

    if self.watermark.reached(block) {
      while self.watermark.reached(block) {
        self.roll(store, &holders)?;
        self.resolve_watermark(upstream);
      }
    } else {
      let header = upstream.chain.header(block)?;

      let day = i64::try_from(header.timestamp)
        .ok()
        .and_then(Day::from_timestamp)
        .ok_or_else(|| {
          error::InvalidTimestamp {
            block,
            timestamp: header.timestamp,
          }
          .build()
        })?;

      if self.statistic.day < day {
        log::warn!(
          "block {block} is dated {day} but watermark {} has not been reached",
          self.watermark
        );

        while self.statistic.day < day {
          self.roll(store, &holders)?;
        }

        self.resolve_watermark(upstream);
      }
    }

    self.last_tracked_block = block;

    Ok(())
  }

  fn roll(&mut self, store: &mut impl Store, holders: &impl Fn() -> u64) -> Result {
    let historical_holders = self.historical_holders + self.statistic.new_to;

    let finished = DayStatistic {
      historical_holders,
      actual_holders: holders(),
      ..self.statistic
    };

    store.save_day_statistic(finished)?;

    log::info!(
      "Finished day {}: {} historical holders, {} actual holders, {} new senders, {} new receivers",
      finished.day,
      finished.historical_holders,
      finished.actual_holders,
      finished.new_from,
      finished.new_to,
    );

    self.historical_holders = historical_holders;
    self.statistic = DayStatistic::new(finished.day.succ());

    Ok(())
  }

  fn resolve_watermark(&mut self, upstream: &Upstream) {
    let day = self.statistic.day;

    if day >= upstream.today {
      if self.watermark != Watermark::Unbounded {
        log::info!("Caught up to {day}");
      }
      self.watermark = Watermark::Unbounded;
      return;
    }

    let timestamp = day.succ().start_timestamp();

    let mut attempt = 0;
    self.watermark = loop {
      match upstream.resolver.block_at_or_after(timestamp) {
        Ok(block) => break Watermark::Block(block),
        Err(err) if err.is_transient() && attempt < upstream.retries => {
          attempt += 1;
          log::warn!("Failed to resolve start of {}, retrying: {err}", day.succ());
          thread::sleep(upstream.retry_delay);
        }
        Err(err) => {
          log::warn!("Leaving watermark for {} unresolved: {err}", day.succ());
          break Watermark::Unresolved;
        }
      }
    };
  }
}

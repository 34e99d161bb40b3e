use super::*;

/// A UTC calendar day, written `YYMMDD`.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Day(NaiveDate);

impl Day {
  pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
    NaiveDate::from_ymd_opt(year, month, day).map(Self)
  }

  pub fn from_timestamp(timestamp: i64) -> Option<Self> {
    DateTime::from_timestamp(timestamp, 0).map(|time| Self(time.date_naive()))
  }

  pub fn today() -> Self {
    Self(Utc::now().date_naive())
  }

  pub fn succ(self) -> Self {
    Self(self.0 + Days::new(1))
  }

  /// Unix timestamp of 00:00:00 UTC.
  pub fn start_timestamp(self) -> i64 {
    self.0.and_time(NaiveTime::MIN).and_utc().timestamp()
  }

  pub fn key(self) -> u32 {
    let year = u32::try_from(self.0.year().rem_euclid(100)).unwrap_or_default();
    year * 10_000 + self.0.month() * 100 + self.0.day()
  }

  pub fn from_key(key: u32) -> Option<Self> {
    let year = i32::try_from(key / 10_000).ok()?;
    Self::from_ymd(2000 + year, key / 100 % 100, key % 100)
  }
}

impl Display for Day {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", self.0.format("%y%m%d"))
  }
}

impl FromStr for Day {
  type Err = SnafuError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.len() != 6 || !s.bytes().all(|c| c.is_ascii_digit()) {
      return Err(error::DayParse { input: s }.build());
    }

    s.parse()
      .ok()
      .and_then(Self::from_key)
      .ok_or_else(|| error::DayParse { input: s }.build())
  }
}

use super::*;

pub(crate) trait Entry: Sized {
  type Value;

  fn load(value: Self::Value) -> Self;

  fn store(self) -> Self::Value;
}

pub(crate) type AddressValue = [u8; 20];

impl Entry for Address {
  type Value = AddressValue;

  fn load(value: Self::Value) -> Self {
    Self(value)
  }

  fn store(self) -> Self::Value {
    self.0
  }
}

/// The persisted part of an account.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
  pub balance: u64,
  pub transfer_in: u64,
  pub transfer_out: u64,
}

pub(crate) type AccountEntryValue = (u64, u64, u64);

impl Entry for AccountEntry {
  type Value = AccountEntryValue;

  fn load((balance, transfer_in, transfer_out): Self::Value) -> Self {
    Self {
      balance,
      transfer_in,
      transfer_out,
    }
  }

  fn store(self) -> Self::Value {
    (self.balance, self.transfer_in, self.transfer_out)
  }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct DayStatistic {
  pub day: Day,
  pub historical_holders: u64,
  pub actual_holders: u64,
  pub new_from: u64,
  pub new_to: u64,
}

pub(crate) type DayStatisticValue = (u64, u64, u64, u64);

impl DayStatistic {
  pub fn new(day: Day) -> Self {
    Self {
      day,
      historical_holders: 0,
      actual_holders: 0,
      new_from: 0,
      new_to: 0,
    }
  }

  pub(crate) fn load(
    day: Day,
    (historical_holders, actual_holders, new_from, new_to): DayStatisticValue,
  ) -> Self {
    Self {
      day,
      historical_holders,
      actual_holders,
      new_from,
      new_to,
    }
  }

  pub(crate) fn store(self) -> (u32, DayStatisticValue) {
    (
      self.day.key(),
      (
        self.historical_holders,
        self.actual_holders,
        self.new_from,
        self.new_to,
      ),
    )
  }
}

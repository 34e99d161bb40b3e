use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Balance {
  #[arg(help = "Print the account of <ADDRESS>.")]
  address: Address,
}

/// Balances as of the last commit. Accounts never seen print as zero.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub address: Address,
  pub balance: u64,
  pub transfer_in: u64,
  pub transfer_out: u64,
}

impl Balance {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let index = Index::open(&settings)?;

    let AccountEntry {
      balance,
      transfer_in,
      transfer_out,
    } = index.account(self.address)?.unwrap_or_default();

    Ok(Some(Box::new(Output {
      address: self.address,
      balance,
      transfer_in,
      transfer_out,
    })))
  }
}

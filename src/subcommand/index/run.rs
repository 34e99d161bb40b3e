use super::*;

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub anomalies: u64,
  pub last_tracked_block: u64,
  pub next_day_start_block: Watermark,
  pub overflow: u64,
  pub resident_accounts: u64,
  pub shortfall: u64,
  pub supply_changes: u64,
}

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let index = Index::open(&settings)?;

  let chain = RpcClient::new(settings.rpc_url(), TIMEOUT)?;

  let resolver = Etherscan::new(
    settings.resolver_url(),
    settings.etherscan_api_key(),
    TIMEOUT,
  )?;

  let ledger = Ledger::load(index, settings.ledger_config())?;

  let mut updater = Updater::new(ledger, &chain, &resolver, &settings);

  updater.run()?;

  let ledger = updater.ledger();

  Ok(Some(Box::new(Output {
    anomalies: ledger.anomalies(),
    last_tracked_block: ledger.last_tracked_block(),
    next_day_start_block: ledger.checkpoint().watermark,
    overflow: ledger.overflow(),
    resident_accounts: ledger.resident().try_into()?,
    shortfall: ledger.shortfall(),
    supply_changes: ledger.supply_changes(),
  })))
}

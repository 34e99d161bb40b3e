use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
  #[arg(long, help = "Load configuration from <CONFIG>.")]
  pub(crate) config: Option<PathBuf>,
  #[arg(
    long,
    help = "Track token contract <CONTRACT>. [default: 0xdac17f958d2ee523a2206206994597c13d831ec7]"
  )]
  pub(crate) contract: Option<Address>,
  #[arg(long, alias = "datadir", help = "Store index in <DATA_DIR>.")]
  pub(crate) data_dir: Option<PathBuf>,
  #[arg(long, help = "Authenticate to the block resolver with <ETHERSCAN_API_KEY>.")]
  pub(crate) etherscan_api_key: Option<String>,
  #[arg(
    long,
    help = "Evict zero balance accounts once <FLUSH_THRESHOLD> are pending. [default: 2000000]"
  )]
  pub(crate) flush_threshold: Option<u64>,
  #[arg(long, short, help = "Specify output format. [default: json]")]
  pub(crate) format: Option<OutputFormat>,
  #[arg(long, help = "Stop after indexing block <HEIGHT_LIMIT>.")]
  pub(crate) height_limit: Option<u64>,
  #[arg(long, help = "Use index at <INDEX>.")]
  pub(crate) index: Option<PathBuf>,
  #[arg(
    long,
    help = "Resolve block times with <RESOLVER_URL>. [default: https://api.etherscan.io/api]"
  )]
  pub(crate) resolver_url: Option<String>,
  #[arg(
    long,
    help = "Connect to Ethereum JSON-RPC at <RPC_URL>. [default: http://127.0.0.1:8545]"
  )]
  pub(crate) rpc_url: Option<String>,
}

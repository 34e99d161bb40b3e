use super::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Header {
  pub number: u64,
  pub timestamp: u64,
}

/// Read access to the chain the token lives on.
pub trait ChainSource {
  fn block_number(&self) -> Result<u64, SnafuError>;

  fn logs(
    &self,
    from: u64,
    to: u64,
    contract: Address,
    topics: &[H256],
  ) -> Result<Vec<Log>, SnafuError>;

  fn header(&self, block: u64) -> Result<Header, SnafuError>;
}

/// A hex-encoded JSON-RPC quantity.
#[derive(Debug, Copy, Clone, PartialEq, DeserializeFromStr)]
struct Quantity(u64);

impl FromStr for Quantity {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).map(Self)
  }
}

#[derive(Debug, Clone, PartialEq, DeserializeFromStr)]
struct Bytes(Vec<u8>);

impl FromStr for Bytes {
  type Err = hex::FromHexError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map(Self)
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
  address: Address,
  topics: Vec<H256>,
  data: Bytes,
  block_number: Quantity,
  transaction_hash: H256,
  log_index: Quantity,
  #[serde(default)]
  removed: bool,
}

impl From<RpcLog> for Log {
  fn from(log: RpcLog) -> Self {
    Self {
      address: log.address,
      topics: log.topics,
      data: log.data.0,
      block_number: log.block_number.0,
      transaction_hash: log.transaction_hash,
      log_index: log.log_index.0,
      removed: log.removed,
    }
  }
}

#[derive(Debug, Deserialize)]
struct RpcHeader {
  number: Quantity,
  timestamp: Quantity,
}

#[derive(Debug, Deserialize)]
struct RpcError {
  code: i64,
  message: String,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
  result: Option<T>,
  error: Option<RpcError>,
}

/// Ethereum JSON-RPC client.
pub struct RpcClient {
  client: reqwest::blocking::Client,
  url: String,
}

impl RpcClient {
  pub fn new(url: &str, timeout: Duration) -> Result<Self> {
    Ok(Self {
      client: reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build RPC client")?,
      url: url.into(),
    })
  }

  fn call<T: DeserializeOwned>(
    &self,
    method: &'static str,
    params: serde_json::Value,
  ) -> Result<Option<T>, SnafuError> {
    let response = self
      .client
      .post(&self.url)
      .json(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
      }))
      .send()
      .and_then(reqwest::blocking::Response::error_for_status)
      .and_then(reqwest::blocking::Response::json::<Response<T>>)
      .snafu_context(error::Rpc { method })?;

    if let Some(RpcError { code, message }) = response.error {
      return Err(error::RpcResponse {
        method,
        code,
        message,
      }
      .build());
    }

    Ok(response.result)
  }
}

impl ChainSource for RpcClient {
  fn block_number(&self) -> Result<u64, SnafuError> {
    let method = "eth_blockNumber";

    self
      .call::<Quantity>(method, json!([]))?
      .map(|quantity| quantity.0)
      .ok_or_else(|| error::MissingResult { method }.build())
  }

  fn logs(
    &self,
    from: u64,
    to: u64,
    contract: Address,
    topics: &[H256],
  ) -> Result<Vec<Log>, SnafuError> {
    let method = "eth_getLogs";

    let logs = self
      .call::<Vec<RpcLog>>(
        method,
        json!([{
          "fromBlock": format!("{from:#x}"),
          "toBlock": format!("{to:#x}"),
          "address": contract,
          "topics": [topics],
        }]),
      )?
      .ok_or_else(|| error::MissingResult { method }.build())?;

    Ok(
      logs
        .into_iter()
        .filter(|log| !log.removed)
        .map(Log::from)
        .collect(),
    )
  }

  fn header(&self, block: u64) -> Result<Header, SnafuError> {
    let header = self
      .call::<RpcHeader>("eth_getBlockByNumber", json!([format!("{block:#x}"), false]))?
      .ok_or_else(|| error::BlockNotFound { block }.build())?;

    Ok(Header {
      number: header.number.0,
      timestamp: header.timestamp.0,
    })
  }
}

use super::*;

/// Maps a unix timestamp to the first block mined at or after it.
pub trait BlockResolver {
  fn block_at_or_after(&self, timestamp: i64) -> Result<u64, SnafuError>;
}

#[derive(Debug, Deserialize)]
struct Response {
  status: String,
  message: String,
  result: serde_json::Value,
}

/// Etherscan's `getblocknobytime` endpoint.
pub struct Etherscan {
  api_key: Option<String>,
  client: reqwest::blocking::Client,
  url: String,
}

impl Etherscan {
  pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
    Ok(Self {
      api_key,
      client: reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build block resolver client")?,
      url: url.into(),
    })
  }

  fn interpret(timestamp: i64, response: Response) -> Result<u64, SnafuError> {
    let result = match &response.result {
      serde_json::Value::String(result) => result.clone(),
      other => other.to_string(),
    };

    if response.status == "1" {
      return result.parse().map_err(|_| {
        error::ResolverResponse {
          message: response.message,
          result,
        }
        .build()
      });
    }

    if result.to_lowercase().contains("rate limit") {
      return Err(
        error::ResolverResponse {
          message: response.message,
          result,
        }
        .build(),
      );
    }

    Err(error::FutureTimestamp { timestamp }.build())
  }
}

impl BlockResolver for Etherscan {
  fn block_at_or_after(&self, timestamp: i64) -> Result<u64, SnafuError> {
    let mut query = vec![
      ("module", "block".to_string()),
      ("action", "getblocknobytime".to_string()),
      ("closest", "after".to_string()),
      ("timestamp", timestamp.to_string()),
    ];

    if let Some(api_key) = &self.api_key {
      query.push(("apikey", api_key.clone()));
    }

    let response = self
      .client
      .get(&self.url)
      .query(&query)
      .send()
      .and_then(reqwest::blocking::Response::error_for_status)
      .and_then(reqwest::blocking::Response::json::<Response>)
      .snafu_context(error::Resolver)?;

    let block = Self::interpret(timestamp, response)?;

    log::debug!("Block {block} is the first at or after {timestamp}");

    Ok(block)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(json: &str) -> Response {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn block() {
    assert_eq!(
      Etherscan::interpret(
        1511913600,
        response(r#"{"status":"1","message":"OK","result":"4640667"}"#)
      )
      .unwrap(),
      4640667
    );
  }

  #[test]
  fn future_timestamp() {
    let err = Etherscan::interpret(
      4102444800,
      response(r#"{"status":"0","message":"NOTOK","result":"Error! No closest block found"}"#),
    )
    .unwrap_err();

    assert!(matches!(
      err,
      SnafuError::FutureTimestamp {
        timestamp: 4102444800
      }
    ));
    assert!(!err.is_transient());
  }

  #[test]
  fn rate_limit_is_transient() {
    let err = Etherscan::interpret(
      1511913600,
      response(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#),
    )
    .unwrap_err();

    assert!(err.is_transient());
  }

  #[test]
  fn garbage_block_is_transient() {
    assert!(Etherscan::interpret(
      1511913600,
      response(r#"{"status":"1","message":"OK","result":{"block":1}}"#)
    )
    .unwrap_err()
    .is_transient());
  }
}

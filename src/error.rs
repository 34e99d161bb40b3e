use super::*;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum SnafuError {
  #[snafu(display("block {block} not found"))]
  BlockNotFound { block: u64 },
  #[snafu(display("invalid date `{input}`, expected YYMMDD"))]
  DayParse { input: String },
  #[snafu(display("block {block} has out-of-range timestamp {timestamp}"))]
  InvalidTimestamp { block: u64, timestamp: u64 },
  #[snafu(display("invalid value `{value}` for index metadata `{key}`"))]
  MetaParse { key: &'static str, value: String },
  #[snafu(display("`{method}` response has no result"))]
  MissingResult { method: &'static str },
  #[snafu(display("no block at or after timestamp {timestamp} yet"))]
  FutureTimestamp { timestamp: i64 },
  #[snafu(display("block resolver request failed"))]
  Resolver { source: reqwest::Error },
  #[snafu(display("block resolver returned `{message}`: {result}"))]
  ResolverResponse { message: String, result: String },
  #[snafu(display("`{method}` request failed"))]
  Rpc {
    method: &'static str,
    source: reqwest::Error,
  },
  #[snafu(display("`{method}` failed with code {code}: {message}"))]
  RpcResponse {
    method: &'static str,
    code: i64,
    message: String,
  },
}

impl SnafuError {
  /// Failures of an upstream service that may succeed if retried.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      Self::BlockNotFound { .. }
        | Self::MissingResult { .. }
        | Self::Resolver { .. }
        | Self::ResolverResponse { .. }
        | Self::Rpc { .. }
        | Self::RpcResponse { .. }
    )
  }
}

pub(crate) trait ResultExt<T, E>: Sized {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E> {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat,
  {
    use snafu::ResultExt;
    self.context(context)
  }
}

/// Whether `err` wraps an upstream failure worth retrying.
pub(crate) fn is_transient(err: &Error) -> bool {
  err
    .downcast_ref::<SnafuError>()
    .is_some_and(SnafuError::is_transient)
}

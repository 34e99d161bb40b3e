use {
  self::{
    arguments::Arguments,
    day::Day,
    error::{ResultExt, SnafuError},
    index::{
      AccountEntry, DayStatistic, Index, Ledger, LedgerConfig, Meta, Store, Updater, Watermark,
    },
    options::Options,
    resolver::{BlockResolver, Etherscan},
    rpc::{ChainSource, RpcClient},
    settings::Settings,
    subcommand::{OutputFormat, Subcommand, SubcommandResult},
  },
  anyhow::{Context, Error, anyhow, ensure},
  chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc},
  clap::{
    Parser, ValueEnum,
    builder::styling::{AnsiColor, Effects, Styles},
  },
  erc20::{Address, H256, Log, Transfer, TransferKind},
  serde::{Deserialize, Serialize, de::DeserializeOwned},
  serde_json::json,
  serde_with::{DeserializeFromStr, SerializeDisplay},
  snafu::Snafu,
  std::{
    collections::{BTreeMap, HashMap},
    env,
    f64::consts::LN_2,
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process,
    str::FromStr,
    sync::atomic::{self, AtomicBool},
    thread,
    time::{Duration, Instant},
  },
};

pub mod arguments;
mod day;
mod error;
pub mod index;
pub mod options;
mod resolver;
mod rpc;
mod settings;
pub mod subcommand;
#[cfg(test)]
mod testing;

type Result<T = (), E = Error> = std::result::Result<T, E>;

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

fn default<T: Default>() -> T {
  Default::default()
}

pub fn main() {
  env_logger::init();

  ctrlc::set_handler(move || {
    if SHUTTING_DOWN.fetch_or(true, atomic::Ordering::Relaxed) {
      process::exit(1);
    }

    eprintln!("Shutting down gracefully. Press <CTRL-C> again to shutdown immediately.");
  })
  .expect("Error setting <CTRL-C> handler");

  let args = Arguments::parse();

  let format = args.options.format;

  match args.run() {
    Err(err) => {
      eprintln!("error: {err}");

      for (i, err) in err.chain().skip(1).enumerate() {
        if i == 0 {
          eprintln!();
          eprintln!("because:");
        }

        eprintln!("- {err}");
      }

      if env::var_os("RUST_BACKTRACE")
        .map(|val| val == "1")
        .unwrap_or_default()
      {
        eprintln!("{}", err.backtrace());
      }

      process::exit(1);
    }
    Ok(output) => {
      if let Some(output) = output {
        output.print(format.unwrap_or_default());
      }
    }
  }
}

use super::*;

pub mod info;
pub mod run;

#[derive(Debug, Parser)]
pub(crate) enum IndexSubcommand {
  #[command(about = "Print index statistics")]
  Info,
  #[command(about = "Index token transfers until interrupted", alias = "update")]
  Run,
}

impl IndexSubcommand {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    match self {
      Self::Info => info::run(settings),
      Self::Run => run::run(settings),
    }
  }
}

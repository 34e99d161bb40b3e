use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Stats {
  #[arg(long, help = "Only print statistics for <DATE>, written YYMMDD.")]
  date: Option<Day>,
}

impl Stats {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let index = Index::open(&settings)?;

    let statistics = match self.date {
      Some(day) => vec![
        index
          .day_statistic(day)?
          .ok_or_else(|| anyhow!("no statistics for {day}"))?,
      ],
      None => index.day_statistics()?,
    };

    Ok(Some(Box::new(statistics)))
  }
}

use super::*;

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let index = Index::open(&settings)?;
  Ok(Some(Box::new(index.info()?)))
}

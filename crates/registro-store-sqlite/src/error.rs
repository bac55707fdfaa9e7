//! Error type for `registro-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] registro_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown status marker: {0:?}")]
  UnknownStatus(String),

  #[error("credits out of range: {0}")]
  CreditsOutOfRange(i64),

  /// A read failed for a reason the caller cannot act on. Details are
  /// logged, not returned.
  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  /// The business-rule error inside, if this is one.
  pub fn as_core(&self) -> Option<&registro_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

/// Lets catalog code use `?` on backend errors inside engine calls.
impl From<Error> for registro_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => registro_core::Error::storage(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// Sonda de disponibilidad de la base de datos: abre una conexión y ejecuta
// `SELECT 1`. Un puerto abierto no basta; Postgres acepta TCP antes de
// terminar `init.sql`.
use diesel::prelude::*;
use stack::{Probe, StackError};

#[cfg(all(feature = "pg", not(test)))]
type DbConn = PgConnection;
#[cfg(any(test, not(feature = "pg")))]
type DbConn = SqliteConnection;

pub struct DatabaseProbe {
  url: String,
  label: String,
}

impl DatabaseProbe {
  pub fn new(database_url: impl Into<String>) -> Self {
    let url = database_url.into();
    // La etiqueta no debe llevar credenciales a los logs.
    let label = crate::config::host_port_of(&url).unwrap_or_else(|| "database".to_string());
    Self { url, label }
  }
}

impl Probe for DatabaseProbe {
  fn name(&self) -> &str {
    &self.label
  }

  fn check(&self) -> stack::Result<()> {
    let unavailable = |reason: String| StackError::Unavailable { target: self.label.clone(), reason };
    let mut conn = DbConn::establish(&self.url).map_err(|e| unavailable(e.to_string()))?;
    diesel::sql_query("SELECT 1").execute(&mut conn).map_err(|e| unavailable(e.to_string()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stack::{wait_until_ready, RetryPolicy};
  use std::time::Duration;

  #[test]
  fn sqlite_file_is_ready_at_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("probe.db");
    let probe = DatabaseProbe::new(path.to_str().unwrap());
    assert_eq!(probe.name(), "database");
    let report = wait_until_ready(&probe, &RetryPolicy::default().with_deadline(Duration::ZERO)).unwrap();
    assert_eq!(report.attempts, 1);
  }

  #[test]
  fn unopenable_database_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("probe.db");
    let probe = DatabaseProbe::new(path.to_str().unwrap());
    let err = wait_until_ready(&probe, &RetryPolicy::default().with_deadline(Duration::ZERO)).unwrap_err();
    assert!(matches!(err, StackError::NotReady { attempts: 1, .. }));
  }

  #[test]
  fn label_hides_credentials() {
    assert_eq!(DatabaseProbe::new("postgres://u:secret@db:5432/foodgram").name(), "db:5432");
  }
}

use foodgram_domain::DomainError;
use stack::{RetryPolicy, StackError};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "/app/data";
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

// Errores del binario de arranque.
//
// Agrupa los errores del dominio (lectura de datos, base de datos) y los del
// stack (compose, esperas, cadena de arranque).
#[derive(Error, Debug)]
pub enum BootstrapError {
  /// Errores de datos de referencia o de la base de datos.
  #[error("Error de dominio: {0}")]
  Domain(#[from] DomainError),

  /// Errores de topología, disponibilidad o cadena de arranque.
  #[error("Error de arranque: {0}")]
  Stack(#[from] StackError),

  /// Configuración o entrada inválida detectada por el propio binario.
  #[error("Error de validacion: {0}")]
  Validation(String),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

/// URL de base de datos: la de `--database-url` si se dio y, si no, la
/// resuelta del entorno. Ambas pasan por la misma validación.
pub fn resolve_database_url(explicit: Option<&str>) -> Result<String> {
  let url = foodgram_persistence::config::database_url_from(|k| {
    if k == "FOODGRAM_DB_URL" {
      if let Some(url) = explicit {
        return Some(url.to_string());
      }
    }
    std::env::var(k).ok()
  })?;
  Ok(url)
}

/// Backoff por defecto con el plazo dado en segundos.
pub fn wait_policy(timeout_secs: u64) -> RetryPolicy {
  RetryPolicy::default().with_deadline(Duration::from_secs(timeout_secs))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wait_policy_keeps_backoff_and_sets_deadline() {
    let p = wait_policy(5);
    assert_eq!(p.deadline, Duration::from_secs(5));
    assert_eq!(p.initial_delay, RetryPolicy::default().initial_delay);
  }

  #[test]
  fn explicit_url_is_validated() {
    // Las pruebas del binario enlazan la persistencia sin cfg(test): con `pg`
    // sólo se aceptan URLs postgres://.
    let r = resolve_database_url(Some("postgres://u:p@db:5432/foodgram"));
    if cfg!(feature = "pg") {
      assert_eq!(r.unwrap(), "postgres://u:p@db:5432/foodgram");
    } else {
      assert!(matches!(r, Err(BootstrapError::Domain(DomainError::ExternalError(_)))));
    }
  }

  #[test]
  fn errors_convert_with_from() {
    let e: BootstrapError = StackError::Parse("x".into()).into();
    assert!(e.to_string().starts_with("Error de arranque"));
    let e: BootstrapError = DomainError::ValidationError("y".into()).into();
    assert!(matches!(e, BootstrapError::Domain(_)));
  }
}

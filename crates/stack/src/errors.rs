// Archivo: errors.rs
// Propósito: definir los errores de la topología de servicios y el alias
// Result<T> usado por las APIs del crate.
use thiserror::Error;
/// Errores comunes del arranque del stack.
///
/// - `UnknownDependency`: `depends_on` apunta a un servicio inexistente.
/// - `Cycle`: las dependencias forman un ciclo.
/// - `Unavailable`: un intento de sondeo falló.
/// - `NotReady`: la dependencia no respondió antes del plazo.
/// - `StepFailed`: un paso de la cadena de arranque falló.
#[derive(Error, Debug)]
pub enum StackError {
  /// Dependencia declarada hacia un servicio que no existe.
  #[error("El servicio '{service}' depende de '{dependency}', que no existe")]
  UnknownDependency { service: String, dependency: String },
  /// Ciclo de dependencias (incluye dependencias sobre sí mismo).
  #[error("Ciclo de dependencias: {}", .0.join(" -> "))]
  Cycle(Vec<String>),
  /// Un intento de sondeo no tuvo éxito (la sonda no es de red pura).
  #[error("'{target}' no disponible: {reason}")]
  Unavailable { target: String, reason: String },
  /// Plazo agotado esperando a que la dependencia acepte conexiones.
  #[error("'{target}' no está listo tras {attempts} intentos: {last_error}")]
  NotReady { target: String, attempts: u32, last_error: String },
  /// Fallo de un paso de la cadena de arranque.
  #[error("El paso '{step}' falló: {reason}")]
  StepFailed { step: String, reason: String },
  /// Fichero o expresión mal formada.
  #[error("Error de formato: {0}")]
  Parse(String),
  /// Error de E/S.
  #[error("Error de E/S: {0}")]
  Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for StackError {
  fn from(e: serde_yaml::Error) -> Self {
    Self::Parse(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, StackError>;

//! Resolución de la URL de base de datos a partir del entorno (`.env`
//! incluido).
//!
//! Orden: `FOODGRAM_DB_URL`, `DATABASE_URL` y, si ninguna existe, se compone
//! a partir de las variables del contenedor de Postgres (`POSTGRES_USER`,
//! `POSTGRES_PASSWORD`, `DB_HOST`, `DB_PORT`, `POSTGRES_DB`).
use foodgram_domain::DomainError;

pub const DEFAULT_DB_HOST: &str = "db";
pub const DEFAULT_DB_PORT: &str = "5432";
pub const DEFAULT_DB_NAME: &str = "foodgram";

/// Lee `.env` (si existe) y resuelve la URL desde el entorno del proceso.
pub fn database_url_from_env() -> Result<String, DomainError> {
  dotenvy::dotenv().ok();
  database_url_from(|k| std::env::var(k).ok())
}

/// Igual que `database_url_from_env` pero con un lector de variables
/// inyectado.
pub fn database_url_from<F>(lookup: F) -> Result<String, DomainError>
  where F: Fn(&str) -> Option<String>
{
  let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
  let url = match get("FOODGRAM_DB_URL").or_else(|| get("DATABASE_URL")) {
    Some(url) => url,
    None => {
      let user = get("POSTGRES_USER").ok_or_else(|| {
                                       DomainError::ExternalError("FOODGRAM_DB_URL / DATABASE_URL / POSTGRES_USER \
                                                                   not set"
                                                                           .into())
                                     })?;
      let password = get("POSTGRES_PASSWORD").unwrap_or_default();
      let host = get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.into());
      let port = get("DB_PORT").unwrap_or_else(|| DEFAULT_DB_PORT.into());
      let name = get("POSTGRES_DB").unwrap_or_else(|| DEFAULT_DB_NAME.into());
      compose_postgres_url(&user, &password, &host, &port, &name)
    }
  };
  validate_url(&url)?;
  Ok(url)
}

pub fn compose_postgres_url(user: &str, password: &str, host: &str, port: &str, name: &str) -> String {
  if password.is_empty() {
    format!("postgres://{}@{}:{}/{}", urlencoding::encode(user), host, port, name)
  } else {
    format!("postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(user),
            urlencoding::encode(password),
            host,
            port,
            name)
  }
}

/// Extrae `host:port` de una URL de Postgres para sondear disponibilidad
/// antes de abrir el pool.
pub fn host_port_of(url: &str) -> Option<String> {
  let rest = url.split_once("://")?.1;
  let authority = rest.split(['/', '?']).next()?;
  let host_port = authority.rsplit_once('@').map(|(_, hp)| hp).unwrap_or(authority);
  if host_port.is_empty() {
    return None;
  }
  if host_port.contains(':') && !host_port.ends_with(']') {
    Some(host_port.to_string())
  } else {
    Some(format!("{}:{}", host_port, DEFAULT_DB_PORT))
  }
}

#[cfg(all(feature = "pg", not(test)))]
fn validate_url(url: &str) -> Result<(), DomainError> {
  let l = url.to_lowercase();
  if !(l.starts_with("postgres://") || l.starts_with("postgresql://")) {
    return Err(DomainError::ExternalError("FOODGRAM_DB_URL / DATABASE_URL does not look like Postgres URL".into()));
  }
  Ok(())
}

#[cfg(any(test, not(feature = "pg")))]
fn validate_url(url: &str) -> Result<(), DomainError> {
  let l = url.to_lowercase();
  if l.starts_with("postgres") {
    return Err(DomainError::ExternalError("foodgram-persistence was compiled without 'pg' feature; enable the 'pg' \
                                           feature to use Postgres in production"
                                                                                 .into()));
  }
  Ok(())
}

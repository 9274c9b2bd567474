use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod config;

/// Punto de entrada de `foodgram-bootstrap`.
///
/// Se carga `.env` antes de interpretar argumentos para que los valores por
/// defecto con `env = ...` de clap lo vean. Los crates de librería registran
/// con `log`; el subscriber de tracing recoge esos registros también.
fn main() -> ExitCode {
  dotenvy::dotenv().ok();
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt().with_env_filter(filter).with_target(false).init();

  let args = cli::Cli::parse();
  match cli::run(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{}", e);
      ExitCode::FAILURE
    }
  }
}

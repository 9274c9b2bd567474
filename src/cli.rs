use crate::config::{self, BootstrapError, Result, DEFAULT_DATA_DIR, DEFAULT_WAIT_TIMEOUT_SECS};
use clap::{Parser, Subcommand};
use foodgram_domain::sources::{self, ReferenceData};
use foodgram_domain::{DomainError, Ingredient, LoadReport, ReferenceRepository, Tag};
use foodgram_persistence::{check_init_script, DatabaseProbe, DieselReferenceRepository};
use stack::{wait_until_ready, ComposeFile, Probe, StackTopology, StartupChain, TcpProbe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Arranque del stack foodgram: verificación de `init.sql` y compose, espera
/// de dependencias, migraciones y carga de datos de referencia.
#[derive(Parser, Debug)]
#[command(name = "foodgram-bootstrap", author, version, about, long_about = None)]
pub struct Cli {
  /// URL de la base de datos (si falta se compone desde POSTGRES_*)
  #[arg(long, global = true, env = "FOODGRAM_DB_URL")]
  pub database_url: Option<String>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Verifica que los COPY/INSERT de un script SQL usen tablas y columnas declaradas
  CheckSql { file: PathBuf },
  /// Valida `depends_on` de un fichero compose e imprime el orden de arranque
  Plan { compose_file: PathBuf },
  /// Espera a que un endpoint TCP `host:port` acepte conexiones
  WaitFor {
    target: String,
    #[arg(long, env = "FOODGRAM_WAIT_TIMEOUT_SECS", default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    timeout: u64,
  },
  /// Espera a que la base de datos acepte consultas
  WaitDb {
    #[arg(long, env = "FOODGRAM_WAIT_TIMEOUT_SECS", default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    timeout: u64,
  },
  /// Aplica las migraciones embebidas
  Migrate,
  /// Carga idempotente de ingredientes y tags
  Load {
    #[arg(long, env = "FOODGRAM_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Fichero de ingredientes (.json o .csv); sustituye al del directorio
    #[arg(long)]
    ingredients: Option<PathBuf>,
    /// Fichero de tags (.json o .csv); sustituye al del directorio
    #[arg(long)]
    tags: Option<PathBuf>,
    /// Segundos a esperar por la base de datos antes de cargar
    #[arg(long)]
    wait: Option<u64>,
  },
  /// Muestra el número de ingredientes y tags
  Stats,
  /// Lista ingredientes cuyo nombre empieza por el prefijo
  Search { prefix: String },
  /// Espera dependencias y ejecuta `a && b && c` deteniéndose en el primer fallo
  RunChain {
    command: String,
    /// Dependencia `host:port` a esperar antes de la cadena (repetible)
    #[arg(long = "wait")]
    wait: Vec<String>,
    #[arg(long, env = "FOODGRAM_WAIT_TIMEOUT_SECS", default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    timeout: u64,
  },
}

pub fn run(cli: Cli) -> Result<()> {
  let db_url = cli.database_url.as_deref();
  match cli.command {
    Command::CheckSql { file } => check_sql(&file),
    Command::Plan { compose_file } => plan(&compose_file),
    Command::WaitFor { target, timeout } => {
      wait_until_ready(&TcpProbe::new(target), &config::wait_policy(timeout))?;
      Ok(())
    }
    Command::WaitDb { timeout } => {
      let url = config::resolve_database_url(db_url)?;
      wait_until_ready(&DatabaseProbe::new(url), &config::wait_policy(timeout))?;
      Ok(())
    }
    Command::Migrate => {
      let url = config::resolve_database_url(db_url)?;
      let repo = DieselReferenceRepository::connect(&url)?;
      let applied = repo.run_migrations()?;
      println!("{} migración(es) aplicada(s)", applied.len());
      Ok(())
    }
    Command::Load { data_dir, ingredients, tags, wait } => {
      let (ingredients, tags) = read_snapshot(&data_dir, ingredients.as_deref(), tags.as_deref())?;
      let url = config::resolve_database_url(db_url)?;
      if let Some(secs) = wait {
        wait_until_ready(&DatabaseProbe::new(url.clone()), &config::wait_policy(secs))?;
      }
      let repo = DieselReferenceRepository::new(&url)?;
      let report = load(&repo, &ingredients, &tags)?;
      println!("{} insertados, {} omitidos", report.inserted, report.skipped);
      Ok(())
    }
    Command::Stats => {
      let url = config::resolve_database_url(db_url)?;
      let repo = DieselReferenceRepository::connect(&url)?;
      println!("ingredients: {}", repo.count_ingredients()?);
      println!("tags: {}", repo.count_tags()?);
      Ok(())
    }
    Command::Search { prefix } => {
      let url = config::resolve_database_url(db_url)?;
      let repo = DieselReferenceRepository::connect(&url)?;
      for row in repo.search_ingredients(&prefix)? {
        println!("{:>6} | {}", row.id, row.ingredient);
      }
      Ok(())
    }
    Command::RunChain { command, wait, timeout } => run_chain(&command, &wait, timeout),
  }
}

fn check_sql(file: &Path) -> Result<()> {
  let issues = check_init_script(file)?;
  if issues.is_empty() {
    println!("{}: OK", file.display());
    return Ok(());
  }
  for issue in &issues {
    println!("{}: {}", file.display(), issue);
  }
  Err(BootstrapError::Validation(format!("{}: {} problema(s)", file.display(), issues.len())))
}

fn plan(compose_file: &Path) -> Result<()> {
  let file = ComposeFile::load(compose_file)?;
  let topo = StackTopology::from_compose(&file)?;
  for (i, name) in topo.startup_order().iter().enumerate() {
    let deps: Vec<String> = topo.dependencies_of(name)
                                .into_iter()
                                .map(|d| {
                                  let cond = file.service(name).and_then(|s| s.dependency_condition(d));
                                  match cond {
                                    Some(c) if c != "service_started" => format!("{} ({})", d, c),
                                    _ => d.to_string(),
                                  }
                                })
                                .collect();
    if deps.is_empty() {
      println!("{}. {}", i + 1, name);
    } else {
      println!("{}. {} <- {}", i + 1, name, deps.join(", "));
    }
  }
  for (service, port) in file.published_ports()? {
    if let Some(host) = port.host {
      println!("publicado: {} {} -> {}", service, host, port.container);
    }
  }
  Ok(())
}

// Los ficheros explícitos sustituyen a los del directorio; sin ninguno se
// descubre `data_dir`.
fn read_snapshot(data_dir: &Path,
                 ingredients: Option<&Path>,
                 tags: Option<&Path>)
                 -> Result<(Vec<Ingredient>, Vec<Tag>)> {
  let found = if ingredients.is_none() && tags.is_none() {
    ReferenceData::discover(data_dir)?
  } else {
    ReferenceData { ingredients: ingredients.map(Path::to_path_buf), tags: tags.map(Path::to_path_buf) }
  };
  if found.is_empty() {
    return Err(DomainError::ValidationError(format!("no hay ingredients.* ni tags.* en {}",
                                                    data_dir.display())).into());
  }
  let mut out_ingredients = Vec::new();
  if let Some(path) = &found.ingredients {
    debug!("{} sha256={}", path.display(), sources::fingerprint(path)?);
    out_ingredients = sources::dedupe_ingredients(sources::read_ingredients(path)?);
  } else {
    warn!("sin fichero de ingredientes");
  }
  let mut out_tags = Vec::new();
  if let Some(path) = &found.tags {
    debug!("{} sha256={}", path.display(), sources::fingerprint(path)?);
    out_tags = sources::dedupe_tags(sources::read_tags(path)?);
  } else {
    warn!("sin fichero de tags");
  }
  Ok((out_ingredients, out_tags))
}

pub fn load(repo: &dyn ReferenceRepository, ingredients: &[Ingredient], tags: &[Tag]) -> Result<LoadReport> {
  let report = repo.insert_ingredients(ingredients)?.merge(repo.insert_tags(tags)?);
  info!(inserted = report.inserted, skipped = report.skipped, "carga de datos de referencia terminada");
  Ok(report)
}

fn run_chain(command: &str, wait: &[String], timeout: u64) -> Result<()> {
  // Se valida la cadena antes de esperar a nadie.
  let chain = StartupChain::parse_shell(command)?;
  let policy = config::wait_policy(timeout);
  let probes: Vec<Box<dyn Probe>> = wait.iter().map(|t| Box::new(TcpProbe::new(t.clone())) as Box<dyn Probe>).collect();
  stack::wait_for_all(&probes, &policy)?;
  let report = chain.run().into_result()?;
  info!("cadena completada: {} paso(s)", report.completed.len());
  Ok(())
}

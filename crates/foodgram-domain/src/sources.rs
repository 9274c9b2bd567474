//! Lectura de las instantáneas de datos de referencia (`ingredients.*`,
//! `tags.*`) en formato CSV o JSON.
//!
//! Los CSV son los que monta el script de arranque de Postgres; los JSON son
//! los que usa el cargador y tienen prioridad cuando ambos existen.
use crate::{DomainError, Ingredient, Tag};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const INGREDIENT_HEADER: [&str; 2] = ["name", "measurement_unit"];
const TAG_HEADER: [&str; 2] = ["name", "slug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
  Csv,
  Json,
}

impl SourceFormat {
  pub fn from_path(path: &Path) -> Result<Self, DomainError> {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
      Some("csv") => Ok(SourceFormat::Csv),
      Some("json") => Ok(SourceFormat::Json),
      _ => Err(DomainError::ValidationError(format!("Formato no soportado (se espera .csv o .json): {}",
                                                    path.display()))),
    }
  }
}

#[derive(Debug, Deserialize)]
struct IngredientRecord {
  name: String,
  measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
  name: String,
  slug: String,
}

/// Lee un fichero de ingredientes. El primer registro inválido aborta la
/// lectura con un error que indica fichero y número de registro (base 1).
pub fn read_ingredients(path: &Path) -> Result<Vec<Ingredient>, DomainError> {
  let pairs = match SourceFormat::from_path(path)? {
    SourceFormat::Csv => read_csv_pairs(path, &INGREDIENT_HEADER)?,
    SourceFormat::Json => {
      let records: Vec<IngredientRecord> = serde_json::from_str(&fs::read_to_string(path)?)?;
      records.into_iter().map(|r| (r.name, r.measurement_unit)).collect()
    }
  };
  pairs.iter()
       .enumerate()
       .map(|(i, (name, unit))| Ingredient::new(name, unit).map_err(|e| at_record(path, i + 1, e)))
       .collect()
}

pub fn read_tags(path: &Path) -> Result<Vec<Tag>, DomainError> {
  let pairs = match SourceFormat::from_path(path)? {
    SourceFormat::Csv => read_csv_pairs(path, &TAG_HEADER)?,
    SourceFormat::Json => {
      let records: Vec<TagRecord> = serde_json::from_str(&fs::read_to_string(path)?)?;
      records.into_iter().map(|r| (r.name, r.slug)).collect()
    }
  };
  pairs.iter()
       .enumerate()
       .map(|(i, (name, slug))| Tag::new(name, slug).map_err(|e| at_record(path, i + 1, e)))
       .collect()
}

fn at_record(path: &Path, n: usize, e: DomainError) -> DomainError {
  DomainError::ValidationError(format!("{} registro {}: {}", path.display(), n, e))
}

// La cabecera es opcional: el script SQL hace COPY sin HEADER.
fn read_csv_pairs(path: &Path, header: &[&str; 2]) -> Result<Vec<(String, String)>, DomainError> {
  let mut reader = csv::ReaderBuilder::new().has_headers(false)
                                           .flexible(true)
                                           .trim(csv::Trim::All)
                                           .from_path(path)?;
  let mut out = Vec::new();
  for (i, rec) in reader.records().enumerate() {
    let rec = rec?;
    if i == 0 && rec.len() == 2 && rec[0].eq_ignore_ascii_case(header[0]) && rec[1].eq_ignore_ascii_case(header[1]) {
      continue;
    }
    if rec.len() != 2 {
      return Err(DomainError::ValidationError(format!("{} registro {}: se esperaban 2 columnas ({}), hay {}",
                                                      path.display(),
                                                      i + 1,
                                                      header.join(","),
                                                      rec.len())));
    }
    out.push((rec[0].to_string(), rec[1].to_string()));
  }
  Ok(out)
}

/// Elimina duplicados dentro de la instantánea conservando la primera
/// aparición.
pub fn dedupe_ingredients(items: Vec<Ingredient>) -> Vec<Ingredient> {
  let mut seen = HashSet::new();
  items.into_iter()
       .filter(|i| {
         let fresh = seen.insert(i.name().to_string());
         if !fresh {
           log::warn!("ingrediente repetido omitido: {}", i);
         }
         fresh
       })
       .collect()
}

pub fn dedupe_tags(items: Vec<Tag>) -> Vec<Tag> {
  let mut names = HashSet::new();
  let mut slugs = HashSet::new();
  items.into_iter()
       .filter(|t| {
         let fresh = !names.contains(t.name()) && !slugs.contains(t.slug());
         if fresh {
           names.insert(t.name().to_string());
           slugs.insert(t.slug().to_string());
         } else {
           log::warn!("tag repetido omitido: {}", t);
         }
         fresh
       })
       .collect()
}

/// Huella sha256 (hex) del contenido de un fichero de datos.
pub fn fingerprint(path: &Path) -> Result<String, DomainError> {
  let bytes = fs::read(path)?;
  let mut hasher = Sha256::new();
  hasher.update(&bytes);
  Ok(format!("{:x}", hasher.finalize()))
}

/// Ficheros de referencia encontrados en un directorio de datos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
  pub ingredients: Option<PathBuf>,
  pub tags: Option<PathBuf>,
}

impl ReferenceData {
  /// Busca `ingredients.{json,csv}` y `tags.{json,csv}`; JSON tiene prioridad.
  pub fn discover(data_dir: &Path) -> Result<Self, DomainError> {
    if !data_dir.is_dir() {
      return Err(DomainError::ExternalError(format!("Directorio de datos inexistente: {}", data_dir.display())));
    }
    let pick = |stem: &str| {
      ["json", "csv"].iter().map(|ext| data_dir.join(format!("{}.{}", stem, ext))).find(|p| p.is_file())
    };
    Ok(Self { ingredients: pick("ingredients"), tags: pick("tags") })
  }

  pub fn is_empty(&self) -> bool {
    self.ingredients.is_none() && self.tags.is_none()
  }
}

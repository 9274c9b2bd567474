use crate::DomainError;
use crate::{Ingredient, Tag};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Resultado de una carga: filas insertadas y filas omitidas porque su clave
/// natural ya existía.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped: usize,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.inserted + self.skipped
    }

    pub fn merge(self, other: LoadReport) -> LoadReport {
        LoadReport { inserted: self.inserted + other.inserted, skipped: self.skipped + other.skipped }
    }
}

/// Ingrediente ya persistido (con id sustituto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIngredient {
    pub id: i32,
    pub ingredient: Ingredient,
}

/// Tag ya persistido (con id sustituto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTag {
    pub id: i32,
    pub tag: Tag,
}

/// Operaciones de persistencia para los datos de referencia.
///
/// Las inserciones son idempotentes: una fila cuya clave natural ya existe se
/// omite y se contabiliza en `LoadReport::skipped`, nunca se duplica.
pub trait ReferenceRepository: Send + Sync {
    /// Inserta los ingredientes ausentes. Se omite un ingrediente cuyo nombre
    /// ya existe (con cualquier unidad); el par `(name, measurement_unit)`
    /// también es único.
    fn insert_ingredients(&self, items: &[Ingredient]) -> Result<LoadReport, DomainError>;

    /// Inserta los tags ausentes. Se omite un tag cuyo nombre o slug ya existe.
    fn insert_tags(&self, items: &[Tag]) -> Result<LoadReport, DomainError>;

    /// Lista todos los ingredientes en orden de inserción.
    fn list_ingredients(&self) -> Result<Vec<StoredIngredient>, DomainError>;

    fn list_tags(&self) -> Result<Vec<StoredTag>, DomainError>;

    fn count_ingredients(&self) -> Result<i64, DomainError>;

    fn count_tags(&self) -> Result<i64, DomainError>;

    /// Ingredientes cuyo nombre empieza por `prefix` (sin distinguir
    /// mayúsculas), ordenados por nombre.
    fn search_ingredients(&self, prefix: &str) -> Result<Vec<StoredIngredient>, DomainError>;

    fn find_tag_by_slug(&self, slug: &str) -> Result<Option<StoredTag>, DomainError>;
}

/// Implementación en memoria para tests y ejecuciones en seco.
pub struct InMemoryReferenceRepository {
    ingredients: Arc<Mutex<Vec<StoredIngredient>>>,
    tags: Arc<Mutex<Vec<StoredTag>>>,
}

impl InMemoryReferenceRepository {
    pub fn new() -> Self {
        Self { ingredients: Arc::new(Mutex::new(Vec::new())), tags: Arc::new(Mutex::new(Vec::new())) }
    }

    // Helper to map poisoned mutex errors into DomainError
    fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
        m.lock()
         .map_err(|e| DomainError::ExternalError(format!("Mutex '{}' poisoned: {}", name, e)))
    }
}

impl ReferenceRepository for InMemoryReferenceRepository {
    fn insert_ingredients(&self, items: &[Ingredient]) -> Result<LoadReport, DomainError> {
        let mut rows = self.lock_map(&self.ingredients, "ingredients")?;
        let mut names: HashSet<String> = rows.iter().map(|r| r.ingredient.name().to_string()).collect();
        let mut report = LoadReport::default();
        for item in items {
            if names.insert(item.name().to_string()) {
                let id = rows.len() as i32 + 1;
                rows.push(StoredIngredient { id, ingredient: item.clone() });
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }

    fn insert_tags(&self, items: &[Tag]) -> Result<LoadReport, DomainError> {
        let mut rows = self.lock_map(&self.tags, "tags")?;
        let mut names: HashSet<String> = rows.iter().map(|r| r.tag.name().to_string()).collect();
        let mut slugs: HashSet<String> = rows.iter().map(|r| r.tag.slug().to_string()).collect();
        let mut report = LoadReport::default();
        for item in items {
            if names.contains(item.name()) || slugs.contains(item.slug()) {
                report.skipped += 1;
                continue;
            }
            names.insert(item.name().to_string());
            slugs.insert(item.slug().to_string());
            let id = rows.len() as i32 + 1;
            rows.push(StoredTag { id, tag: item.clone() });
            report.inserted += 1;
        }
        Ok(report)
    }

    fn list_ingredients(&self) -> Result<Vec<StoredIngredient>, DomainError> {
        let rows = self.lock_map(&self.ingredients, "ingredients")?;
        Ok(rows.clone())
    }

    fn list_tags(&self) -> Result<Vec<StoredTag>, DomainError> {
        let rows = self.lock_map(&self.tags, "tags")?;
        Ok(rows.clone())
    }

    fn count_ingredients(&self) -> Result<i64, DomainError> {
        Ok(self.lock_map(&self.ingredients, "ingredients")?.len() as i64)
    }

    fn count_tags(&self) -> Result<i64, DomainError> {
        Ok(self.lock_map(&self.tags, "tags")?.len() as i64)
    }

    fn search_ingredients(&self, prefix: &str) -> Result<Vec<StoredIngredient>, DomainError> {
        let needle = prefix.trim().to_lowercase();
        let rows = self.lock_map(&self.ingredients, "ingredients")?;
        let mut out: Vec<StoredIngredient> =
            rows.iter().filter(|r| r.ingredient.name().to_lowercase().starts_with(&needle)).cloned().collect();
        out.sort_by(|a, b| a.ingredient.name().cmp(b.ingredient.name()));
        Ok(out)
    }

    fn find_tag_by_slug(&self, slug: &str) -> Result<Option<StoredTag>, DomainError> {
        let rows = self.lock_map(&self.tags, "tags")?;
        Ok(rows.iter().find(|r| r.tag.slug() == slug).cloned())
    }
}

impl Default for InMemoryReferenceRepository {
    fn default() -> Self {
        Self::new()
    }
}

use crate::config;
use crate::schema;
use crate::schema::ingredients::dsl as ing_dsl;
use crate::schema::tags::dsl as tag_dsl;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel::sql_types::Text;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use foodgram_domain::{DomainError, Ingredient, LoadReport, ReferenceRepository, StoredIngredient, StoredTag, Tag};
use std::sync::Arc;
#[cfg(all(feature = "pg", not(test)))]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/postgres");
#[cfg(any(test, not(feature = "pg")))]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/sqlite");
#[cfg(all(feature = "pg", not(test)))]
type DbConn = PgConnection;
#[cfg(any(test, not(feature = "pg")))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;
diesel::define_sql_function!(fn lower(x: Text) -> Text);
/// Repo Diesel que implementa `ReferenceRepository`.
pub struct DieselReferenceRepository {
  pool: Arc<DbPool>,
}
impl DieselReferenceRepository {
  /// Abre el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, DomainError> {
    let repo = Self::connect(database_url)?;
    repo.run_migrations()?;
    Ok(repo)
  }
  /// Abre el pool sin tocar el esquema.
  pub fn connect(database_url: &str) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<DbConn>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .build(manager)
                              .map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))?;
    let repo = DieselReferenceRepository { pool: Arc::new(pool) };
    #[cfg(any(test, not(feature = "pg")))]
    {
      let mut c = repo.conn()?;
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
    }
    Ok(repo)
  }
  /// Aplica las migraciones embebidas pendientes y devuelve sus versiones.
  pub fn run_migrations(&self) -> Result<Vec<String>, DomainError> {
    let mut conn = self.conn()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)
                      .map_err(|e| DomainError::ExternalError(format!("migraciones: {}", e)))?;
    let versions: Vec<String> = applied.iter().map(|v| v.to_string()).collect();
    if versions.is_empty() {
      log::info!("esquema al día, sin migraciones pendientes");
    } else {
      log::info!("migraciones aplicadas: {}", versions.join(", "));
    }
    Ok(versions)
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.pool.get().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))
  }
}
#[derive(Debug, Queryable)]
struct IngredientRow {
  pub id: i32,
  pub name: String,
  pub measurement_unit: String,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::ingredients)]
struct NewIngredientRow<'a> {
  pub name: &'a str,
  pub measurement_unit: &'a str,
}
#[derive(Debug, Queryable)]
struct TagRow {
  pub id: i32,
  pub name: String,
  pub slug: String,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::tags)]
struct NewTagRow<'a> {
  pub name: &'a str,
  pub slug: &'a str,
}
impl TryFrom<IngredientRow> for StoredIngredient {
  type Error = DomainError;
  fn try_from(r: IngredientRow) -> Result<Self, DomainError> {
    Ok(StoredIngredient { id: r.id, ingredient: Ingredient::new(&r.name, &r.measurement_unit)? })
  }
}
impl TryFrom<TagRow> for StoredTag {
  type Error = DomainError;
  fn try_from(r: TagRow) -> Result<Self, DomainError> {
    Ok(StoredTag { id: r.id, tag: Tag::new(&r.name, &r.slug)? })
  }
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(|e| DomainError::ExternalError(format!("db: {}", e)))
}
// `%` y `_` son comodines en LIKE; se escapan con `\`.
fn like_prefix(prefix: &str) -> String {
  let mut out = String::with_capacity(prefix.len() + 1);
  for ch in prefix.trim().to_lowercase().chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}
impl ReferenceRepository for DieselReferenceRepository {
  fn insert_ingredients(&self, items: &[Ingredient]) -> Result<LoadReport, DomainError> {
    let mut conn = self.conn()?;
    let rows: Vec<NewIngredientRow> =
      items.iter().map(|i| NewIngredientRow { name: i.name(), measurement_unit: i.measurement_unit() }).collect();
    // Sin destino de conflicto: un nombre repetido (UNIQUE(name)) afecta 0 filas.
    let inserted = map_db_err(conn.transaction::<usize, DieselError, _>(|conn| {
                                    let mut n = 0;
                                    for row in &rows {
                                      n += diesel::insert_into(ing_dsl::ingredients).values(row)
                                                                                    .on_conflict_do_nothing()
                                                                                    .execute(conn)?;
                                    }
                                    Ok(n)
                                  }))?;
    let report = LoadReport { inserted, skipped: items.len() - inserted };
    log::info!("ingredients: {} insertados, {} omitidos", report.inserted, report.skipped);
    Ok(report)
  }
  fn insert_tags(&self, items: &[Tag]) -> Result<LoadReport, DomainError> {
    let mut conn = self.conn()?;
    let rows: Vec<NewTagRow> = items.iter().map(|t| NewTagRow { name: t.name(), slug: t.slug() }).collect();
    // Sin destino de conflicto: vale tanto para UNIQUE(name) como UNIQUE(slug).
    let inserted = map_db_err(conn.transaction::<usize, DieselError, _>(|conn| {
                                    let mut n = 0;
                                    for row in &rows {
                                      n += diesel::insert_into(tag_dsl::tags).values(row)
                                                                             .on_conflict_do_nothing()
                                                                             .execute(conn)?;
                                    }
                                    Ok(n)
                                  }))?;
    let report = LoadReport { inserted, skipped: items.len() - inserted };
    log::info!("tags: {} insertados, {} omitidos", report.inserted, report.skipped);
    Ok(report)
  }
  fn list_ingredients(&self) -> Result<Vec<StoredIngredient>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(ing_dsl::ingredients.order(ing_dsl::id.asc()).load::<IngredientRow>(&mut conn))?;
    rows.into_iter().map(StoredIngredient::try_from).collect()
  }
  fn list_tags(&self) -> Result<Vec<StoredTag>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(tag_dsl::tags.order(tag_dsl::id.asc()).load::<TagRow>(&mut conn))?;
    rows.into_iter().map(StoredTag::try_from).collect()
  }
  fn count_ingredients(&self) -> Result<i64, DomainError> {
    let mut conn = self.conn()?;
    map_db_err(ing_dsl::ingredients.count().get_result::<i64>(&mut conn))
  }
  fn count_tags(&self) -> Result<i64, DomainError> {
    let mut conn = self.conn()?;
    map_db_err(tag_dsl::tags.count().get_result::<i64>(&mut conn))
  }
  fn search_ingredients(&self, prefix: &str) -> Result<Vec<StoredIngredient>, DomainError> {
    let mut conn = self.conn()?;
    // En SQLite lower() sólo pliega ASCII.
    let rows = map_db_err(ing_dsl::ingredients.filter(lower(ing_dsl::name).like(like_prefix(prefix)).escape('\\'))
                                              .order(ing_dsl::name.asc())
                                              .load::<IngredientRow>(&mut conn))?;
    rows.into_iter().map(StoredIngredient::try_from).collect()
  }
  fn find_tag_by_slug(&self, slug: &str) -> Result<Option<StoredTag>, DomainError> {
    let mut conn = self.conn()?;
    let opt = map_db_err(tag_dsl::tags.filter(tag_dsl::slug.eq(slug)).first::<TagRow>(&mut conn).optional())?;
    opt.map(StoredTag::try_from).transpose()
  }
}
/// Crea el repositorio (y aplica migraciones) con la URL resuelta del entorno.
pub fn new_from_env() -> Result<DieselReferenceRepository, DomainError> {
  let url = config::database_url_from_env()?;
  DieselReferenceRepository::new(&url)
}
// Test helper: repositorio SQLite explícito, sin pasar por el entorno.
#[cfg(not(feature = "pg"))]
pub fn new_sqlite_for_test(database_url: &str) -> Result<DieselReferenceRepository, DomainError> {
  DieselReferenceRepository::new(database_url)
}

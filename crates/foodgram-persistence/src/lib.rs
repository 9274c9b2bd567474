//! Persistencia de los datos de referencia de foodgram.
//! Expone el esquema Diesel, las migraciones embebidas y el repositorio
//! `DieselReferenceRepository` que implementa `ReferenceRepository`, junto con
//! la verificación estática de `init.sql` y la sonda de disponibilidad de la
//! base de datos.

pub mod config;
pub mod init_script;
mod probe;
mod reference_persistence;
pub mod schema;

pub use init_script::{check_init_script, InitScript, ScriptIssue};
pub use probe::DatabaseProbe;
#[cfg(not(feature = "pg"))]
pub use reference_persistence::new_sqlite_for_test;
pub use reference_persistence::{new_from_env, DieselReferenceRepository, MIGRATIONS};

mod errors;
mod ingredient;
mod reference_repository;
pub mod sources;
mod tag;

pub use errors::DomainError;
pub use ingredient::{Ingredient, MAX_INGREDIENT_NAME_LENGTH, MAX_UNIT_LENGTH};
pub use reference_repository::{InMemoryReferenceRepository, LoadReport, ReferenceRepository, StoredIngredient, StoredTag};
pub use tag::{Tag, MAX_TAG_LENGTH, MAX_TAG_SLUG_LENGTH};

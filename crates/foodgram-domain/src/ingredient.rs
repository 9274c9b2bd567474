// ingredient.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_INGREDIENT_NAME_LENGTH: usize = 128;
pub const MAX_UNIT_LENGTH: usize = 40;

/// Ingrediente de referencia: nombre + unidad de medida.
///
/// El nombre es único en el esquema (y también el par `(name,
/// measurement_unit)`); el cargador depende de ello para ser idempotente.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIngredient")]
pub struct Ingredient {
  name: String,
  measurement_unit: String,
}

// Forma serializada; se valida con `Ingredient::new` al deserializar.
#[derive(Deserialize)]
struct RawIngredient {
  name: String,
  measurement_unit: String,
}

impl TryFrom<RawIngredient> for Ingredient {
  type Error = DomainError;

  fn try_from(raw: RawIngredient) -> Result<Self, DomainError> {
    Ingredient::new(&raw.name, &raw.measurement_unit)
  }
}

impl Ingredient {
  pub fn new(name: &str, measurement_unit: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    let unit = measurement_unit.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre del ingrediente no puede estar vacío".to_string()));
    }
    if name.chars().count() > MAX_INGREDIENT_NAME_LENGTH {
      return Err(DomainError::ValidationError(format!("El nombre del ingrediente excede {} caracteres: {}",
                                                      MAX_INGREDIENT_NAME_LENGTH, name)));
    }
    if unit.is_empty() {
      return Err(DomainError::ValidationError(format!("La unidad de medida de '{}' no puede estar vacía", name)));
    }
    if unit.chars().count() > MAX_UNIT_LENGTH {
      return Err(DomainError::ValidationError(format!("La unidad de medida excede {} caracteres: {}",
                                                      MAX_UNIT_LENGTH, unit)));
    }
    Ok(Self { name: name.to_string(), measurement_unit: unit.to_string() })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn measurement_unit(&self) -> &str {
    &self.measurement_unit
  }

  pub fn natural_key(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Ingredient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.measurement_unit)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_name_and_unit() {
    let i = Ingredient::new("  абрикосовое варенье ", " г ").unwrap();
    assert_eq!(i.name(), "абрикосовое варенье");
    assert_eq!(i.measurement_unit(), "г");
  }

  #[test]
  fn deserialization_validates() {
    let i: Ingredient = serde_json::from_str(r#"{"name": " соль ", "measurement_unit": "г"}"#).unwrap();
    assert_eq!(i.name(), "соль");
    assert!(serde_json::from_str::<Ingredient>(r#"{"name": "", "measurement_unit": "г"}"#).is_err());
  }

  #[test]
  fn rejects_blank_fields() {
    assert!(matches!(Ingredient::new("   ", "g"), Err(DomainError::ValidationError(_))));
    assert!(matches!(Ingredient::new("salt", ""), Err(DomainError::ValidationError(_))));
  }

  #[test]
  fn length_bound_counts_characters_not_bytes() {
    // 128 caracteres cirílicos ocupan 256 bytes y siguen siendo válidos
    let name: String = std::iter::repeat('я').take(MAX_INGREDIENT_NAME_LENGTH).collect();
    assert!(Ingredient::new(&name, "г").is_ok());
    let too_long: String = std::iter::repeat('a').take(MAX_INGREDIENT_NAME_LENGTH + 1).collect();
    assert!(Ingredient::new(&too_long, "g").is_err());
    let unit: String = std::iter::repeat('u').take(MAX_UNIT_LENGTH + 1).collect();
    assert!(Ingredient::new("salt", &unit).is_err());
  }
}

// tag.rs
use crate::DomainError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_TAG_LENGTH: usize = 32;
pub const MAX_TAG_SLUG_LENGTH: usize = 200;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTag")]
pub struct Tag {
  name: String,
  slug: String,
}

#[derive(Deserialize)]
struct RawTag {
  name: String,
  slug: String,
}

impl TryFrom<RawTag> for Tag {
  type Error = DomainError;

  fn try_from(raw: RawTag) -> Result<Self, DomainError> {
    Tag::new(&raw.name, &raw.slug)
  }
}

impl Tag {
  pub fn new(name: &str, slug: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    let slug = slug.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre del tag no puede estar vacío".to_string()));
    }
    if name.chars().count() > MAX_TAG_LENGTH {
      return Err(DomainError::ValidationError(format!("El nombre del tag excede {} caracteres: {}", MAX_TAG_LENGTH, name)));
    }
    if slug.len() > MAX_TAG_SLUG_LENGTH {
      return Err(DomainError::ValidationError(format!("El slug excede {} caracteres: {}", MAX_TAG_SLUG_LENGTH, slug)));
    }
    if !SLUG_RE.is_match(slug) {
      return Err(DomainError::ValidationError(format!("Slug inválido '{}' para el tag '{}'", slug, name)));
    }
    Ok(Self { name: name.to_string(), slug: slug.to_string() })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn slug(&self) -> &str {
    &self.slug
  }

  /// El nombre identifica al tag; el slug también es único pero se trata
  /// como atributo.
  pub fn natural_key(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Tag({}, slug: {})", self.name, self.slug)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_tag() {
    let t = Tag::new("Завтрак", "breakfast").unwrap();
    assert_eq!(t.name(), "Завтрак");
    assert_eq!(t.slug(), "breakfast");
  }

  #[test]
  fn slug_must_be_ascii_slug() {
    assert!(Tag::new("Ужин", "ужин").is_err());
    assert!(Tag::new("Dinner", "din ner").is_err());
    assert!(Tag::new("Dinner", "").is_err());
    assert!(Tag::new("Late dinner", "late-dinner_2").is_ok());
  }

  #[test]
  fn deserialization_rejects_bad_slug() {
    assert!(serde_json::from_str::<Tag>(r#"{"name": "Ужин", "slug": "ужин"}"#).is_err());
    let t: Tag = serde_json::from_str(r#"{"name": "Ужин", "slug": "dinner"}"#).unwrap();
    assert_eq!(t.slug(), "dinner");
  }

  #[test]
  fn name_is_bounded() {
    let name: String = std::iter::repeat('x').take(MAX_TAG_LENGTH + 1).collect();
    assert!(matches!(Tag::new(&name, "x"), Err(DomainError::ValidationError(_))));
  }
}

use foodgram_domain::sources::{dedupe_ingredients, dedupe_tags, fingerprint, read_ingredients, read_tags, ReferenceData};
use foodgram_domain::{DomainError, InMemoryReferenceRepository, ReferenceRepository};
use std::fs;

#[test]
fn csv_without_header_is_read_as_data() -> Result<(), DomainError> {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("ingredients.csv");
  fs::write(&path, "абрикосовое варенье,г\n\"соль, морская\",г\n")?;
  let items = read_ingredients(&path)?;
  assert_eq!(items.len(), 2);
  assert_eq!(items[1].name(), "соль, морская");
  Ok(())
}

#[test]
fn csv_header_is_skipped() -> Result<(), DomainError> {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("tags.csv");
  fs::write(&path, "name,slug\nЗавтрак,breakfast\nОбед,lunch\n")?;
  let tags = read_tags(&path)?;
  assert_eq!(tags.len(), 2);
  assert_eq!(tags[0].slug(), "breakfast");
  Ok(())
}

#[test]
fn invalid_record_names_file_and_position() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("tags.json");
  fs::write(&path, r#"[{"name": "Ok", "slug": "ok"}, {"name": "Bad", "slug": "not a slug"}]"#).unwrap();
  match read_tags(&path) {
    Err(DomainError::ValidationError(msg)) => {
      assert!(msg.contains("registro 2"), "unexpected message: {}", msg);
      assert!(msg.contains("tags.json"), "unexpected message: {}", msg);
    }
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[test]
fn wrong_column_count_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("ingredients.csv");
  fs::write(&path, "salt,g\npepper\n").unwrap();
  match read_ingredients(&path) {
    Err(DomainError::ValidationError(msg)) => assert!(msg.contains("registro 2"), "{}", msg),
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[test]
fn unknown_extension_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("ingredients.xml");
  fs::write(&path, "<x/>").unwrap();
  assert!(matches!(read_ingredients(&path), Err(DomainError::ValidationError(_))));
}

#[test]
fn discover_prefers_json_and_tolerates_missing_files() -> Result<(), DomainError> {
  let dir = tempfile::tempdir()?;
  fs::write(dir.path().join("ingredients.csv"), "salt,g\n")?;
  fs::write(dir.path().join("ingredients.json"), r#"[{"name": "salt", "measurement_unit": "g"}]"#)?;
  let found = ReferenceData::discover(dir.path())?;
  assert_eq!(found.ingredients, Some(dir.path().join("ingredients.json")));
  assert_eq!(found.tags, None);
  assert!(!found.is_empty());
  assert!(ReferenceData::discover(&dir.path().join("missing")).is_err());
  Ok(())
}

#[test]
fn dedupe_then_load_twice_is_stable() -> Result<(), DomainError> {
  let dir = tempfile::tempdir()?;
  let ing = dir.path().join("ingredients.json");
  fs::write(&ing,
            r#"[{"name": "milk", "measurement_unit": "ml"},
                {"name": "milk", "measurement_unit": "ml"},
                {"name": "milk", "measurement_unit": "cup"}]"#)?;
  let tags = dir.path().join("tags.json");
  fs::write(&tags,
            r#"[{"name": "Breakfast", "slug": "breakfast"},
                {"name": "Morning", "slug": "breakfast"}]"#)?;

  let ingredients = dedupe_ingredients(read_ingredients(&ing)?);
  assert_eq!(ingredients.len(), 1);
  assert_eq!(ingredients[0].measurement_unit(), "ml");
  let tag_list = dedupe_tags(read_tags(&tags)?);
  assert_eq!(tag_list.len(), 1);

  let repo = InMemoryReferenceRepository::new();
  repo.insert_ingredients(&ingredients)?;
  let again = repo.insert_ingredients(&ingredients)?;
  assert_eq!(again.inserted, 0);
  assert_eq!(repo.count_ingredients()?, 1);

  let first = fingerprint(&ing)?;
  assert_eq!(first.len(), 64);
  assert_eq!(first, fingerprint(&ing)?);
  Ok(())
}

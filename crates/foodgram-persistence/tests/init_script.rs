use foodgram_persistence::{check_init_script, InitScript, ScriptIssue};
use std::path::PathBuf;

fn repo_file(rel: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").join(rel)
}

#[test]
fn shipped_init_sql_is_consistent() {
  let issues = check_init_script(&repo_file("infra/init.sql")).expect("read init.sql");
  assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn shipped_init_sql_declares_slug_for_tags() {
  let sql = std::fs::read_to_string(repo_file("infra/init.sql")).unwrap();
  let script = InitScript::parse(&sql).unwrap();
  let tables = script.declared_tables();
  assert!(tables["tags"].contains(&"slug".to_string()));
  assert!(tables["ingredients"].contains(&"measurement_unit".to_string()));
}

#[test]
fn historical_tags_table_is_rejected() {
  let sql = "CREATE TABLE tags (id SERIAL PRIMARY KEY, name VARCHAR(200) UNIQUE);\n\
             COPY tags(name, slug) FROM '/data/tags.csv' DELIMITER ',' CSV HEADER;";
  let issues = InitScript::parse(sql).unwrap().check();
  assert_eq!(issues.len(), 1);
  match &issues[0] {
    ScriptIssue::UnknownColumn { line, table, column, .. } => {
      assert_eq!((*line, table.as_str(), column.as_str()), (2, "tags", "slug"));
    }
    other => panic!("expected unknown column, got {:?}", other),
  }
  assert!(issues[0].to_string().contains("slug"));
}

#[test]
fn missing_file_is_an_error() {
  assert!(check_init_script(&repo_file("infra/does-not-exist.sql")).is_err());
}

fn postgres_migrations() -> Vec<PathBuf> {
  let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations/postgres");
  let mut ups: Vec<PathBuf> = std::fs::read_dir(&dir).expect("read migrations dir")
                                                     .filter_map(|e| e.ok())
                                                     .map(|e| e.path().join("up.sql"))
                                                     .filter(|p| p.is_file())
                                                     .collect();
  ups.sort();
  ups
}

#[test]
fn init_sql_matches_postgres_migrations() {
  let init = InitScript::parse(&std::fs::read_to_string(repo_file("infra/init.sql")).unwrap()).unwrap();
  let ups = postgres_migrations();
  assert!(!ups.is_empty());
  let sql: String = ups.iter().map(|p| std::fs::read_to_string(p).unwrap() + "\n").collect();
  let migrations = InitScript::parse(&sql).unwrap();

  assert_eq!(init.declared_tables(), migrations.declared_tables());
  assert_eq!(init.declared_constraints(), migrations.declared_constraints());
  let ingredients = &init.declared_constraints()["ingredients"];
  assert!(ingredients.contains("unique (name)"));
  assert!(ingredients.contains("unique (name, measurement_unit)"));
  assert!(init.declared_constraints()["tags"].contains("unique (slug)"));
}

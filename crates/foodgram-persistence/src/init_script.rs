//! Verificación estática del script SQL de arranque de Postgres.
//!
//! Postgres ejecuta `init.sql` una única vez al crear el volumen; un `COPY`
//! que nombra una columna inexistente sólo falla en ese momento y deja la
//! base sin datos de referencia. Aquí se comprueba, sin base de datos, que
//! cada `COPY`/`INSERT` use tablas y columnas declaradas antes por un
//! `CREATE TABLE` del mismo script.
use foodgram_domain::DomainError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

static CREATE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?is)^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(IF\s+NOT\s+EXISTS\s+)?([\w."]+)\s*\((.*)\)"#).unwrap()
});
static COPY_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"(?is)^\s*COPY\s+([\w."]+)\s*(?:\(([^)]*)\))?\s*(?:FROM|TO)\b"#).unwrap());
static INSERT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"(?is)^\s*INSERT\s+INTO\s+([\w."]+)\s*(?:\(([^)]*)\))?"#).unwrap());

const TABLE_CONSTRAINT_WORDS: [&str; 7] = ["constraint", "primary", "unique", "check", "foreign", "exclude", "like"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatement {
  Copy,
  Insert,
}

impl fmt::Display for DataStatement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataStatement::Copy => write!(f, "COPY"),
      DataStatement::Insert => write!(f, "INSERT"),
    }
  }
}

/// Sentencia reconocida. `line` es la línea (base 1) donde empieza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  CreateTable { line: usize, table: String, if_not_exists: bool, columns: Vec<String>, constraints: Vec<String> },
  Data { line: usize, kind: DataStatement, table: String, columns: Vec<String> },
  Other { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptIssue {
  #[error("línea {line}: {kind} sobre la tabla '{table}', que no se crea antes en el script")]
  UnknownTable { line: usize, kind: DataStatement, table: String },
  #[error("línea {line}: {kind} {table}: la columna '{column}' no está declarada en CREATE TABLE {table}")]
  UnknownColumn { line: usize, kind: DataStatement, table: String, column: String },
  #[error("línea {line}: la tabla '{table}' se crea dos veces sin IF NOT EXISTS")]
  DuplicateTable { line: usize, table: String },
}

#[derive(Debug, Clone, Default)]
pub struct InitScript {
  statements: Vec<Statement>,
}

impl InitScript {
  pub fn parse(sql: &str) -> Result<Self, DomainError> {
    let statements = split_statements(sql)?.into_iter().map(|(line, text)| classify(line, &text)).collect();
    Ok(Self { statements })
  }

  pub fn statements(&self) -> &[Statement] {
    &self.statements
  }

  /// Tablas declaradas y sus columnas, en minúsculas.
  pub fn declared_tables(&self) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for st in &self.statements {
      if let Statement::CreateTable { table, columns, .. } = st {
        out.entry(table.clone()).or_insert_with(|| columns.clone());
      }
    }
    out
  }

  /// Restricciones de cada tabla en forma normalizada: `primary key (id)`,
  /// `unique (name, measurement_unit)`, `not null (slug)`... Se ignora el
  /// nombre de la restricción, así que dos scripts con las mismas claves y
  /// nombres distintos dan el mismo resultado.
  pub fn declared_constraints(&self) -> BTreeMap<String, BTreeSet<String>> {
    let mut out = BTreeMap::new();
    for st in &self.statements {
      if let Statement::CreateTable { table, constraints, .. } = st {
        out.entry(table.clone()).or_insert_with(|| constraints.iter().cloned().collect());
      }
    }
    out
  }

  /// Problemas en orden de aparición. Vacío = script coherente.
  pub fn check(&self) -> Vec<ScriptIssue> {
    let mut declared: BTreeMap<&str, &[String]> = BTreeMap::new();
    let mut issues = Vec::new();
    for st in &self.statements {
      match st {
        Statement::CreateTable { line, table, if_not_exists, columns, .. } => {
          if declared.contains_key(table.as_str()) {
            if !if_not_exists {
              issues.push(ScriptIssue::DuplicateTable { line: *line, table: table.clone() });
            }
            continue;
          }
          declared.insert(table, columns);
        }
        Statement::Data { line, kind, table, columns } => match declared.get(table.as_str()) {
          None => issues.push(ScriptIssue::UnknownTable { line: *line, kind: *kind, table: table.clone() }),
          Some(known) => {
            for c in columns.iter().filter(|c| !known.contains(c)) {
              issues.push(ScriptIssue::UnknownColumn { line: *line,
                                                       kind: *kind,
                                                       table: table.clone(),
                                                       column: c.clone() });
            }
          }
        },
        Statement::Other { .. } => {}
      }
    }
    issues
  }
}

/// Lee y verifica un script; lista vacía si es coherente.
pub fn check_init_script(path: &Path) -> Result<Vec<ScriptIssue>, DomainError> {
  let sql = std::fs::read_to_string(path)?;
  let issues = InitScript::parse(&sql)?.check();
  for issue in &issues {
    log::warn!("{}: {}", path.display(), issue);
  }
  Ok(issues)
}

fn classify(line: usize, text: &str) -> Statement {
  if let Some(c) = CREATE_RE.captures(text) {
    return Statement::CreateTable { line,
                                    table: normalize_ident(&c[2]),
                                    if_not_exists: c.get(1).is_some(),
                                    columns: column_definitions(&c[3]),
                                    constraints: constraint_definitions(&c[3]) };
  }
  if let Some(c) = COPY_RE.captures(text) {
    return Statement::Data { line,
                             kind: DataStatement::Copy,
                             table: normalize_ident(&c[1]),
                             columns: c.get(2).map(|m| column_list(m.as_str())).unwrap_or_default() };
  }
  if let Some(c) = INSERT_RE.captures(text) {
    return Statement::Data { line,
                             kind: DataStatement::Insert,
                             table: normalize_ident(&c[1]),
                             columns: c.get(2).map(|m| column_list(m.as_str())).unwrap_or_default() };
  }
  Statement::Other { line }
}

// Identificadores sin comillas se pliegan a minúsculas; se ignora el esquema.
fn normalize_ident(raw: &str) -> String {
  let last = raw.rsplit('.').next().unwrap_or(raw).trim();
  if last.len() >= 2 && last.starts_with('"') && last.ends_with('"') {
    last[1..last.len() - 1].to_string()
  } else {
    last.to_lowercase()
  }
}

fn column_list(raw: &str) -> Vec<String> {
  raw.split(',').map(normalize_ident).filter(|c| !c.is_empty()).collect()
}

fn column_definitions(body: &str) -> Vec<String> {
  split_top_level(body).into_iter()
                       .filter_map(|item| {
                         let first = item.split_whitespace().next()?;
                         let lower = first.to_lowercase();
                         let keyword = lower.split('(').next().unwrap_or(lower.as_str());
                         if TABLE_CONSTRAINT_WORDS.contains(&keyword) {
                           None
                         } else {
                           Some(normalize_ident(first))
                         }
                       })
                       .collect()
}

fn constraint_definitions(body: &str) -> Vec<String> {
  let mut out = Vec::new();
  for item in split_top_level(body) {
    let lower = item.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let keyword = words.first().copied().map(|w| w.split('(').next().unwrap_or(w)).unwrap_or("");
    if TABLE_CONSTRAINT_WORDS.contains(&keyword) {
      // `CONSTRAINT nombre` no forma parte de la comparación.
      let rest = if keyword == "constraint" { words.get(2..).unwrap_or(&[]).join(" ") } else { words.join(" ") };
      out.push(table_constraint(&rest));
      continue;
    }
    let Some(first) = item.split_whitespace().next() else { continue };
    let column = normalize_ident(first);
    let has_pair = |a: &str, b: &str| words.windows(2).any(|w| w[0] == a && w[1] == b);
    if has_pair("primary", "key") {
      out.push(format!("primary key ({})", column));
    }
    if words[1..].contains(&"unique") {
      out.push(format!("unique ({})", column));
    }
    if has_pair("not", "null") {
      out.push(format!("not null ({})", column));
    }
  }
  out
}

// `unique (a, b)` / `primary key (a)`; otras restricciones se comparan como
// texto con espacios normalizados.
fn table_constraint(rest: &str) -> String {
  let kind = if rest.starts_with("primary") {
    "primary key"
  } else if rest.starts_with("unique") {
    "unique"
  } else {
    return rest.to_string();
  };
  match (rest.find('('), rest.rfind(')')) {
    (Some(open), Some(close)) if close > open => format!("{} ({})", kind, column_list(&rest[open + 1..close]).join(", ")),
    _ => rest.to_string(),
  }
}

fn split_top_level(body: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut depth = 0i32;
  let mut current = String::new();
  for ch in body.chars() {
    match ch {
      '(' => depth += 1,
      ')' => depth -= 1,
      ',' if depth == 0 => {
        out.push(std::mem::take(&mut current));
        continue;
      }
      _ => {}
    }
    current.push(ch);
  }
  out.push(current);
  out.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

// Separa en `;` fuera de comillas y comentarios. Devuelve (línea, texto sin
// comentarios).
fn split_statements(sql: &str) -> Result<Vec<(usize, String)>, DomainError> {
  let mut out = Vec::new();
  let mut current = String::new();
  let mut start_line = None;
  let mut line = 1usize;
  let mut chars = sql.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '-' if chars.peek() == Some(&'-') => {
        for c in chars.by_ref() {
          if c == '\n' {
            line += 1;
            current.push('\n');
            break;
          }
        }
        continue;
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let mut closed = false;
        let mut prev = '\0';
        for c in chars.by_ref() {
          if c == '\n' {
            line += 1;
            current.push('\n');
          }
          if prev == '*' && c == '/' {
            closed = true;
            break;
          }
          prev = c;
        }
        if !closed {
          return Err(DomainError::ValidationError(format!("comentario sin cerrar (línea {})", line)));
        }
        current.push(' ');
        continue;
      }
      '\'' | '"' => {
        if start_line.is_none() {
          start_line = Some(line);
        }
        current.push(ch);
        let opened_at = line;
        let mut closed = false;
        for c in chars.by_ref() {
          if c == '\n' {
            line += 1;
          }
          current.push(c);
          if c == ch {
            closed = true;
            break;
          }
        }
        if !closed {
          return Err(DomainError::ValidationError(format!("comillas sin cerrar (línea {})", opened_at)));
        }
        continue;
      }
      ';' => {
        if let Some(l) = start_line.take() {
          out.push((l, std::mem::take(&mut current).trim().to_string()));
        }
        current.clear();
        continue;
      }
      '\n' => line += 1,
      c if !c.is_whitespace() && start_line.is_none() => start_line = Some(line),
      _ => {}
    }
    current.push(ch);
  }
  if let Some(l) = start_line {
    out.push((l, current.trim().to_string()));
  }
  Ok(out)
}

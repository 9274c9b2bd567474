// Archivo: compose.rs
// Propósito: modelo deserializable de los ficheros docker-compose del stack
// (variantes de producción y desarrollo).
//
// Sólo se modelan los campos que participan en el arranque: imagen/build,
// comando, dependencias, volúmenes, puertos y `env_file`. El resto de claves
// se ignora.
use crate::errors::{Result, StackError};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Fichero compose completo. Los servicios conservan el orden del YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub version: Option<serde_yaml::Value>,
    #[serde(default)]
    pub services: IndexMap<String, ServiceSpec>,
    /// Volúmenes con nombre declarados a nivel raíz.
    #[serde(default)]
    pub volumes: IndexMap<String, serde_yaml::Value>,
}

impl ComposeFile {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: ComposeFile = serde_yaml::from_str(text)?;
        if file.services.is_empty() {
            return Err(StackError::Parse("el fichero compose no declara servicios".into()));
        }
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text).map_err(|e| match e {
                                  StackError::Parse(msg) => StackError::Parse(format!("{}: {}", path.display(), msg)),
                                  other => other,
                              })
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    pub fn named_volumes(&self) -> Vec<&str> {
        self.volumes.keys().map(|k| k.as_str()).collect()
    }

    /// Puertos publicados en el host, por servicio y en orden del YAML.
    pub fn published_ports(&self) -> Result<Vec<(String, PortMapping)>> {
        let mut out = Vec::new();
        for (name, spec) in &self.services {
            for mapping in spec.port_mappings()? {
                if mapping.host.is_some() {
                    out.push((name.clone(), mapping));
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    #[serde(default)]
    pub command: Option<CommandSpec>,
    #[serde(default)]
    pub depends_on: Option<DependsOn>,
    #[serde(default)]
    pub env_file: Option<StringOrList>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub restart: Option<String>,
}

impl ServiceSpec {
    /// Nombres de los servicios de los que depende, en el orden declarado.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.depends_on {
            None => Vec::new(),
            Some(DependsOn::List(list)) => list.iter().map(|s| s.as_str()).collect(),
            Some(DependsOn::Map(map)) => map.keys().map(|s| s.as_str()).collect(),
        }
    }

    /// Condición declarada para una dependencia (forma larga de
    /// `depends_on`). La forma corta equivale a `service_started`.
    pub fn dependency_condition(&self, dependency: &str) -> Option<&str> {
        match &self.depends_on {
            Some(DependsOn::Map(map)) => {
                map.get(dependency).map(|c| c.condition.as_deref().unwrap_or("service_started"))
            }
            Some(DependsOn::List(list)) if list.iter().any(|d| d == dependency) => Some("service_started"),
            _ => None,
        }
    }

    /// Comando como una sola línea de shell.
    pub fn command_line(&self) -> Option<String> {
        match &self.command {
            None => None,
            Some(CommandSpec::Shell(s)) => Some(s.clone()),
            Some(CommandSpec::Exec(args)) => Some(args.join(" ")),
        }
    }

    pub fn env_files(&self) -> Vec<&str> {
        match &self.env_file {
            None => Vec::new(),
            Some(StringOrList::One(s)) => vec![s.as_str()],
            Some(StringOrList::Many(v)) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Etapa `target` de la forma larga de `build`.
    pub fn build_target(&self) -> Option<&str> {
        match &self.build {
            Some(BuildSpec::Detailed { target, .. }) => target.as_deref(),
            _ => None,
        }
    }

    pub fn port_mappings(&self) -> Result<Vec<PortMapping>> {
        self.ports.iter().map(|p| PortMapping::parse(p)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Context(String),
    Detailed {
        context: String,
        #[serde(default)]
        dockerfile: Option<String>,
        /// Etapa del Dockerfile multi-etapa a construir.
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        args: Option<serde_yaml::Value>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Exec(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    List(Vec<String>),
    Map(IndexMap<String, DependencyCondition>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependencyCondition {
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Publicación de puerto `HOST:CONTAINER` (opcionalmente `IP:HOST:CONTAINER`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host: Option<u16>,
    pub container: u16,
}

impl PortMapping {
    pub fn parse(spec: &str) -> Result<Self> {
        let bad = || StackError::Parse(format!("puerto inválido: '{}'", spec));
        let body = spec.split('/').next().unwrap_or(spec);
        let parts: Vec<&str> = body.split(':').collect();
        let port = |s: &str| s.trim().parse::<u16>().map_err(|_| bad());
        match parts.as_slice() {
            [container] => Ok(Self { host_ip: None, host: None, container: port(*container)? }),
            [host, container] => Ok(Self { host_ip: None, host: Some(port(*host)?), container: port(*container)? }),
            [ip, host, container] => Ok(Self { host_ip: Some(ip.to_string()),
                                               host: Some(port(*host)?),
                                               container: port(*container)? }),
            _ => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_depends_on_forms() {
        let yaml = r#"
services:
  db:
    image: postgres:13
  loader:
    build: ./backend
    depends_on: [db]
  backend:
    build:
      context: ./backend
      dockerfile: Dockerfile
    depends_on:
      db:
        condition: service_healthy
      loader:
        condition: service_completed_successfully
"#;
        let file = ComposeFile::from_yaml(yaml).unwrap();
        assert_eq!(file.services.keys().collect::<Vec<_>>(), vec!["db", "loader", "backend"]);
        assert_eq!(file.service("loader").unwrap().dependencies(), vec!["db"]);
        let backend = file.service("backend").unwrap();
        assert_eq!(backend.dependencies(), vec!["db", "loader"]);
        assert_eq!(backend.dependency_condition("loader"), Some("service_completed_successfully"));
        assert_eq!(file.service("loader").unwrap().dependency_condition("db"), Some("service_started"));
        assert_eq!(backend.dependency_condition("gateway"), None);
    }

    #[test]
    fn command_accepts_string_or_list() {
        let yaml = r#"
services:
  a:
    image: x
    command: sh -c "echo hi"
  b:
    image: x
    command: ["cp", "-r", "/app/build/.", "/static/"]
"#;
        let file = ComposeFile::from_yaml(yaml).unwrap();
        assert_eq!(file.service("a").unwrap().command_line().unwrap(), "sh -c \"echo hi\"");
        assert_eq!(file.service("b").unwrap().command_line().unwrap(), "cp -r /app/build/. /static/");
    }

    #[test]
    fn port_forms() {
        assert_eq!(PortMapping::parse("8000:80").unwrap(),
                   PortMapping { host_ip: None, host: Some(8000), container: 80 });
        assert_eq!(PortMapping::parse("127.0.0.1:5432:5432/tcp").unwrap().host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(PortMapping::parse("80").unwrap().host, None);
        assert!(PortMapping::parse("http:80").is_err());
        assert!(PortMapping::parse("1:2:3:4").is_err());
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(matches!(ComposeFile::from_yaml("version: '3'\n"), Err(StackError::Parse(_))));
    }
}

// Archivo: topology.rs
// Propósito: grafo de dependencias entre servicios (`depends_on`) y orden de
// arranque determinista.
//
// `depends_on` sólo ordena el arranque; no espera a que la dependencia esté
// lista. La espera real se hace con `readiness::wait_until_ready`.
use crate::compose::ComposeFile;
use crate::errors::{Result, StackError};
use std::collections::{BTreeMap, BTreeSet};

/// Grafo validado: toda dependencia existe y no hay ciclos.
#[derive(Debug, Clone)]
pub struct StackTopology {
    /// servicio -> dependencias directas
    edges: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

impl StackTopology {
    pub fn from_compose(file: &ComposeFile) -> Result<Self> {
        let pairs = file.services
                        .iter()
                        .map(|(name, spec)| (name.clone(), spec.dependencies().into_iter().map(String::from).collect::<Vec<String>>()));
        Self::from_edges(pairs)
    }

    /// Construye el grafo a partir de pares `(servicio, dependencias)`.
    pub fn from_edges<I>(pairs: I) -> Result<Self>
        where I: IntoIterator<Item = (String, Vec<String>)>
    {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (service, deps) in pairs {
            edges.entry(service).or_default().extend(deps);
        }
        for (service, deps) in &edges {
            for dep in deps {
                if dep == service {
                    return Err(StackError::Cycle(vec![service.clone(), service.clone()]));
                }
                if !edges.contains_key(dep) {
                    return Err(StackError::UnknownDependency { service: service.clone(), dependency: dep.clone() });
                }
            }
        }
        let order = kahn_order(&edges)?;
        Ok(Self { edges, order })
    }

    /// Orden de arranque: primero las hojas. Empates en orden alfabético.
    pub fn startup_order(&self) -> &[String] {
        &self.order
    }

    pub fn dependencies_of(&self, service: &str) -> Vec<&str> {
        self.edges.get(service).map(|d| d.iter().map(|s| s.as_str()).collect()).unwrap_or_default()
    }

    /// Servicios que declaran `service` en su `depends_on`.
    pub fn dependents_of(&self, service: &str) -> Vec<&str> {
        self.edges.iter().filter(|(_, deps)| deps.contains(service)).map(|(name, _)| name.as_str()).collect()
    }

    pub fn contains(&self, service: &str) -> bool {
        self.edges.contains_key(service)
    }

    /// Dependencias transitivas de `service` en orden de arranque.
    pub fn closure_of(&self, service: &str) -> Vec<&str> {
        let mut needed = BTreeSet::new();
        let mut stack = vec![service];
        while let Some(s) = stack.pop() {
            for dep in self.dependencies_of(s) {
                if needed.insert(dep) {
                    stack.push(dep);
                }
            }
        }
        self.order.iter().map(|s| s.as_str()).filter(|s| needed.contains(s)).collect()
    }
}

fn kahn_order(edges: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>> {
    let mut pending: BTreeMap<&str, usize> = edges.iter().map(|(s, d)| (s.as_str(), d.len())).collect();
    let mut ready: BTreeSet<&str> = pending.iter().filter(|(_, n)| **n == 0).map(|(s, _)| *s).collect();
    let mut order = Vec::with_capacity(edges.len());
    while let Some(next) = ready.iter().next().copied() {
        ready.remove(next);
        pending.remove(next);
        order.push(next.to_string());
        for (service, deps) in edges {
            if deps.contains(next) {
                if let Some(n) = pending.get_mut(service.as_str()) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(service.as_str());
                    }
                }
            }
        }
    }
    if pending.is_empty() {
        return Ok(order);
    }
    Err(StackError::Cycle(find_cycle(edges, &pending.keys().copied().collect())))
}

// Recorre dependencias dentro del resto no ordenable hasta repetir un nodo.
fn find_cycle(edges: &BTreeMap<String, BTreeSet<String>>, remaining: &BTreeSet<&str>) -> Vec<String> {
    let Some(start) = remaining.iter().next() else {
        return Vec::new();
    };
    let mut path: Vec<&str> = vec![*start];
    loop {
        let Some(current) = path.last().copied() else {
            return Vec::new();
        };
        let next = edges.get(current).and_then(|deps| deps.iter().map(|d| d.as_str()).find(|d| remaining.contains(d)));
        let Some(next) = next else {
            return path.into_iter().map(String::from).collect();
        };
        if let Some(pos) = path.iter().position(|p| *p == next) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(next.to_string());
            return cycle;
        }
        path.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo(pairs: Vec<(&str, Vec<&str>)>) -> Result<StackTopology> {
        StackTopology::from_edges(pairs.into_iter()
                                       .map(|(s, d)| (s.to_string(), d.into_iter().map(String::from).collect::<Vec<String>>())))
    }

    #[test]
    fn leaves_first_with_alphabetical_ties() {
        let t = topo(vec![("gateway", vec!["backend"]),
                          ("backend", vec!["db", "loader"]),
                          ("loader", vec!["db"]),
                          ("frontend", vec![]),
                          ("db", vec![])]).unwrap();
        assert_eq!(t.startup_order(), &["db", "frontend", "loader", "backend", "gateway"]);
        assert_eq!(t.dependents_of("db"), vec!["backend", "loader"]);
        assert_eq!(t.closure_of("gateway"), vec!["db", "loader", "backend"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        assert!(matches!(topo(vec![("a", vec!["a"])]), Err(StackError::Cycle(_))));
    }

    #[test]
    fn reports_cycle_members() {
        match topo(vec![("a", vec!["b"]), ("b", vec!["c"]), ("c", vec!["a"]), ("d", vec![])]) {
            Err(StackError::Cycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
                assert!(!path.contains(&"d".to_string()));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn unknown_dependency() {
        match topo(vec![("backend", vec!["database"])]) {
            Err(StackError::UnknownDependency { service, dependency }) => {
                assert_eq!(service, "backend");
                assert_eq!(dependency, "database");
            }
            other => panic!("expected unknown dependency, got {:?}", other),
        }
    }
}

use stack::{ComposeFile, StackTopology};
use std::path::PathBuf;

fn infra(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../infra").join(name)
}

#[test]
fn production_topology_orders_dependencies_first() {
  let file = ComposeFile::load(&infra("docker-compose.yml")).expect("load compose");
  let topo = StackTopology::from_compose(&file).expect("valid topology");
  let order = topo.startup_order();
  let pos = |s: &str| order.iter().position(|x| x == s).expect("service in order");
  for service in order {
    for dep in topo.dependencies_of(service) {
      assert!(pos(dep) < pos(service), "{} must start before {}", dep, service);
    }
  }
  assert_eq!(order.len(), 5);
  assert_eq!(file.named_volumes(), vec!["pg_data", "static", "media"]);
}

#[test]
fn gateway_is_the_only_published_port() {
  let file = ComposeFile::load(&infra("docker-compose.yml")).unwrap();
  let published: Vec<(String, Option<u16>, u16)> =
    file.published_ports().unwrap().into_iter().map(|(name, p)| (name, p.host, p.container)).collect();
  assert_eq!(published, vec![("gateway".to_string(), Some(8000), 80)]);
}

#[test]
fn dev_variant_mounts_api_docs_and_waits_for_loader() {
  let file = ComposeFile::load(&infra("docker-compose.dev.yml")).unwrap();
  let gateway = file.service("gateway").unwrap();
  assert!(gateway.volumes.iter().any(|v| v.contains("/api/docs")));
  let backend = file.service("backend").unwrap();
  assert_eq!(backend.dependency_condition("loader"), Some("service_completed_successfully"));
  assert_eq!(backend.env_files(), vec!["../.env"]);
  StackTopology::from_compose(&file).expect("dev topology is acyclic");
}

fn quoted_chain(line: &str) -> &str {
  let start = line.find('"').expect("opening quote");
  let end = line.rfind('"').expect("closing quote");
  assert!(end > start, "unbalanced quotes in '{}'", line);
  &line[start + 1..end]
}

#[test]
fn backend_command_is_a_valid_chain() {
  for name in ["docker-compose.yml", "docker-compose.dev.yml"] {
    let file = ComposeFile::load(&infra(name)).unwrap();
    let line = file.service("backend").unwrap().command_line().unwrap();
    assert!(line.starts_with("foodgram-bootstrap run-chain --wait db:5432 "), "{}: {}", name, line);
    let chain = stack::StartupChain::parse_shell(quoted_chain(&line)).unwrap();
    assert_eq!(chain.step_names(),
               vec!["python manage.py collectstatic --noinput",
                    "python manage.py migrate",
                    "cp -r /app/collected_static/. /backend_static/static/",
                    "gunicorn --bind 0.0.0.0:8000 foodgram_project.wsgi"],
               "{}", name);
  }
}

#[test]
fn backend_image_ships_the_bootstrap_binary() {
  for name in ["docker-compose.yml", "docker-compose.dev.yml"] {
    let file = ComposeFile::load(&infra(name)).unwrap();
    assert_eq!(file.service("backend").unwrap().build_target(), Some("backend"), "{}", name);
    assert_eq!(file.service("loader").unwrap().build_target(), Some("bootstrap"), "{}", name);
  }
  let dockerfile = std::fs::read_to_string(infra("../Dockerfile")).expect("read Dockerfile");
  let stage = dockerfile.split("FROM ")
                        .find(|s| s.lines().next().is_some_and(|l| l.trim_end().ends_with("AS backend")))
                        .expect("backend stage");
  assert!(stage.contains("COPY --from=build /src/target/release/foodgram-bootstrap /usr/local/bin/"));
  let last = dockerfile.rsplit("FROM ").next().unwrap();
  assert!(last.starts_with("debian:bookworm-slim AS bootstrap"), "loader image is the default target");
}

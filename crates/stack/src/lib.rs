//! Crate `stack` — topología de arranque del stack foodgram
//!
//! Este crate modela los ficheros docker-compose (`ComposeFile`), valida el
//! grafo `depends_on` y calcula un orden de arranque determinista
//! (`StackTopology`). Como `depends_on` sólo ordena y no espera, expone
//! además un sondeo de disponibilidad con backoff (`readiness`) y un
//! ejecutor de cadenas de arranque con semántica `&&` (`chain`).
//!
//! Ejemplo rápido:
//! ```rust
//! use stack::{ComposeFile, StackTopology};
//! let file = ComposeFile::from_yaml("services:\n  db:\n    image: postgres\n  backend:\n    image: app\n    depends_on: [db]\n").unwrap();
//! let topo = StackTopology::from_compose(&file).unwrap();
//! assert_eq!(topo.startup_order(), &["db", "backend"]);
//! ```
pub mod chain;
pub mod compose;
pub mod errors;
pub mod readiness;
pub mod topology;

pub use chain::*;
pub use compose::*;
pub use errors::*;
pub use readiness::*;
pub use topology::*;

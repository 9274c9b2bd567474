// Archivo: readiness.rs
// Propósito: esperar a que una dependencia acepte conexiones antes de seguir
// con el arranque.
//
// `depends_on` garantiza orden, no disponibilidad: la base de datos puede
// estar arrancada y aún rechazar conexiones. Aquí se sondea con backoff
// exponencial acotado hasta un plazo máximo.
use crate::errors::{Result, StackError};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

/// Sonda de disponibilidad de una dependencia.
pub trait Probe: Send + Sync {
    /// Nombre legible del destino (p.ej. `db:5432`).
    fn name(&self) -> &str;

    /// Un único intento. `Ok(())` significa que la dependencia está lista.
    fn check(&self) -> Result<()>;
}

/// Lista cuando se puede abrir una conexión TCP con `host:port`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), connect_timeout: Duration::from_secs(2) }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Probe for TcpProbe {
    fn name(&self) -> &str {
        &self.target
    }

    fn check(&self) -> Result<()> {
        let addrs: Vec<_> = self.target.to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(StackError::Parse(format!("'{}' no resuelve a ninguna dirección", self.target)));
        }
        let mut last = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last = Some(e),
            }
        }
        Err(last.map(StackError::Io)
                .unwrap_or_else(|| StackError::Parse(format!("sin direcciones para '{}'", self.target))))
    }
}

/// Backoff exponencial con tope y plazo total.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Tiempo total máximo de espera. Con plazo cero se hace un único intento.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { initial_delay: Duration::from_millis(250),
               max_delay: Duration::from_secs(5),
               multiplier: 2.0,
               deadline: Duration::from_secs(60) }
    }
}

impl RetryPolicy {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Secuencia infinita de esperas: `initial, initial*m, ...` hasta `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let max = self.max_delay;
        let multiplier = if self.multiplier < 1.0 { 1.0 } else { self.multiplier };
        std::iter::successors(Some(self.initial_delay.min(max)), move |d| Some(d.mul_f64(multiplier).min(max)))
    }
}

/// Resultado de una espera satisfactoria.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyReport {
    pub target: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Sondea `probe` hasta que responda o se agote `policy.deadline`.
pub fn wait_until_ready(probe: &dyn Probe, policy: &RetryPolicy) -> Result<ReadyReport> {
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut delays = policy.delays();
    loop {
        attempts += 1;
        let last_error = match probe.check() {
            Ok(()) => {
                let elapsed = start.elapsed();
                log::info!("'{}' listo tras {} intento(s) en {:?}", probe.name(), attempts, elapsed);
                return Ok(ReadyReport { target: probe.name().to_string(), attempts, elapsed });
            }
            Err(e) => e.to_string(),
        };
        let elapsed = start.elapsed();
        if elapsed >= policy.deadline {
            log::warn!("'{}' no está listo tras {} intento(s): {}", probe.name(), attempts, last_error);
            return Err(StackError::NotReady { target: probe.name().to_string(), attempts, last_error });
        }
        let delay = delays.next().unwrap_or(policy.max_delay).min(policy.deadline - elapsed);
        log::debug!("'{}' aún no responde ({}); reintento en {:?}", probe.name(), last_error, delay);
        thread::sleep(delay);
    }
}

/// Espera a cada sonda en orden; falla en la primera que agote su plazo.
pub fn wait_for_all(probes: &[Box<dyn Probe>], policy: &RetryPolicy) -> Result<Vec<ReadyReport>> {
    probes.iter().map(|p| wait_until_ready(p.as_ref(), policy)).collect()
}

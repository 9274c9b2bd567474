// Archivo: chain.rs
// Propósito: ejecutar la cadena de arranque de un servicio con semántica
// `&&` de shell: los pasos corren en orden y el primer fallo aborta el resto.
//
// No hay reintentos ni rollback; la política de reinicio del contenedor es la
// que decide si la cadena vuelve a ejecutarse.
use crate::errors::{Result, StackError};
use std::process::Command;

/// Paso de la cadena de arranque.
pub trait StartupStep: Send + Sync {
    /// Nombre o identificador del paso
    fn name(&self) -> &str;

    /// Ejecuta el paso. Un `Err` detiene la cadena.
    fn run(&self) -> Result<()>;
}

/// Paso que ejecuta un programa externo; un código de salida distinto de cero
/// es un fallo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub program: String,
    pub args: Vec<String>,
    label: String,
}

impl CommandStep {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let label = std::iter::once(program.as_str()).chain(args.iter().map(|a| a.as_str()))
                                                     .collect::<Vec<_>>()
                                                     .join(" ");
        Self { program, args, label }
    }
}

impl StartupStep for CommandStep {
    fn name(&self) -> &str {
        &self.label
    }

    fn run(&self) -> Result<()> {
        let status = Command::new(&self.program).args(&self.args).status().map_err(|e| StackError::StepFailed {
                                                                            step: self.label.clone(),
                                                                            reason: format!("no se pudo lanzar: {}", e),
                                                                        })?;
        if status.success() {
            return Ok(());
        }
        let reason = match status.code() {
            Some(code) => format!("código de salida {}", code),
            None => "terminado por señal".to_string(),
        };
        Err(StackError::StepFailed { step: self.label.clone(), reason })
    }
}

/// Resumen de una ejecución de la cadena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub completed: Vec<String>,
    /// Paso que falló y motivo.
    pub failed: Option<(String, String)>,
    /// Pasos no ejecutados por el fallo anterior.
    pub skipped: Vec<String>,
}

impl ChainReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }

    /// Convierte un fallo en `StackError::StepFailed`.
    pub fn into_result(self) -> Result<ChainReport> {
        match &self.failed {
            None => Ok(self),
            Some((step, reason)) => Err(StackError::StepFailed { step: step.clone(), reason: reason.clone() }),
        }
    }
}

#[derive(Default)]
pub struct StartupChain {
    steps: Vec<Box<dyn StartupStep>>,
}

impl StartupChain {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn then(mut self, step: impl StartupStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn StartupStep>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Construye la cadena a partir de un comando estilo compose
    /// (`a && b && c`). Sólo se admite `&&` como operador; cualquier otro
    /// operador de shell sin comillas es un error (usar `sh -c`).
    pub fn parse_shell(command: &str) -> Result<Self> {
        let mut chain = StartupChain::new();
        for words in split_and_chain(command)? {
            let mut it = words.into_iter();
            let Some(program) = it.next() else {
                return Err(StackError::Parse(format!("paso vacío en '{}'", command)));
            };
            chain.push(Box::new(CommandStep::new(program, it.collect())));
        }
        if chain.is_empty() {
            return Err(StackError::Parse("comando vacío".into()));
        }
        Ok(chain)
    }

    /// Ejecuta los pasos en orden; el primer fallo deja el resto en `skipped`.
    pub fn run(&self) -> ChainReport {
        let mut report = ChainReport::default();
        for (i, step) in self.steps.iter().enumerate() {
            log::info!("[{}/{}] {}", i + 1, self.steps.len(), step.name());
            match step.run() {
                Ok(()) => report.completed.push(step.name().to_string()),
                Err(e) => {
                    log::error!("paso '{}' falló: {}", step.name(), e);
                    report.failed = Some((step.name().to_string(), e.to_string()));
                    report.skipped = self.steps[i + 1..].iter().map(|s| s.name().to_string()).collect();
                    break;
                }
            }
        }
        report
    }
}

// Tokeniza respetando comillas simples/dobles y separa en `&&`.
fn split_and_chain(command: &str) -> Result<Vec<Vec<String>>> {
    let mut steps: Vec<Vec<String>> = vec![Vec::new()];
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                word.push(c);
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                in_word = true;
            }
            c if c.is_whitespace() => {
                if in_word {
                    push_word(&mut steps, &mut word);
                    in_word = false;
                }
            }
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                if in_word {
                    push_word(&mut steps, &mut word);
                    in_word = false;
                }
                steps.push(Vec::new());
            }
            '&' | '|' | ';' | '<' | '>' | '`' | '$' => {
                return Err(StackError::Parse(format!("operador de shell '{}' no soportado en '{}'; usar sh -c",
                                                     c, command)));
            }
            _ => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(StackError::Parse(format!("comillas sin cerrar en '{}'", command)));
    }
    if in_word {
        push_word(&mut steps, &mut word);
    }
    if steps.len() > 1 && steps.iter().any(|s| s.is_empty()) {
        return Err(StackError::Parse(format!("'&&' sin comando a uno de sus lados en '{}'", command)));
    }
    Ok(steps.into_iter().filter(|s| !s.is_empty()).collect())
}

fn push_word(steps: &mut [Vec<String>], word: &mut String) {
    if let Some(last) = steps.last_mut() {
        last.push(std::mem::take(word));
    }
}

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;

use crate::registry::JobSpec;

#[derive(Debug, Parser)]
#[command(name = "mrcoordinator")]
#[command(about = "Coordinator MapReduce: reparte tareas map/reduce a los workers")]
pub struct CoordinatorConfig {
    /// Archivos de entrada (se aceptan patrones glob, ej: "data/pg-*.txt")
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Dirección donde escucha el servidor HTTP
    #[arg(long, env = "MR_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Cantidad de reducers (particiones intermedias)
    #[arg(long, env = "MR_REDUCERS", default_value_t = 10)]
    pub reducers: u32,

    /// Segundos que un worker tiene para reportar antes de perder la tarea
    #[arg(long, env = "MR_LEASE_SECS", default_value_t = 10)]
    pub lease_secs: u64,

    /// Cada cuántos segundos se barren los leases vencidos
    #[arg(long, env = "MR_SWEEP_SECS", default_value_t = 2)]
    pub sweep_secs: u64,

    #[arg(long, env = "MR_INTERMEDIATE_DIR", default_value = "./interresult")]
    pub intermediate_dir: PathBuf,

    #[arg(long, env = "MR_OUTPUT_DIR", default_value = "./mr_output")]
    pub output_dir: PathBuf,

    /// Segundos que el proceso sigue vivo tras terminar el job, para que los
    /// workers que todavía están preguntando reciban ALL_DONE
    #[arg(long, env = "MR_LINGER_SECS", default_value_t = 3)]
    pub linger_secs: u64,
}

impl CoordinatorConfig {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_secs.max(1))
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }

    pub fn job_spec(&self) -> Result<JobSpec> {
        if self.reducers == 0 {
            bail!("--reducers tiene que ser >= 1");
        }
        Ok(JobSpec {
            inputs: expand_inputs(&self.inputs)?,
            reducer_count: self.reducers,
            intermediate_dir: self.intermediate_dir.clone(),
            output_dir: self.output_dir.clone(),
            lease_duration: self.lease_duration(),
        })
    }
}

/// Expande los patrones en orden; dentro de un patrón los archivos salen
/// ordenados. Un argumento sin comodines que no existe es un error.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched: Vec<String> = glob(pattern)
            .with_context(|| format!("patrón de entrada inválido: {}", pattern))?
            .flatten()
            .filter(|p| p.is_file())
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        if matched.is_empty() {
            bail!("ningún archivo de entrada coincide con {}", pattern);
        }
        matched.sort();
        files.extend(matched);
    }

    Ok(files)
}

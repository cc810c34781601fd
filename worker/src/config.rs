use std::time::Duration;

use clap::Parser;
use common::ihash;

/// Configuración del worker. En Docker se usa MASTER_URL=http://master:8080;
/// si no está definida, http://localhost:8080 para pruebas locales.
///
/// La identidad por defecto mezcla hostname y pid: en contenedores todos los
/// procesos principales son el pid 1.
#[derive(Debug, Parser)]
#[command(name = "mrworker")]
#[command(about = "Worker MapReduce: pide tareas al coordinator y las ejecuta")]
pub struct WorkerConfig {
    #[arg(long, env = "MASTER_URL", default_value = "http://localhost:8080")]
    pub master_url: String,

    /// Aplicación a ejecutar (wordcount, indexer)
    #[arg(long, env = "MR_APP", default_value = "wordcount")]
    pub app: String,

    /// Milisegundos entre pedidos cuando no hay tareas libres
    #[arg(long, env = "MR_POLL_MS", default_value_t = 500)]
    pub poll_ms: u64,

    /// Timeout de cada llamada al coordinator, en segundos
    #[arg(long, env = "MR_RPC_TIMEOUT_SECS", default_value_t = 10)]
    pub rpc_timeout_secs: u64,

    /// Identidad del worker; por defecto un hash de hostname y pid
    #[arg(long, env = "MR_WORKER_ID")]
    pub worker_id: Option<u32>,
}

impl WorkerConfig {
    pub fn worker_id(&self) -> u32 {
        self.worker_id.unwrap_or_else(|| {
            let host = hostname::get().unwrap_or_default();
            default_worker_id(&host.to_string_lossy(), std::process::id())
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs.max(1))
    }
}

/// Id estable para (host, pid); dos contenedores con pid 1 dan ids distintos.
pub fn default_worker_id(hostname: &str, pid: u32) -> u32 {
    ihash(&format!("{}/{}", hostname, pid))
}

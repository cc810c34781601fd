use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{IsDoneResponse, JobStatusResponse, TaskCounts};
use reqwest::Client;
use tokio::time::sleep;

/// Igual que en el worker:
/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
#[derive(Parser)]
#[command(name = "mr-client")]
#[command(about = "CLI simple para seguir un job en el coordinator")]
struct Cli {
    #[arg(long, env = "MASTER_URL", default_value = "http://localhost:8080")]
    master_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Imprime true/false según si el job terminó
    Done,
    /// Fase actual y estado de cada tarea
    Status,
    /// Pregunta cada `interval-ms` hasta que el job termine
    Wait {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

async fn fetch_done(client: &Client, base_url: &str) -> Result<bool> {
    let url = format!("{}/api/v1/done", base_url);
    let resp: IsDoneResponse = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo contactar al coordinator en {}", url))?
        .error_for_status()?
        .json()
        .await?;
    Ok(resp.done)
}

fn print_counts(label: &str, c: &TaskCounts) {
    println!(
        "  {:<7}: total={}, idle={}, running={}, completadas={}, fallidas={}",
        label,
        c.total(),
        c.idle,
        c.running,
        c.completed,
        c.failed
    );
}

fn print_status(status: &JobStatusResponse) {
    println!("Job:");
    println!("  fase   : {:?}", status.phase);
    println!("  reducers: {}", status.reducer_count);
    print_counts("map", &status.map);
    print_counts("reduce", &status.reduce);
    println!("  iniciado: {}", status.started_at);
    if let Some(ref done) = status.finished_at {
        println!("  finalizado: {}", done);
    }

    println!();
    for t in &status.tasks {
        let holder = t
            .worker_id
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<6} {:>3}  {:<9} worker={:<8} intentos={} fallos={}  {}",
            t.kind.to_string(),
            t.id,
            format!("{:?}", t.state),
            holder,
            t.attempts,
            t.failures,
            t.input
        );
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.master_url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Done => {
            println!("{}", fetch_done(&client, &base_url).await?);
        }

        Commands::Status => {
            let url = format!("{}/api/v1/status", base_url);
            let resp = client.get(&url).send().await?;
            if resp.status().is_success() {
                let status: JobStatusResponse = resp.json().await?;
                print_status(&status);
            } else {
                println!("Error consultando /api/v1/status (status {})", resp.status());
            }
        }

        Commands::Wait { interval_ms } => {
            let interval = Duration::from_millis(interval_ms.max(1));
            while !fetch_done(&client, &base_url).await? {
                sleep(interval).await;
            }
            println!("Job completo.");
        }
    }

    Ok(())
}

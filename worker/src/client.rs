use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;

use common::{GetJobRequest, GetJobResponse, ReportJobRequest, ReportJobResponse, WorkerId};

/// Lado worker del contrato RPC. Cualquier error acá es un fallo de
/// transporte y el worker lo trata como fatal.
pub trait CoordinatorClient {
    fn get_job(&self, worker_id: WorkerId)
        -> impl Future<Output = Result<GetJobResponse>> + Send;

    fn report_job(
        &self,
        req: ReportJobRequest,
    ) -> impl Future<Output = Result<ReportJobResponse>> + Send;
}

/// Cliente HTTP/JSON contra el router del coordinator.
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    client: Client,
    base_url: String,
}

impl HttpCoordinator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("no se pudo construir el cliente HTTP")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl CoordinatorClient for HttpCoordinator {
    async fn get_job(&self, worker_id: WorkerId) -> Result<GetJobResponse> {
        let url = format!("{}/api/v1/jobs/next", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&GetJobRequest { worker_id })
            .send()
            .await
            .with_context(|| format!("no se pudo contactar al coordinator en {}", url))?
            .error_for_status()
            .with_context(|| format!("el coordinator rechazó {}", url))?;

        resp.json()
            .await
            .context("respuesta de GetJob inválida")
    }

    async fn report_job(&self, req: ReportJobRequest) -> Result<ReportJobResponse> {
        let url = format!("{}/api/v1/jobs/report", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("no se pudo contactar al coordinator en {}", url))?
            .error_for_status()
            .with_context(|| format!("el coordinator rechazó {}", url))?;

        resp.json()
            .await
            .context("respuesta de ReportJob inválida")
    }
}

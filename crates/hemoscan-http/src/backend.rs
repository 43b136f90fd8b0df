//! reqwest implementation of [`AnalysisBackend`]

use async_trait::async_trait;
use hemoscan_resilience::{
    AnalysisBackend, AnalysisReport, Document, HealthReport, OperationFailure, PatientAttributes,
};
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};
use url::Url;

use crate::classify::{classify_transport_error, failure_from_response};
use crate::config::HttpBackendConfig;
use crate::error::HttpResult;

/// Status string the service reports when it is ready
pub const HEALTHY: &str = "healthy";

/// HTTP client for the analysis service
#[derive(Clone)]
pub struct HttpBackend {
    config: HttpBackendConfig,
    http_client: HttpClient,
    health_url: Url,
    interpret_url: Url,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("health_url", &self.health_url.as_str())
            .field("interpret_url", &self.interpret_url.as_str())
            .finish()
    }
}

impl HttpBackend {
    /// Build a backend from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: HttpBackendConfig) -> HttpResult<Self> {
        config.validate()?;

        // Timeouts are set per request: probes and submissions differ
        let mut client_builder = HttpClient::builder().use_rustls_tls();
        if let Some(ref user_agent) = config.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }
        let http_client = client_builder.build()?;

        Ok(Self {
            health_url: config.health_url()?,
            interpret_url: config.interpret_url()?,
            config,
            http_client,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// Analysis endpoint URL
    pub fn interpret_url(&self) -> &Url {
        &self.interpret_url
    }

    /// Liveness endpoint URL
    pub fn health_url(&self) -> &Url {
        &self.health_url
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    #[instrument(skip_all, fields(file = %document.file_name, size = document.len()))]
    async fn submit(
        &self,
        document: &Document,
        attributes: &PatientAttributes,
    ) -> Result<AnalysisReport, OperationFailure> {
        let file = Part::stream_with_length(document.content.clone(), document.len() as u64)
            .file_name(document.file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| classify_transport_error(&e))?;
        let form = Form::new()
            .part("file", file)
            .text("genero", attributes.gender.as_str())
            .text("idade", attributes.age.to_string());

        debug!(url = %self.interpret_url, "Submitting document");
        let response = self
            .http_client
            .post(self.interpret_url.clone())
            .timeout(self.config.submission_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        response
            .json::<AnalysisReport>()
            .await
            .map_err(|e| classify_transport_error(&e))
    }

    async fn check_health(&self) -> Result<HealthReport, OperationFailure> {
        let response = self
            .http_client
            .get(self.health_url.clone())
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let report = response
            .json::<HealthReport>()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        // Up but not ready yet, e.g. still loading models
        if report.status != HEALTHY {
            return Err(OperationFailure::retryable(format!(
                "server reported status '{}': {}",
                report.status, report.message
            )));
        }
        Ok(report)
    }
}

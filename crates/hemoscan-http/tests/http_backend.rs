//! HttpBackend against a mock analysis service

use std::sync::Arc;
use std::time::Duration;

use hemoscan_http::{HttpBackend, HttpBackendConfig};
use hemoscan_resilience::{
    AnalysisBackend, AnalysisService, ConnectivityGate, Document, FailureClass, Gender,
    HealthState, NoopSink, PatientAttributes, ResilienceConfig, ResilienceError, RetryPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(HttpBackendConfig::new(server.uri())).unwrap()
}

fn document() -> Document {
    Document::new("hemograma.pdf", b"%PDF-1.4 hemograma".to_vec())
}

fn attributes() -> PatientAttributes {
    PatientAttributes {
        gender: Gender::Female,
        age: 41,
    }
}

fn report_body() -> serde_json::Value {
    json!({
        "lab_findings": [{
            "analito": "Ferritina",
            "valor": 8.0,
            "resultado": "baixo",
            "severidade": 3,
            "especialidade": "Hematologia",
            "descricao_achado": "Reserva de ferro baixa",
            "diretriz": "SBHH"
        }],
        "recommended_specialties": ["Hematologia"],
        "patient_briefing": "Seus exames indicam reserva de ferro baixa."
    })
}

/// Config with instant retries so real-clock tests stay fast
fn quick_config() -> ResilienceConfig {
    ResilienceConfig {
        health_policy: RetryPolicy::new(3, Duration::from_millis(10)),
        submission_policy: RetryPolicy::new(3, Duration::from_millis(10)),
        ..ResilienceConfig::default()
    }
}

#[tokio::test]
async fn health_check_accepts_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "API funcionando corretamente"
        })))
        .mount(&server)
        .await;

    let report = assert_ok!(backend(&server).check_health().await);
    assert_eq!(report.status, "healthy");
}

#[tokio::test]
async fn health_check_not_ready_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "starting",
            "message": "carregando modelos"
        })))
        .mount(&server)
        .await;

    let failure = assert_err!(backend(&server).check_health().await);
    assert_eq!(failure.class, FailureClass::Retryable);
    assert!(failure.message.contains("starting"));
}

#[tokio::test]
async fn submission_sends_multipart_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"file\"; filename=\"hemograma.pdf\""))
        .and(body_string_contains("name=\"genero\""))
        .and(body_string_contains("feminino"))
        .and(body_string_contains("name=\"idade\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
        .expect(1)
        .mount(&server)
        .await;

    let report = assert_ok!(backend(&server).submit(&document(), &attributes()).await);
    assert_eq!(report.lab_findings[0].analyte, "Ferritina");
    assert_eq!(report.recommended_specialties, vec!["Hematologia"]);
}

#[tokio::test]
async fn unprocessable_document_is_fatal_with_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": "Não foi possível extrair valores de exames do PDF."
        })))
        .mount(&server)
        .await;

    let failure = assert_err!(backend(&server).submit(&document(), &attributes()).await);
    assert_eq!(failure.class, FailureClass::Fatal);
    assert_eq!(failure.status, Some(422));
    assert_eq!(failure.message, "Não foi possível extrair valores de exames do PDF.");
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Erro interno do servidor: falha ao processar"
        })))
        .mount(&server)
        .await;

    let failure = assert_err!(backend(&server).submit(&document(), &attributes()).await);
    assert_eq!(failure.class, FailureClass::Retryable);
    assert_eq!(failure.status, Some(500));
}

#[tokio::test]
async fn garbled_success_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let failure = assert_err!(backend(&server).submit(&document(), &attributes()).await);
    assert_eq!(failure.class, FailureClass::Fatal);
}

#[tokio::test]
async fn slow_health_check_times_out_as_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy", "message": "ok"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = HttpBackendConfig {
        probe_timeout: Duration::from_millis(100),
        ..HttpBackendConfig::new(server.uri())
    };
    let failure = assert_err!(HttpBackend::new(config).unwrap().check_health().await);
    assert_eq!(failure.class, FailureClass::Retryable);
}

#[tokio::test]
async fn refused_connection_is_retryable() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let backend = HttpBackend::new(HttpBackendConfig::new(format!("http://127.0.0.1:{port}"))).unwrap();

    let failure = assert_err!(backend.check_health().await);
    assert_eq!(failure.class, FailureClass::Retryable);
}

#[tokio::test]
async fn service_retries_through_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
        .expect(1)
        .mount(&server)
        .await;

    let service = AnalysisService::new(
        Arc::new(backend(&server)),
        ConnectivityGate::default(),
        quick_config(),
        Arc::new(NoopSink),
    )
    .unwrap();

    let report = assert_ok!(service.run_submission(&document(), &attributes()).await);
    assert_eq!(report.lab_findings.len(), 1);
}

#[tokio::test]
async fn service_surfaces_bad_request_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Gênero deve ser 'masculino' ou 'feminino'"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = AnalysisService::new(
        Arc::new(backend(&server)),
        ConnectivityGate::default(),
        quick_config(),
        Arc::new(NoopSink),
    )
    .unwrap();

    let err = assert_err!(service.run_submission(&document(), &attributes()).await);
    assert!(matches!(err, ResilienceError::Fatal { attempts: 1, .. }));
    assert_eq!(err.user_message(), "Gênero deve ser 'masculino' ou 'feminino'");
}

#[tokio::test]
async fn probe_now_reports_online() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "API funcionando corretamente"
        })))
        .mount(&server)
        .await;

    let service = AnalysisService::new(
        Arc::new(backend(&server)),
        ConnectivityGate::default(),
        quick_config(),
        Arc::new(NoopSink),
    )
    .unwrap();

    let status = service.probe_now().await;
    assert_eq!(status.state, HealthState::Online);
    assert!(status.latency.is_some());
}

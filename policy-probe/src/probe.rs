use crate::config::Configuration;
use policy_client::service_control::GrpcServiceControlClient;
use policy_client::{
    transport_result, AttributeBag, ClientConfig, ClientContext, ConfigError, MethodInfo,
    QuotaController, QuotaResponseInfo, RequestContext, Status, TransportResult,
};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid policy config file: {0}")]
    ConfigFile(#[from] ConfigError),
    #[error("Couldn't set up the service control client: {0}")]
    ServiceControl(#[from] tonic::transport::Error),
}

/// The request the probe sends through the quota path.
#[derive(Debug, Clone, Default)]
pub struct ProbeRequest {
    pub service: String,
    pub selector: String,
    pub api_key: String,
    pub allow_unregistered_calls: bool,
    pub client_ip: String,
}

#[derive(Debug)]
pub struct ProbeReport {
    pub service: String,
    pub operation_id: String,
    pub enforcing: bool,
    pub status: Status,
    pub transport_result: TransportResult,
    pub admitted: bool,
    pub quota_response: Option<QuotaResponseInfo>,
    pub forward_attributes: AttributeBag,
}

impl Display for ProbeReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "service:          {}", self.service)?;
        writeln!(f, "operation id:     {}", self.operation_id)?;
        writeln!(f, "enforcing:        {}", self.enforcing)?;
        writeln!(f, "status:           {}", self.status)?;
        writeln!(f, "transport result: {}", self.transport_result.as_str())?;
        write!(
            f,
            "decision:         {}",
            if self.admitted { "admit" } else { "reject" }
        )?;
        for (name, value) in self.forward_attributes.iter() {
            write!(f, "\nforward:          {} = {:?}", name, value)?;
        }
        if let Some(response) = &self.quota_response {
            for error in &response.quota_errors {
                write!(
                    f,
                    "\nquota error:      {:?} {} {}",
                    error.code, error.subject, error.description
                )?;
            }
        }
        Ok(())
    }
}

/// Loads the policy config named by `config`, applies its overrides and wires
/// a gRPC service control client when an endpoint is known.
pub fn client_context(config: &Configuration) -> Result<ClientContext, ProbeError> {
    let mut client_config = ClientConfig::from_path(&config.config_file)?;

    if let Some(url) = &config.service_control_url {
        client_config.transport.service_control_url = Some(url.clone());
    }
    if let Some(timeout_ms) = config.service_control_timeout_ms {
        client_config.transport.timeout_ms = timeout_ms;
    }
    client_config.validate()?;

    let service_control = match &client_config.transport.service_control_url {
        Some(url) => Some(GrpcServiceControlClient::new(
            url,
            client_config.transport.timeout(),
        )?),
        None => {
            warn!("No service control endpoint configured, quota checks are disabled");
            None
        }
    };

    let ctx = ClientContext::new(client_config, &config.node);
    Ok(match service_control {
        Some(client) => ctx.with_service_control(Arc::new(client)),
        None => ctx,
    })
}

pub async fn run_probe(ctx: &ClientContext, request: &ProbeRequest) -> ProbeReport {
    let service_context = ctx.service_context(&request.service);

    let mut attributes = AttributeBag::new();
    ctx.add_local_node_attributes(&mut attributes);

    // What an outbound proxy would hand to the upstream workload.
    let mut forward_attributes = AttributeBag::new();
    ctx.add_local_node_forward_attributes(&mut forward_attributes);
    service_context.add_forward_attributes(&mut forward_attributes);

    let request_context = Arc::new(
        RequestContext::new(
            Arc::clone(&service_context),
            Arc::new(MethodInfo::new(
                request.selector.as_str(),
                request.allow_unregistered_calls,
            )),
        )
        .with_api_key(request.api_key.as_str())
        .with_client_ip(request.client_ip.as_str())
        .with_attributes(&attributes),
    );

    debug!(
        "Probing service '{}' with operation {}",
        service_context.service_name(),
        request_context.operation_id()
    );

    let status = QuotaController::new().check(&request_context).await;
    request_context.finalize();

    ProbeReport {
        service: service_context.service_name().to_string(),
        operation_id: request_context.operation_id().to_string(),
        enforcing: service_context.is_enforcing(),
        transport_result: transport_result(&status),
        admitted: service_context.admits(&status),
        quota_response: request_context.quota_response_info(),
        forward_attributes,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_client::attributes::SOURCE_UID;
    use policy_client::service_control::InMemoryServiceControlClient;
    use policy_client::status_util::UPSTREAM_REQUEST_TIMEOUT;
    use policy_client::{Code, ErrorCause, LocalNode};
    use std::io::Write;

    const CONFIG: &str = r#"
default_destination_service: reviews.default
service_configs:
  reviews.default: {}
  ratings.default:
    network_fail_policy: FAIL_CLOSE
"#;

    fn probe_request(service: &str, api_key: &str) -> ProbeRequest {
        ProbeRequest {
            service: service.to_string(),
            selector: "probe.Check".to_string(),
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    fn context_replying(status: Status) -> ClientContext {
        let config = ClientConfig::from_yaml_str(CONFIG).expect("valid config");
        ClientContext::new(config, &LocalNode::default()).with_service_control(Arc::new(
            InMemoryServiceControlClient::replying(status, QuotaResponseInfo::default()),
        ))
    }

    #[tokio::test]
    async fn reports_an_admitted_check() {
        let ctx = context_replying(Status::ok());

        let report = run_probe(&ctx, &probe_request("", "key")).await;

        assert_eq!(report.service, "reviews.default");
        assert!(report.enforcing);
        assert!(report.status.is_ok());
        assert_eq!(report.transport_result, TransportResult::Success);
        assert!(report.admitted);
        assert_eq!(report.quota_response, Some(QuotaResponseInfo::default()));
        assert!(report.to_string().contains("decision:         admit"));
    }

    #[tokio::test]
    async fn reports_the_fail_policy_decision() {
        let timeout = Status::new(
            Code::Unavailable,
            UPSTREAM_REQUEST_TIMEOUT,
            ErrorCause::ServiceControl,
        );
        let ctx = context_replying(timeout);

        let open = run_probe(&ctx, &probe_request("reviews.default", "key")).await;
        assert_eq!(open.transport_result, TransportResult::ResponseTimeout);
        assert!(open.admitted);

        let closed = run_probe(&ctx, &probe_request("ratings.default", "key")).await;
        assert_eq!(closed.transport_result, TransportResult::ResponseTimeout);
        assert!(!closed.admitted);
        assert!(closed.to_string().contains("decision:         reject"));
    }

    #[tokio::test]
    async fn reports_missing_api_key() {
        let ctx = context_replying(Status::ok());

        let report = run_probe(&ctx, &probe_request("", "")).await;

        assert_eq!(report.status.code(), Code::Unauthenticated);
        assert!(!report.admitted);
        assert_eq!(report.quota_response, None);
    }

    #[tokio::test]
    async fn reports_forward_attributes_when_outbound() {
        let yaml = r#"
default_destination_service: productpage.default
service_configs:
  productpage.default:
    forward_attributes:
      attributes:
        destination.service.host:
          string_value: productpage.default.svc.cluster.local
mixer_attributes:
  attributes:
    context.reporter.kind:
      string_value: outbound
"#;
        let node = LocalNode {
            uid: "kubernetes://reviews-v1-1234.default".to_string(),
            namespace: "default".to_string(),
            ip: String::new(),
        };
        let config = ClientConfig::from_yaml_str(yaml).expect("valid config");
        let ctx = ClientContext::new(config, &node).with_service_control(Arc::new(
            InMemoryServiceControlClient::replying(Status::ok(), QuotaResponseInfo::default()),
        ));

        let report = run_probe(&ctx, &probe_request("", "key")).await;

        assert_eq!(
            report.forward_attributes.get_str(SOURCE_UID),
            Some("kubernetes://reviews-v1-1234.default")
        );
        assert_eq!(
            report
                .forward_attributes
                .get_str("destination.service.host"),
            Some("productpage.default.svc.cluster.local")
        );
        assert!(report.to_string().contains("forward:          source.uid"));
    }

    #[tokio::test]
    async fn inbound_probe_forwards_nothing_from_the_node() {
        let ctx = context_replying(Status::ok());

        let report = run_probe(&ctx, &probe_request("", "key")).await;

        assert!(!report.forward_attributes.contains(SOURCE_UID));
    }

    #[tokio::test]
    async fn builds_context_from_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CONFIG.as_bytes()).expect("config written");

        let config = Configuration::with(
            file.path().display().to_string(),
            Some("http://127.0.0.1:1".to_string()),
            Some(50),
            LocalNode::default(),
        );
        let ctx = client_context(&config).expect("context builds");

        assert_eq!(ctx.config().transport.timeout_ms, 50);
        assert!(ctx.service_context("").is_enforcing());

        let report = run_probe(&ctx, &probe_request("", "key")).await;
        assert!(!report.status.is_ok());
        assert_eq!(report.status.cause(), ErrorCause::ServiceControl);
    }

    #[test]
    fn without_endpoint_checks_are_disabled() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CONFIG.as_bytes()).expect("config written");

        let config = Configuration::with(
            file.path().display().to_string(),
            None,
            None,
            LocalNode::default(),
        );
        let ctx = client_context(&config).expect("context builds");

        assert!(!ctx.service_context("").is_enforcing());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let config = Configuration::with(
            "/nonexistent/policy.yaml".to_string(),
            None,
            None,
            LocalNode::default(),
        );

        assert!(matches!(
            client_context(&config),
            Err(ProbeError::ConfigFile(ConfigError::Io { .. }))
        ));
    }
}

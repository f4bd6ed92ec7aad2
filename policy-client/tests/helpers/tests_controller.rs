use policy_client::service_control::InMemoryServiceControlClient;
use policy_client::{
    AttributeBag, ClientConfig, ClientContext, LocalNode, MethodInfo, QuotaController,
    RequestContext, Status,
};
use std::sync::Arc;
use tokio::sync::oneshot;

// This wraps both ways of running a quota check, awaiting it or handing it a
// continuation, so the tests can exercise both without duplication.

enum CheckStyle {
    Async,
    Continuation,
}

pub struct TestsController {
    style: CheckStyle,
    controller: QuotaController,
    pub client_context: ClientContext,
    pub service_control: Arc<InMemoryServiceControlClient>,
}

impl TestsController {
    pub fn new_async(yaml: &str, node: &LocalNode) -> Self {
        Self::new(CheckStyle::Async, yaml, node)
    }

    pub fn new_continuation(yaml: &str, node: &LocalNode) -> Self {
        Self::new(CheckStyle::Continuation, yaml, node)
    }

    fn new(style: CheckStyle, yaml: &str, node: &LocalNode) -> Self {
        let config = ClientConfig::from_yaml_str(yaml).expect("valid test config");
        let service_control = Arc::new(InMemoryServiceControlClient::new());
        let client_context =
            ClientContext::new(config, node).with_service_control(service_control.clone());

        Self {
            style,
            controller: QuotaController::new(),
            client_context,
            service_control,
        }
    }

    /// A request to `service` as the proxy would build it: static attributes
    /// from the service context, then the local node ones.
    pub fn request(
        &self,
        service: &str,
        method: MethodInfo,
        api_key: &str,
    ) -> Arc<RequestContext> {
        let mut attributes = AttributeBag::new();
        self.client_context.add_local_node_attributes(&mut attributes);

        Arc::new(
            RequestContext::new(
                self.client_context.service_context(service),
                Arc::new(method),
            )
            .with_api_key(api_key)
            .with_attributes(&attributes),
        )
    }

    pub async fn check(&self, request: &Arc<RequestContext>) -> Status {
        match self.style {
            CheckStyle::Async => self.controller.check(request).await,
            CheckStyle::Continuation => {
                let (tx, rx) = oneshot::channel();
                self.controller.check_with(Arc::clone(request), move |status| {
                    let _ = tx.send(status);
                });
                rx.await.expect("continuation must run")
            }
        }
    }
}

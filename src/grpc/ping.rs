//! Ping gRPC service implementation

use crate::grpc::interceptor::ClientIdentity;
use crate::grpc::proto::{ping_server::Ping, PingMessage};
use metrics::counter;
use tonic::{Request, Response, Status};
use tracing::info;

/// The `SayHello` handler
///
/// Stateless. It is only ever mounted behind [`AuthInterceptor`], so every
/// request it sees has already been authenticated.
///
/// [`AuthInterceptor`]: crate::grpc::AuthInterceptor
#[derive(Debug, Clone, Default)]
pub struct PingService;

impl PingService {
    pub fn new() -> Self {
        Self
    }
}

/// Build the reply for a greeting
pub fn reply_to(message: &PingMessage) -> PingMessage {
    PingMessage {
        greeting: format!("Hello from the handler, you said: {}", message.greeting),
    }
}

#[tonic::async_trait]
impl Ping for PingService {
    async fn say_hello(
        &self,
        request: Request<PingMessage>,
    ) -> Result<Response<PingMessage>, Status> {
        let client_id = request
            .extensions()
            .get::<ClientIdentity>()
            .map(|identity| identity.as_str().to_string());
        let message = request.into_inner();

        info!(
            client_id = client_id.as_deref().unwrap_or("unknown"),
            greeting = %message.greeting,
            "Received ping"
        );
        counter!("ping_grpc_requests_total", "method" => "SayHello").increment(1);

        Ok(Response::new(reply_to(&message)))
    }
}

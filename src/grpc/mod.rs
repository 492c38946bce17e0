//! gRPC services

pub mod client;
pub mod interceptor;
pub mod ping;

pub use interceptor::{
    authenticated_service, AuthInterceptor, AuthRejection, AuthenticatedPingClient,
    ClientIdentity, CredentialAttacher,
};
pub use ping::PingService;

/// Wire types and generated client/server stubs for `api.Ping`
pub mod proto {
    /// Request and response payload of `SayHello`
    ///
    /// The serde derive gives the gateway its JSON form of the message.
    #[derive(Clone, PartialEq, Eq, prost::Message, serde::Serialize, serde::Deserialize)]
    pub struct PingMessage {
        #[prost(string, tag = "1")]
        #[serde(default)]
        pub greeting: String,
    }

    include!(concat!(env!("OUT_DIR"), "/api.Ping.rs"));
}

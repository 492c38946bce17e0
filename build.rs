fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ping = tonic_build::manual::Service::builder()
        .name("Ping")
        .package("api")
        .method(
            tonic_build::manual::Method::builder()
                .name("say_hello")
                .route_name("SayHello")
                .input_type("crate::grpc::proto::PingMessage")
                .output_type("crate::grpc::proto::PingMessage")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new()
        .build_server(true)
        .build_client(true)
        .compile(&[ping]);
    Ok(())
}

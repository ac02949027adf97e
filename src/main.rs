#[tokio::main]
async fn main() -> std::io::Result<()> {
    kitchen_server::run_with_config().await
}

#[tokio::main]
async fn main() {
    let code = styleforge_lib::run().await;
    std::process::exit(code);
}

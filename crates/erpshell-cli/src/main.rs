#[tokio::main]
async fn main() {
    std::process::exit(erpshell_cli::run().await);
}

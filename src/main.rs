#[tokio::main]
async fn main() {
    praxia::run().await;
}

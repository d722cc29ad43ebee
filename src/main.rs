// src/main.rs
#[tokio::main]
async fn main() {
    env_logger::init();

    let result = mdtts_cli::cli::run().await;
    match result {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    }
}

//! Relay hub server
//!
//! Run with: relay-hub [BIND_ADDR]
//!
//! Log verbosity follows `RUST_LOG` (default `relay_hub=info`).

use relay_hub::server::parse_bind_addr;
use relay_hub::{RelayServer, ServerConfig};

fn print_usage() {
    eprintln!("Usage: relay-hub [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8080)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  relay-hub                     # binds to 0.0.0.0:8080");
    eprintln!("  relay-hub 9000                # binds to 0.0.0.0:9000");
    eprintln!("  relay-hub localhost           # binds to 127.0.0.1:8080");
    eprintln!("  relay-hub 127.0.0.1:9000      # binds to 127.0.0.1:9000");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::default();
    if let Some(arg) = args.get(1) {
        match parse_bind_addr(arg) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("relay_hub=info")),
        )
        .init();

    let server = RelayServer::new(config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Relay hub stopped");
    Ok(())
}

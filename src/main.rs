use std::env;
use std::fs::File;
use std::io;

use energy_credits::csv::{read_requests, write_metrics, write_records};
use energy_credits::{Exchange, LogNotifier, MarketConfig, MemoryStore};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .expect("usage: energy-credits <requests.csv> [config.toml]");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let config = match args.next() {
        Some(config_path) => MarketConfig::load(&config_path).expect("failed to load config"),
        None => MarketConfig::default(),
    };

    let ledger_path = config.ledger_path.clone();
    let requests = read_requests(path).expect("failed to open requests");
    let mut exchange = Exchange::new(config, MemoryStore::new(), LogNotifier);
    let (request_sender, request_receiver) = tokio::sync::mpsc::channel(16);

    tokio::task::spawn_blocking(move || {
        for result in requests {
            match result {
                Ok(request) => {
                    if request_sender.blocking_send(request).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    exchange.run(ReceiverStream::new(request_receiver)).await;

    write_metrics(io::stdout().lock(), &exchange.metrics()).expect("failed to write metrics");

    if let Some(ledger_path) = ledger_path {
        let file = File::create(&ledger_path).expect("failed to create ledger");
        write_records(file, exchange.store().records()).expect("failed to write ledger");
    }
}

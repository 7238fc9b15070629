use clap::Parser;
use cotton_dnssd::{BrowseConfig, BrowseEntry, Callbacks, Error};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Browse for DNS-SD services on the local network(s)
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Service types, e.g. _http._tcp.local.
    #[arg(required = true)]
    service_types: Vec<String>,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// UDP port, if not the standard mDNS one
    #[arg(short, long, default_value_t = cotton_dnssd::MDNS_PORT)]
    port: u16,
}

fn show(prefix: char, e: &BrowseEntry) {
    println!(
        "{prefix} {} on {}",
        e.unescaped_service_instance_name(),
        e.interface_name
    );
    if prefix == '+' {
        println!("  {}:{} {:?}", e.host, e.port, e.ips);
        let mut text = e.text.iter().collect::<Vec<_>>();
        text.sort();
        for (k, v) in text {
            println!("  {k}={v}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!(
        "dnssd-browse from {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let timeout = args.timeout;
        tokio::spawn(async move {
            match timeout {
                Some(secs) => tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    () = tokio::time::sleep(Duration::from_secs(secs)) => {},
                },
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
            cancel.cancel();
        });
    }

    let config = BrowseConfig::new(args.service_types).with_port(args.port);
    let result = cotton_dnssd::lookup_with_config(
        &cancel,
        &config,
        Callbacks::new(
            |e: &BrowseEntry| show('+', e),
            |e: &BrowseEntry| show('-', e),
        ),
    )
    .await;

    match result {
        Ok(never) => match never {},
        Err(Error::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rewrite_proxy::config::{load_config, ProxyConfig};
use rewrite_proxy::rewrite::resolve;
use rewrite_proxy::routing::{parse_target, Target, Whitelist};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Diagnostic CLI for rewrite-proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a relative URL against a base URL
    Resolve { relative: String, base: String },
    /// Validate a target URL against the configured whitelist
    Check {
        url: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Fetch a target through a running proxy
    Fetch {
        target: String,
        #[arg(short, long, default_value = "http://localhost:8080")]
        proxy: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { relative, base } => {
            println!("{}", resolve(&relative, &base));
        }
        Commands::Check { url, config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => ProxyConfig::default(),
            };
            let whitelist = Whitelist::from_config(&config.whitelist)?;
            match parse_target(&url, &whitelist) {
                Ok(Target::Url(target)) => println!("allowed: {target}"),
                Ok(Target::Landing) => println!("empty target: landing page"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Fetch { target, proxy } => {
            let client = reqwest::Client::builder().no_proxy().build()?;
            let url = format!("{}/{}", proxy.trim_end_matches('/'), target);
            let res = client.get(url).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    println!("{:?} {}", res.version(), res.status());
    for (name, value) in res.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    println!("{}", res.text().await?);
    Ok(())
}

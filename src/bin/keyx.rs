//! keyx CLI binary.
//!
//! Diffie-Hellman key exchange tooling.
//!
//! # Commands
//!
//! - `params` - List the registered Diffie-Hellman groups
//! - `exchange` - Run a local initial + renewal exchange and check both sides agree

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use keyx::{
    Config, Credential, DiffieHellmanExchange, KeyExchangeFactory, KeyRequestData,
    KeyResponseData, VERSION,
};
use rand::rngs::OsRng;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keyx")]
#[command(version = VERSION)]
#[command(about = "Diffie-Hellman key exchange for message-security sessions", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/keyx/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered parameter groups
    Params {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an initial and a renewal exchange locally
    Exchange {
        /// Parameters ID to use
        #[arg(short, long, default_value = keyx::exchange::dh::MODP_2048_ID)]
        params: String,

        /// Entity identity for the initial master token
        #[arg(short, long, default_value = "ESN123")]
        identity: String,

        /// Print the wire messages
        #[arg(long)]
        show_wire: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading config")?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Params { json } => cmd_params(&config, json),
        Commands::Exchange {
            params,
            identity,
            show_wire,
        } => cmd_exchange(&config, &params, &identity, show_wire),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn cmd_params(config: &Config, json: bool) -> anyhow::Result<()> {
    let registry = config.registry()?;

    if json {
        let groups: Vec<_> = registry
            .ids()
            .into_iter()
            .filter_map(|id| registry.lookup(id).ok())
            .map(|spec| {
                json!({
                    "id": spec.id(),
                    "bits": spec.prime_modulus().bits(),
                    "generator": spec.generator().to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No parameter groups registered");
        return Ok(());
    }

    println!("{:<16} {:>6} {:>10}", "ID", "BITS", "GENERATOR");
    println!("{}", "-".repeat(34));
    for id in registry.ids() {
        let spec = registry.lookup(id)?;
        println!(
            "{:<16} {:>6} {:>10}",
            spec.id(),
            spec.prime_modulus().bits(),
            spec.generator()
        );
    }

    Ok(())
}

fn cmd_exchange(
    config: &Config,
    parameters_id: &str,
    identity: &str,
    show_wire: bool,
) -> anyhow::Result<()> {
    let factory = DiffieHellmanExchange::new(config.registry()?);
    let tokens = config.token_issuer()?;

    // Initial exchange: the request and response cross the wire as JSON.
    let request = KeyRequestData::from(factory.request(parameters_id, &mut OsRng)?);
    let request_wire = request.to_json();
    let received = KeyRequestData::parse(&request_wire)?;

    let responder = factory.generate_response(&tokens, &received, Credential::Identity(identity))?;
    let response_wire = responder.key_response_data.to_json();
    let response = KeyResponseData::parse(&tokens, &response_wire)?;

    let initiator = factory.get_crypto_context(&request, &response, None)?;
    check_contexts(initiator.as_ref(), responder.crypto_context.as_ref())?;

    let Some(master_token) = response.master_token() else {
        bail!("response carries no master token");
    };
    println!(
        "Initial exchange OK: identity={} serial={} sequence={}",
        master_token.identity(),
        master_token.serial_number(),
        master_token.sequence_number()
    );

    if show_wire {
        println!("Request:  {}", serde_json::to_string_pretty(&request_wire)?);
        println!("Response: {}", serde_json::to_string_pretty(&response_wire)?);
    }

    // Renewal with the token just issued.
    let renew_request: KeyRequestData = factory.request(parameters_id, &mut OsRng)?.into();
    let renewed = factory.generate_response(
        &tokens,
        &renew_request,
        Credential::MasterToken(master_token),
    )?;
    let initiator =
        factory.get_crypto_context(&renew_request, &renewed.key_response_data, None)?;
    check_contexts(initiator.as_ref(), renewed.crypto_context.as_ref())?;

    let Some(renewed_token) = renewed.key_response_data.master_token() else {
        bail!("renewal response carries no master token");
    };
    println!(
        "Renewal exchange OK: identity={} serial={} sequence={}",
        renewed_token.identity(),
        renewed_token.serial_number(),
        renewed_token.sequence_number()
    );

    Ok(())
}

/// Confirm two contexts share keys: identical MACs and cross decryption.
fn check_contexts(a: &dyn keyx::CryptoContext, b: &dyn keyx::CryptoContext) -> anyhow::Result<()> {
    let probe = b"keyx context probe";

    if a.sign(probe)? != b.sign(probe)? {
        bail!("session signatures differ");
    }
    if !b.verify(probe, &a.sign(probe)?)? {
        bail!("responder rejected initiator signature");
    }
    if a.decrypt(&b.encrypt(probe)?)? != probe {
        bail!("initiator could not decrypt responder ciphertext");
    }
    if b.decrypt(&a.encrypt(probe)?)? != probe {
        bail!("responder could not decrypt initiator ciphertext");
    }

    Ok(())
}

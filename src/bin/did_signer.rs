// src/bin/did_signer.rs
//! Out-of-band endorsement tool.
//!
//! Signs another entity's identity document with your key, appending your
//! endorsement to its signature map. Run by an operator when a trust
//! relationship is established; never part of exchange traffic.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use vc_exchange::resolver::FileResolver;
use vc_exchange::utils::crypto;

#[derive(Parser)]
#[command(about = "Endorse an identity document with your signing key")]
struct Args {
    /// PEM-encoded PKCS#8 RSA private key of the endorser
    #[arg(long)]
    key: PathBuf,

    /// DID of the endorsing entity (you)
    #[arg(long)]
    did: String,

    /// DID whose identity document gets the endorsement
    #[arg(long)]
    doc: String,

    /// Identity document directory
    #[arg(long, default_value = "did-docs")]
    docs_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let endorser_key =
        crypto::load_private_key(&args.key).context("failed to load the endorser key")?;
    let resolver = FileResolver::new(&args.docs_dir, Duration::from_secs(5))
        .context("failed to build the resolver")?;

    resolver
        .endorse_document(&args.doc, &args.did, &endorser_key)
        .await
        .with_context(|| format!("failed to endorse '{}'", args.doc))?;

    println!("document '{}' endorsed by '{}'", args.doc, args.did);
    Ok(())
}

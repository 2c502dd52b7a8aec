//! # CRD Generator
//!
//! Generates the `Installation` CustomResourceDefinition YAML from the Rust
//! type definitions via `kube`'s `CustomResourceExt`.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/installation.yaml
//!
//! # Also emit the Postgres CRD, for clusters without the provisioning backend
//! cargo run --bin crdgen -- --include-postgres | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use credential_bridge_controller::crd::{Installation, Postgres};
use kube::core::CustomResourceExt;
use std::path::PathBuf;

/// Print the controller's CustomResourceDefinitions as YAML
#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Generate CRD YAML for the Credential Bridge Controller")]
struct Args {
    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also emit the Postgres CRD owned by the provisioning backend
    #[arg(long)]
    include_postgres: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut yaml = serde_yaml::to_string(&Installation::crd())
        .context("Failed to serialize Installation CRD")?;
    if args.include_postgres {
        yaml.push_str("---\n");
        yaml.push_str(
            &serde_yaml::to_string(&Postgres::crd()).context("Failed to serialize Postgres CRD")?,
        );
    }

    match args.output {
        Some(path) => std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write CRD to {}", path.display()))?,
        None => print!("{yaml}"),
    }
    Ok(())
}

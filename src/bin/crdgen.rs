//! # CRD Generator
//!
//! Prints the CustomResourceDefinition YAML for the operator's kinds,
//! generated from the Rust types via `kube`'s `CustomResourceExt`.
//!
//! ## Usage
//!
//! ```bash
//! # All kinds, as a multi-document stream
//! cargo run --bin crdgen > config/crd/all.yaml
//!
//! # A single kind
//! cargo run --bin crdgen -- --kind dashboard | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use kube::core::CustomResourceExt;
use newrelic_operator::adapter::ResourceKind;
use newrelic_operator::crd::{AlertChannel, AlertPolicy, Dashboard, Label, Monitor};

/// Print CRD YAML for the New Relic operator
#[derive(Parser, Debug)]
#[command(name = "crdgen", version, about)]
struct Args {
    /// Only print this kind (policy, channel, dashboard, monitor, label)
    #[arg(long, short)]
    kind: Option<ResourceKind>,
}

fn crd_yaml(kind: ResourceKind) -> Result<String> {
    let crd = match kind {
        ResourceKind::Policy => AlertPolicy::crd(),
        ResourceKind::Channel => AlertChannel::crd(),
        ResourceKind::Dashboard => Dashboard::crd(),
        ResourceKind::Monitor => Monitor::crd(),
        ResourceKind::Label => Label::crd(),
    };
    serde_yaml::to_string(&crd).with_context(|| format!("Failed to serialize {kind} CRD"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let kinds: Vec<ResourceKind> = match args.kind {
        Some(kind) => vec![kind],
        None => ResourceKind::all().to_vec(),
    };

    let documents = kinds
        .into_iter()
        .map(crd_yaml)
        .collect::<Result<Vec<_>>>()?;
    print!("{}", documents.join("---\n"));

    Ok(())
}

use anyhow::Context;
use bridge::server::{ArchiveBridge, BridgeState};
use clap::Parser;
use generator::profile::build_archive;
use log::info;
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod bridge;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic first-motion archive and review driver")]
struct Args {
    /// Replay the review script once and print the summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 16)]
    stations: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Write the generated archive as JSON
    #[arg(long)]
    export: Option<PathBuf>,
    /// Serve the archive over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.stations, args.seed)
    };

    let archive = build_archive(&workflow_config.generator)?;
    info!(
        "generated {} picks for {}",
        archive.mechanism.picks.len(),
        archive.mechanism.origin_id
    );

    if let Some(path) = &args.export {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&archive).context("encoding archive")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Archive written to {}", path.display());
    }

    if args.offline {
        let result = Runner::new(workflow_config.clone()).execute(&archive)?;
        println!("Offline review -> draw calls {}", result.draw_calls);
        for line in &result.outcomes {
            println!("  {}", line);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&result.summary).context("encoding summary")?
        );
    }

    if args.serve {
        let bridge = ArchiveBridge::spawn(BridgeState::new(archive), workflow_config.bind);
        println!(
            "Archive bridge on http://{} (Ctrl+C to stop)...",
            bridge.addr()
        );
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
        let snapshot = bridge.state().metrics().snapshot();
        info!(
            "bridge served {} waveform requests, {} failures",
            snapshot.waveform_requests, snapshot.failures
        );
    }

    Ok(())
}

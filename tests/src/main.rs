use std::{path::PathBuf, process::exit};

use clap::Parser;
use mm_core::eeprintln;

mod scenarios;

/// A test suite that drives mod-composition and overlay-network
/// scenarios end to end, across crate boundaries, the way a real
/// invocation of the CLI would.
#[derive(clap::Parser)]
#[command(long_about = "Runs the lettered end-to-end scenarios against a throwaway workspace.")]
#[command(author = "modmesh contributors")]
struct Cli {
    #[arg(long)]
    #[arg(help = "Only run the named scenario (a, b, c, d, e, or f)")]
    only: Option<String>,
    #[arg(long)]
    #[arg(help = "Also run scenarios that need a live overlay network adapter")]
    include_hardware: bool,
    #[arg(short, long)]
    #[arg(help = "See all the logs, not just failures")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    setup_dir();
    let cli = Cli::parse();

    let wants = |name: &str| cli.only.as_deref().is_none_or(|only| only == name) && (cli.include_hardware || name != "d");

    let mut fails = Vec::new();
    for (name, result) in [
        ("a", run_if(wants("a"), scenarios::scenario_a_minimal_launch()).await),
        ("b", run_if(wants("b"), scenarios::scenario_b_forced_last_load()).await),
        ("c", run_if(wants("c"), scenarios::scenario_c_share_code_static_ip()).await),
        ("d", run_if(wants("d"), scenarios::scenario_d_nic_rollback_requires_hardware()).await),
        ("e", run_if(wants("e"), scenarios::scenario_e_missing_preset_dependency()).await),
        ("f", run_if(wants("f"), scenarios::scenario_f_external_duplicate_rejection()).await),
    ] {
        let Some(result) = result else { continue };
        if cli.verbose {
            println!("ran scenario {name}");
        }
        match result {
            Ok(()) => println!("scenario {name}: ok"),
            Err(reason) => {
                eeprintln!("scenario {name}: FAILED ({reason})");
                fails.push((name, reason));
            }
        }
    }

    if !fails.is_empty() {
        println!("\nTEST FAILURES:");
        for (name, reason) in &fails {
            println!("{name}: {reason}");
        }
        exit(1);
    }
}

/// Runs `fut` only if `should_run`, so skipped scenarios don't pay for
/// their own setup; used instead of a boxed-future scenario table since
/// the workspace's `futures` dependency only pulls in the `executor`
/// feature.
async fn run_if(should_run: bool, fut: impl std::future::Future<Output = scenarios::ScenarioResult>) -> Option<scenarios::ScenarioResult> {
    if should_run {
        Some(fut.await)
    } else {
        None
    }
}

fn setup_dir() {
    let new_dir = PathBuf::from(file!()).parent().unwrap().parent().unwrap().join("ModMeshTestRoot");
    unsafe {
        std::env::set_var("MODMESH_DIR", new_dir);
    }
}

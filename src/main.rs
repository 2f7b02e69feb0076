use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strand::{compile, configure_design, optimize, StrandConfig};
use strand_netlist::{load_design_file, Design, DesignStats, Diagnostics};
use tracing::info;

/// strandc - netlist to vvp back end
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an elaborated netlist to vvp assembly
    Build {
        /// Netlist JSON produced by the elaborator
        netlist: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip dangling object elimination
        #[arg(long)]
        no_opt: bool,

        /// Lower processes in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Print object counts before and after elimination
    Stats {
        /// Netlist JSON produced by the elaborator
        netlist: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            netlist,
            output,
            config,
            no_opt,
            parallel,
        } => {
            let mut config = load_config(config.as_deref())?;
            if no_opt {
                config.optimize.nodangle = false;
            }
            if parallel {
                config.codegen.parallel = true;
            }
            build(&netlist, output.as_deref(), &config)?;
        }

        Commands::Stats {
            netlist,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            stats(&netlist, &config, json)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StrandConfig> {
    match path {
        Some(path) => StrandConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration {:?}", path)),
        None => Ok(StrandConfig::default()),
    }
}

fn load(netlist: &Path) -> Result<Design> {
    info!("Loading netlist from {:?}", netlist);
    load_design_file(netlist).with_context(|| format!("Failed to load netlist {:?}", netlist))
}

fn build(netlist: &Path, output: Option<&Path>, config: &StrandConfig) -> Result<()> {
    let mut design = load(netlist)?;
    let mut diags = Diagnostics::new();
    let compiled = compile(&mut design, config, &mut diags).context("Compilation failed")?;

    match output {
        Some(path) => {
            fs::write(path, &compiled.text)
                .with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("✅ Build complete!");
            eprintln!("📄 Output: {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(compiled.text.as_bytes())?;
            out.flush()?;
        }
    }

    if !diags.is_empty() {
        eprintln!(
            "⚠️  {} diagnostics ({} errors)",
            diags.len(),
            diags.error_count()
        );
    }
    Ok(())
}

fn stats(netlist: &Path, config: &StrandConfig, json: bool) -> Result<()> {
    let mut design = load(netlist)?;
    configure_design(&mut design, &config.design);
    let mut diags = Diagnostics::new();
    strand_elab::resolve_design(&mut design, &mut diags).context("Delay resolution failed")?;

    let before = design.stats();
    let (_, elimination) = optimize(&mut design, &config.optimize).context("Elimination failed")?;
    let after = design.stats();

    if json {
        let report = serde_json::json!({
            "design": design.name,
            "before": before,
            "after": after,
            "iterations": elimination.iterations,
            "events_merged": elimination.events_merged,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Design: {}", design.name);
    println!("{:<14} {:>8} {:>8}", "", "before", "after");
    print_row("scopes", &before, &after, |s| s.scopes);
    print_row("signals", &before, &after, |s| s.signals);
    print_row("local signals", &before, &after, |s| s.local_signals);
    print_row("nodes", &before, &after, |s| s.nodes);
    print_row("events", &before, &after, |s| s.events);
    print_row("processes", &before, &after, |s| s.processes);
    print_row("nexuses", &before, &after, |s| s.nexuses);
    println!(
        "Fixed point after {} iterations ({} events merged)",
        elimination.iterations, elimination.events_merged
    );
    Ok(())
}

fn print_row(label: &str, before: &DesignStats, after: &DesignStats, f: fn(&DesignStats) -> usize) {
    println!("{:<14} {:>8} {:>8}", label, f(before), f(after));
}

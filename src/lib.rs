//! Strand: Verilog netlist back end
//!
//! Takes an elaborated netlist, resolves delay specifications, removes
//! dangling events and signals, and lowers every process to vvp assembly.

pub mod config;

pub use config::{CodegenConfig, ConfigError, DesignConfig, OptimizeConfig, StrandConfig};

use strand_codegen::{CodeGenerator, CodegenError};
use strand_elab::{DelayError, DelayStats};
use strand_netlist::{Design, DesignStats, Diagnostics, NetlistError};
use strand_opt::{EliminationStats, NoDangle, OptError, Pass, PassResult};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error("delay resolution failed: {0}")]
    Delay(#[from] DelayError),

    #[error("optimization failed: {0}")]
    Opt(#[from] OptError),

    #[error("code generation failed: {0}")]
    Codegen(#[from] CodegenError),

    #[error("{0} unsupported construct(s) were skipped")]
    Unsupported(usize),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Everything a compile produced besides diagnostics
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// vvp assembly text
    pub text: String,
    pub delays: DelayStats,
    /// `None` when the eliminator was disabled
    pub elimination: Option<EliminationStats>,
    /// Object counts around elimination
    pub before: DesignStats,
    pub after: DesignStats,
    pub threads: usize,
    pub instructions: usize,
}

/// Apply the `[design]` section to a freshly loaded design
pub fn configure_design(design: &mut Design, config: &DesignConfig) {
    if let Some(unit) = config.default_time_unit {
        design.apply_default_timescale(unit);
    }
    if let Some(precision) = config.precision {
        design.set_precision(precision);
    }
}

/// Run the eliminator as a pass, honouring the configured ceiling
pub fn optimize(
    design: &mut Design,
    config: &OptimizeConfig,
) -> Result<(PassResult, EliminationStats)> {
    let mut pass = NoDangle::with_max_iterations(config.max_iterations);
    let result = pass.run(design)?;
    info!("{}", result);
    design.validate()?;
    Ok((result, pass.stats()))
}

/// Resolve delays, eliminate dangling objects and lower every process.
///
/// Recoverable problems land in `diags`; the design is left in its
/// optimized state.
pub fn compile(
    design: &mut Design,
    config: &StrandConfig,
    diags: &mut Diagnostics,
) -> Result<CompileOutput> {
    config.validate()?;
    configure_design(design, &config.design);

    let delays = strand_elab::resolve_design(design, diags)?;
    let before = design.stats();

    let elimination = if config.optimize.nodangle {
        let (_, stats) = optimize(design, &config.optimize)?;
        Some(stats)
    } else {
        None
    };
    let after = design.stats();

    let mut generator = CodeGenerator::new(config.codegen.options());
    let generated = generator.generate(design)?;
    let unsupported = generated.diagnostics.len();
    diags.extend(generated.diagnostics);

    if config.codegen.fail_on_unsupported && unsupported > 0 {
        return Err(CompileError::Unsupported(unsupported));
    }

    info!(
        "Compiled {}: {} threads, {} signals eliminated",
        design.name,
        generated.threads,
        before.signals.saturating_sub(after.signals)
    );
    Ok(CompileOutput {
        text: generated.text,
        delays,
        elimination,
        before,
        after,
        threads: generated.threads,
        instructions: generated.instructions,
    })
}

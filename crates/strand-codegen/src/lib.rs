//! Strand code generation
//!
//! Lowers every process of a design to a thread of vvp assembly. Output is
//! optional scope and variable declarations followed by one instruction
//! stream per process, in process order.

pub mod error;
pub mod expr;
pub mod instr;
pub mod process;

pub use error::{CodegenError, Result};
pub use instr::{render, Instruction, Label, VectorOp, VpiArg};
pub use process::{lower_process, LoweredProcess};

use rayon::prelude::*;
use std::io::Write;
use strand_netlist::{Design, Diagnostics};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Lower processes on the rayon thread pool
    pub parallel: bool,
    /// Emit `.scope` and `.var` declarations before the threads
    pub declarations: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            declarations: true,
        }
    }
}

/// Output of one generation run
#[derive(Debug, Clone, Default)]
pub struct GeneratedCode {
    pub text: String,
    pub diagnostics: Diagnostics,
    pub threads: usize,
    pub instructions: usize,
}

impl GeneratedCode {
    /// Write the assembly text to `out`
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(self.text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Generator state shared by all runs. Thread numbers keep counting up
/// across calls to [`CodeGenerator::generate`].
#[derive(Debug, Default)]
pub struct CodeGenerator {
    options: CodegenOptions,
    next_thread: u32,
}

impl CodeGenerator {
    /// Create a generator starting at thread 0
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            next_thread: 0,
        }
    }

    /// Thread number the next lowered process will get
    pub fn next_thread(&self) -> u32 {
        self.next_thread
    }

    /// Lower every process of `design`, after the declarations if enabled
    pub fn generate(&mut self, design: &Design) -> Result<GeneratedCode> {
        let mut out = GeneratedCode::default();
        if self.options.declarations {
            out.text.push_str(&declarations(design));
        }

        // Thread numbers are handed out before lowering so parallel output
        // matches serial output exactly.
        let first = self.next_thread;
        let jobs: Vec<(u32, &strand_netlist::Process)> = design
            .processes()
            .iter()
            .enumerate()
            .map(|(idx, proc)| (first + idx as u32, proc))
            .collect();
        self.next_thread = first + jobs.len() as u32;

        let lowered: Vec<Result<LoweredProcess>> = if self.options.parallel {
            debug!("Lowering {} processes in parallel", jobs.len());
            jobs.par_iter()
                .map(|(thread, proc)| lower_process(design, proc, *thread))
                .collect()
        } else {
            jobs.iter()
                .map(|(thread, proc)| lower_process(design, proc, *thread))
                .collect()
        };

        for result in lowered {
            let thread = result?;
            out.instructions += thread.instructions.len();
            out.text.push_str(&render(&thread.instructions));
            out.diagnostics.extend(thread.diagnostics);
            out.threads += 1;
        }

        info!(
            "Generated {} threads ({} instructions, {} diagnostics)",
            out.threads,
            out.instructions,
            out.diagnostics.len()
        );
        Ok(out)
    }
}

/// `.scope` declarations for every scope and `.var` declarations for every
/// live signal
pub fn declarations(design: &Design) -> String {
    let mut text = String::new();
    for (_, scope) in design.scopes() {
        text.push_str(&format!(
            "S_{} .scope \"{}\";\n",
            scope.full_name, scope.full_name
        ));
    }
    for sig in design.signals() {
        text.push_str(&format!(
            "V_{} .var \"{}\", {}, 0;\n",
            sig.full_name,
            sig.name,
            sig.width.saturating_sub(1)
        ));
    }
    text
}

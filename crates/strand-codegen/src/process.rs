//! Lowering of one process into a thread
//!
//! Every process becomes one thread: a `.scope` selection, the entry label,
//! the lowered body, a terminator (`%end` for initial, a jump back to the
//! entry for always) and the `.thread` directive. Local labels are numbered
//! per thread and qualified by the thread number, so they never collide.

use crate::error::{CodegenError, Result};
use crate::expr::FIRST_FREE_REGISTER;
use crate::instr::{Instruction, Label, VpiArg};
use strand_netlist::{
    Assign, Bit, DelayAmount, Design, Diagnostics, ExprKind, Expression, Pin, Process,
    ProcessKind, Signal, Statement,
};
use tracing::trace;

/// Instruction stream of one process
#[derive(Debug, Clone)]
pub struct LoweredProcess {
    pub thread: u32,
    pub instructions: Vec<Instruction>,
    pub diagnostics: Diagnostics,
}

pub(crate) struct Lowering<'a> {
    pub(crate) design: &'a Design,
    thread: u32,
    local_count: u32,
    pub(crate) next_reg: u32,
    pub(crate) code: Vec<Instruction>,
    diags: Diagnostics,
}

/// Lower `process` as thread number `thread`.
///
/// Unsupported statements are reported in the returned diagnostics and
/// contribute no code; only fatal errors fail the call.
pub fn lower_process(design: &Design, process: &Process, thread: u32) -> Result<LoweredProcess> {
    let mut lowering = Lowering {
        design,
        thread,
        local_count: 0,
        next_reg: FIRST_FREE_REGISTER,
        code: Vec::new(),
        diags: Diagnostics::new(),
    };
    let entry = Label::entry(thread);
    let scope = design.scope(process.scope)?;

    lowering.code.push(Instruction::Scope(scope.full_name.clone()));
    lowering.code.push(Instruction::Label(entry));
    lowering.statement(&process.body)?;
    lowering.code.push(match process.kind {
        ProcessKind::Initial => Instruction::End,
        ProcessKind::Always => Instruction::Jmp(entry),
    });
    lowering.code.push(Instruction::Thread(entry));

    trace!(
        "Lowered {} to {} instructions",
        entry,
        lowering.code.len()
    );
    Ok(LoweredProcess {
        thread,
        instructions: lowering.code,
        diagnostics: lowering.diags,
    })
}

impl Lowering<'_> {
    fn local_label(&mut self) -> Label {
        let label = Label::local(self.thread, self.local_count);
        self.local_count += 1;
        label
    }

    /// Lower one statement, reporting recoverable failures
    fn statement(&mut self, stmt: &Statement) -> Result<()> {
        match self.draw_statement(stmt) {
            Err(err) if !err.is_fatal() => {
                self.diags.error(err.span(), err.to_string());
                Ok(())
            }
            other => other,
        }
    }

    fn draw_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign(assign) => self.assign(assign),
            Statement::Block(stmts) => {
                for stmt in stmts {
                    self.statement(stmt)?;
                }
                Ok(())
            }
            Statement::Condit {
                cond,
                if_true,
                if_false,
                ..
            } => self.condit(cond, if_true, if_false.as_deref()),
            Statement::Delay { amount, body, span } => match amount {
                DelayAmount::Ticks(ticks) => {
                    self.code.push(Instruction::Delay(*ticks));
                    self.statement(body)
                }
                DelayAmount::Runtime(_) => Err(CodegenError::UnsupportedStatement {
                    kind: "delayx".to_string(),
                    span: Some(span.clone()),
                }),
                DelayAmount::Pending(_) => Err(CodegenError::UnresolvedDelay { span: span.clone() }),
            },
            Statement::Noop => Ok(()),
            Statement::SysTask { name, args, .. } => {
                self.code.push(Instruction::VpiCall {
                    name: name.clone(),
                    args: args.iter().map(vpi_arg).collect(),
                });
                Ok(())
            }
            other => Err(CodegenError::UnsupportedStatement {
                kind: other.kind_name().to_string(),
                span: other.span().cloned(),
            }),
        }
    }

    /// Constant assignment: one `%set` per signal pin reachable from each
    /// target bit
    fn assign(&mut self, assign: &Assign) -> Result<()> {
        let unsupported = |reason: &str| CodegenError::UnsupportedAssignment {
            reason: reason.to_string(),
            span: assign.span.clone(),
        };
        let [lval] = assign.lvals.as_slice() else {
            return Err(unsupported("multiple targets"));
        };
        if lval.mux.is_some() {
            return Err(unsupported("bit-select target"));
        }
        let rval = assign.rval.fold();
        let Some(value) = rval.as_number() else {
            return Err(unsupported("value is not a constant"));
        };

        let sig = self.design.signal(lval.signal)?;
        let value = value.resized(sig.width as usize);
        for idx in 0..sig.width {
            self.set_to_nexus(sig, sig.pin(idx), value.bit(idx as usize))?;
        }
        Ok(())
    }

    fn set_to_nexus(&mut self, target: &Signal, pin: Pin, bit: Bit) -> Result<()> {
        let conn = self.design.connectivity();
        let Some(nexus) = conn.nexus_of(pin) else {
            self.code.push(Instruction::Set {
                signal: target.full_name.clone(),
                pin: pin.index,
                bit,
            });
            return Ok(());
        };
        for member in conn.members(nexus) {
            let Some(id) = member.as_signal() else {
                continue;
            };
            self.code.push(Instruction::Set {
                signal: self.design.signal(id)?.full_name.clone(),
                pin: member.index,
                bit,
            });
        }
        Ok(())
    }

    /// `%jmp/0` only branches on 0, so an x or z condition takes the true
    /// branch.
    fn condit(
        &mut self,
        cond: &Expression,
        if_true: &Statement,
        if_false: Option<&Statement>,
    ) -> Result<()> {
        let cond = cond.fold();
        let (mark, reg_mark) = (self.code.len(), self.next_reg);
        let value = match self.draw_eval_expr(&cond) {
            Ok(value) => self.reduce(value),
            Err(err) => {
                self.code.truncate(mark);
                self.next_reg = reg_mark;
                return Err(err);
            }
        };

        let lab_false = self.local_label();
        let lab_out = self.local_label();
        self.code.push(Instruction::JmpFalse {
            target: lab_false,
            bit: value.base,
        });
        self.statement(if_true)?;
        match if_false {
            Some(stmt) => {
                self.code.push(Instruction::Jmp(lab_out));
                self.code.push(Instruction::Label(lab_false));
                self.statement(stmt)?;
                self.code.push(Instruction::Label(lab_out));
            }
            None => self.code.push(Instruction::Label(lab_false)),
        }
        Ok(())
    }
}

fn vpi_arg(expr: &Expression) -> VpiArg {
    match &expr.kind {
        ExprKind::String(text) => VpiArg::Str(text.clone()),
        _ => VpiArg::Runtime,
    }
}

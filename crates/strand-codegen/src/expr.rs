//! Drawing condition expressions into thread bit registers
//!
//! Registers 0..3 always hold the constants 0, 1, x and z. Everything else
//! is allocated per thread from 4 upward and never reused.

use crate::error::{CodegenError, Result};
use crate::instr::{Instruction, VectorOp};
use crate::process::Lowering;
use strand_netlist::{BinaryOp, ExprKind, Expression, UnaryOp};

/// First register free for allocation
pub const FIRST_FREE_REGISTER: u32 = 4;

/// A value held in `wid` consecutive registers starting at `base`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorInfo {
    pub base: u32,
    pub wid: u32,
}

impl Lowering<'_> {
    pub(crate) fn allocate(&mut self, wid: u32) -> u32 {
        let base = self.next_reg;
        self.next_reg += wid;
        base
    }

    /// Evaluate `expr` into registers
    pub(crate) fn draw_eval_expr(&mut self, expr: &Expression) -> Result<VectorInfo> {
        match &expr.kind {
            ExprKind::Number(value) if value.width() == 1 => Ok(VectorInfo {
                base: value.bit(0).code() as u32,
                wid: 1,
            }),
            ExprKind::Number(value) => {
                let wid = value.width() as u32;
                let base = self.allocate(wid);
                for (idx, bit) in value.bits().iter().enumerate() {
                    self.code.push(Instruction::Mov {
                        dst: base + idx as u32,
                        src: bit.code() as u32,
                        wid: 1,
                    });
                }
                Ok(VectorInfo { base, wid })
            }
            ExprKind::Signal(id) => {
                let sig = self.design.signal(*id)?;
                let wid = sig.width;
                let base = self.allocate(wid);
                for pin in 0..wid {
                    self.code.push(Instruction::Load {
                        reg: base + pin,
                        signal: sig.full_name.clone(),
                        pin,
                    });
                }
                Ok(VectorInfo { base, wid })
            }
            ExprKind::Unary {
                op: UnaryOp::BitNot,
                operand,
            } => {
                let value = self.draw_eval_expr(operand)?;
                let value = self.writable(value);
                self.code.push(Instruction::Inv {
                    reg: value.base,
                    wid: value.wid,
                });
                Ok(value)
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let value = self.draw_eval_expr(operand)?;
                let value = self.reduce(value);
                let value = self.writable(value);
                self.code.push(Instruction::Inv {
                    reg: value.base,
                    wid: 1,
                });
                Ok(value)
            }
            ExprKind::Binary { op, left, right } => {
                let op = match op {
                    BinaryOp::BitAnd => VectorOp::And,
                    BinaryOp::BitOr => VectorOp::Or,
                    BinaryOp::BitXor => VectorOp::Xor,
                    _ => return Err(unsupported(expr)),
                };
                let lv = self.draw_eval_expr(left)?;
                let rv = self.draw_eval_expr(right)?;
                if lv.wid != rv.wid {
                    return Err(unsupported(expr));
                }
                let lv = self.writable(lv);
                self.code.push(Instruction::Vector {
                    op,
                    dst: lv.base,
                    src: rv.base,
                    wid: lv.wid,
                });
                Ok(lv)
            }
            _ => Err(unsupported(expr)),
        }
    }

    /// Collapse a vector to one bit with a reduction or
    pub(crate) fn reduce(&mut self, value: VectorInfo) -> VectorInfo {
        if value.wid == 1 {
            return value;
        }
        let dst = self.allocate(1);
        self.code.push(Instruction::OrReduce {
            dst,
            src: value.base,
            wid: value.wid,
        });
        VectorInfo { base: dst, wid: 1 }
    }

    /// Constant registers are read-only; copy them out before writing
    fn writable(&mut self, value: VectorInfo) -> VectorInfo {
        if value.base >= FIRST_FREE_REGISTER {
            return value;
        }
        let dst = self.allocate(value.wid);
        self.code.push(Instruction::Mov {
            dst,
            src: value.base,
            wid: value.wid,
        });
        VectorInfo {
            base: dst,
            wid: value.wid,
        }
    }
}

fn unsupported(expr: &Expression) -> CodegenError {
    CodegenError::UnsupportedExpression {
        expr: expr.to_string(),
        span: expr.span.clone(),
    }
}

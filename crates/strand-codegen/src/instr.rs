//! Thread assembly instructions and their text form

use std::fmt;
use strand_netlist::Bit;

/// Thread entry label (`T_00003`) or a local label inside it (`T_00003.1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    pub thread: u32,
    pub local: Option<u32>,
}

impl Label {
    pub fn entry(thread: u32) -> Self {
        Self {
            thread,
            local: None,
        }
    }

    pub fn local(thread: u32, local: u32) -> Self {
        Self {
            thread,
            local: Some(local),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local {
            Some(local) => write!(f, "T_{:05}.{}", self.thread, local),
            None => write!(f, "T_{:05}", self.thread),
        }
    }
}

/// Bitwise vector operation between two register ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    And,
    Or,
    Xor,
}

impl VectorOp {
    fn mnemonic(self) -> &'static str {
        match self {
            VectorOp::And => "%and",
            VectorOp::Or => "%or",
            VectorOp::Xor => "%xor",
        }
    }
}

/// Argument of a system task call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpiArg {
    Str(String),
    /// Value only known while the thread runs
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `.scope` selection preceding a thread
    Scope(String),
    /// Label definition line
    Label(Label),
    Set {
        signal: String,
        pin: u32,
        bit: Bit,
    },
    Load {
        reg: u32,
        signal: String,
        pin: u32,
    },
    Mov {
        dst: u32,
        src: u32,
        wid: u32,
    },
    Inv {
        reg: u32,
        wid: u32,
    },
    Vector {
        op: VectorOp,
        dst: u32,
        src: u32,
        wid: u32,
    },
    /// Reduction or of `wid` registers from `src` into `dst`
    OrReduce {
        dst: u32,
        src: u32,
        wid: u32,
    },
    Jmp(Label),
    /// Jump when register `bit` holds zero
    JmpFalse {
        target: Label,
        bit: u32,
    },
    Delay(u64),
    VpiCall {
        name: String,
        args: Vec<VpiArg>,
    },
    End,
    Thread(Label),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Scope(scope) => write!(f, "    .scope S_{};", scope),
            Instruction::Label(label) => write!(f, "{}", label),
            Instruction::Set { signal, pin, bit } => {
                write!(f, "    %set V_{}[{}], {};", signal, pin, bit.code())
            }
            Instruction::Load { reg, signal, pin } => {
                write!(f, "    %load {}, V_{}[{}];", reg, signal, pin)
            }
            Instruction::Mov { dst, src, wid } => write!(f, "    %mov {}, {}, {};", dst, src, wid),
            Instruction::Inv { reg, wid } => write!(f, "    %inv {}, {};", reg, wid),
            Instruction::Vector { op, dst, src, wid } => {
                write!(f, "    {} {}, {}, {};", op.mnemonic(), dst, src, wid)
            }
            Instruction::OrReduce { dst, src, wid } => {
                write!(f, "    %or/r {}, {}, {};", dst, src, wid)
            }
            Instruction::Jmp(label) => write!(f, "    %jmp {};", label),
            Instruction::JmpFalse { target, bit } => write!(f, "    %jmp/0  {}, {};", target, bit),
            Instruction::Delay(ticks) => write!(f, "    %delay {};", ticks),
            Instruction::VpiCall { name, args } => {
                write!(f, "    %vpi_call \"{}\"", name)?;
                for arg in args {
                    match arg {
                        VpiArg::Str(text) => write!(f, ", \"{}\"", text)?,
                        VpiArg::Runtime => write!(f, ", ?")?,
                    }
                }
                write!(f, ";")
            }
            Instruction::End => write!(f, "    %end;"),
            Instruction::Thread(label) => write!(f, "    .thread {};", label),
        }
    }
}

/// Render instructions one per line
pub fn render(instructions: &[Instruction]) -> String {
    let mut text = String::new();
    for instr in instructions {
        text.push_str(&instr.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Label::entry(7).to_string(), "T_00007");
        assert_eq!(Label::local(123456, 2).to_string(), "T_123456.2");
    }

    #[test]
    fn test_instruction_text() {
        let cases = vec![
            (Instruction::Scope("top".into()), "    .scope S_top;"),
            (
                Instruction::Set {
                    signal: "top.x".into(),
                    pin: 3,
                    bit: Bit::Z,
                },
                "    %set V_top.x[3], 3;",
            ),
            (
                Instruction::JmpFalse {
                    target: Label::local(0, 0),
                    bit: 4,
                },
                "    %jmp/0  T_00000.0, 4;",
            ),
            (Instruction::Jmp(Label::entry(1)), "    %jmp T_00001;"),
            (Instruction::Delay(10), "    %delay 10;"),
            (
                Instruction::VpiCall {
                    name: "$finish".into(),
                    args: vec![],
                },
                "    %vpi_call \"$finish\";",
            ),
            (
                Instruction::VpiCall {
                    name: "$display".into(),
                    args: vec![VpiArg::Str("x=%b".into()), VpiArg::Runtime],
                },
                "    %vpi_call \"$display\", \"x=%b\", ?;",
            ),
            (
                Instruction::OrReduce {
                    dst: 8,
                    src: 4,
                    wid: 4,
                },
                "    %or/r 8, 4, 4;",
            ),
            (Instruction::Thread(Label::entry(0)), "    .thread T_00000;"),
        ];
        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }
}

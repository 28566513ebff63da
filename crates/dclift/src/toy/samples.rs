//! Hand-decoded toy programs.

use dclift_isa::{DecodedBlock, DecodedFunction, DecodedInst, RegId};

use super::{INST_SIZE, d, h, op, w, x};

/// A named set of decoded functions.
#[derive(Clone, Debug)]
pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    pub functions: Vec<DecodedFunction>,
}

/// Lays out consecutive 4-byte instructions from a start address.
struct Code {
    start: u64,
    next: u64,
    insts: Vec<DecodedInst>,
}

impl Code {
    const fn at(start: u64) -> Self {
        Self {
            start,
            next: start,
            insts: Vec::new(),
        }
    }

    fn emit(mut self, opcode: u32, regs: &[RegId], imms: &[i64]) -> Self {
        let mut inst = DecodedInst::new(self.next, INST_SIZE, opcode);
        for reg in regs {
            inst = inst.with_reg(reg.0);
        }
        for &imm in imms {
            inst = inst.with_imm(imm);
        }
        self.next = inst.next_address();
        self.insts.push(inst);
        self
    }

    fn block(self) -> DecodedBlock {
        DecodedBlock::new(self.start, self.insts)
    }
}

fn arith() -> Sample {
    let body = Code::at(0x1000)
        .emit(op::MOVI, &[x(0)], &[5])
        .emit(op::MOVW, &[x(1)], &[])
        .emit(op::ADD, &[x(2), x(0), x(1)], &[])
        .emit(op::UMULL, &[w(3), w(4), w(0), w(1)], &[])
        .emit(op::ROTL, &[x(5), x(2), x(0)], &[])
        .emit(op::REV, &[x(6), x(5)], &[])
        .emit(op::ADDW, &[w(7), w(0), w(1)], &[])
        .emit(op::MOVH, &[h(8), h(0)], &[])
        .emit(op::MOVK, &[x(9)], &[0x1234])
        .emit(op::MADD, &[x(2), x(0), x(1)], &[])
        .emit(op::ADDS, &[x(10), x(0)], &[1])
        .emit(op::FSQRT, &[d(0), d(1)], &[])
        .emit(op::HINT, &[], &[0])
        .emit(op::RET, &[], &[])
        .block();
    Sample {
        name: "arith",
        description: "integer, wide-multiply, sub-register and float semantics",
        functions: vec![DecodedFunction::new(0x1000, vec![body])],
    }
}

/// Counts `x0` down from 10; blocks arrive out of address order.
fn countdown() -> Sample {
    let init = Code::at(0x2000)
        .emit(op::MOVI, &[x(0)], &[10])
        .emit(op::MOVI, &[x(1)], &[1])
        .block();
    let body = Code::at(0x2008)
        .emit(op::SUB, &[x(0), x(0), x(1)], &[])
        .emit(op::BEQ, &[x(0), x(3)], &[0x2014])
        .block();
    let back = Code::at(0x2010).emit(op::B, &[], &[0x2008]).block();
    let done = Code::at(0x2014).emit(op::RET, &[], &[]).block();
    Sample {
        name: "countdown",
        description: "a loop whose blocks are decoded out of order",
        functions: vec![DecodedFunction::new(0x2000, vec![body, done, init, back])],
    }
}

fn calls() -> Sample {
    let caller = Code::at(0x3000)
        .emit(op::MOVI, &[x(0)], &[1])
        .emit(op::CALL, &[], &[0x3100])
        .emit(op::ADD, &[x(0), x(0), x(0)], &[])
        .emit(op::BR, &[x(1)], &[])
        .block();
    let callee = Code::at(0x3100)
        .emit(op::LDRX, &[x(2), x(0), x(1)], &[])
        .emit(op::TAIL, &[], &[0x3200])
        .block();
    Sample {
        name: "calls",
        description: "direct, indirect and tail calls across two functions",
        functions: vec![
            DecodedFunction::new(0x3000, vec![caller]),
            DecodedFunction::new(0x3100, vec![callee]),
        ],
    }
}

fn memory() -> Sample {
    let body = Code::at(0x4000)
        .emit(op::LDR, &[x(1), x(0)], &[])
        .emit(op::STR, &[x(1), x(2)], &[])
        .emit(op::LDRB, &[x(3), x(0)], &[])
        .emit(op::LDRSH, &[x(4), x(0)], &[])
        .emit(op::FENCE, &[], &[7, 1])
        .emit(op::RET, &[], &[])
        .block();
    Sample {
        name: "memory",
        description: "plain, extending and ordered memory accesses",
        functions: vec![DecodedFunction::new(0x4000, vec![body])],
    }
}

fn unknown() -> Sample {
    let head = Code::at(0x5000)
        .emit(op::MOVI, &[x(0)], &[1])
        .emit(op::UDF, &[], &[])
        .block();
    let tail = Code::at(0x5008)
        .emit(op::ADD, &[x(0), x(0), x(0)], &[])
        .emit(op::RET, &[], &[])
        .block();
    Sample {
        name: "unknown",
        description: "an instruction without semantics; lift with --permissive",
        functions: vec![DecodedFunction::new(0x5000, vec![head, tail])],
    }
}

/// Every sample, in listing order.
pub fn samples() -> Vec<Sample> {
    vec![arith(), countdown(), calls(), memory(), unknown()]
}

pub fn sample(name: &str) -> Option<Sample> {
    samples().into_iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use dclift_isa::Operand;

    use super::*;
    use crate::toy::PC;

    #[test]
    fn test_code_layout() {
        let block = Code::at(0x100)
            .emit(op::NOP, &[], &[])
            .emit(op::MOVI, &[x(1)], &[3])
            .block();
        assert_eq!(block.start, 0x100);
        assert_eq!(block.end, 0x108);
        assert_eq!(block.instructions[1].address, 0x104);
        assert_eq!(block.instructions[1].reg(0), Some(x(1)));
        assert_eq!(block.instructions[1].imm(1), Some(3));
    }

    #[test]
    fn test_sample_names_unique() {
        let all = samples();
        for (i, s) in all.iter().enumerate() {
            assert!(all[i + 1..].iter().all(|o| o.name != s.name));
            assert!(!s.functions.is_empty());
        }
        assert!(sample("calls").is_some());
        assert!(sample("nope").is_none());
    }

    #[test]
    fn test_pc_not_an_operand() {
        for s in samples() {
            for f in &s.functions {
                for b in &f.blocks {
                    for i in &b.instructions {
                        assert!(i.operands.iter().all(|o| *o != Operand::Reg(PC)));
                    }
                }
            }
        }
    }
}

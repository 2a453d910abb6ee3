//! Decoding helper functions.
//! Turns one line of text plus the label table into an `Instruction`.

use log::debug;

use super::Instruction;
use super::JumpTarget;
use super::Mnemonic;
use super::Operation;
use super::RegId;
use super::ZERO;
use crate::alu::ALUOp;
use crate::alu::BranchCond;
use crate::error::DecodeErrorKind;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::program::LabelTable;

/// ABI register names, indexed by register number
const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3",
    "t4", "t5", "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// Maps a register token to its number.
/// Both `$8` and `$t0` work; `$` is optional.
/// Unknown names fall back to register 0, as MIPS tools traditionally do.
pub fn reg_index(token: &str) -> RegId {
    let name = token.trim().trim_start_matches('$');
    if let Ok(n) = name.parse::<u8>() {
        if n < 32 {
            return n;
        }
    }
    let name = name.to_ascii_lowercase();
    if name == "s8" {
        return 30;
    }
    match REGISTER_NAMES.iter().position(|r| *r == name) {
        Some(i) => i as RegId,
        None => {
            debug!("Unknown register '{}', using $zero", token);
            ZERO
        }
    }
}

/// Parses a decimal or `0x` hexadecimal immediate, optionally negative.
/// Values up to `u32::MAX` are accepted and wrap into 32 bits.
pub fn parse_imm(token: &str) -> Result<i32, DecodeErrorKind> {
    let t = token.trim();
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| DecodeErrorKind::Immediate(token.to_string()))?;

    let value = if negative { -magnitude } else { magnitude };
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return Err(DecodeErrorKind::Immediate(token.to_string()));
    }
    Ok(value as i32)
}

/// Splits `offset(base)` into its parts. A missing offset means 0.
pub fn parse_mem_operand(token: &str) -> Result<(i32, RegId), DecodeErrorKind> {
    let malformed = || DecodeErrorKind::MemoryOperand(token.to_string());
    let t = token.trim();
    let open = t.find('(').ok_or_else(malformed)?;
    let inner = t[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
    if inner.trim().is_empty() {
        return Err(malformed());
    }
    let offset = match t[..open].trim() {
        "" => 0,
        off => parse_imm(off).map_err(|_| malformed())?,
    };
    Ok((offset, reg_index(inner)))
}

/// Decodes one instruction line.
/// `index` is the instruction's position in the program image.
pub fn decode(
    text: &str,
    index: usize,
    labels: &LabelTable,
) -> SimulatorResult<Instruction> {
    let text = text.trim();
    let decode_error =
        |kind| SimulatorError::Decode { index, text: text.to_string(), kind };

    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    if head.is_empty() {
        return Err(decode_error(DecodeErrorKind::Empty));
    }
    let mnemonic = Mnemonic::parse(head)
        .ok_or_else(|| decode_error(DecodeErrorKind::UnknownMnemonic(head.to_string())))?;

    let ops: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .filter(|op| !op.is_empty())
        .collect();

    let expect = |expected: usize| {
        if ops.len() == expected {
            Ok(())
        } else {
            Err(decode_error(DecodeErrorKind::OperandCount {
                mnemonic: mnemonic.to_string(),
                expected,
                found: ops.len(),
            }))
        }
    };
    let imm = |token: &str| parse_imm(token).map_err(decode_error);
    let unresolved = |label: &str| SimulatorError::UnresolvedLabel {
        index,
        text: text.to_string(),
        label: label.to_string(),
    };

    use Mnemonic::*;
    let operation = match mnemonic {
        ADD | SUB | AND | OR | XOR | NOR | SLT => {
            expect(3)?;
            Operation::RAlu {
                op: r_type_op(mnemonic),
                rd: reg_index(ops[0]),
                rs: reg_index(ops[1]),
                rt: reg_index(ops[2]),
            }
        }
        SLLV | SRLV => {
            // sllv rd, rt, rs: the value is rt, the amount is rs
            expect(3)?;
            Operation::RAlu {
                op: if mnemonic == SLLV { ALUOp::SLL } else { ALUOp::SRL },
                rd: reg_index(ops[0]),
                rs: reg_index(ops[1]),
                rt: reg_index(ops[2]),
            }
        }
        SLL | SRL | SRA | ADDI | SLTI | ANDI | ORI => {
            expect(3)?;
            Operation::IAlu {
                op: i_type_op(mnemonic),
                rt: reg_index(ops[0]),
                rs: reg_index(ops[1]),
                imm: imm(ops[2])?,
            }
        }
        LUI | LI => {
            expect(2)?;
            Operation::IAlu {
                op: if mnemonic == LUI { ALUOp::LUI } else { ALUOp::ADD },
                rt: reg_index(ops[0]),
                rs: ZERO,
                imm: imm(ops[1])?,
            }
        }
        LA => {
            expect(2)?;
            let address = match labels.data(ops[1]) {
                Some(address) => address as i32,
                None => parse_imm(ops[1]).map_err(|_| unresolved(ops[1]))?,
            };
            Operation::IAlu { op: ALUOp::ADD, rt: reg_index(ops[0]), rs: ZERO, imm: address }
        }
        MOVE => {
            expect(2)?;
            Operation::RAlu {
                op: ALUOp::ADD,
                rd: reg_index(ops[0]),
                rs: reg_index(ops[1]),
                rt: ZERO,
            }
        }
        LW | SW => {
            expect(2)?;
            let rt = reg_index(ops[0]);
            let (offset, base) = parse_mem_operand(ops[1]).map_err(decode_error)?;
            if mnemonic == LW {
                Operation::Load { rt, base, offset }
            } else {
                Operation::Store { rt, base, offset }
            }
        }
        BEQ | BNE => {
            expect(3)?;
            let target = match labels.text(ops[2]) {
                Some(target) => target,
                None => {
                    // Numeric operands are offsets from the next instruction
                    let offset = parse_imm(ops[2]).map_err(|_| unresolved(ops[2]))?;
                    let target = index as i64 + 1 + offset as i64;
                    if target < 0 {
                        return Err(decode_error(DecodeErrorKind::Immediate(
                            ops[2].to_string(),
                        )));
                    }
                    target as usize
                }
            };
            Operation::Branch {
                cond: if mnemonic == BEQ { BranchCond::BEQ } else { BranchCond::BNE },
                rs: reg_index(ops[0]),
                rt: reg_index(ops[1]),
                target,
            }
        }
        J | JAL => {
            expect(1)?;
            let target = match labels.text(ops[0]) {
                Some(target) => target,
                None => {
                    let target = parse_imm(ops[0]).map_err(|_| unresolved(ops[0]))?;
                    usize::try_from(target).map_err(|_| {
                        decode_error(DecodeErrorKind::Immediate(ops[0].to_string()))
                    })?
                }
            };
            Operation::Jump { target: JumpTarget::Index(target), link: mnemonic == JAL }
        }
        JR => {
            expect(1)?;
            Operation::Jump { target: JumpTarget::Register(reg_index(ops[0])), link: false }
        }
        SYSCALL => {
            expect(0)?;
            Operation::SystemCall
        }
        NOP => {
            expect(0)?;
            Operation::NoOp
        }
    };

    Ok(Instruction::new(index, mnemonic, operation, text))
}

fn r_type_op(mnemonic: Mnemonic) -> ALUOp {
    match mnemonic {
        Mnemonic::SUB => ALUOp::SUB,
        Mnemonic::AND => ALUOp::AND,
        Mnemonic::OR => ALUOp::OR,
        Mnemonic::XOR => ALUOp::XOR,
        Mnemonic::NOR => ALUOp::NOR,
        Mnemonic::SLT => ALUOp::SLT,
        _ => ALUOp::ADD,
    }
}

fn i_type_op(mnemonic: Mnemonic) -> ALUOp {
    match mnemonic {
        Mnemonic::SLL => ALUOp::SLL,
        Mnemonic::SRL => ALUOp::SRL,
        Mnemonic::SRA => ALUOp::SRA,
        Mnemonic::SLTI => ALUOp::SLT,
        Mnemonic::ANDI => ALUOp::AND,
        Mnemonic::ORI => ALUOp::OR,
        _ => ALUOp::ADD,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::instruction::Category;

    fn labels() -> LabelTable {
        let mut labels = LabelTable::default();
        labels.insert_text("loop", 1);
        labels.insert_text("end", 6);
        labels.insert_data("array", 0x1000_0000);
        labels
    }

    #[test]
    fn register_names() {
        assert_eq!(reg_index("$zero"), 0);
        assert_eq!(reg_index("$t0"), 8);
        assert_eq!(reg_index("$31"), 31);
        assert_eq!(reg_index("sp"), 29);
        assert_eq!(reg_index("$s8"), 30);
        assert_eq!(reg_index("$bogus"), 0);
        assert_eq!(reg_index("$32"), 0);
    }

    #[test]
    fn immediates() {
        assert_eq!(parse_imm("-5"), Ok(-5));
        assert_eq!(parse_imm("0x10"), Ok(16));
        assert_eq!(parse_imm("0xffffffff"), Ok(-1));
        assert!(parse_imm("five").is_err());
        assert!(parse_imm("0x1_0000_0000").is_err());
    }

    #[test]
    fn memory_operands() {
        assert_eq!(parse_mem_operand("8($sp)"), Ok((8, 29)));
        assert_eq!(parse_mem_operand("-4($a0)"), Ok((-4, 4)));
        assert_eq!(parse_mem_operand("($t1)"), Ok((0, 9)));
        assert!(parse_mem_operand("8$sp").is_err());
        assert!(parse_mem_operand("4()").is_err());
    }

    #[test]
    fn decodes_r_and_i_types() {
        let add = decode("add $t2, $t0, $t1", 0, &labels()).unwrap();
        assert_eq!(
            add.operation,
            Operation::RAlu { op: ALUOp::ADD, rd: 10, rs: 8, rt: 9 }
        );
        assert_eq!(add.category(), Category::RAlu);

        let sll = decode("sll $t0, $t1, 2", 0, &labels()).unwrap();
        assert_eq!(
            sll.operation,
            Operation::IAlu { op: ALUOp::SLL, rt: 8, rs: 9, imm: 2 }
        );

        let li = decode("li $v0, 10", 0, &labels()).unwrap();
        assert_eq!(
            li.operation,
            Operation::IAlu { op: ALUOp::ADD, rt: 2, rs: 0, imm: 10 }
        );
    }

    #[test]
    fn decodes_memory_and_data_labels() {
        let lw = decode("lw $t0, 4($a0)", 3, &labels()).unwrap();
        assert_eq!(lw.operation, Operation::Load { rt: 8, base: 4, offset: 4 });
        assert_eq!(lw.index, 3);

        let la = decode("la $a0, array", 0, &labels()).unwrap();
        assert_eq!(
            la.operation,
            Operation::IAlu { op: ALUOp::ADD, rt: 4, rs: 0, imm: 0x1000_0000 }
        );
    }

    #[test]
    fn branch_targets_resolve_by_label_or_offset() {
        let beq = decode("beq $t4, $zero, end", 3, &labels()).unwrap();
        assert!(matches!(beq.operation, Operation::Branch { target: 6, .. }));

        let bne = decode("bne $t0, $t1, -3", 3, &labels()).unwrap();
        assert!(matches!(bne.operation, Operation::Branch { target: 1, .. }));

        let j = decode("j loop", 7, &labels()).unwrap();
        assert_eq!(
            j.operation,
            Operation::Jump { target: JumpTarget::Index(1), link: false }
        );
    }

    #[test]
    fn unknown_label_is_fatal() {
        let err = decode("j nowhere", 2, &labels()).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::UnresolvedLabel { index: 2, ref label, .. } if label == "nowhere"
        ));
    }

    #[test]
    fn malformed_lines_are_decode_errors() {
        let err = decode("mul $t0, $t1, $t2", 0, &labels()).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Decode { kind: DecodeErrorKind::UnknownMnemonic(_), .. }
        ));

        let err = decode("add $t0, $t1", 4, &labels()).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Decode {
                index: 4,
                kind: DecodeErrorKind::OperandCount { expected: 3, found: 2, .. },
                ..
            }
        ));

        let err = decode("lw $t0, $a0", 0, &labels()).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Decode { kind: DecodeErrorKind::MemoryOperand(_), .. }
        ));
    }
}

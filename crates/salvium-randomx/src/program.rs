//! RandomX VM program decoding.
//!
//! A program is 128 bytes of entropy followed by 256 8-byte instructions:
//! `{opcode, dst, src, mod, imm32le}`. The opcode byte selects the
//! operation through the fixed frequency table; CBRANCH targets are
//! resolved statically against the last writer of the condition register.

pub const PROGRAM_SIZE: usize = 256;
pub const ENTROPY_SIZE: usize = 128;
pub const PROGRAM_BUFFER_SIZE: usize = ENTROPY_SIZE + PROGRAM_SIZE * 8;

const STORE_L3_CONDITION: u8 = 14;
const CONDITION_OFFSET: u32 = 8; // RANDOMX_JUMP_OFFSET
const CONDITION_BITS: u32 = 8; // RANDOMX_JUMP_BITS

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmOp {
    IaddRs,
    IaddM,
    IsubR,
    IsubM,
    ImulR,
    ImulM,
    ImulhR,
    ImulhM,
    IsmulhR,
    IsmulhM,
    ImulRcp,
    InegR,
    IxorR,
    IxorM,
    IrorR,
    IrolR,
    IswapR,
    FswapR,
    FaddR,
    FaddM,
    FsubR,
    FsubM,
    FscalR,
    FmulR,
    FdivM,
    FsqrtR,
    Cbranch,
    Cfround,
    Istore,
    Nop,
}

/// Cumulative opcode frequency table (sums to 256).
fn decode_opcode(opcode: u8) -> VmOp {
    match opcode {
        0..=15 => VmOp::IaddRs,
        16..=22 => VmOp::IaddM,
        23..=38 => VmOp::IsubR,
        39..=45 => VmOp::IsubM,
        46..=61 => VmOp::ImulR,
        62..=65 => VmOp::ImulM,
        66..=69 => VmOp::ImulhR,
        70 => VmOp::ImulhM,
        71..=74 => VmOp::IsmulhR,
        75 => VmOp::IsmulhM,
        76..=83 => VmOp::ImulRcp,
        84..=85 => VmOp::InegR,
        86..=100 => VmOp::IxorR,
        101..=105 => VmOp::IxorM,
        106..=113 => VmOp::IrorR,
        114..=115 => VmOp::IrolR,
        116..=119 => VmOp::IswapR,
        120..=123 => VmOp::FswapR,
        124..=139 => VmOp::FaddR,
        140..=144 => VmOp::FaddM,
        145..=160 => VmOp::FsubR,
        161..=165 => VmOp::FsubM,
        166..=171 => VmOp::FscalR,
        172..=203 => VmOp::FmulR,
        204..=207 => VmOp::FdivM,
        208..=213 => VmOp::FsqrtR,
        214..=238 => VmOp::Cbranch,
        239 => VmOp::Cfround,
        240..=255 => VmOp::Istore,
    }
}

/// A decoded instruction, branch target resolved.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    pub op: VmOp,
    pub dst: usize,
    pub src: usize,
    pub imm: u32,
    /// `mod.mem != 0` selects L1, otherwise L2.
    pub mem_is_l1: bool,
    /// IADD_RS shift.
    pub shift: u32,
    /// ISTORE: mod.cond >= 14 widens to L3.
    pub store_l3: bool,
    /// CBRANCH: immediate with the condition bit planted.
    pub branch_imm: u64,
    /// CBRANCH: mask tested against the register.
    pub branch_mask: u64,
    /// CBRANCH: jump-back target (-1 jumps to program start).
    pub target: i32,
}

pub fn sign_extend(imm: u32) -> u64 {
    imm as i32 as u64
}

/// Decode the 2048 instruction bytes into executable form.
pub fn decode_program(bytes: &[u8]) -> Vec<Instr> {
    debug_assert_eq!(bytes.len(), PROGRAM_SIZE * 8);
    let mut program = Vec::with_capacity(PROGRAM_SIZE);
    // Last instruction index that wrote each integer register.
    let mut register_usage = [-1i32; 8];

    for (index, raw) in bytes.chunks_exact(8).enumerate() {
        let op = decode_opcode(raw[0]);
        let dst_byte = raw[1] as usize;
        let src_byte = raw[2] as usize;
        let modbyte = raw[3];
        let imm = u32::from_le_bytes(raw[4..8].try_into().unwrap());

        let dst = dst_byte % 8;
        let src = src_byte % 8;
        let mem_is_l1 = modbyte % 4 != 0;
        let shift = ((modbyte >> 2) % 4) as u32;
        let mod_cond = modbyte >> 4;

        let mut instr = Instr {
            op,
            dst,
            src,
            imm,
            mem_is_l1,
            shift,
            store_l3: mod_cond >= STORE_L3_CONDITION,
            branch_imm: 0,
            branch_mask: 0,
            target: -1,
        };

        match op {
            VmOp::Cbranch => {
                let condition_shift = mod_cond as u32 + CONDITION_OFFSET;
                instr.branch_mask = ((1u64 << CONDITION_BITS) - 1) << condition_shift;
                let mut branch_imm = sign_extend(imm) | (1u64 << condition_shift);
                // Clear the bit below the condition window so the addition
                // cannot carry into it.
                branch_imm &= !(1u64 << (condition_shift - 1));
                instr.branch_imm = branch_imm;
                instr.target = register_usage[dst];
                // A taken branch re-executes everything since the target,
                // so every register counts as modified here.
                register_usage = [index as i32; 8];
            }
            VmOp::IswapR => {
                register_usage[dst] = index as i32;
                register_usage[src] = index as i32;
            }
            VmOp::ImulRcp => {
                if !crate::reciprocal::is_zero_or_power_of_two(imm) {
                    register_usage[dst] = index as i32;
                } else {
                    instr.op = VmOp::Nop;
                }
            }
            VmOp::IaddRs
            | VmOp::IaddM
            | VmOp::IsubR
            | VmOp::IsubM
            | VmOp::ImulR
            | VmOp::ImulM
            | VmOp::ImulhR
            | VmOp::ImulhM
            | VmOp::IsmulhR
            | VmOp::IsmulhM
            | VmOp::InegR
            | VmOp::IxorR
            | VmOp::IxorM
            | VmOp::IrorR
            | VmOp::IrolR => {
                register_usage[dst] = index as i32;
            }
            // Float ops, stores, and rounding leave the integer file alone.
            _ => {}
        }

        program.push(instr);
    }

    program
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_table_covers_all_bytes() {
        // Every opcode byte decodes; spot-check the published frequencies.
        let mut counts = std::collections::HashMap::new();
        for opcode in 0..=255u8 {
            *counts.entry(decode_opcode(opcode)).or_insert(0) += 1;
        }
        assert_eq!(counts[&VmOp::IaddRs], 16);
        assert_eq!(counts[&VmOp::FmulR], 32);
        assert_eq!(counts[&VmOp::Cbranch], 25);
        assert_eq!(counts[&VmOp::Cfround], 1);
        assert_eq!(counts[&VmOp::Istore], 16);
        assert_eq!(counts.values().sum::<i32>(), 256);
    }

    #[test]
    fn cbranch_targets_last_writer() {
        let mut bytes = vec![0u8; PROGRAM_SIZE * 8];
        // Instruction 0: IADD_RS r3 (opcode 0, dst 3).
        bytes[0] = 0;
        bytes[1] = 3;
        // Instruction 1: CBRANCH on r3 (opcode 214).
        bytes[8] = 214;
        bytes[9] = 3;
        // Instruction 2: CBRANCH on r4 — after a branch, every register's
        // last writer is the branch itself.
        bytes[16] = 214;
        bytes[17] = 4;

        let program = decode_program(&bytes);
        assert_eq!(program[1].op, VmOp::Cbranch);
        assert_eq!(program[1].target, 0);
        assert_eq!(program[2].target, 1);
    }

    #[test]
    fn imul_rcp_with_power_of_two_is_nop() {
        let mut bytes = vec![0u8; PROGRAM_SIZE * 8];
        bytes[0] = 76; // IMUL_RCP
        bytes[4..8].copy_from_slice(&64u32.to_le_bytes()); // power of two
        let program = decode_program(&bytes);
        assert_eq!(program[0].op, VmOp::Nop);

        bytes[4..8].copy_from_slice(&3u32.to_le_bytes());
        let program = decode_program(&bytes);
        assert_eq!(program[0].op, VmOp::ImulRcp);
    }

    #[test]
    fn branch_imm_sets_condition_bit() {
        let mut bytes = vec![0u8; PROGRAM_SIZE * 8];
        bytes[0] = 214; // CBRANCH
        bytes[3] = 0; // mod.cond = 0 → shift = 8
        let program = decode_program(&bytes);
        assert_ne!(program[0].branch_imm & (1 << 8), 0);
        assert_eq!(program[0].branch_imm & (1 << 7), 0);
        assert_eq!(program[0].branch_mask, 0xFF << 8);
    }
}

//! SuperscalarHash: synthetic programs that keep a wide out-of-order CPU
//! busy for a fixed latency, used to expand the Argon2d cache into dataset
//! items.
//!
//! Generation simulates a 3-way decoder with fixed fetch configurations and
//! three execution ports (P0, P1, P5), tracking per-register readiness so
//! the emitted dependency chain matches the reference scheduler exactly.

use crate::blake2_gen::Blake2Generator;
use crate::reciprocal::{is_zero_or_power_of_two, reciprocal};

/// Target latency in simulated cycles.
pub const SUPERSCALAR_LATENCY: usize = 170;
const CYCLE_MAP_SIZE: usize = SUPERSCALAR_LATENCY + 4;
const MAX_PROGRAM_SIZE: usize = 512;
const LOOK_FORWARD_CYCLES: usize = 4;
const MAX_THROWAWAY_COUNT: usize = 256;
/// r5 doubles as the displacement register of IADD_RS.
const REGISTER_NEEDS_DISPLACEMENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsOp {
    IsubR,
    IxorR,
    IaddRs,
    ImulR,
    IrorC,
    IaddC7,
    IxorC7,
    IaddC8,
    IxorC8,
    IaddC9,
    IxorC9,
    ImulhR,
    IsmulhR,
    ImulRcp,
}

impl SsOp {
    fn is_multiplication(self) -> bool {
        matches!(self, SsOp::ImulR | SsOp::ImulhR | SsOp::IsmulhR | SsOp::ImulRcp)
    }
}

/// One emitted instruction plus its precomputed reciprocal when relevant.
#[derive(Debug, Clone, Copy)]
pub struct SsInstruction {
    pub op: SsOp,
    pub dst: usize,
    pub src: usize,
    pub imm32: u32,
    /// IADD_RS shift amount, from the mod byte.
    pub shift: u32,
    /// Precomputed for IMUL_RCP.
    pub reciprocal: u64,
}

pub struct SuperscalarProgram {
    pub instructions: Vec<SsInstruction>,
    /// Register feeding the next cache-line address.
    pub address_register: usize,
}

// ─── Execution ──────────────────────────────────────────────────────────────

/// Run the program over the 8-register file.
pub fn execute(program: &SuperscalarProgram, r: &mut [u64; 8]) {
    for instr in &program.instructions {
        match instr.op {
            SsOp::IsubR => r[instr.dst] = r[instr.dst].wrapping_sub(r[instr.src]),
            SsOp::IxorR => r[instr.dst] ^= r[instr.src],
            SsOp::IaddRs => {
                r[instr.dst] = r[instr.dst].wrapping_add(r[instr.src] << instr.shift)
            }
            SsOp::ImulR => r[instr.dst] = r[instr.dst].wrapping_mul(r[instr.src]),
            SsOp::IrorC => r[instr.dst] = r[instr.dst].rotate_right(instr.imm32),
            SsOp::IaddC7 | SsOp::IaddC8 | SsOp::IaddC9 => {
                r[instr.dst] = r[instr.dst].wrapping_add(instr.imm32 as i32 as u64)
            }
            SsOp::IxorC7 | SsOp::IxorC8 | SsOp::IxorC9 => {
                r[instr.dst] ^= instr.imm32 as i32 as u64
            }
            SsOp::ImulhR => {
                r[instr.dst] =
                    ((r[instr.dst] as u128 * r[instr.src] as u128) >> 64) as u64
            }
            SsOp::IsmulhR => {
                r[instr.dst] =
                    ((r[instr.dst] as i64 as i128 * r[instr.src] as i64 as i128) >> 64) as u64
            }
            SsOp::ImulRcp => r[instr.dst] = r[instr.dst].wrapping_mul(instr.reciprocal),
        }
    }
}

// ─── Generation: machine model ──────────────────────────────────────────────

/// Execution port bitmask: P0 = 1, P1 = 2, P5 = 4.
type Ports = u8;
const P0: Ports = 1;
const P1: Ports = 2;
const P5: Ports = 4;
const P01: Ports = P0 | P1;
const P05: Ports = P0 | P5;
const P015: Ports = P0 | P1 | P5;

#[derive(Clone, Copy)]
struct MacroOp {
    size: usize,
    latency: usize,
    uop1: Ports,
    /// Second uop for the 2-uop full multiplications; 0 if absent.
    uop2: Ports,
    /// Must wait for the previous macro-op of the same instruction.
    dependent: bool,
}

impl MacroOp {
    const fn simple(size: usize, latency: usize, uop1: Ports) -> Self {
        Self { size, latency, uop1, uop2: 0, dependent: false }
    }

    const fn eliminated(size: usize) -> Self {
        Self { size, latency: 0, uop1: 0, uop2: 0, dependent: false }
    }

    const fn dual(size: usize, latency: usize, uop1: Ports, uop2: Ports) -> Self {
        Self { size, latency, uop1, uop2, dependent: false }
    }

    const fn dependent(mut self) -> Self {
        self.dependent = true;
        self
    }

    fn is_eliminated(&self) -> bool {
        self.uop1 == 0
    }
}

const SUB_RR: MacroOp = MacroOp::simple(3, 1, P015);
const XOR_RR: MacroOp = MacroOp::simple(3, 1, P015);
const LEA_SIB: MacroOp = MacroOp::simple(4, 1, P01);
const IMUL_RR: MacroOp = MacroOp::simple(4, 3, P1);
const ROR_RI: MacroOp = MacroOp::simple(4, 1, P05);
const ADD_RI7: MacroOp = MacroOp::simple(7, 1, P015);
const ADD_RI8: MacroOp = MacroOp::simple(8, 1, P015);
const ADD_RI9: MacroOp = MacroOp::simple(9, 1, P015);
const XOR_RI7: MacroOp = MacroOp::simple(7, 1, P015);
const XOR_RI8: MacroOp = MacroOp::simple(8, 1, P015);
const XOR_RI9: MacroOp = MacroOp::simple(9, 1, P015);
const MOV_RR: MacroOp = MacroOp::eliminated(3);
const MOV_RI64: MacroOp = MacroOp::simple(10, 1, P015);
const MUL_R: MacroOp = MacroOp::dual(3, 4, P1, P5).dependent();
const IMUL_R_HI: MacroOp = MacroOp::dual(3, 4, P1, P5).dependent();
const IMUL_RR_DEP: MacroOp = MacroOp::simple(4, 3, P1).dependent();

/// Static description of one RandomX superscalar instruction.
struct InstrInfo {
    op: SsOp,
    ops: &'static [MacroOp],
    /// Macro-op whose completion produces the result.
    result_op: usize,
    /// Macro-op at which the destination is selected.
    dst_op: usize,
    /// Macro-op at which the source is selected; None for immediates.
    src_op: Option<usize>,
}

const INFO_ISUB_R: InstrInfo =
    InstrInfo { op: SsOp::IsubR, ops: &[SUB_RR], result_op: 0, dst_op: 0, src_op: Some(0) };
const INFO_IXOR_R: InstrInfo =
    InstrInfo { op: SsOp::IxorR, ops: &[XOR_RR], result_op: 0, dst_op: 0, src_op: Some(0) };
const INFO_IADD_RS: InstrInfo =
    InstrInfo { op: SsOp::IaddRs, ops: &[LEA_SIB], result_op: 0, dst_op: 0, src_op: Some(0) };
const INFO_IMUL_R: InstrInfo =
    InstrInfo { op: SsOp::ImulR, ops: &[IMUL_RR], result_op: 0, dst_op: 0, src_op: Some(0) };
const INFO_IROR_C: InstrInfo =
    InstrInfo { op: SsOp::IrorC, ops: &[ROR_RI], result_op: 0, dst_op: 0, src_op: None };
const INFO_IADD_C7: InstrInfo =
    InstrInfo { op: SsOp::IaddC7, ops: &[ADD_RI7], result_op: 0, dst_op: 0, src_op: None };
const INFO_IADD_C8: InstrInfo =
    InstrInfo { op: SsOp::IaddC8, ops: &[ADD_RI8], result_op: 0, dst_op: 0, src_op: None };
const INFO_IADD_C9: InstrInfo =
    InstrInfo { op: SsOp::IaddC9, ops: &[ADD_RI9], result_op: 0, dst_op: 0, src_op: None };
const INFO_IXOR_C7: InstrInfo =
    InstrInfo { op: SsOp::IxorC7, ops: &[XOR_RI7], result_op: 0, dst_op: 0, src_op: None };
const INFO_IXOR_C8: InstrInfo =
    InstrInfo { op: SsOp::IxorC8, ops: &[XOR_RI8], result_op: 0, dst_op: 0, src_op: None };
const INFO_IXOR_C9: InstrInfo =
    InstrInfo { op: SsOp::IxorC9, ops: &[XOR_RI9], result_op: 0, dst_op: 0, src_op: None };
const INFO_IMULH_R: InstrInfo = InstrInfo {
    op: SsOp::ImulhR,
    ops: &[MOV_RR, MUL_R, MOV_RR],
    result_op: 1,
    dst_op: 0,
    src_op: Some(1),
};
const INFO_ISMULH_R: InstrInfo = InstrInfo {
    op: SsOp::IsmulhR,
    ops: &[MOV_RR, IMUL_R_HI, MOV_RR],
    result_op: 1,
    dst_op: 0,
    src_op: Some(1),
};
const INFO_IMUL_RCP: InstrInfo = InstrInfo {
    op: SsOp::ImulRcp,
    ops: &[MOV_RI64, IMUL_RR_DEP],
    result_op: 1,
    dst_op: 1,
    src_op: None,
};

// ─── Decoder buffers ────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
struct DecoderBuffer {
    counts: &'static [usize],
    index: usize,
}

const BUFFER_484: DecoderBuffer = DecoderBuffer { counts: &[4, 8, 4], index: 0 };
const BUFFER_7333: DecoderBuffer = DecoderBuffer { counts: &[7, 3, 3, 3], index: 1 };
const BUFFER_3733: DecoderBuffer = DecoderBuffer { counts: &[3, 7, 3, 3], index: 2 };
const BUFFER_493: DecoderBuffer = DecoderBuffer { counts: &[4, 9, 3], index: 3 };
const BUFFER_4444: DecoderBuffer = DecoderBuffer { counts: &[4, 4, 4, 4], index: 4 };
const BUFFER_3310: DecoderBuffer = DecoderBuffer { counts: &[3, 3, 10], index: 5 };

const DEFAULT_BUFFERS: [DecoderBuffer; 4] = [BUFFER_484, BUFFER_7333, BUFFER_3733, BUFFER_493];

fn fetch_next(
    last_op: Option<SsOp>,
    decode_cycle: usize,
    mul_count: usize,
    gen: &mut Blake2Generator,
) -> DecoderBuffer {
    // A 64-bit multiplication occupies the first two 3-byte slots of the
    // next group, forcing the 3-3-10 configuration.
    if matches!(last_op, Some(SsOp::ImulhR) | Some(SsOp::IsmulhR)) {
        return BUFFER_3310;
    }
    // Keep port P1 saturated: one multiplication per decode cycle.
    if mul_count < decode_cycle + 1 {
        return BUFFER_4444;
    }
    // IMUL_RCP ends with a 4-byte multiplication slot, so the next buffer
    // must begin with a 4-byte slot.
    if matches!(last_op, Some(SsOp::ImulRcp)) {
        return if gen.get_u8() & 1 == 1 { BUFFER_484 } else { BUFFER_493 };
    }
    DEFAULT_BUFFERS[(gen.get_u8() & 3) as usize]
}

// ─── Instruction selection ──────────────────────────────────────────────────

const SLOT_3: [&InstrInfo; 2] = [&INFO_ISUB_R, &INFO_IXOR_R];
const SLOT_3L: [&InstrInfo; 4] = [&INFO_ISUB_R, &INFO_IXOR_R, &INFO_IMULH_R, &INFO_ISMULH_R];
const SLOT_4: [&InstrInfo; 2] = [&INFO_IROR_C, &INFO_IADD_RS];
const SLOT_7: [&InstrInfo; 2] = [&INFO_IXOR_C7, &INFO_IADD_C7];
const SLOT_8: [&InstrInfo; 2] = [&INFO_IXOR_C8, &INFO_IADD_C8];
const SLOT_9: [&InstrInfo; 2] = [&INFO_IXOR_C9, &INFO_IADD_C9];

fn select_info(
    gen: &mut Blake2Generator,
    slot_size: usize,
    fetch_index: usize,
    is_last: bool,
) -> &'static InstrInfo {
    match slot_size {
        3 if is_last => SLOT_3L[(gen.get_u8() & 3) as usize],
        3 => SLOT_3[(gen.get_u8() & 1) as usize],
        4 => {
            // The 4-4-4-4 buffer exists to issue multiplications.
            if fetch_index == BUFFER_4444.index && !is_last {
                &INFO_IMUL_R
            } else {
                SLOT_4[(gen.get_u8() & 1) as usize]
            }
        }
        7 => SLOT_7[(gen.get_u8() & 1) as usize],
        8 => SLOT_8[(gen.get_u8() & 1) as usize],
        9 => SLOT_9[(gen.get_u8() & 1) as usize],
        10 => &INFO_IMUL_RCP,
        _ => unreachable!("no decoder slot of size {slot_size}"),
    }
}

// ─── Register model ─────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct RegisterInfo {
    latency: usize,
    last_op_group: Option<SsOp>,
    last_op_par: u64,
}

impl RegisterInfo {
    const DEFAULT: RegisterInfo =
        RegisterInfo { latency: 0, last_op_group: None, last_op_par: u64::MAX };
}

/// In-flight instruction being scheduled.
struct PendingInstruction {
    info: &'static InstrInfo,
    dst: usize,
    src: usize,
    imm32: u32,
    shift: u32,
    /// Dependency-group key: the opcode family for chaining rules.
    op_group: SsOp,
    op_group_par: u64,
    group_par_is_source: bool,
    can_reuse: bool,
}

impl PendingInstruction {
    fn create(info: &'static InstrInfo, gen: &mut Blake2Generator) -> Self {
        let mut this = Self {
            info,
            dst: 0,
            src: usize::MAX,
            imm32: 0,
            shift: 0,
            op_group: info.op,
            op_group_par: u64::MAX,
            group_par_is_source: false,
            can_reuse: false,
        };
        match info.op {
            SsOp::IsubR => {
                // Shares the additive group with IADD_RS.
                this.op_group = SsOp::IaddRs;
                this.group_par_is_source = true;
            }
            SsOp::IxorR | SsOp::ImulR => {
                this.group_par_is_source = true;
            }
            SsOp::IaddRs => {
                let modbyte = gen.get_u8();
                this.shift = ((modbyte >> 2) % 4) as u32;
                this.group_par_is_source = true;
            }
            SsOp::IrorC => {
                loop {
                    this.imm32 = (gen.get_u8() & 63) as u32;
                    if this.imm32 != 0 {
                        break;
                    }
                }
            }
            SsOp::IaddC7 | SsOp::IaddC8 | SsOp::IaddC9 => {
                this.imm32 = gen.get_u32();
                this.op_group = SsOp::IaddC7;
            }
            SsOp::IxorC7 | SsOp::IxorC8 | SsOp::IxorC9 => {
                this.imm32 = gen.get_u32();
                this.op_group = SsOp::IxorC7;
            }
            SsOp::ImulhR | SsOp::IsmulhR => {
                this.can_reuse = true;
                this.op_group_par = gen.get_u32() as u64;
            }
            SsOp::ImulRcp => {
                loop {
                    this.imm32 = gen.get_u32();
                    if !is_zero_or_power_of_two(this.imm32) {
                        break;
                    }
                }
            }
        }
        this
    }

    fn select_source(
        &mut self,
        cycle: usize,
        registers: &[RegisterInfo; 8],
        gen: &mut Blake2Generator,
    ) -> bool {
        let available: Vec<usize> =
            (0..8).filter(|&i| registers[i].latency <= cycle).collect();

        // With exactly two candidates for IADD_RS, prefer r5 as the source
        // since it can never be the destination.
        if available.len() == 2
            && self.info.op == SsOp::IaddRs
            && available.contains(&REGISTER_NEEDS_DISPLACEMENT)
        {
            self.src = REGISTER_NEEDS_DISPLACEMENT;
            self.op_group_par = self.src as u64;
            return true;
        }

        match pick(&available, gen) {
            Some(reg) => {
                self.src = reg;
                if self.group_par_is_source {
                    self.op_group_par = reg as u64;
                }
                true
            }
            None => false,
        }
    }

    fn select_destination(
        &mut self,
        cycle: usize,
        allow_chained_mul: bool,
        registers: &[RegisterInfo; 8],
        gen: &mut Blake2Generator,
    ) -> bool {
        let available: Vec<usize> = (0..8)
            .filter(|&i| {
                registers[i].latency <= cycle
                    && (self.can_reuse || i != self.src)
                    && (allow_chained_mul
                        || self.op_group != SsOp::ImulR
                        || registers[i].last_op_group != Some(SsOp::ImulR))
                    && (registers[i].last_op_group != Some(self.op_group)
                        || registers[i].last_op_par != self.op_group_par)
                    && (self.info.op != SsOp::IaddRs || i != REGISTER_NEEDS_DISPLACEMENT)
            })
            .collect();
        match pick(&available, gen) {
            Some(reg) => {
                self.dst = reg;
                true
            }
            None => false,
        }
    }
}

fn pick(candidates: &[usize], gen: &mut Blake2Generator) -> Option<usize> {
    match candidates.len() {
        0 => None,
        1 => Some(candidates[0]),
        n => Some(candidates[gen.get_u32() as usize % n]),
    }
}

// ─── Port scheduling ────────────────────────────────────────────────────────

struct PortSchedule {
    busy: [[bool; 3]; CYCLE_MAP_SIZE],
}

impl PortSchedule {
    fn new() -> Self {
        Self { busy: [[false; 3]; CYCLE_MAP_SIZE] }
    }

    /// Earliest cycle >= `cycle` with a free port for `uop`; P5 preferred,
    /// then P0, then P1 (leaving P1 free for multiplications).
    fn schedule_uop(&mut self, uop: Ports, cycle: usize, commit: bool) -> Option<usize> {
        let mut cycle = cycle;
        while cycle < CYCLE_MAP_SIZE {
            if uop & P5 != 0 && !self.busy[cycle][2] {
                if commit {
                    self.busy[cycle][2] = true;
                }
                return Some(cycle);
            }
            if uop & P0 != 0 && !self.busy[cycle][0] {
                if commit {
                    self.busy[cycle][0] = true;
                }
                return Some(cycle);
            }
            if uop & P1 != 0 && !self.busy[cycle][1] {
                if commit {
                    self.busy[cycle][1] = true;
                }
                return Some(cycle);
            }
            cycle += 1;
        }
        None
    }

    fn schedule_mop(
        &mut self,
        mop: &MacroOp,
        cycle: usize,
        dep_cycle: usize,
        commit: bool,
    ) -> Option<usize> {
        let mut cycle = if mop.dependent { cycle.max(dep_cycle) } else { cycle };
        if mop.is_eliminated() {
            return Some(cycle);
        }
        if mop.uop2 == 0 {
            return self.schedule_uop(mop.uop1, cycle, commit);
        }
        // Both uops must issue in the same cycle.
        while cycle < CYCLE_MAP_SIZE {
            let c1 = self.schedule_uop(mop.uop1, cycle, false);
            let c2 = self.schedule_uop(mop.uop2, cycle, false);
            if c1 == Some(cycle) && c2 == Some(cycle) {
                if commit {
                    self.schedule_uop(mop.uop1, cycle, true);
                    self.schedule_uop(mop.uop2, cycle, true);
                }
                return Some(cycle);
            }
            cycle += 1;
        }
        None
    }
}

// ─── Generator ──────────────────────────────────────────────────────────────

/// Generate one superscalar program from the Blake2 stream.
pub fn generate(gen: &mut Blake2Generator) -> SuperscalarProgram {
    let mut ports = PortSchedule::new();
    let mut registers = [RegisterInfo::DEFAULT; 8];
    let mut program = Vec::with_capacity(MAX_PROGRAM_SIZE);

    let mut current: Option<PendingInstruction> = None;
    let mut last_emitted: Option<SsOp> = None;
    let mut macro_op_index = 0usize;
    let mut cycle = 0usize;
    let mut dep_cycle = 0usize;
    let mut mul_count = 0usize;
    let mut throw_away_count = 0usize;
    let mut ports_saturated = false;

    let mut decode_cycle = 0;
    while decode_cycle < SUPERSCALAR_LATENCY
        && !ports_saturated
        && program.len() < MAX_PROGRAM_SIZE
    {
        let buffer = fetch_next(last_emitted, decode_cycle, mul_count, gen);

        let mut buffer_index = 0;
        'slots: while buffer_index < buffer.counts.len() {
            let top_cycle = cycle;

            if current.as_ref().map_or(true, |c| macro_op_index >= c.info.ops.len()) {
                if ports_saturated || program.len() >= MAX_PROGRAM_SIZE {
                    break;
                }
                let is_last = buffer_index == buffer.counts.len() - 1;
                let info =
                    select_info(gen, buffer.counts[buffer_index], buffer.index, is_last);
                current = Some(PendingInstruction::create(info, gen));
                macro_op_index = 0;
            }
            let instr = current.as_mut().expect("instruction selected above");
            let mop = instr.info.ops[macro_op_index];

            // Earliest execution slot, without commitment.
            let Some(mut schedule_cycle) = ports.schedule_mop(&mop, cycle, dep_cycle, false)
            else {
                ports_saturated = true;
                break;
            };

            // Operand selection may stall for a few cycles; a stuck
            // instruction is thrown away entirely.
            if instr.info.src_op == Some(macro_op_index) {
                let mut forward = 0;
                while forward < LOOK_FORWARD_CYCLES
                    && !instr.select_source(schedule_cycle, &registers, gen)
                {
                    schedule_cycle += 1;
                    cycle += 1;
                    forward += 1;
                }
                if forward == LOOK_FORWARD_CYCLES {
                    if throw_away_count < MAX_THROWAWAY_COUNT {
                        throw_away_count += 1;
                        macro_op_index = instr.info.ops.len();
                        continue 'slots;
                    }
                    break;
                }
            }
            if instr.info.dst_op == macro_op_index {
                let mut forward = 0;
                while forward < LOOK_FORWARD_CYCLES
                    && !instr.select_destination(
                        schedule_cycle,
                        throw_away_count > 0,
                        &registers,
                        gen,
                    )
                {
                    schedule_cycle += 1;
                    cycle += 1;
                    forward += 1;
                }
                if forward == LOOK_FORWARD_CYCLES {
                    if throw_away_count < MAX_THROWAWAY_COUNT {
                        throw_away_count += 1;
                        macro_op_index = instr.info.ops.len();
                        continue 'slots;
                    }
                    break;
                }
            }
            throw_away_count = 0;

            // Commit to the port map at the final cycle.
            let Some(committed) = ports.schedule_mop(&mop, schedule_cycle, schedule_cycle, true)
            else {
                ports_saturated = true;
                break;
            };
            dep_cycle = committed + mop.latency;

            if instr.info.result_op == macro_op_index {
                registers[instr.dst].latency = dep_cycle;
                registers[instr.dst].last_op_group = Some(instr.op_group);
                registers[instr.dst].last_op_par = instr.op_group_par;
            }

            buffer_index += 1;
            macro_op_index += 1;

            if committed >= SUPERSCALAR_LATENCY {
                ports_saturated = true;
            }
            cycle = top_cycle;

            if macro_op_index >= instr.info.ops.len() {
                let op = instr.info.op;
                program.push(SsInstruction {
                    op,
                    dst: instr.dst,
                    src: if instr.src == usize::MAX { instr.dst } else { instr.src },
                    imm32: instr.imm32,
                    shift: instr.shift,
                    reciprocal: if op == SsOp::ImulRcp { reciprocal(instr.imm32) } else { 0 },
                });
                last_emitted = Some(op);
                if op.is_multiplication() {
                    mul_count += 1;
                }
            }
        }
        cycle += 1;
        decode_cycle += 1;
    }

    // The address register is the one with the longest ASIC-style
    // dependency chain (forces sequential evaluation on specialized
    // hardware).
    let mut asic_latency = [0usize; 8];
    for instr in &program {
        let lat_dst = asic_latency[instr.dst] + 1;
        let lat_src = if instr.dst != instr.src { asic_latency[instr.src] + 1 } else { 0 };
        asic_latency[instr.dst] = lat_dst.max(lat_src);
    }
    let mut address_register = 0;
    for i in 1..8 {
        if asic_latency[i] > asic_latency[address_register] {
            address_register = i;
        }
    }

    SuperscalarProgram { instructions: program, address_register }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program(nonce: u32) -> SuperscalarProgram {
        let mut gen = Blake2Generator::new(b"test key 000", nonce);
        generate(&mut gen)
    }

    #[test]
    fn generation_is_deterministic() {
        let a = sample_program(0);
        let b = sample_program(0);
        assert_eq!(a.instructions.len(), b.instructions.len());
        assert_eq!(a.address_register, b.address_register);
        for (x, y) in a.instructions.iter().zip(&b.instructions) {
            assert_eq!(x.op, y.op);
            assert_eq!(x.dst, y.dst);
            assert_eq!(x.src, y.src);
            assert_eq!(x.imm32, y.imm32);
        }
    }

    #[test]
    fn programs_are_substantial() {
        // The scheduler should fill most of the latency window: reference
        // programs average ~450 instructions and never exceed 512.
        let program = sample_program(0);
        assert!(program.instructions.len() > 200, "got {}", program.instructions.len());
        assert!(program.instructions.len() <= MAX_PROGRAM_SIZE);
    }

    #[test]
    fn programs_are_multiplication_heavy() {
        let program = sample_program(1);
        let muls = program
            .instructions
            .iter()
            .filter(|i| i.op.is_multiplication())
            .count();
        // Roughly one multiplication per decode cycle.
        assert!(muls * 3 > program.instructions.len(), "{muls} muls");
    }

    #[test]
    fn different_nonces_differ() {
        let a = sample_program(0);
        let b = sample_program(1);
        let same = a
            .instructions
            .iter()
            .zip(&b.instructions)
            .filter(|(x, y)| x.op == y.op && x.dst == y.dst && x.src == y.src)
            .count();
        assert!(same < a.instructions.len().min(b.instructions.len()));
    }

    #[test]
    fn execution_mixes_all_registers() {
        let program = sample_program(2);
        let mut r = [0u64; 8];
        for (i, reg) in r.iter_mut().enumerate() {
            *reg = 0x0123_4567_89AB_CDEF ^ i as u64;
        }
        let before = r;
        execute(&program, &mut r);
        for i in 0..8 {
            assert_ne!(r[i], before[i], "register {i} untouched");
        }
    }

    #[test]
    fn execution_is_deterministic() {
        let program = sample_program(3);
        let mut r1 = [7u64; 8];
        let mut r2 = [7u64; 8];
        execute(&program, &mut r1);
        execute(&program, &mut r2);
        assert_eq!(r1, r2);
    }

    #[test]
    fn iadd_rs_never_targets_r5() {
        // r5 carries the displacement and is excluded as IADD_RS dst.
        for nonce in 0..4 {
            let program = sample_program(nonce);
            for instr in &program.instructions {
                if instr.op == SsOp::IaddRs {
                    assert_ne!(instr.dst, REGISTER_NEEDS_DISPLACEMENT);
                }
            }
        }
    }
}

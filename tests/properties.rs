use dcpu::cpu::alu;
use dcpu::cpu::decode::{encode, instruction_length, BasicOpcode, Instruction};
use dcpu::cpu::operand::{resolve, Location};
use dcpu::{Cpu, Reg, Registers, VirtualMachine};
use proptest::prelude::*;

const A: u16 = 0x00;
const B: u16 = 0x01;

fn basic(op: BasicOpcode, a: u16, b: u16) -> u16 {
    encode(&Instruction::Basic { op, a, b })
}

fn arb_registers() -> impl Strategy<Value = Registers> {
    (any::<[u16; 8]>(), any::<u16>(), any::<u16>(), any::<u16>())
        .prop_map(|(gp, sp, pc, o)| Registers { gp, sp, pc, o })
}

fn trailing_code() -> impl Strategy<Value = u16> {
    prop_oneof![0x10u16..=0x17, Just(0x1E), Just(0x1F)]
}

/// Run `op A, B` with the given register values.
fn run_op(op: BasicOpcode, a: u16, b: u16) -> (Cpu, u32) {
    let mut cpu = Cpu::with_program(&[basic(op, A, B)]).unwrap();
    cpu.regs.set(Reg::A, a);
    cpu.regs.set(Reg::B, b);
    let cycles = cpu.step().unwrap();
    (cpu, cycles)
}

proptest! {
    #[test]
    fn literal_codes_are_read_only(code in 0x20u16..=0x3F, regs in arb_registers(), value in any::<u16>()) {
        let mut cpu = Cpu::new();
        cpu.regs = regs;
        let before = cpu.clone();
        let mut cycles = 0;

        let loc = resolve(&mut cpu, code, &mut cycles);
        prop_assert_eq!(loc, Location::ReadOnly(code - 0x20));
        prop_assert_eq!(loc.read(&cpu), code - 0x20);

        loc.write(&mut cpu, value);
        prop_assert!(cpu == before);
        prop_assert_eq!(cycles, 0);
    }

    #[test]
    fn trailing_codes_consume_one_word(code in trailing_code(), regs in arb_registers(), word in any::<u16>()) {
        let mut cpu = Cpu::new();
        cpu.regs = regs;
        let pc = cpu.regs.pc;
        cpu.mem.write(pc, word);
        let mut cycles = 0;

        let loc = resolve(&mut cpu, code, &mut cycles);

        prop_assert_eq!(cpu.regs.pc, pc.wrapping_add(1));
        prop_assert_eq!(cycles, 1);
        let expected = match code {
            0x1E => Location::Memory(word),
            0x1F => Location::ReadOnly(word),
            _ => Location::Memory(cpu.regs.gp[(code & 7) as usize].wrapping_add(word)),
        };
        prop_assert_eq!(loc, expected);
    }

    #[test]
    fn add_matches_wide_model(a in any::<u16>(), b in any::<u16>()) {
        let (cpu, cycles) = run_op(BasicOpcode::Add, a, b);
        let wide = a as u32 + b as u32;
        prop_assert_eq!(cpu.regs.get(Reg::A), wide as u16);
        prop_assert_eq!(cpu.regs.o, if wide > 0xFFFF { 1 } else { 0 });
        prop_assert_eq!(cycles, 1);
    }

    #[test]
    fn sub_matches_wide_model(a in any::<u16>(), b in any::<u16>()) {
        let (cpu, _) = run_op(BasicOpcode::Sub, a, b);
        let wide = a as i32 - b as i32;
        prop_assert_eq!(cpu.regs.get(Reg::A), wide as u16);
        prop_assert_eq!(cpu.regs.o, if wide < 0 { 0xFFFF } else { 0 });
    }

    /// Overflow for ADD/SUB has two readings: a 0/1 and 0/0xFFFF sentinel,
    /// or the carry bits `(a + b) >> 16` and `(a - b) >> 16` taken from a
    /// signed 32-bit intermediate. They must agree for every input.
    #[test]
    fn add_sub_overflow_sentinel_agrees_with_carry_bits(a in any::<u16>(), b in any::<u16>()) {
        let carry_bits = ((a as i32 + b as i32) >> 16) as u16;
        prop_assert_eq!(alu::add(a, b).1, carry_bits);

        let borrow_bits = ((a as i32 - b as i32) >> 16) as u16;
        prop_assert_eq!(alu::sub(a, b).1, borrow_bits);
    }

    #[test]
    fn mul_matches_wide_model(a in any::<u16>(), b in any::<u16>()) {
        let (cpu, cycles) = run_op(BasicOpcode::Mul, a, b);
        let wide = a as u64 * b as u64;
        prop_assert_eq!(cpu.regs.get(Reg::A), wide as u16);
        prop_assert_eq!(cpu.regs.o, (wide >> 16) as u16);
        prop_assert_eq!(cycles, 2);
    }

    #[test]
    fn shifts_match_wide_model(a in any::<u16>(), b in 0u16..40) {
        let (cpu, _) = run_op(BasicOpcode::Shl, a, b);
        let wide = (a as u128) << b;
        prop_assert_eq!(cpu.regs.get(Reg::A), wide as u16);
        prop_assert_eq!(cpu.regs.o, (wide >> 16) as u16);

        let (cpu, _) = run_op(BasicOpcode::Shr, a, b);
        prop_assert_eq!(cpu.regs.get(Reg::A), ((a as u128) >> b) as u16);
        prop_assert_eq!(cpu.regs.o, (((a as u128) << 16) >> b) as u16);
    }

    #[test]
    fn division_by_zero_is_zero(a in any::<u16>(), o in any::<u16>()) {
        let mut cpu = Cpu::with_program(&[basic(BasicOpcode::Div, A, B), basic(BasicOpcode::Mod, 0x02, B)]).unwrap();
        cpu.regs.set(Reg::A, a);
        cpu.regs.set(Reg::C, a);
        cpu.regs.o = o;

        prop_assert_eq!(cpu.step(), Ok(3));
        prop_assert_eq!(cpu.regs.get(Reg::A), 0);
        prop_assert_eq!(cpu.regs.o, 0);

        cpu.regs.o = o;
        prop_assert_eq!(cpu.step(), Ok(3));
        prop_assert_eq!(cpu.regs.get(Reg::C), 0);
        prop_assert_eq!(cpu.regs.o, o);
    }

    #[test]
    fn false_condition_skips_exactly_one_instruction(
        regs in arb_registers(),
        next in any::<u16>(),
        trailing in any::<[u16; 2]>(),
    ) {
        // IFN A, A is always false.
        let mut cpu = Cpu::new();
        cpu.regs = regs;
        cpu.regs.pc = 0x100;
        cpu.mem.write(0x100, basic(BasicOpcode::Ifn, A, A));
        cpu.mem.write(0x101, next);
        cpu.mem.write(0x102, trailing[0]);
        cpu.mem.write(0x103, trailing[1]);
        let before = cpu.clone();

        let cycles = cpu.step().unwrap();

        let trailing_words = |code: u16| matches!(code, 0x10..=0x17 | 0x1E | 0x1F) as u16;
        let length = if next & 0xF == 0 {
            1 + trailing_words(next >> 10)
        } else {
            1 + trailing_words((next >> 4) & 0x3F) + trailing_words(next >> 10)
        };
        prop_assert_eq!(length, instruction_length(next));
        prop_assert_eq!(cpu.regs.pc, 0x101 + length);
        prop_assert_eq!(cycles, 3);

        // Nothing but PC changed.
        cpu.regs.pc = before.regs.pc;
        prop_assert_eq!(&cpu.regs, &before.regs);
        prop_assert!(cpu.mem == before.mem);
    }

    #[test]
    fn reset_restores_loaded_program(
        program in prop::collection::vec(any::<u16>(), 0..64),
        steps in 0usize..32,
    ) {
        let mut vm = VirtualMachine::new();
        vm.load(&program).unwrap();
        for _ in 0..steps {
            // Arbitrary words may not decode; that is fine here.
            let _ = vm.step();
        }

        vm.reset().unwrap();

        let cpu = vm.snapshot().unwrap();
        prop_assert_eq!(&cpu.regs, &Registers::new());
        prop_assert_eq!(&cpu.mem.as_slice()[..program.len()], program.as_slice());
        prop_assert!(!cpu.is_halted());
    }
}

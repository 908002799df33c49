//! DCPU-16 Virtual Machine - CLI Entry Point
//!
//! Commands:
//! - `dcpu-vm run <program>` - Run a hex program in real time until it halts
//! - `dcpu-vm step <program>` - Execute a hex program one instruction at a time

use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use dcpu::cpu::registers::STATE_HEADER;
use dcpu::{Cpu, VirtualMachine, VmConfig};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dcpu-vm")]
#[command(version)]
#[command(about = "A real-time paced emulator of the DCPU-16 processor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program on the real-time scheduler until it halts
    Run {
        /// Path to the hex program (one word per line)
        program: String,
        /// Execution frequency in cycles per second
        #[arg(short, long, default_value_t = dcpu::vm::DEFAULT_FREQUENCY)]
        frequency: u64,
        /// Give up after this many seconds if the program has not halted
        #[arg(short, long, default_value = "10")]
        timeout: u64,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute a program one instruction at a time, printing the state after each
    Step {
        /// Path to the hex program (one word per line)
        program: String,
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "1000")]
        max_steps: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, frequency, timeout, json } => {
            run_program(&program, frequency, timeout, json);
        }
        Commands::Step { program, max_steps } => {
            step_program(&program, max_steps);
        }
    }
}

fn load_vm(path: &str, config: VmConfig) -> VirtualMachine {
    let words = match dcpu::load_hex_file(path) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mut vm = match VirtualMachine::with_config(config) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = vm.load(&words) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!("Loaded {} words from {}", words.len(), path);
    vm
}

fn run_program(path: &str, frequency: u64, timeout: u64, json: bool) {
    let mut vm = load_vm(path, VmConfig { frequency });

    let (halt_tx, halt_rx) = crossbeam_channel::bounded::<Cpu>(1);
    vm.on_halt(move |cpu| {
        let _ = halt_tx.try_send(cpu.clone());
    });

    if let Err(e) = vm.start() {
        eprintln!("Failed to start: {}", e);
        std::process::exit(1);
    }

    let halted = match halt_rx.recv_timeout(Duration::from_secs(timeout)) {
        Ok(cpu) => {
            println!("The DCPU has halted.");
            Some(cpu)
        }
        Err(RecvTimeoutError::Timeout) => {
            println!("No halt after {}s, stopping.", timeout);
            None
        }
        Err(RecvTimeoutError::Disconnected) => None,
    };

    if let Err(e) = vm.stop() {
        eprintln!("Execution failed: {}", e);
        std::process::exit(1);
    }

    let Some(cpu) = halted.or_else(|| vm.snapshot()) else {
        return;
    };
    print_state(&cpu, json);
}

fn step_program(path: &str, max_steps: u64) {
    let vm = load_vm(path, VmConfig::default());

    println!("{}", STATE_HEADER);
    for counter in 0..max_steps {
        if let Err(e) = vm.step() {
            eprintln!("Execution failed: {}", e);
            std::process::exit(1);
        }

        // Repeat the header every 15 lines
        let state = vm.with_cpu(|cpu| {
            let header = counter > 0 && counter % 15 == 0;
            (cpu.regs.state_line(header), cpu.is_halted())
        });
        let Some((line, halted)) = state else {
            return;
        };
        println!("{}", line);

        if halted {
            println!("The DCPU has halted.");
            return;
        }
    }
}

fn print_state(cpu: &Cpu, json: bool) {
    if json {
        match serde_json::to_string_pretty(&cpu.regs) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode state: {}", e),
        }
        return;
    }

    println!();
    println!("{}", cpu.regs.state_line(true));
    println!("Cycles: {}", cpu.cycles);
    println!("State: {:?}", cpu.state);
}

//! Real-time execution of a loaded program.
//!
//! [`VirtualMachine`] owns the [`Cpu`] and the program it was built from.
//! It can single-step the CPU from the caller's thread, or run it on a
//! background worker that paces instructions to a configured frequency:
//! after each step the worker waits `cycles * (1s / frequency)` before the
//! next one, yielding while it waits.
//!
//! The worker stops when the CPU halts (then the halt handler is called
//! once with the final state), when it hits a decode error, or when
//! [`VirtualMachine::stop`] asks it to. Stopping is cooperative: the flag is
//! checked between instructions, never in the middle of one.
//!
//! ```
//! use dcpu::vm::VirtualMachine;
//!
//! let mut vm = VirtualMachine::new();
//! // SET A, 0x30 ; SET PC, 2 (jumps to itself)
//! vm.load(&[0x7C01, 0x0030, 0x89C1]).unwrap();
//!
//! vm.step().unwrap();
//! assert_eq!(vm.snapshot().unwrap().regs.gp[0], 0x30);
//!
//! vm.step().unwrap();
//! assert!(vm.snapshot().unwrap().is_halted());
//! ```

use crate::cpu::{Cpu, CpuError, MemoryError};
use log::{debug, error, info};
use serde::{Serialize, Deserialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default execution frequency in cycles per second.
pub const DEFAULT_FREQUENCY: u64 = 100_000;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Virtual machine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Cycles per second.
    pub frequency: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
        }
    }
}

/// Called from the worker thread when the CPU halts.
pub type HaltHandler = Arc<dyn Fn(&Cpu) + Send + Sync>;

/// State shared with the worker, all behind one lock.
#[derive(Default)]
struct Shared {
    program: Option<Vec<u16>>,
    cpu: Option<Cpu>,
    running: bool,
}

struct Worker {
    keep_running: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), CpuError>>,
}

/// Loads, steps and runs a DCPU-16 program.
pub struct VirtualMachine {
    shared: Arc<Mutex<Shared>>,
    frequency: Arc<AtomicU64>,
    on_halt: Option<HaltHandler>,
    worker: Option<Worker>,
}

impl VirtualMachine {
    /// Create a virtual machine with the default frequency and no program.
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            frequency: Arc::new(AtomicU64::new(DEFAULT_FREQUENCY)),
            on_halt: None,
            worker: None,
        }
    }

    pub fn with_config(config: VmConfig) -> Result<Self, VmError> {
        let vm = Self::new();
        vm.set_frequency(config.frequency)?;
        Ok(vm)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }

    /// Copy `program` to the start of a fresh CPU.
    ///
    /// The program is kept so [`reset`](Self::reset) can rebuild the CPU.
    pub fn load(&mut self, program: &[u16]) -> Result<(), VmError> {
        if self.is_running() {
            return Err(VmError::Running);
        }
        self.discard_finished();

        let mut shared = self.lock();
        let cpu = Cpu::with_program(program)?;
        shared.program = Some(program.to_vec());
        shared.cpu = Some(cpu);
        debug!("loaded {} words", program.len());
        Ok(())
    }

    /// Rebuild the CPU from the loaded program. Does nothing if no program
    /// has been loaded.
    pub fn reset(&mut self) -> Result<(), VmError> {
        if self.is_running() {
            return Err(VmError::Running);
        }
        self.discard_finished();

        let mut shared = self.lock();
        if let Some(program) = &shared.program {
            let cpu = Cpu::with_program(program)?;
            shared.cpu = Some(cpu);
            debug!("reset");
        }
        Ok(())
    }

    /// Execute one instruction on the caller's thread.
    ///
    /// Returns the cycles it took. Not available while the worker runs.
    pub fn step(&self) -> Result<u32, VmError> {
        let mut shared = self.lock();
        if shared.running {
            return Err(VmError::Running);
        }

        let cpu = shared.cpu.as_mut().ok_or(VmError::NoProgram)?;
        Ok(cpu.step()?)
    }

    /// Start running the program on a background thread.
    ///
    /// The CPU continues from its current state. A decode error from an
    /// earlier run that was never collected by [`stop`](Self::stop) is
    /// dropped.
    pub fn start(&mut self) -> Result<(), VmError> {
        {
            let shared = self.lock();
            if shared.running {
                return Err(VmError::AlreadyRunning);
            }
            if shared.cpu.is_none() {
                return Err(VmError::NoProgram);
            }
        }

        self.discard_finished();

        let keep_running = Arc::new(AtomicBool::new(true));
        let context = WorkerContext {
            shared: Arc::clone(&self.shared),
            keep_running: Arc::clone(&keep_running),
            frequency: Arc::clone(&self.frequency),
            on_halt: self.on_halt.clone(),
        };

        self.lock().running = true;
        let handle = thread::Builder::new()
            .name("dcpu-worker".into())
            .spawn(move || context.run())
            .map_err(|e| {
                self.lock().running = false;
                VmError::Spawn(e)
            })?;

        debug!("started at {} Hz", self.frequency());
        self.worker = Some(Worker { keep_running, handle });
        Ok(())
    }

    /// Ask the worker to stop and wait for it to exit.
    ///
    /// Returns the decode error the worker stopped on, if any, as long as
    /// no `load`, `reset` or `start` came in between. Does nothing when no
    /// worker was started.
    pub fn stop(&mut self) -> Result<(), VmError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        worker.keep_running.store(false, Ordering::Release);
        let outcome = self.join(worker);
        debug!("stopped");
        outcome
    }

    /// Join a worker that has already exited on its own, dropping its
    /// outcome.
    fn discard_finished(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(e) = self.join(worker) {
                debug!("dropping result of previous run: {}", e);
            }
        }
    }

    fn join(&self, worker: Worker) -> Result<(), VmError> {
        let outcome = worker.handle.join();
        self.lock().running = false;

        match outcome {
            Ok(result) => Ok(result?),
            Err(_) => Err(VmError::WorkerPanicked),
        }
    }

    /// Whether the background worker is executing.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Whether a program has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.lock().cpu.is_some()
    }

    /// Execution frequency in cycles per second.
    pub fn frequency(&self) -> u64 {
        self.frequency.load(Ordering::Relaxed)
    }

    /// Change the execution frequency. A running worker picks it up after
    /// its current instruction.
    pub fn set_frequency(&self, frequency: u64) -> Result<(), VmError> {
        if frequency == 0 {
            return Err(VmError::InvalidFrequency(frequency));
        }
        self.frequency.store(frequency, Ordering::Relaxed);
        Ok(())
    }

    /// Register the function to call when the CPU halts. Takes effect on the
    /// next [`start`](Self::start).
    pub fn on_halt<F>(&mut self, handler: F)
    where
        F: Fn(&Cpu) + Send + Sync + 'static,
    {
        self.on_halt = Some(Arc::new(handler));
    }

    /// A copy of the current CPU state.
    pub fn snapshot(&self) -> Option<Cpu> {
        self.lock().cpu.clone()
    }

    /// Inspect the current CPU state without copying it.
    pub fn with_cpu<R>(&self, f: impl FnOnce(&Cpu) -> R) -> Option<R> {
        self.lock().cpu.as_ref().map(f)
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VirtualMachine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("worker ended with: {}", e);
        }
    }
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("frequency", &self.frequency())
            .field("running", &self.is_running())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // The state is plain data and consistent between steps.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Time one cycle takes at `frequency` cycles per second.
fn cycle_time(frequency: u64) -> Duration {
    Duration::from_nanos(NANOS_PER_SEC / frequency.max(1))
}

/// Everything the worker thread needs.
struct WorkerContext {
    shared: Arc<Mutex<Shared>>,
    keep_running: Arc<AtomicBool>,
    frequency: Arc<AtomicU64>,
    on_halt: Option<HaltHandler>,
}

impl WorkerContext {
    fn run(self) -> Result<(), CpuError> {
        let outcome = self.pace();
        lock_shared(&self.shared).running = false;

        match outcome {
            Ok(Some(cpu)) => {
                info!("halted at {:04x} after {} cycles", cpu.regs.pc, cpu.cycles);
                if let Some(handler) = &self.on_halt {
                    handler(&cpu);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                error!("execution stopped: {}", e);
                Err(e)
            }
        }
    }

    /// The stepping loop. Returns the final state if the CPU halted during
    /// this run, `None` if it was stopped.
    fn pace(&self) -> Result<Option<Cpu>, CpuError> {
        // A CPU that was already halted does not notify again.
        let already_halted = lock_shared(&self.shared)
            .cpu
            .as_ref()
            .map_or(true, Cpu::is_halted);
        if already_halted {
            return Ok(None);
        }

        let clock = Instant::now();
        let mut last = Duration::ZERO;
        let mut wait = Duration::ZERO;

        while self.keep_running.load(Ordering::Acquire) {
            let now = clock.elapsed();
            if now - last < wait {
                thread::yield_now();
                continue;
            }
            last = now;

            let mut shared = lock_shared(&self.shared);
            let Some(cpu) = shared.cpu.as_mut() else {
                return Ok(None);
            };

            let cycles = cpu.step()?;
            if cpu.is_halted() {
                return Ok(Some(cpu.clone()));
            }

            wait = cycle_time(self.frequency.load(Ordering::Relaxed)) * cycles;
        }

        Ok(None)
    }
}

/// Errors from controlling the virtual machine.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("no program has been loaded")]
    NoProgram,

    #[error("the virtual machine is already running")]
    AlreadyRunning,

    #[error("not allowed while the virtual machine is running")]
    Running,

    #[error("invalid frequency {0}: must be at least 1 cycle per second")]
    InvalidFrequency(u64),

    #[error("cannot load program: {0}")]
    Memory(#[from] MemoryError),

    #[error("execution failed: {0}")]
    Cpu(#[from] CpuError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

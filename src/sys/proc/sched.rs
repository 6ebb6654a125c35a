//! Scheduler: round-robin preemptive per terminal
//!
//! Dipanggil dari IRQ 0 (~100 Hz). Setiap terminal menyumbang paling
//! banyak satu proses: proses aktif terminal itu. Index terminal maju
//! setiap tick, terminal tanpa proses dilewati.

use super::exec::Launch;
use super::process::{KernelContext, SchedState};
use crate::config::NUM_TERMINALS;
use crate::sys::clk::TIMER_IRQ;
use crate::sys::kernel::Kernel;
use crate::sys::machine::Machine;

pub struct Scheduler {
    terminal_iter: usize,
    pub ticks:     u64,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self { terminal_iter: 0, ticks: 0 }
    }

    /// Majukan index ke terminal berikutnya yang punya proses
    pub fn next_terminal(&mut self, occupied: impl Fn(usize) -> bool) -> Option<usize> {
        for _ in 0..NUM_TERMINALS {
            self.terminal_iter = (self.terminal_iter + 1) % NUM_TERMINALS;
            if occupied(self.terminal_iter) {
                return Some(self.terminal_iter);
            }
        }
        None
    }
}

/// Perpindahan yang harus dieksekusi layer arch setelah lock dilepas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// Simpan konteks ke `save`, lanjutkan konteks kernel `next`
    Kernel { save: *mut KernelContext, next: *const KernelContext },
    /// Simpan konteks ke `save`, masuk ring 3 untuk proses yang belum pernah jalan
    User { save: *mut KernelContext, launch: Launch },
}

impl<M: Machine> Kernel<M> {
    pub fn schedule(&mut self) -> Option<Switch> {
        self.sched.ticks += 1;
        let tick = self.sched.ticks;

        let terminals = &self.terminals;
        let terminal = self.sched
            .next_terminal(|t| terminals.active_pid(t).is_some())
            .unwrap_or_else(|| panic!("scheduler: no terminal has a runnable process (tick {})", tick));
        let next = self.terminals.active_pid(terminal)?;

        let cur = self.procs.current_pid();
        if next == cur {
            return None;
        }

        self.install(next);
        self.machine.set_kernel_stack(next);
        self.procs.set_current(next);

        let prev = self.procs.get_mut(cur);
        prev.state = SchedState::Suspended;
        let save: *mut KernelContext = &mut prev.sched_context;

        let target = self.procs.get_mut(next);
        match core::mem::replace(&mut target.state, SchedState::Running) {
            SchedState::Fresh { entry, user_sp } => {
                // Tidak akan kembali ke handler timer, jadi EOI dikirim di sini
                self.machine.end_of_interrupt(TIMER_IRQ);
                Some(Switch::User { save, launch: Launch { entry, user_sp } })
            }
            SchedState::Suspended => {
                Some(Switch::Kernel { save, next: &target.sched_context })
            }
            SchedState::Running => panic!("scheduler: pid {} has no saved context", next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_empty_terminals() {
        let mut s = Scheduler::new();
        let occupied = |t: usize| t != 1;
        assert_eq!(s.next_terminal(occupied), Some(2));
        assert_eq!(s.next_terminal(occupied), Some(0));
        assert_eq!(s.next_terminal(occupied), Some(2));
    }

    #[test]
    fn none_when_nothing_runs() {
        let mut s = Scheduler::new();
        assert_eq!(s.next_terminal(|_| false), None);
    }
}

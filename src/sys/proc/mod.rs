//! proc: process management
//!
//! Berisi semua komponen yang berhubungan dengan manajemen proses:
//!   - process: PCB, tabel proses, konteks tersimpan
//!   - exec:    execute/halt, parsing command, trampoline
//!   - sched:   scheduler round-robin per terminal

pub mod exec;
pub mod process;
pub mod sched;

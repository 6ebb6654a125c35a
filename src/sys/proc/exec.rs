//! Exec: siklus hidup proses: execute, halt, dan shell root
//!
//! `execute` menyimpan titik resume di PCB child (`parent_context`).
//! `halt` tidak pernah kembali ke frame pemanggilnya: ia mengembalikan
//! `Continuation` berisi konteks itu plus status, dan layer arch
//! melompat ke sana sehingga `execute` milik parent "return" dengan status.

use super::process::{Args, KernelContext, Pcb, SchedState};
use crate::config::{FILENAME_LEN, MAX_OPEN_FILES, SHELL, USER_STACK_TOP};
use crate::sys::kernel::Kernel;
use crate::sys::machine::Machine;
use crate::sys::{Error, Result};

/// Titik masuk ring 3 untuk program yang baru dimuat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    pub entry:   u64,
    pub user_sp: u64,
}

/// Trampoline balik ke `execute` milik parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    pub context: KernelContext,
    pub status:  u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halted {
    /// Lanjutkan parent
    Resume(Continuation),
    /// Root shell dimuat ulang di slot yang sama
    Restart(Launch),
}

// ---------------------------------------------------------------------------
// Parsing command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: &'a [u8],
    pub args: &'a [u8],
}

/// Pisahkan nama program dan argumen. Baris berakhir di NUL atau newline;
/// spasi di depan dan di antara nama dan argumen dilewati.
pub fn parse_command(line: &[u8]) -> Result<Command<'_>> {
    let end  = line.iter().position(|&c| c == 0 || c == b'\n').unwrap_or(line.len());
    let line = &line[..end];

    let start = line.iter().position(|&c| c != b' ').ok_or(Error::InvalidArgument)?;
    let rest  = &line[start..];
    let name_end = rest.iter().position(|&c| c == b' ').unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.len() > FILENAME_LEN {
        return Err(Error::InvalidArgument);
    }

    let rest = &rest[name_end..];
    let args_start = rest.iter().position(|&c| c != b' ').unwrap_or(rest.len());
    Ok(Command { name, args: &rest[args_start..] })
}

fn display(name: &[u8]) -> &str {
    core::str::from_utf8(name).unwrap_or("<binary>")
}

// ---------------------------------------------------------------------------
// Execute / halt
// ---------------------------------------------------------------------------

impl<M: Machine> Kernel<M> {
    fn load_into(&mut self, pid: usize, name: &[u8]) -> Result<u64> {
        self.fs.load_program(name, self.machine.user_region(pid))
    }

    /// Jalankan `line` sebagai child dari proses sekarang. Kalau gagal,
    /// bitmap aktif, proses sekarang, dan directory tidak berubah.
    /// Kalau berhasil, proses sekarang sudah child dan pemanggil harus
    /// masuk ring 3 lewat `Launch`.
    pub fn execute(&mut self, line: &[u8]) -> Result<Launch> {
        let cmd    = parse_command(line)?;
        let caller = self.procs.current_pid();
        let pid    = self.procs.free_slot().ok_or(Error::ResourceExhausted)?;

        self.install(pid);
        let entry = match self.load_into(pid, cmd.name) {
            Ok(entry) => entry,
            Err(e) => {
                self.install(caller);
                kwarn!("execute {}: {}", display(cmd.name), e);
                return Err(e);
            }
        };

        let terminal = self.procs.get(caller).terminal;
        self.procs.activate(pid);
        *self.procs.get_mut(pid) = Pcb::new(pid, caller, terminal, Args::capture(cmd.args));
        self.machine.set_kernel_stack(pid);
        self.terminals.set_active(terminal, pid);
        self.procs.set_current(pid);

        klog!("execute {}: pid {} (parent {}, terminal {})", display(cmd.name), pid, caller, terminal);
        Ok(Launch { entry, user_sp: USER_STACK_TOP })
    }

    /// Akhiri proses sekarang
    pub fn halt(&mut self, status: u8) -> Halted {
        let pid = self.procs.current_pid();

        for fd in 2..MAX_OPEN_FILES {
            if let Ok(desc) = self.procs.current_mut().files.free(fd) {
                self.close_resource(desc.resource).ok();
            }
        }
        self.paging.clear_video_alias(pid);
        self.procs.current_mut().rtc_countdown = 0;

        let pcb = *self.procs.current();
        if pcb.parent_id == 0 {
            // Terminal tidak boleh kehilangan root shell
            let entry = self.load_into(pid, SHELL).unwrap_or_else(|e| {
                panic!("root shell on terminal {} cannot restart: {}", pcb.terminal, e)
            });
            *self.procs.get_mut(pid) = Pcb::new(pid, 0, pcb.terminal, Args::EMPTY);
            self.install(pid);
            self.machine.set_kernel_stack(pid);
            klog!("halt: root shell pid {} restarted (status {})", pid, status);
            return Halted::Restart(Launch { entry, user_sp: USER_STACK_TOP });
        }

        let parent = pcb.parent_id;
        self.install(parent);
        self.terminals.set_active(pcb.terminal, parent);
        self.machine.set_kernel_stack(parent);
        self.procs.deactivate(pid);
        self.procs.set_current(parent);

        klog!("halt: pid {} -> parent {} (status {})", pid, parent, status);
        Halted::Resume(Continuation { context: pcb.parent_context, status: status as u64 })
    }

    /// Muat shell baru sebagai root di `terminal`. Proses belum jalan;
    /// scheduler akan memulainya lewat `Launch` yang disimpan di PCB.
    pub fn spawn_shell(&mut self, terminal: usize) -> Result<usize> {
        let pid   = self.procs.free_slot().ok_or(Error::ResourceExhausted)?;
        let entry = self.load_into(pid, SHELL)?;

        self.procs.activate(pid);
        let pcb = self.procs.get_mut(pid);
        *pcb = Pcb::new(pid, 0, terminal, Args::EMPTY);
        pcb.state = SchedState::Fresh { entry, user_sp: USER_STACK_TOP };
        self.terminals.set_active(terminal, pid);

        klog!("shell: pid {} on terminal {}", pid, terminal);
        Ok(pid)
    }

    /// Proses pertama saat boot: shell di terminal 0, langsung jadi current
    pub fn start_root_shell(&mut self) -> Result<Launch> {
        let pid = self.spawn_shell(0)?;
        let pcb = self.procs.get_mut(pid);
        let launch = match core::mem::replace(&mut pcb.state, SchedState::Running) {
            SchedState::Fresh { entry, user_sp } => Launch { entry, user_sp },
            _ => unreachable!(),
        };
        self.install(pid);
        self.machine.set_kernel_stack(pid);
        self.procs.set_current(pid);
        Ok(launch)
    }
}

//! Syscall dispatcher
//!
//! ABI: `int 0x80`, rax = nomor, rdi/rsi/rdx = argumen, hasil di rax.
//! `Kernel::syscall` tidak pernah memindahkan kontrol sendiri; ia
//! mengembalikan `SyscallOutcome` dan layer arch yang menjalankan
//! wait, masuk ring 3, atau trampoline halt setelah lock dilepas.

pub mod number;
mod file;

use crate::config::{LARGE_PAGE_SIZE, TERMINAL_BUFFER_SIZE, USER_VIRT_BASE, VIDMAP_VIRT};
use crate::sys::error::status;
use crate::sys::kernel::Kernel;
use crate::sys::machine::Machine;
use crate::sys::proc::exec::{Continuation, Halted, Launch};
use crate::sys::proc::process::KernelContext;
use crate::sys::{Error, Result};

/// Syscall yang sudah di-decode dari register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt { status: u8 },
    Execute { command: u64 },
    Read { fd: u64, buf: u64, len: u64 },
    Write { fd: u64, buf: u64, len: u64 },
    Open { name: u64 },
    Close { fd: u64 },
    GetArgs { buf: u64, len: u64 },
    Vidmap { out: u64 },
    SetHandler,
    SigReturn,
    Unknown(u64),
}

impl Syscall {
    pub fn decode(n: u64, a1: u64, a2: u64, a3: u64) -> Self {
        match n {
            number::HALT        => Syscall::Halt { status: a1 as u8 },
            number::EXECUTE     => Syscall::Execute { command: a1 },
            number::READ        => Syscall::Read { fd: a1, buf: a2, len: a3 },
            number::WRITE       => Syscall::Write { fd: a1, buf: a2, len: a3 },
            number::OPEN        => Syscall::Open { name: a1 },
            number::CLOSE       => Syscall::Close { fd: a1 },
            number::GETARGS     => Syscall::GetArgs { buf: a1, len: a2 },
            number::VIDMAP      => Syscall::Vidmap { out: a1 },
            number::SET_HANDLER => Syscall::SetHandler,
            number::SIGRETURN   => Syscall::SigReturn,
            _                   => Syscall::Unknown(n),
        }
    }
}

/// Kondisi yang ditunggu syscall blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Ulangi syscall setelah buffer terminal punya `count` byte atau newline
    TerminalInput { terminal: usize, count: usize },
    /// Selesai dengan 0 setelah countdown RTC `pid` habis
    RtcTick { pid: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    Done(isize),
    Wait(Wait),
    /// Simpan konteks pemanggil ke `save` lalu masuk ring 3. Nilai
    /// yang nanti diterima lewat `save` adalah hasil syscall.
    Execute { save: *mut KernelContext, launch: Launch },
    /// Masuk ring 3 tanpa menyimpan apa pun (root shell dimuat ulang)
    Restart(Launch),
    /// Lompat ke konteks parent dengan status
    Resume(Continuation),
}

impl From<Result<usize>> for SyscallOutcome {
    fn from(result: Result<usize>) -> Self {
        SyscallOutcome::Done(status(result))
    }
}

// ---------------------------------------------------------------------------
// Akses memori user
// ---------------------------------------------------------------------------

const USER_WINDOW_END: u64 = USER_VIRT_BASE + LARGE_PAGE_SIZE as u64;

/// Offset di region user untuk buffer [addr, addr+len), harus seluruhnya
/// di dalam window 128MB..132MB
pub fn user_offset(addr: u64, len: usize) -> Result<usize> {
    let end = addr.checked_add(len as u64).ok_or(Error::InvalidArgument)?;
    if addr < USER_VIRT_BASE || end > USER_WINDOW_END {
        return Err(Error::InvalidArgument);
    }
    Ok((addr - USER_VIRT_BASE) as usize)
}

fn to_len(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| Error::InvalidArgument)
}

impl<M: Machine> Kernel<M> {
    /// Buffer user milik proses sekarang
    pub fn user_slice(&mut self, addr: u64, len: usize) -> Result<&mut [u8]> {
        let off = user_offset(addr, len)?;
        let pid = self.procs.current_pid();
        Ok(&mut self.machine.user_region(pid)[off..off + len])
    }

    pub fn copy_from_user(&mut self, addr: u64, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(self.user_slice(addr, out.len())?);
        Ok(())
    }

    pub fn copy_to_user(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        self.user_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Salin string C sampai NUL atau `out` penuh; hasil tanpa NUL
    pub fn copy_cstr_from_user(&mut self, addr: u64, out: &mut [u8]) -> Result<usize> {
        user_offset(addr, 1)?;
        let avail = ((USER_WINDOW_END - addr) as usize).min(out.len());
        let src = self.user_slice(addr, avail)?;
        let len = src.iter().position(|&c| c == 0).unwrap_or(avail);
        out[..len].copy_from_slice(&src[..len]);
        Ok(len)
    }

    // -----------------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------------

    pub fn syscall(&mut self, n: u64, a1: u64, a2: u64, a3: u64) -> SyscallOutcome {
        match Syscall::decode(n, a1, a2, a3) {
            Syscall::Halt { status } => match self.halt(status) {
                Halted::Resume(cont)    => SyscallOutcome::Resume(cont),
                Halted::Restart(launch) => SyscallOutcome::Restart(launch),
            },
            Syscall::Execute { command } => match self.sys_execute(command) {
                Ok(launch) => {
                    let save = &mut self.procs.current_mut().parent_context;
                    SyscallOutcome::Execute { save, launch }
                }
                Err(_) => SyscallOutcome::Done(-1),
            },
            Syscall::Read { fd, buf, len } => {
                match to_len(fd).and_then(|fd| self.read(fd, buf, to_len(len)?)) {
                    Ok(outcome) => outcome,
                    Err(_)      => SyscallOutcome::Done(-1),
                }
            }
            Syscall::Write { fd, buf, len } => {
                to_len(fd).and_then(|fd| self.write(fd, buf, to_len(len)?)).into()
            }
            Syscall::Open { name }         => self.sys_open(name).into(),
            Syscall::Close { fd }          => to_len(fd).and_then(|fd| self.close(fd)).into(),
            Syscall::GetArgs { buf, len }  => to_len(len).and_then(|len| self.getargs(buf, len)).into(),
            Syscall::Vidmap { out }        => self.vidmap(out).into(),
            Syscall::SetHandler | Syscall::SigReturn | Syscall::Unknown(_) => SyscallOutcome::Done(-1),
        }
    }

    /// Kondisi `wait` sudah terpenuhi
    pub fn wait_ready(&self, wait: &Wait) -> bool {
        match *wait {
            Wait::TerminalInput { terminal, count } => self.terminals.get(terminal).input_ready(count),
            Wait::RtcTick { pid } => self.procs.get(pid).rtc_countdown == 0,
        }
    }

    fn sys_execute(&mut self, command: u64) -> Result<Launch> {
        let mut line = [0u8; TERMINAL_BUFFER_SIZE];
        let len = self.copy_cstr_from_user(command, &mut line)?;
        self.execute(&line[..len])
    }

    fn sys_open(&mut self, name: u64) -> Result<usize> {
        // Satu byte ekstra supaya nama > 32 karakter terdeteksi
        let mut buf = [0u8; crate::config::FILENAME_LEN + 1];
        let len = self.copy_cstr_from_user(name, &mut buf)?;
        self.open(&buf[..len])
    }

    /// Salin argumen (termasuk NUL) ke buffer user
    pub fn getargs(&mut self, buf: u64, len: usize) -> Result<usize> {
        let args = self.procs.current().args;
        if args.is_empty() || len < args.as_bytes().len() {
            return Err(Error::InvalidArgument);
        }
        // Yang disalin hanya argumennya, bukan seluruh `len`
        user_offset(buf, args.as_bytes().len())?;
        self.copy_to_user(buf, args.as_bytes())?;
        Ok(0)
    }

    /// Petakan halaman video terminal pemanggil di 256MB dan tulis
    /// alamatnya ke `*out`
    pub fn vidmap(&mut self, out: u64) -> Result<usize> {
        user_offset(out, core::mem::size_of::<u64>())?;
        let pid   = self.procs.current_pid();
        let video = self.terminals.get(self.procs.current().terminal).video;
        self.paging.map_video_alias(pid, video);
        self.install(pid);
        self.copy_to_user(out, &VIDMAP_VIRT.to_le_bytes())?;
        Ok(0)
    }
}

//! Operasi file descriptor: open/close/read/write per jenis resource

use super::{user_offset, SyscallOutcome, Wait};
use crate::config::TERMINAL_BUFFER_SIZE;
use crate::sys::clk::rtc;
use crate::sys::fs::{Resource, Stream};
use crate::sys::kernel::Kernel;
use crate::sys::machine::Machine;
use crate::sys::{Error, Result};

/// Ukuran potongan saat menyalin output user ke terminal
const WRITE_CHUNK: usize = 256;

impl<M: Machine> Kernel<M> {
    pub fn open(&mut self, name: &[u8]) -> Result<usize> {
        let dentry   = self.fs.read_dentry_by_name(name)?;
        let resource = Resource::for_dentry(&dentry)?;
        self.procs.current_mut().files.alloc(resource)
    }

    pub fn close(&mut self, fd: usize) -> Result<usize> {
        let desc = self.procs.current_mut().files.free(fd)?;
        self.close_resource(desc.resource)?;
        Ok(0)
    }

    pub(crate) fn close_resource(&mut self, resource: Resource) -> Result<()> {
        match resource {
            Resource::Terminal(_) => Err(Error::InvalidArgument),
            Resource::File { .. } | Resource::Directory | Resource::Rtc { .. } => Ok(()),
        }
    }

    pub fn read(&mut self, fd: usize, buf: u64, len: usize) -> Result<SyscallOutcome> {
        let desc = *self.procs.current().files.get(fd)?;
        let pid  = self.procs.current_pid();

        let n = match desc.resource {
            Resource::Terminal(Stream::Input) => {
                let terminal = self.procs.current().terminal;
                let count    = len.min(TERMINAL_BUFFER_SIZE);
                user_offset(buf, count)?;
                if !self.terminals.get(terminal).input_ready(count) {
                    return Ok(SyscallOutcome::Wait(Wait::TerminalInput { terminal, count }));
                }
                let mut line = [0u8; TERMINAL_BUFFER_SIZE];
                let n = self.terminals.get_mut(terminal).take_input(&mut line[..count]);
                self.copy_to_user(buf, &line[..n])?;
                n
            }
            Resource::Terminal(Stream::Output) => return Err(Error::InvalidArgument),
            Resource::File { inode } => {
                let left   = self.fs.file_length(inode)?.saturating_sub(desc.position);
                let want   = len.min(left);
                let off    = user_offset(buf, want)?;
                let region = self.machine.user_region(pid);
                let n = self.fs.read_data(inode, desc.position, &mut region[off..off + want])?;
                self.procs.current_mut().files.get_mut(fd)?.position += n;
                n
            }
            Resource::Directory => {
                user_offset(buf, len)?;
                let Ok(dentry) = self.fs.read_dentry_by_index(desc.position) else {
                    return Ok(SyscallOutcome::Done(0));
                };
                let name = dentry.name();
                let n = name.len().min(len);
                self.copy_to_user(buf, &name[..n])?;
                self.procs.current_mut().files.get_mut(fd)?.position += 1;
                n
            }
            Resource::Rtc { rate } => {
                self.procs.current_mut().rtc_countdown = rtc::countdown(rate);
                return Ok(SyscallOutcome::Wait(Wait::RtcTick { pid }));
            }
        };
        Ok(SyscallOutcome::Done(n as isize))
    }

    pub fn write(&mut self, fd: usize, buf: u64, len: usize) -> Result<usize> {
        let desc = *self.procs.current().files.get(fd)?;
        match desc.resource {
            Resource::Terminal(Stream::Output) => {
                user_offset(buf, len)?;
                let terminal = self.procs.current().terminal;
                let mut chunk = [0u8; WRITE_CHUNK];
                let mut done = 0;
                while done < len {
                    let n = (len - done).min(WRITE_CHUNK);
                    self.copy_from_user(buf + done as u64, &mut chunk[..n])?;
                    self.terminal_write(terminal, &chunk[..n]);
                    done += n;
                }
                Ok(len)
            }
            Resource::Rtc { .. } => {
                if len != 4 {
                    return Err(Error::InvalidArgument);
                }
                let mut raw = [0u8; 4];
                self.copy_from_user(buf, &mut raw)?;
                let rate = rtc::rate_from_bytes(&raw)?;
                self.procs.current_mut().files.get_mut(fd)?.resource = Resource::Rtc { rate };
                Ok(4)
            }
            // Filesystem read-only
            Resource::File { .. } | Resource::Directory => Err(Error::InvalidArgument),
            Resource::Terminal(Stream::Input) => Err(Error::InvalidArgument),
        }
    }
}

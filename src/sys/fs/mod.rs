//! fs: file descriptor dan resource per proses
//!
//! Setiap proses punya tabel 8 descriptor. Slot 0/1 selalu stdin/stdout
//! (terminal), slot 2..7 untuk file, directory, atau RTC.
//! Operasi {open, read, write, close} di-dispatch lewat `Resource`.

pub mod rofs;

pub use rofs::{Dentry, FileType, RoFs};

use crate::config::MAX_OPEN_FILES;
use crate::sys::{Error, Result};

/// Arah stream terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Input,
    Output,
}

/// Backend sebuah file descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Terminal(Stream),
    File { inode: u32 },
    Directory,
    /// RTC virtual dengan frekuensi per descriptor
    Rtc { rate: u32 },
}

impl Resource {
    /// Resource untuk sebuah dentry, sesuai tipe file-nya
    pub fn for_dentry(dentry: &Dentry) -> Result<Self> {
        match dentry.file_type() {
            Some(FileType::Regular)   => Ok(Resource::File { inode: dentry.inode }),
            Some(FileType::Directory) => Ok(Resource::Directory),
            Some(FileType::Rtc)       => Ok(Resource::Rtc { rate: crate::config::RTC_DEFAULT_HZ }),
            None                      => Err(Error::TypeMismatch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    pub resource: Resource,
    /// Offset byte untuk file, index dentry untuk directory
    pub position: usize,
}

impl FileDescriptor {
    pub const fn new(resource: Resource) -> Self {
        Self { resource, position: 0 }
    }
}

// ---------------------------------------------------------------------------
// FileTable
// ---------------------------------------------------------------------------

pub const STDIN:  usize = 0;
pub const STDOUT: usize = 1;

#[derive(Debug, Clone, Copy)]
pub struct FileTable {
    slots: [Option<FileDescriptor>; MAX_OPEN_FILES],
}

impl FileTable {
    pub const EMPTY: Self = Self { slots: [None; MAX_OPEN_FILES] };

    /// Tabel baru dengan stdin/stdout terpasang
    pub const fn with_stdio() -> Self {
        let mut slots = [None; MAX_OPEN_FILES];
        slots[STDIN]  = Some(FileDescriptor::new(Resource::Terminal(Stream::Input)));
        slots[STDOUT] = Some(FileDescriptor::new(Resource::Terminal(Stream::Output)));
        Self { slots }
    }

    /// Pasang resource di slot kosong terendah (mulai dari 2)
    pub fn alloc(&mut self, resource: Resource) -> Result<usize> {
        let fd = (STDOUT + 1..MAX_OPEN_FILES)
            .find(|&fd| self.slots[fd].is_none())
            .ok_or(Error::ResourceExhausted)?;
        self.slots[fd] = Some(FileDescriptor::new(resource));
        Ok(fd)
    }

    pub fn get(&self, fd: usize) -> Result<&FileDescriptor> {
        self.slots.get(fd).and_then(Option::as_ref).ok_or(Error::InvalidArgument)
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut FileDescriptor> {
        self.slots.get_mut(fd).and_then(Option::as_mut).ok_or(Error::InvalidArgument)
    }

    /// Kosongkan slot; stdin/stdout tidak bisa ditutup
    pub fn free(&mut self, fd: usize) -> Result<FileDescriptor> {
        if fd == STDIN || fd == STDOUT {
            return Err(Error::InvalidArgument);
        }
        self.slots.get_mut(fd).and_then(Option::take).ok_or(Error::InvalidArgument)
    }

    /// Descriptor terbuka di slot 2..7
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        (STDOUT + 1..MAX_OPEN_FILES).filter(move |&fd| self.slots[fd].is_some())
    }
}

/// Image filesystem yang ikut di-link ke kernel
#[cfg(target_os = "none")]
pub fn image() -> &'static [u8] {
    static IMAGE: &[u8] = include_bytes!("../../../fs/filesys.img");
    IMAGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_is_protected() {
        let mut t = FileTable::with_stdio();
        assert_eq!(t.free(STDIN), Err(Error::InvalidArgument));
        assert_eq!(t.free(STDOUT), Err(Error::InvalidArgument));
        assert!(t.get(STDIN).is_ok());
    }

    #[test]
    fn alloc_fills_lowest_slot_and_exhausts() {
        let mut t = FileTable::with_stdio();
        for expect in 2..MAX_OPEN_FILES {
            assert_eq!(t.alloc(Resource::Directory), Ok(expect));
        }
        assert_eq!(t.alloc(Resource::Directory), Err(Error::ResourceExhausted));
        assert!(t.free(4).is_ok());
        assert_eq!(t.free(4), Err(Error::InvalidArgument));
        assert_eq!(t.alloc(Resource::Directory), Ok(4));
        assert_eq!(t.occupied().count(), 6);
        assert_eq!(t.free(8), Err(Error::InvalidArgument));
    }
}

//! RoFS: filesystem read-only berbasis blok 4KB
//!
//! Image dipetakan utuh di memori (`&'static [u8]`), tidak ada tulis.
//!
//! LAYOUT:
//!   Blok 0                 : Boot block
//!   Blok 1 .. N            : Inode (inode i = blok i+1)
//!   Blok N+1 ..            : Data blocks
//!
//! BOOT BLOCK:
//!   [0..4]    dir_count
//!   [4..8]    inode_count
//!   [8..12]   data_count
//!   [12..64]  reserved
//!   [64..]    63 dentry × 64 bytes
//!
//! DENTRY (64 bytes):
//!   [0..32]   name  (tanpa NUL kalau panjangnya 32)
//!   [32..36]  type  = 0 (rtc) / 1 (dir) / 2 (file)
//!   [36..40]  inode
//!   [40..64]  reserved
//!
//! INODE:
//!   [0..4]    length dalam bytes
//!   [4..]     nomor data block (u32 each)

use crate::config::{FILENAME_LEN, PROGRAM_IMAGE_OFFSET};
use crate::sys::{Error, Result};

// ---------------------------------------------------------------------------
// Konstanta layout
// ---------------------------------------------------------------------------

pub const BLOCK_SIZE:   usize = 4096;
pub const DENTRY_SIZE:  usize = 64;
pub const DENTRY_START: usize = 64;
pub const MAX_DENTRIES: usize = (BLOCK_SIZE - DENTRY_START) / DENTRY_SIZE; // 63

/// Jumlah maksimum data block per inode
pub const MAX_INODE_BLOCKS: usize = BLOCK_SIZE / 4 - 1;

pub const ELF_MAGIC:        [u8; 4] = [0x7F, b'E', b'L', b'F'];
pub const ELF_ENTRY_OFFSET: usize   = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Rtc,
    Directory,
    Regular,
}

impl FileType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(FileType::Rtc),
            1 => Some(FileType::Directory),
            2 => Some(FileType::Regular),
            _ => None,
        }
    }
}

/// Directory entry dari boot block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dentry {
    name:      [u8; FILENAME_LEN],
    pub kind:  u32,
    pub inode: u32,
}

impl Dentry {
    /// Nama tanpa padding NUL (maksimal 32 byte)
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(FILENAME_LEN);
        &self.name[..len]
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_raw(self.kind)
    }
}

// ---------------------------------------------------------------------------
// RoFs
// ---------------------------------------------------------------------------

pub struct RoFs {
    image: &'static [u8],
}

impl RoFs {
    /// Filesystem kosong (sebelum image dipasang)
    pub const fn empty() -> Self {
        Self { image: &[] }
    }

    pub fn new(image: &'static [u8]) -> Result<Self> {
        if image.len() < BLOCK_SIZE {
            return Err(Error::InvalidArgument);
        }
        let fs = Self { image };
        if fs.dir_count() > MAX_DENTRIES {
            return Err(Error::InvalidArgument);
        }
        Ok(fs)
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.image.get(offset..offset + 4)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    fn block(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(BLOCK_SIZE)?;
        self.image.get(start..start + BLOCK_SIZE)
    }

    pub fn dir_count(&self) -> usize {
        self.u32_at(0).unwrap_or(0) as usize
    }

    pub fn inode_count(&self) -> usize {
        self.u32_at(4).unwrap_or(0) as usize
    }

    pub fn data_count(&self) -> usize {
        self.u32_at(8).unwrap_or(0) as usize
    }

    pub fn read_dentry_by_index(&self, index: usize) -> Result<Dentry> {
        if index >= self.dir_count() {
            return Err(Error::NotFound);
        }
        let off = DENTRY_START + index * DENTRY_SIZE;
        let raw = self.image.get(off..off + DENTRY_SIZE).ok_or(Error::NotFound)?;

        let mut name = [0u8; FILENAME_LEN];
        name.copy_from_slice(&raw[..FILENAME_LEN]);
        let kind  = u32::from_le_bytes([raw[32], raw[33], raw[34], raw[35]]);
        let inode = u32::from_le_bytes([raw[36], raw[37], raw[38], raw[39]]);
        Ok(Dentry { name, kind, inode })
    }

    /// Cari dentry dengan nama persis (dibandingkan sampai 32 byte)
    pub fn read_dentry_by_name(&self, name: &[u8]) -> Result<Dentry> {
        if name.is_empty() || name.len() > FILENAME_LEN {
            return Err(Error::NotFound);
        }
        (0..self.dir_count())
            .filter_map(|i| self.read_dentry_by_index(i).ok())
            .find(|d| d.name() == name)
            .ok_or(Error::NotFound)
    }

    /// Panjang file dalam bytes
    pub fn file_length(&self, inode: u32) -> Result<usize> {
        let inode = inode as usize;
        if inode >= self.inode_count() {
            return Err(Error::InvalidArgument);
        }
        self.u32_at((inode + 1) * BLOCK_SIZE)
            .map(|len| len as usize)
            .ok_or(Error::InvalidArgument)
    }

    /// Baca isi file mulai `offset` ke `buf`, berhenti di akhir file.
    /// Mengembalikan jumlah byte yang terbaca (0 = EOF).
    pub fn read_data(&self, inode: u32, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let length = self.file_length(inode)?;
        if offset >= length {
            return Ok(0);
        }
        let inode_block = self.block(inode as usize + 1).ok_or(Error::InvalidArgument)?;
        let data_base   = 1 + self.inode_count();
        let total       = buf.len().min(length - offset);

        let mut done = 0;
        while done < total {
            let pos      = offset + done;
            let slot     = pos / BLOCK_SIZE;
            let in_block = pos % BLOCK_SIZE;
            if slot >= MAX_INODE_BLOCKS {
                return Err(Error::InvalidArgument);
            }
            let at = 4 + slot * 4;
            let data_index = u32::from_le_bytes([
                inode_block[at], inode_block[at + 1], inode_block[at + 2], inode_block[at + 3],
            ]) as usize;
            if data_index >= self.data_count() {
                return Err(Error::InvalidArgument);
            }
            let block = self.block(data_base + data_index).ok_or(Error::InvalidArgument)?;

            let n = (BLOCK_SIZE - in_block).min(total - done);
            buf[done..done + n].copy_from_slice(&block[in_block..in_block + n]);
            done += n;
        }
        Ok(done)
    }

    /// Muat program ke region user 4MB. Validasi nama, tipe, panjang,
    /// dan magic ELF; kembalikan entry point (u32 LE di byte 24).
    pub fn load_program(&self, name: &[u8], region: &mut [u8]) -> Result<u64> {
        if name.len() > FILENAME_LEN {
            return Err(Error::InvalidArgument);
        }
        let dentry = self.read_dentry_by_name(name)?;
        if dentry.file_type() != Some(FileType::Regular) {
            return Err(Error::TypeMismatch);
        }

        let length = self.file_length(dentry.inode)?;
        let image  = region
            .get_mut(PROGRAM_IMAGE_OFFSET..PROGRAM_IMAGE_OFFSET + length)
            .ok_or(Error::ResourceExhausted)?;

        // Cek header dulu sebelum menyalin seluruh file
        let mut header = [0u8; ELF_ENTRY_OFFSET + 4];
        let n = self.read_data(dentry.inode, 0, &mut header)?;
        if n < header.len() || header[..4] != ELF_MAGIC {
            return Err(Error::TypeMismatch);
        }

        if self.read_data(dentry.inode, 0, image)? != length {
            return Err(Error::InvalidArgument);
        }
        let entry = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);
        Ok(entry as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Image kecil: ".", "rtc", "a.txt" (5000 byte, 2 block), "prog" (ELF)
    fn image() -> &'static [u8] {
        let mut img = vec![0u8; BLOCK_SIZE * 8];
        let entries: [(&[u8], u32, u32); 4] = [
            (b".", 1, 0),
            (b"rtc", 0, 0),
            (b"a.txt", 2, 0),
            (b"prog", 2, 1),
        ];
        img[0..4].copy_from_slice(&(entries.len() as u32).to_le_bytes());
        img[4..8].copy_from_slice(&2u32.to_le_bytes());
        img[8..12].copy_from_slice(&3u32.to_le_bytes());
        for (i, (name, kind, inode)) in entries.iter().enumerate() {
            let off = DENTRY_START + i * DENTRY_SIZE;
            img[off..off + name.len()].copy_from_slice(name);
            img[off + 32..off + 36].copy_from_slice(&kind.to_le_bytes());
            img[off + 36..off + 40].copy_from_slice(&inode.to_le_bytes());
        }

        // inode 0: a.txt, data block 2 lalu 0
        let ino0 = BLOCK_SIZE;
        img[ino0..ino0 + 4].copy_from_slice(&5000u32.to_le_bytes());
        img[ino0 + 4..ino0 + 8].copy_from_slice(&2u32.to_le_bytes());
        img[ino0 + 8..ino0 + 12].copy_from_slice(&0u32.to_le_bytes());
        // inode 1: prog, data block 1
        let ino1 = 2 * BLOCK_SIZE;
        img[ino1..ino1 + 4].copy_from_slice(&40u32.to_le_bytes());
        img[ino1 + 4..ino1 + 8].copy_from_slice(&1u32.to_le_bytes());

        let data = |d: usize| (3 + d) * BLOCK_SIZE;
        for b in &mut img[data(2)..data(2) + BLOCK_SIZE] { *b = b'x'; }
        for b in &mut img[data(0)..data(0) + BLOCK_SIZE] { *b = b'y'; }
        let prog = data(1);
        img[prog..prog + 4].copy_from_slice(&ELF_MAGIC);
        img[prog + 24..prog + 28].copy_from_slice(&0x0804_8100u32.to_le_bytes());

        Vec::leak(img)
    }

    #[test]
    fn lookup_by_name() {
        let fs = RoFs::new(image()).unwrap();
        let d = fs.read_dentry_by_name(b"a.txt").unwrap();
        assert_eq!(d.file_type(), Some(FileType::Regular));
        assert_eq!(d.inode, 0);
        assert_eq!(fs.read_dentry_by_name(b"a.tx"), Err(Error::NotFound));
        assert_eq!(fs.read_dentry_by_name(b""), Err(Error::NotFound));
        assert_eq!(fs.read_dentry_by_name(&[b'a'; 33]), Err(Error::NotFound));
    }

    #[test]
    fn read_data_stitches_blocks_and_stops_at_length() {
        let fs = RoFs::new(image()).unwrap();
        let mut buf = vec![0u8; 6000];
        assert_eq!(fs.read_data(0, 4090, &mut buf), Ok(910));
        assert!(buf[..6].iter().all(|&b| b == b'x'));
        assert!(buf[6..910].iter().all(|&b| b == b'y'));
        assert_eq!(fs.read_data(0, 5000, &mut buf), Ok(0));
        assert_eq!(fs.read_data(7, 0, &mut buf), Err(Error::InvalidArgument));
    }

    #[test]
    fn load_program_checks_type_and_magic() {
        let fs = RoFs::new(image()).unwrap();
        let mut region = vec![0u8; 4 << 20];
        assert_eq!(fs.load_program(b"prog", &mut region), Ok(0x0804_8100));
        assert_eq!(&region[PROGRAM_IMAGE_OFFSET..PROGRAM_IMAGE_OFFSET + 4], &ELF_MAGIC);
        assert_eq!(fs.load_program(b"a.txt", &mut region), Err(Error::TypeMismatch));
        assert_eq!(fs.load_program(b"rtc", &mut region), Err(Error::TypeMismatch));
        assert_eq!(fs.load_program(b"nope", &mut region), Err(Error::NotFound));
    }
}

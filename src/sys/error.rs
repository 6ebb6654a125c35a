//! Error kernel: semua operasi yang bisa gagal mengembalikan `Result`.
//!
//! Kondisi fatal (invariant rusak, exception CPU) tidak punya varian
//! di sini: itu `panic!` dan mesin berhenti.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Pointer di luar region user, fd tidak valid, frekuensi salah
    InvalidArgument,
    /// Tidak ada slot proses atau slot file descriptor kosong
    ResourceExhausted,
    /// Nama file tidak ditemukan
    NotFound,
    /// Tipe file salah untuk operasi yang diminta
    TypeMismatch,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::InvalidArgument   => "invalid argument",
            Error::ResourceExhausted => "resource exhausted",
            Error::NotFound          => "not found",
            Error::TypeMismatch      => "type mismatch",
        };
        f.write_str(s)
    }
}

/// Konversi hasil operasi ke nilai return syscall (negatif = gagal)
pub fn status(result: Result<usize>) -> isize {
    match result {
        Ok(n)  => n as isize,
        Err(_) => -1,
    }
}

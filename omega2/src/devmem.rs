//! Physical memory access through `/dev/mem`.
//!
//! Example usage:
//!
//! ```no_run
//! use omega2::devmem::{DevMem, Width};
//!
//! let mut mem = DevMem::open()?;
//! let enable = mem.read(0x1000_5000, Width::U32)?;
//! mem.write(0x1000_5000, Width::U32, enable & !1)?;
//! # Ok::<(), omega2::Error>(())
//! ```
//!
//! Every access maps the page(s) holding the address, touches the register and unmaps
//! again. Only the file handle is kept for the lifetime of a [DevMem].

use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::{io, ptr};

use nix::libc;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::unistd::{sysconf, SysconfVar};

use crate::error::{Error, Result};

/// Device exposing the physical address space.
pub const DEV_MEM: &str = "/dev/mem";

/// Access width.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    U8 = 1,
    U16 = 2,
    U32 = 4,
}

impl Width {
    /// Number of bytes touched by one access.
    #[inline]
    pub fn bytes(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Width {
    type Error = Error;

    fn try_from(size: u8) -> Result<Self> {
        match size {
            1 => Ok(Width::U8),
            2 => Ok(Width::U16),
            4 => Ok(Width::U32),
            _ => Err(Error::InvalidSize(size)),
        }
    }
}

/// 32-bit register access, implemented by [DevMem].
pub trait Registers {
    fn read32(&mut self, address: u32) -> Result<u32>;
    fn write32(&mut self, address: u32, value: u32) -> Result<()>;
}

/// Page aligned mapping window for a single access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    /// Page aligned physical base address.
    base: u32,
    /// Offset of the access within the mapping.
    offset: usize,
    /// Mapping length, one or two pages.
    len: usize,
}

impl Window {
    fn new(address: u32, width: Width, page_size: usize) -> Self {
        let mask = page_size - 1;
        let offset = address as usize & mask;
        let mut len = page_size;
        if offset + width.bytes() > page_size {
            // Crosses into the next page.
            len += page_size;
        }
        Self {
            base: address & !(mask as u32),
            offset,
            len,
        }
    }
}

/// Open handle on the physical address space.
///
/// The handle is closed on drop.
#[derive(Debug)]
pub struct DevMem {
    file: File,
    page_size: usize,
}

impl DevMem {
    /// Opens [DEV_MEM] for synchronous read/write access.
    ///
    /// Requires root (or `CAP_SYS_RAWIO`).
    pub fn open() -> Result<Self> {
        Self::open_path(DEV_MEM)
    }

    /// Opens any mappable file as the physical address space.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::PermissionDenied => Error::PermissionDenied(err),
                _ => Error::Open(err),
            })?;
        Ok(Self {
            file,
            page_size: page_size()?,
        })
    }

    /// Reads `width` bytes at the physical `address`.
    pub fn read(&mut self, address: u32, width: Width) -> Result<u32> {
        self.access(address, width, None)
    }

    /// Writes `value` at the physical `address`, returns the value read back.
    pub fn write(&mut self, address: u32, width: Width, value: u32) -> Result<u32> {
        self.access(address, width, Some(value))
    }

    fn access(&mut self, address: u32, width: Width, value: Option<u32>) -> Result<u32> {
        let window = Window::new(address, width, self.page_size);
        let len = NonZeroUsize::new(window.len).ok_or(Error::PageSize)?;

        let map_base = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                self.file.as_raw_fd(),
                window.base as libc::off_t,
            )
        }
        .map_err(|err| Error::MappingFailed(address, err))?;

        // Safety: the window covers `offset + width` bytes of the fresh mapping.
        let result = unsafe {
            let virt_addr = (map_base as *mut u8).add(window.offset);
            if let Some(value) = value {
                write_volatile(virt_addr, width, value);
            }
            read_volatile(virt_addr, width)
        };

        unsafe { munmap(map_base, window.len) }
            .map_err(|err| Error::UnmappingFailed(address, err))?;

        log::trace!("devmem {:#010x} ({:?}) = {:#010x}", address, width, result);
        Ok(result)
    }
}

impl Registers for DevMem {
    #[inline]
    fn read32(&mut self, address: u32) -> Result<u32> {
        self.read(address, Width::U32)
    }

    #[inline]
    fn write32(&mut self, address: u32, value: u32) -> Result<()> {
        self.write(address, Width::U32, value).map(|_| ())
    }
}

/// One-shot access: opens [DEV_MEM], performs the access and closes it again.
///
/// `size` must be 1, 2 or 4 bytes. The write, if any, happens before the read.
pub fn access(address: u32, size: u8, write: bool, value: u32) -> Result<u32> {
    access_path(DEV_MEM, address, size, write, value)
}

/// [access] on any mappable file.
pub fn access_path<P: AsRef<Path>>(
    path: P,
    address: u32,
    size: u8,
    write: bool,
    value: u32,
) -> Result<u32> {
    let width = Width::try_from(size)?;
    let mut mem = DevMem::open_path(path)?;
    if write {
        mem.write(address, width, value)
    } else {
        mem.read(address, width)
    }
}

fn page_size() -> Result<usize> {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => Ok(size as usize),
        _ => Err(Error::PageSize),
    }
}

#[inline]
fn is_aligned(ptr: *const u8, width: Width) -> bool {
    ptr as usize % width.bytes() == 0
}

/// Volatile store of `width` bytes.
///
/// Misaligned addresses are written byte by byte.
unsafe fn write_volatile(ptr: *mut u8, width: Width, value: u32) {
    if is_aligned(ptr, width) {
        match width {
            Width::U8 => ptr::write_volatile(ptr, value as u8),
            Width::U16 => ptr::write_volatile(ptr as *mut u16, value as u16),
            Width::U32 => ptr::write_volatile(ptr as *mut u32, value),
        }
    } else {
        let bytes = match width {
            Width::U8 => [value as u8, 0, 0, 0],
            Width::U16 => {
                let [b0, b1] = (value as u16).to_ne_bytes();
                [b0, b1, 0, 0]
            }
            Width::U32 => value.to_ne_bytes(),
        };
        for (i, byte) in bytes[..width.bytes()].iter().enumerate() {
            ptr::write_volatile(ptr.add(i), *byte);
        }
    }
}

/// Volatile load of `width` bytes.
///
/// Misaligned addresses are read byte by byte.
unsafe fn read_volatile(ptr: *const u8, width: Width) -> u32 {
    if is_aligned(ptr, width) {
        match width {
            Width::U8 => ptr::read_volatile(ptr) as u32,
            Width::U16 => ptr::read_volatile(ptr as *const u16) as u32,
            Width::U32 => ptr::read_volatile(ptr as *const u32),
        }
    } else {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes[..width.bytes()].iter_mut().enumerate() {
            *byte = ptr::read_volatile(ptr.add(i));
        }
        match width {
            Width::U8 => bytes[0] as u32,
            Width::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as u32,
            Width::U32 => u32::from_ne_bytes(bytes),
        }
    }
}

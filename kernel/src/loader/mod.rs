//! Executable Image Loading
//!
//! The kernel does not parse binary formats itself. An [`ImageLoader`]
//! resolves an executable name to a [`LoadedImage`]: the entry point, the
//! initial stack pointer and a freshly built [`AddressSpace`] that the new
//! process owns exclusively.
//!
//! Every `exec` gets its own address space, even when several processes run
//! the same image. Only the read-only image itself may be shared, and that is
//! the loader's business.

use alloc::boxed::Box;
use core::fmt;

/// A process address space.
///
/// Dropping the value releases every physical page it holds, so the kernel
/// frees a process's memory simply by dropping its address space.
pub trait AddressSpace: Send {
    /// Number of physical pages backing this address space.
    fn page_count(&self) -> usize;
}

/// Result of loading an executable image.
pub struct LoadedImage {
    /// Initial program counter
    pub entry_point: u64,
    /// Initial stack pointer (top of the user stack)
    pub stack_top: u64,
    /// Address space populated from the image
    pub space: Box<dyn AddressSpace>,
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("entry_point", &format_args!("{:#x}", self.entry_point))
            .field("stack_top", &format_args!("{:#x}", self.stack_top))
            .field("pages", &self.space.page_count())
            .finish()
    }
}

/// Image loading error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// No executable with that name exists
    NotFound,
    /// The image exists but cannot be loaded
    Malformed(&'static str),
    /// Not enough physical memory for the image, its stack and arguments
    OutOfMemory,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound => write!(f, "executable not found"),
            LoadError::Malformed(why) => write!(f, "malformed executable: {}", why),
            LoadError::OutOfMemory => write!(f, "insufficient physical memory"),
        }
    }
}

/// Builds address spaces from named executable images.
pub trait ImageLoader: Send + Sync {
    /// Load the executable `name` into a new address space.
    fn load(&self, name: &str) -> Result<LoadedImage, LoadError>;
}

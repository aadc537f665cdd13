use std::fmt;

/// Status codes returned by every system-call shim function.
///
/// The numeric values match `wasi_snapshot_preview1` and are decoded numerically by the guest,
/// so they must never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Errno {
    Success = 0,
    /// Bad file descriptor.
    Badf = 8,
    /// Invalid argument.
    Inval = 28,
    /// Function not supported.
    Nosys = 52,
}

impl Errno {
    pub const fn raw(self) -> u32 {
        self as u32
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Success),
            8 => Some(Self::Badf),
            28 => Some(Self::Inval),
            52 => Some(Self::Nosys),
            _ => None,
        }
    }
}

impl From<Errno> for u32 {
    fn from(errno: Errno) -> Self {
        errno.raw()
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Badf => "BADF",
            Self::Inval => "INVAL",
            Self::Nosys => "NOSYS",
        };
        write!(f, "{name} ({})", self.raw())
    }
}

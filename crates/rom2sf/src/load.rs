use core::error::Error;
use core::fmt;
use core::str::FromStr;

/// Size of the largest NDS cartridge. Load offsets must fall inside of it.
pub(crate) const MAX_ROM_SIZE: u32 = 0x2000_0000;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LoadOffsetErr {
    Empty,
    Negative,
    Invalid,
    TooLarge(u32),
}

impl fmt::Display for LoadOffsetErr {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "missing hexadecimal number"),
            Self::Negative => write!(f, "load offset cannot be negative"),
            Self::Invalid => write!(f, "number format error, expected hexadecimal"),
            Self::TooLarge(value) => write!(
                f,
                "load offset {value:#x} is too large, must be less than {MAX_ROM_SIZE:#x}"
            ),
        }
    }
}

impl Error for LoadOffsetErr {}

/// Offset into the ROM where the engine should start extracting data.
///
/// The default offset of zero leaves the choice to the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LoadOffset(u32);

impl LoadOffset {
    /// Construct a new load offset, checking it against [`MAX_ROM_SIZE`].
    pub(crate) fn new(value: u32) -> Result<Self, LoadOffsetErr> {
        if value >= MAX_ROM_SIZE {
            return Err(LoadOffsetErr::TooLarge(value));
        }

        Ok(Self(value))
    }

    #[inline]
    pub(crate) fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn is_default(self) -> bool {
        self.0 == 0
    }
}

impl FromStr for LoadOffset {
    type Err = LoadOffsetErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('-') {
            return Err(LoadOffsetErr::Negative);
        }

        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() {
            return Err(LoadOffsetErr::Empty);
        }

        // from_str_radix accepts a leading '+', which is not a hex digit.
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LoadOffsetErr::Invalid);
        }

        let Ok(value) = u32::from_str_radix(digits, 16) else {
            return Err(LoadOffsetErr::TooLarge(u32::MAX));
        };

        Self::new(value)
    }
}

impl fmt::Display for LoadOffset {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

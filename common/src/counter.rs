use core::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleCounter(u32);

impl CycleCounter {
    pub const RETAINED_LEN: usize = 4;

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    /// Reads the little-endian prefix of a retained-memory blob.
    pub fn from_retained(bytes: &[u8]) -> Option<Self> {
        let prefix: [u8; Self::RETAINED_LEN] = bytes.get(..Self::RETAINED_LEN)?.try_into().ok()?;
        Some(Self(u32::from_le_bytes(prefix)))
    }

    pub fn to_retained(self) -> [u8; Self::RETAINED_LEN] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for CycleCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

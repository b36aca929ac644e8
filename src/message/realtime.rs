use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The system real-time messages sent by the transport clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SystemRealTime {
    /// Sent 24 times per quarter note while running
    TimingClock = 0xF8,
    /// Start from the beginning of the song
    Start = 0xFA,
    /// Resume from the current song position
    Continue = 0xFB,
    /// Stop, keeping the song position
    Stop = 0xFC,
}

impl SystemRealTime {
    /// The single byte of this message
    pub fn byte(self) -> u8 {
        self.into()
    }
}

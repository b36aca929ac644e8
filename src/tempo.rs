use core::fmt;

#[doc = r#"
The tempo of a track, in microseconds per quarter note.

This is the payload of the Set-Tempo meta event (`FF 51 03 tt tt tt`): a
24-bit big-endian count of microseconds per quarter note. A file that never
sets its tempo plays at 500,000 µs per quarter note, which is 120 BPM.

# Example
```rust
# use maxmidi::Tempo;
let tempo = Tempo::from_bpm(120.);
assert_eq!(tempo.micros_per_quarter_note(), 500_000);
assert_eq!(tempo.to_bytes(), [0x07, 0xA1, 0x20]);
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo(u32);

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tempo {
    /// 500,000 µs per quarter note (120 BPM)
    pub const DEFAULT: Self = Self(500_000);

    /// The largest tempo representable in three bytes
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create a tempo from microseconds per quarter note.
    ///
    /// Values wider than 24 bits are clamped, and zero becomes one.
    pub const fn new(micros_per_quarter_note: u32) -> Self {
        let v = if micros_per_quarter_note > Self::MAX {
            Self::MAX
        } else if micros_per_quarter_note == 0 {
            1
        } else {
            micros_per_quarter_note
        };
        Self(v)
    }

    /// Create a tempo from the three payload bytes of a Set-Tempo event
    pub const fn new_from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Parse a Set-Tempo payload. Returns `None` if it is not three bytes long.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let bytes: [u8; 3] = payload.try_into().ok()?;
        Some(Self::new_from_bytes(bytes))
    }

    /// Create a tempo from beats per minute.
    ///
    /// A non-positive or non-finite BPM yields the default tempo.
    pub fn from_bpm(bpm: f64) -> Self {
        if !bpm.is_finite() || bpm <= 0. {
            return Self::DEFAULT;
        }
        let micros = 60_000_000. / bpm;
        if micros >= Self::MAX as f64 {
            Self::new(Self::MAX)
        } else {
            Self::new(micros as u32)
        }
    }

    /// Microseconds per quarter note
    pub const fn micros_per_quarter_note(&self) -> u32 {
        self.0
    }

    /// Beats per minute
    pub fn bpm(&self) -> f64 {
        60_000_000. / self.0 as f64
    }

    /// The three payload bytes of a Set-Tempo event
    pub const fn to_bytes(&self) -> [u8; 3] {
        let [_, a, b, c] = self.0.to_be_bytes();
        [a, b, c]
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} µs/quarter", self.0)
    }
}

#[test]
fn tempo_bpm_conversions() {
    use pretty_assertions::assert_eq;
    assert_eq!(Tempo::from_bpm(60.).micros_per_quarter_note(), 1_000_000);
    assert_eq!(Tempo::from_bpm(0.), Tempo::DEFAULT);
    assert_eq!(Tempo::from_bpm(f64::NAN), Tempo::DEFAULT);
    assert_eq!(Tempo::new(250_000).bpm(), 240.);
    assert_eq!(Tempo::from_bpm(1.).micros_per_quarter_note(), Tempo::MAX);
}

#[test]
fn tempo_payload() {
    use pretty_assertions::assert_eq;
    let tempo = Tempo::new(250_000);
    assert_eq!(Tempo::from_payload(&tempo.to_bytes()), Some(tempo));
    assert_eq!(Tempo::from_payload(&[0x07, 0xA1]), None);
}

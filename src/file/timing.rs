use crate::reader::HeaderError;

/// The header timing: ticks per quarter note.
///
/// The division field may instead encode SMPTE frames with its top bit set.
/// That form is rejected while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
pub struct Timing {
    ticks_per_quarter_note: u16,
}

impl Timing {
    /// Ticks per quarter note, 1-32767. Returns `None` outside that range.
    pub const fn new(ticks_per_quarter_note: u16) -> Option<Self> {
        if ticks_per_quarter_note == 0 || ticks_per_quarter_note > 0x7FFF {
            return None;
        }
        Some(Self {
            ticks_per_quarter_note,
        })
    }

    /// Interpret the division field of a header chunk
    pub const fn from_division(division: u16) -> Result<Self, HeaderError> {
        if division & 0x8000 != 0 {
            return Err(HeaderError::Smpte(division));
        }
        match Self::new(division) {
            Some(timing) => Ok(timing),
            None => Err(HeaderError::ZeroDivision),
        }
    }

    /// Returns the ticks per quarter note for the file.
    pub const fn ticks_per_quarter_note(&self) -> u16 {
        self.ticks_per_quarter_note
    }
}

/// Same checks as [`Timing::from_division`]
impl TryFrom<u16> for Timing {
    type Error = HeaderError;
    fn try_from(division: u16) -> Result<Self, Self::Error> {
        Self::from_division(division)
    }
}

impl From<Timing> for u16 {
    fn from(timing: Timing) -> Self {
        timing.ticks_per_quarter_note
    }
}

#[test]
fn division_parsing() {
    use pretty_assertions::assert_eq;
    assert_eq!(Timing::from_division(480).unwrap().ticks_per_quarter_note(), 480);
    assert_eq!(Timing::from_division(0), Err(HeaderError::ZeroDivision));
    assert_eq!(Timing::from_division(0xE728), Err(HeaderError::Smpte(0xE728)));
}

#[test]
fn conversion_keeps_the_range_check() {
    use pretty_assertions::assert_eq;
    assert_eq!(Timing::try_from(0u16), Err(HeaderError::ZeroDivision));
    assert_eq!(Timing::try_from(0x8000u16), Err(HeaderError::Smpte(0x8000)));
    let timing = Timing::try_from(96u16).unwrap();
    assert_eq!(u16::from(timing), 96);
}

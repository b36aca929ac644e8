#![doc = r#"
Variable-length quantities

Delta-times and the lengths of meta and system exclusive events are stored
as big-endian groups of seven bits. Every byte but the last has its high bit
set. Standard MIDI Files cap these at four bytes, so the largest value is
`0x0FFF_FFFF`.

| Value        | Encoding        |
|--------------|-----------------|
| `0x00000000` | `00`            |
| `0x0000007F` | `7F`            |
| `0x00000080` | `81 00`         |
| `0x00003FFF` | `FF 7F`         |
| `0x00004000` | `81 80 00`      |
| `0x0FFFFFFF` | `FF FF FF 7F`   |
"#]

use core::ops::Deref;

use crate::{
    reader::{ReadResult, Reader, ReaderError, ReaderErrorKind},
    writer::WriteError,
};

/// The largest value a variable-length quantity can hold
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// The most bytes a variable-length quantity can occupy
pub const MAX_BYTES: usize = 4;

/// Decode a variable-length quantity.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
/// - [`ReaderErrorKind::MalformedVlq`] at the offset of the first byte if four
///   bytes all carry the continuation bit
/// - [`ReaderErrorKind::OutOfBounds`] if the reader runs out mid-quantity
pub fn decode(reader: &mut Reader<'_>) -> ReadResult<(u32, usize)> {
    let start = reader.buffer_position();
    let mut value = 0u32;
    for consumed in 1..=MAX_BYTES {
        let byte = reader.read_u8()?;
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, consumed));
        }
    }
    Err(ReaderError::new(start, ReaderErrorKind::MalformedVlq))
}

/// Encode a variable-length quantity using the fewest bytes possible.
///
/// # Errors
/// [`WriteError::ValueOutOfRange`] if `value` is above [`MAX_VALUE`]
pub fn encode(value: u64) -> Result<VlqBytes, WriteError> {
    if value > MAX_VALUE as u64 {
        return Err(WriteError::ValueOutOfRange(value));
    }
    let value = value as u32;

    let mut len = 1;
    while len < MAX_BYTES && value >> (7 * len) != 0 {
        len += 1;
    }

    let mut bytes = [0u8; MAX_BYTES];
    let mut i = 0;
    while i < len {
        let shift = 7 * (len - 1 - i);
        let group = ((value >> shift) & 0x7F) as u8;
        bytes[i] = if i + 1 < len { group | 0x80 } else { group };
        i += 1;
    }

    Ok(VlqBytes {
        bytes,
        len: len as u8,
    })
}

/// An encoded variable-length quantity of one to four bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlqBytes {
    bytes: [u8; MAX_BYTES],
    len: u8,
}

impl Deref for VlqBytes {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.bytes[..self.len as usize]
    }
}

impl AsRef<[u8]> for VlqBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

#[test]
fn encode_known_values() {
    use pretty_assertions::assert_eq;
    assert_eq!(&*encode(0).unwrap(), &[0x00]);
    assert_eq!(&*encode(0x40).unwrap(), &[0x40]);
    assert_eq!(&*encode(0x7F).unwrap(), &[0x7F]);
    assert_eq!(&*encode(0x80).unwrap(), &[0x81, 0x00]);
    assert_eq!(&*encode(0x2000).unwrap(), &[0xC0, 0x00]);
    assert_eq!(&*encode(0x3FFF).unwrap(), &[0xFF, 0x7F]);
    assert_eq!(&*encode(0x4000).unwrap(), &[0x81, 0x80, 0x00]);
    assert_eq!(&*encode(0x1FFFFF).unwrap(), &[0xFF, 0xFF, 0x7F]);
    assert_eq!(&*encode(0x200000).unwrap(), &[0x81, 0x80, 0x80, 0x00]);
    assert_eq!(&*encode(0x0FFFFFFF).unwrap(), &[0xFF, 0xFF, 0xFF, 0x7F]);
}

#[test]
fn round_trip_boundaries() {
    use pretty_assertions::assert_eq;
    for value in [
        0u32, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, 268_435_455,
    ] {
        let encoded = encode(value as u64).unwrap();
        let mut reader = Reader::from_byte_slice(&encoded);
        assert_eq!(decode(&mut reader).unwrap(), (value, encoded.len()));
        assert!(reader.is_empty());
    }
}

#[test]
fn encode_out_of_range() {
    use pretty_assertions::assert_eq;
    assert_eq!(
        encode(0x1000_0000).unwrap_err(),
        WriteError::ValueOutOfRange(0x1000_0000)
    );
}

#[test]
fn decode_rejects_five_byte_quantity() {
    use pretty_assertions::assert_eq;
    let bytes = [0x00, 0x81, 0x80, 0x80, 0x80, 0x00];
    let mut reader = Reader::from_byte_slice(&bytes);
    reader.read_u8().unwrap();
    let err = decode(&mut reader).unwrap_err();
    assert_eq!(err.error_kind(), &ReaderErrorKind::MalformedVlq);
    assert_eq!(err.position(), 1);
}

#[test]
fn decode_stops_at_end_of_input() {
    let bytes = [0x81, 0x80];
    let mut reader = Reader::from_byte_slice(&bytes);
    assert!(decode(&mut reader).unwrap_err().is_out_of_bounds());
}

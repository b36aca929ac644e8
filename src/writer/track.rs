use super::{WriteError, Writer};
use crate::prelude::*;

const META: u8 = 0xFF;

/// Encode the events of a track, without the chunk framing.
///
/// An End-of-Track that is not the last event is dropped and its delta is
/// carried onto the next event. A track that does not end with End-of-Track
/// gets one appended.
pub(crate) fn write_track(track: &Track, writer: &mut Writer) -> Result<(), WriteError> {
    let events = track.events();
    let mut running_status: Option<u8> = None;
    let mut carried_ticks: u64 = 0;

    for (i, event) in events.iter().enumerate() {
        let delta = carried_ticks + event.delta_ticks() as u64;
        if event.is_end_of_track() && i + 1 != events.len() {
            carried_ticks = delta;
            continue;
        }
        carried_ticks = 0;

        writer.write_vlq(delta)?;
        running_status = write_message(event.message(), running_status, writer)?;
    }

    if !track.has_end_of_track() {
        writer.write_vlq(carried_ticks)?;
        write_message(
            &TrackMessage::Meta(MetaMessage::end_of_track()),
            running_status,
            writer,
        )?;
    }
    Ok(())
}

/// Write one message, returning the running status for the next one.
fn write_message(
    message: &TrackMessage,
    running_status: Option<u8>,
    writer: &mut Writer,
) -> Result<Option<u8>, WriteError> {
    match message {
        TrackMessage::Channel(msg) => {
            let status = msg.status();
            if running_status != Some(status) {
                writer.write_u8(status);
            }
            writer.write_all(msg.data());
            Ok(Some(status))
        }
        TrackMessage::Meta(meta) => {
            writer.write_u8(META);
            writer.write_u8(meta.meta_type());
            writer.write_vlq(meta.payload().len() as u64)?;
            writer.write_all(meta.payload());
            Ok(None)
        }
        TrackMessage::SysEx(sysex) => {
            writer.write_u8(sysex.kind().into());
            writer.write_vlq(sysex.payload().len() as u64)?;
            writer.write_all(sysex.payload());
            Ok(None)
        }
    }
}

#[cfg(test)]
fn encode(track: &Track) -> Vec<u8> {
    let mut writer = Writer::new();
    write_track(track, &mut writer).unwrap();
    writer.into_bytes()
}

#[test]
fn running_status_only_between_identical_statuses() {
    use pretty_assertions::assert_eq;
    let one = Channel::new(0).unwrap();
    let two = Channel::new(1).unwrap();
    let mut track = Track::default();
    track
        .note_on(0, one, 60, 100)
        .unwrap()
        .note_on(10, one, 62, 100)
        .unwrap()
        .note_on(0, two, 64, 100)
        .unwrap()
        .text(0, "x")
        .note_on(0, two, 65, 100)
        .unwrap();

    assert_eq!(
        encode(&track),
        [
            0x00, 0x90, 60, 100, //
            0x0A, 62, 100, //
            0x00, 0x91, 64, 100, //
            0x00, 0xFF, 0x01, 0x01, b'x', //
            0x00, 0x91, 65, 100, //
            0x00, 0xFF, 0x2F, 0x00,
        ]
    );
}

#[test]
fn end_of_track_is_normalized() {
    use pretty_assertions::assert_eq;
    let track = Track::new(alloc::vec![
        TrackEvent::end_of_track(5),
        TrackEvent::new(3, ChannelMessage::new(0xC0, &[7]).unwrap()),
    ]);
    assert_eq!(
        encode(&track),
        [0x08, 0xC0, 0x07, 0x00, 0xFF, 0x2F, 0x00]
    );

    let track = Track::new(alloc::vec![TrackEvent::end_of_track(0), TrackEvent::end_of_track(9)]);
    assert_eq!(encode(&track), [0x09, 0xFF, 0x2F, 0x00]);
}

#[test]
fn payload_lengths_come_from_payloads() {
    use pretty_assertions::assert_eq;
    let payload = [0x11u8; 200];
    let track = Track::new(alloc::vec![TrackEvent::new(
        0,
        SysExMessage::new(SysExKind::Start, payload)
    )]);
    let bytes = encode(&track);
    assert_eq!(&bytes[..4], &[0x00, 0xF0, 0x81, 0x48]);
    assert_eq!(bytes.len(), 4 + 200 + 4);
}

#[test]
fn oversized_delta_is_rejected() {
    use pretty_assertions::assert_eq;
    let track = Track::new(alloc::vec![TrackEvent::end_of_track(0x1000_0000)]);
    let mut writer = Writer::new();
    assert_eq!(
        write_track(&track, &mut writer).unwrap_err(),
        WriteError::ValueOutOfRange(0x1000_0000)
    );
}

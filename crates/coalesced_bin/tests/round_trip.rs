use coalesced_bin::{detect, error::ErrorKind, Detection, Direction};
use coalesced_ini::{write::LineEnding, CoalescedFormat, Document};
use miette::Result;
use pretty_assertions::{assert_eq, assert_str_eq};
use tracing::{info, instrument};
use tracing_test::traced_test;

/// A document whose names survive every format unchanged
fn document(format: CoalescedFormat) -> Document {
    let mut doc = Document::new(format);

    let core = doc.file_mut("engine.ini").section_mut("core.system");
    core.push_value("paths", "..\\content");
    core.push_value("paths", "..\\development\\src");
    core.push_value("savepath", "save");
    core.push_value("maxcachesize", "");

    let engine = doc.file_mut("engine.ini").section_mut("engine.engine");
    engine.push_value("defaultmap", "entry.sfm");

    doc.file_mut("empty.ini");

    let game = doc.file_mut("game.ini").section_mut("sfxgame.sfxpawn");
    game.push_value("walkspeed", "1.5");
    game.push_value("walkspeed", "1.5");
    game.push_value("name", "caf\u{e9}");

    doc
}

#[instrument]
fn round_trip(format: CoalescedFormat) -> Result<Vec<u8>> {
    let expected = document(format);

    let mut bytes = Vec::new();
    coalesced_bin::encode(&expected, &mut bytes)?;
    info!(bytes = bytes.len(), "encoded");

    let actual = coalesced_bin::decode(format, bytes.as_slice())?;
    assert_eq!(actual, expected);
    assert!(actual
        .files
        .iter()
        .any(|file| file.name == "empty.ini" && file.sections.is_empty()));

    // a second pass reproduces the same bytes
    let mut again = Vec::new();
    coalesced_bin::encode(&actual, &mut again)?;
    assert_str_eq!(format!("{:02X?}", again), format!("{:02X?}", bytes));

    Ok(bytes)
}

#[traced_test]
#[test]
fn every_format_round_trips() -> Result<()> {
    for format in CoalescedFormat::ALL {
        let bytes = round_trip(format)?;

        assert_eq!(
            detect(&bytes),
            Some(Detection {
                format,
                direction: Direction::ToText
            }),
            "{format}"
        );
    }

    Ok(())
}

#[traced_test]
#[test]
fn through_text() -> Result<()> {
    for format in CoalescedFormat::ALL {
        let mut bytes = Vec::new();
        coalesced_bin::encode(&document(format), &mut bytes)?;
        let doc = coalesced_bin::decode(format, bytes.as_slice())?;

        let mut text = Vec::new();
        doc.save_with(&mut text, LineEnding::CrLf)?;
        assert_eq!(
            detect(&text),
            Some(Detection {
                format,
                direction: Direction::ToBinary
            })
        );

        let loaded = Document::load(text.as_slice())?;
        assert_eq!(loaded, doc);

        let mut encoded = Vec::new();
        coalesced_bin::encode(&loaded, &mut encoded)?;
        assert_str_eq!(format!("{:02X?}", encoded), format!("{:02X?}", bytes));
    }

    Ok(())
}

#[test]
fn empty_archives() -> Result<()> {
    for format in CoalescedFormat::ALL {
        let doc = Document::new(format);

        let mut bytes = Vec::new();
        coalesced_bin::encode(&doc, &mut bytes)?;
        assert_eq!(coalesced_bin::decode(format, bytes.as_slice())?, doc);
    }

    Ok(())
}

#[test]
fn empty_input_is_end_of_data() {
    for format in [CoalescedFormat::Compact, CoalescedFormat::Compressed] {
        let err = coalesced_bin::decode(format, std::io::empty()).err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::EndOfData), "{format}");
    }

    // the header word is still required
    let err = coalesced_bin::decode(CoalescedFormat::Legacy, [0x00, 0x00].as_slice()).err();
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::EndOfData));
}

#[test]
fn failed_encode_writes_nothing() {
    let mut doc = Document::new(CoalescedFormat::Legacy);
    doc.file_mut("a.ini")
        .section_mut("core")
        .push_value("name", "\u{3042}");

    let mut out = Vec::new();
    let err = coalesced_bin::encode(&doc, &mut out).err();

    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Capacity));
    assert!(out.is_empty());
}

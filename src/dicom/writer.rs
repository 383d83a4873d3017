// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Part 10 file encoding.
//!
//! Sequences and items are always written with undefined length so nested
//! edits never require recomputing enclosing lengths.

use super::dataset::{DataSet, Element, Value};
use super::reader::UNDEFINED_LENGTH;
use super::tag::{self, Tag};
use super::vr::Vr;
use super::{DicomError, FileObject};

/// Encode a complete Part 10 file.
pub fn write_file(file: &FileObject) -> Result<Vec<u8>, DicomError> {
    let mut meta = Vec::new();
    for element in file.meta.iter().filter(|e| e.tag != tag::FILE_META_GROUP_LENGTH) {
        write_element(&mut meta, element, true)?;
    }

    let meta_len = u32::try_from(meta.len()).map_err(|_| DicomError::ValueTooLong {
        tag: tag::FILE_META_GROUP_LENGTH,
        len: meta.len(),
    })?;

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    write_element(
        &mut out,
        &Element::new(
            tag::FILE_META_GROUP_LENGTH,
            Vr::UL,
            Value::Bytes(meta_len.to_le_bytes().to_vec()),
        ),
        true,
    )?;
    out.extend_from_slice(&meta);

    write_dataset(&mut out, &file.dataset, file.transfer_syntax.is_explicit())?;
    Ok(out)
}

fn write_dataset(out: &mut Vec<u8>, ds: &DataSet, explicit: bool) -> Result<(), DicomError> {
    // Group lengths go stale as soon as anything is edited.
    for element in ds.iter().filter(|e| !e.tag.is_group_length()) {
        write_element(out, element, explicit)?;
    }
    Ok(())
}

fn write_element(out: &mut Vec<u8>, element: &Element, explicit: bool) -> Result<(), DicomError> {
    match &element.value {
        Value::Bytes(bytes) => {
            let padded = bytes.len() % 2 == 1;
            let len = bytes.len() + usize::from(padded);
            let len = u32::try_from(len)
                .ok()
                .filter(|l| *l != UNDEFINED_LENGTH)
                .ok_or(DicomError::ValueTooLong {
                    tag: element.tag,
                    len,
                })?;
            write_header(out, element.tag, element.vr, len, explicit)?;
            out.extend_from_slice(bytes);
            if padded {
                out.push(element.vr.padding());
            }
        }
        Value::Sequence(items) => {
            write_header(out, element.tag, Vr::SQ, UNDEFINED_LENGTH, explicit)?;
            for item in items {
                write_delimiter(out, tag::ITEM, UNDEFINED_LENGTH);
                write_dataset(out, item, explicit)?;
                write_delimiter(out, tag::ITEM_DELIMITATION, 0);
            }
            write_delimiter(out, tag::SEQUENCE_DELIMITATION, 0);
        }
        Value::Fragments(fragments) => {
            write_header(out, element.tag, element.vr, UNDEFINED_LENGTH, explicit)?;
            for fragment in fragments {
                let padded = fragment.len() % 2 == 1;
                let len = fragment.len() + usize::from(padded);
                let len = u32::try_from(len).map_err(|_| DicomError::ValueTooLong {
                    tag: element.tag,
                    len,
                })?;
                write_delimiter(out, tag::ITEM, len);
                out.extend_from_slice(fragment);
                if padded {
                    out.push(0);
                }
            }
            write_delimiter(out, tag::SEQUENCE_DELIMITATION, 0);
        }
    }
    Ok(())
}

fn write_tag(out: &mut Vec<u8>, tag: Tag) {
    out.extend_from_slice(&tag.group.to_le_bytes());
    out.extend_from_slice(&tag.element.to_le_bytes());
}

fn write_delimiter(out: &mut Vec<u8>, tag: Tag, len: u32) {
    write_tag(out, tag);
    out.extend_from_slice(&len.to_le_bytes());
}

fn write_header(
    out: &mut Vec<u8>,
    tag: Tag,
    vr: Vr,
    len: u32,
    explicit: bool,
) -> Result<(), DicomError> {
    write_tag(out, tag);
    if !explicit {
        out.extend_from_slice(&len.to_le_bytes());
        return Ok(());
    }

    out.extend_from_slice(&vr.code());
    if vr.has_long_length() {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&len.to_le_bytes());
    } else {
        let short = u16::try_from(len).map_err(|_| DicomError::ValueTooLong {
            tag,
            len: len as usize,
        })?;
        out.extend_from_slice(&short.to_le_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::TransferSyntax;

    #[test]
    fn test_meta_group_length_is_recomputed() {
        let mut ds = DataSet::new();
        ds.set_string(tag::SOP_INSTANCE_UID, "1.2.3");
        let file = FileObject::new(ds, TransferSyntax::ExplicitVrLittleEndian);

        let bytes = write_file(&file).unwrap();
        assert_eq!(&bytes[128..132], b"DICM");
        // (0002,0000) UL 4 <len>
        assert_eq!(&bytes[132..140], &[0x02, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00]);
        let declared = u32::from_le_bytes([bytes[140], bytes[141], bytes[142], bytes[143]]);

        let meta_end = 144 + declared as usize;
        // First dataset element follows immediately after the meta group.
        assert_eq!(&bytes[meta_end..meta_end + 4], &[0x08, 0x00, 0x18, 0x00]);
    }

    #[test]
    fn test_short_length_overflow_is_an_error() {
        let mut ds = DataSet::new();
        ds.insert(Element::new(
            Tag::new(0x0010, 0x0020),
            Vr::LO,
            Value::Bytes(vec![b'A'; 70_000]),
        ));
        let file = FileObject::new(ds, TransferSyntax::ExplicitVrLittleEndian);
        assert!(matches!(
            write_file(&file),
            Err(DicomError::ValueTooLong { .. })
        ));

        // Implicit VR has a 32-bit length for everything.
        let mut implicit = file.clone();
        implicit.transfer_syntax = TransferSyntax::ImplicitVrLittleEndian;
        assert!(write_file(&implicit).is_ok());
    }
}

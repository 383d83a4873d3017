// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Part 10 file parsing.

use super::dataset::{DataSet, Element, Value};
use super::dictionary;
use super::tag::{self, Tag};
use super::vr::Vr;
use super::{DicomError, FileObject, TransferSyntax};

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
pub(crate) const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Parse a complete Part 10 file.
pub fn read_file(data: &[u8]) -> Result<FileObject, DicomError> {
    if data.len() < PREAMBLE_LEN + MAGIC.len() || &data[PREAMBLE_LEN..PREAMBLE_LEN + 4] != MAGIC {
        return Err(DicomError::NotDicom);
    }

    // File meta information is always explicit VR little endian.
    let mut reader = Reader::new(data, PREAMBLE_LEN + MAGIC.len(), true);
    let mut meta = DataSet::new();
    while reader.peek_tag().is_some_and(|t| t.group == 0x0002) {
        meta.insert(reader.read_element()?);
    }

    let ts_uid = meta
        .string(tag::TRANSFER_SYNTAX_UID)
        .filter(|uid| !uid.is_empty())
        .ok_or(DicomError::MissingTransferSyntax)?;
    let transfer_syntax = TransferSyntax::from_uid(&ts_uid)?;

    reader.explicit = transfer_syntax.is_explicit();
    let dataset = reader.read_until(data.len())?;

    Ok(FileObject {
        meta,
        dataset,
        transfer_syntax,
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    explicit: bool,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize, explicit: bool) -> Self {
        Self {
            data,
            pos,
            explicit,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DicomError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(DicomError::Truncated { offset: self.pos })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, DicomError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DicomError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn tag(&mut self) -> Result<Tag, DicomError> {
        let group = self.u16()?;
        let element = self.u16()?;
        Ok(Tag::new(group, element))
    }

    fn peek_tag(&self) -> Option<Tag> {
        let b = self.data.get(self.pos..self.pos + 4)?;
        Some(Tag::new(
            u16::from_le_bytes([b[0], b[1]]),
            u16::from_le_bytes([b[2], b[3]]),
        ))
    }

    /// End offset of a defined-length value starting at the current position.
    fn end_of(&self, len: u32) -> Result<usize, DicomError> {
        self.pos
            .checked_add(len as usize)
            .filter(|end| *end <= self.data.len())
            .ok_or(DicomError::Truncated { offset: self.pos })
    }

    /// Read elements up to (exclusive) byte offset `end`.
    fn read_until(&mut self, end: usize) -> Result<DataSet, DicomError> {
        let mut ds = DataSet::new();
        while self.pos < end {
            ds.insert(self.read_element()?);
        }
        Ok(ds)
    }

    fn read_element(&mut self) -> Result<Element, DicomError> {
        let start = self.pos;
        let tag = self.tag()?;
        if tag.group == 0xFFFE {
            return Err(DicomError::UnexpectedTag { tag, offset: start });
        }

        let (vr, len) = if self.explicit {
            let code = self.take(2)?;
            let vr = Vr::from_bytes([code[0], code[1]]).ok_or_else(|| DicomError::InvalidVr {
                tag,
                code: String::from_utf8_lossy(code).into_owned(),
            })?;
            let len = if vr.has_long_length() {
                self.take(2)?;
                self.u32()?
            } else {
                u32::from(self.u16()?)
            };
            (vr, len)
        } else {
            let len = self.u32()?;
            let vr = dictionary::vr_of(tag).unwrap_or(if tag.is_group_length() {
                Vr::UL
            } else {
                Vr::UN
            });
            (vr, len)
        };

        let undefined = len == UNDEFINED_LENGTH;

        if vr == Vr::SQ || (undefined && (vr == Vr::UN || !self.explicit) && tag != tag::PIXEL_DATA)
        {
            // Undefined-length UN is an implicit VR sequence (PS3.5 6.2.2).
            let explicit = self.explicit && vr != Vr::UN;
            let items = self.read_sequence(len, explicit)?;
            return Ok(Element::sequence(tag, items));
        }

        if undefined {
            let fragments = self.read_fragments()?;
            return Ok(Element::new(tag, vr, Value::Fragments(fragments)));
        }

        let bytes = self.take(len as usize)?.to_vec();
        Ok(Element::new(tag, vr, Value::Bytes(bytes)))
    }

    fn read_sequence(&mut self, len: u32, explicit: bool) -> Result<Vec<DataSet>, DicomError> {
        let saved = self.explicit;
        self.explicit = explicit;
        let items = self.read_items(len);
        self.explicit = saved;
        items
    }

    fn read_items(&mut self, len: u32) -> Result<Vec<DataSet>, DicomError> {
        let mut items = Vec::new();

        if len == UNDEFINED_LENGTH {
            loop {
                let offset = self.pos;
                let tag = self.tag()?;
                let item_len = self.u32()?;
                match tag {
                    tag::SEQUENCE_DELIMITATION => break,
                    tag::ITEM => items.push(self.read_item(item_len)?),
                    other => return Err(DicomError::UnexpectedTag { tag: other, offset }),
                }
            }
        } else {
            let end = self.end_of(len)?;
            while self.pos < end {
                let offset = self.pos;
                let tag = self.tag()?;
                let item_len = self.u32()?;
                if tag != tag::ITEM {
                    return Err(DicomError::UnexpectedTag { tag, offset });
                }
                items.push(self.read_item(item_len)?);
            }
        }

        Ok(items)
    }

    fn read_item(&mut self, len: u32) -> Result<DataSet, DicomError> {
        if len != UNDEFINED_LENGTH {
            let end = self.end_of(len)?;
            return self.read_until(end);
        }

        let mut ds = DataSet::new();
        loop {
            match self.peek_tag() {
                Some(tag::ITEM_DELIMITATION) => {
                    self.tag()?;
                    self.u32()?;
                    return Ok(ds);
                }
                Some(_) => {
                    ds.insert(self.read_element()?);
                }
                None => return Err(DicomError::Truncated { offset: self.pos }),
            }
        }
    }

    fn read_fragments(&mut self) -> Result<Vec<Vec<u8>>, DicomError> {
        let mut fragments = Vec::new();
        loop {
            let offset = self.pos;
            let tag = self.tag()?;
            let len = self.u32()?;
            match tag {
                tag::SEQUENCE_DELIMITATION => return Ok(fragments),
                tag::ITEM => fragments.push(self.take(len as usize)?.to_vec()),
                other => return Err(DicomError::UnexpectedTag { tag: other, offset }),
            }
        }
    }
}

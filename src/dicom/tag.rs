// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! DICOM attribute tags.

use std::fmt;

/// A (group, element) attribute tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Private attributes live in odd-numbered groups.
    pub fn is_private(&self) -> bool {
        self.group % 2 == 1
    }

    /// Group length attributes, `(gggg,0000)`.
    pub fn is_group_length(&self) -> bool {
        self.element == 0x0000
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

// Delimitation items carry no VR in either encoding.
pub const ITEM: Tag = Tag::new(0xFFFE, 0xE000);
pub const ITEM_DELIMITATION: Tag = Tag::new(0xFFFE, 0xE00D);
pub const SEQUENCE_DELIMITATION: Tag = Tag::new(0xFFFE, 0xE0DD);

pub const FILE_META_GROUP_LENGTH: Tag = Tag::new(0x0002, 0x0000);
pub const FILE_META_INFORMATION_VERSION: Tag = Tag::new(0x0002, 0x0001);
pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag::new(0x0002, 0x0002);
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag::new(0x0002, 0x0003);
pub const TRANSFER_SYNTAX_UID: Tag = Tag::new(0x0002, 0x0010);
pub const IMPLEMENTATION_CLASS_UID: Tag = Tag::new(0x0002, 0x0012);
pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag::new(0x0002, 0x0013);

pub const SOP_CLASS_UID: Tag = Tag::new(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008, 0x0018);
pub const PIXEL_DATA: Tag = Tag::new(0x7FE0, 0x0010);

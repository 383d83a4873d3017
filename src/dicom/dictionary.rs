// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attribute dictionary backed by the standard PS3.6 registry.
//!
//! Private attributes and the generic group length / private creator ranges
//! have no keyword, so profile rules never address them.

use super::tag::Tag;
use super::vr::Vr;
use dicom_core::dictionary::{DataDictionary, DataDictionaryEntryRef, TagRange, VirtualVr};
use dicom_dictionary_std::StandardDataDictionary;

/// A dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tag: Tag,
    pub keyword: &'static str,
    pub vr: Vr,
}

impl Entry {
    fn from_std(entry: &DataDictionaryEntryRef<'static>) -> Option<Self> {
        if matches!(entry.tag, TagRange::GroupLength | TagRange::PrivateCreator) {
            return None;
        }
        let tag = entry.tag.inner();
        Some(Self {
            tag: Tag::new(tag.0, tag.1),
            keyword: entry.alias,
            vr: resolve_vr(entry.vr),
        })
    }
}

/// Context-dependent VRs resolve to the form used in implicit VR streams.
fn resolve_vr(vr: VirtualVr) -> Vr {
    match vr {
        VirtualVr::Exact(vr) => Vr::from_bytes(vr.to_bytes()).unwrap_or(Vr::UN),
        VirtualVr::Xs => Vr::US,
        _ => Vr::OW,
    }
}

/// Look up an entry by tag, including repeating groups such as overlays.
pub fn by_tag(tag: Tag) -> Option<Entry> {
    if tag.is_private() {
        return None;
    }
    StandardDataDictionary
        .by_tag(dicom_core::Tag(tag.group, tag.element))
        .and_then(Entry::from_std)
        .map(|entry| Entry { tag, ..entry })
}

/// Look up an entry by keyword.
pub fn by_keyword(keyword: &str) -> Option<Entry> {
    StandardDataDictionary
        .by_name(keyword)
        .and_then(Entry::from_std)
}

pub fn keyword_of(tag: Tag) -> Option<&'static str> {
    by_tag(tag).map(|e| e.keyword)
}

pub fn vr_of(tag: Tag) -> Option<Vr> {
    by_tag(tag).map(|e| e.vr)
}

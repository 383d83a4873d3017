// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory data elements and datasets.

use super::dictionary;
use super::tag::Tag;
use super::vr::Vr;
use super::DicomError;
use std::collections::BTreeMap;

/// Element payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw little-endian value bytes, including any padding.
    Bytes(Vec<u8>),
    /// Sequence items.
    Sequence(Vec<DataSet>),
    /// Encapsulated pixel data fragments (the basic offset table is the first fragment).
    Fragments(Vec<Vec<u8>>),
}

/// A single data element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub vr: Vr,
    pub value: Value,
}

impl Element {
    pub fn new(tag: Tag, vr: Vr, value: Value) -> Self {
        Self { tag, vr, value }
    }

    /// Build a character-data element, padding to an even length.
    pub fn from_text(tag: Tag, vr: Vr, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        if bytes.len() % 2 == 1 {
            bytes.push(vr.padding());
        }
        Self::new(tag, vr, Value::Bytes(bytes))
    }

    /// Build a multi-valued character-data element.
    pub fn from_texts(tag: Tag, vr: Vr, values: &[String]) -> Self {
        Self::from_text(tag, vr, &values.join("\\"))
    }

    pub fn sequence(tag: Tag, items: Vec<DataSet>) -> Self {
        Self::new(tag, Vr::SQ, Value::Sequence(items))
    }

    pub fn keyword(&self) -> Option<&'static str> {
        dictionary::keyword_of(self.tag)
    }

    pub fn items(&self) -> Option<&[DataSet]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<DataSet>> {
        match &mut self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Character data with trailing padding removed.
    pub fn to_str(&self) -> Option<String> {
        match &self.value {
            Value::Bytes(bytes) if self.vr.is_string() => {
                let text = String::from_utf8_lossy(bytes);
                Some(text.trim_end_matches(['\0', ' ']).to_string())
            }
            _ => None,
        }
    }

    /// Individual values of a multi-valued string.
    pub fn strings(&self) -> Vec<String> {
        let Some(text) = self.to_str() else {
            return Vec::new();
        };
        if text.is_empty() {
            return Vec::new();
        }
        if self.vr.is_single_valued_text() {
            return vec![text];
        }
        text.split('\\').map(|s| s.trim().to_string()).collect()
    }

    /// Value multiplicity.
    pub fn vm(&self) -> usize {
        match &self.value {
            Value::Sequence(items) => items.len(),
            Value::Fragments(_) => 1,
            Value::Bytes(bytes) if self.vr.is_string() => {
                if bytes.is_empty() {
                    0
                } else {
                    self.strings().len()
                }
            }
            Value::Bytes(bytes) => match numeric_width(self.vr) {
                Some(width) => bytes.len() / width,
                None => usize::from(!bytes.is_empty()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Bytes(bytes) => match self.to_str() {
                Some(text) => text.is_empty(),
                None => bytes.is_empty(),
            },
            Value::Sequence(items) => items.is_empty(),
            Value::Fragments(fragments) => fragments.is_empty(),
        }
    }

    /// Human-readable rendering for reports and logs.
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::Sequence(items) => format!("<sequence of {} items>", items.len()),
            Value::Fragments(fragments) => {
                format!("<encapsulated, {} fragments>", fragments.len())
            }
            Value::Bytes(bytes) => {
                if let Some(text) = self.to_str() {
                    return text;
                }
                match display_numbers(self.vr, bytes) {
                    Some(numbers) => numbers,
                    None => format!("<{} bytes>", bytes.len()),
                }
            }
        }
    }
}

fn numeric_width(vr: Vr) -> Option<usize> {
    match vr {
        Vr::US | Vr::SS => Some(2),
        Vr::UL | Vr::SL | Vr::FL | Vr::AT => Some(4),
        Vr::FD | Vr::SV | Vr::UV => Some(8),
        _ => None,
    }
}

fn display_numbers(vr: Vr, bytes: &[u8]) -> Option<String> {
    let width = numeric_width(vr)?;
    let parts: Vec<String> = bytes
        .chunks_exact(width)
        .map(|c| match vr {
            Vr::US => u16::from_le_bytes([c[0], c[1]]).to_string(),
            Vr::SS => i16::from_le_bytes([c[0], c[1]]).to_string(),
            Vr::UL => u32::from_le_bytes([c[0], c[1], c[2], c[3]]).to_string(),
            Vr::SL => i32::from_le_bytes([c[0], c[1], c[2], c[3]]).to_string(),
            Vr::FL => f32::from_le_bytes([c[0], c[1], c[2], c[3]]).to_string(),
            Vr::AT => format!(
                "({:04X},{:04X})",
                u16::from_le_bytes([c[0], c[1]]),
                u16::from_le_bytes([c[2], c[3]])
            ),
            Vr::FD => f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                .to_string(),
            Vr::SV => i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                .to_string(),
            _ => u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                .to_string(),
        })
        .collect();
    Some(parts.join("\\"))
}

/// An ordered collection of data elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    elements: BTreeMap<Tag, Element>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut Element> {
        self.elements.get_mut(&tag)
    }

    pub fn get_by_keyword(&self, keyword: &str) -> Option<&Element> {
        dictionary::by_keyword(keyword).and_then(|e| self.get(e.tag))
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn insert(&mut self, element: Element) -> Option<Element> {
        self.elements.insert(element.tag, element)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        self.elements.remove(&tag)
    }

    /// Elements in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.elements.keys().copied().collect()
    }

    /// String value of an element, with padding removed.
    pub fn string(&self, tag: Tag) -> Option<String> {
        self.get(tag).and_then(Element::to_str)
    }

    pub fn keyword_string(&self, keyword: &str) -> Option<String> {
        self.get_by_keyword(keyword).and_then(Element::to_str)
    }

    /// Set a string value, keeping the VR of an existing element.
    pub fn set_string(&mut self, tag: Tag, value: &str) {
        let vr = self
            .get(tag)
            .map(|e| e.vr)
            .or_else(|| dictionary::vr_of(tag))
            .unwrap_or(Vr::LO);
        self.insert(Element::from_text(tag, vr, value));
    }

    /// Set a string value by dictionary keyword.
    pub fn set_keyword(&mut self, keyword: &str, value: &str) -> Result<(), DicomError> {
        let entry = dictionary::by_keyword(keyword)
            .ok_or_else(|| DicomError::UnknownKeyword(keyword.to_string()))?;
        self.set_string(entry.tag, value);
        Ok(())
    }

    /// Remove all private attributes, including those nested in sequences.
    pub fn remove_private_tags(&mut self) {
        self.elements.retain(|tag, _| !tag.is_private());
        for element in self.elements.values_mut() {
            if let Some(items) = element.items_mut() {
                for item in items {
                    item.remove_private_tags();
                }
            }
        }
    }
}

impl FromIterator<Element> for DataSet {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut ds = DataSet::new();
        for element in iter {
            ds.insert(element);
        }
        ds
    }
}

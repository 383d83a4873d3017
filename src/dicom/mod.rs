// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal DICOM Part 10 codec.
//!
//! Reads and writes little-endian files (implicit VR, explicit VR and
//! encapsulated pixel data) with full support for nested sequences. Values
//! are kept as raw bytes so that anything not explicitly modified is written
//! back unchanged.

pub mod dataset;
pub mod dictionary;
pub mod reader;
pub mod tag;
pub mod uid;
pub mod vr;
pub mod writer;

pub use dataset::{DataSet, Element, Value};
pub use tag::Tag;
pub use uid::generate_uid;
pub use vr::Vr;

use std::path::Path;

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// Compressed pixel data syntaxes whose dataset is plain explicit VR little
/// endian. Deflated, big endian and JPIP referenced syntaxes are not listed.
const ENCAPSULATED_SYNTAXES: &[&str] = &[
    // JPEG baseline, extended, lossless
    "1.2.840.10008.1.2.4.50",
    "1.2.840.10008.1.2.4.51",
    "1.2.840.10008.1.2.4.57",
    "1.2.840.10008.1.2.4.70",
    // JPEG-LS
    "1.2.840.10008.1.2.4.80",
    "1.2.840.10008.1.2.4.81",
    // JPEG 2000
    "1.2.840.10008.1.2.4.90",
    "1.2.840.10008.1.2.4.91",
    "1.2.840.10008.1.2.4.92",
    "1.2.840.10008.1.2.4.93",
    // MPEG-2, MPEG-4, HEVC
    "1.2.840.10008.1.2.4.100",
    "1.2.840.10008.1.2.4.101",
    "1.2.840.10008.1.2.4.102",
    "1.2.840.10008.1.2.4.103",
    "1.2.840.10008.1.2.4.104",
    "1.2.840.10008.1.2.4.105",
    "1.2.840.10008.1.2.4.106",
    "1.2.840.10008.1.2.4.107",
    "1.2.840.10008.1.2.4.108",
    // High-throughput JPEG 2000
    "1.2.840.10008.1.2.4.201",
    "1.2.840.10008.1.2.4.202",
    "1.2.840.10008.1.2.4.203",
    // RLE
    "1.2.840.10008.1.2.5",
];

const IMPLEMENTATION_CLASS: &str = "2.25.280841993563513373386052516426213536178";
const IMPLEMENTATION_VERSION: &str = "MEASAPI_01";

/// Errors from reading or writing DICOM files.
#[derive(Debug, thiserror::Error)]
pub enum DicomError {
    #[error("Not a DICOM Part 10 file (missing DICM prefix)")]
    NotDicom,

    #[error("Unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("Invalid VR {code:?} for tag {tag}")]
    InvalidVr { tag: Tag, code: String },

    #[error("Unexpected tag {tag} at offset {offset}")]
    UnexpectedTag { tag: Tag, offset: usize },

    #[error("Missing transfer syntax in file meta information")]
    MissingTransferSyntax,

    #[error("Unsupported transfer syntax: {0}")]
    UnsupportedTransferSyntax(String),

    #[error("Value of {tag} is too long ({len} bytes)")]
    ValueTooLong { tag: Tag, len: usize },

    #[error("Unknown attribute keyword: {0}")]
    UnknownKeyword(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Dataset encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSyntax {
    ImplicitVrLittleEndian,
    ExplicitVrLittleEndian,
    /// Compressed pixel data; the dataset itself is explicit VR little endian.
    Encapsulated(String),
}

impl TransferSyntax {
    pub fn from_uid(uid: &str) -> Result<Self, DicomError> {
        match uid {
            IMPLICIT_VR_LITTLE_ENDIAN => Ok(Self::ImplicitVrLittleEndian),
            EXPLICIT_VR_LITTLE_ENDIAN => Ok(Self::ExplicitVrLittleEndian),
            other if ENCAPSULATED_SYNTAXES.contains(&other) => {
                Ok(Self::Encapsulated(other.to_string()))
            }
            other => Err(DicomError::UnsupportedTransferSyntax(other.to_string())),
        }
    }

    pub fn uid(&self) -> &str {
        match self {
            Self::ImplicitVrLittleEndian => IMPLICIT_VR_LITTLE_ENDIAN,
            Self::ExplicitVrLittleEndian => EXPLICIT_VR_LITTLE_ENDIAN,
            Self::Encapsulated(uid) => uid,
        }
    }

    pub fn is_explicit(&self) -> bool {
        !matches!(self, Self::ImplicitVrLittleEndian)
    }
}

/// A DICOM file: file meta information plus the main dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FileObject {
    pub meta: DataSet,
    pub dataset: DataSet,
    pub transfer_syntax: TransferSyntax,
}

impl FileObject {
    /// Wrap a dataset with freshly built file meta information.
    pub fn new(dataset: DataSet, transfer_syntax: TransferSyntax) -> Self {
        let sop_class = dataset.string(tag::SOP_CLASS_UID).unwrap_or_default();
        let sop_instance = dataset.string(tag::SOP_INSTANCE_UID).unwrap_or_default();

        let mut meta = DataSet::new();
        meta.insert(Element::new(
            tag::FILE_META_INFORMATION_VERSION,
            Vr::OB,
            Value::Bytes(vec![0x00, 0x01]),
        ));
        meta.insert(Element::from_text(
            tag::MEDIA_STORAGE_SOP_CLASS_UID,
            Vr::UI,
            &sop_class,
        ));
        meta.insert(Element::from_text(
            tag::MEDIA_STORAGE_SOP_INSTANCE_UID,
            Vr::UI,
            &sop_instance,
        ));
        meta.insert(Element::from_text(
            tag::TRANSFER_SYNTAX_UID,
            Vr::UI,
            transfer_syntax.uid(),
        ));
        meta.insert(Element::from_text(
            tag::IMPLEMENTATION_CLASS_UID,
            Vr::UI,
            IMPLEMENTATION_CLASS,
        ));
        meta.insert(Element::from_text(
            tag::IMPLEMENTATION_VERSION_NAME,
            Vr::SH,
            IMPLEMENTATION_VERSION,
        ));

        Self {
            meta,
            dataset,
            transfer_syntax,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DicomError> {
        reader::read_file(data)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DicomError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DicomError> {
        writer::write_file(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DicomError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod anonymizer;
pub mod audit;
pub mod batch;
pub mod hashing;
pub mod pacs;
pub mod profile;
pub mod reports;

pub use anonymizer::{AnonymizerEngine, UidOverrides};
pub use batch::{BatchAnonymizer, BatchOptions, BatchSummary};
pub use pacs::PacsClient;
pub use profile::{Action, Profile};

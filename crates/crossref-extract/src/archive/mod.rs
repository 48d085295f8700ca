//! Archive decoding.
//!
//! Crossref dumps ship as many gzip files, each holding one JSON object of
//! the form `{"items": [record, record, ...]}`. Each file holds hundreds of
//! thousands of records, so the [`ArchiveDecoder`] never materializes the
//! array: it validates the envelope and then pulls one element at a time.
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────────────────────┐
//! │ .json.gz │ → │ MultiGzDecoder│ → │ ArchiveDecoder               │
//! └──────────┘   └───────────────┘   │  {"items": [  → envelope     │
//!                                    │  r1, r2, ...  → Record each  │
//!                                    └──────────────────────────────┘
//! ```

mod decoder;

pub use decoder::{ArchiveDecoder, MAX_RECORD_BYTES};

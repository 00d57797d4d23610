//! Pipeline stages for PDF-to-CSV product extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the model stage can run against a stub.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ llm ──▶ flatten ──▶ table
//! (bytes)  (pdfium) (JSON)  (per record) (CSV)
//! ```
//!
//! 1. [`input`]   — read the user-supplied path or download the URL
//! 2. [`text`]    — accumulate page text; fails on malformed documents
//! 3. [`llm`]     — prompt the model and recover a JSON array; never fails,
//!    an unusable reply is an empty list
//! 4. [`flatten`] — collapse each nested record into `a_b_c` columns
//! 5. [`table`]   — fix the header from the first record, write the CSV

pub mod flatten;
pub mod input;
pub mod llm;
pub mod table;
pub mod text;

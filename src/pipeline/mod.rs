//! Text acquisition stages.
//!
//! Each submodule implements exactly one step; [`acquire`] ties them
//! together for a single source.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──────────────────────────────┐
//! (path/URL) (pdfium embedded text)            ├─▶ acquire ──▶ normalize
//!              └─(too thin)─▶ render ──▶ ocr ──┘   (pick the richer candidate)
//!                             (pdfium)  (VLM)
//! ```
//!
//! 1. [`input`]  — resolve a path or URL to PDF bytes, checking the `%PDF` magic
//! 2. [`text`]   — embedded text per page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`render`] — rasterise pages for OCR
//! 4. [`ocr`]    — transcribe page images with a vision model, with
//!    retry/backoff; the only stage with LLM network I/O
//! 5. [`acquire`] — threshold check and candidate selection
//! 6. [`normalize`] — deterministic cleanup before layout classification

pub mod acquire;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod render;
pub mod text;

//! Adapter stages around the state machine.
//!
//! Each submodule implements exactly one transformation step and knows
//! nothing about workflow state; [`crate::session::Session`] turns their
//! results into events.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ (Loaded state) ──▶ render ──▶ encode
//! (bytes)   (size)                       (resvg)    (png/jpg/webp)
//! ```
//!
//! 1. [`input`]  — read the uploaded file and decode it as text
//! 2. [`parse`]  — extract intrinsic dimensions from the root `<svg>` element
//! 3. [`render`] — rasterise to the scaled size on a blocking thread
//! 4. [`encode`] — encode the pixels in the target format

pub mod encode;
pub mod input;
pub mod parse;
pub mod render;

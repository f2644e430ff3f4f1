//! Text manipulation utilities.
//!
//! This module provides utilities for working with text content:
//! - Position mapping between LSP (UTF-16) and byte offsets
//! - Contiguous change ranges and their tree-sitter edits

pub mod edits;
pub mod position;

pub use edits::{TextChange, apply_content_changes, diff_change};
pub use position::{
    PositionMapper, compute_line_starts, convert_byte_to_utf16_in_line,
    convert_utf16_to_byte_in_line,
};

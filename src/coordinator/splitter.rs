//! Block decomposition of a file
//!
//! A file of `file_size` bytes is cut into `ceil(file_size / block_size)`
//! contiguous blocks. Every block except possibly the last is exactly
//! `block_size` bytes. Block ids look like
//! `block_<sanitized-name>_<4-digit-index>_<8-hex-suffix>`; the suffix is
//! random, so two splits of the same file never produce the same ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name used when a file name is missing or has no alphanumeric characters.
pub const UNKNOWN_FILE: &str = "unknown_file";

const SUFFIX_LEN: usize = 8;

/// One contiguous byte range of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub block_id: String,
    pub start_offset: u64,
    pub end_offset: u64,
    pub size: u64,
}

/// Collapse every run of non-alphanumeric characters into one `_` and trim
/// underscores from both ends.
pub fn sanitize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    let mut in_run = false;
    for c in filename.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        UNKNOWN_FILE.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn generate_block_id(sanitized: &str, index: u64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("block_{}_{:04}_{}", sanitized, index, &suffix[..SUFFIX_LEN])
}

/// Split a file into blocks.
///
/// Returns an empty vec for a zero-byte file; callers treat that as
/// "nothing to upload". Allocates one descriptor per block, so callers
/// bound `file_size / block_size` first.
pub fn split_file(filename: &str, file_size: u64, block_size: u64) -> Vec<BlockDescriptor> {
    debug_assert!(block_size > 0);
    if file_size == 0 {
        tracing::warn!(filename, file_size, "File has no bytes to split");
        return Vec::new();
    }

    let sanitized = sanitize_filename(filename);
    let num_blocks = file_size.div_ceil(block_size);

    let blocks: Vec<BlockDescriptor> = (0..num_blocks)
        .map(|i| {
            let start_offset = i * block_size;
            let end_offset = (i + 1).saturating_mul(block_size).min(file_size);
            BlockDescriptor {
                block_id: generate_block_id(&sanitized, i),
                start_offset,
                end_offset,
                size: end_offset - start_offset,
            }
        })
        .collect();

    tracing::debug!(
        filename,
        file_size,
        num_blocks,
        "Split file into blocks"
    );
    blocks
}

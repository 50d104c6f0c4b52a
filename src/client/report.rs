//! Human-readable block assignment tables

use crate::common::format_bytes;
use crate::coordinator::state::FileAssignment;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;
const MAX_NODES_WIDTH: usize = 30;

pub fn render_assignment(filename: &str, assignment: &FileAssignment) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n--- Results for {} ---", filename);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "FILE UPLOAD RESULT");
    let _ = writeln!(out, "{}", rule);

    if assignment.blocks.is_empty() {
        let _ = writeln!(out, "No blocks assigned (empty file)");
        let _ = writeln!(out, "{}", rule);
        return out;
    }

    let total: u64 = assignment.blocks.iter().map(|b| b.size).sum();
    let _ = writeln!(out, "Total file size: {} bytes ({})", total, format_bytes(total));
    let _ = writeln!(out, "Number of blocks: {}", assignment.blocks.len());
    let _ = writeln!(out, "Block size: {}", format_bytes(assignment.blocks[0].size));
    let _ = writeln!(out, "\nBlock Assignment Table:");
    let _ = writeln!(out, "{}", thin);
    let _ = writeln!(
        out,
        "{:<8} {:<40} {:<12} Assigned DataNodes",
        "Block", "Block ID", "Size (MB)"
    );
    let _ = writeln!(out, "{}", thin);

    for (i, block) in assignment.blocks.iter().enumerate() {
        let size_mb = block.size as f64 / 1024.0 / 1024.0;
        let mut nodes = block.assigned_datanodes.join(", ");
        if nodes.len() > MAX_NODES_WIDTH {
            let cut = (0..=MAX_NODES_WIDTH - 3)
                .rev()
                .find(|&i| nodes.is_char_boundary(i))
                .unwrap_or(0);
            nodes.truncate(cut);
            nodes.push_str("...");
        }
        let _ = writeln!(
            out,
            "{:<8} {:<40} {:<12.1} {}",
            i + 1,
            block.block_id,
            size_mb,
            nodes
        );
    }
    let _ = writeln!(out, "{}", rule);
    out
}

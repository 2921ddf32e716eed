//! Component D: breaks an oversize AMA article into continuation-linked
//! segments. Ported from the greedy pop-back-into-next-segment cascade in
//! `original_source/mambler.py`'s `split_article` — determinism and bounded
//! output size are the goals, not optimal segment count (spec.md §9).

use std::collections::HashSet;

use crate::ama::{encode_line, encode_payload, AMA_MAX_BYTES};
use crate::codepage::CodepageInfo;
use crate::error::{Error, Result};

const CONTINUE_LABEL: &str = "Continue";
/// 12-character placeholder target used to size the worst-case trailer.
const PLACEHOLDER_TARGET: &str = "XXXXXXXX.XXX";

fn continue_overhead() -> usize {
    // A blank separating line ("\n") plus the trailer line itself.
    let trailer = format!("%l{}:{}%t", PLACEHOLDER_TARGET, CONTINUE_LABEL);
    1 + trailer.len() + 1
}

/// Split `lines` (already assigned to `ama_name`) into one or more named
/// segments, each encoding to at most [`AMA_MAX_BYTES`] under `codepage`.
/// `existing_names` is the set of AMA filenames already assigned in the
/// book; new continuation names avoid colliding with it and are inserted
/// into it as they're chosen.
pub fn split_article(
    ama_name: &str,
    lines: Vec<String>,
    codepage: &CodepageInfo,
    existing_names: &mut HashSet<String>,
) -> Result<Vec<(String, Vec<String>)>> {
    if encode_payload(&lines, codepage, ama_name)?.len() <= AMA_MAX_BYTES {
        return Ok(vec![(ama_name.to_string(), lines)]);
    }

    let mut segments: Vec<Vec<String>> = Vec::new();
    let mut segment_sizes: Vec<usize> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_size = 0usize;

    for (line_no, line) in lines.iter().enumerate() {
        let size = encode_line(line, codepage, ama_name, line_no)?.len() + 1;
        if size > AMA_MAX_BYTES {
            return Err(Error::LineTooLarge {
                article: ama_name.to_string(),
                line_no,
            });
        }
        if current_size + size > AMA_MAX_BYTES && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
            segment_sizes.push(current_size);
            current_size = 0;
        }
        if current_size + size > AMA_MAX_BYTES {
            return Err(Error::LineTooLarge {
                article: ama_name.to_string(),
                line_no,
            });
        }
        current.push(line.clone());
        current_size += size;
    }
    if !current.is_empty() {
        segments.push(current);
        segment_sizes.push(current_size);
    }

    if segments.is_empty() {
        return Ok(vec![(ama_name.to_string(), lines)]);
    }

    let soft_limit = AMA_MAX_BYTES.saturating_sub(continue_overhead());
    let mut idx = 0usize;
    while idx + 1 < segments.len() {
        if segments[idx].is_empty() {
            segments.remove(idx);
            segment_sizes.remove(idx);
            if idx > 0 {
                idx -= 1;
            }
            continue;
        }
        if segment_sizes[idx] <= soft_limit {
            idx += 1;
            continue;
        }

        let moved_line = segments[idx].pop().expect("checked non-empty above");
        let moved_size = encode_line(&moved_line, codepage, ama_name, 0)?.len() + 1;
        segment_sizes[idx] -= moved_size;
        segments[idx + 1].insert(0, moved_line);
        segment_sizes[idx + 1] += moved_size;

        if segments[idx].is_empty() {
            segments.remove(idx);
            segment_sizes.remove(idx);
            if idx > 0 {
                idx -= 1;
            }
            continue;
        }

        let mut cascade = idx + 1;
        while cascade < segments.len() && segment_sizes[cascade] > AMA_MAX_BYTES {
            let overflow_line = segments[cascade].pop().expect("cascade segment non-empty");
            let overflow_size = encode_line(&overflow_line, codepage, ama_name, 0)?.len() + 1;
            if overflow_size > AMA_MAX_BYTES {
                return Err(Error::LineTooLarge {
                    article: ama_name.to_string(),
                    line_no: 0,
                });
            }
            segment_sizes[cascade] -= overflow_size;
            if cascade + 1 < segments.len() {
                segments[cascade + 1].insert(0, overflow_line);
                segment_sizes[cascade + 1] += overflow_size;
            } else {
                segments.push(vec![overflow_line]);
                segment_sizes.push(overflow_size);
            }
            if segments[cascade].is_empty() {
                segments.remove(cascade);
                segment_sizes.remove(cascade);
                break;
            }
        }
    }

    if segments.len() == 1 {
        return Ok(vec![(ama_name.to_string(), segments.remove(0))]);
    }

    let stem = ama_name.strip_suffix(".AMA").unwrap_or(ama_name);
    let mut generated_names = vec![ama_name.to_string()];
    let mut local_names: HashSet<String> = HashSet::new();
    local_names.insert(ama_name.to_string());

    for seg_idx in 1..segments.len() {
        let mut suffix = format!("{:02}", seg_idx);
        let mut new_name = continuation_name(stem, &suffix);
        let mut counter = 1u32;
        while local_names.contains(&new_name) || existing_names.contains(&new_name) {
            suffix = format!("{:02}{}", seg_idx, counter);
            new_name = continuation_name(stem, &suffix);
            counter += 1;
        }
        generated_names.push(new_name.clone());
        local_names.insert(new_name);
    }

    let mut result = Vec::with_capacity(generated_names.len());
    for (seg_idx, name) in generated_names.iter().enumerate() {
        let mut segment_lines = segments[seg_idx].clone();
        if seg_idx < generated_names.len() - 1 {
            segment_lines.push(String::new());
            segment_lines.push(format!(
                "%l{}:{}%t",
                generated_names[seg_idx + 1],
                CONTINUE_LABEL
            ));
            if encode_payload(&segment_lines, codepage, name)?.len() > AMA_MAX_BYTES {
                return Err(Error::SplitInfeasible {
                    article: name.clone(),
                });
            }
        }
        existing_names.insert(name.clone());
        result.push((name.clone(), segment_lines));
    }

    Ok(result)
}

fn continuation_name(stem: &str, suffix: &str) -> String {
    let keep = stem.len().min(8usize.saturating_sub(suffix.len())).max(1);
    let trimmed = &stem[..keep.min(stem.len())];
    format!("{}{}.AMA", trimmed, suffix)
}

//! Sequence alignment for lines and characters
//!
//! A longest-matching-block aligner: find the longest common run, recurse on
//! both sides of it, and describe the result as opcodes. Used for:
//! - the bounded unified diff stored with every attempt
//! - change impact of mechanical fixes
//! - extracting single-line repairs and comparing code snippets

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

/// Kind of an aligned region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One aligned region: `a[a_range]` corresponds to `b[b_range]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

impl Opcode {
    fn new(tag: OpTag, a: Range<usize>, b: Range<usize>) -> Self {
        Self { tag, a, b }
    }
}

/// A run of `len` equal elements starting at `a[a_start]` and `b[b_start]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    a_start: usize,
    b_start: usize,
    len: usize,
}

/// Aligns two sequences.
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    blocks: Vec<Block>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let blocks = matching_blocks(a, b);
        Self { a, b, blocks }
    }

    /// Similarity in [0, 1]: `2 * matched / (len(a) + len(b))`.
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self.blocks.iter().map(|b| b.len).sum();
        2.0 * matched as f64 / total as f64
    }

    /// Opcodes covering both sequences end to end.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut codes = Vec::new();
        let (mut i, mut j) = (0, 0);
        for block in &self.blocks {
            let tag = match (i < block.a_start, j < block.b_start) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                codes.push(Opcode::new(tag, i..block.a_start, j..block.b_start));
            }
            i = block.a_start + block.len;
            j = block.b_start + block.len;
            if block.len > 0 {
                codes.push(Opcode::new(OpTag::Equal, block.a_start..i, block.b_start..j));
            }
        }
        codes
    }

    /// Opcodes split into hunks with at most `context` equal elements around
    /// each change.
    pub fn grouped_opcodes(&self, context: usize) -> Vec<Vec<Opcode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(Opcode::new(OpTag::Equal, 0..1, 0..1));
        }

        if let Some(first) = codes.first_mut() {
            if first.tag == OpTag::Equal {
                let a_start = first.a.start.max(first.a.end.saturating_sub(context));
                let b_start = first.b.start.max(first.b.end.saturating_sub(context));
                first.a.start = a_start;
                first.b.start = b_start;
            }
        }
        if let Some(last) = codes.last_mut() {
            if last.tag == OpTag::Equal {
                last.a.end = last.a.end.min(last.a.start + context);
                last.b.end = last.b.end.min(last.b.start + context);
            }
        }

        let mut groups = Vec::new();
        let mut group = Vec::new();
        for code in codes {
            let Opcode { tag, mut a, mut b } = code;
            if tag == OpTag::Equal && a.len() > context * 2 {
                group.push(Opcode::new(
                    tag,
                    a.start..a.end.min(a.start + context),
                    b.start..b.end.min(b.start + context),
                ));
                groups.push(std::mem::take(&mut group));
                a.start = a.start.max(a.end - context);
                b.start = b.start.max(b.end - context);
            }
            group.push(Opcode::new(tag, a, b));
        }
        if !(group.is_empty() || (group.len() == 1 && group[0].tag == OpTag::Equal)) {
            groups.push(group);
        }
        groups
    }
}

fn matching_blocks<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<Block> {
    let mut b_index: HashMap<&T, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b_index.entry(item).or_default().push(j);
    }

    let mut found = Vec::new();
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let block = longest_match(a, &b_index, alo, ahi, blo, bhi);
        if block.len == 0 {
            continue;
        }
        if alo < block.a_start && blo < block.b_start {
            queue.push((alo, block.a_start, blo, block.b_start));
        }
        let (i_end, j_end) = (block.a_start + block.len, block.b_start + block.len);
        if i_end < ahi && j_end < bhi {
            queue.push((i_end, ahi, j_end, bhi));
        }
        found.push(block);
    }
    found.sort_by_key(|blk| (blk.a_start, blk.b_start));

    // Merge adjacent runs so opcodes never contain two touching equal regions.
    let mut merged: Vec<Block> = Vec::with_capacity(found.len() + 1);
    for blk in found {
        match merged.last_mut() {
            Some(prev)
                if prev.a_start + prev.len == blk.a_start
                    && prev.b_start + prev.len == blk.b_start =>
            {
                prev.len += blk.len;
            }
            _ => merged.push(blk),
        }
    }
    merged.push(Block {
        a_start: a.len(),
        b_start: b.len(),
        len: 0,
    });
    merged
}

fn longest_match<T: Eq + Hash>(
    a: &[T],
    b_index: &HashMap<&T, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> Block {
    let mut best = Block {
        a_start: alo,
        b_start: blo,
        len: 0,
    };
    // run length of matches ending at b[j], for the previous row of a
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();
    for (i, item) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs = HashMap::new();
        if let Some(positions) = b_index.get(item) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_ending_at.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_runs.insert(j, k);
                if k > best.len {
                    best = Block {
                        a_start: i + 1 - k,
                        b_start: j + 1 - k,
                        len: k,
                    };
                }
            }
        }
        run_ending_at = next_runs;
    }
    best
}

/// Character similarity of two strings.
pub fn char_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    SequenceMatcher::new(&a, &b).ratio()
}

fn format_range(start: usize, stop: usize) -> String {
    let len = stop - start;
    match len {
        1 => format!("{}", start + 1),
        0 => format!("{},0", start),
        _ => format!("{},{}", start + 1, len),
    }
}

/// Unified diff between two texts, line oriented.
///
/// Empty when the texts have identical lines.
pub fn unified_diff(
    old: &str,
    new: &str,
    from_label: &str,
    to_label: &str,
    context: usize,
) -> Vec<String> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let matcher = SequenceMatcher::new(&a, &b);

    let mut out = Vec::new();
    for group in matcher.grouped_opcodes(context) {
        if out.is_empty() {
            out.push(format!("--- {from_label}"));
            out.push(format!("+++ {to_label}"));
        }
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a.start, last.a.end),
            format_range(first.b.start, last.b.end)
        ));
        for code in &group {
            if code.tag == OpTag::Equal {
                out.extend(a[code.a.clone()].iter().map(|l| format!(" {l}")));
                continue;
            }
            if matches!(code.tag, OpTag::Replace | OpTag::Delete) {
                out.extend(a[code.a.clone()].iter().map(|l| format!("-{l}")));
            }
            if matches!(code.tag, OpTag::Replace | OpTag::Insert) {
                out.extend(b[code.b.clone()].iter().map(|l| format!("+{l}")));
            }
        }
    }
    out
}

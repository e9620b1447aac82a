//! `rg`/`RG` to `k`/`K` content stream rewriting.

use std::collections::HashSet;
use std::ops::Range;

use tracing::{trace, warn};

use super::{ColorTable, RgbKey};
use crate::pdf::lexer::{Lexer, Token, TokenKind};

/// Colors already reported as unmapped during one document pass.
#[derive(Debug, Default)]
pub struct UnmappedColors {
    seen: HashSet<RgbKey>,
}

impl UnmappedColors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a color. Returns `true` the first time it is seen.
    pub fn insert(&mut self, key: RgbKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Result of rewriting one content stream, or the parts of one.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome<T = Vec<u8>> {
    /// The rewritten bytes.
    pub content: T,
    /// Number of operators converted to CMYK.
    pub converted: usize,
    /// Number of RGB operators left alone because the table had no entry.
    pub unmapped: usize,
}

impl<T> RewriteOutcome<T> {
    /// True when at least one operator was replaced.
    pub fn changed(&self) -> bool {
        self.converted > 0
    }
}

/// Replace `input[start..end]` with `replacement`.
#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: Vec<u8>,
}

/// Rewrites device RGB color operators using a [`ColorTable`].
///
/// One rewriter is used for a whole document so that each unmapped color
/// is reported once, however many streams it appears in.
pub struct ContentRewriter<'t> {
    table: &'t ColorTable,
    warn_unmapped: bool,
    unmapped: UnmappedColors,
}

impl<'t> ContentRewriter<'t> {
    pub fn new(table: &'t ColorTable) -> Self {
        Self {
            table,
            warn_unmapped: false,
            unmapped: UnmappedColors::new(),
        }
    }

    /// Log a warning for each distinct color missing from the table.
    pub fn with_warn_unmapped(mut self, warn: bool) -> Self {
        self.warn_unmapped = warn;
        self
    }

    /// Distinct unmapped colors seen so far.
    pub fn unmapped(&self) -> &UnmappedColors {
        &self.unmapped
    }

    /// Rewrite one decoded content stream.
    ///
    /// Only the operands and operator of a converted `rg`/`RG` are
    /// touched; every other byte is copied through as is.
    pub fn rewrite(&mut self, input: &[u8]) -> RewriteOutcome {
        let (edits, unmapped) = self.edits(input);
        RewriteOutcome {
            content: apply(input, 0..input.len(), &edits),
            converted: edits.len(),
            unmapped,
        }
    }

    /// Rewrite the parts of a split content stream as one stream.
    ///
    /// Parts are lexed as if joined by a newline, so operands at the end
    /// of one part still pair with an operator starting the next. The
    /// CMYK operator replaces the RGB one in the part holding the operator;
    /// operand bytes in earlier parts are removed.
    pub fn rewrite_parts<P: AsRef<[u8]>>(
        &mut self,
        parts: &[P],
    ) -> RewriteOutcome<Vec<Vec<u8>>> {
        let mut joined = Vec::new();
        let mut ranges = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                joined.push(b'\n');
            }
            let start = joined.len();
            joined.extend_from_slice(part.as_ref());
            ranges.push(start..joined.len());
        }

        let (edits, unmapped) = self.edits(&joined);
        RewriteOutcome {
            content: ranges
                .into_iter()
                .map(|range| apply(&joined, range, &edits))
                .collect(),
            converted: edits.len(),
            unmapped,
        }
    }

    /// Find every convertible operator in `input`.
    fn edits(&mut self, input: &[u8]) -> (Vec<Edit>, usize) {
        let mut edits = Vec::new();
        let mut operands: Vec<Token> = Vec::new();
        let mut unmapped = 0;

        for token in Lexer::new(input) {
            match token.kind {
                TokenKind::Number(_) | TokenKind::Operand => {
                    operands.push(token);
                    continue;
                }
                TokenKind::InlineImage => {}
                TokenKind::Operator => {
                    let replacement = match token.bytes(input) {
                        b"rg" => Some('k'),
                        b"RG" => Some('K'),
                        _ => None,
                    };
                    if let (Some(op), Some(key)) = (replacement, rgb_operands(&operands)) {
                        match self.table.lookup(key) {
                            Some(cmyk) => {
                                let replacement = format!("{} {}", cmyk.operands(), op);
                                trace!("{} -> {}", key, replacement);
                                edits.push(Edit {
                                    start: operands[0].start,
                                    end: token.end,
                                    replacement: replacement.into_bytes(),
                                });
                            }
                            None => {
                                unmapped += 1;
                                if self.unmapped.insert(key) && self.warn_unmapped {
                                    warn!("No CMYK mapping for {}, color kept as RGB", key);
                                }
                            }
                        }
                    }
                }
            }
            operands.clear();
        }
        (edits, unmapped)
    }
}

/// Copy `input[range]` with `edits` applied. An edit reaching past the
/// range end only deletes; its replacement goes where it ends.
fn apply(input: &[u8], range: Range<usize>, edits: &[Edit]) -> Vec<u8> {
    let mut out = Vec::with_capacity(range.len());
    let mut cursor = range.start;
    for edit in edits {
        if edit.end <= range.start || edit.start >= range.end {
            continue;
        }
        let start = edit.start.max(range.start);
        out.extend_from_slice(&input[cursor..start]);
        if edit.end <= range.end {
            out.extend_from_slice(&edit.replacement);
        }
        cursor = edit.end.min(range.end);
    }
    out.extend_from_slice(&input[cursor..range.end]);
    out
}

/// The color key for exactly three numeric operands.
fn rgb_operands(operands: &[Token]) -> Option<RgbKey> {
    match operands {
        [r, g, b] => match (r.kind, g.kind, b.kind) {
            (TokenKind::Number(r), TokenKind::Number(g), TokenKind::Number(b)) => {
                Some(RgbKey::from_components(r, g, b))
            }
            _ => None,
        },
        _ => None,
    }
}

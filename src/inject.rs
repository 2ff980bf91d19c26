/*!
# Injection Engine

Takes the original decompressed script plus a list of replacement
strings (one per scanned record, in source order) and produces a new
decompressed script, honoring per-record and whole-body size limits, the
`GOTO` jump directive, and line-wrapping policy.

The engine never throws on a per-record size problem — oversize records
and body-budget overflow are first-class *skip* outcomes that still
produce a valid, loadable output. Only a record-count mismatch or a lost
anchor during the final rewrite fail the whole file.
*/

use encoding_rs::SHIFT_JIS;

use crate::container::DecompressedContainer;
use crate::error::InjectError;
use crate::record::{self, TextRecord};

/// Translator-line prefix marking a script-jump directive.
const GOTO_PREFIX: &str = "GOTO ";

/// The engine's script-call opcode prepended to a GOTO record.
const GOTO_OPCODE: u8 = 0x07;

/// Column at which line wrapping breaks on the most recent space. Public
/// documentation for this game quotes 52; observed behavior is 53. This
/// crate follows the observed value and surfaces it as a named constant
/// rather than a literal so a future implementer can override it if that
/// discrepancy is ever resolved.
pub const WRAP_WIDTH: usize = 53;

/// Maximum encoded (post-Shift-JIS) length of a single record's text.
const MAX_RECORD_LEN: usize = 0xFF;

/// Maximum decompressed body length.
const MAX_BODY_LEN: i64 = 0xFFFF;

/// Outcome of a successful (possibly partial) injection.
#[derive(Debug)]
pub struct InjectOutcome {
    /// The rebuilt decompressed container, ready for `compress`/`frame`.
    pub container: DecompressedContainer,
    /// Number of records skipped for being too long once Shift-JIS
    /// encoded (> 255 bytes).
    pub skipped_oversize: usize,
    /// Number of records skipped because applying them would have blown
    /// the whole-body 0xFFFF budget.
    pub skipped_budget: usize,
    /// Total bytes by which skipped-for-budget records would have
    /// overflowed the body budget, summed across all such records.
    pub overflow_bytes: u64,
}

impl InjectOutcome {
    /// Whether any record was skipped. A partial result is still a fully
    /// valid, loadable script.
    pub fn is_partial(&self) -> bool {
        self.skipped_oversize > 0 || self.skipped_budget > 0
    }
}

/// Inject `replacements` into `original`, producing a new decompressed
/// container.
///
/// `replacements` must have exactly one entry per record [`record::scan`]
/// finds in `original`; a count mismatch fails the whole file with no
/// output.
pub fn inject(
    original: &DecompressedContainer,
    replacements: &[String],
) -> Result<InjectOutcome, InjectError> {
    let combined = original.as_combined();
    let records = record::scan(&combined);

    if replacements.len() != records.len() {
        return Err(InjectError::Mismatch {
            expected: records.len(),
            got: replacements.len(),
        });
    }

    let candidates: Vec<Candidate> = records
        .iter()
        .zip(replacements)
        .map(|(record, replacement)| build_candidate(&combined, record, replacement))
        .collect();

    let (final_bytes, skipped_oversize, skipped_budget, overflow_bytes, new_declared_len) =
        apply_budget(original.declared_len(), &records, &candidates);

    let new_body = rewrite_body(&combined, &records, &final_bytes)?;

    let mut header = original.header;
    header[0x14..0x16].copy_from_slice(&new_declared_len.to_le_bytes());

    Ok(InjectOutcome {
        container: DecompressedContainer {
            header,
            body: new_body,
        },
        skipped_oversize,
        skipped_budget,
        overflow_bytes,
    })
}

/// A per-record replacement candidate: the bytes that would replace the
/// record's original range, and whether building them already forced a
/// fallback to the original Japanese bytes because the encoded text was
/// too long.
struct Candidate {
    bytes: Vec<u8>,
    is_oversize_skip: bool,
}

/// Build the replacement bytes for one record: either a `GOTO` record or
/// a wrapped, Shift-JIS-encoded text record. Falls back to the record's
/// original bytes (and marks itself oversize-skipped) if the encoded
/// text exceeds 255 bytes.
fn build_candidate(combined: &[u8], record: &TextRecord, replacement: &str) -> Candidate {
    let built = if let Some(target) = replacement.strip_prefix(GOTO_PREFIX) {
        let (sjis, _, _) = SHIFT_JIS.encode(target);
        encode_record(GOTO_OPCODE.into(), &sjis)
    } else {
        let wrapped = wrap(replacement);
        let (sjis, _, _) = SHIFT_JIS.encode(&wrapped);
        encode_record(None, &sjis)
    };

    match built {
        Some(bytes) => Candidate {
            bytes,
            is_oversize_skip: false,
        },
        None => Candidate {
            bytes: combined[record.byte_range()].to_vec(),
            is_oversize_skip: true,
        },
    }
}

/// Build `[opcode?] 0xFD len text 0x00`, or `None` if `text.len() >
/// 0xFF`.
fn encode_record(opcode: Option<u8>, text: &[u8]) -> Option<Vec<u8>> {
    if text.len() > MAX_RECORD_LEN {
        return None;
    }
    let mut out = Vec::with_capacity(text.len() + 4);
    if let Some(op) = opcode {
        out.push(op);
    }
    out.push(0xFD);
    out.push(text.len() as u8);
    out.extend_from_slice(text);
    out.push(0x00);
    Some(out)
}

/// Run the whole-body budget pass: walk candidates in order,
/// accepting each if it keeps the running declared length within
/// 0xFFFF, otherwise falling back to the record's original bytes (which
/// leaves the running length unchanged) and accumulating diagnostics.
/// Oversize-skipped candidates already carry the original bytes, so they
/// pass through with a zero delta and never touch the budget.
fn apply_budget(
    declared_len: u16,
    records: &[TextRecord],
    candidates: &[Candidate],
) -> (Vec<Vec<u8>>, usize, usize, u64, u16) {
    let mut running: i64 = declared_len as i64;
    let mut skipped_oversize = 0;
    let mut skipped_budget = 0;
    let mut overflow_bytes: u64 = 0;
    let mut final_bytes = Vec::with_capacity(candidates.len());

    for (record, candidate) in records.iter().zip(candidates) {
        if candidate.is_oversize_skip {
            skipped_oversize += 1;
            final_bytes.push(candidate.bytes.clone());
            continue;
        }

        let old_len = record.encoded_len() as i64;
        let new_len = candidate.bytes.len() as i64;
        let delta = new_len - old_len;

        if running + delta <= MAX_BODY_LEN {
            running += delta;
            final_bytes.push(candidate.bytes.clone());
        } else {
            let overflow = (running + delta) - MAX_BODY_LEN;
            overflow_bytes += overflow as u64;
            skipped_budget += 1;
            // Leave the record untouched: its original bytes are what
            // `rewrite_body` will splice back in since we pass them
            // through here unchanged.
            final_bytes.push(record.original_bytes());
        }
    }

    (
        final_bytes,
        skipped_oversize,
        skipped_budget,
        overflow_bytes,
        running.clamp(0, MAX_BODY_LEN) as u16,
    )
}

/// Splice `final_bytes` into `combined` in place of each record's
/// original byte range, in order, searching for the original bytes at or
/// after a monotonically advancing cursor so that an identical byte
/// sequence appearing elsewhere in the file can't be confused for the
/// real record. Returns the *body* (everything after the header), since
/// the header is handled separately by the caller.
fn rewrite_body(
    combined: &[u8],
    records: &[TextRecord],
    final_bytes: &[Vec<u8>],
) -> Result<Vec<u8>, InjectError> {
    let mut out = Vec::with_capacity(combined.len());
    let mut cursor = crate::container::HEADER_LEN;

    for (record, new_bytes) in records.iter().zip(final_bytes) {
        let original = &combined[record.byte_range()];
        let found = find_subslice(&combined[cursor..], original)
            .map(|rel| cursor + rel)
            .ok_or(InjectError::LostAnchor {
                position: record.position,
            })?;

        out.extend_from_slice(&combined[cursor..found]);
        out.extend_from_slice(new_bytes);
        cursor = found + original.len();
    }

    out.extend_from_slice(&combined[cursor..]);

    Ok(out)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Wrap `text` for display, breaking at the most recent space once a
/// line reaches [`WRAP_WIDTH`] characters. Counting is in Unicode
/// characters, not UTF-8 code units. Lines with no space to break at are
/// left long.
fn wrap(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let mut width = 0usize;
    let mut last_space: Option<usize> = None;

    for i in 0..chars.len() {
        if chars[i] == '\n' {
            width = 0;
            last_space = None;
            continue;
        }

        width += 1;
        if chars[i] == ' ' {
            last_space = Some(i);
        }

        if width >= WRAP_WIDTH {
            if let Some(space_index) = last_space {
                chars[space_index] = '\n';
                width = i - space_index;
                last_space = None;
            }
        }
    }

    chars.into_iter().collect()
}

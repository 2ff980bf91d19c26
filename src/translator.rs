/*!
# Translator Text File Format

The UTF-8 text file a translator edits: one non-empty line per text
record, in source order, with `\` standing in for an in-game `0x0A` line
break. [`render`] produces this format from a scanned record list (used
by extraction); [`parse`] reads it back into the replacement-string list
the injection engine consumes.
*/

use crate::record::TextRecord;

/// Render a scanned record list as translator text file content.
///
/// Every record becomes exactly one line, in source order, with literal
/// `0x0A` bytes in the decoded text rendered as `\`. The result always
/// ends in a trailing newline, including when there are no records at
/// all (in which case it's the empty string).
pub fn render(records: &[TextRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.decoded_text.replace('\n', "\\"));
        out.push('\n');
    }
    out
}

/// Parse translator text file content into the ordered replacement-string
/// list the injection engine expects.
///
/// Empty lines are dropped and do not count as records; `\` is decoded
/// back to a literal `0x0A` in each remaining line.
pub fn parse(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.replace('\\', "\n"))
        .collect()
}

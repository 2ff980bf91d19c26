/*!
# Extraction

Pure pipeline stage: decompressed script in, translator text file content
out. Thin glue over [`crate::record::scan`] and
[`crate::translator::render`] — kept as its own module because it's the
half of the round trip injection's idempotence test relies on.
*/

use crate::container::DecompressedContainer;
use crate::record::{self, TextRecord};
use crate::translator;

/// Scan `container` for text records and render them as translator text
/// file content.
pub fn extract(container: &DecompressedContainer) -> String {
    translator::render(&record(container))
}

/// Scan `container` for text records without rendering them — exposed so
/// callers that need both the records and the rendered text (e.g. the
/// batch driver, which logs record counts) don't scan twice.
pub fn record(container: &DecompressedContainer) -> Vec<TextRecord> {
    record::scan(&container.as_combined())
}

//! Custom Test Assertions
//!
//! Provides assertion helpers for relation sets and rendered documents that
//! give more meaningful failure messages than bare `assert_eq!`.

use std::collections::BTreeSet;

use domain_banking::{AggregateRecord, RelationKind, ReportDocument};
use uuid::Uuid;

/// Asserts that a stored aggregate holds exactly `expected` for one relation type
///
/// # Panics
///
/// Panics if the relation type is not owned by the aggregate or the sets differ
pub fn assert_relation_set<I, T>(record: &AggregateRecord, kind: RelationKind, expected: I)
where
    I: IntoIterator<Item = T>,
    T: Into<Uuid>,
{
    let expected: BTreeSet<Uuid> = expected.into_iter().map(Into::into).collect();
    let actual = record.relation_targets(kind).unwrap_or_else(|| {
        panic!("{} does not own {} relations", record.kind(), kind)
    });
    assert_eq!(
        actual, expected,
        "{} set of {} {} differs",
        kind,
        record.kind(),
        record.id()
    );
}

/// Asserts the stream contract of a rendered report: non-empty and at offset 0
pub fn assert_document_ready(document: &ReportDocument) {
    assert!(!document.is_empty(), "Rendered document {} is empty", document.file_name);
    assert_eq!(
        document.content.position(),
        0,
        "Rendered document {} is not positioned at offset 0",
        document.file_name
    );
}

/// Lines of a rendered CSV document
pub fn document_lines(document: &ReportDocument) -> Vec<String> {
    String::from_utf8_lossy(document.content.get_ref())
        .lines()
        .map(str::to_string)
        .collect()
}

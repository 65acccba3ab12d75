//! Quest tables: `schema: a, *b, c` followed by one comma-separated entry
//! per line. A `*` column names a quest file.

use crate::diagnostics;
use crate::parser::recognizers::{is_blank, is_comment};
use crate::text::{span_range, trimmed_line_range, Document};
use crate::workspace::{CancellationFlag, QuestRepository};
use tower_lsp::lsp_types::{Diagnostic, Range, Url};
use tracing::debug;

const SCHEMA_PREFIX: &str = "schema:";
const QUEST_COLUMN_MARKER: char = '*';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<String>,
    pub quest_column: Option<usize>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub range: Range,
    pub fields: Vec<Field>,
    /// Separators are `,` plus at most one space and no field is padded.
    pub well_spaced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestTable {
    schema: Option<Schema>,
    entries: Vec<TableEntry>,
    /// First meaningful line when it is not a schema.
    missing_schema: Option<Range>,
}

impl QuestTable {
    pub fn parse(document: &Document) -> Self {
        let mut table = QuestTable::default();

        for (index, text) in document.lines().enumerate() {
            if is_blank(text) || is_comment(text) {
                continue;
            }
            let line = index as u32;

            if table.schema.is_none() {
                match parse_schema(line, text) {
                    Some(schema) => {
                        table.schema = Some(schema);
                        continue;
                    }
                    None => {
                        table.missing_schema = Some(trimmed_line_range(line, text));
                        break;
                    }
                }
            }

            table.entries.push(parse_entry(line, text));
        }

        table
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn validate(&self) -> Vec<Diagnostic> {
        if let Some(range) = self.missing_schema {
            return vec![diagnostics::missing_schema(range)];
        }
        let Some(schema) = &self.schema else {
            return Vec::new();
        };

        self.entries
            .iter()
            .filter(|entry| !entry.matches(schema))
            .map(|entry| diagnostics::schema_mismatch(entry.range, schema.columns.len()))
            .collect()
    }

    /// Quest-column values of well-formed entries that name no workspace quest.
    pub async fn validate_quests(
        &self,
        repository: &dyn QuestRepository,
        cancel: &CancellationFlag,
    ) -> Vec<Diagnostic> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        let Some(column) = schema.quest_column else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.matches(schema)) {
            let Some(field) = entry.fields.get(column) else {
                continue;
            };
            if !repository.quest_exists(&field.value, cancel).await {
                diagnostics.push(diagnostics::undefined_quest(field.range, &field.value));
            }
        }
        diagnostics
    }
}

impl TableEntry {
    fn matches(&self, schema: &Schema) -> bool {
        self.well_spaced && self.fields.len() == schema.columns.len()
    }
}

fn parse_schema(line: u32, text: &str) -> Option<Schema> {
    let rest = text.trim().strip_prefix(SCHEMA_PREFIX)?;
    let columns: Vec<String> = rest.split(',').map(|c| c.trim().to_string()).collect();
    let quest_column = columns
        .iter()
        .position(|c| c.starts_with(QUEST_COLUMN_MARKER));
    Some(Schema {
        columns,
        quest_column,
        range: trimmed_line_range(line, text),
    })
}

fn parse_entry(line: u32, text: &str) -> TableEntry {
    let content = text.trim();
    let mut offset = text.len() - text.trim_start().len();
    let mut fields = Vec::new();
    let mut well_spaced = true;

    for (index, raw) in content.split(',').enumerate() {
        let mut start = offset;
        let mut value = raw;
        if index > 0 {
            if let Some(rest) = raw.strip_prefix(' ') {
                value = rest;
                start += 1;
            }
        }
        if value.trim() != value {
            well_spaced = false;
        }
        fields.push(Field {
            value: value.to_string(),
            range: span_range(line, text, start, start + value.len()),
        });
        offset += raw.len() + 1;
    }

    TableEntry {
        range: trimmed_line_range(line, text),
        fields,
        well_spaced,
    }
}

/// Shape checks followed by quest lookups, in line order.
///
/// Returns nothing when `cancel` trips before the lookups finish.
pub async fn lint_table(
    text: &str,
    uri: &Url,
    repository: &dyn QuestRepository,
    cancel: &CancellationFlag,
) -> Vec<Diagnostic> {
    let table = QuestTable::parse(&Document::new(text.to_string()));
    let mut diagnostics = table.validate();
    diagnostics.extend(table.validate_quests(repository, cancel).await);
    if cancel.is_cancelled() {
        debug!(%uri, "table lint cancelled");
        return Vec::new();
    }
    diagnostics::sort_by_line(&mut diagnostics);
    debug!(%uri, entries = table.entries().len(), found = diagnostics.len(), "linted quest table");
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::code_of;
    use std::sync::Arc;

    struct KnownQuests(Vec<&'static str>);

    #[tower_lsp::async_trait]
    impl QuestRepository for KnownQuests {
        async fn quest_exists(&self, name: &str, cancel: &CancellationFlag) -> bool {
            !cancel.is_cancelled() && self.0.iter().any(|q| q.eq_ignore_ascii_case(name))
        }

        async fn all_quest_names(&self, cancel: &CancellationFlag) -> Option<Arc<Vec<String>>> {
            if cancel.is_cancelled() {
                return None;
            }
            Some(Arc::new(self.0.iter().map(|q| q.to_string()).collect()))
        }
    }

    fn uri() -> Url {
        Url::parse("file:///quests/QuestList-Test.txt").unwrap()
    }

    #[tokio::test]
    async fn flags_entries_that_do_not_match_the_schema() {
        let repository = KnownQuests(vec![]);
        let text = "schema: id,name\n1,  foo, extra\n1, foo\n";
        let diagnostics = lint_table(text, &uri(), &repository, &CancellationFlag::new()).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), Some("schema-mismatch"));
        assert_eq!(diagnostics[0].range.start.line, 1);
    }

    #[tokio::test]
    async fn flags_bad_spacing_with_the_right_arity() {
        let repository = KnownQuests(vec![]);
        let diagnostics = lint_table(
            "-- comment\nschema: id, name\n1,foo\n2,  bar\n3 , baz\n",
            &uri(),
            &repository,
            &CancellationFlag::new(),
        )
        .await;
        let lines: Vec<_> = diagnostics.iter().map(|d| d.range.start.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[tokio::test]
    async fn requires_a_schema_first() {
        let repository = KnownQuests(vec![]);
        let text = "\n1, foo\nschema: id\n";
        let diagnostics = lint_table(text, &uri(), &repository, &CancellationFlag::new()).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), Some("missing-schema"));
        assert_eq!(diagnostics[0].range.start.line, 1);
    }

    #[tokio::test]
    async fn checks_quest_column_against_the_workspace() {
        let repository = KnownQuests(vec!["M0B00Y16"]);
        let text = "schema: *name, group, minReq\nm0b00y16, N, 0\nNOSUCH, N, 0\nNOSUCH,N\n";
        let diagnostics = lint_table(text, &uri(), &repository, &CancellationFlag::new()).await;
        let found: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.range.start.line, code_of(d).unwrap_or_default()))
            .collect();
        assert_eq!(found, vec![(2, "undefined-quest"), (3, "schema-mismatch")]);
        assert_eq!(diagnostics[0].range.start.character, 0);
        assert_eq!(diagnostics[0].range.end.character, 6);
    }

    #[tokio::test]
    async fn cancelled_table_lints_report_nothing() {
        let repository = KnownQuests(vec![]);
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let text = "schema: *name\nNOPE\n1, 2\n";
        let diagnostics = lint_table(text, &uri(), &repository, &cancel).await;
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn records_field_ranges() {
        let table = QuestTable::parse(&Document::new("schema: a, *b\n  x, yy\n".to_string()));
        let schema = table.schema().unwrap();
        assert_eq!(schema.quest_column, Some(1));
        let entry = &table.entries()[0];
        assert!(entry.well_spaced);
        assert_eq!(entry.fields[1].value, "yy");
        assert_eq!(entry.fields[1].range.start.character, 5);
        assert_eq!(entry.fields[1].range.end.character, 7);
    }
}

//! CSV document builder
//!
//! Headers and paragraphs become single-field records; table rows are
//! padded to the declared column count. Column widths carry no meaning in
//! CSV beyond that count.

use csv::{Writer, WriterBuilder};

use crate::reports::document::{DocumentBuilder, DocumentError, DocumentFormat};

/// Renders a report as comma-separated text
pub struct CsvDocumentBuilder {
    writer: Writer<Vec<u8>>,
    error: Option<DocumentError>,
}

impl CsvDocumentBuilder {
    pub fn new() -> Self {
        Self::with_delimiter(b',')
    }

    /// Uses `delimiter` between fields, e.g. `b';'` for spreadsheet locales
    /// with a decimal comma
    pub fn with_delimiter(delimiter: u8) -> Self {
        let writer = WriterBuilder::new()
            .flexible(true)
            .delimiter(delimiter)
            .from_writer(Vec::new());
        Self { writer, error: None }
    }

    fn write_record<I, T>(mut self, record: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        if self.error.is_none() {
            if let Err(e) = self.writer.write_record(record) {
                self.error = Some(DocumentError::Write(e.to_string()));
            }
        }
        self
    }
}

impl Default for CsvDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder for CsvDocumentBuilder {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Csv
    }

    fn add_header(self, title: &str) -> Self {
        self.write_record([title])
    }

    fn add_paragraph(self, text: &str) -> Self {
        self.write_record([text])
    }

    fn add_table(mut self, column_widths: &[u32], rows: &[Vec<String>]) -> Self {
        let columns = column_widths.len();
        for (index, row) in rows.iter().enumerate() {
            if row.len() > columns {
                if self.error.is_none() {
                    self.error = Some(DocumentError::RowWidth {
                        row: index,
                        expected: columns,
                        actual: row.len(),
                    });
                }
                return self;
            }
            let padding = std::iter::repeat("").take(columns - row.len());
            let cells = row.iter().map(String::as_str).chain(padding);
            self = self.write_record(cells);
        }
        self
    }

    fn build(mut self) -> Result<Vec<u8>, DocumentError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(bytes)
    }
}

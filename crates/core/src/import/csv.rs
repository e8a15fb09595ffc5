use crate::import::ImportError;

/// Header-driven CSV: comma separated, `"` quoting with `""` escapes, blank lines skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<CsvRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvTable {
    pub fn parse(input: &str) -> Result<Self, ImportError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut records = read_records(input)?.into_iter();

        let header = records.next().ok_or(ImportError::MissingHeader)?;
        let headers =
            header.fields.iter().map(|name| name.trim().to_ascii_lowercase()).collect::<Vec<_>>();

        Ok(Self { headers, rows: records.collect() })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ImportError> {
        self.column(name).ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    }
}

impl CsvRow {
    /// Trimmed field value; `None` when the column is absent or the cell is blank.
    pub fn get(&self, column: Option<usize>) -> Option<&str> {
        column
            .and_then(|index| self.fields.get(index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

fn read_records(input: &str) -> Result<Vec<CsvRow>, ImportError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut fields), record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(ImportError::UnterminatedQuote { line: record_line });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, fields, record_line);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<CsvRow>, fields: Vec<String>, line: usize) {
    if fields.iter().all(|value| value.trim().is_empty()) {
        return;
    }
    records.push(CsvRow { line, fields });
}

#[cfg(test)]
mod tests {
    use super::CsvTable;
    use crate::import::ImportError;

    #[test]
    fn parses_header_and_rows_with_line_numbers() -> Result<(), ImportError> {
        let table = CsvTable::parse("Nome, Preco\nParafuso,1.50\n\nPorca,0.80\n")?;

        assert_eq!(table.headers(), ["nome", "preco"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].line, 2);
        assert_eq!(table.rows()[1].line, 4);
        assert_eq!(table.rows()[1].get(table.column("preco")), Some("0.80"));
        Ok(())
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() -> Result<(), ImportError> {
        let input = "nome,descricao\r\n\"Chapa, aço\",\"Diz \"\"inox\"\"\nlinha 2\"\r\nTubo,x\r\n";
        let table = CsvTable::parse(input)?;

        assert_eq!(table.rows()[0].fields, vec!["Chapa, aço", "Diz \"inox\"\nlinha 2"]);
        assert_eq!(table.rows()[1].line, 4);
        Ok(())
    }

    #[test]
    fn missing_trailing_newline_and_bom_are_tolerated() -> Result<(), ImportError> {
        let table = CsvTable::parse("\u{feff}nome\nAcme")?;

        assert_eq!(table.headers(), ["nome"]);
        assert_eq!(table.rows()[0].get(table.column("nome")), Some("Acme"));
        Ok(())
    }

    #[test]
    fn blank_cells_and_absent_columns_read_as_none() -> Result<(), ImportError> {
        let table = CsvTable::parse("nome,email\nAcme,   \nBeta\n")?;

        assert_eq!(table.rows()[0].get(table.column("email")), None);
        assert_eq!(table.rows()[1].get(table.column("email")), None);
        assert_eq!(table.rows()[0].get(table.column("cidade")), None);
        Ok(())
    }

    #[test]
    fn structural_errors_are_reported() {
        assert_eq!(CsvTable::parse("\n\n"), Err(ImportError::MissingHeader));
        assert_eq!(
            CsvTable::parse("nome\n\"aberto\n"),
            Err(ImportError::UnterminatedQuote { line: 2 })
        );
    }
}

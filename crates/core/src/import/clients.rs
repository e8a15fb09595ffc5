use tracing::debug;

use crate::domain::client::{normalize_phone, Client, ClientId};
use crate::import::csv::CsvTable;
use crate::import::{ImportError, ImportReport, SkippedRow};

pub const CLIENT_COLUMNS: [&str; 9] = [
    "nome",
    "codigo_protheus",
    "codigo_pais_telefone",
    "telefone",
    "email",
    "endereco",
    "cidade",
    "estado",
    "cpf_cnpj",
];

/// Reads a client spreadsheet. Every value is trimmed, phones keep digits only and a missing
/// country code falls back to `default_country_code`. Rows without a name are skipped.
pub fn import_clients(
    input: &str,
    default_country_code: &str,
) -> Result<ImportReport<Client>, ImportError> {
    let table = CsvTable::parse(input)?;
    let name = table.require_column("nome")?;
    let [_, erp_code, country_code, phone, email, address, city, state, tax_id] =
        CLIENT_COLUMNS.map(|column| table.column(column));

    let mut report = ImportReport::default();
    for row in table.rows() {
        let Some(client_name) = row.get(Some(name)) else {
            debug!(line = row.line, "skipping client row without name");
            report.skipped.push(SkippedRow { line: row.line, reason: "missing name".to_string() });
            continue;
        };

        report.accepted.push(Client {
            id: ClientId::generate(),
            name: client_name.to_string(),
            erp_code: row.get(erp_code).map(str::to_string),
            phone_country_code: row
                .get(country_code)
                .unwrap_or(default_country_code)
                .to_string(),
            phone: row.get(phone).map(normalize_phone).filter(|digits| !digits.is_empty()),
            email: row.get(email).map(str::to_string),
            address: row.get(address).map(str::to_string),
            city: row.get(city).map(str::to_string),
            state: row.get(state).map(str::to_string),
            tax_id: row.get(tax_id).map(str::to_string),
        });
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::import_clients;
    use crate::import::ImportError;

    #[test]
    fn normalizes_client_rows() -> Result<(), ImportError> {
        let input = "\
nome,codigo_protheus,codigo_pais_telefone,telefone,email,endereco,cidade,estado,cpf_cnpj
  Metalúrgica Alfa ,000123,,(11) 4002-8922, compras@alfa.com.br ,\"Rua A, 10\",São Paulo,SP,12.345.678/0001-90
Beta Ltda,,+351,sem telefone,,,,,
";
        let report = import_clients(input, "+55")?;

        assert_eq!(report.accepted.len(), 2);
        let alfa = &report.accepted[0];
        assert_eq!(alfa.name, "Metalúrgica Alfa");
        assert_eq!(alfa.erp_code.as_deref(), Some("000123"));
        assert_eq!(alfa.phone_country_code, "+55");
        assert_eq!(alfa.phone.as_deref(), Some("1140028922"));
        assert_eq!(alfa.email.as_deref(), Some("compras@alfa.com.br"));
        assert_eq!(alfa.address.as_deref(), Some("Rua A, 10"));

        let beta = &report.accepted[1];
        assert_eq!(beta.phone_country_code, "+351");
        assert_eq!(beta.phone, None);
        assert_eq!(beta.tax_id, None);
        Ok(())
    }

    #[test]
    fn rows_without_name_are_skipped_with_their_line() -> Result<(), ImportError> {
        let report = import_clients("nome,email\n,sem@nome.com\nGama,\n", "+55")?;

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
        Ok(())
    }

    #[test]
    fn file_without_valid_rows_is_an_error() {
        assert_eq!(
            import_clients("nome,email\n ,a@b.com\n", "+55"),
            Err(ImportError::NoValidRows { skipped: 1 })
        );
        assert_eq!(
            import_clients("email\na@b.com\n", "+55"),
            Err(ImportError::MissingColumn("nome".to_string()))
        );
    }
}

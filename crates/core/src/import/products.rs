use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::product::{Product, ProductId};
use crate::import::csv::{CsvRow, CsvTable};
use crate::import::{ImportError, ImportReport, SkippedRow};

pub const PRODUCT_COLUMNS: [&str; 5] = ["nome", "codigo", "preco", "descricao", "imagem_url"];

/// Optional column accepted on top of the standard template.
const COST_COLUMN: &str = "custo";

/// Reads a product spreadsheet. Prices accept `,` as the decimal separator; rows without a name
/// or without a positive price are skipped.
pub fn import_products(input: &str) -> Result<ImportReport<Product>, ImportError> {
    let table = CsvTable::parse(input)?;
    let columns = ProductColumns::locate(&table)?;

    let mut report = ImportReport::default();
    for row in table.rows() {
        match columns.read(row) {
            Ok(product) => report.accepted.push(product),
            Err(reason) => {
                debug!(line = row.line, reason = reason.as_str(), "skipping product row");
                report.skipped.push(SkippedRow { line: row.line, reason });
            }
        }
    }

    report.finish()
}

struct ProductColumns {
    name: usize,
    price: usize,
    code: Option<usize>,
    description: Option<usize>,
    image_url: Option<usize>,
    cost: Option<usize>,
}

impl ProductColumns {
    fn locate(table: &CsvTable) -> Result<Self, ImportError> {
        Ok(Self {
            name: table.require_column("nome")?,
            price: table.require_column("preco")?,
            code: table.column("codigo"),
            description: table.column("descricao"),
            image_url: table.column("imagem_url"),
            cost: table.column(COST_COLUMN),
        })
    }

    fn read(&self, row: &CsvRow) -> Result<Product, String> {
        let name = row.get(Some(self.name)).ok_or_else(|| "missing name".to_string())?;
        let price = row.get(Some(self.price)).and_then(parse_amount).unwrap_or(Decimal::ZERO);
        if price <= Decimal::ZERO {
            return Err("price must be greater than zero".to_string());
        }
        let unit_cost = match row.get(self.cost) {
            None => None,
            Some(raw) => match parse_amount(raw) {
                Some(value) if value >= Decimal::ZERO => Some(value),
                _ => return Err(format!("invalid cost `{raw}`")),
            },
        };

        Ok(Product {
            id: ProductId::generate(),
            name: name.to_string(),
            code: row.get(self.code).map(str::to_string),
            price,
            unit_cost,
            description: row.get(self.description).map(str::to_string),
            image_url: row.get(self.image_url).map(str::to_string),
        })
    }
}

/// Parses `1234.56` or `1234,56`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.trim().replacen(',', ".", 1)).ok()
}

//! Executive report and purchase-suggestion export.

use chrono::NaiveDate;
use forecast_core::Kpis;
use forecast_econ::{format_money_compact, format_pct, gross_margin_pct};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Sugerencias de Compra";

/// Column headers and widths of the export.
const COLUMNS: [(&str, f64); 5] = [
    ("Producto (Ítem)", 25.0),
    ("Stock Actual", 15.0),
    ("Demanda Proyectada (Plan)", 25.0),
    ("Sugerencia de Compra (Unidades)", 30.0),
    ("Fecha Límite Sugerida", 20.0),
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub item: String,
    pub stock: u64,
    pub demand: u64,
    pub suggestion: u64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rationale {
    pub selection_logic: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub scenario: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub recommendation: Recommendation,
    pub rationale: Rationale,
    pub purchase_report: Vec<PurchaseRow>,
}

/// Build the report for the active scenario. Net income is revenue minus
/// estimated cost; repeated purchase rows are dropped, first one wins.
pub fn build_final_report(
    scenario_name: &str,
    kpis: &Kpis,
    rationale: Rationale,
    rows: &[PurchaseRow],
) -> FinalReport {
    let net = kpis.total_revenue - kpis.estimated_cost;
    let margin = gross_margin_pct(kpis.total_revenue, kpis.estimated_cost)
        .map(format_pct)
        .unwrap_or_else(|| "N/A".to_string());
    let sign = if net.is_sign_negative() { "" } else { "+" };
    let impact = format!(
        "{sign}{} Ingreso Neto (Margen Bruto {margin})",
        format_money_compact(net)
    );
    let mut purchase_report: Vec<PurchaseRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if !purchase_report.contains(row) {
            purchase_report.push(row.clone());
        }
    }
    debug!(
        dropped = rows.len() - purchase_report.len(),
        "purchase rows deduplicated"
    );
    FinalReport {
        recommendation: Recommendation {
            scenario: scenario_name.to_string(),
            impact,
        },
        rationale,
        purchase_report,
    }
}

/// Attachment name for an export created at `unix_ms`.
pub fn export_filename(unix_ms: i64) -> String {
    format!("Sugerencia_Compras_{unix_ms}.xlsx")
}

/// Render purchase rows into an XLSX workbook held in memory.
pub fn export_purchases_xlsx(rows: &[PurchaseRow]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, (header, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &bold)?;
        sheet.set_column_width(col, *width)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.item)?;
        sheet.write_number(r, 1, row.stock as f64)?;
        sheet.write_number(r, 2, row.demand as f64)?;
        sheet.write_number(r, 3, row.suggestion as f64)?;
        sheet.write_string(r, 4, row.date.format("%Y-%m-%d").to_string())?;
    }
    let buf = workbook.save_to_buffer()?;
    info!(rows = rows.len(), bytes = buf.len(), "purchase export rendered");
    Ok(buf)
}

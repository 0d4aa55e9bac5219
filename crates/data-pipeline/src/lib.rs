#![deny(warnings)]

//! Data pipeline: CSV ingest checks, historical sales views and the
//! purchase-suggestion report with its XLSX export.

pub mod historical;
pub mod ingest;
pub mod report;

pub use historical::{Granularity, HistoricalDb, HistoricalItem, ItemHistory, Metric};
pub use ingest::{count_rows, IngestError, UploadPolicy};
pub use report::{
    build_final_report, export_filename, export_purchases_xlsx, FinalReport, PurchaseRow,
    Rationale, Recommendation, ReportError,
};

/// Format an integer with comma thousands separators, "13,260".
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

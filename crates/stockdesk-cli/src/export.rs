//! Two-sheet spreadsheet export of a [`DashboardReport`].
//!
//! `Price_Supply` holds one row per bar: OHLCV, change, the estimated flow
//! columns and each configured moving average. `Finance` mirrors the
//! statement table, or a single `no data` row when there is none.
//!
//! Sheets are first built as plain [`Sheet`] grids so their contents can be
//! checked without reading the workbook back.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use stockdesk_core::{DashboardReport, FinancialStatementTable};
use thiserror::Error;

pub const PRICE_SHEET: &str = "Price_Supply";
pub const FINANCE_SHEET: &str = "Finance";
pub const NO_DATA_LABEL: &str = "no data";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: XlsxError,
    },
    #[error("failed to save workbook '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("sheet '{sheet}' has too many {what} ({count})")]
    TooLarge {
        sheet: String,
        what: &'static str,
        count: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Fraction rendered with a percent format.
    Percent(f64),
    Blank,
}

impl Cell {
    fn number(value: Option<f64>) -> Self {
        value.map_or(Self::Blank, Self::Number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Free text written one column right of the header.
    pub note: Option<String>,
}

pub fn price_sheet(report: &DashboardReport) -> Sheet {
    let chart = &report.chart;
    let derived = &chart.derived;

    let mut header: Vec<String> = [
        "Date",
        "Open",
        "High",
        "Low",
        "Close",
        "Volume",
        "Change %",
        "Foreign flow (est.)",
        "Institution flow (est.)",
    ]
    .iter()
    .map(|name| (*name).to_owned())
    .collect();
    header.extend(
        derived
            .moving_averages
            .iter()
            .map(|average| format!("MA{}", average.window)),
    );

    let rows = chart
        .bars
        .iter()
        .enumerate()
        .map(|(index, bar)| {
            let flow = derived.flows.get(index);
            let mut row = vec![
                Cell::Text(bar.date.to_string()),
                Cell::Number(bar.open),
                Cell::Number(bar.high),
                Cell::Number(bar.low),
                Cell::Number(bar.close),
                Cell::Number(bar.volume as f64),
                flow.map_or(Cell::Blank, |flow| Cell::Percent(flow.change_pct)),
                Cell::number(flow.map(|flow| flow.foreign_flow)),
                Cell::number(flow.and_then(|flow| flow.institution_flow)),
            ];
            row.extend(
                derived
                    .moving_averages
                    .iter()
                    .map(|average| Cell::number(average.values.get(index).copied().flatten())),
            );
            row
        })
        .collect();

    Sheet {
        name: PRICE_SHEET.to_owned(),
        header,
        rows,
        note: derived.synthetic.then(|| derived.caveat.clone()),
    }
}

pub fn finance_sheet(table: &FinancialStatementTable) -> Sheet {
    let mut header = vec![String::from("Item")];
    header.extend(table.columns.iter().cloned());

    let rows = if table.is_empty() {
        vec![vec![Cell::Text(NO_DATA_LABEL.to_owned())]]
    } else {
        table
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![Cell::Text(row.label.clone())];
                cells.extend(row.values.iter().map(|value| Cell::number(*value)));
                cells
            })
            .collect()
    };

    Sheet {
        name: FINANCE_SHEET.to_owned(),
        header,
        rows,
        note: None,
    }
}

/// Write both sheets to `path`, replacing any existing file.
pub fn write_report(report: &DashboardReport, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    for sheet in [price_sheet(report), finance_sheet(&report.financials.table)] {
        write_sheet(workbook.add_worksheet(), &sheet)?;
    }
    workbook.save(path).map_err(|source| ExportError::Save {
        path: path.to_path_buf(),
        source,
    })
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), ExportError> {
    let wrap = |source: XlsxError| ExportError::Sheet {
        sheet: sheet.name.clone(),
        source,
    };
    let bold = Format::new().set_bold();
    let percent = Format::new().set_num_format("0.00%");
    let thousands = Format::new().set_num_format("#,##0.##");

    worksheet.set_name(sheet.name.as_str()).map_err(wrap)?;

    for (col, name) in sheet.header.iter().enumerate() {
        let col = column(sheet, col)?;
        worksheet
            .write_string_with_format(0, col, name.as_str(), &bold)
            .map_err(wrap)?;
    }
    if let Some(note) = &sheet.note {
        let col = column(sheet, sheet.header.len() + 1)?;
        worksheet.write_string(0, col, note.as_str()).map_err(wrap)?;
    }

    for (index, cells) in sheet.rows.iter().enumerate() {
        let row = u32::try_from(index + 1).map_err(|_| ExportError::TooLarge {
            sheet: sheet.name.clone(),
            what: "rows",
            count: sheet.rows.len(),
        })?;
        for (col, cell) in cells.iter().enumerate() {
            let col = column(sheet, col)?;
            match cell {
                Cell::Text(text) => worksheet.write_string(row, col, text.as_str()),
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, col, *value, &thousands)
                }
                Cell::Percent(value) => {
                    worksheet.write_number_with_format(row, col, *value, &percent)
                }
                Cell::Blank => continue,
            }
            .map_err(wrap)?;
        }
    }

    worksheet.set_column_width(0, 14).map_err(wrap)?;
    Ok(())
}

fn column(sheet: &Sheet, index: usize) -> Result<u16, ExportError> {
    u16::try_from(index).map_err(|_| ExportError::TooLarge {
        sheet: sheet.name.clone(),
        what: "columns",
        count: index,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockdesk_core::adapters::sample::sample_http_client;
    use stockdesk_core::{
        Dashboard, DashboardConfig, FixtureHttpClient, Granularity, InstrumentCode,
        InstrumentSelection, MarketDate, StatementRow,
    };

    use super::*;

    async fn sample_report(client: FixtureHttpClient) -> DashboardReport {
        let config = DashboardConfig::default();
        let client = Arc::new(client.merge(sample_http_client(&config.sources)));
        let dashboard = Dashboard::from_http_client(client, config).expect("dashboard");
        dashboard
            .report(
                &InstrumentSelection::Code(InstrumentCode::parse("005930").expect("code")),
                Granularity::Weekly,
                MarketDate::parse("2024-01-01").expect("date"),
            )
            .await
    }

    #[tokio::test]
    async fn price_sheet_has_one_row_per_bar_and_ma_columns() {
        let report = sample_report(FixtureHttpClient::new()).await;
        let sheet = price_sheet(&report);

        assert_eq!(sheet.name, PRICE_SHEET);
        assert_eq!(sheet.rows.len(), report.chart.bars.len());
        assert_eq!(&sheet.header[9..], ["MA5", "MA20", "MA60"]);
        assert!(sheet.note.is_some());

        let first = &sheet.rows[0];
        assert_eq!(first.len(), sheet.header.len());
        assert_eq!(first[0], Cell::Text(report.chart.bars[0].date.to_string()));
        assert_eq!(first[6], Cell::Percent(0.0));
        // 5-bar window has not filled on the first row.
        assert_eq!(first[8], Cell::Blank);
        assert_eq!(first[9], Cell::Blank);
    }

    #[test]
    fn empty_statement_table_gets_placeholder_row() {
        let sheet = finance_sheet(&FinancialStatementTable::empty());
        assert_eq!(sheet.header, vec![String::from("Item")]);
        assert_eq!(sheet.rows, vec![vec![Cell::Text(NO_DATA_LABEL.to_owned())]]);
    }

    #[test]
    fn finance_sheet_mirrors_table() {
        let table = FinancialStatementTable::new(
            vec![String::from("2023.12"), String::from("2024.12")],
            vec![StatementRow {
                label: String::from("매출액"),
                values: vec![Some(2_589_355.0), None],
            }],
        )
        .expect("table");

        let sheet = finance_sheet(&table);
        assert_eq!(sheet.header, vec!["Item", "2023.12", "2024.12"]);
        assert_eq!(
            sheet.rows[0],
            vec![
                Cell::Text(String::from("매출액")),
                Cell::Number(2_589_355.0),
                Cell::Blank,
            ]
        );
    }

    #[tokio::test]
    async fn writes_workbook_when_statements_are_missing() {
        let report = sample_report(FixtureHttpClient::new().respond("main.naver", "<html></html>"))
            .await;
        assert!(report.financials.table.is_empty());

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("005930_report.xlsx");
        write_report(&report, &path).expect("export");

        let metadata = std::fs::metadata(&path).expect("file exists");
        assert!(metadata.len() > 0);
    }

    #[tokio::test]
    async fn unwritable_path_is_a_save_error() {
        let report = sample_report(FixtureHttpClient::new()).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("report.xlsx");

        assert!(matches!(
            write_report(&report, &path),
            Err(ExportError::Save { .. })
        ));
    }
}

// ==================== SPREADSHEET EXPORT ====================
// Turns the currently listed customers of one view into an .xlsx download.
// No store access happens here.

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::{
    models::{Customer, CustomerStatus},
    utils::error::AppError,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADERS: [&str; 3] = ["Name", "Mobile Number", "Activation Date"];
const COLUMN_WIDTHS: [f64; 3] = [25.0, 20.0, 20.0];
const MISSING_DATE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub name: String,
    pub mobile_number: String,
    pub activation_date: String,
}

#[derive(Debug, Clone)]
pub struct ExportSheet {
    pub sheet_name: String,
    pub file_name: String,
    pub rows: Vec<ExportRow>,
}

/// `Month D, YYYY`, or `N/A` when the record has no creation date.
pub fn format_activation_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| MISSING_DATE.to_string())
}

pub fn sheet_name(status: CustomerStatus) -> String {
    format!("{} Customers", status.label())
}

pub fn build_sheet(status: CustomerStatus, customers: &[Customer]) -> Result<ExportSheet, AppError> {
    if customers.is_empty() {
        return Err(AppError::EmptyExport(status));
    }

    let rows = customers
        .iter()
        .map(|customer| ExportRow {
            name: customer.name.clone(),
            mobile_number: customer.phone_number.clone(),
            activation_date: format_activation_date(customer.created_at),
        })
        .collect();

    let sheet_name = sheet_name(status);
    Ok(ExportSheet {
        file_name: format!("{}.xlsx", sheet_name),
        sheet_name,
        rows,
    })
}

fn write_workbook(sheet: &ExportSheet) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    // Phone numbers must stay text so leading zeros and dashes survive
    let text_format = Format::new().set_num_format("@");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.sheet_name)?;

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, &header_format)?;
        worksheet.set_column_width(col, width)?;
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let line = index as u32 + 1;
        worksheet.write_string(line, 0, &row.name)?;
        worksheet.write_string_with_format(line, 1, &row.mobile_number, &text_format)?;
        worksheet.write_string(line, 2, &row.activation_date)?;
    }

    workbook.save_to_buffer()
}

pub fn render_xlsx(sheet: &ExportSheet) -> Result<Vec<u8>, AppError> {
    write_workbook(sheet).map_err(|e| {
        log::error!("❌ Failed to build {}: {}", sheet.file_name, e);
        AppError::ExportError(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn customer(name: &str, phone: &str, created_at: Option<DateTime<Utc>>) -> Customer {
        Customer {
            id: name.to_lowercase(),
            name: name.to_string(),
            email: format!("{}@x.co", name.to_lowercase()),
            phone_number: phone.to_string(),
            status: CustomerStatus::Active,
            created_at,
            expiry_date: None,
        }
    }

    #[test]
    fn empty_list_produces_no_sheet() {
        let result = build_sheet(CustomerStatus::Pending, &[]);
        assert!(matches!(result, Err(AppError::EmptyExport(CustomerStatus::Pending))));
    }

    #[test]
    fn one_row_per_customer() {
        let created = Utc.with_ymd_and_hms(2024, 3, 7, 15, 30, 0).unwrap();
        let customers = vec![
            customer("Ada", "0555-0100", Some(created)),
            customer("Grace", "555-0101", None),
        ];

        let sheet = build_sheet(CustomerStatus::Active, &customers).unwrap();

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.sheet_name, "Active Customers");
        assert_eq!(sheet.file_name, "Active Customers.xlsx");
        assert_eq!(
            sheet.rows[0],
            ExportRow {
                name: "Ada".to_string(),
                mobile_number: "0555-0100".to_string(),
                activation_date: "March 7, 2024".to_string(),
            }
        );
        assert_eq!(sheet.rows[1].activation_date, "N/A");
    }

    fn archive_entry(bytes: &[u8], name: &str) -> String {
        use std::io::Read;

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut xml = String::new();
        entry.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn workbook_has_header_plus_one_row_per_customer() {
        let sheet = build_sheet(
            CustomerStatus::OneYear,
            &[
                customer("Ada", "0555-0100", Some(Utc::now())),
                customer("Grace", "555-0101", None),
                customer("Linus", "555-0102", None),
            ],
        )
        .unwrap();

        let bytes = render_xlsx(&sheet).unwrap();

        let worksheet = archive_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(worksheet.matches("<row ").count(), 4);
        assert!(worksheet.contains(r#"<dimension ref="A1:C4"/>"#));

        let workbook = archive_entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="One Year Customers""#));

        // Mobile numbers are written as text, leading zero intact
        let strings = archive_entry(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("0555-0100"));
        assert!(strings.contains("Mobile Number"));
    }
}

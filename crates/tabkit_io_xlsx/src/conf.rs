//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecExportOptions};

/// Excel 2007+ worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Highest body row index a sheet may reach before rollover (max rows - 1).
pub const N_ROW_IDX_BODY_MAX: usize = N_NROWS_EXCEL_MAX - 1;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Physical index of the first header row.
pub const N_ROW_IDX_HEADER_FIRST: usize = 0;
/// Physical index of the second header row.
pub const N_ROW_IDX_HEADER_SECOND: usize = 1;
/// Body row cursor start value; the first body row lands one below it.
pub const N_ROW_IDX_BODY_START: usize = 1;

/// Default column display width in 1/256-character units.
pub const N_WIDTH_COLUMN_DEFAULT: usize = 5_000;
/// Default font for header and body cells.
pub const C_FONT_NAME_DEFAULT: &str = "Arial";
/// Header fill color (solid yellow).
pub const C_COLOR_HEADER_FILL: &str = "#FFFF00";

/// MIME content type for the 2007+ XML spreadsheet format.
pub const C_CONTENT_TYPE_XLSX_2007: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Build the fixed header cell format: yellow fill, centered, bordered, wrapped.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some(C_FONT_NAME_DEFAULT.to_string()),
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        bg_color: Some(C_COLOR_HEADER_FILL.to_string()),
        text_wrap: Some(true),
        top: Some(1),
        bottom: Some(1),
        left: Some(1),
        right: Some(1),
        ..Default::default()
    }
}

/// Build the fixed body cell format: centered, thin left/right/bottom borders.
pub fn derive_default_body_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some(C_FONT_NAME_DEFAULT.to_string()),
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        bottom: Some(1),
        left: Some(1),
        right: Some(1),
        ..Default::default()
    }
}

/// Build default export options.
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions::default()
}

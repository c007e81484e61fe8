//! `tabkit_io_xlsx`:
//! Streamed XLSX export kernel for typed row objects.
//!
//! Column descriptors drive a two-row header layout (primary/secondary text,
//! merge runs, widths, inclusion filtering); body rows are appended one at a
//! time and paginate onto fresh sheets at the per-sheet row ceiling.
//!
//! Module layout:
//! - `conf`   : constants and default format presets
//! - `spec`   : models, options, row contract, error types
//! - `util`   : pure helpers (layout planner, labels, sheet names)
//! - `codec`  : narrow workbook codec seam + `rust_xlsxwriter` backend
//! - `writer` : stateful writer kernel
pub mod codec;
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use codec::{WorkbookCodec, XlsxWorkbookCodec};
pub use conf::{
    C_CONTENT_TYPE_XLSX_2007, N_LEN_EXCEL_SHEET_NAME_MAX, N_NROWS_EXCEL_MAX, N_ROW_IDX_BODY_MAX,
    N_WIDTH_COLUMN_DEFAULT, TUP_EXCEL_ILLEGAL, derive_default_body_format,
    derive_default_export_options, derive_default_header_format,
};
pub use spec::{
    EnumCellValue, EnumMergeRun, ExcelExportError, ExcelRow, SpecCellFormat, SpecColumn,
    SpecExportOptions, SpecLayoutPlan, SpecLayoutSlot,
};
pub use util::{
    create_content_disposition, create_header_label, create_sheet_identifier,
    plan_column_layout, sanitize_sheet_name, validate_column_positions,
    validate_unique_column_names,
};
pub use writer::XlsxRowWriter;

//! Shared export models, options, row contract and error types.

use std::fmt;

use crate::conf::{
    N_ROW_IDX_BODY_MAX, N_WIDTH_COLUMN_DEFAULT, derive_default_body_format,
    derive_default_header_format,
};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnSpecification

/// One output column: source key plus presentation metadata.
///
/// Descriptor order across a `Vec<SpecColumn>` is render order. Callers
/// composing a row type out of a base type list the base columns first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// Logical column key used to read values and to match inclusion filters.
    pub column_name: String,
    /// Primary header text (first header row).
    pub header_name: String,
    /// Secondary header text (second header row); blank means single-row header.
    pub second_header_name: String,
    /// Rendered regardless of any inclusion filter when set.
    pub required: bool,
    /// Declared header row index.
    pub row: usize,
    /// Declared zero-based column index before filter shifting.
    pub column: usize,
    /// Column display width in 1/256-character units.
    pub width: usize,
}

impl SpecColumn {
    /// Create a descriptor for `column_name` with default metadata.
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            header_name: String::new(),
            second_header_name: String::new(),
            required: false,
            row: 0,
            column: 0,
            width: N_WIDTH_COLUMN_DEFAULT,
        }
    }

    /// Set the primary header text.
    pub fn with_header(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    /// Set the secondary header text.
    pub fn with_second_header(mut self, second_header_name: impl Into<String>) -> Self {
        self.second_header_name = second_header_name.into();
        self
    }

    /// Mark the column as always rendered.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the declared header row index.
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Set the declared column index.
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Set the display width in 1/256-character units.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellModel

/// Normalized cell value handed to the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value; rendered as an empty text cell.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

/// Cell format specification for the fixed header/body styles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Top border style.
    pub top: Option<i64>,
    /// Bottom border style.
    pub bottom: Option<i64>,
    /// Left border style.
    pub left: Option<i64>,
    /// Right border style.
    pub right: Option<i64>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutPlan

/// One planned column: descriptor plus its post-filter physical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLayoutSlot {
    /// Source descriptor.
    pub column: SpecColumn,
    /// Effective zero-based column index after filter-driven shifting.
    pub n_col_effective: usize,
}

/// Ordered column layout, computed once per writer and reused for every
/// header render and body row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecLayoutPlan {
    /// Planned slots in render order; filtered-out descriptors are absent.
    pub slots: Vec<SpecLayoutSlot>,
}

/// Merge-run accumulator threaded through one header render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumMergeRun {
    /// No contiguous two-row-header run is open.
    NoRunOpen,
    /// A run is open; single-row merge over row 0 is pending.
    RunOpen {
        /// Column where the pending merge starts.
        n_col_start: usize,
        /// Last-seen primary header text for contiguous-run detection.
        header_text: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Writer-wide options: fixed cell formats and the per-sheet row ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportOptions {
    /// Format applied to both header rows.
    pub fmt_header: SpecCellFormat,
    /// Format applied to body cells.
    pub fmt_body: SpecCellFormat,
    /// Body row index that triggers rollover to a new sheet.
    pub n_row_idx_body_max: usize,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            fmt_header: derive_default_header_format(),
            fmt_body: derive_default_body_format(),
            n_row_idx_body_max: N_ROW_IDX_BODY_MAX,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowContract

/// Contract for exportable row types.
///
/// `columns` is the declarative descriptor table replacing runtime field
/// introspection; `cell_value` resolves one logical key to a cell value.
/// Returning `None` means the value cannot be read at all (a programming
/// error surfaced as [`ExcelExportError::FieldAccess`]); a readable-but-null
/// value is `Some(EnumCellValue::None)`.
pub trait ExcelRow {
    /// Ordered column descriptors for this row type.
    fn columns() -> Vec<SpecColumn>
    where
        Self: Sized;

    /// Resolve the value behind `column_name` for this row instance.
    fn cell_value(&self, column_name: &str) -> Option<EnumCellValue>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ErrorTypes

/// Export failure taxonomy.
#[derive(Debug)]
pub enum ExcelExportError {
    /// Malformed or conflicting column metadata; raised at construction.
    Configuration(String),
    /// A planned column's value cannot be read from a row object.
    FieldAccess {
        /// Logical key of the unreadable column.
        column_name: String,
    },
    /// Underlying spreadsheet codec failure.
    Codec(String),
    /// Append or serialize after the writer was closed.
    WriterClosed,
}

impl fmt::Display for ExcelExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Column configuration error: {msg}"),
            Self::FieldAccess { column_name } => {
                write!(f, "Cannot access field: {column_name}")
            }
            Self::Codec(msg) => write!(f, "Workbook codec error: {msg}"),
            Self::WriterClosed => write!(f, "Cannot write after close()."),
        }
    }
}

impl std::error::Error for ExcelExportError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////

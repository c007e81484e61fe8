//! Narrow spreadsheet codec seam and its `rust_xlsxwriter` backend.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use crate::spec::{ExcelExportError, SpecCellFormat};

////////////////////////////////////////////////////////////////////////////////
// #region CodecSeam

/// Minimal workbook surface the render kernel needs.
///
/// Sheets are addressed by the handle returned from [`Self::create_sheet`].
/// Column widths are taken in 1/256-character units and converted to the
/// backend's native unit by the implementation.
pub trait WorkbookCodec {
    /// Append a sheet named `sheet_name`; returns its handle.
    fn create_sheet(&mut self, sheet_name: &str) -> Result<usize, ExcelExportError>;

    /// Write a text cell.
    fn write_text(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        text: &str,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError>;

    /// Write a numeric cell.
    fn write_number(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        value: f64,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError>;

    /// Set a column's display width (1/256-character units).
    fn set_column_width(
        &mut self,
        n_sheet: usize,
        n_col: usize,
        width: usize,
    ) -> Result<(), ExcelExportError>;

    /// Merge a rectangular region, anchoring `text` at its top-left cell.
    fn merge_cells(
        &mut self,
        n_sheet: usize,
        n_row_first: usize,
        n_col_first: usize,
        n_row_last: usize,
        n_col_last: usize,
        text: &str,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError>;

    /// Serialize the workbook to an in-memory byte buffer.
    fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExcelExportError>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxBackend

/// `rust_xlsxwriter`-backed codec.
pub struct XlsxWorkbookCodec {
    workbook: Workbook,
    n_sheets: usize,
}

impl XlsxWorkbookCodec {
    /// Create an empty workbook codec.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            n_sheets: 0,
        }
    }
}

impl Default for XlsxWorkbookCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookCodec for XlsxWorkbookCodec {
    fn create_sheet(&mut self, sheet_name: &str) -> Result<usize, ExcelExportError> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(sheet_name).map_err(derive_codec_error)?;
        let n_sheet = self.n_sheets;
        self.n_sheets += 1;
        Ok(n_sheet)
    }

    fn write_text(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        text: &str,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        let format = derive_rust_xlsx_format(fmt);
        self.workbook
            .worksheet_from_index(n_sheet)
            .map_err(derive_codec_error)?
            .write_string_with_format(cast_row_num(n_row)?, cast_col_num(n_col)?, text, &format)
            .map_err(derive_codec_error)?;
        Ok(())
    }

    fn write_number(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        value: f64,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        let format = derive_rust_xlsx_format(fmt);
        self.workbook
            .worksheet_from_index(n_sheet)
            .map_err(derive_codec_error)?
            .write_number_with_format(cast_row_num(n_row)?, cast_col_num(n_col)?, value, &format)
            .map_err(derive_codec_error)?;
        Ok(())
    }

    fn set_column_width(
        &mut self,
        n_sheet: usize,
        n_col: usize,
        width: usize,
    ) -> Result<(), ExcelExportError> {
        self.workbook
            .worksheet_from_index(n_sheet)
            .map_err(derive_codec_error)?
            .set_column_width(cast_col_num(n_col)?, width as f64 / 256.0)
            .map_err(derive_codec_error)?;
        Ok(())
    }

    fn merge_cells(
        &mut self,
        n_sheet: usize,
        n_row_first: usize,
        n_col_first: usize,
        n_row_last: usize,
        n_col_last: usize,
        text: &str,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        let format = derive_rust_xlsx_format(fmt);
        self.workbook
            .worksheet_from_index(n_sheet)
            .map_err(derive_codec_error)?
            .merge_range(
                cast_row_num(n_row_first)?,
                cast_col_num(n_col_first)?,
                cast_row_num(n_row_last)?,
                cast_col_num(n_col_last)?,
                text,
                &format,
            )
            .map_err(derive_codec_error)?;
        Ok(())
    }

    fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExcelExportError> {
        self.workbook.save_to_buffer().map_err(derive_codec_error)
    }
}

/// Convert the format spec to a concrete `rust_xlsxwriter` format.
fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, ExcelExportError> {
    u32::try_from(value)
        .map_err(|_| ExcelExportError::Codec(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, ExcelExportError> {
    u16::try_from(value)
        .map_err(|_| ExcelExportError::Codec(format!("column index overflow: {value}")))
}

fn derive_codec_error(err: XlsxError) -> ExcelExportError {
    ExcelExportError::Codec(format!("xlsx write error: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridBackend

/// In-memory recording codec used by renderer tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct GridWorkbookCodec {
    /// Recorded sheets in creation order.
    pub sheets: Vec<GridSheet>,
}

/// One recorded sheet: cells, merge regions and column widths.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct GridSheet {
    /// Sheet display name.
    pub sheet_name: String,
    /// Written cells by `(row, col)`.
    pub dict_cells: std::collections::BTreeMap<(usize, usize), crate::spec::EnumCellValue>,
    /// Merge regions as `(row_first, col_first, row_last, col_last, text)`.
    pub l_merges: Vec<(usize, usize, usize, usize, String)>,
    /// Column widths by column index (1/256-character units).
    pub dict_widths: std::collections::BTreeMap<usize, usize>,
}

#[cfg(test)]
impl GridWorkbookCodec {
    fn sheet_mut(&mut self, n_sheet: usize) -> Result<&mut GridSheet, ExcelExportError> {
        self.sheets
            .get_mut(n_sheet)
            .ok_or_else(|| ExcelExportError::Codec(format!("unknown sheet handle: {n_sheet}")))
    }
}

#[cfg(test)]
impl WorkbookCodec for GridWorkbookCodec {
    fn create_sheet(&mut self, sheet_name: &str) -> Result<usize, ExcelExportError> {
        self.sheets.push(GridSheet {
            sheet_name: sheet_name.to_string(),
            ..Default::default()
        });
        Ok(self.sheets.len() - 1)
    }

    fn write_text(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        text: &str,
        _fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        self.sheet_mut(n_sheet)?.dict_cells.insert(
            (n_row, n_col),
            crate::spec::EnumCellValue::String(text.to_string()),
        );
        Ok(())
    }

    fn write_number(
        &mut self,
        n_sheet: usize,
        n_row: usize,
        n_col: usize,
        value: f64,
        _fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        self.sheet_mut(n_sheet)?
            .dict_cells
            .insert((n_row, n_col), crate::spec::EnumCellValue::Number(value));
        Ok(())
    }

    fn set_column_width(
        &mut self,
        n_sheet: usize,
        n_col: usize,
        width: usize,
    ) -> Result<(), ExcelExportError> {
        self.sheet_mut(n_sheet)?.dict_widths.insert(n_col, width);
        Ok(())
    }

    fn merge_cells(
        &mut self,
        n_sheet: usize,
        n_row_first: usize,
        n_col_first: usize,
        n_row_last: usize,
        n_col_last: usize,
        text: &str,
        _fmt: &SpecCellFormat,
    ) -> Result<(), ExcelExportError> {
        self.sheet_mut(n_sheet)?.l_merges.push((
            n_row_first,
            n_col_first,
            n_row_last,
            n_col_last,
            text.to_string(),
        ));
        Ok(())
    }

    fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExcelExportError> {
        Ok(Vec::new())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

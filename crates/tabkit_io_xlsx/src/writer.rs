//! Stateful row-stream writer kernel: two-row header rendering with merge
//! bookkeeping, typed body rendering and sheet pagination.

use std::collections::BTreeMap;
use std::io::Write;

use crate::codec::WorkbookCodec;
use crate::conf::{N_ROW_IDX_BODY_START, N_ROW_IDX_HEADER_FIRST, N_ROW_IDX_HEADER_SECOND};
use crate::spec::{
    EnumCellValue, EnumMergeRun, ExcelExportError, ExcelRow, SpecCellFormat, SpecColumn,
    SpecExportOptions, SpecLayoutPlan,
};
use crate::util::{
    create_header_label, create_sheet_identifier, has_text, plan_column_layout,
    sanitize_sheet_name, validate_column_positions, validate_unique_column_names,
};

////////////////////////////////////////////////////////////////////////////////
// #region WriterKernel

/// Streaming row-to-workbook writer.
///
/// One writer serves one export: the column layout is planned once at
/// construction and reused for every sheet header and body row. Rows are
/// appended one at a time; when the current sheet's row ceiling is reached a
/// fresh sheet is started with the same header layout.
pub struct XlsxRowWriter<C: WorkbookCodec> {
    codec: C,
    options: SpecExportOptions,
    plan: SpecLayoutPlan,
    n_sheet: usize,
    sheet_name: String,
    n_sheet_seq: usize,
    n_row_cursor: usize,
    n_rows_body: usize,
    l_header_labels: Vec<String>,
    if_closed: bool,
}

impl<C: WorkbookCodec> XlsxRowWriter<C> {
    /// Create a writer from explicit column descriptors.
    ///
    /// Validates the descriptors, plans the layout under `draw_columns`
    /// (optional allow-list of logical keys; required columns always render),
    /// sanitizes `sheet_name`, creates the first sheet and renders its header.
    pub fn create(
        mut codec: C,
        sheet_name: &str,
        columns: Vec<SpecColumn>,
        draw_columns: Option<Vec<String>>,
        options: SpecExportOptions,
    ) -> Result<Self, ExcelExportError> {
        validate_unique_column_names(&columns)?;
        validate_column_positions(&columns)?;
        let plan = plan_column_layout(&columns, draw_columns.as_deref())?;

        let c_sheet_name = sanitize_sheet_name(sheet_name, "_");
        let n_sheet = codec.create_sheet(&c_sheet_name)?;

        tracing::debug!(
            sheet_name = %c_sheet_name,
            n_cols_planned = plan.slots.len(),
            "created xlsx row writer"
        );

        let mut writer = Self {
            codec,
            options,
            plan,
            n_sheet,
            sheet_name: c_sheet_name,
            n_sheet_seq: 0,
            n_row_cursor: N_ROW_IDX_BODY_START,
            n_rows_body: 0,
            l_header_labels: Vec::new(),
            if_closed: false,
        };
        writer.render_current_header()?;
        Ok(writer)
    }

    /// Create a writer from a row type's declared descriptor table.
    pub fn create_for<T: ExcelRow>(
        codec: C,
        sheet_name: &str,
        draw_columns: Option<Vec<String>>,
        options: SpecExportOptions,
    ) -> Result<Self, ExcelExportError> {
        Self::create(codec, sheet_name, T::columns(), draw_columns, options)
    }

    /// Append one body row; `None` is a no-op.
    ///
    /// May roll over to a new sheet first when the current sheet's row
    /// ceiling is reached.
    pub fn append_row<T: ExcelRow>(
        &mut self,
        contents: Option<&T>,
    ) -> Result<(), ExcelExportError> {
        if self.if_closed {
            return Err(ExcelExportError::WriterClosed);
        }
        let Some(contents) = contents else {
            return Ok(());
        };
        self.render_body(contents)?;
        self.n_rows_body += 1;
        Ok(())
    }

    /// Serialize the workbook. The writer rejects further appends afterwards.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExcelExportError> {
        self.if_closed = true;
        self.codec.save_to_buffer()
    }

    /// Serialize the workbook into a caller-supplied byte sink.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> Result<(), ExcelExportError> {
        let v_bytes = self.save_to_buffer()?;
        sink.write_all(&v_bytes).map_err(|err| {
            ExcelExportError::Codec(format!("Failed to write workbook bytes: {err}"))
        })
    }

    /// Number of body rows written across all sheets.
    pub fn n_rows_body(&self) -> usize {
        self.n_rows_body
    }

    /// Current physical row pointer, one below the body-row cursor.
    pub fn n_row_index(&self) -> usize {
        self.n_row_cursor - 1
    }

    /// Body row index ceiling for the active spreadsheet format version.
    pub fn n_row_idx_body_max(&self) -> usize {
        self.options.n_row_idx_body_max
    }

    /// Header display labels, accumulated once per rendered sheet header.
    pub fn header_labels(&self) -> &[String] {
        &self.l_header_labels
    }

    /// Current sheet display name.
    pub fn current_sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Borrow the underlying codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn render_current_header(&mut self) -> Result<(), ExcelExportError> {
        render_sheet_header(
            &mut self.codec,
            self.n_sheet,
            &self.plan,
            &self.options.fmt_header,
            &mut self.l_header_labels,
        )
    }

    fn render_body<T: ExcelRow>(&mut self, contents: &T) -> Result<(), ExcelExportError> {
        if self.n_row_cursor == self.options.n_row_idx_body_max {
            self.n_row_cursor = N_ROW_IDX_BODY_START;
            self.create_next_sheet_with_header()?;
        }
        self.n_row_cursor += 1;
        render_body_row(
            &mut self.codec,
            self.n_sheet,
            self.n_row_cursor,
            &self.plan,
            &self.options.fmt_body,
            contents,
        )
    }

    fn create_next_sheet_with_header(&mut self) -> Result<(), ExcelExportError> {
        let c_sheet_name_next = create_sheet_identifier(&self.sheet_name, self.n_sheet_seq);
        self.n_sheet_seq += 1;
        tracing::debug!(
            sheet_name = %c_sheet_name_next,
            n_sheet_seq = self.n_sheet_seq,
            "sheet capacity reached; starting next sheet"
        );
        self.n_sheet = self.codec.create_sheet(&c_sheet_name_next)?;
        self.sheet_name = c_sheet_name_next;
        self.render_current_header()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderRendering

/// Render both header rows of one sheet from the layout plan.
fn render_sheet_header<C: WorkbookCodec>(
    codec: &mut C,
    n_sheet: usize,
    plan: &SpecLayoutPlan,
    fmt_header: &SpecCellFormat,
    l_header_labels: &mut Vec<String>,
) -> Result<(), ExcelExportError> {
    let mut merge_run = EnumMergeRun::NoRunOpen;
    let mut dict_header_text_by_col: BTreeMap<usize, String> = BTreeMap::new();

    for slot in &plan.slots {
        let column = &slot.column;
        let n_col = slot.n_col_effective;

        // Repeated-position descriptors with a declared-row mismatch render
        // once; a descriptor declared on the first header row always renders.
        if column.row != N_ROW_IDX_HEADER_FIRST && dict_header_text_by_col.contains_key(&n_col) {
            continue;
        }

        codec.write_text(
            n_sheet,
            N_ROW_IDX_HEADER_FIRST,
            n_col,
            &column.header_name,
            fmt_header,
        )?;
        codec.write_text(
            n_sheet,
            N_ROW_IDX_HEADER_SECOND,
            n_col,
            &column.second_header_name,
            fmt_header,
        )?;

        merge_run = apply_header_merge(
            codec,
            n_sheet,
            column,
            n_col,
            merge_run,
            &dict_header_text_by_col,
            fmt_header,
        )?;

        codec.set_column_width(n_sheet, n_col, column.width)?;
        dict_header_text_by_col.insert(n_col, column.header_name.clone());

        if has_text(&column.header_name) || has_text(&column.second_header_name) {
            l_header_labels.push(create_header_label(
                &column.header_name,
                &column.second_header_name,
            ));
        }
    }

    // A run still open after the last slot stays unmerged.
    Ok(())
}

/// Advance the merge-run state for one rendered header column.
fn apply_header_merge<C: WorkbookCodec>(
    codec: &mut C,
    n_sheet: usize,
    column: &SpecColumn,
    n_col: usize,
    merge_run: EnumMergeRun,
    dict_header_text_by_col: &BTreeMap<usize, String>,
    fmt_header: &SpecCellFormat,
) -> Result<EnumMergeRun, ExcelExportError> {
    if !has_text(&column.second_header_name) {
        // Single-row header: close any pending run, then span both header
        // rows with one cell.
        if let EnumMergeRun::RunOpen { n_col_start, .. } = merge_run {
            merge_header_row_first(
                codec,
                n_sheet,
                n_col_start,
                n_col,
                dict_header_text_by_col,
                fmt_header,
            )?;
        }
        codec.merge_cells(
            n_sheet,
            N_ROW_IDX_HEADER_FIRST,
            n_col,
            N_ROW_IDX_HEADER_SECOND,
            n_col,
            &column.header_name,
            fmt_header,
        )?;
        return Ok(EnumMergeRun::NoRunOpen);
    }

    let merge_run_next = match merge_run {
        EnumMergeRun::NoRunOpen => EnumMergeRun::RunOpen {
            n_col_start: n_col,
            header_text: column.header_name.clone(),
        },
        EnumMergeRun::RunOpen {
            n_col_start,
            header_text,
        } => {
            if header_text != column.header_name {
                // Close the previous run; the run start carries over
                // unchanged into the next run.
                merge_header_row_first(
                    codec,
                    n_sheet,
                    n_col_start,
                    n_col,
                    dict_header_text_by_col,
                    fmt_header,
                )?;
            }
            EnumMergeRun::RunOpen {
                n_col_start,
                header_text: column.header_name.clone(),
            }
        }
    };
    Ok(merge_run_next)
}

/// Merge the first header row over `[n_col_start, n_col_current - 1]`.
///
/// Regions narrower than two cells are skipped; the codec rejects them and a
/// one-column run needs no merge.
fn merge_header_row_first<C: WorkbookCodec>(
    codec: &mut C,
    n_sheet: usize,
    n_col_start: usize,
    n_col_current: usize,
    dict_header_text_by_col: &BTreeMap<usize, String>,
    fmt_header: &SpecCellFormat,
) -> Result<(), ExcelExportError> {
    if n_col_current < n_col_start + 2 {
        return Ok(());
    }
    let c_text = dict_header_text_by_col
        .get(&n_col_start)
        .cloned()
        .unwrap_or_default();
    codec.merge_cells(
        n_sheet,
        N_ROW_IDX_HEADER_FIRST,
        n_col_start,
        N_ROW_IDX_HEADER_FIRST,
        n_col_current - 1,
        &c_text,
        fmt_header,
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BodyRendering

/// Write one body row at `n_row` from the layout plan.
fn render_body_row<C: WorkbookCodec, T: ExcelRow>(
    codec: &mut C,
    n_sheet: usize,
    n_row: usize,
    plan: &SpecLayoutPlan,
    fmt_body: &SpecCellFormat,
    contents: &T,
) -> Result<(), ExcelExportError> {
    for slot in &plan.slots {
        let value = contents.cell_value(&slot.column.column_name).ok_or_else(|| {
            ExcelExportError::FieldAccess {
                column_name: slot.column.column_name.clone(),
            }
        })?;
        match value {
            EnumCellValue::Number(n_value) => {
                codec.write_number(n_sheet, n_row, slot.n_col_effective, n_value, fmt_body)?;
            }
            EnumCellValue::String(c_value) => {
                codec.write_text(n_sheet, n_row, slot.n_col_effective, &c_value, fmt_body)?;
            }
            EnumCellValue::None => {
                codec.write_text(n_sheet, n_row, slot.n_col_effective, "", fmt_body)?;
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::codec::GridWorkbookCodec;
    use crate::conf::N_WIDTH_COLUMN_DEFAULT;

    use super::*;

    struct SpecTradeRow {
        market: String,
        venue: String,
        note: String,
    }

    impl ExcelRow for SpecTradeRow {
        fn columns() -> Vec<SpecColumn> {
            vec![
                SpecColumn::new("market")
                    .with_header("Group")
                    .with_second_header("X")
                    .with_column(0),
                SpecColumn::new("venue")
                    .with_header("Group")
                    .with_second_header("Y")
                    .with_column(1),
                SpecColumn::new("note").with_header("Solo").with_column(2),
            ]
        }

        fn cell_value(&self, column_name: &str) -> Option<EnumCellValue> {
            match column_name {
                "market" => Some(EnumCellValue::String(self.market.clone())),
                "venue" => Some(EnumCellValue::String(self.venue.clone())),
                "note" => Some(EnumCellValue::String(self.note.clone())),
                _ => None,
            }
        }
    }

    struct SpecMetricRow {
        n_count: Option<i64>,
        c_name: String,
    }

    impl ExcelRow for SpecMetricRow {
        fn columns() -> Vec<SpecColumn> {
            vec![
                SpecColumn::new("count").with_header("Count").with_column(0),
                SpecColumn::new("name").with_header("Name").with_column(1),
            ]
        }

        fn cell_value(&self, column_name: &str) -> Option<EnumCellValue> {
            match column_name {
                "count" => Some(match self.n_count {
                    Some(n_value) => EnumCellValue::Number(n_value as f64),
                    None => EnumCellValue::None,
                }),
                "name" => Some(EnumCellValue::String(self.c_name.clone())),
                _ => None,
            }
        }
    }

    fn derive_metric_row(n_idx: i64) -> SpecMetricRow {
        SpecMetricRow {
            n_count: Some(n_idx),
            c_name: format!("row-{n_idx}"),
        }
    }

    #[test]
    fn test_render_header_merges_group_run_and_solo_column() {
        let writer = XlsxRowWriter::create_for::<SpecTradeRow>(
            GridWorkbookCodec::default(),
            "Trades",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        let sheet = &writer.codec().sheets[0];
        assert_eq!(
            sheet.dict_cells[&(0, 0)],
            EnumCellValue::String("Group".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(0, 1)],
            EnumCellValue::String("Group".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(0, 2)],
            EnumCellValue::String("Solo".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(1, 0)],
            EnumCellValue::String("X".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(1, 1)],
            EnumCellValue::String("Y".to_string())
        );
        assert_eq!(
            sheet.l_merges,
            vec![
                (0, 0, 0, 1, "Group".to_string()),
                (0, 2, 1, 2, "Solo".to_string()),
            ]
        );
        assert_eq!(sheet.dict_widths[&2], N_WIDTH_COLUMN_DEFAULT);
        assert_eq!(
            writer.header_labels(),
            ["Group-X", "Group-Y", "Solo"]
        );
    }

    #[test]
    fn test_render_header_compacts_columns_under_filter() {
        let l_filter = vec!["market".to_string(), "note".to_string()];
        let writer = XlsxRowWriter::create_for::<SpecTradeRow>(
            GridWorkbookCodec::default(),
            "Trades",
            Some(l_filter),
            SpecExportOptions::default(),
        )
        .unwrap();

        let sheet = &writer.codec().sheets[0];
        assert_eq!(
            sheet.dict_cells[&(0, 0)],
            EnumCellValue::String("Group".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(0, 1)],
            EnumCellValue::String("Solo".to_string())
        );
        // A one-column run closes without a merge region; only the vertical
        // merge for the single-row header remains.
        assert_eq!(sheet.l_merges, vec![(0, 1, 1, 1, "Solo".to_string())]);
        assert_eq!(writer.header_labels(), ["Group-X", "Solo"]);
    }

    #[test]
    fn test_render_header_leaves_trailing_open_run_unmerged() {
        // Known boundary case: a run still open at the last column is never
        // merged.
        let l_columns = vec![
            SpecColumn::new("note").with_header("Solo").with_column(0),
            SpecColumn::new("market")
                .with_header("Group")
                .with_second_header("X")
                .with_column(1),
            SpecColumn::new("venue")
                .with_header("Group")
                .with_second_header("Y")
                .with_column(2),
        ];
        let writer = XlsxRowWriter::create(
            GridWorkbookCodec::default(),
            "Trades",
            l_columns,
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        let sheet = &writer.codec().sheets[0];
        assert_eq!(sheet.l_merges, vec![(0, 0, 1, 0, "Solo".to_string())]);
    }

    #[test]
    fn test_render_header_skips_duplicate_position_descriptor() {
        let l_columns = vec![
            SpecColumn::new("left").with_header("Left").with_column(0),
            SpecColumn::new("left_again")
                .with_header("Left")
                .with_row(1)
                .with_column(0),
        ];
        let writer = XlsxRowWriter::create(
            GridWorkbookCodec::default(),
            "Dup",
            l_columns,
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        let sheet = &writer.codec().sheets[0];
        assert_eq!(sheet.l_merges, vec![(0, 0, 1, 0, "Left".to_string())]);
        assert_eq!(writer.header_labels(), ["Left"]);
    }

    #[test]
    fn test_append_row_writes_typed_cells() {
        let mut writer = XlsxRowWriter::create_for::<SpecMetricRow>(
            GridWorkbookCodec::default(),
            "Metrics",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        writer
            .append_row(Some(&SpecMetricRow {
                n_count: Some(42),
                c_name: "answer".to_string(),
            }))
            .unwrap();
        writer
            .append_row(Some(&SpecMetricRow {
                n_count: None,
                c_name: "blank".to_string(),
            }))
            .unwrap();

        let sheet = &writer.codec().sheets[0];
        assert_eq!(sheet.dict_cells[&(2, 0)], EnumCellValue::Number(42.0));
        assert_eq!(
            sheet.dict_cells[&(2, 1)],
            EnumCellValue::String("answer".to_string())
        );
        assert_eq!(
            sheet.dict_cells[&(3, 0)],
            EnumCellValue::String(String::new())
        );
        assert_eq!(writer.n_rows_body(), 2);
        assert_eq!(writer.n_row_index(), 2);
    }

    #[test]
    fn test_append_row_none_is_noop() {
        let mut writer = XlsxRowWriter::create_for::<SpecMetricRow>(
            GridWorkbookCodec::default(),
            "Metrics",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        writer.append_row::<SpecMetricRow>(None).unwrap();

        assert_eq!(writer.n_rows_body(), 0);
        assert_eq!(writer.n_row_index(), 0);
    }

    #[test]
    fn test_append_row_surfaces_field_access_error() {
        struct SpecBrokenRow;

        impl ExcelRow for SpecBrokenRow {
            fn columns() -> Vec<SpecColumn> {
                vec![SpecColumn::new("ghost").with_header("Ghost").with_column(0)]
            }

            fn cell_value(&self, _column_name: &str) -> Option<EnumCellValue> {
                None
            }
        }

        let mut writer = XlsxRowWriter::create_for::<SpecBrokenRow>(
            GridWorkbookCodec::default(),
            "Broken",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        let result = writer.append_row(Some(&SpecBrokenRow));

        assert!(matches!(
            result,
            Err(ExcelExportError::FieldAccess { column_name }) if column_name == "ghost"
        ));
    }

    #[test]
    fn test_pagination_rolls_over_with_fresh_header() {
        let options = SpecExportOptions {
            n_row_idx_body_max: 5,
            ..Default::default()
        };
        let mut writer = XlsxRowWriter::create_for::<SpecMetricRow>(
            GridWorkbookCodec::default(),
            "Metrics",
            None,
            options,
        )
        .unwrap();

        for n_idx in 0..9 {
            writer.append_row(Some(&derive_metric_row(n_idx))).unwrap();
        }

        let l_sheet_names: Vec<&str> = writer
            .codec()
            .sheets
            .iter()
            .map(|sheet| sheet.sheet_name.as_str())
            .collect();
        assert_eq!(l_sheet_names, vec!["Metrics", "Metrics_0", "Metrics_0_1"]);
        assert_eq!(writer.current_sheet_name(), "Metrics_0_1");
        assert_eq!(writer.n_rows_body(), 9);

        // Four body rows per full sheet (indices 2..=5), one on the last.
        for sheet in &writer.codec().sheets[..2] {
            assert_eq!(
                sheet.dict_cells[&(0, 0)],
                EnumCellValue::String("Count".to_string())
            );
            for n_row in 2..=5 {
                assert!(sheet.dict_cells.contains_key(&(n_row, 0)));
            }
            assert!(!sheet.dict_cells.contains_key(&(6, 0)));
        }
        let sheet_last = &writer.codec().sheets[2];
        assert!(sheet_last.dict_cells.contains_key(&(2, 0)));
        assert!(!sheet_last.dict_cells.contains_key(&(3, 0)));

        // Labels repeat once per rendered sheet header.
        assert_eq!(writer.header_labels().len(), 6);
    }

    #[test]
    fn test_append_row_after_close_errors() {
        let mut writer = XlsxRowWriter::create_for::<SpecMetricRow>(
            GridWorkbookCodec::default(),
            "Metrics",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        writer.save_to_buffer().unwrap();
        let result = writer.append_row(Some(&derive_metric_row(1)));

        assert!(matches!(result, Err(ExcelExportError::WriterClosed)));
    }

    #[test]
    fn test_create_rejects_conflicting_column_positions() {
        let l_columns = vec![
            SpecColumn::new("alpha").with_header("Alpha").with_column(0),
            SpecColumn::new("beta").with_header("Beta").with_column(0),
        ];

        let result = XlsxRowWriter::create(
            GridWorkbookCodec::default(),
            "Bad",
            l_columns,
            None,
            SpecExportOptions::default(),
        );

        assert!(matches!(
            result,
            Err(ExcelExportError::Configuration(_))
        ));
    }

    #[test]
    fn test_write_to_streams_serialized_bytes() {
        let mut writer = XlsxRowWriter::create_for::<SpecMetricRow>(
            GridWorkbookCodec::default(),
            "Metrics",
            None,
            SpecExportOptions::default(),
        )
        .unwrap();

        let mut v_sink: Vec<u8> = Vec::new();
        writer.write_to(&mut v_sink).unwrap();

        let result = writer.append_row(Some(&derive_metric_row(1)));
        assert!(matches!(result, Err(ExcelExportError::WriterClosed)));
    }
}

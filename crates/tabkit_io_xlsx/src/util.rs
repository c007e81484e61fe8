//! Stateless helper functions: column validation, layout planning, header
//! labels and sheet-name normalization.

use std::collections::BTreeMap;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{ExcelExportError, SpecColumn, SpecLayoutPlan, SpecLayoutSlot};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnValidation

/// Validate that no two descriptors share a logical column key.
pub fn validate_unique_column_names(columns: &[SpecColumn]) -> Result<(), ExcelExportError> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, column) in columns.iter().enumerate() {
        dict_pos
            .entry(column.column_name.as_str())
            .or_default()
            .push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    if c_msg.is_empty() {
        Ok(())
    } else {
        Err(ExcelExportError::Configuration(format!(
            "Duplicate column names detected: {c_msg}"
        )))
    }
}

/// Validate declared `(row, column)` positions.
///
/// Two descriptors at the same position with differing header text conflict;
/// identical text is accepted and rendered once (first wins at render time).
pub fn validate_column_positions(columns: &[SpecColumn]) -> Result<(), ExcelExportError> {
    let mut dict_headers_by_pos: BTreeMap<(usize, usize), (&str, &str)> = BTreeMap::new();
    for column in columns {
        let tup_headers = (
            column.header_name.as_str(),
            column.second_header_name.as_str(),
        );
        match dict_headers_by_pos.get(&(column.row, column.column)) {
            Some(tup_existing) if *tup_existing != tup_headers => {
                return Err(ExcelExportError::Configuration(format!(
                    "Conflicting header text at row {} column {}: {:?} vs {:?}.",
                    column.row, column.column, tup_existing.0, tup_headers.0
                )));
            }
            Some(_) => {}
            None => {
                dict_headers_by_pos.insert((column.row, column.column), tup_headers);
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutPlanning

/// Compute the effective column layout for `columns` under an optional
/// inclusion filter of logical keys.
///
/// A descriptor is skipped when it is not required, a non-empty filter is
/// present, and its key is not listed. The effective index of a kept
/// descriptor is its declared column minus the running skip count, applied
/// only once at least one column is outside the filter overall and at least
/// one skip occurred before the descriptor; earlier descriptors keep their
/// declared columns unchanged. An empty filter behaves as no filter.
pub fn plan_column_layout(
    columns: &[SpecColumn],
    draw_columns: Option<&[String]>,
) -> Result<SpecLayoutPlan, ExcelExportError> {
    let l_draw_columns = match draw_columns {
        Some(l_keys) if !l_keys.is_empty() => Some(l_keys),
        _ => None,
    };
    let n_cols_outside_filter: i64 = match l_draw_columns {
        Some(l_keys) => columns.len() as i64 - l_keys.len() as i64,
        None => 0,
    };

    let mut n_skipped: i64 = 0;
    let mut l_slots = Vec::new();
    for column in columns {
        let if_skip = !column.required
            && l_draw_columns.is_some_and(|l_keys| {
                !l_keys.iter().any(|c_name| c_name == &column.column_name)
            });
        if if_skip {
            n_skipped += 1;
            continue;
        }

        let n_col_effective = if n_cols_outside_filter > 0 && n_skipped > 0 {
            column.column as i64 - n_skipped
        } else {
            column.column as i64
        };
        if n_col_effective < 0 {
            return Err(ExcelExportError::Configuration(format!(
                "Column {:?} shifts to negative index {n_col_effective} under the inclusion filter.",
                column.column_name
            )));
        }

        l_slots.push(SpecLayoutSlot {
            column: column.clone(),
            n_col_effective: n_col_effective as usize,
        });
    }

    Ok(SpecLayoutPlan { slots: l_slots })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderLabels

/// True when `text` contains at least one non-whitespace character.
pub fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Build the display label for a rendered header column.
///
/// `primary` alone, `secondary` alone, or `primary-secondary` when both are
/// present.
pub fn create_header_label(header_name: &str, second_header_name: &str) -> String {
    if has_text(header_name) {
        if has_text(second_header_name) {
            return format!("{header_name}-{second_header_name}");
        }
        return header_name.to_string();
    }
    second_header_name.to_string()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to a valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create a suffixed rollover sheet name (`base_0`, `base_1`, ...),
/// truncating the base so the result stays within the sheet-name length cap.
pub fn create_sheet_identifier(base_name: &str, sheet_seq: usize) -> String {
    let c_sheet_name_suffix = format!("_{sheet_seq}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Build the content-disposition value for an attachment download.
pub fn create_content_disposition(file_name: &str) -> String {
    format!("attachment; filename={file_name}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

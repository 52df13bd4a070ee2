//! Persistence boundary for the frame record table.
//!
//! The on-disk shape is one CSV row per frame with the columns
//! `frame-index, hD, mHD, hPosX, hPosY, mHPos, bPosX, bPosY, remarks`.
//! Positions and directions use the sentinel strings `"None"` (never
//! computed) and `"D"` (explicitly deleted); both must round-trip distinctly
//! from numeric values. Conversion between sentinels and [`Field`] happens
//! here and nowhere else.

use crate::pose::{Field, FrameRecord, Pose};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const HEADER: &str = "frame-index, hD, mHD, hPosX, hPosY, mHPos, bPosX, bPosY, remarks";

fn scalar_to_cell(field: Field<i32>) -> String {
    match field {
        Field::Unset => "None".to_string(),
        Field::Deleted => "D".to_string(),
        Field::Value(v) => v.to_string(),
    }
}

fn scalar_from_cell(cell: &str) -> Result<Field<i32>> {
    match cell {
        "None" => Ok(Field::Unset),
        "D" => Ok(Field::Deleted),
        other => other
            .parse::<i32>()
            .map(Field::Value)
            .map_err(|_| Error::Record(format!("unparseable cell {other:?}"))),
    }
}

fn position_to_cells(field: Field<(i32, i32)>) -> (String, String) {
    match field {
        Field::Unset => ("None".to_string(), "None".to_string()),
        Field::Deleted => ("D".to_string(), "D".to_string()),
        Field::Value((x, y)) => (x.to_string(), y.to_string()),
    }
}

fn position_from_cells(x: &str, y: &str) -> Result<Field<(i32, i32)>> {
    match (scalar_from_cell(x)?, scalar_from_cell(y)?) {
        (Field::Unset, Field::Unset) => Ok(Field::Unset),
        (Field::Deleted, Field::Deleted) => Ok(Field::Deleted),
        (Field::Value(px), Field::Value(py)) => Ok(Field::Value((px, py))),
        _ => Err(Error::Record(format!("inconsistent position cells {x:?}/{y:?}"))),
    }
}

fn flag_to_cell(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn flag_from_cell(cell: &str) -> Result<bool> {
    match cell {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(Error::Record(format!("unparseable flag {other:?}"))),
    }
}

/// Write the record table to `path`
///
/// Appends two summary lines counting frames with missing head position and
/// missing head direction after the data rows.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_records<P: AsRef<Path>>(path: P, records: &[FrameRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{HEADER}")?;

    let mut missing_head_pos = 0usize;
    let mut missing_direction = 0usize;
    for rec in records {
        let pose = &rec.pose;
        if !pose.head.is_value() {
            missing_head_pos += 1;
        }
        if !pose.direction.is_value() {
            missing_direction += 1;
        }
        let (hx, hy) = position_to_cells(pose.head);
        let (bx, by) = position_to_cells(pose.base);
        writeln!(
            out,
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            rec.index,
            scalar_to_cell(pose.direction),
            flag_to_cell(pose.direction_manual),
            hx,
            hy,
            flag_to_cell(pose.head_manual),
            bx,
            by,
            rec.remarks.as_deref().unwrap_or("None"),
        )?;
    }
    writeln!(out, "{}", "-".repeat(66))?;
    writeln!(out, "Number of frames in which head position is missing, {missing_head_pos}")?;
    writeln!(out, "Number of frames in which head direction is missing, {missing_direction}")?;
    out.flush()?;
    Ok(())
}

/// Load a record table from `path` into `frame_count` records
///
/// Rows beyond `frame_count` and the summary footer are ignored; frames
/// absent from the file stay unset.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a data row is malformed.
pub fn load_records<P: AsRef<Path>>(path: P, frame_count: usize) -> Result<Vec<FrameRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records: Vec<FrameRecord> = (0..frame_count).map(FrameRecord::new).collect();

    for (line_no, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        // summary footer and separator lines have a non-numeric first cell
        let Ok(index) = cells[0].parse::<usize>() else {
            continue;
        };
        if index >= frame_count {
            continue;
        }
        if cells.len() < 8 {
            return Err(Error::Record(format!("line {}: expected 8+ cells, got {}", line_no + 1, cells.len())));
        }
        let pose = Pose {
            direction: scalar_from_cell(cells[1])?,
            direction_manual: flag_from_cell(cells[2])?,
            head: position_from_cells(cells[3], cells[4])?,
            head_manual: flag_from_cell(cells[5])?,
            base: position_from_cells(cells[6], cells[7])?,
        };
        let remarks = match cells.get(8) {
            None | Some(&"None") | Some(&"") => None,
            Some(text) => Some((*text).to_string()),
        };
        records[index] = FrameRecord { index, pose, remarks };
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<FrameRecord> {
        let mut records: Vec<FrameRecord> = (0..4).map(FrameRecord::new).collect();
        records[1].pose = Pose {
            head: Field::Value((120, 80)),
            base: Field::Value((100, 90)),
            direction: Field::Value(45),
            head_manual: false,
            direction_manual: false,
        };
        records[2].pose = Pose::deleted();
        records[3].pose = Pose {
            head: Field::Value((10, 20)),
            base: Field::Value((5, 25)),
            direction: Field::Value(-90),
            head_manual: true,
            direction_manual: true,
        };
        records[3].remarks = Some("checked by hand".to_string());
        records
    }

    #[test]
    fn test_round_trip_preserves_three_states() {
        let dir = std::env::temp_dir().join("apc_records_round_trip.csv");
        let records = sample_records();
        save_records(&dir, &records).unwrap();
        let loaded = load_records(&dir, records.len()).unwrap();
        assert_eq!(records, loaded);
        // frame 0 stays unset, frame 2 stays deleted
        assert!(loaded[0].pose.head.is_unset());
        assert!(loaded[2].pose.head.is_deleted());
        std::fs::remove_file(&dir).ok();
    }

    #[test]
    fn test_footer_lines_are_skipped_on_load() {
        let dir = std::env::temp_dir().join("apc_records_footer.csv");
        save_records(&dir, &sample_records()).unwrap();
        let text = std::fs::read_to_string(&dir).unwrap();
        assert!(text.contains("head position is missing, 2"));
        assert!(text.contains("head direction is missing, 2"));
        // loading back does not trip over the footer
        assert!(load_records(&dir, 4).is_ok());
        std::fs::remove_file(&dir).ok();
    }

    #[test]
    fn test_inconsistent_position_cells_rejected() {
        assert!(position_from_cells("None", "D").is_err());
        assert!(position_from_cells("12", "None").is_err());
        assert!(position_from_cells("12", "34").is_ok());
    }

    #[test]
    fn test_sentinels_never_conflate() {
        assert_eq!(scalar_from_cell("None").unwrap(), Field::Unset);
        assert_eq!(scalar_from_cell("D").unwrap(), Field::Deleted);
        assert_eq!(scalar_from_cell("-180").unwrap(), Field::Value(-180));
        assert!(scalar_from_cell("nan").is_err());
    }
}

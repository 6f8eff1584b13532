//! AMBER coordinate (`inpcrd`) files: title, atom count, `6F12.7` coordinates and an
//! optional box line.

use crate::io::error::Error;
use crate::model::files::CoordinateFile;
use crate::model::types::Point;
use std::io::{BufRead, Write};

const FORMAT: &str = "inpcrd";
const FIELD_WIDTH: usize = 12;
const PER_LINE: usize = 6;

pub fn write<W: Write>(mut writer: W, file: &CoordinateFile) -> Result<(), Error> {
    let io = |e: std::io::Error| Error::from_io(e, None);

    writeln!(writer, "{}", file.title).map_err(io)?;
    writeln!(writer, "{:6}", file.positions.len()).map_err(io)?;

    let values: Vec<f64> = file
        .positions
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .collect();
    for chunk in values.chunks(PER_LINE) {
        let line: String = chunk.iter().map(|v| format!("{v:12.7}")).collect();
        writeln!(writer, "{line}").map_err(io)?;
    }

    if let Some(dimensions) = file.box_dimensions {
        let line: String = dimensions.iter().map(|v| format!("{v:12.7}")).collect();
        writeln!(writer, "{line}").map_err(io)?;
    }
    Ok(())
}

/// Reads an inpcrd stream; velocities, if present, are not supported and make the file
/// inconsistent.
pub fn read<R: BufRead>(reader: R) -> Result<CoordinateFile, Error> {
    let mut lines = reader.lines().enumerate();
    let mut next_line = || -> Result<Option<(usize, String)>, Error> {
        lines
            .next()
            .map(|(idx, line)| line.map(|l| (idx + 1, l)).map_err(|e| Error::from_io(e, None)))
            .transpose()
    };

    let (_, title) = next_line()?
        .ok_or_else(|| Error::inconsistent_data(FORMAT, None, "empty coordinate file"))?;
    let (count_line_number, count_line) = next_line()?
        .ok_or_else(|| Error::inconsistent_data(FORMAT, None, "missing atom count line"))?;
    let n_atoms: usize = count_line
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::parse(FORMAT, None, count_line_number, "invalid atom count"))?;

    let mut coordinates = Vec::with_capacity(3 * n_atoms);
    while coordinates.len() < 3 * n_atoms {
        let (number, line) = next_line()?.ok_or_else(|| {
            Error::inconsistent_data(
                FORMAT,
                None,
                format!("expected {} coordinates, found {}", 3 * n_atoms, coordinates.len()),
            )
        })?;
        coordinates.extend(fixed_fields(&line, number)?);
    }
    if coordinates.len() != 3 * n_atoms {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            "coordinate block does not end on an atom boundary",
        ));
    }

    let mut trailing = Vec::new();
    while let Some((number, line)) = next_line()? {
        if !line.trim().is_empty() {
            trailing.push(fixed_fields(&line, number)?);
        }
    }
    let box_dimensions = match trailing.as_slice() {
        [] => None,
        [dimensions] if dimensions.len() == 6 => {
            let mut values = [0.0; 6];
            values.copy_from_slice(dimensions);
            Some(values)
        }
        [dimensions] if dimensions.len() == 3 => {
            Some([dimensions[0], dimensions[1], dimensions[2], 90.0, 90.0, 90.0])
        }
        _ => {
            return Err(Error::inconsistent_data(
                FORMAT,
                None,
                "unexpected data after the coordinate block",
            ));
        }
    };

    let positions = coordinates
        .chunks_exact(3)
        .map(|c| Point::new(c[0], c[1], c[2]))
        .collect();

    Ok(CoordinateFile {
        title: title.trim().to_string(),
        positions,
        box_dimensions,
    })
}

fn fixed_fields(line: &str, line_number: usize) -> Result<Vec<f64>, Error> {
    let trimmed = line.trim_end();
    let mut values = Vec::new();
    let mut start = 0;
    while start < trimmed.len() {
        let end = (start + FIELD_WIDTH).min(trimmed.len());
        let field = trimmed
            .get(start..end)
            .ok_or_else(|| Error::parse(FORMAT, None, line_number, "non-ASCII coordinate field"))?;
        let value = field.trim().parse::<f64>().map_err(|_| {
            Error::parse(FORMAT, None, line_number, format!("invalid coordinate '{}'", field.trim()))
        })?;
        values.push(value);
        start = end;
    }
    Ok(values)
}

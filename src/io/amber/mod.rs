//! Shared plumbing for AMBER's fixed-width Fortran layouts.

pub mod inpcrd;
pub mod prmtop;

use crate::io::error::Error;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// Column layout of a `%FLAG` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    /// `20a4`
    Text,
    /// `10I8`
    Integer,
    /// `5E16.8`
    Real,
}

impl Column {
    pub(crate) fn per_line(self) -> usize {
        match self {
            Column::Text => 20,
            Column::Integer => 10,
            Column::Real => 5,
        }
    }

    pub(crate) fn width(self) -> usize {
        match self {
            Column::Text => 4,
            Column::Integer => 8,
            Column::Real => 16,
        }
    }

    pub(crate) fn format_spec(self) -> &'static str {
        match self {
            Column::Text => "(20a4)",
            Column::Integer => "(10I8)",
            Column::Real => "(5E16.8)",
        }
    }
}

/// Renders `value` as Fortran `E16.8`, e.g. `  3.20000000E+02`.
pub(crate) fn fortran_real(value: f64) -> String {
    let rendered = format!("{value:.8E}");
    let (mantissa, exponent) = rendered.split_once('E').unwrap_or((rendered.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{:>16}", format!("{mantissa}E{sign}{:02}", exponent.abs()))
}

/// Writes one `%FLAG` section, wrapping values at the column's line length.
pub(crate) fn write_section<W: Write>(
    writer: &mut W,
    flag: &str,
    column: Column,
    values: &[String],
) -> Result<(), Error> {
    let io = |e: std::io::Error| Error::from_io(e, None);

    writeln!(writer, "%FLAG {flag:<74}").map_err(io)?;
    writeln!(writer, "%FORMAT{}", column.format_spec()).map_err(io)?;
    if values.is_empty() {
        writeln!(writer).map_err(io)?;
    }
    for chunk in values.chunks(column.per_line()) {
        writeln!(writer, "{}", chunk.concat()).map_err(io)?;
    }
    Ok(())
}

pub(crate) fn integers(values: impl IntoIterator<Item = i64>) -> Vec<String> {
    values.into_iter().map(|v| format!("{v:8}")).collect()
}

pub(crate) fn reals(values: impl IntoIterator<Item = f64>) -> Vec<String> {
    values.into_iter().map(fortran_real).collect()
}

pub(crate) fn labels<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| format!("{:<4}", v.get(..4).unwrap_or(v)))
        .collect()
}

/// Raw `%FLAG` sections of a prmtop stream, keyed by flag name.
pub(crate) struct Sections {
    title_fallback: String,
    sections: HashMap<String, (usize, Vec<String>)>,
}

impl Sections {
    pub(crate) fn read<R: BufRead>(reader: R, format: &'static str) -> Result<Self, Error> {
        let mut sections = HashMap::new();
        let mut current: Option<(String, usize, Vec<String>)> = None;
        let mut title_fallback = String::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::from_io(e, None))?;

            if let Some(flag) = line.strip_prefix("%FLAG") {
                if let Some((name, start, lines)) = current.take() {
                    sections.insert(name, (start, lines));
                }
                current = Some((flag.trim().to_string(), idx + 2, Vec::new()));
            } else if line.starts_with("%FORMAT") {
                if let Some((_, start, _)) = current.as_mut() {
                    *start = idx + 2;
                }
            } else if line.starts_with('%') {
                continue;
            } else if let Some((_, _, lines)) = current.as_mut() {
                lines.push(line);
            } else if title_fallback.is_empty() {
                title_fallback = line.trim().to_string();
            }
        }
        if let Some((name, start, lines)) = current {
            sections.insert(name, (start, lines));
        }

        if sections.is_empty() {
            return Err(Error::parse(format, None, 1, "no %FLAG sections found"));
        }
        Ok(Self {
            title_fallback,
            sections,
        })
    }

    pub(crate) fn has(&self, flag: &str) -> bool {
        self.sections.contains_key(flag)
    }

    fn lines(&self, flag: &str, format: &'static str) -> Result<&(usize, Vec<String>), Error> {
        self.sections.get(flag).ok_or_else(|| {
            Error::inconsistent_data(format, None, format!("missing %FLAG {flag} section"))
        })
    }

    pub(crate) fn title(&self) -> String {
        self.sections
            .get("TITLE")
            .and_then(|(_, lines)| lines.first())
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| self.title_fallback.clone())
    }

    pub(crate) fn integers(&self, flag: &str, format: &'static str) -> Result<Vec<i64>, Error> {
        let (start, lines) = self.lines(flag, format)?;
        let mut values = Vec::new();
        for (offset, line) in lines.iter().enumerate() {
            for word in line.split_whitespace() {
                let value = word.parse::<i64>().map_err(|_| {
                    Error::parse(format, None, start + offset, format!("invalid integer in {flag}"))
                })?;
                values.push(value);
            }
        }
        Ok(values)
    }

    pub(crate) fn reals(&self, flag: &str, format: &'static str) -> Result<Vec<f64>, Error> {
        let (start, lines) = self.lines(flag, format)?;
        let mut values = Vec::new();
        for (offset, line) in lines.iter().enumerate() {
            for word in line.split_whitespace() {
                let value = word.parse::<f64>().map_err(|_| {
                    Error::parse(format, None, start + offset, format!("invalid real in {flag}"))
                })?;
                values.push(value);
            }
        }
        Ok(values)
    }

    pub(crate) fn labels(&self, flag: &str, format: &'static str) -> Result<Vec<String>, Error> {
        let (_, lines) = self.lines(flag, format)?;
        let width = Column::Text.width();
        let mut values = Vec::new();
        for line in lines {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(width) {
                let label: String = chunk.iter().collect();
                let label = label.trim();
                if !label.is_empty() {
                    values.push(label.to_string());
                }
            }
        }
        Ok(values)
    }
}

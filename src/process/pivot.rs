// src/process/pivot.rs

use std::{
    collections::{BTreeMap, BTreeSet},
    io::{self, Write},
};

use super::records::Record;
use crate::error::TransformError;

/// Cell text for a year without a measurement.
pub const NULL_TOKEN: &str = "null";

/// Column separator of the report.
pub const SEPARATOR: char = ';';

/// One (country, year, value) measurement. An empty `value` means no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub country: String,
    pub year: u32,
    pub value: String,
}

impl Observation {
    /// Pull an observation out of the `index`-th record of a data document.
    pub fn from_record(index: usize, record: &Record) -> Result<Self, TransformError> {
        let field = |name: &str| {
            record.text(name).ok_or_else(|| TransformError::Structure {
                record: index,
                reason: format!("missing `{name}`"),
            })
        };

        let country = field("country")?.to_string();
        let date = field("date")?;
        let year = date.trim().parse().map_err(|_| TransformError::Structure {
            record: index,
            reason: format!("`date` is not a year: {date:?}"),
        })?;
        let value = field("value")?.to_string();

        Ok(Self {
            country,
            year,
            value,
        })
    }
}

/// `""` becomes `null`, every `.` becomes `,`. Nothing else is checked.
pub fn format_value(raw: &str) -> String {
    if raw.is_empty() {
        NULL_TOKEN.to_string()
    } else {
        raw.replace('.', ",")
    }
}

/// Country × year matrix of formatted cells. Rows and years iterate in
/// ascending key order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PivotTable {
    rows: BTreeMap<String, BTreeMap<u32, String>>,
}

impl PivotTable {
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut rows: BTreeMap<String, BTreeMap<u32, String>> = BTreeMap::new();
        for obs in observations {
            rows.entry(obs.country)
                .or_default()
                .insert(obs.year, format_value(&obs.value));
        }
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every year seen in any row; these are the report's columns.
    pub fn years(&self) -> BTreeSet<u32> {
        self.rows.values().flat_map(|r| r.keys().copied()).collect()
    }

    pub fn cell(&self, country: &str, year: u32) -> Option<&str> {
        self.rows.get(country)?.get(&year).map(String::as_str)
    }

    /// Write the header line and one line per country. Cells are matched to
    /// columns by year; a country without a value for a year gets `null`.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        let years = self.years();

        write!(out, "Countries{SEPARATOR}")?;
        for year in &years {
            write!(out, "{year}{SEPARATOR}")?;
        }
        writeln!(out)?;

        for (country, cells) in &self.rows {
            write!(out, "{country}{SEPARATOR}")?;
            for year in &years {
                let cell = cells.get(year).map(String::as_str).unwrap_or(NULL_TOKEN);
                write!(out, "{cell}{SEPARATOR}")?;
            }
            writeln!(out)?;
        }

        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(country: &str, year: u32, value: &str) -> Observation {
        Observation {
            country: country.to_string(),
            year,
            value: value.to_string(),
        }
    }

    fn render(table: &PivotTable) -> String {
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn formats_cells() {
        assert_eq!(format_value(""), "null");
        assert_eq!(format_value("1.5"), "1,5");
        assert_eq!(format_value("1.2.3"), "1,2,3");
        assert_eq!(format_value("n/a"), "n/a");
    }

    #[test]
    fn renders_full_grid() {
        let table = PivotTable::from_observations([
            obs("A", 2000, "1.5"),
            obs("A", 2001, ""),
            obs("B", 2000, "3.0"),
            obs("B", 2001, "2.25"),
        ]);
        assert_eq!(
            render(&table),
            "Countries;2000;2001;\nA;1,5;null;\nB;3,0;2,25;\n"
        );
    }

    #[test]
    fn short_rows_stay_aligned_by_year() {
        let table = PivotTable::from_observations([
            obs("A", 2000, "1"),
            obs("A", 2001, "2"),
            obs("B", 2001, "4"),
            obs("C", 2002, "5"),
        ]);
        assert_eq!(
            render(&table),
            "Countries;2000;2001;2002;\nA;1;2;null;\nB;null;4;null;\nC;null;null;5;\n"
        );
    }

    #[test]
    fn rows_and_years_are_sorted() {
        // the API lists the newest year first
        let table = PivotTable::from_observations([
            obs("Zambia", 2001, "2"),
            obs("Zambia", 2000, "1"),
            obs("Albania", 2001, "4"),
            obs("Albania", 2000, "3"),
        ]);
        assert_eq!(
            render(&table),
            "Countries;2000;2001;\nAlbania;3;4;\nZambia;1;2;\n"
        );
    }

    #[test]
    fn later_observation_wins() {
        let table = PivotTable::from_observations([obs("A", 2000, "1"), obs("A", 2000, "2")]);
        assert_eq!(table.cell("A", 2000), Some("2"));
    }

    #[test]
    fn empty_table_has_only_header() {
        let table = PivotTable::default();
        assert!(table.is_empty());
        assert_eq!(render(&table), "Countries;\n");
    }
}

use std::io;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::linelist::parse_loose_date;


pub fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
	headers.iter().position(|h| h == name).ok_or_else(|| Error::MissingColumn(name.into()))
}

pub fn optional_column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
	names.iter().find_map(|name| headers.iter().position(|h| h == *name))
}

/// Missing values (including non-finite ones) are written as empty cells.
pub fn format_value(v: f64) -> String {
	if v.is_finite() {
		format!("{}", v)
	} else {
		String::new()
	}
}

pub fn format_opt(v: Option<f64>) -> String {
	v.map(format_value).unwrap_or_default()
}

pub fn parse_value(s: &str) -> Option<f64> {
	let s = s.trim();
	if s.len() == 0 {
		return None
	}
	s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn parse_date_cell(s: &str) -> Result<NaiveDate> {
	parse_loose_date(s).ok_or_else(|| Error::InvalidDate(s.into()))
}


/// A header plus rows of pre-formatted cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new(headers: Vec<String>) -> Self {
		Self{
			headers,
			rows: Vec::new(),
		}
	}

	pub fn push(&mut self, row: Vec<String>) {
		assert_eq!(row.len(), self.headers.len());
		self.rows.push(row);
	}

	/// Append all rows of `other`, which must share the header.
	pub fn extend(&mut self, other: Table) {
		assert_eq!(self.headers, other.headers);
		self.rows.extend(other.rows);
	}

	pub fn column(&self, name: &str) -> Option<Vec<&str>> {
		let index = self.headers.iter().position(|h| h == name)?;
		Some(self.rows.iter().map(|r| r[index].as_str()).collect())
	}

	pub fn write<W: io::Write>(&self, w: W) -> Result<()> {
		let mut w = csv::Writer::from_writer(w);
		w.write_record(&self.headers)?;
		for row in self.rows.iter() {
			w.write_record(row)?;
		}
		w.flush()?;
		Ok(())
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_values_are_empty_cells() {
		assert_eq!(format_value(1.5), "1.5");
		assert_eq!(format_value(3.), "3");
		assert_eq!(format_value(f64::NAN), "");
		assert_eq!(format_value(f64::INFINITY), "");
		assert_eq!(format_opt(None), "");
		assert_eq!(parse_value(""), None);
		assert_eq!(parse_value("NaN"), None);
		assert_eq!(parse_value(" 2.5 "), Some(2.5));
	}

	#[test]
	fn table_writes_csv() {
		let mut t = Table::new(vec!["a".into(), "b".into()]);
		t.push(vec!["1".into(), "x y".into()]);
		let mut out = Vec::new();
		t.write(&mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,x y\n");
		assert_eq!(t.column("b"), Some(vec!["x y"]));
		assert_eq!(t.column("c"), None);
	}
}

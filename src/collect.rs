use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::linelist::parse_loose_date;
use crate::progress::{ProgressSink, StepMeter};
use crate::table::Table;


pub const DEFAULT_COLLECT_LAST: usize = 120;
pub static DUMP_PREFIX: &'static str = "covid_sum";

pub static DUMP_COLUMNS: [&'static str; 7] = [
	"Export Date",
	"Date of Diagnosis",
	"Admission Date",
	"Date of ICU Admission",
	"Date of Death",
	"District",
	"Subdistrict",
];


fn is_dump(name: &str) -> bool {
	name.starts_with(DUMP_PREFIX) && (name.ends_with(".txt") || name.ends_with(".txt.gz"))
}

/// The `last` daily dumps in `dir`, oldest first.
pub fn select_dumps<P: AsRef<Path>>(dir: P, last: usize) -> io::Result<Vec<PathBuf>> {
	let mut paths = Vec::new();
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let name = entry.file_name();
		match name.to_str() {
			Some(n) if is_dump(n) => paths.push(entry.path()),
			_ => (),
		}
	}
	paths.sort();
	let skip = paths.len().saturating_sub(last);
	Ok(paths.split_off(skip))
}

// dumps are latin-1
fn decode(field: &[u8]) -> String {
	field.iter().map(|b| *b as char).collect()
}

/// Read the relevant columns of one tab separated dump. Returns `None` for a
/// dump without any content.
pub fn read_dump<R: io::Read>(r: R) -> Result<Option<Vec<Vec<String>>>> {
	let mut r = csv::ReaderBuilder::new()
		.delimiter(b'\t')
		.flexible(true)
		.from_reader(r);
	let headers: Vec<String> = r.byte_headers()?.iter().map(decode).collect();
	if headers.iter().all(|h| h.trim().len() == 0) {
		return Ok(None)
	}
	let mut indices = Vec::with_capacity(DUMP_COLUMNS.len());
	for name in DUMP_COLUMNS.iter() {
		match headers.iter().position(|h| h.as_str() == *name) {
			Some(i) => indices.push(i),
			None => return Err(Error::MissingColumn((*name).into())),
		}
	}

	let mut rows = Vec::new();
	for row in r.byte_records() {
		let row = row?;
		rows.push(indices.iter().map(|i| row.get(*i).map(decode).unwrap_or_default()).collect());
	}
	Ok(Some(rows))
}

/// Concatenate dumps into one line list sorted by export date, keeping the
/// order of rows within an export.
pub fn collect_dumps<S, R, I>(s: &mut S, dumps: I) -> Result<Table>
	where S: ProgressSink + ?Sized,
		R: io::Read,
		I: IntoIterator<Item = (String, R)>,
{
	let dumps: Vec<(String, R)> = dumps.into_iter().collect();
	let mut pm = StepMeter::new(s, dumps.len());
	let mut rows: Vec<(chrono::NaiveDate, Vec<String>)> = Vec::new();
	for (i, (name, r)) in dumps.into_iter().enumerate() {
		match read_dump(r)? {
			Some(dump) => {
				info!("{}: {} rows", name, dump.len());
				for mut row in dump {
					let export = parse_loose_date(&row[0]).ok_or_else(|| Error::InvalidDate(row[0].clone()))?;
					row[0] = export.to_string();
					rows.push((export, row));
				}
			},
			None => warn!("{} is empty, skipping", name),
		}
		pm.update(i+1);
	}
	pm.finish();

	if rows.len() == 0 {
		return Err(Error::EmptyInput("no line list rows collected".into()))
	}
	rows.sort_by_key(|(export, _)| *export);

	let mut table = Table::new(DUMP_COLUMNS.iter().map(|c| c.replace(" ", ".")).collect());
	for (_, row) in rows {
		table.push(row);
	}
	Ok(table)
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::progress::LogSink;

	const HEADER: &'static str = "Export Date\tDate of Diagnosis\tAdmission Date\tDate of ICU Admission\tDate of Death\tDistrict\tSubdistrict\tAgegroup\n";

	#[test]
	fn reads_selected_columns() {
		let data = format!("{}Jun  2 2020 10:00AM\t2020-06-01\t\t\t\tOverberg\tOverberg - Swellendam\t30 - 35\n", HEADER);
		let rows = read_dump(data.as_bytes()).unwrap().unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].len(), 7);
		assert_eq!(rows[0][5], "Overberg");
	}

	#[test]
	fn empty_dump_is_none() {
		assert!(read_dump(&b""[..]).unwrap().is_none());
	}

	#[test]
	fn missing_column_is_an_error() {
		match read_dump(&b"Export Date\tDistrict\nx\ty\n"[..]) {
			Err(Error::MissingColumn(c)) => assert_eq!(c, "Date of Diagnosis"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn latin1_is_decoded() {
		let mut data = HEADER.as_bytes().to_vec();
		data.extend_from_slice(b"2020-06-02\t\t\t\t\tKaroo\tPrince Albert \xe9\t\n");
		let rows = read_dump(&data[..]).unwrap().unwrap();
		assert_eq!(rows[0][6], "Prince Albert \u{e9}");
	}

	#[test]
	fn collect_sorts_by_export_and_renames() {
		let newer = format!("{}2020-06-03\t2020-06-01\t\t\t\tA\tA - x\t\n2020-06-03\t2020-06-02\t\t\t\tB\tB - y\t\n", HEADER);
		let older = format!("{}Jun  2 2020 10:00AM\t2020-06-01\t\t\t\tA\tA - x\t\n", HEADER);
		let dumps = vec![
			("b".to_string(), newer.as_bytes()),
			("empty".to_string(), &b""[..]),
			("a".to_string(), older.as_bytes()),
		];
		let t = collect_dumps(&mut LogSink, dumps).unwrap();
		assert_eq!(t.headers[0], "Export.Date");
		assert_eq!(t.headers[3], "Date.of.ICU.Admission");
		assert_eq!(t.rows.len(), 3);
		assert_eq!(t.rows[0][0], "2020-06-02");
		assert_eq!(t.rows[1][1], "2020-06-01");
		assert_eq!(t.rows[2][1], "2020-06-02");
	}

	#[test]
	fn collect_fails_without_rows() {
		let dumps = vec![("empty".to_string(), &b""[..])];
		assert!(collect_dumps(&mut LogSink, dumps).is_err());
	}

	#[test]
	fn dump_names() {
		assert!(is_dump("covid_sum_20200601.txt"));
		assert!(is_dump("covid_sum_20200601.txt.gz"));
		assert!(!is_dump("other.txt"));
	}
}

mod adjust;
mod collect;
mod config;
mod demographics;
mod error;
mod growth;
mod ioutil;
mod lags;
mod linelist;
mod progress;
mod service;
mod table;
mod timeseries;

pub use adjust::*;
pub use collect::*;
pub use config::*;
pub use demographics::*;
pub use error::{Error, Result};
pub use growth::*;
pub use ioutil::{magic_create, magic_open};
pub use lags::*;
pub use linelist::*;
pub use progress::*;
pub use service::*;
pub use table::*;
pub use timeseries::*;


/// Load a line list with its region labels as exported.
pub fn load_raw_linelist<P: AsRef<std::path::Path>, S: ProgressSink + ?Sized>(
	s: &mut S,
	path: P,
) -> Result<Vec<LinelistRecord>> {
	let path = path.as_ref();
	log::info!("loading line list from {}", path.display());
	let r = magic_open(path)?;
	let records = load_linelist(s, r)?;
	if records.len() == 0 {
		return Err(Error::EmptyInput(path.display().to_string()))
	}
	Ok(records)
}

/// Load a line list and repair its region labels.
pub fn load_normalized_linelist<P: AsRef<std::path::Path>, S: ProgressSink + ?Sized>(
	s: &mut S,
	path: P,
) -> Result<Vec<LinelistRecord>> {
	let mut records = load_raw_linelist(s, path)?;
	normalize_regions(&mut records);
	Ok(records)
}

/// Write a table as CSV; `-` is stdout.
pub fn write_table<P: AsRef<std::path::Path>>(path: P, table: &Table) -> Result<()> {
	let path = path.as_ref();
	log::info!("writing {} rows to {}", table.rows.len(), path.display());
	let w = magic_create(path)?;
	table.write(w)
}

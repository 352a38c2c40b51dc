//! Lag adjustment of recent counts.
//!
//! A raw count observed `lag` days after the event is divided by the median
//! completeness of that lag day, as estimated by [`crate::lags`].

use std::collections::BTreeMap;
use std::io;

use smartstring::alias::{String as SmartString};

use enum_map::EnumMap;

use chrono::{Duration, NaiveDate};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::linelist::{latest_export, EventKind, LinelistRecord, EXPORT_DATE_COLUMN, UNALLOCATED};
use crate::table::{column_index, format_opt, format_value, optional_column_index, parse_value, Table};


#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagCorrection {
	medians: BTreeMap<i64, f64>,
}

impl LagCorrection {
	pub fn from_pairs<I: IntoIterator<Item = (i64, f64)>>(pairs: I) -> Result<Self> {
		let mut medians = BTreeMap::new();
		for (lag, median) in pairs {
			if medians.insert(lag, median).is_some() {
				return Err(Error::DuplicateKey(format!("lag day {}", lag)))
			}
		}
		Ok(Self{medians})
	}

	/// Read a lag table as written by `spv_reporting_lags`.
	///
	/// The lag column may be called `lag_days` or `lag_day`. If the table has a
	/// `lag_type` column and `kind` is given, only that kind's rows are used;
	/// rows belonging to a district or subdistrict are ignored.
	pub fn load<R: io::Read>(r: R, kind: Option<EventKind>) -> Result<Self> {
		let mut r = csv::Reader::from_reader(r);
		let headers = r.headers()?.clone();
		let lag_index = optional_column_index(&headers, &["lag_days", "lag_day"])
			.ok_or_else(|| Error::MissingColumn("lag_days".into()))?;
		let median_index = column_index(&headers, "median")?;
		let type_index = optional_column_index(&headers, &["lag_type"]);
		let region_indices: Vec<usize> = ["District", "Subdistrict"].iter()
			.filter_map(|name| optional_column_index(&headers, &[*name]))
			.collect();

		let mut pairs = Vec::new();
		for row in r.records() {
			let row = row?;
			if let (Some(kind), Some(type_index)) = (kind, type_index) {
				if &row[type_index] != kind.column() {
					continue
				}
			}
			if region_indices.iter().any(|i| row[*i].trim().len() > 0) {
				continue
			}
			let lag = match parse_value(&row[lag_index]) {
				Some(v) => v as i64,
				None => continue,
			};
			let median = match parse_value(&row[median_index]) {
				Some(v) => v,
				None => continue,
			};
			pairs.push((lag, median));
		}
		if pairs.len() == 0 {
			warn!("lag table has no usable rows for {:?}, counts will not be adjusted", kind);
		}
		Self::from_pairs(pairs)
	}

	pub fn len(&self) -> usize {
		self.medians.len()
	}

	/// The median completeness for `lag`, or 1 where there is nothing usable.
	pub fn divisor(&self, lag: i64) -> f64 {
		match self.medians.get(&lag) {
			Some(v) if v.is_finite() && *v > 0. => *v,
			_ => 1.,
		}
	}

	pub fn adjust(&self, count: f64, lag: i64) -> f64 {
		count / self.divisor(lag)
	}
}


pub type LagCorrections = EnumMap<EventKind, LagCorrection>;


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedDay {
	pub date: NaiveDate,
	pub count: Option<u64>,
	pub adjusted: Option<f64>,
}

/// Daily counts of `kind` in the latest export, from `start` through the
/// export date and with the lag measured against it. Records of earlier
/// exports are ignored.
pub fn daily_adjusted(
		records: &[LinelistRecord],
		kind: EventKind,
		correction: &LagCorrection,
		start: NaiveDate,
) -> Vec<AdjustedDay> {
	let latest = match latest_export(records) {
		Some(d) if d >= start => d,
		_ => return Vec::new(),
	};
	let ndays = (latest - start).num_days() as usize + 1;
	let mut counts = vec![0u64; ndays];
	for rec in records.iter().filter(|r| r.export_date == latest) {
		let date = match rec.event_date(kind) {
			Some(d) if d >= start && d <= latest => d,
			_ => continue,
		};
		counts[(date - start).num_days() as usize] += 1;
	}

	counts.into_iter().enumerate().map(|(i, count)| {
		let date = start + Duration::days(i as i64);
		if count == 0 {
			return AdjustedDay{date, count: None, adjusted: None}
		}
		let lag = (latest - date).num_days();
		AdjustedDay{
			date,
			count: Some(count),
			adjusted: Some(correction.adjust(count as f64, lag)),
		}
	}).collect()
}

/// All four event kinds side by side, one row per day.
pub fn adjusted_table(
		records: &[LinelistRecord],
		corrections: &LagCorrections,
		start: NaiveDate,
) -> Result<Table> {
	let latest = latest_export(records)
		.ok_or_else(|| Error::EmptyInput("line list".into()))?;
	debug!("latest export date is {}", latest);

	let mut headers = vec!["Date".to_string()];
	for kind in EventKind::ALL.iter() {
		headers.push(format!("{}_Count", kind.label()));
		headers.push(format!("{}_AdjustedCount", kind.label()));
	}
	let mut table = Table::new(headers);

	let per_kind: Vec<Vec<AdjustedDay>> = EventKind::ALL.iter()
		.map(|kind| daily_adjusted(records, *kind, &corrections[*kind], start))
		.collect();
	let ndays = per_kind.first().map(|v| v.len()).unwrap_or(0);
	for i in 0..ndays {
		let mut row = vec![per_kind[0][i].date.to_string()];
		for days in per_kind.iter() {
			row.push(days[i].count.map(|c| c.to_string()).unwrap_or_default());
			row.push(format_opt(days[i].adjusted));
		}
		table.push(row);
	}
	Ok(table)
}


pub static CT_CITY_PREFIX: &'static str = "City of Cape Town - ";
pub static CT_METRO_LABEL: &'static str = "CT_Metro";
pub static NON_METRO_LABEL: &'static str = "Non_Metro_(WC)";
pub static METRO_SUBDISTRICTS: [&'static str; 8] = [
	"Northern",
	"Southern",
	"Eastern",
	"Western",
	"Mitchells Plain",
	"Tygerberg",
	"Khayelitsha",
	"Klipfontein",
];

pub fn column_label(region: &str) -> String {
	region.replace(" ", "_")
}

pub fn adjusted_label(region: &str) -> String {
	format!("{}_(lag_adjusted)", column_label(region))
}

type PivotKey = (NaiveDate, NaiveDate, i64);

/// Lag-adjusted counts for the metro, its subdistricts and the rest of the
/// province.
#[derive(Debug, Clone, PartialEq)]
pub struct MetroTables {
	pub metro: Table,
	pub subdistricts: Table,
}

/// Count `kind` events per `(export, date, lag_day)` for each metro
/// subdistrict, the metro as a whole and the non-metro remainder, and add
/// the lag-adjusted twin of every count column.
///
/// Records without a subdistrict cannot be placed and are dropped, as are
/// subdistricts labelled unallocated by [`crate::normalize_regions`].
pub fn metro_tables(
		records: &[LinelistRecord],
		kind: EventKind,
		correction: &LagCorrection,
) -> Result<MetroTables> {
	let mut cells: BTreeMap<PivotKey, BTreeMap<SmartString, u64>> = BTreeMap::new();
	let mut seen_metro = false;
	let mut seen_non_metro = false;
	for rec in records {
		let date = match rec.event_date(kind) {
			Some(d) => d,
			None => continue,
		};
		let subdistrict = match rec.subdistrict.as_deref() {
			Some(s) => s.trim_start_matches(CT_CITY_PREFIX),
			None => continue,
		};
		if subdistrict.trim().len() == 0 || subdistrict == UNALLOCATED {
			continue
		}
		let lag = (rec.export_date - date).num_days();
		let row = cells.entry((rec.export_date, date, lag)).or_default();
		if METRO_SUBDISTRICTS.contains(&subdistrict) {
			seen_metro = true;
			*row.entry(subdistrict.into()).or_insert(0) += 1;
			*row.entry(CT_METRO_LABEL.into()).or_insert(0) += 1;
		} else {
			seen_non_metro = true;
			*row.entry(NON_METRO_LABEL.into()).or_insert(0) += 1;
		}
	}
	if !seen_non_metro {
		return Err(Error::EmptyInput(format!("no {} records outside of the metro", kind)))
	}
	if !seen_metro {
		return Err(Error::EmptyInput(format!("no {} records inside the metro", kind)))
	}

	let key_headers = || vec![EXPORT_DATE_COLUMN.to_string(), "Date".to_string(), "lag_day".to_string()];
	let metro_regions = [CT_METRO_LABEL, NON_METRO_LABEL];

	let mut metro_headers = key_headers();
	metro_headers.extend(metro_regions.iter().map(|r| column_label(r)));
	metro_headers.extend(metro_regions.iter().map(|r| adjusted_label(r)));
	let mut subd_headers = key_headers();
	subd_headers.extend(METRO_SUBDISTRICTS.iter().map(|r| column_label(r)));
	subd_headers.extend(METRO_SUBDISTRICTS.iter().map(|r| adjusted_label(r)));

	let mut metro = Table::new(metro_headers);
	let mut subdistricts = Table::new(subd_headers);
	debug!("pivoting {} rows of {}", cells.len(), kind);

	for ((export, date, lag), row) in cells.iter() {
		let key_cells = vec![export.to_string(), date.to_string(), lag.to_string()];
		let count = |region: &str| row.get(region).copied().unwrap_or(0) as f64;

		let mut metro_row = key_cells.clone();
		metro_row.extend(metro_regions.iter().map(|r| format_value(count(*r))));
		metro_row.extend(metro_regions.iter().map(|r| format_value(correction.adjust(count(*r), *lag))));
		metro.push(metro_row);

		let mut subd_row = key_cells;
		subd_row.extend(METRO_SUBDISTRICTS.iter().map(|r| format_value(count(*r))));
		subd_row.extend(METRO_SUBDISTRICTS.iter().map(|r| format_value(correction.adjust(count(*r), *lag))));
		subdistricts.push(subd_row);
	}

	Ok(MetroTables{metro, subdistricts})
}

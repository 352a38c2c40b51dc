//! Growth rate, doubling time and week-on-week change of lag-adjusted counts.
use std::io;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use log::{debug, info, warn};

use crate::adjust::{adjusted_label, METRO_SUBDISTRICTS};
use crate::error::{Error, Result};
use crate::table::{column_index, format_opt, format_value, parse_date_cell, parse_value, Table};
use crate::timeseries::{finite, rolling_mean, rolling_sum, shift, FGauge};


pub const COMPARISON_WINDOW: usize = 7;
pub const ACTIVE_WINDOW: usize = 14;

/// Rows up to and including this date are ignored.
pub fn day_zero() -> NaiveDate {
	NaiveDate::from_ymd_opt(2020, 3, 27).unwrap()
}

// columns of the wide tables which are not regions
static KEY_COLUMNS: [&'static str; 3] = ["Export.Date", "Date", "lag_day"];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoublingMethod {
	Exact,
	Rule69,
	PadeApproximant,
	EmRule,
}

impl DoublingMethod {
	/// Doubling time in days for a growth `rate` given as a fraction per day.
	pub fn doubling_time(&self, rate: f64) -> f64 {
		let r = rate * 100.;
		match self {
			Self::Exact => std::f64::consts::LN_2 * 100. / r,
			Self::Rule69 => 69. / r,
			Self::PadeApproximant => (69.3 / r) * ((600. + 4. * r) / (600. + r)),
			Self::EmRule => 70. / (r * (198. / (200. - r))),
		}
	}
}


fn check_interval(days: i64) -> Result<()> {
	if days < 1 {
		return Err(Error::InvalidInterval(days))
	}
	Ok(())
}

/// Exponential growth (or decay) rate per day between two observations.
pub fn growth_rate(days: i64, y1: f64, y2: f64) -> Result<Option<f64>> {
	check_interval(days)?;
	if y1 == 0. {
		return Ok(None)
	}
	Ok(Some((y2 / y1).ln() / days as f64))
}

/// Weekly delta and doubling time.
pub fn doubling_time(days: i64, y1: f64, y2: f64, rate: Option<f64>) -> Result<(f64, Option<f64>)> {
	check_interval(days)?;
	let delta = y2 - y1;
	if y1 == 0. {
		return Ok((delta, None))
	}
	match rate {
		Some(r) if r != 0. => Ok((delta, finite(DoublingMethod::PadeApproximant.doubling_time(r)))),
		_ => Ok((delta, None)),
	}
}

/// Relative change of the 7-day rolling mean against its value `window` days
/// earlier.
pub fn percent_change(daily: &[f64], window: usize) -> Vec<f64> {
	let mean = rolling_mean(daily, COMPARISON_WINDOW);
	let prev = shift(&mean, window);
	mean.iter().zip(prev.iter()).map(|(m, p)| (m - p) / p).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChange {
	pub counts: Vec<f64>,
	pub change: Vec<f64>,
	pub relative: Vec<f64>,
}

/// Presumed active counts (the trailing 14 day sum) and their change from a
/// week earlier.
pub fn active_change(daily: &[f64]) -> ActiveChange {
	let counts = rolling_sum(daily, ACTIVE_WINDOW);
	let prev = shift(&counts, COMPARISON_WINDOW);
	let change: Vec<f64> = counts.iter().zip(prev.iter()).map(|(c, p)| c - p).collect();
	let relative = change.iter().zip(prev.iter()).map(|(c, p)| c / p).collect();
	ActiveChange{counts, change, relative}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLevel {
	District,
	Subdistrict,
}

impl RegionLevel {
	/// Metro subdistrict columns are reported as subdistricts, everything else
	/// as a district.
	pub fn of(region: &str) -> Self {
		if METRO_SUBDISTRICTS.iter().any(|s| adjusted_label(s) == region) {
			Self::Subdistrict
		} else {
			Self::District
		}
	}

	pub fn column(&self) -> &'static str {
		match self {
			Self::District => "District",
			Self::Subdistrict => "Subdistrict",
		}
	}
}


/// Read a wide table of daily counts (`Date` plus one column per region) into
/// a dense series starting the day after [`day_zero`].
///
/// Multiple rows for the same date are summed and days without a row count
/// as zero.
pub fn load_region_series<R: io::Read>(r: R) -> Result<FGauge<SmartString>> {
	let mut r = csv::Reader::from_reader(r);
	let headers = r.headers()?.clone();
	let date_index = column_index(&headers, "Date")?;
	let regions: Vec<(usize, SmartString)> = headers.iter().enumerate()
		.filter(|(_, h)| !KEY_COLUMNS.contains(h))
		.map(|(i, h)| (i, h.into()))
		.collect();

	let zero = day_zero();
	let mut rows = Vec::new();
	for row in r.records() {
		let row = row?;
		let date = parse_date_cell(&row[date_index])?;
		if date <= zero {
			continue
		}
		let values: Vec<f64> = regions.iter()
			.map(|(i, _)| parse_value(&row[*i]).unwrap_or(0.))
			.collect();
		rows.push((date, values));
	}

	let first = rows.iter().map(|(d, _)| *d).min()
		.ok_or_else(|| Error::EmptyInput(format!("no rows after {}", zero)))?;
	let last = rows.iter().map(|(d, _)| *d).max().unwrap_or(first);
	debug!("region series from {} to {} with {} regions", first, last, regions.len());

	let mut series = FGauge::<SmartString>::new(first, last.succ_opt().unwrap_or(last));
	for (_, name) in regions.iter() {
		series.get_index_or_create(name.clone());
	}
	for (date, values) in rows {
		let i = match series.date_index(date) {
			Some(i) => i,
			None => continue,
		};
		for ((_, name), v) in regions.iter().zip(values.into_iter()) {
			series.get_or_create(name.clone())[i] += v;
		}
	}
	Ok(series)
}


/// Growth statistics of one region column of `series`.
///
/// Values in row `i` describe the window ending at `i`, so the first
/// [`COMPARISON_WINDOW`] rows have no growth rate, doubling time or delta.
pub fn region_growth(
		series: &FGauge<SmartString>,
		region: &str,
		level: RegionLevel,
		with_active: bool,
) -> Result<Table> {
	let daily = series.get(&SmartString::from(region))
		.ok_or_else(|| Error::MissingRegion(region.into()))?;
	if daily.len() == 0 {
		return Err(Error::EmptyInput(format!("no values for {}", region)))
	}
	let dates: Vec<NaiveDate> = series.dates().collect();

	let mut cumulative = Vec::with_capacity(daily.len());
	let mut accum = 0.;
	for v in daily.iter() {
		accum += *v;
		cumulative.push(accum);
	}

	let n = daily.len();
	let mut rates = vec![None; n];
	let mut doubling = vec![None; n];
	let mut deltas = vec![None; n];
	let mut zero_starts = 0usize;
	for i in 0..n.saturating_sub(COMPARISON_WINDOW) {
		let j = i + COMPARISON_WINDOW;
		let days = (dates[j] - dates[i]).num_days();
		let (y1, y2) = (cumulative[i], cumulative[j]);
		let rate = growth_rate(days, y1, y2)?;
		if rate.is_none() {
			zero_starts += 1;
		}
		let (delta, dt) = doubling_time(days, y1, y2, rate)?;
		rates[j] = rate;
		doubling[j] = dt;
		deltas[j] = Some(delta);
	}
	if zero_starts > 0 {
		warn!("{}: initial value was zero for {} windows, growth rate left empty", region, zero_starts);
	}

	let pct = percent_change(daily, COMPARISON_WINDOW);
	let active = if with_active {
		Some(active_change(daily))
	} else {
		None
	};

	let mut headers: Vec<String> = vec![
		"Date",
		level.column(),
		"Cumulative_Values",
		"Daily_Values",
		"Growth_Decay_Rate",
		"Doubling_Time",
		"Weekly_Delta",
		"Relative_Weekly_Delta",
	].into_iter().map(|s| s.to_string()).collect();
	if with_active {
		headers.push("Presumed_Active_Counts".into());
		headers.push("Presumed_Active_Counts_Delta".into());
		headers.push("Relative_Presumed_Active_Counts_Delta".into());
	}

	let mut table = Table::new(headers);
	for i in 0..n {
		let mut row = vec![
			dates[i].to_string(),
			region.to_string(),
			format_value(cumulative[i]),
			format_value(daily[i]),
			format_opt(rates[i]),
			format_opt(doubling[i]),
			format_opt(deltas[i]),
			format_value(pct[i]),
		];
		if let Some(active) = active.as_ref() {
			row.push(format_value(active.counts[i]));
			row.push(format_value(active.change[i]));
			row.push(format_value(active.relative[i]));
		}
		table.push(row);
	}
	Ok(table)
}

/// [`region_growth`] for several regions of one table, stacked.
///
/// All regions must be on the same level, since the level names a column.
pub fn growth_table(
		series: &FGauge<SmartString>,
		regions: &[String],
		with_active: bool,
) -> Result<Table> {
	let mut result: Option<Table> = None;
	for region in regions {
		info!("computing growth statistics for {}", region);
		let table = region_growth(series, region, RegionLevel::of(region), with_active)?;
		match result.as_mut() {
			Some(acc) => acc.extend(table),
			None => result = Some(table),
		}
	}
	result.ok_or_else(|| Error::EmptyInput("no regions requested".into()))
}

pub fn metro_regions() -> Vec<String> {
	vec![
		adjusted_label(crate::adjust::CT_METRO_LABEL),
		adjusted_label(crate::adjust::NON_METRO_LABEL),
	]
}

pub fn subdistrict_regions() -> Vec<String> {
	METRO_SUBDISTRICTS.iter().map(|s| adjusted_label(s)).collect()
}


#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-9
	}

	#[test]
	fn doubling_methods() {
		let r = 0.1;
		assert!(close(DoublingMethod::Exact.doubling_time(r), std::f64::consts::LN_2 * 10.));
		assert!(close(DoublingMethod::Rule69.doubling_time(r), 6.9));
		assert!(close(DoublingMethod::PadeApproximant.doubling_time(r), 6.93 * 640. / 610.));
		assert!(close(DoublingMethod::EmRule.doubling_time(r), 70. / (10. * 198. / 190.)));
	}

	#[test]
	fn growth_rate_edge_cases() {
		assert_eq!(growth_rate(7, 0., 10.).unwrap(), None);
		assert!(close(growth_rate(7, 10., 20.).unwrap().unwrap(), 2f64.ln() / 7.));
		match growth_rate(0, 10., 20.) {
			Err(Error::InvalidInterval(0)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn doubling_time_edge_cases() {
		assert_eq!(doubling_time(7, 0., 5., None).unwrap(), (5., None));
		assert_eq!(doubling_time(7, 5., 5., Some(0.)).unwrap(), (0., None));
		let (delta, dt) = doubling_time(7, 10., 20., Some(0.1)).unwrap();
		assert_eq!(delta, 10.);
		assert!(close(dt.unwrap(), 6.93 * 640. / 610.));
		assert!(doubling_time(-1, 1., 2., None).is_err());
	}

	#[test]
	fn percent_change_compares_weekly_means() {
		let mut daily = vec![1.; 7];
		daily.extend(vec![2.; 7]);
		let pct = percent_change(&daily, 7);
		assert!(pct[12].is_nan());
		assert!(close(pct[13], 1.));
	}

	#[test]
	fn active_change_uses_fourteen_day_sum() {
		let daily = vec![1.; 21];
		let a = active_change(&daily);
		assert!(a.counts[12].is_nan());
		assert_eq!(a.counts[13], 14.);
		assert!(a.change[19].is_nan());
		assert_eq!(a.change[20], 0.);
		assert_eq!(a.relative[20], 0.);
	}

	#[test]
	fn region_levels() {
		assert_eq!(RegionLevel::of("Mitchells_Plain_(lag_adjusted)"), RegionLevel::Subdistrict);
		assert_eq!(RegionLevel::of("CT_Metro_(lag_adjusted)"), RegionLevel::District);
		assert_eq!(metro_regions()[1], "Non_Metro_(WC)_(lag_adjusted)");
	}

	#[test]
	fn load_sums_and_densifies() {
		let data = b"Export.Date,Date,lag_day,CT_Metro_(lag_adjusted)\n\
			2020-04-05,2020-03-27,9,100\n\
			2020-04-05,2020-03-28,8,1\n\
			2020-04-06,2020-03-28,9,2\n\
			2020-04-06,2020-03-30,7,4\n";
		let series = load_region_series(&data[..]).unwrap();
		assert_eq!(series.start(), NaiveDate::from_ymd_opt(2020, 3, 28).unwrap());
		assert_eq!(series.get(&"CT_Metro_(lag_adjusted)".into()), Some(&[3., 0., 4.][..]));
		assert_eq!(series.get(&"lag_day".into()), None);
	}

	#[test]
	fn region_growth_offsets_by_window() {
		let mut data = String::from("Date,CT_Metro_(lag_adjusted)\n");
		let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
		for i in 0..15 {
			data.push_str(&format!("{},{}\n", start + chrono::Duration::days(i), 1));
		}
		let series = load_region_series(data.as_bytes()).unwrap();
		let t = region_growth(&series, "CT_Metro_(lag_adjusted)", RegionLevel::District, true).unwrap();
		assert_eq!(t.headers.len(), 11);
		assert_eq!(t.headers[1], "District");
		assert_eq!(t.rows.len(), 15);
		assert_eq!(t.rows[6][4], "");
		assert_eq!(t.rows[6][2], "7");
		// cumulative 1 -> 8 over the first window
		let rate: f64 = t.rows[7][4].parse().unwrap();
		assert!(close(rate, 8f64.ln() / 7.));
		assert_eq!(t.rows[7][6], "7");
		assert_eq!(t.rows[13][7], "0");
		assert_eq!(t.rows[13][8], "14");
	}

	#[test]
	fn missing_region_is_an_error() {
		let data = b"Date,CT_Metro_(lag_adjusted)\n2020-04-01,1\n";
		let series = load_region_series(&data[..]).unwrap();
		match region_growth(&series, "Northern_(lag_adjusted)", RegionLevel::Subdistrict, false) {
			Err(Error::MissingRegion(r)) => assert_eq!(r, "Northern_(lag_adjusted)"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn growth_table_stacks_regions() {
		let data = b"Date,CT_Metro_(lag_adjusted),Non_Metro_(WC)_(lag_adjusted)\n2020-04-01,1,2\n2020-04-02,1,2\n";
		let series = load_region_series(&data[..]).unwrap();
		let t = growth_table(&series, &metro_regions(), false).unwrap();
		assert_eq!(t.rows.len(), 4);
		assert_eq!(t.rows[2][1], "Non_Metro_(WC)_(lag_adjusted)");
		assert_eq!(t.rows[3][2], "4");
	}
}

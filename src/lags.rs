use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use log::{debug, warn};

use crate::config::{env_date, env_usize};
use crate::error::Result;
use crate::linelist::{EventKind, LinelistRecord};
use crate::progress::{ProgressSink, StepMeter};
use crate::timeseries::{median, sample_stdev};


/// Knobs of the reporting-lag estimator.
#[derive(Debug, Clone, Copy)]
pub struct LagParams {
	/// Number of most recent event dates which feed the median of a lag day.
	pub window: usize,
	/// Event dates whose lag curve is shorter than this are incomplete.
	pub drop_last_days: i64,
	pub max_lag_days: i64,
	pub start: NaiveDate,
	pub today: NaiveDate,
}

impl LagParams {
	pub fn new(today: NaiveDate) -> Self {
		Self{
			window: 21,
			drop_last_days: 10,
			max_lag_days: 60,
			start: Self::default_start(),
			today,
		}
	}

	/// First event date considered.
	pub fn default_start() -> NaiveDate {
		NaiveDate::from_ymd_opt(2020, 4, 28).unwrap()
	}

	/// Defaults, overridden by `SPV_LAG_WINDOW`, `SPV_DROP_LAST_DAYS`,
	/// `SPV_MAX_LAG_DAYS` and `SPV_LAG_START`.
	pub fn from_env(today: NaiveDate) -> Result<Self> {
		let defaults = Self::new(today);
		Ok(Self{
			window: env_usize("SPV_LAG_WINDOW", defaults.window)?,
			drop_last_days: env_usize("SPV_DROP_LAST_DAYS", defaults.drop_last_days as usize)? as i64,
			max_lag_days: env_usize("SPV_MAX_LAG_DAYS", defaults.max_lag_days as usize)? as i64,
			start: env_date("SPV_LAG_START", defaults.start)?,
			today,
		})
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagObservation {
	pub event_date: NaiveDate,
	pub lag_days: i64,
}

/// One point of the completeness curve of a single event date.
#[derive(Debug, Clone, PartialEq)]
pub struct LagFrequency {
	pub event_date: NaiveDate,
	pub lag_days: i64,
	pub count: u64,
	pub freq: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LagSummary {
	pub lag_days: i64,
	pub median: f64,
	pub stdev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagTableRow {
	pub lag_days: i64,
	pub median: f64,
	pub stdev: Option<f64>,
	#[serde(rename = "District")]
	pub district: Option<SmartString>,
	#[serde(rename = "Subdistrict")]
	pub subdistrict: Option<SmartString>,
	pub lag_type: SmartString,
}


/// Lag observations of `kind` in the usable date range.
pub fn observations<'a, I: IntoIterator<Item = &'a LinelistRecord>>(
		records: I,
		kind: EventKind,
		params: &LagParams,
) -> Vec<LagObservation> {
	let mut result = Vec::new();
	for rec in records {
		let event_date = match rec.event_date(kind) {
			Some(d) => d,
			None => continue,
		};
		if event_date < params.start || event_date > params.today {
			continue
		}
		let lag_days = (rec.export_date - event_date).num_days();
		// zero or negative lags are events dated on or after their export
		if lag_days <= 0 {
			continue
		}
		result.push(LagObservation{event_date, lag_days});
	}
	result
}

/// Completeness curve per event date: the count seen at each lag day relative
/// to the count at the longest lag available for that date.
pub fn lag_frequencies(obs: &[LagObservation], params: &LagParams) -> Vec<LagFrequency> {
	let mut by_date: BTreeMap<NaiveDate, BTreeMap<i64, u64>> = BTreeMap::new();
	for o in obs {
		*by_date.entry(o.event_date).or_default().entry(o.lag_days).or_insert(0) += 1;
	}

	let mut result = Vec::new();
	for (event_date, counts) in by_date.into_iter().rev() {
		let max_lag = match counts.keys().next_back() {
			Some(v) => *v,
			None => continue,
		};
		if max_lag < params.drop_last_days {
			continue
		}
		let usable: Vec<(i64, u64)> = counts.into_iter()
			.filter(|(lag, _)| *lag <= params.max_lag_days)
			.collect();
		let last = match usable.last() {
			Some((_, c)) => *c as f64,
			None => {
				debug!("no lag days up to {} for {}", params.max_lag_days, event_date);
				continue
			},
		};
		for (lag_days, count) in usable {
			result.push(LagFrequency{
				event_date,
				lag_days,
				count,
				freq: count as f64 / last,
			});
		}
	}
	result
}

/// Median and spread of the completeness for each lag day over the `window`
/// most recent event dates.
pub fn lag_summary(freqs: &[LagFrequency], window: usize) -> Vec<LagSummary> {
	let mut by_lag: BTreeMap<i64, Vec<(NaiveDate, f64)>> = BTreeMap::new();
	for f in freqs {
		by_lag.entry(f.lag_days).or_default().push((f.event_date, f.freq));
	}

	let mut result = Vec::with_capacity(by_lag.len());
	for (lag_days, mut points) in by_lag.into_iter() {
		points.sort_by(|a, b| b.0.cmp(&a.0));
		let recent: Vec<f64> = points.iter().take(window).map(|(_, v)| *v).collect();
		let median = match median(&recent) {
			Some(v) => v,
			None => continue,
		};
		result.push(LagSummary{
			lag_days,
			median,
			stdev: sample_stdev(&recent),
		});
	}
	result
}

/// Full estimator for one set of records and one event kind.
pub fn estimate<'a, I: IntoIterator<Item = &'a LinelistRecord>>(
		records: I,
		kind: EventKind,
		params: &LagParams,
		scope: &str,
) -> Vec<LagSummary> {
	let obs = observations(records, kind, params);
	if obs.len() == 0 {
		warn!("no usable {} observations for {}, skipping", kind, scope);
		return Vec::new()
	}
	let freqs = lag_frequencies(&obs, params);
	if freqs.len() == 0 {
		warn!("no complete {} lag curves for {}, skipping", kind, scope);
		return Vec::new()
	}
	lag_summary(&freqs, params.window)
}


/// Lag tables at the three aggregation levels.
#[derive(Debug, Clone, Default)]
pub struct LagTables {
	pub province: Vec<LagTableRow>,
	pub districts: Vec<LagTableRow>,
	pub subdistricts: Vec<LagTableRow>,
}

fn push_rows(
		out: &mut Vec<LagTableRow>,
		summary: Vec<LagSummary>,
		kind: EventKind,
		district: Option<&SmartString>,
		subdistrict: Option<&SmartString>,
) {
	for s in summary {
		out.push(LagTableRow{
			lag_days: s.lag_days,
			median: s.median,
			stdev: s.stdev,
			district: district.cloned(),
			subdistrict: subdistrict.cloned(),
			lag_type: kind.column().into(),
		});
	}
}

pub fn write_lag_table<W: io::Write>(w: W, rows: &[LagTableRow]) -> Result<()> {
	let mut w = csv::Writer::from_writer(w);
	for row in rows {
		w.serialize(row)?;
	}
	w.flush()?;
	Ok(())
}

/// Run the estimator per subdistrict, per district and province-wide for
/// every event kind. Expects region labels to be normalized already.
pub fn lag_tables<S: ProgressSink + ?Sized>(
		s: &mut S,
		records: &[LinelistRecord],
		params: &LagParams,
) -> LagTables {
	let mut by_subdistrict: BTreeMap<(SmartString, SmartString), Vec<&LinelistRecord>> = BTreeMap::new();
	let mut by_district: BTreeMap<SmartString, Vec<&LinelistRecord>> = BTreeMap::new();
	for rec in records {
		by_subdistrict.entry((rec.district().into(), rec.subdistrict().into())).or_default().push(rec);
		by_district.entry(rec.district().into()).or_default().push(rec);
	}

	let mut tables = LagTables::default();
	let mut pm = StepMeter::new(s, by_subdistrict.len() + by_district.len() + 1);
	let mut step = 0;

	for ((district, subdistrict), recs) in by_subdistrict.iter() {
		debug!("estimating lags for {} : {}", district, subdistrict);
		for kind in EventKind::ALL.iter().copied() {
			let scope = format!("{} : {}", district, subdistrict);
			let summary = estimate(recs.iter().copied(), kind, params, &scope);
			push_rows(&mut tables.subdistricts, summary, kind, Some(district), Some(subdistrict));
		}
		step += 1;
		pm.update(step);
	}

	for (district, recs) in by_district.iter() {
		debug!("estimating lags for {}", district);
		for kind in EventKind::ALL.iter().copied() {
			let summary = estimate(recs.iter().copied(), kind, params, district);
			push_rows(&mut tables.districts, summary, kind, Some(district), None);
		}
		step += 1;
		pm.update(step);
	}

	for kind in EventKind::ALL.iter().copied() {
		let summary = estimate(records.iter(), kind, params, "province");
		push_rows(&mut tables.province, summary, kind, None, None);
	}
	pm.finish();

	tables
}

//! Rolling backlog and service standard metrics per department and request
//! code.
use std::collections::{BTreeMap, HashMap};
use std::io;

use serde::{Deserialize, Deserializer};

use smartstring::alias::{String as SmartString};

use enum_map::{Enum, EnumMap};

use chrono::{Duration, NaiveDate};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::linelist::parse_loose_date;
use crate::progress::{CountMeter, ProgressSink};
use crate::table::{format_opt, format_value, Table};


pub const RESOLUTION: f64 = 3.;
pub const ROLLING_DAYS: i64 = 180;
pub const MIN_PERIODS: usize = 90;
pub const LATEST_OFFSET_DAYS: i64 = 2;
pub static DEFAULT_COLOR: &'static str = "#bababa";

pub fn total_start() -> NaiveDate {
	NaiveDate::from_ymd_opt(2020, 10, 12).unwrap()
}

pub fn department_color(department: &str) -> &'static str {
	match department {
		"Electricity" => "#a6cee3",
		"Water and Sanitation" => "#1f78b4",
		"Solid Waste Management" => "#b2df8a",
		"Roads Infrastructure and Management" => "#33a02c",
		"Public Housing" => "#fb9a99",
		"Recreation and Parks" => "#e31a1c",
		_ => DEFAULT_COLOR,
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum Measure {
	ClosedCount,
	ClosedWithinTarget,
	OpenedCount,
}

impl Measure {
	pub const ALL: [Measure; 3] = [
		Measure::ClosedCount,
		Measure::ClosedWithinTarget,
		Measure::OpenedCount,
	];

	pub fn name(&self) -> &'static str {
		match self {
			Self::ClosedCount => "closed_count",
			Self::ClosedWithinTarget => "closed_within_target_sum",
			Self::OpenedCount => "opened_count",
		}
	}

	pub fn from_name(s: &str) -> Option<Self> {
		Self::ALL.iter().copied().find(|m| m.name() == s)
	}
}


fn fact_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	parse_loose_date(&s).ok_or_else(|| serde::de::Error::custom(format!("malformed fact date: {:?}", s)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestFact {
	pub feature: SmartString,
	#[serde(deserialize_with = "fact_date")]
	pub date: NaiveDate,
	pub resolution: f64,
	pub measure: SmartString,
	pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestAttributes {
	pub feature: SmartString,
	pub directorate: SmartString,
	pub department: SmartString,
	#[serde(rename = "Code")]
	pub code: SmartString,
	#[serde(rename = "CodeGroupID")]
	pub code_group_id: SmartString,
	#[serde(rename = "CodeID")]
	pub code_id: SmartString,
}

impl RequestAttributes {
	pub fn code_label(&self) -> SmartString {
		format!("{} ({}-{})", self.code, self.code_group_id, self.code_id).into()
	}
}

pub fn load_facts<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<RequestFact>> {
	let mut r = csv::Reader::from_reader(r);
	let mut result = Vec::new();
	let mut pm = CountMeter::new(s);
	for (i, row) in r.deserialize().enumerate() {
		let fact: RequestFact = row?;
		if fact.resolution == RESOLUTION {
			result.push(fact);
		}
		if i % 500000 == 499999 {
			pm.update(i+1);
		}
	}
	pm.finish(result.len());
	Ok(result)
}

/// Attributes keyed by feature; a feature may only be described once.
pub fn load_attributes<R: io::Read>(r: R) -> Result<HashMap<SmartString, RequestAttributes>> {
	let mut r = csv::Reader::from_reader(r);
	let mut result = HashMap::new();
	for row in r.deserialize() {
		let attrs: RequestAttributes = row?;
		let feature = attrs.feature.clone();
		if result.insert(feature.clone(), attrs).is_some() {
			return Err(Error::DuplicateKey(format!("feature {}", feature)))
		}
	}
	Ok(result)
}


#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
	pub directorate: SmartString,
	pub department: SmartString,
	pub code: SmartString,
}

pub type Measures = EnumMap<Measure, f64>;

/// Measures per group and day of facts from [`load_facts`], summed and with
/// absent measures as 0.
pub fn pivot(
		facts: &[RequestFact],
		attributes: &HashMap<SmartString, RequestAttributes>,
) -> BTreeMap<GroupKey, BTreeMap<NaiveDate, Measures>> {
	let mut result: BTreeMap<GroupKey, BTreeMap<NaiveDate, Measures>> = BTreeMap::new();
	let mut unmatched = 0usize;
	for fact in facts {
		let attrs = match attributes.get(&fact.feature) {
			Some(a) => a,
			None => {
				unmatched += 1;
				continue
			},
		};
		let measure = match Measure::from_name(&fact.measure) {
			Some(m) => m,
			None => continue,
		};
		let key = GroupKey{
			directorate: attrs.directorate.clone(),
			department: attrs.department.clone(),
			code: attrs.code_label(),
		};
		let day = result.entry(key).or_default().entry(fact.date).or_insert_with(Measures::default);
		day[measure] += fact.value;
	}
	if unmatched > 0 {
		warn!("{} facts without attributes were dropped", unmatched);
	}
	result
}


#[derive(Debug, Clone, PartialEq)]
pub struct RollingMetrics {
	pub date: NaiveDate,
	pub measures: EnumMap<Measure, Option<f64>>,
	pub backlog: Option<f64>,
}

impl RollingMetrics {
	/// Percentage of closed requests closed within target.
	pub fn service_standard(&self) -> Option<f64> {
		let closed = self.measures[Measure::ClosedCount]?;
		let within = self.measures[Measure::ClosedWithinTarget]?;
		let v = within / closed * 100.;
		if v.is_infinite() {
			Some(0.)
		} else if v.is_nan() {
			None
		} else {
			Some(v)
		}
	}
}

/// Sums over the observations in `(d - 180 days, d]` for every observed day
/// `d`, missing unless the window holds at least 90 observations.
pub fn rolling_metrics(days: &BTreeMap<NaiveDate, Measures>) -> Vec<RollingMetrics> {
	let rows: Vec<(NaiveDate, &Measures)> = days.iter().map(|(d, m)| (*d, m)).collect();
	let mut result = Vec::with_capacity(rows.len());
	let mut lo = 0;
	for hi in 0..rows.len() {
		let date = rows[hi].0;
		while rows[lo].0 <= date - Duration::days(ROLLING_DAYS) {
			lo += 1;
		}
		let window = &rows[lo..=hi];
		if window.len() < MIN_PERIODS {
			result.push(RollingMetrics{date, measures: EnumMap::default(), backlog: None});
			continue
		}
		let mut sums = Measures::default();
		for (_, m) in window {
			for measure in Measure::ALL.iter() {
				sums[*measure] += m[*measure];
			}
		}
		let mut measures: EnumMap<Measure, Option<f64>> = EnumMap::default();
		for measure in Measure::ALL.iter() {
			measures[*measure] = Some(sums[*measure]);
		}
		result.push(RollingMetrics{
			date,
			measures,
			backlog: Some(sums[Measure::OpenedCount] - sums[Measure::ClosedCount]),
		});
	}
	result
}

/// The department metrics table at two days before the most recent date.
pub fn department_metrics(
		facts: &[RequestFact],
		attributes: &HashMap<SmartString, RequestAttributes>,
) -> Result<Table> {
	let groups = pivot(facts, attributes);
	let latest = groups.values()
		.filter_map(|days| days.keys().next_back())
		.max()
		.copied()
		.ok_or_else(|| Error::EmptyInput("no resolution 3 facts with attributes".into()))?;
	let report_date = latest - Duration::days(LATEST_OFFSET_DAYS);
	info!("reporting metrics as of {} ({} groups)", report_date, groups.len());

	let mut headers = vec![
		"directorate".to_string(),
		"department".to_string(),
		"Code".to_string(),
	];
	headers.extend(Measure::ALL.iter().map(|m| m.name().to_string()));
	headers.extend(vec![
		"backlog".to_string(),
		"service_standard".to_string(),
		"total_opened".to_string(),
		"dept_color".to_string(),
	]);
	let mut table = Table::new(headers);

	let start = total_start();
	for (key, days) in groups.iter() {
		let metrics = match rolling_metrics(days).into_iter().find(|m| m.date == report_date) {
			Some(m) => m,
			None => continue,
		};
		let opened_since: Vec<f64> = days.range(start..)
			.map(|(_, m)| m[Measure::OpenedCount])
			.collect();
		let total_opened = if opened_since.len() > 0 {
			Some(opened_since.iter().sum())
		} else {
			None
		};

		let mut row = vec![
			key.directorate.to_string(),
			key.department.to_string(),
			key.code.to_string(),
		];
		row.extend(Measure::ALL.iter().map(|m| format_opt(metrics.measures[*m])));
		row.push(format_opt(metrics.backlog));
		row.push(format_opt(metrics.service_standard()));
		row.push(total_opened.map(format_value).unwrap_or_default());
		row.push(department_color(&key.department).to_string());
		table.push(row);
	}
	debug!("{} groups have metrics on {}", table.rows.len(), report_date);
	Ok(table)
}

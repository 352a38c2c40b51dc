use std::fmt;
use std::io;

use serde::{Deserialize, Deserializer};

use smartstring::alias::{String as SmartString};

use enum_map::Enum;

use chrono::naive::{NaiveDate, NaiveDateTime};

use log::debug;

use crate::error::{Error, Result};
use crate::progress::{CountMeter, ProgressSink};


pub static EXPORT_DATE_COLUMN: &'static str = "Export.Date";
pub static UNALLOCATED: &'static str = "Unallocated";
static REGION_SEPARATOR: &'static str = " - ";


/// The line list events which are subject to reporting lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Enum)]
pub enum EventKind {
	Diagnosis,
	Admission,
	IcuAdmission,
	Death,
}

impl EventKind {
	pub const ALL: [EventKind; 4] = [
		EventKind::Diagnosis,
		EventKind::Admission,
		EventKind::IcuAdmission,
		EventKind::Death,
	];

	/// Column name of the event date in the line list.
	pub fn column(&self) -> &'static str {
		match self {
			Self::Diagnosis => "Date.of.Diagnosis",
			Self::Admission => "Admission.Date",
			Self::IcuAdmission => "Date.of.ICU.Admission",
			Self::Death => "Date.of.Death",
		}
	}

	/// Prefix used for the count columns of the adjusted tables.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Diagnosis => "Diagnoses",
			Self::Admission => "Admissions",
			Self::IcuAdmission => "ICUAdmissions",
			Self::Death => "Deaths",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.column())
	}
}


/// Parse the assortment of date formats found in line list exports.
///
/// Anything which does not look like a date is treated as missing, which
/// includes the `0` used to fill gaps in older collected files.
pub fn parse_loose_date(s: &str) -> Option<NaiveDate> {
	let s = s.trim();
	match s {
		"" | "0" | "NA" | "NaN" | "nan" | "NaT" => return None,
		_ => (),
	}

	if s.len() >= 10 && s.is_char_boundary(10) {
		let head = s[..10].replace("/", "-");
		let tail_ok = match s.as_bytes().get(10) {
			None => true,
			Some(b' ') | Some(b'T') => true,
			_ => false,
		};
		if tail_ok {
			if let Ok(d) = head.parse::<NaiveDate>() {
				return Some(d)
			}
		}
	}

	// vendor export stamps look like "Jan  5 2021 10:30AM"
	let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
	for fmt in &["%b %d %Y %I:%M%p", "%b %d %Y %H:%M", "%d %b %Y"] {
		if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, fmt) {
			return Some(dt.date())
		}
		if let Ok(d) = NaiveDate::parse_from_str(&normalized, fmt) {
			return Some(d)
		}
	}
	None
}

fn loose_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
	where D: Deserializer<'de>
{
	let s: Option<String> = Option::deserialize(deserializer)?;
	Ok(s.as_deref().and_then(parse_loose_date))
}

fn strict_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
	where D: Deserializer<'de>
{
	let s = String::deserialize(deserializer)?;
	parse_loose_date(&s).ok_or_else(|| serde::de::Error::custom(format!("malformed export date: {:?}", s)))
}

// upstream exports write codes as floats ("199041.0") once a column had a gap
fn loose_code<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
	where D: Deserializer<'de>
{
	let s: Option<String> = Option::deserialize(deserializer)?;
	let s = match s {
		Some(s) => s,
		None => return Ok(None),
	};
	let s = s.trim();
	if let Ok(v) = s.parse::<u64>() {
		return Ok(Some(v))
	}
	match s.parse::<f64>() {
		Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as u64)),
		_ => Ok(None),
	}
}


#[derive(Debug, Clone, Deserialize)]
pub struct LinelistRecord {
	#[serde(rename = "Export.Date", deserialize_with = "strict_date")]
	pub export_date: NaiveDate,
	#[serde(rename = "Date.of.Diagnosis", default, deserialize_with = "loose_date")]
	pub diagnosis_date: Option<NaiveDate>,
	#[serde(rename = "Admission.Date", default, deserialize_with = "loose_date")]
	pub admission_date: Option<NaiveDate>,
	#[serde(rename = "Date.of.ICU.Admission", default, deserialize_with = "loose_date")]
	pub icu_admission_date: Option<NaiveDate>,
	#[serde(rename = "Date.of.Death", default, deserialize_with = "loose_date")]
	pub death_date: Option<NaiveDate>,
	#[serde(rename = "District", default)]
	pub district: Option<SmartString>,
	#[serde(rename = "Subdistrict", default)]
	pub subdistrict: Option<SmartString>,
	#[serde(rename = "Agegroup", default)]
	pub age_group: Option<SmartString>,
	#[serde(rename = "Subplace.name", default)]
	pub subplace_name: Option<SmartString>,
	#[serde(rename = "Mainplace.Name", default)]
	pub mainplace_name: Option<SmartString>,
	#[serde(rename = "Subplace.Code", default, deserialize_with = "loose_code")]
	pub subplace_code: Option<u64>,
	#[serde(rename = "Mainplace.Code", default, deserialize_with = "loose_code")]
	pub mainplace_code: Option<u64>,
}

impl LinelistRecord {
	pub fn new(export_date: NaiveDate) -> Self {
		Self{
			export_date,
			diagnosis_date: None,
			admission_date: None,
			icu_admission_date: None,
			death_date: None,
			district: None,
			subdistrict: None,
			age_group: None,
			subplace_name: None,
			mainplace_name: None,
			subplace_code: None,
			mainplace_code: None,
		}
	}

	pub fn event_date(&self, kind: EventKind) -> Option<NaiveDate> {
		match kind {
			EventKind::Diagnosis => self.diagnosis_date,
			EventKind::Admission => self.admission_date,
			EventKind::IcuAdmission => self.icu_admission_date,
			EventKind::Death => self.death_date,
		}
	}

	pub fn set_event_date(&mut self, kind: EventKind, date: Option<NaiveDate>) {
		let slot = match kind {
			EventKind::Diagnosis => &mut self.diagnosis_date,
			EventKind::Admission => &mut self.admission_date,
			EventKind::IcuAdmission => &mut self.icu_admission_date,
			EventKind::Death => &mut self.death_date,
		};
		*slot = date;
	}

	/// Days between the event and the export which first carried it. May be
	/// negative for bogus future-dated events.
	pub fn lag_days(&self, kind: EventKind) -> Option<i64> {
		let date = self.event_date(kind)?;
		Some((self.export_date - date).num_days())
	}

	pub fn district(&self) -> &str {
		self.district.as_deref().unwrap_or(UNALLOCATED)
	}

	pub fn subdistrict(&self) -> &str {
		self.subdistrict.as_deref().unwrap_or(UNALLOCATED)
	}
}


fn split_prefixed(subdistrict: &str) -> Option<(&str, &str)> {
	let mut parts = subdistrict.split(REGION_SEPARATOR);
	let district = parts.next()?;
	let sub = parts.next()?;
	Some((district, sub))
}

/// Repair district/subdistrict labels.
///
/// Newer exports label subdistricts as `"<District> - <Subdistrict>"`. The
/// district is recovered from that prefix where the district itself is
/// unallocated, and the subdistrict is reduced to its bare name.
pub fn normalize_region(district: &str, subdistrict: &str) -> (SmartString, SmartString) {
	match split_prefixed(subdistrict) {
		Some((prefix, sub)) => {
			let district = if district == UNALLOCATED {
				prefix
			} else {
				district
			};
			(district.into(), sub.into())
		},
		None => (district.into(), subdistrict.into()),
	}
}

/// Join labels back together in the prefixed naming scheme.
pub fn prefixed_subdistrict(district: &str, subdistrict: &str) -> SmartString {
	if district == UNALLOCATED && subdistrict == UNALLOCATED {
		return UNALLOCATED.into()
	}
	let mut result = SmartString::new();
	result.push_str(district);
	result.push_str(REGION_SEPARATOR);
	result.push_str(subdistrict);
	result
}

pub fn latest_export(records: &[LinelistRecord]) -> Option<NaiveDate> {
	records.iter().map(|r| r.export_date).max()
}

/// Whether the latest export uses the `"<District> - <Subdistrict>"` scheme.
pub fn uses_prefixed_names(records: &[LinelistRecord]) -> bool {
	let latest = match latest_export(records) {
		Some(d) => d,
		None => return false,
	};
	records.iter()
		.filter(|r| r.export_date == latest)
		.any(|r| r.subdistrict().contains(REGION_SEPARATOR))
}

/// Apply [`normalize_region`] to all records, re-prefixing subdistricts if
/// the latest export used the prefixed scheme.
pub fn normalize_regions(records: &mut [LinelistRecord]) {
	let prefixed = uses_prefixed_names(records);
	debug!("latest export uses prefixed subdistrict names: {}", prefixed);
	for rec in records.iter_mut() {
		let (district, subdistrict) = normalize_region(rec.district(), rec.subdistrict());
		let subdistrict = if prefixed {
			prefixed_subdistrict(&district, &subdistrict)
		} else {
			subdistrict
		};
		rec.district = Some(district);
		rec.subdistrict = Some(subdistrict);
	}
}


pub fn load_linelist<R: io::Read, S: ProgressSink + ?Sized>(s: &mut S, r: R) -> Result<Vec<LinelistRecord>> {
	let mut r = csv::Reader::from_reader(r);
	{
		let headers = r.headers()?;
		if !headers.iter().any(|h| h == EXPORT_DATE_COLUMN) {
			return Err(Error::MissingColumn(EXPORT_DATE_COLUMN.into()))
		}
	}
	let mut result = Vec::new();
	let mut pm = CountMeter::new(s);
	for (i, row) in r.deserialize().enumerate() {
		let rec: LinelistRecord = row?;
		result.push(rec);
		if i % 500000 == 499999 {
			pm.update(i+1);
		}
	}
	pm.finish(result.len());
	Ok(result)
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::progress::LogSink;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	#[test]
	fn parses_iso_dates_with_and_without_time() {
		assert_eq!(parse_loose_date("2020-05-01"), Some(d(2020, 5, 1)));
		assert_eq!(parse_loose_date("2020-05-01 13:45:00"), Some(d(2020, 5, 1)));
		assert_eq!(parse_loose_date("2020/05/01 00:00:00"), Some(d(2020, 5, 1)));
		assert_eq!(parse_loose_date("2020-05-01T00:00:00"), Some(d(2020, 5, 1)));
	}

	#[test]
	fn parses_vendor_export_stamp() {
		assert_eq!(parse_loose_date("Jan  5 2021 10:30AM"), Some(d(2021, 1, 5)));
		assert_eq!(parse_loose_date("Dec 24 2020  9:05PM"), Some(d(2020, 12, 24)));
	}

	#[test]
	fn coerces_garbage_to_missing() {
		assert_eq!(parse_loose_date(""), None);
		assert_eq!(parse_loose_date("0"), None);
		assert_eq!(parse_loose_date("NaN"), None);
		assert_eq!(parse_loose_date("not a date"), None);
		assert_eq!(parse_loose_date("2020-13-45"), None);
	}

	#[test]
	fn normalize_region_recovers_district_from_prefix() {
		let (dist, sub) = normalize_region("Unallocated", "City of Cape Town - Northern");
		assert_eq!(dist, "City of Cape Town");
		assert_eq!(sub, "Northern");

		let (dist, sub) = normalize_region("Cape Winelands", "Cape Winelands - Stellenbosch");
		assert_eq!(dist, "Cape Winelands");
		assert_eq!(sub, "Stellenbosch");

		let (dist, sub) = normalize_region("Overberg", "Theewaterskloof");
		assert_eq!(dist, "Overberg");
		assert_eq!(sub, "Theewaterskloof");
	}

	#[test]
	fn prefixed_subdistrict_collapses_unallocated() {
		assert_eq!(prefixed_subdistrict("Unallocated", "Unallocated"), "Unallocated");
		assert_eq!(prefixed_subdistrict("Overberg", "Unallocated"), "Overberg - Unallocated");
	}

	#[test]
	fn loads_records_with_missing_columns() {
		let data = b"Export.Date,Date.of.Diagnosis,Date.of.Death,District,Subdistrict,Mainplace.Code\n\
			2020-06-10,2020-06-01,,City of Cape Town,City of Cape Town - Northern,199041.0\n\
			Jun 11 2020  8:00AM,0,2020-06-09,,,\n";
		let recs = load_linelist(&mut LogSink, &data[..]).unwrap();
		assert_eq!(recs.len(), 2);
		assert_eq!(recs[0].export_date, d(2020, 6, 10));
		assert_eq!(recs[0].diagnosis_date, Some(d(2020, 6, 1)));
		assert_eq!(recs[0].lag_days(EventKind::Diagnosis), Some(9));
		assert_eq!(recs[0].admission_date, None);
		assert_eq!(recs[0].mainplace_code, Some(199041));
		assert_eq!(recs[1].export_date, d(2020, 6, 11));
		assert_eq!(recs[1].diagnosis_date, None);
		assert_eq!(recs[1].death_date, Some(d(2020, 6, 9)));
		assert_eq!(recs[1].district(), "Unallocated");
	}

	#[test]
	fn rejects_linelist_without_export_date() {
		let data = b"Date.of.Diagnosis\n2020-06-01\n";
		match load_linelist(&mut LogSink, &data[..]) {
			Err(Error::MissingColumn(c)) => assert_eq!(c, EXPORT_DATE_COLUMN),
			other => panic!("unexpected result: {:?}", other.map(|v| v.len())),
		}
	}

	#[test]
	fn rejects_unparseable_export_date() {
		let data = b"Export.Date\nnot a date\n";
		assert!(load_linelist(&mut LogSink, &data[..]).is_err());
	}

	#[test]
	fn normalize_regions_reprefixes_when_latest_export_is_prefixed() {
		let mut a = LinelistRecord::new(d(2020, 6, 1));
		a.district = Some("City of Cape Town".into());
		a.subdistrict = Some("Northern".into());
		let mut b = LinelistRecord::new(d(2020, 6, 2));
		b.district = Some("Unallocated".into());
		b.subdistrict = Some("City of Cape Town - Southern".into());
		let mut c = LinelistRecord::new(d(2020, 6, 2));
		c.district = None;
		c.subdistrict = None;
		let mut recs = vec![a, b, c];
		normalize_regions(&mut recs);
		assert_eq!(recs[0].subdistrict(), "City of Cape Town - Northern");
		assert_eq!(recs[1].district(), "City of Cape Town");
		assert_eq!(recs[1].subdistrict(), "City of Cape Town - Southern");
		assert_eq!(recs[2].subdistrict(), "Unallocated");
	}
}

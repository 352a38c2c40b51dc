use std::collections::{BTreeMap, HashSet};
use std::fmt;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use log::debug;

use crate::linelist::{EventKind, LinelistRecord, EXPORT_DATE_COLUMN};
use crate::table::Table;


/// Ten-year age bands; everybody from 80 up shares one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeBand {
	Decade(u32),
	Eighty,
	Unknown,
}

impl AgeBand {
	/// Map a five-year `Agegroup` label such as `"35 - 40"`.
	pub fn from_age_group(s: &str) -> Self {
		let mut parts = s.split(" - ");
		let bounds = match (parts.next(), parts.next(), parts.next()) {
			(Some(lo), Some(hi), None) => (lo.trim().parse::<u32>(), hi.trim().parse::<u32>()),
			_ => return Self::Unknown,
		};
		let (lo, hi) = match bounds {
			(Ok(lo), Ok(hi)) => (lo, hi),
			_ => return Self::Unknown,
		};
		if lo % 5 != 0 || hi != lo + 5 {
			return Self::Unknown
		}
		match lo {
			0..=75 => Self::Decade(lo / 10 * 10),
			80..=120 => Self::Eighty,
			_ => Self::Unknown,
		}
	}
}

impl fmt::Display for AgeBand {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Decade(lo) => write!(f, "{:03} - {:03}", lo, lo + 10),
			Self::Eighty => f.write_str("080 - 125"),
			Self::Unknown => f.write_str("Unknown"),
		}
	}
}


type AgeKey = (NaiveDate, NaiveDate, AgeBand, SmartString, Option<SmartString>);

/// Event counts per export, event date, age band and district, followed by
/// the same counts split by subdistrict.
pub fn age_distribution(records: &[LinelistRecord], kind: EventKind) -> Table {
	let mut by_district: BTreeMap<AgeKey, u64> = BTreeMap::new();
	let mut by_subdistrict: BTreeMap<AgeKey, u64> = BTreeMap::new();
	for rec in records {
		let date = match rec.event_date(kind) {
			Some(d) => d,
			None => continue,
		};
		let district = match rec.district.as_ref() {
			Some(d) => d.clone(),
			None => continue,
		};
		let band = rec.age_group.as_deref().map(AgeBand::from_age_group).unwrap_or(AgeBand::Unknown);
		*by_district.entry((rec.export_date, date, band, district.clone(), None)).or_insert(0) += 1;
		if let Some(sub) = rec.subdistrict.as_ref() {
			*by_subdistrict.entry((rec.export_date, date, band, district, Some(sub.clone()))).or_insert(0) += 1;
		}
	}
	debug!("{}: {} district and {} subdistrict groups", kind, by_district.len(), by_subdistrict.len());

	let mut table = Table::new(vec![
		EXPORT_DATE_COLUMN.to_string(),
		kind.column().to_string(),
		"Age_Band".to_string(),
		"District".to_string(),
		"Subdistrict".to_string(),
		"count".to_string(),
	]);
	for ((export, date, band, district, sub), count) in by_district.into_iter().chain(by_subdistrict.into_iter()) {
		table.push(vec![
			export.to_string(),
			date.to_string(),
			band.to_string(),
			district.to_string(),
			sub.map(|s| s.to_string()).unwrap_or_default(),
			count.to_string(),
		]);
	}
	table
}


pub static CITY_MAINPLACE_NAME: &'static str = "Cape Town";
pub const CITY_MAINPLACE_CODE: u64 = 199041;

/// The city mainplace is resolved to its subplaces, other mainplaces are
/// taken as a whole.
pub fn place_name(rec: &LinelistRecord) -> Option<&str> {
	match (rec.mainplace_name.as_deref(), rec.subplace_name.as_deref()) {
		(Some(main), Some(sub)) if main == CITY_MAINPLACE_NAME => Some(sub),
		(main, _) => main,
	}
}

pub fn place_code(rec: &LinelistRecord) -> Option<u64> {
	match (rec.mainplace_code, rec.subplace_code) {
		(Some(main), Some(sub)) if main == CITY_MAINPLACE_CODE => Some(sub),
		(main, _) => main,
	}
}

/// Diagnoses per day and suburb.
pub fn suburb_counts(records: &[LinelistRecord]) -> Table {
	let mainplace_codes: HashSet<u64> = records.iter().filter_map(|r| r.mainplace_code).collect();
	let mut counts: BTreeMap<(NaiveDate, u64, SmartString), u64> = BTreeMap::new();
	let mut dropped = 0usize;
	for rec in records {
		match (rec.diagnosis_date, place_code(rec), place_name(rec)) {
			(Some(date), Some(code), Some(name)) => {
				*counts.entry((date, code, name.into())).or_insert(0) += 1;
			},
			_ => dropped += 1,
		}
	}
	debug!("{} records without diagnosis date or place", dropped);

	let mut table = Table::new(vec![
		"Diagnosis_Date".to_string(),
		"Place_code".to_string(),
		"Place_Name".to_string(),
		"count".to_string(),
		"Place_type".to_string(),
	]);
	for ((date, code, name), count) in counts {
		let kind = if mainplace_codes.contains(&code) {
			"Mainplace"
		} else {
			"Subplace"
		};
		table.push(vec![
			date.to_string(),
			code.to_string(),
			name.to_string(),
			count.to_string(),
			kind.to_string(),
		]);
	}
	table
}


#[cfg(test)]
mod tests {
	use super::*;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	#[test]
	fn age_bands() {
		assert_eq!(AgeBand::from_age_group("0 - 5").to_string(), "000 - 010");
		assert_eq!(AgeBand::from_age_group("5 - 10").to_string(), "000 - 010");
		assert_eq!(AgeBand::from_age_group("35 - 40").to_string(), "030 - 040");
		assert_eq!(AgeBand::from_age_group("75 - 80").to_string(), "070 - 080");
		assert_eq!(AgeBand::from_age_group("80 - 85").to_string(), "080 - 125");
		assert_eq!(AgeBand::from_age_group("120 - 125").to_string(), "080 - 125");
		assert_eq!(AgeBand::from_age_group("265 - 270"), AgeBand::Unknown);
		assert_eq!(AgeBand::from_age_group("-460 - -455"), AgeBand::Unknown);
		assert_eq!(AgeBand::from_age_group("Not recorded"), AgeBand::Unknown);
	}

	#[test]
	fn age_distribution_counts_both_levels() {
		let mut a = LinelistRecord::new(d(2020, 7, 1));
		a.diagnosis_date = Some(d(2020, 6, 30));
		a.district = Some("City of Cape Town".into());
		a.subdistrict = Some("Northern".into());
		a.age_group = Some("30 - 35".into());
		let mut b = a.clone();
		b.age_group = Some("35 - 40".into());
		b.subdistrict = None;
		let mut c = a.clone();
		c.diagnosis_date = None;

		let t = age_distribution(&[a, b, c], EventKind::Diagnosis);
		assert_eq!(t.headers[1], "Date.of.Diagnosis");
		assert_eq!(t.rows.len(), 2);
		assert_eq!(t.rows[0], vec!["2020-07-01", "2020-06-30", "030 - 040", "City of Cape Town", "", "2"]);
		assert_eq!(t.rows[1], vec!["2020-07-01", "2020-06-30", "030 - 040", "City of Cape Town", "Northern", "1"]);
	}

	#[test]
	fn suburbs_resolve_city_subplaces() {
		let mut city = LinelistRecord::new(d(2020, 7, 1));
		city.diagnosis_date = Some(d(2020, 6, 30));
		city.mainplace_name = Some("Cape Town".into());
		city.mainplace_code = Some(CITY_MAINPLACE_CODE);
		city.subplace_name = Some("Observatory".into());
		city.subplace_code = Some(199041020);
		let mut town = LinelistRecord::new(d(2020, 7, 1));
		town.diagnosis_date = Some(d(2020, 6, 30));
		town.mainplace_name = Some("Paarl".into());
		town.mainplace_code = Some(167001);
		town.subplace_name = Some("Paarl SP".into());
		town.subplace_code = Some(167001001);
		let mut bare = city.clone();
		bare.subplace_name = None;
		bare.subplace_code = None;

		let t = suburb_counts(&[city.clone(), city, town, bare]);
		assert_eq!(t.rows.len(), 3);
		assert_eq!(t.rows[0], vec!["2020-06-30", "167001", "Paarl", "1", "Mainplace"]);
		assert_eq!(t.rows[1], vec!["2020-06-30", "199041", "Cape Town", "1", "Mainplace"]);
		assert_eq!(t.rows[2], vec!["2020-06-30", "199041020", "Observatory", "2", "Subplace"]);
	}
}

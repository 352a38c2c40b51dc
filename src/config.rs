use std::env;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::linelist::parse_loose_date;


fn env_parsed<T, F: Fn(&str) -> Option<T>>(name: &'static str, default: T, parse: F) -> Result<T> {
	match env::var(name) {
		Ok(v) if v.trim().len() == 0 => Ok(default),
		Ok(v) => match parse(v.trim()) {
			Some(parsed) => Ok(parsed),
			None => Err(Error::InvalidSetting{name, value: v}),
		},
		Err(env::VarError::NotPresent) => Ok(default),
		Err(env::VarError::NotUnicode(v)) => Err(Error::InvalidSetting{
			name,
			value: v.to_string_lossy().into_owned(),
		}),
	}
}

pub fn env_usize(name: &'static str, default: usize) -> Result<usize> {
	env_parsed(name, default, |s| usize::from_str(s).ok())
}

pub fn env_date(name: &'static str, default: NaiveDate) -> Result<NaiveDate> {
	env_parsed(name, default, parse_loose_date)
}

/// The local calendar date, unless pinned via `SPV_TODAY` for reruns.
pub fn naive_today() -> Result<NaiveDate> {
	env_date("SPV_TODAY", chrono::Local::now().date_naive())
}

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settings_fall_back_to_default() {
		assert_eq!(env_usize("SPV_TEST_UNSET_SETTING", 21).unwrap(), 21);
	}

	#[test]
	fn malformed_settings_are_rejected() {
		env::set_var("SPV_TEST_BAD_WINDOW", "twenty");
		match env_usize("SPV_TEST_BAD_WINDOW", 21) {
			Err(Error::InvalidSetting{name, value}) => {
				assert_eq!(name, "SPV_TEST_BAD_WINDOW");
				assert_eq!(value, "twenty");
			},
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn dates_are_parsed_from_env() {
		env::set_var("SPV_TEST_START", "2020-05-01");
		assert_eq!(
			env_date("SPV_TEST_START", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).unwrap(),
			NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
		);
	}
}

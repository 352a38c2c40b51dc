use std::fmt;
use std::io;


#[derive(Debug)]
pub enum Error {
	Io(io::Error),
	Csv(csv::Error),
	MissingColumn(String),
	MissingRegion(String),
	EmptyInput(String),
	DuplicateKey(String),
	InvalidInterval(i64),
	InvalidDate(String),
	InvalidSetting{name: &'static str, value: String},
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Io(e) => fmt::Display::fmt(e, f),
			Self::Csv(e) => fmt::Display::fmt(e, f),
			Self::MissingColumn(name) => write!(f, "missing column: {}", name),
			Self::MissingRegion(name) => write!(f, "region {} is not in the table", name),
			Self::EmptyInput(what) => write!(f, "empty input: {}", what),
			Self::DuplicateKey(what) => write!(f, "duplicate key: {}", what),
			Self::InvalidInterval(days) => write!(f, "can't have less than 1 day between intervals (got {})", days),
			Self::InvalidDate(s) => write!(f, "malformed date: {:?}", s),
			Self::InvalidSetting{name, value} => write!(f, "invalid value for {}: {:?}", name, value),
		}
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<csv::Error> for Error {
	fn from(err: csv::Error) -> Self {
		Self::Csv(err)
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			Self::Csv(e) => Some(e),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;

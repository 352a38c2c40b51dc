use std::io;
use std::io::{Read, Write};
use std::fs;
use std::path::Path;

use flate2;


fn is_stdio(path: &Path) -> bool {
	path.as_os_str() == "-"
}

/// Open a file for reading, decompressing `.gz` on the fly. `-` reads stdin.
pub fn magic_open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	if is_stdio(path) {
		return Ok(Box::new(io::stdin()))
	}
	match path.extension() {
		Some(x) if x == "gz" => {
			Ok(Box::new(flate2::read::GzDecoder::new(fs::File::open(path)?)))
		},
		_ => Ok(Box::new(io::BufReader::new(fs::File::open(path)?))),
	}
}

/// Counterpart of [`magic_open`] for outputs. `-` writes to stdout.
pub fn magic_create<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write>> {
	let path = path.as_ref();
	if is_stdio(path) {
		return Ok(Box::new(io::stdout()))
	}
	match path.extension() {
		Some(x) if x == "gz" => {
			Ok(Box::new(flate2::write::GzEncoder::new(fs::File::create(path)?, flate2::Compression::default())))
		},
		_ => Ok(Box::new(io::BufWriter::new(fs::File::create(path)?))),
	}
}

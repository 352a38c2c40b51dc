use log::info;

use spv::{default_output, init_logging, load_raw_linelist, magic_open, metro_tables, write_table, EventKind, LagCorrection};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 6 {
		eprintln!("usage: {} LINELIST cases|deaths LAGTABLE METRO_OUT SUBDISTRICT_OUT", argv[0]);
		std::process::exit(2);
	}
	let linelist = &argv[1];
	let kind = match argv[2].as_str() {
		"cases" => EventKind::Diagnosis,
		"deaths" => EventKind::Death,
		other => {
			eprintln!("unknown kind {:?}, expected cases or deaths", other);
			std::process::exit(2);
		},
	};
	let lagtable = &argv[3];
	let metro_out = &argv[4];
	let subdistrict_out = &argv[5];

	let correction = LagCorrection::load(magic_open(lagtable)?, Some(kind))?;
	info!("{}: {} lag days", kind, correction.len());

	let mut sink = default_output();
	let records = load_raw_linelist(&mut *sink, linelist)?;
	let tables = metro_tables(&records, kind, &correction)?;
	write_table(metro_out, &tables.metro)?;
	write_table(subdistrict_out, &tables.subdistricts)?;
	Ok(())
}

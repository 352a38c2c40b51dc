use log::info;

use spv::{age_distribution, default_output, init_logging, load_linelist, magic_open, write_table, EventKind};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 4 {
		eprintln!("usage: {} LINELIST CASES_OUT DEATHS_OUT", argv[0]);
		std::process::exit(2);
	}
	let linelist = &argv[1];

	let mut sink = default_output();
	let records = load_linelist(&mut *sink, magic_open(linelist)?)?;
	info!("loaded {} records", records.len());

	for (kind, outfile) in &[(EventKind::Diagnosis, &argv[2]), (EventKind::Death, &argv[3])] {
		let table = age_distribution(&records, *kind);
		write_table(outfile, &table)?;
	}
	Ok(())
}

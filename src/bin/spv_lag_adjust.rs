use log::info;

use spv::{adjusted_table, default_output, env_date, init_logging, load_normalized_linelist, magic_open, write_table, EventKind, LagCorrection, LagCorrections, LagParams};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 4 {
		eprintln!("usage: {} LINELIST LAGTABLE OUTFILE", argv[0]);
		std::process::exit(2);
	}
	let linelist = &argv[1];
	let lagtable = &argv[2];
	let outfile = &argv[3];

	let start = env_date("SPV_LAG_START", LagParams::default_start())?;

	let mut corrections = LagCorrections::default();
	for kind in EventKind::ALL.iter().copied() {
		corrections[kind] = LagCorrection::load(magic_open(lagtable)?, Some(kind))?;
		info!("{}: {} lag days", kind, corrections[kind].len());
	}

	let mut sink = default_output();
	let records = load_normalized_linelist(&mut *sink, linelist)?;
	let table = adjusted_table(&records, &corrections, start)?;
	write_table(outfile, &table)?;
	Ok(())
}

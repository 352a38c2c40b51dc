use spv::{default_output, init_logging, load_linelist, magic_open, suburb_counts, write_table};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 3 {
		eprintln!("usage: {} LINELIST OUTFILE", argv[0]);
		std::process::exit(2);
	}

	let mut sink = default_output();
	let records = load_linelist(&mut *sink, magic_open(&argv[1])?)?;
	let table = suburb_counts(&records);
	write_table(&argv[2], &table)?;
	Ok(())
}

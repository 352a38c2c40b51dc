use log::info;

use spv::{default_output, department_metrics, init_logging, load_attributes, load_facts, magic_open, write_table};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 4 {
		eprintln!("usage: {} FACTS ATTRIBUTES OUTFILE", argv[0]);
		std::process::exit(2);
	}

	let mut sink = default_output();
	let facts = load_facts(&mut *sink, magic_open(&argv[1])?)?;
	let attributes = load_attributes(magic_open(&argv[2])?)?;
	info!("{} facts, {} features", facts.len(), attributes.len());

	let table = department_metrics(&facts, &attributes)?;
	write_table(&argv[3], &table)?;
	Ok(())
}

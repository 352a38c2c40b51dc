use std::path::Path;

use log::info;

use spv::{collect_dumps, default_output, env_usize, init_logging, magic_open, select_dumps, write_table, DEFAULT_COLLECT_LAST};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 3 {
		eprintln!("usage: {} DUMPDIR OUTFILE", argv[0]);
		std::process::exit(2);
	}
	let dumpdir = Path::new(&argv[1]);
	let outfile = &argv[2];
	let last = env_usize("SPV_COLLECT_LAST", DEFAULT_COLLECT_LAST)?;

	let paths = select_dumps(dumpdir, last)?;
	info!("collecting {} dumps from {}", paths.len(), dumpdir.display());
	let mut dumps = Vec::with_capacity(paths.len());
	for path in paths {
		let name = path.display().to_string();
		dumps.push((name, magic_open(&path)?));
	}

	let mut sink = default_output();
	let table = collect_dumps(&mut *sink, dumps)?;
	write_table(outfile, &table)?;
	Ok(())
}

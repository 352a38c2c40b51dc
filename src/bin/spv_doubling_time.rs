use spv::{growth_table, init_logging, load_region_series, magic_open, metro_regions, subdistrict_regions, write_table};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 6 {
		eprintln!("usage: {} cases|deaths METRO_IN SUBDISTRICT_IN METRO_OUT SUBDISTRICT_OUT", argv[0]);
		std::process::exit(2);
	}
	let with_active = match argv[1].as_str() {
		"cases" => true,
		"deaths" => false,
		other => {
			eprintln!("unknown kind {:?}, expected cases or deaths", other);
			std::process::exit(2);
		},
	};

	for (infile, outfile, regions) in vec![
		(&argv[2], &argv[4], metro_regions()),
		(&argv[3], &argv[5], subdistrict_regions()),
	] {
		let series = load_region_series(magic_open(infile)?)?;
		let table = growth_table(&series, &regions, with_active)?;
		write_table(outfile, &table)?;
	}
	Ok(())
}

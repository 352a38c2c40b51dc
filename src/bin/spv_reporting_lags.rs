use log::info;

use spv::{default_output, init_logging, lag_tables, load_normalized_linelist, magic_create, naive_today, write_lag_table, LagParams};


fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() != 5 {
		eprintln!("usage: {} LINELIST PROVINCE_OUT DISTRICT_OUT SUBDISTRICT_OUT", argv[0]);
		std::process::exit(2);
	}
	let linelist = &argv[1];
	let province_out = &argv[2];
	let district_out = &argv[3];
	let subdistrict_out = &argv[4];

	let params = LagParams::from_env(naive_today()?)?;
	info!("lag parameters: {:?}", params);

	let mut sink = default_output();
	let records = load_normalized_linelist(&mut *sink, linelist)?;

	info!("estimating reporting lags ...");
	let tables = lag_tables(&mut *sink, &records, &params);

	for (path, rows) in &[
		(province_out, &tables.province),
		(district_out, &tables.districts),
		(subdistrict_out, &tables.subdistricts),
	] {
		info!("writing {} rows to {}", rows.len(), path);
		write_lag_table(magic_create(path)?, rows)?;
	}
	Ok(())
}

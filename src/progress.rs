use std::io;
use std::io::Write;
use std::time;

use log::info;


/// Receives progress reports from a meter.
pub trait ProgressSink {
	fn update(&mut self, inow: usize, n: Option<usize>, rate: f64);
	fn finish(&mut self, inow: usize, n: Option<usize>, rate: f64);
}


/// Writes a single self-overwriting status line to stdout.
pub struct TerminalSink;

impl ProgressSink for TerminalSink {
	fn update(&mut self, inow: usize, n: Option<usize>, rate: f64) {
		match n {
			Some(n) => {
				let done = (inow as f64) / (n as f64);
				print!("{:6.0}% [{:6.2}/s]\r", done * 100.0, rate);
			},
			None => {
				print!("{:12} [{:6.2}/s]\r", inow, rate);
			},
		}
		let _ = io::stdout().flush();
	}

	fn finish(&mut self, inow: usize, n: Option<usize>, rate: f64) {
		match n {
			Some(_) => println!("{:6.0}% [{:6.2}/s]", 100.0, rate),
			None => println!("{:12} [{:6.2}/s]", inow, rate),
		}
	}
}


/// Used when stdout is not a terminal, e.g. under a scheduler.
pub struct LogSink;

impl ProgressSink for LogSink {
	fn update(&mut self, _inow: usize, _n: Option<usize>, _rate: f64) {}

	fn finish(&mut self, inow: usize, n: Option<usize>, rate: f64) {
		match n {
			Some(n) => info!("processed {}/{} items [{:.2}/s]", inow, n, rate),
			None => info!("processed {} items [{:.2}/s]", inow, rate),
		}
	}
}


pub fn default_output() -> Box<dyn ProgressSink> {
	if isatty::stdout_isatty() {
		Box::new(TerminalSink)
	} else {
		Box::new(LogSink)
	}
}


struct Clock {
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
}

impl Clock {
	fn start() -> Self {
		let now = time::Instant::now();
		Self{
			t0: now,
			tprev: now,
			iprev: 0,
		}
	}

	fn step(&mut self, inow: usize) -> f64 {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		let rate = (inow.saturating_sub(self.iprev)) as f64 / dt;
		self.iprev = inow;
		self.tprev = now;
		rate
	}

	fn total_rate(&self, inow: usize) -> f64 {
		let dt = self.t0.elapsed().as_secs_f64();
		inow as f64 / dt
	}
}


/// Meter for loops of unknown length, such as streaming CSV rows.
pub struct CountMeter<'s, S: ProgressSink + ?Sized> {
	sink: &'s mut S,
	clock: Clock,
}

impl<'s, S: ProgressSink + ?Sized> CountMeter<'s, S> {
	pub fn new(sink: &'s mut S) -> Self {
		Self{
			sink,
			clock: Clock::start(),
		}
	}

	pub fn update(&mut self, inow: usize) {
		let rate = self.clock.step(inow);
		self.sink.update(inow, None, rate);
	}

	pub fn finish(self, inow: usize) {
		let rate = self.clock.total_rate(inow);
		self.sink.finish(inow, None, rate);
	}
}


/// Meter for loops with a known number of steps.
pub struct StepMeter<'s, S: ProgressSink + ?Sized> {
	sink: &'s mut S,
	clock: Clock,
	n: usize,
}

impl<'s, S: ProgressSink + ?Sized> StepMeter<'s, S> {
	pub fn new(sink: &'s mut S, n: usize) -> Self {
		Self{
			sink,
			clock: Clock::start(),
			n,
		}
	}

	pub fn update(&mut self, inow: usize) {
		let rate = self.clock.step(inow);
		self.sink.update(inow, Some(self.n), rate);
	}

	pub fn finish(self) {
		let rate = self.clock.total_rate(self.n);
		self.sink.finish(self.n, Some(self.n), rate);
	}
}

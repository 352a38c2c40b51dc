use std::collections::HashMap;
use std::hash::Hash;

use num_traits::Zero;

use chrono::NaiveDate;


pub trait TimeSeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> TimeSeriesKey for T {}


/// One dense daily series per key over `[start, start + len)`.
#[derive(Debug, Clone)]
pub struct TimeSeries<T: Hash + Eq, V: Copy> {
	start: NaiveDate,
	keys: HashMap<T, usize>,
	time_series: Vec<Vec<V>>,
	len: usize,
}

impl<T: Hash + Eq, V: Copy> TimeSeries<T, V> {
	pub fn new(start: NaiveDate, last: NaiveDate) -> Self {
		let len = (last - start).num_days();
		assert!(len >= 0);
		let len = len as usize;
		Self{
			start,
			len,
			keys: HashMap::new(),
			time_series: Vec::new(),
		}
	}

	#[inline(always)]
	pub fn date_index(&self, other: NaiveDate) -> Option<usize> {
		let days = (other - self.start).num_days();
		if days < 0 || days as usize >= self.len {
			return None
		}
		return Some(days as usize)
	}

	#[inline(always)]
	pub fn index_date(&self, i: i64) -> Option<NaiveDate> {
		if i < 0 || i as usize >= self.len {
			return None
		}
		return Some(self.start + chrono::Duration::days(i))
	}

	#[inline(always)]
	pub fn start(&self) -> NaiveDate {
		self.start
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
		self.start.iter_days().take(self.len)
	}
}

impl<T: TimeSeriesKey, V: Copy + Zero> TimeSeries<T, V> {
	pub fn get_or_create(&mut self, k: T) -> &mut [V] {
		let index = self.get_index_or_create(k);
		&mut self.time_series[index][..]
	}

	pub fn get_index_or_create(&mut self, k: T) -> usize {
		match self.keys.get(&k) {
			Some(v) => *v,
			None => {
				let v = self.time_series.len();
				let mut vec = Vec::with_capacity(self.len);
				vec.resize(self.len, V::zero());
				self.time_series.push(vec);
				self.keys.insert(k, v);
				v
			},
		}
	}

	pub fn get_index(&self, k: &T) -> Option<usize> {
		Some(*self.keys.get(k)?)
	}

	pub fn get(&self, k: &T) -> Option<&[V]> {
		let index = self.get_index(k)?;
		Some(&self.time_series[index][..])
	}

	pub fn get_value(&self, k: &T, i: usize) -> Option<V> {
		if i >= self.len {
			return None
		}
		self.get(k).and_then(|v| { Some(v[i]) })
	}

	pub fn keys(&self) -> std::collections::hash_map::Keys<'_, T, usize> {
		self.keys.keys()
	}
}


/// Sum over the trailing `window` values; `NaN` until the window is full or
/// while it contains a `NaN`.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
	assert!(window >= 1);
	let mut result = Vec::with_capacity(values.len());
	for i in 0..values.len() {
		if i + 1 < window {
			result.push(f64::NAN);
			continue;
		}
		let sum: f64 = values[i + 1 - window..=i].iter().sum();
		result.push(sum);
	}
	result
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
	rolling_sum(values, window).into_iter().map(|v| v / window as f64).collect()
}

/// `shift(n)` in the dataframe sense: `out[i] = values[i - n]`.
pub fn shift(values: &[f64], offset: usize) -> Vec<f64> {
	let mut result = Vec::with_capacity(values.len());
	for i in 0..values.len() {
		result.push(if i < offset {
			f64::NAN
		} else {
			values[i - offset]
		});
	}
	result
}

/// Median of the non-`NaN` values, averaging the two middle elements for even
/// counts.
pub fn median(values: &[f64]) -> Option<f64> {
	let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
	if sorted.len() == 0 {
		return None
	}
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	let mid = sorted.len() / 2;
	if sorted.len() % 2 == 0 {
		Some((sorted[mid - 1] + sorted[mid]) / 2.)
	} else {
		Some(sorted[mid])
	}
}

/// Sample standard deviation (n - 1 denominator); needs two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
	let vs: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
	if vs.len() < 2 {
		return None
	}
	let n = vs.len() as f64;
	let mean = vs.iter().sum::<f64>() / n;
	let ss: f64 = vs.iter().map(|v| (v - mean) * (v - mean)).sum();
	Some((ss / (n - 1.)).sqrt())
}

/// `NaN` and infinities become missing.
pub fn finite(v: f64) -> Option<f64> {
	if v.is_finite() {
		Some(v)
	} else {
		None
	}
}


pub type FGauge<T> = TimeSeries<T, f64>;


#[cfg(test)]
mod tests {
	use super::*;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	fn assert_nan_eq(a: &[f64], b: &[f64]) {
		assert_eq!(a.len(), b.len(), "{:?} vs {:?}", a, b);
		for (x, y) in a.iter().zip(b.iter()) {
			if y.is_nan() {
				assert!(x.is_nan(), "{:?} vs {:?}", a, b);
			} else {
				assert!((x - y).abs() < 1e-9, "{:?} vs {:?}", a, b);
			}
		}
	}

	#[test]
	fn date_index_is_bounded() {
		let ts = TimeSeries::<&str, u64>::new(d(2020, 4, 1), d(2020, 4, 11));
		assert_eq!(ts.len(), 10);
		assert_eq!(ts.date_index(d(2020, 4, 1)), Some(0));
		assert_eq!(ts.date_index(d(2020, 4, 10)), Some(9));
		assert_eq!(ts.date_index(d(2020, 4, 11)), None);
		assert_eq!(ts.date_index(d(2020, 3, 31)), None);
		assert_eq!(ts.index_date(3), Some(d(2020, 4, 4)));
	}

	#[test]
	fn series_are_zero_filled_per_key() {
		let mut ts = TimeSeries::<&str, u64>::new(d(2020, 4, 1), d(2020, 4, 4));
		ts.get_or_create("a")[1] += 2;
		ts.get_or_create("a")[1] += 1;
		ts.get_or_create("b");
		assert_eq!(ts.get(&"a"), Some(&[0u64, 3, 0][..]));
		assert_eq!(ts.get_value(&"b", 2), Some(0));
		assert_eq!(ts.get_value(&"a", 3), None);
		assert_eq!(ts.get(&"c"), None);
		let mut keys: Vec<_> = ts.keys().copied().collect();
		keys.sort();
		assert_eq!(keys, vec!["a", "b"]);
		assert_eq!(ts.dates().last(), Some(d(2020, 4, 3)));
	}

	#[test]
	fn rolling_windows_match_dataframe_semantics() {
		let v = [1., 2., 3., 4., 5.];
		assert_nan_eq(&rolling_sum(&v, 3), &[f64::NAN, f64::NAN, 6., 9., 12.]);
		assert_nan_eq(&rolling_mean(&v, 2), &[f64::NAN, 1.5, 2.5, 3.5, 4.5]);
		assert_nan_eq(&shift(&v, 2), &[f64::NAN, f64::NAN, 1., 2., 3.]);
		assert_nan_eq(&rolling_sum(&[1., f64::NAN, 1., 1.], 2), &[f64::NAN, f64::NAN, f64::NAN, 2.]);
	}

	#[test]
	fn median_and_stdev() {
		assert_eq!(median(&[3., 1., 2.]), Some(2.));
		assert_eq!(median(&[4., 1., 3., 2.]), Some(2.5));
		assert_eq!(median(&[]), None);
		assert_eq!(sample_stdev(&[1.]), None);
		let sd = sample_stdev(&[2., 4., 4., 4., 5., 5., 7., 9.]).unwrap();
		assert!((sd - 2.138089935299395).abs() < 1e-12);
	}
}

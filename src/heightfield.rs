/// A square grid of elevation samples.
///
/// Samples are stored row-major with index `x * resolution + y`, the same
/// layout the erosion cell buffers use, so converting between the two is a
/// straight copy.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    resolution: usize,
    data: Vec<f32>,
}

/// Summary statistics of a height field
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub std_dev: f64,
}

impl HeightField {
    /// Flat field of zeros.
    pub fn new(resolution: usize) -> Self {
        Self::new_with(resolution, 0.0)
    }

    pub fn new_with(resolution: usize, value: f32) -> Self {
        Self {
            resolution,
            data: vec![value; resolution * resolution],
        }
    }

    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(resolution * resolution);
        for x in 0..resolution {
            for y in 0..resolution {
                data.push(f(x, y));
            }
        }
        Self { resolution, data }
    }

    /// Wrap existing samples. `data.len()` must equal `resolution²`.
    pub fn from_vec(resolution: usize, data: Vec<f32>) -> Result<Self, crate::error::ConfigError> {
        let expected = resolution * resolution;
        if data.len() != expected {
            return Err(crate::error::ConfigError::SampleCountMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { resolution, data })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.resolution && y < self.resolution);
        x * self.resolution + y
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut f32 {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &f32)> {
        let resolution = self.resolution;
        self.data.iter().enumerate().map(move |(idx, val)| {
            (idx / resolution, idx % resolution, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut f32)> {
        let resolution = self.resolution;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            (idx / resolution, idx % resolution, val)
        })
    }

    /// Smallest and largest sample. An empty field reports `(0.0, 0.0)`.
    pub fn min_max(&self) -> (f32, f32) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        let mut min_h = f32::MAX;
        let mut max_h = f32::MIN;
        for &h in &self.data {
            if h < min_h { min_h = h; }
            if h > max_h { max_h = h; }
        }
        (min_h, max_h)
    }

    /// Rescale samples so the minimum becomes 0 and the maximum 1.
    ///
    /// A constant field is left untouched; returns whether rescaling happened.
    pub fn normalize(&mut self) -> bool {
        let (min_h, max_h) = self.min_max();
        normalize_with(&mut self.data, min_h, max_h)
    }

    pub fn stats(&self) -> HeightStats {
        let (min, max) = self.min_max();
        let count = self.data.len().max(1) as f64;
        let mean = self.data.iter().map(|&h| h as f64).sum::<f64>() / count;
        let variance = self.data
            .iter()
            .map(|&h| {
                let diff = h as f64 - mean;
                diff * diff
            })
            .sum::<f64>() / count;

        HeightStats {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Count samples per equal-width bin between min and max.
    pub fn histogram(&self, num_bins: usize) -> Vec<usize> {
        let num_bins = num_bins.max(1);
        let (min_h, max_h) = self.min_max();
        let range = max_h - min_h;
        let mut bins = vec![0usize; num_bins];
        for &h in &self.data {
            let bin_idx = if range > 0.0 {
                (((h - min_h) / range) * num_bins as f32) as usize
            } else {
                0
            };
            bins[bin_idx.min(num_bins - 1)] += 1;
        }
        bins
    }

    /// Log a histogram of height values for debugging.
    pub fn print_histogram(&self, num_bins: usize) {
        let num_bins = num_bins.clamp(5, 50);
        let stats = self.stats();
        let bins = self.histogram(num_bins);
        let bin_width = (stats.max - stats.min) / num_bins as f32;
        let max_bin = bins.iter().copied().max().unwrap_or(1).max(1);
        let count = self.data.len().max(1);
        let bar_max_width = 50;

        log::info!(
            "Heights: min {:.4}  max {:.4}  mean {:.4}  std dev {:.4}",
            stats.min, stats.max, stats.mean, stats.std_dev
        );
        for (i, &bin_count) in bins.iter().enumerate() {
            let bin_start = stats.min + i as f32 * bin_width;
            let bar_len = bin_count * bar_max_width / max_bin;
            log::info!(
                "  {:>7.4} - {:>7.4} │{:<50}│{:>5.1}%",
                bin_start,
                bin_start + bin_width,
                "█".repeat(bar_len),
                100.0 * bin_count as f64 / count as f64
            );
        }
    }
}

/// Map `[min, max]` onto `[0, 1]` in place, skipping a constant range.
pub(crate) fn normalize_with(values: &mut [f32], min_h: f32, max_h: f32) -> bool {
    let range = max_h - min_h;
    if !(range > 0.0) {
        return false;
    }
    for v in values.iter_mut() {
        *v = (*v - min_h) / range;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_x_major() {
        let field = HeightField::from_fn(3, |x, y| (x * 10 + y) as f32);
        assert_eq!(field.as_slice()[1 * 3 + 2], 12.0);
        assert_eq!(field.get(2, 0), 20.0);

        let coords: Vec<(usize, usize)> = field.iter().map(|(x, y, _)| (x, y)).take(4).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (0, 2), (1, 0)]);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(HeightField::from_vec(3, vec![0.0; 9]).is_ok());
        assert!(HeightField::from_vec(3, vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_normalize_maps_to_unit_range() {
        let mut field = HeightField::from_fn(5, |x, y| (x as f32 - 2.0) * 3.0 + y as f32);
        assert!(field.normalize());
        let (min_h, max_h) = field.min_max();
        assert_eq!(min_h, 0.0);
        assert_eq!(max_h, 1.0);
    }

    #[test]
    fn test_normalize_skips_constant_field() {
        let mut field = HeightField::new_with(4, 0.25);
        assert!(!field.normalize());
        assert!(field.as_slice().iter().all(|&h| h == 0.25));
    }

    #[test]
    fn test_stats_and_histogram() {
        let field = HeightField::from_fn(2, |x, y| (x * 2 + y) as f32);
        let stats = field.stats();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 1.5).abs() < 1e-9);

        let bins = field.histogram(4);
        assert_eq!(bins.iter().sum::<usize>(), 4);
        assert_eq!(bins, vec![1, 1, 1, 1]);
    }
}

//! Conversions between 8-bit grayscale pixels and bitplanes.

/// How a gray value is compared against the threshold level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// `value > level` is a set bit
    #[default]
    Strict,

    /// `value >= level` is a set bit
    Inclusive,
}

/// Binarization threshold.
///
/// The two modes disagree on pixels exactly at `level`, so files produced
/// with different modes are not bit-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub level: u8,
    pub mode: ThresholdMode,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            level: 128,
            mode: ThresholdMode::Strict,
        }
    }
}

impl Threshold {
    pub fn strict(level: u8) -> Self {
        Self { level, mode: ThresholdMode::Strict }
    }

    pub fn inclusive(level: u8) -> Self {
        Self { level, mode: ThresholdMode::Inclusive }
    }

    #[inline]
    pub fn is_set(&self, value: u8) -> bool {
        match self.mode {
            ThresholdMode::Strict => value > self.level,
            ThresholdMode::Inclusive => value >= self.level,
        }
    }
}

/// Derive a bitplane from row-major grayscale pixels
pub fn binarize(gray: &[u8], threshold: Threshold) -> Vec<u8> {
    gray.iter().map(|&v| threshold.is_set(v) as u8).collect()
}

/// Expand a bitplane back to grayscale, set bits becoming white
pub fn to_grayscale(bits: &[u8]) -> Vec<u8> {
    bits.iter().map(|&b| if b != 0 { 0xFF } else { 0x00 }).collect()
}

/// How many source frames to advance per kept frame when resampling
/// `source_fps` down to `target_fps`. Never less than 1.
pub fn sampling_stride(source_fps: f64, target_fps: u32) -> usize {
    if target_fps == 0 || !source_fps.is_finite() {
        return 1;
    }

    let stride = (source_fps / target_fps as f64).round();
    if stride < 1.0 {
        1
    } else {
        stride as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_modes_differ_at_level() {
        let gray = [0, 127, 128, 129, 255];
        assert_eq!(binarize(&gray, Threshold::strict(128)), vec![0, 0, 0, 1, 1]);
        assert_eq!(binarize(&gray, Threshold::inclusive(128)), vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn default_is_strict_128() {
        assert_eq!(Threshold::default(), Threshold::strict(128));
    }

    #[test]
    fn grayscale_expansion() {
        assert_eq!(to_grayscale(&[1, 0, 1]), vec![255, 0, 255]);
    }

    #[test]
    fn stride() {
        assert_eq!(sampling_stride(30.0, 10), 3);
        assert_eq!(sampling_stride(29.97, 10), 3);
        assert_eq!(sampling_stride(25.0, 10), 3);
        assert_eq!(sampling_stride(24.0, 10), 2);
        assert_eq!(sampling_stride(5.0, 10), 1);
        assert_eq!(sampling_stride(30.0, 0), 1);
    }
}

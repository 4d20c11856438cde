//! Run-wide tracker configuration.

use crate::camera::AspectRatio;
use crate::search::MatchConfig;
use crate::util::{FollowCamError, FollowCamResult};

/// Parameters fixed for one tracking run.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Reduction factor applied to frames and templates before matching.
    pub scale: f32,
    /// Fraction of the remaining distance the camera moves per frame.
    pub smoothing: f64,
    /// Minimum ZNCC score accepted as a detection.
    pub match_threshold: f32,
    /// Output frame width.
    pub output_width: u32,
    /// Output frame height.
    pub output_height: u32,
    /// Crop aspect ratio.
    pub aspect: AspectRatio,
    /// Preview every n-th frame (0 disables the preview).
    pub preview_every: u64,
    /// Report progress every n-th frame (0 disables reports).
    pub progress_every: u64,
    /// Matcher tuning.
    pub matcher: MatchConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            scale: 0.25,
            smoothing: 0.15,
            match_threshold: 0.70,
            output_width: 1080,
            output_height: 1920,
            aspect: AspectRatio::PORTRAIT_9_16,
            preview_every: 2,
            progress_every: 30,
            matcher: MatchConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Checks every field once at startup.
    pub fn validate(&self) -> FollowCamResult<()> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(FollowCamError::InvalidConfig("scale must be in (0, 1]"));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(FollowCamError::InvalidConfig(
                "smoothing factor must be in (0, 1]",
            ));
        }
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(FollowCamError::InvalidConfig(
                "match threshold must be in [-1, 1]",
            ));
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(FollowCamError::InvalidDimensions {
                width: self.output_width as usize,
                height: self.output_height as usize,
            });
        }
        if self.aspect.num == 0 || self.aspect.den == 0 {
            return Err(FollowCamError::InvalidConfig(
                "aspect ratio terms must be non-zero",
            ));
        }
        if !(self.matcher.min_var_i >= 0.0) {
            return Err(FollowCamError::InvalidConfig("min_var_i must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TrackerConfig;
    use crate::camera::AspectRatio;
    use crate::util::FollowCamError;

    #[test]
    fn defaults_are_valid() {
        let cfg = TrackerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.scale, 0.25);
        assert_eq!(cfg.smoothing, 0.15);
        assert_eq!(cfg.match_threshold, 0.70);
        assert_eq!((cfg.output_width, cfg.output_height), (1080, 1920));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad = [
            TrackerConfig {
                scale: 0.0,
                ..TrackerConfig::default()
            },
            TrackerConfig {
                smoothing: 1.5,
                ..TrackerConfig::default()
            },
            TrackerConfig {
                match_threshold: 1.2,
                ..TrackerConfig::default()
            },
            TrackerConfig {
                aspect: AspectRatio { num: 9, den: 0 },
                ..TrackerConfig::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(
                cfg.validate(),
                Err(FollowCamError::InvalidConfig(_))
            ));
        }

        let no_output = TrackerConfig {
            output_width: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            no_output.validate(),
            Err(FollowCamError::InvalidDimensions { .. })
        ));
    }
}

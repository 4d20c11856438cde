//! Virtual camera: smoothed horizontal position and the crop it implies.

pub mod crop;

pub use crop::{render_crop, AspectRatio, CropGeometry, CropWindow};

use crate::util::{FollowCamError, FollowCamResult};

/// Horizontal camera center in full-resolution pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// Center x of the crop window.
    pub x: f64,
}

impl CameraState {
    /// Camera at an explicit position.
    pub fn at(x: f64) -> Self {
        Self { x }
    }

    /// Camera at the horizontal midpoint of a frame.
    pub fn centered(frame_width: u32) -> Self {
        Self {
            x: f64::from(frame_width) / 2.0,
        }
    }
}

/// First-order exponential smoothing of the camera position.
#[derive(Clone, Copy, Debug)]
pub struct CameraSmoother {
    factor: f64,
}

impl CameraSmoother {
    /// Creates a smoother; `factor` must lie in `(0, 1]`.
    pub fn new(factor: f64) -> FollowCamResult<Self> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(FollowCamError::InvalidConfig(
                "smoothing factor must be in (0, 1]",
            ));
        }
        Ok(Self { factor })
    }

    /// Returns the smoothing factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Advances the camera one frame.
    ///
    /// With a target the camera moves `factor` of the remaining distance and
    /// never crosses the target. Without one (lost frame) it holds position.
    pub fn step(&self, state: CameraState, target: Option<f64>) -> CameraState {
        let Some(target) = target else {
            return state;
        };
        let next = state.x + (target - state.x) * self.factor;
        if (target - state.x) * (target - next) < 0.0 {
            CameraState::at(target)
        } else {
            CameraState::at(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraSmoother, CameraState};
    use rand::Rng;

    #[test]
    fn holds_when_lost() {
        let smoother = CameraSmoother::new(0.15).unwrap();
        let mut state = CameraState::at(500.0);
        for _ in 0..10 {
            state = smoother.step(state, None);
            assert_eq!(state.x, 500.0);
        }
    }

    #[test]
    fn converges_monotonically_without_overshoot() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let factor = rng.random_range(0.01..=1.0);
            let smoother = CameraSmoother::new(factor).unwrap();
            let target = rng.random_range(-2000.0..4000.0);
            let mut state = CameraState::at(rng.random_range(-2000.0..4000.0));
            let mut dist = (target - state.x).abs();
            for _ in 0..100 {
                let next = smoother.step(state, Some(target));
                let next_dist = (target - next.x).abs();
                assert!(next_dist <= dist);
                assert!((next.x - state.x) * (target - state.x) >= 0.0);
                assert!((target - next.x) * (target - state.x) >= 0.0);
                state = next;
                dist = next_dist;
            }
        }
    }

    #[test]
    fn unit_factor_snaps_to_target() {
        let smoother = CameraSmoother::new(1.0).unwrap();
        let state = smoother.step(CameraState::at(12.5), Some(800.25));
        assert_eq!(state.x, 800.25);
    }

    #[test]
    fn single_step_matches_formula() {
        let smoother = CameraSmoother::new(0.15).unwrap();
        let state = smoother.step(CameraState::at(960.0), Some(432.0));
        assert!((state.x - (960.0 - 528.0 * 0.15)).abs() < 1e-9);
    }

    #[test]
    fn factor_is_validated() {
        assert!(CameraSmoother::new(0.0).is_err());
        assert!(CameraSmoother::new(1.01).is_err());
        assert!(CameraSmoother::new(f64::NAN).is_err());
    }

    #[test]
    fn centered_uses_midpoint() {
        assert_eq!(CameraState::centered(1920).x, 960.0);
    }
}

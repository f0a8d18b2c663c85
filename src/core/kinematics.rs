//! Drift-corrected double integration from acceleration to position.
//!
//! Inertial-only dead reckoning accumulates unbounded error, so velocity and
//! position are forced back to zero on two independent cadences. An
//! interval of 0 disables that reset.

use crate::source::types::{norm, Vec3};
use serde::{Deserialize, Serialize};

/// Integration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Fixed time step between samples in seconds
    pub delta_t: f64,
    /// Velocity is zeroed at every multiple of this sample index (0 = never)
    pub velocity_reset_interval: usize,
    /// Position is zeroed at every multiple of this sample index (0 = never)
    pub displacement_reset_interval: usize,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            delta_t: 0.01,
            velocity_reset_interval: 20,
            displacement_reset_interval: 20,
        }
    }
}

impl KinematicsConfig {
    /// The larger of the two reset intervals.
    pub fn max_reset_interval(&self) -> usize {
        self.velocity_reset_interval
            .max(self.displacement_reset_interval)
    }
}

/// Velocity and position at one sample of the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    /// Index of the sample within the integrated window
    pub index: usize,
    pub velocity: Vec3,
    pub position: Vec3,
    /// `‖velocity‖`, diagnostic only
    pub velocity_magnitude: f64,
    /// `‖position‖`, diagnostic only
    pub position_magnitude: f64,
}

impl KinematicState {
    fn new(index: usize, velocity: Vec3, position: Vec3) -> Self {
        Self {
            index,
            velocity,
            position,
            velocity_magnitude: norm(&velocity),
            position_magnitude: norm(&position),
        }
    }
}

/// Semi-implicit Euler double integrator with periodic resets.
#[derive(Debug, Clone)]
pub struct Integrator {
    config: KinematicsConfig,
}

impl Integrator {
    pub fn new(config: KinematicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KinematicsConfig {
        &self.config
    }

    /// Integrate a conditioned acceleration series.
    ///
    /// ```text
    /// v[i] = v[i-1] + a[i]·dt
    /// p[i] = p[i-1] + v[i-1]·dt + ½·a[i]·dt²
    /// ```
    ///
    /// Index 0 is the zero state. Returns one state per input sample.
    pub fn integrate(&self, acc: &[Vec3]) -> Vec<KinematicState> {
        let mut states = Vec::with_capacity(acc.len());
        if acc.is_empty() {
            return states;
        }

        let dt = self.config.delta_t;
        let mut velocity = [0.0; 3];
        let mut position = [0.0; 3];
        states.push(KinematicState::new(0, velocity, position));

        for (i, a) in acc.iter().enumerate().skip(1) {
            let prev_velocity = velocity;

            if is_reset_point(i, self.config.velocity_reset_interval) {
                velocity = [0.0; 3];
            } else {
                for axis in 0..3 {
                    velocity[axis] = prev_velocity[axis] + a[axis] * dt;
                }
            }

            if is_reset_point(i, self.config.displacement_reset_interval) {
                position = [0.0; 3];
            } else {
                for axis in 0..3 {
                    position[axis] +=
                        prev_velocity[axis] * dt + 0.5 * a[axis] * dt * dt;
                }
            }

            states.push(KinematicState::new(i, velocity, position));
        }

        states
    }
}

fn is_reset_point(index: usize, interval: usize) -> bool {
    interval != 0 && index % interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator(vri: usize, dri: usize) -> Integrator {
        Integrator::new(KinematicsConfig {
            delta_t: 0.01,
            velocity_reset_interval: vri,
            displacement_reset_interval: dri,
        })
    }

    #[test]
    fn test_empty_input() {
        assert!(integrator(20, 20).integrate(&[]).is_empty());
    }

    #[test]
    fn test_constant_acceleration_without_resets() {
        let acc = vec![[1.0, 0.0, 0.0]; 11];
        let states = integrator(0, 0).integrate(&acc);

        assert_eq!(states.len(), 11);
        assert_eq!(states[0].velocity, [0.0; 3]);
        // Ten steps of 1 m/s² at 10 ms.
        assert!((states[10].velocity[0] - 0.1).abs() < 1e-12);
        // p = Σ (v[i-1]·dt + ½·dt²) = dt²·(45 + 5)
        assert!((states[10].position[0] - 0.005).abs() < 1e-12);
        assert!((states[10].velocity_magnitude - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_resets_independently() {
        let acc = vec![[2.0, -1.0, 0.5]; 50];
        let states = integrator(7, 0).integrate(&acc);

        for state in &states {
            if state.index % 7 == 0 {
                assert_eq!(state.velocity, [0.0; 3]);
            } else {
                assert_ne!(state.velocity, [0.0; 3]);
            }
        }
        // Position keeps accumulating across velocity resets.
        assert!(states[49].position[0] > states[20].position[0]);
    }

    #[test]
    fn test_position_resets_independently() {
        let acc = vec![[2.0, -1.0, 0.5]; 50];
        let states = integrator(0, 10).integrate(&acc);

        for state in &states {
            if state.index % 10 == 0 {
                assert_eq!(state.position, [0.0; 3]);
                assert_eq!(state.position_magnitude, 0.0);
            }
        }
        // Velocity is untouched by position resets.
        assert!((states[49].velocity[0] - 0.98).abs() < 1e-9);
    }

    #[test]
    fn test_max_reset_interval() {
        let config = KinematicsConfig {
            delta_t: 0.01,
            velocity_reset_interval: 10,
            displacement_reset_interval: 150,
        };
        assert_eq!(config.max_reset_interval(), 150);
    }
}

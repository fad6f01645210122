//! Camera and frame-navigation state
//!
//! All per-frame input arrives as an [`InputSnapshot`] and is applied to a
//! [`ViewState`] owned by the frame loop.

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::collections::HashSet;
use std::f32::consts::PI;

use crate::scene::Trigger;

/// Pitch is kept strictly inside ±90° so the look-at basis stays defined.
pub const PITCH_LIMIT: f32 = 0.49 * PI;

/// Radians per pixel of mouse movement
pub const MOUSE_SENSITIVITY: f32 = 0.005;

/// Keyboard rotation speed in radians per second
pub const ROTATION_SPEED: f32 = PI * 0.5;

/// Camera speed as a fraction of the largest scene dimension, per second
pub const MOVE_SPEED_FACTOR: f32 = 0.35;

/// Vertical field of view
pub const FOV_Y: f32 = PI / 4.0;

/// Keys the view reacts to while held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    RotateLeft,
    RotateRight,
    RotateUp,
    RotateDown,
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    StepBack,
    StepForward,
    FastBack,
    FastForward,
}

/// Everything the window system reported for one frame
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub held: HashSet<Key>,
    /// Cursor movement in pixels (x right, y down)
    pub mouse_delta: Option<(f32, f32)>,
    /// Scroll wheel notches, positive forward
    pub scroll: f32,
    /// Visibility trigger asserted this frame
    pub trigger: Option<Trigger>,
}

impl InputSnapshot {
    /// Snapshot with the given keys held
    pub fn holding(keys: &[Key]) -> Self {
        Self {
            held: keys.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}

/// Camera pose plus the simulation step being shown
#[derive(Debug, Clone)]
pub struct ViewState {
    pub position: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    pub step: u64,
    move_speed: f32,
    scene_max_dim: f32,
}

impl ViewState {
    /// Start at the default pose for a scene of the given extent.
    pub fn new(scene_extent: [f32; 3]) -> Self {
        let scene_max_dim = scene_extent.iter().copied().fold(1.0f32, f32::max);
        Self {
            position: Point3::new(0.0, 0.0, 3.0),
            yaw: 0.0,
            pitch: 0.0,
            step: 0,
            move_speed: MOVE_SPEED_FACTOR * scene_max_dim,
            scene_max_dim,
        }
    }

    /// Unit view direction from yaw and pitch
    pub fn front(&self) -> Vector3<f32> {
        Vector3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Steps skipped by a fast-forward / fast-back
    pub fn fast_step(total_steps: u64) -> u64 {
        1 + total_steps / 100
    }

    /// Apply one frame of input. `dt` is the frame duration in seconds.
    pub fn update(&mut self, input: &InputSnapshot, dt: f32, total_steps: u64) {
        if let Some((dx, dy)) = input.mouse_delta {
            self.yaw += dx * MOUSE_SENSITIVITY;
            self.pitch -= dy * MOUSE_SENSITIVITY;
        }

        if input.is_held(Key::RotateLeft) {
            self.yaw -= dt * ROTATION_SPEED;
        } else if input.is_held(Key::RotateRight) {
            self.yaw += dt * ROTATION_SPEED;
        }
        if input.is_held(Key::RotateUp) {
            self.pitch += dt * ROTATION_SPEED;
        } else if input.is_held(Key::RotateDown) {
            self.pitch -= dt * ROTATION_SPEED;
        }
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let up = Vector3::y();
        let front = self.front();
        let right = front.cross(&up).normalize();
        let camera_up = right.cross(&front).normalize();
        let distance = self.move_speed * dt;

        if input.is_held(Key::Forward) {
            self.position += front * distance;
        } else if input.is_held(Key::Back) {
            self.position -= front * distance;
        }
        if input.is_held(Key::Left) {
            self.position -= right * distance;
        } else if input.is_held(Key::Right) {
            self.position += right * distance;
        }
        if input.is_held(Key::Up) {
            self.position += camera_up * distance;
        } else if input.is_held(Key::Down) {
            self.position -= camera_up * distance;
        }

        let fast = Self::fast_step(total_steps);
        if input.is_held(Key::StepBack) {
            self.step = self.step.saturating_sub(1);
        } else if input.is_held(Key::StepForward) {
            self.step += 1;
        }
        if input.is_held(Key::FastBack) {
            if self.step >= fast {
                self.step -= fast;
            }
        } else if input.is_held(Key::FastForward) {
            self.step += fast;
        }

        let notches = input.scroll.trunc() as i64;
        if notches != 0 {
            let target = self.step as i64 + notches * fast as i64;
            if target >= 0 {
                self.step = target as u64;
            }
        }
    }

    /// Projection × look-at for a viewport of the given aspect ratio
    pub fn view_projection(&self, aspect: f32) -> Matrix4<f32> {
        let target = self.position + self.front();
        let view = Matrix4::look_at_rh(&self.position, &target, &Vector3::y());
        let projection = Perspective3::new(aspect, FOV_Y, 1.0, 2.0 * self.scene_max_dim);
        projection.to_homogeneous() * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_is_clamped() {
        let mut view = ViewState::new([512.0, 512.0, 256.0]);
        view.update(&InputSnapshot::holding(&[Key::RotateUp]), 10.0, 0);
        assert!((view.pitch - PITCH_LIMIT).abs() < 1e-6);

        view.update(&InputSnapshot::holding(&[Key::RotateDown]), 20.0, 0);
        assert!((view.pitch + PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn test_forward_uses_scene_scale() {
        let mut view = ViewState::new([100.0, 50.0, 20.0]);
        let start = view.position;
        view.update(&InputSnapshot::holding(&[Key::Forward]), 1.0, 0);
        let moved = (view.position - start).norm();
        assert!((moved - 35.0).abs() < 1e-3);
    }

    #[test]
    fn test_step_never_negative() {
        let mut view = ViewState::new([10.0; 3]);
        view.update(&InputSnapshot::holding(&[Key::StepBack]), 0.02, 1000);
        assert_eq!(view.step, 0);
        view.update(&InputSnapshot::holding(&[Key::FastBack]), 0.02, 1000);
        assert_eq!(view.step, 0);

        let scroll_back = InputSnapshot {
            scroll: -1.0,
            ..Default::default()
        };
        view.update(&scroll_back, 0.02, 1000);
        assert_eq!(view.step, 0);
    }

    #[test]
    fn test_fast_step_scales_with_length() {
        assert_eq!(ViewState::fast_step(0), 1);
        assert_eq!(ViewState::fast_step(250), 3);

        let mut view = ViewState::new([10.0; 3]);
        view.update(&InputSnapshot::holding(&[Key::FastForward]), 0.02, 1000);
        assert_eq!(view.step, 11);

        let scroll = InputSnapshot {
            scroll: 2.0,
            ..Default::default()
        };
        view.update(&scroll, 0.02, 1000);
        assert_eq!(view.step, 33);
    }

    #[test]
    fn test_view_projection_is_finite() {
        let view = ViewState::new([512.0, 512.0, 256.0]);
        let m = view.view_projection(4.0 / 3.0);
        assert!(m.iter().all(|v| v.is_finite()));
    }
}

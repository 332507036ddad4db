//! Orbit controls.
//!
//! The camera circles a target point on a sphere. Dragging with the left mouse
//! button (or one finger) changes the azimuth and polar angle, the wheel,
//! a middle-button drag or a two-finger pinch change the radius, and the right
//! button pans the target over the ground plane if panning is enabled. Input
//! only accumulates pending motion; [`OrbitController::update`] applies it once
//! per frame, with damping if configured.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Point3, Rad, Vector2, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
};

use crate::{
    camera::{Camera, Framing},
    config::OrbitConfig,
};

const EPS: f32 = 1e-6;
/// Pixels of a high-precision scroll that count as one wheel notch.
const PIXELS_PER_LINE: f64 = 100.0;

/// Camera offset from the target in spherical coordinates, +Y up.
///
/// `phi` is the polar angle from +Y, `theta` the azimuth around Y measured
/// from +Z towards +X.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius <= EPS {
            return Self::default();
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps the camera off the poles where the view matrix degenerates.
    fn make_safe(mut self) -> Self {
        self.phi = self.phi.max(EPS).min(PI - EPS);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    None,
    Rotate,
    Dolly,
    Pan,
}

#[derive(Debug)]
pub struct OrbitController {
    config: OrbitConfig,
    fovy: Rad<f32>,
    target: Point3<f32>,
    viewport_height: f32,
    // pending motion, consumed by `update`
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pending_pan: Vector2<f32>,
    pan_offset: Vector3<f32>,
    // input state
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
    // at most two fingers: one orbits, two pinch
    touches: Vec<(u64, PhysicalPosition<f64>)>,
}

impl OrbitController {
    pub fn new(config: OrbitConfig, fovy: impl Into<Rad<f32>>, target: Point3<f32>) -> Self {
        Self {
            config,
            fovy: fovy.into(),
            target,
            viewport_height: 1.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pending_pan: Vector2::zero(),
            pan_offset: Vector3::zero(),
            drag: Drag::None,
            cursor: None,
            touches: Vec::with_capacity(2),
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, _width: u32, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Orbits around the up axis; positive angles move the camera to the left.
    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    /// Positive angles move the camera up towards the pole.
    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Moves the camera towards the target by `scale` (< 1 zooms in).
    pub fn dolly(&mut self, scale: f32) {
        if scale > 0.0 && scale.is_finite() {
            self.scale *= scale;
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.config.zoom_speed)
    }

    /// Pans by a screen-space drag of `dx`/`dy` pixels. Ignored unless
    /// panning is enabled.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if self.config.enable_pan {
            self.pending_pan += Vector2::new(dx, dy);
        }
    }

    fn rotate_by_pixels(&mut self, dx: f64, dy: f64) {
        let per_pixel = TAU / self.viewport_height * self.config.rotate_speed;
        self.rotate_left(dx as f32 * per_pixel);
        self.rotate_up(dy as f32 * per_pixel);
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.drag = match (button, pressed) {
            (MouseButton::Left, true) => Drag::Rotate,
            (MouseButton::Middle, true) => Drag::Dolly,
            (MouseButton::Right, true) if self.config.enable_pan => Drag::Pan,
            (_, false) => Drag::None,
            _ => self.drag,
        };
    }

    pub fn on_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if let Some(last) = self.cursor {
            let (dx, dy) = (position.x - last.x, position.y - last.y);
            match self.drag {
                Drag::Rotate => self.rotate_by_pixels(dx, dy),
                // dragging down moves away from the target
                Drag::Dolly if dy > 0.0 => self.dolly(1.0 / self.zoom_scale()),
                Drag::Dolly if dy < 0.0 => self.dolly(self.zoom_scale()),
                Drag::Dolly => (),
                Drag::Pan => self.pan(dx as f32, dy as f32),
                Drag::None => (),
            }
        }
        self.cursor = Some(position);
    }

    /// `lines > 0` scrolls away from the user, which zooms in.
    pub fn on_scroll(&mut self, lines: f32) {
        if lines > 0.0 {
            self.dolly(self.zoom_scale());
        } else if lines < 0.0 {
            self.dolly(1.0 / self.zoom_scale());
        }
    }

    /// One finger orbits, two fingers dolly by the change of their distance.
    /// Further fingers are ignored.
    pub fn on_touch(&mut self, touch: &Touch) {
        let slot = self.touches.iter().position(|(id, _)| *id == touch.id);
        match (touch.phase, slot) {
            (TouchPhase::Started, None) if self.touches.len() < 2 => {
                self.touches.push((touch.id, touch.location))
            }
            (TouchPhase::Moved, Some(slot)) => {
                let last = self.touches[slot].1;
                let other = self
                    .touches
                    .iter()
                    .find(|(id, _)| *id != touch.id)
                    .map(|(_, position)| *position);
                match other {
                    None => {
                        self.rotate_by_pixels(touch.location.x - last.x, touch.location.y - last.y)
                    }
                    Some(other) => {
                        let before = finger_distance(last, other);
                        let after = finger_distance(touch.location, other);
                        if before > 0.0 && after > 0.0 {
                            // spreading the fingers zooms in
                            self.dolly((before / after).powf(self.config.zoom_speed));
                        }
                    }
                }
                self.touches[slot].1 = touch.location;
            }
            (TouchPhase::Ended | TouchPhase::Cancelled, Some(slot)) => {
                self.touches.remove(slot);
            }
            _ => (),
        }
    }

    /// Feeds a window event into the controller. Returns true if the event
    /// was relevant to it.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.set_viewport(size.width, size.height);
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(*position);
                self.drag != Drag::None
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.on_scroll(lines);
                true
            }
            WindowEvent::Touch(touch) => {
                self.on_touch(touch);
                true
            }
            _ => false,
        }
    }

    fn resolve_pan(&mut self, camera: &Camera) {
        if self.pending_pan.is_zero() {
            return;
        }
        let pixels = std::mem::replace(&mut self.pending_pan, Vector2::zero());
        let offset = camera.position - self.target;
        let half_height = offset.magnitude() * (self.fovy.0 / 2.0).tan();
        let forward = -offset;
        let right = forward.cross(camera.up);
        if right.magnitude2() <= EPS {
            return;
        }
        let right = right.normalize();
        // along the ground plane, not the screen plane
        let ground_forward = camera.up.cross(right);
        let world_per_pixel = 2.0 * half_height / self.viewport_height * self.config.pan_speed;
        self.pan_offset += -right * (pixels.x * world_per_pixel)
            + ground_forward * (pixels.y * world_per_pixel);
    }

    /// Applies pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        self.resolve_pan(camera);

        let step = if self.config.enable_damping {
            self.config.damping_factor.max(0.0).min(1.0)
        } else {
            1.0
        };

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        spherical.theta += self.delta_theta * step;
        spherical.phi += self.delta_phi * step;
        spherical.phi = spherical
            .phi
            .max(self.config.min_polar_angle)
            .min(self.config.max_polar_angle);
        spherical = spherical.make_safe();
        spherical.radius = (spherical.radius * self.scale)
            .max(self.config.min_distance)
            .min(self.config.max_distance);

        self.target += self.pan_offset * step;

        let position = self.target + spherical.to_offset();
        let moved = (position - camera.position).magnitude2() > EPS || camera.target != self.target;
        camera.position = position;
        camera.look_at(self.target);

        let keep = 1.0 - step;
        self.delta_theta *= keep;
        self.delta_phi *= keep;
        self.pan_offset *= keep;
        self.scale = 1.0;

        moved
    }

    /// Puts camera and orbit target onto `framing` and drops pending motion.
    pub fn frame(&mut self, camera: &mut Camera, framing: &Framing) {
        framing.apply(camera);
        self.target = framing.target;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pending_pan = Vector2::zero();
        self.pan_offset = Vector3::zero();
    }

    /// True while damped motion is still being played out.
    pub fn is_settling(&self) -> bool {
        self.delta_theta.abs() > EPS
            || self.delta_phi.abs() > EPS
            || self.pan_offset.magnitude2() > EPS
    }
}

fn finger_distance(a: PhysicalPosition<f64>, b: PhysicalPosition<f64>) -> f32 {
    (a.x - b.x).hypot(a.y - b.y) as f32
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use cgmath::Deg;

    use super::*;

    fn undamped() -> OrbitConfig {
        OrbitConfig {
            enable_damping: false,
            ..Default::default()
        }
    }

    fn setup(config: OrbitConfig) -> (OrbitController, Camera) {
        let mut controller = OrbitController::new(config, Deg(75.0), Point3::new(0.0, 0.0, 0.0));
        controller.set_viewport(800, 600);
        (controller, Camera::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0]))
    }

    fn assert_close(a: Point3<f32>, b: Point3<f32>) {
        assert!((a - b).magnitude() < 1e-4, "{:?} != {:?}", a, b);
    }

    #[test]
    fn spherical_round_trips_offsets() {
        let offset = Vector3::new(3.0, 4.0, -5.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!((back - offset).magnitude() < 1e-5);
    }

    #[test]
    fn rotating_left_orbits_around_the_target() {
        let (mut controller, mut camera) = setup(undamped());
        controller.rotate_left(FRAC_PI_2);
        assert!(controller.update(&mut camera));
        assert_close(camera.position, Point3::new(-10.0, 0.0, 0.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        // nothing pending, nothing moves
        assert!(!controller.update(&mut camera));
    }

    #[test]
    fn camera_never_goes_below_the_horizon() {
        let (mut controller, mut camera) = setup(undamped());
        camera.position = Point3::new(0.0, 10.0 * FRAC_PI_4.cos(), 10.0 * FRAC_PI_4.sin());
        controller.rotate_up(-2.0);
        controller.update(&mut camera);
        let phi = Spherical::from_offset(camera.position - camera.target).phi;
        assert!(phi <= FRAC_PI_2 + 1e-5, "{phi}");
        assert!(camera.position.y >= -1e-4);
        assert!(((camera.position - camera.target).magnitude() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn damping_spreads_motion_over_frames() {
        let (mut controller, mut camera) = setup(OrbitConfig::default());
        controller.rotate_left(-1.0);
        controller.update(&mut camera);
        let theta = Spherical::from_offset(camera.position - camera.target).theta;
        assert!((theta - 0.25).abs() < 1e-5, "{theta}");
        assert!(controller.is_settling());

        for _ in 0..80 {
            controller.update(&mut camera);
        }
        let theta = Spherical::from_offset(camera.position - camera.target).theta;
        assert!((theta - 1.0).abs() < 1e-4, "{theta}");
        assert!(!controller.is_settling());
    }

    #[test]
    fn dragging_rotates_by_viewport_height() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_cursor_moved(PhysicalPosition::new(100.0, 100.0));
        controller.on_mouse_button(MouseButton::Left, true);
        // a drag over a quarter of the viewport height turns a quarter circle
        controller.on_cursor_moved(PhysicalPosition::new(250.0, 100.0));
        controller.on_mouse_button(MouseButton::Left, false);
        controller.on_cursor_moved(PhysicalPosition::new(400.0, 100.0));
        controller.update(&mut camera);
        assert_close(camera.position, Point3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn scrolling_changes_the_distance() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_scroll(1.0);
        controller.update(&mut camera);
        assert!(((camera.position - camera.target).magnitude() - 9.5).abs() < 1e-4);
        controller.on_scroll(-1.0);
        controller.update(&mut camera);
        assert!(((camera.position - camera.target).magnitude() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn panning_is_off_by_default() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_cursor_moved(PhysicalPosition::new(0.0, 0.0));
        controller.on_mouse_button(MouseButton::Right, true);
        controller.on_cursor_moved(PhysicalPosition::new(50.0, 80.0));
        controller.pan(30.0, 30.0);
        controller.update(&mut camera);
        assert_eq!(controller.target(), Point3::new(0.0, 0.0, 0.0));
        assert_close(camera.position, Point3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn panning_stays_on_the_ground_plane() {
        let (mut controller, mut camera) = setup(OrbitConfig {
            enable_pan: true,
            ..undamped()
        });
        camera.position = Point3::new(0.0, 5.0, 5.0);
        controller.pan(40.0, 60.0);
        controller.update(&mut camera);
        let target = controller.target();
        assert!(target.y.abs() < 1e-5, "{:?}", target);
        // dragging right moves the target left, dragging down moves it away
        assert!(target.x < 0.0);
        assert!(target.z < 0.0);
    }

    #[test]
    fn framing_resets_target_and_pending_motion() {
        let (mut controller, mut camera) = setup(OrbitConfig::default());
        controller.rotate_left(1.0);
        let framing = Framing {
            target: Point3::new(1.0, 2.0, 3.0),
            position: Point3::new(1.0, 2.0, 40.0),
            distance: 40.0,
        };
        controller.frame(&mut camera, &framing);
        assert!(!controller.is_settling());
        assert_eq!(controller.target(), framing.target);
        controller.update(&mut camera);
        assert_close(camera.position, framing.position);
        assert_eq!(camera.target, framing.target);
    }

    fn finger(id: u64, phase: TouchPhase, x: f64) -> Touch {
        Touch {
            device_id: winit::event::DeviceId::dummy(),
            phase,
            location: PhysicalPosition::new(x, 10.0),
            force: None,
            id,
        }
    }

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).magnitude()
    }

    #[test]
    fn single_finger_orbits() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_touch(&finger(7, TouchPhase::Started, 0.0));
        controller.on_touch(&finger(7, TouchPhase::Moved, 150.0));
        controller.on_touch(&finger(7, TouchPhase::Ended, 150.0));
        controller.update(&mut camera);
        assert_close(camera.position, Point3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn pinching_dollies() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_touch(&finger(1, TouchPhase::Started, 100.0));
        controller.on_touch(&finger(2, TouchPhase::Started, 200.0));
        // fingers spread from 100 to 200 pixels apart
        controller.on_touch(&finger(2, TouchPhase::Moved, 300.0));
        controller.update(&mut camera);
        assert!((distance(&camera) - 5.0).abs() < 1e-4, "{}", distance(&camera));
        assert_close(camera.position, Point3::new(0.0, 0.0, 5.0));

        // a third finger is ignored, lifting one goes back to orbiting
        controller.on_touch(&finger(3, TouchPhase::Started, 0.0));
        controller.on_touch(&finger(3, TouchPhase::Moved, 600.0));
        controller.on_touch(&finger(2, TouchPhase::Ended, 300.0));
        controller.on_touch(&finger(1, TouchPhase::Moved, 250.0));
        controller.update(&mut camera);
        assert_close(camera.position, Point3::new(-5.0, 0.0, 0.0));
    }

    #[test]
    fn middle_drag_dollies() {
        let (mut controller, mut camera) = setup(undamped());
        controller.on_cursor_moved(PhysicalPosition::new(0.0, 0.0));
        controller.on_mouse_button(MouseButton::Middle, true);
        controller.on_cursor_moved(PhysicalPosition::new(0.0, 20.0));
        controller.update(&mut camera);
        assert!((distance(&camera) - 10.0 / 0.95).abs() < 1e-4);

        controller.on_cursor_moved(PhysicalPosition::new(0.0, 0.0));
        controller.on_mouse_button(MouseButton::Middle, false);
        controller.update(&mut camera);
        assert!((distance(&camera) - 10.0).abs() < 1e-4);
    }
}

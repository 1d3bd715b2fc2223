//! Per-frame instance animation
//!
//! Orbits the camera, spins the whole mesh, and nudges a bounded prefix of
//! the instance arena. Indices past the prefix are never touched.

use crate::math::{wrap_angle, wrap_euler, Vec3};
use crate::params::StressParameters;
use crate::scene::Scene;
use std::ops::Range;

const ORBIT_RADIUS: f32 = 10.0;
const MESH_SPIN_X: f32 = 0.0015;
const MESH_SPIN_Y: f32 = 0.002;
const INSTANCE_DRIFT: f32 = 0.01;
const INSTANCE_SPIN_X: f32 = 0.01;
const INSTANCE_SPIN_Y: f32 = 0.008;

pub struct InstanceAnimator {
    speed: f32,
    subset: usize,
}

impl InstanceAnimator {
    pub fn new(params: &StressParameters) -> Self {
        Self {
            speed: params.speed,
            subset: params.animated_subset(),
        }
    }

    /// Size of the perturbed prefix.
    pub fn subset(&self) -> usize {
        self.subset
    }

    /// Scaled animation time for a wall-clock elapsed time.
    pub fn scaled_time(&self, elapsed_seconds: f64) -> f32 {
        (elapsed_seconds * f64::from(self.speed)) as f32
    }

    pub fn orbit_camera(&self, scene: &mut Scene, t: f32) {
        let camera = &mut scene.camera;
        camera.position.x = (t * 0.3).sin() * ORBIT_RADIUS;
        camera.position.y = (t * 0.2).cos() * ORBIT_RADIUS;
        camera.look_at(Vec3::ZERO);
    }

    pub fn spin_mesh(&self, scene: &mut Scene) {
        let r = &mut scene.mesh_rotation;
        r.x = wrap_angle(r.x + MESH_SPIN_X * self.speed);
        r.y = wrap_angle(r.y + MESH_SPIN_Y * self.speed);
    }

    /// Perturb the animated prefix and return the index range written.
    pub fn perturb(&self, scene: &mut Scene, t: f32) -> Range<usize> {
        let transforms = scene.instances.transforms_mut();
        let end = self.subset.min(transforms.len());
        for (i, transform) in transforms[..end].iter_mut().enumerate() {
            let fi = i as f32;
            transform.position.x += (t + fi).sin() * INSTANCE_DRIFT;
            transform.position.y += (t * 0.9 + fi * 0.5).cos() * INSTANCE_DRIFT;
            transform.rotation = wrap_euler(
                transform.rotation + Vec3::new(INSTANCE_SPIN_X, INSTANCE_SPIN_Y, 0.0),
            );
        }
        0..end
    }

    /// One frame of animation at scaled time `t`.
    pub fn animate(&self, scene: &mut Scene, t: f32) -> Range<usize> {
        self.orbit_camera(scene, t);
        self.spin_mesh(scene);
        self.perturb(scene, t)
    }
}

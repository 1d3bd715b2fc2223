//! Scene construction
//!
//! Camera, lights, the shared cube geometry and material, and the instance
//! population scattered over a spherical shell.

use crate::math::{hsl_to_rgb, DeterministicRng, EulerRot, Mat4, Vec3};
use crate::params::StressParameters;
use std::f32::consts::{PI, TAU};

pub const CAMERA_FOV_Y_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const CAMERA_DISTANCE: f32 = 120.0;

/// Outer radius of the spherical shell; the inner radius is half of it.
pub const SHELL_RADIUS: f32 = 60.0;
pub const INSTANCE_SATURATION: f32 = 0.6;
pub const INSTANCE_LIGHTNESS: f32 = 0.55;

/// Clear color of the output surface.
pub const BACKGROUND_HEX: u32 = 0x0b0f1a;

/// `0xRRGGBB` to normalized components.
pub fn hex_color(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_y_degrees: CAMERA_FOV_Y_DEGREES,
            aspect,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            target: Vec3::ZERO,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Points from the scene towards the light.
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMaterial {
    pub base_color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            base_color: hex_color(0x66aaff),
            metalness: 0.1,
            roughness: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Axis-aligned cube centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeGeometry {
    pub size: f32,
}

impl CubeGeometry {
    pub const TRIANGLES: u32 = 12;

    /// 24 vertices, four per face so each face has a flat normal.
    pub fn vertices(&self) -> Vec<CubeVertex> {
        let h = self.size * 0.5;
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut vertices = Vec::with_capacity(24);
        for (normal, u, v) in faces {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + u * su + v * sv) * h;
                vertices.push(CubeVertex {
                    position: p.to_array(),
                    normal,
                });
            }
        }
        vertices
    }

    /// Counter-clockwise triangle list over [`vertices`](Self::vertices).
    pub fn indices(&self) -> Vec<u16> {
        (0..6u16)
            .flat_map(|face| {
                let b = face * 4;
                [b, b + 1, b + 2, b, b + 2, b + 3]
            })
            .collect()
    }
}

/// Per-instance transform record. Rotation is Euler XYZ in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl InstanceTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_euler(
                EulerRot::XYZ,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            )
    }
}

/// Arena of instance records indexed by instance id.
///
/// Transforms are mutated in place by the animator; colors are fixed at
/// build time.
#[derive(Debug, Clone, Default)]
pub struct InstanceSet {
    transforms: Vec<InstanceTransform>,
    colors: Vec<[f32; 3]>,
}

impl InstanceSet {
    /// Scatter `count` instances over the shell with a hue gradient by index.
    pub fn scatter(count: u32, rng: &mut DeterministicRng) -> Self {
        let count = count as usize;
        let mut transforms = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);

        for i in 0..count {
            let phi = (2.0 * rng.next_f32() - 1.0).clamp(-1.0, 1.0).acos();
            let theta = TAU * rng.next_f32();
            let r = SHELL_RADIUS * (0.5 + 0.5 * rng.next_f32());
            let position = Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            );
            let rotation = Vec3::new(
                rng.next_f32() * PI,
                rng.next_f32() * PI,
                rng.next_f32() * PI,
            );
            transforms.push(InstanceTransform { position, rotation });

            let hue = i as f32 / count as f32;
            colors.push(hsl_to_rgb(hue, INSTANCE_SATURATION, INSTANCE_LIGHTNESS));
        }

        Self { transforms, colors }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut [InstanceTransform] {
        &mut self.transforms
    }

    pub fn get(&self, index: usize) -> Option<&InstanceTransform> {
        self.transforms.get(index)
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }
}

/// Everything the renderer draws.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: PerspectiveCamera,
    pub directional: DirectionalLight,
    pub ambient: AmbientLight,
    pub geometry: CubeGeometry,
    pub material: SurfaceMaterial,
    pub instances: InstanceSet,
    /// Whole-mesh rotation shared by all instances (Euler XYZ).
    pub mesh_rotation: Vec3,
    pub background: [f32; 3],
}

impl Scene {
    pub fn mesh_matrix(&self) -> Mat4 {
        Mat4::from_euler(
            EulerRot::XYZ,
            self.mesh_rotation.x,
            self.mesh_rotation.y,
            self.mesh_rotation.z,
        )
    }
}

pub struct SceneBuilder {
    params: StressParameters,
    aspect: f32,
    seed: u64,
}

impl SceneBuilder {
    pub fn new(params: StressParameters) -> Self {
        Self {
            params,
            aspect: 1.0,
            seed: 0x5EED,
        }
    }

    pub fn aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Scene {
        let mut rng = DeterministicRng::new(self.seed);
        let instances = InstanceSet::scatter(self.params.count, &mut rng);
        tracing::info!(
            count = instances.len(),
            size = self.params.size,
            seed = self.seed,
            "scene built"
        );

        let mut camera = PerspectiveCamera::new(self.aspect);
        camera.look_at(Vec3::ZERO);

        Scene {
            camera,
            directional: DirectionalLight {
                color: [1.0, 1.0, 1.0],
                intensity: 2.0,
                direction: Vec3::ONE.normalize(),
            },
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.2,
            },
            geometry: CubeGeometry {
                size: self.params.size,
            },
            material: SurfaceMaterial::default(),
            instances,
            mesh_rotation: Vec3::ZERO,
            background: hex_color(BACKGROUND_HEX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(count: u32) -> StressParameters {
        StressParameters {
            count,
            ..StressParameters::default()
        }
    }

    #[test]
    fn camera_defaults() {
        let scene = SceneBuilder::new(params(1)).aspect(16.0 / 9.0).build();
        assert_eq!(scene.camera.fov_y_degrees, 60.0);
        assert_eq!(scene.camera.near, 0.1);
        assert_eq!(scene.camera.far, 1000.0);
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, 120.0));
        assert_eq!(scene.camera.target, Vec3::ZERO);
    }

    #[test]
    fn instances_lie_in_shell() {
        let scene = SceneBuilder::new(params(2000)).seed(42).build();
        assert_eq!(scene.instances.len(), 2000);
        for t in scene.instances.transforms() {
            let r = t.position.length();
            assert!(r >= SHELL_RADIUS * 0.5 - 1e-3 && r <= SHELL_RADIUS + 1e-3, "r = {r}");
            for angle in t.rotation.to_array() {
                assert!((0.0..PI).contains(&angle));
            }
        }
    }

    #[test]
    fn colors_follow_index_gradient() {
        let scene = SceneBuilder::new(params(4)).build();
        let colors = scene.instances.colors();
        assert_eq!(colors.len(), 4);
        assert_eq!(colors[0], hsl_to_rgb(0.0, 0.6, 0.55));
        assert_eq!(colors[2], hsl_to_rgb(0.5, 0.6, 0.55));
    }

    #[test]
    fn zero_count_builds_empty_set() {
        let scene = SceneBuilder::new(params(0)).build();
        assert!(scene.instances.is_empty());
        assert!(scene.instances.colors().is_empty());
    }

    #[test]
    fn same_seed_same_population() {
        let a = SceneBuilder::new(params(50)).seed(9).build();
        let b = SceneBuilder::new(params(50)).seed(9).build();
        assert_eq!(a.instances.transforms(), b.instances.transforms());
    }

    #[test]
    fn cube_geometry_is_scaled() {
        let cube = CubeGeometry { size: 2.0 };
        let vertices = cube.vertices();
        assert_eq!(vertices.len(), 24);
        assert_eq!(cube.indices().len() as u32, CubeGeometry::TRIANGLES * 3);
        for v in &vertices {
            for c in v.position {
                assert!((c.abs() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn cube_faces_wind_outwards() {
        let cube = CubeGeometry { size: 1.0 };
        let vertices = cube.vertices();
        for tri in cube.indices().chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(vertices[tri[k] as usize].position));
            let n = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }
}

//! Renderer boundary
//!
//! The scene hands buffers to a [`RenderBackend`]; how they reach the GPU is
//! the backend's business. Buffers are always replaced wholesale.

use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};
use std::collections::HashMap;
use wavescope_data::{MaterialId, Mesh, Rgba, VoxelGrid};

/// Source of a per-instance scalar buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarSource {
    /// Index into the scene's probe list
    Probe(usize),
    /// Index into the scene's full-field series list
    Field(usize),
}

/// Per-instance attributes for a voxel map drawn as unit cubes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxelInstances {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<Rgba>,
}

impl VoxelInstances {
    /// Collect the voxels whose material passes `visible`.
    pub fn from_grid(grid: &VoxelGrid, visible: impl Fn(MaterialId) -> bool) -> Self {
        let (positions, colors) = grid
            .voxels
            .iter()
            .filter(|voxel| visible(voxel.material))
            .map(|voxel| (voxel.position(), voxel.material.color()))
            .unzip();
        Self { positions, colors }
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Translation × rotation (x, y, z Euler radians) × scale
pub fn model_matrix(position: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Matrix4<f32> {
    let translation = Translation3::new(position[0], position[1], position[2]).to_homogeneous();
    let rotation = Rotation3::from_euler_angles(rotation[0], rotation[1], rotation[2]).to_homogeneous();
    let scale = Matrix4::new_nonuniform_scaling(&Vector3::new(scale[0], scale[1], scale[2]));
    translation * rotation * scale
}

/// Unit cube centred on the origin, 12 triangles with face normals.
///
/// Every voxel instance shares this mesh.
pub fn unit_cube() -> Mesh {
    // (normal, two in-face axes) per face
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 6] = [
        (-0.5, -0.5),
        (0.5, -0.5),
        (0.5, 0.5),
        (0.5, 0.5),
        (-0.5, 0.5),
        (-0.5, -0.5),
    ];

    let mut mesh = Mesh::default();
    for (normal, u, v) in FACES {
        for (a, b) in CORNERS {
            for i in 0..3 {
                mesh.vertices.push(0.5 * normal[i] + a * u[i] + b * v[i]);
            }
            mesh.normals.extend_from_slice(&normal);
            mesh.indices.push(mesh.indices.len() as u32);
        }
    }
    mesh
}

/// What a rendering backend must accept from the scene
pub trait RenderBackend {
    /// Take ownership of a model's geometry.
    fn upload_mesh(&mut self, model: usize, mesh: Mesh);

    /// Replace the scalar buffer of a probe or field.
    fn upload_scalars(&mut self, source: ScalarSource, values: &[f32]);

    /// Set the base mesh shared by all voxel instances.
    fn upload_instance_base(&mut self, mesh: Mesh);

    /// Replace the instance buffer of a voxel map.
    fn upload_instances(&mut self, map: usize, instances: &VoxelInstances);

    /// Start a frame with the camera's view-projection matrix.
    fn begin_frame(&mut self, view_projection: &Matrix4<f32>);

    fn draw_mesh(&mut self, model: usize, transform: &Matrix4<f32>, color: Rgba);

    fn draw_scalars(&mut self, source: ScalarSource, transform: &Matrix4<f32>);

    fn draw_instances(&mut self, map: usize);

    /// Present the frame.
    fn end_frame(&mut self);

    /// Most recent backend error, if any
    fn last_error(&self) -> Option<String>;

    /// Shader / program diagnostics
    fn program_log(&self) -> String;
}

/// Draw calls issued during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub meshes: usize,
    pub scalar_fields: usize,
    pub instance_batches: usize,
}

/// Backend without a window: keeps the uploaded buffers' shape and counts
/// draw calls. Used by the viewer binary and in tests.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    mesh_index_counts: HashMap<usize, usize>,
    scalars: HashMap<ScalarSource, Vec<f32>>,
    scalar_uploads: u64,
    instance_base_vertices: usize,
    instances: HashMap<usize, VoxelInstances>,
    frame: DrawStats,
    last_frame: DrawStats,
    frames_presented: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index count of an uploaded model
    pub fn mesh_index_count(&self, model: usize) -> Option<usize> {
        self.mesh_index_counts.get(&model).copied()
    }

    /// Last scalar buffer uploaded for `source`
    pub fn scalars(&self, source: ScalarSource) -> Option<&[f32]> {
        self.scalars.get(&source).map(Vec::as_slice)
    }

    /// Total scalar uploads so far
    pub fn scalar_uploads(&self) -> u64 {
        self.scalar_uploads
    }

    /// Last instance buffer uploaded for a voxel map
    pub fn instances(&self, map: usize) -> Option<&VoxelInstances> {
        self.instances.get(&map)
    }

    /// Vertices in the shared instance mesh
    pub fn instance_base_vertices(&self) -> usize {
        self.instance_base_vertices
    }

    /// Draw calls of the last presented frame
    pub fn last_frame(&self) -> DrawStats {
        self.last_frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderBackend for HeadlessRenderer {
    fn upload_mesh(&mut self, model: usize, mesh: Mesh) {
        log::debug!(
            "Uploading model {}: {} vertices, {} indices",
            model,
            mesh.vertex_count(),
            mesh.indices.len()
        );
        self.mesh_index_counts.insert(model, mesh.indices.len());
    }

    fn upload_scalars(&mut self, source: ScalarSource, values: &[f32]) {
        log::trace!("Uploading {} scalars for {:?}", values.len(), source);
        let buffer = self.scalars.entry(source).or_default();
        buffer.clear();
        buffer.extend_from_slice(values);
        self.scalar_uploads += 1;
    }

    fn upload_instance_base(&mut self, mesh: Mesh) {
        self.instance_base_vertices = mesh.vertex_count();
    }

    fn upload_instances(&mut self, map: usize, instances: &VoxelInstances) {
        log::debug!("Uploading {} instances for voxel map {}", instances.len(), map);
        self.instances.insert(map, instances.clone());
    }

    fn begin_frame(&mut self, _view_projection: &Matrix4<f32>) {
        self.frame = DrawStats::default();
    }

    fn draw_mesh(&mut self, _model: usize, _transform: &Matrix4<f32>, _color: Rgba) {
        self.frame.meshes += 1;
    }

    fn draw_scalars(&mut self, _source: ScalarSource, _transform: &Matrix4<f32>) {
        self.frame.scalar_fields += 1;
    }

    fn draw_instances(&mut self, _map: usize) {
        self.frame.instance_batches += 1;
    }

    fn end_frame(&mut self) {
        self.last_frame = self.frame;
        self.frames_presented += 1;
    }

    fn last_error(&self) -> Option<String> {
        None
    }

    fn program_log(&self) -> String {
        format!(
            "headless backend: {} models, {} scalar sources, {} voxel maps, {} frames presented",
            self.mesh_index_counts.len(),
            self.scalars.len(),
            self.instances.len(),
            self.frames_presented
        )
    }
}

//! Scene aggregation
//!
//! A [`Scene`] owns every data source named by a [`ProjectConfig`] together
//! with the per-material visibility state, and decides what the renderer is
//! asked to draw each frame.

use log::{debug, info, trace, warn};
use nalgebra::Matrix4;
use std::fmt;
use thiserror::Error;
use wavescope_data::{
    decode_voxel_map, load_mesh, FormatError, FrameSeries, MaterialId, PlaneProbe, VoxelGrid,
};

use crate::config::ProjectConfig;
use crate::render::{model_matrix, unit_cube, RenderBackend, ScalarSource, VoxelInstances};

/// Number of materials with a visibility toggle
pub const TOGGLED_MATERIALS: usize = wavescope_data::material::PALETTE_SIZE;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("field {field}, model {model}: {source}")]
    Model {
        field: usize,
        model: usize,
        #[source]
        source: FormatError,
    },

    #[error("field {field}, probe {probe}: {source}")]
    Probe {
        field: usize,
        probe: usize,
        #[source]
        source: FormatError,
    },

    #[error("field {field}, data series: {source}")]
    FieldData {
        field: usize,
        #[source]
        source: FormatError,
    },
}

/// A visibility toggle asserted by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Material(MaterialId),
    Driver,
    VoxelMap,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Material(id) => write!(f, "material {}", id),
            Trigger::Driver => write!(f, "driver"),
            Trigger::VoxelMap => write!(f, "voxel map"),
        }
    }
}

/// What is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub materials: [bool; TOGGLED_MATERIALS],
    pub driver: bool,
    pub voxel_map: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            materials: [true; TOGGLED_MATERIALS],
            driver: true,
            voxel_map: false,
        }
    }
}

impl Visibility {
    /// Materials without a toggle are always visible.
    pub fn material_visible(&self, id: MaterialId) -> bool {
        id.palette_slot()
            .map_or(true, |slot| self.materials[slot])
    }

    /// Flip the state a trigger controls.
    pub fn toggle(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Material(id) => {
                if let Some(slot) = id.palette_slot() {
                    self.materials[slot] = !self.materials[slot];
                }
            }
            Trigger::Driver => self.driver = !self.driver,
            Trigger::VoxelMap => self.voxel_map = !self.voxel_map,
        }
    }
}

#[derive(Debug)]
struct SceneModel {
    material: MaterialId,
    transform: Matrix4<f32>,
}

struct SceneProbe {
    probe: PlaneProbe,
    transform: Matrix4<f32>,
}

struct VoxelMap {
    grid: VoxelGrid,
}

/// Everything loaded from a project, plus visibility and step state
pub struct Scene {
    models: Vec<SceneModel>,
    probes: Vec<SceneProbe>,
    fields: Vec<FrameSeries>,
    voxel_maps: Vec<VoxelMap>,
    visibility: Visibility,
    last_trigger: Option<Trigger>,
    step: Option<u64>,
    zeros: Vec<f32>,
}

impl Scene {
    /// Load every entity of `config` and upload its static buffers.
    ///
    /// Model, probe and full-field failures abort the build; a voxel map
    /// that cannot be decoded is logged and left out.
    pub fn build(
        config: &ProjectConfig,
        renderer: &mut dyn RenderBackend,
    ) -> Result<Self, SceneError> {
        let mut models = Vec::new();
        let mut probes = Vec::new();
        let mut fields = Vec::new();
        let mut voxel_maps = Vec::new();

        for (field_index, field) in config.fields.iter().enumerate() {
            for (model_index, model) in field.models.iter().enumerate() {
                let Some(material) = MaterialId::new(model.material) else {
                    info!(
                        "Skipping model {} of field {} ({}): material 0 is empty",
                        model_index,
                        field_index,
                        model.path.display()
                    );
                    continue;
                };

                let mesh = load_mesh(&model.path).map_err(|source| SceneError::Model {
                    field: field_index,
                    model: model_index,
                    source,
                })?;
                debug!(
                    "Loaded {} ({} triangles, material {})",
                    model.path.display(),
                    mesh.triangle_count(),
                    material
                );

                renderer.upload_mesh(models.len(), mesh);
                models.push(SceneModel {
                    material,
                    transform: model_matrix(model.position, model.rotation, model.scale),
                });
            }

            for (probe_index, probe_config) in field.probes.iter().enumerate() {
                let geometry = probe_config.geometry();
                let transform = model_matrix(
                    geometry.position,
                    geometry.rotation,
                    [geometry.size[0] as f32, geometry.size[1] as f32, 1.0],
                );
                let probe = PlaneProbe::open(
                    &probe_config.output,
                    geometry,
                    probe_config.store_every_nth_frame,
                )
                .map_err(|source| SceneError::Probe {
                    field: field_index,
                    probe: probe_index,
                    source,
                })?;
                probes.push(SceneProbe { probe, transform });
            }

            if let Some(path) = &field.data {
                let series = FrameSeries::open(path, field.cell_count()).map_err(|source| {
                    SceneError::FieldData {
                        field: field_index,
                        source,
                    }
                })?;
                fields.push(series);
            }

            if let Some(path) = &field.voxel_map {
                let dims_xy = [field.grid_size[0], field.grid_size[1]];
                match decode_voxel_map(path, dims_xy) {
                    Ok(grid) => {
                        info!(
                            "Voxel map {}: {}x{}x{}, {} voxels",
                            path.display(),
                            grid.dims[0],
                            grid.dims[1],
                            grid.dims[2],
                            grid.instance_count()
                        );
                        voxel_maps.push(VoxelMap { grid });
                    }
                    Err(e) => warn!("Voxel map of field {} not loaded: {}", field_index, e),
                }
            }
        }

        let zeros_len = probes
            .iter()
            .map(|p| p.probe.values().len())
            .chain(fields.iter().map(|f| f.values().len()))
            .max()
            .unwrap_or(0);

        let scene = Self {
            models,
            probes,
            fields,
            voxel_maps,
            visibility: Visibility::default(),
            last_trigger: None,
            step: None,
            zeros: vec![0.0; zeros_len],
        };

        if !scene.voxel_maps.is_empty() {
            renderer.upload_instance_base(unit_cube());
        }
        scene.upload_instances(renderer);

        info!(
            "Scene ready: {} models, {} probes, {} field series, {} voxel maps, {} steps",
            scene.models.len(),
            scene.probes.len(),
            scene.fields.len(),
            scene.voxel_maps.len(),
            scene.total_steps()
        );

        Ok(scene)
    }

    /// Simulated steps covered by the longest data source
    pub fn total_steps(&self) -> u64 {
        self.probes
            .iter()
            .map(|p| p.probe.simulated_steps())
            .chain(self.fields.iter().map(FrameSeries::frame_count))
            .max()
            .unwrap_or(0)
    }

    /// Show simulation step `step`. Returns whether anything was reloaded.
    ///
    /// Each source that cannot produce the frame (past its end, or a failed
    /// read) is uploaded as zeros for this step.
    pub fn set_step(&mut self, step: u64, renderer: &mut dyn RenderBackend) -> bool {
        if self.step == Some(step) {
            return false;
        }
        self.step = Some(step);

        for (index, entry) in self.probes.iter_mut().enumerate() {
            let frame = entry.probe.file_frame_for_step(step);
            let len = entry.probe.values().len();
            match entry.probe.load_frame(frame) {
                Ok(()) => renderer.upload_scalars(ScalarSource::Probe(index), entry.probe.values()),
                Err(e) => {
                    trace!("Probe {} at step {}: {}", index, step, e);
                    renderer.upload_scalars(ScalarSource::Probe(index), &self.zeros[..len]);
                }
            }
        }

        for (index, series) in self.fields.iter_mut().enumerate() {
            let len = series.values().len();
            match series.load_frame(step) {
                Ok(()) => renderer.upload_scalars(ScalarSource::Field(index), series.values()),
                Err(e) => {
                    trace!("Field series {} at step {}: {}", index, step, e);
                    renderer.upload_scalars(ScalarSource::Field(index), &self.zeros[..len]);
                }
            }
        }

        true
    }

    /// Feed this frame's trigger through edge detection. A trigger held over
    /// many frames toggles once; it must be released before it fires again.
    /// Returns whether visibility changed.
    pub fn apply_trigger(
        &mut self,
        trigger: Option<Trigger>,
        renderer: &mut dyn RenderBackend,
    ) -> bool {
        if trigger == self.last_trigger {
            return false;
        }
        self.last_trigger = trigger;

        match trigger {
            Some(trigger) => {
                self.toggle(trigger, renderer);
                true
            }
            None => false,
        }
    }

    /// Toggle unconditionally, bypassing edge detection. Each call is one
    /// press; the held-trigger state of the input layer is left alone.
    pub fn toggle(&mut self, trigger: Trigger, renderer: &mut dyn RenderBackend) {
        self.visibility.toggle(trigger);
        debug!("Toggled {}: {:?}", trigger, self.visibility);

        if matches!(trigger, Trigger::Material(_)) {
            self.upload_instances(renderer);
        }
    }

    fn upload_instances(&self, renderer: &mut dyn RenderBackend) {
        for (index, map) in self.voxel_maps.iter().enumerate() {
            let visibility = &self.visibility;
            let instances =
                VoxelInstances::from_grid(&map.grid, |id| visibility.material_visible(id));
            renderer.upload_instances(index, &instances);
        }
    }

    /// Issue one frame of draw calls.
    pub fn draw(&self, renderer: &mut dyn RenderBackend, view_projection: &Matrix4<f32>) {
        renderer.begin_frame(view_projection);

        if !self.visibility.voxel_map {
            for (index, model) in self.models.iter().enumerate() {
                if self.visibility.material_visible(model.material) {
                    renderer.draw_mesh(index, &model.transform, model.material.color());
                }
            }
        }

        for (index, entry) in self.probes.iter().enumerate() {
            renderer.draw_scalars(ScalarSource::Probe(index), &entry.transform);
        }

        let identity = Matrix4::identity();
        for index in 0..self.fields.len() {
            renderer.draw_scalars(ScalarSource::Field(index), &identity);
        }

        if self.visibility.voxel_map {
            for index in 0..self.voxel_maps.len() {
                renderer.draw_instances(index);
            }
        }

        renderer.end_frame();
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Step shown by the last `set_step`
    pub fn step(&self) -> Option<u64> {
        self.step
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    pub fn field_series_count(&self) -> usize {
        self.fields.len()
    }

    pub fn voxel_map_count(&self) -> usize {
        self.voxel_maps.len()
    }

    /// One-line summary for the console `status` command
    pub fn status_line(&self) -> String {
        let hidden: Vec<String> = self
            .visibility
            .materials
            .iter()
            .enumerate()
            .filter(|(_, shown)| !**shown)
            .map(|(slot, _)| (slot + 1).to_string())
            .collect();

        format!(
            "step {} / {}, hidden materials [{}], driver {}, voxel map {}",
            self.step.unwrap_or(0),
            self.total_steps(),
            hidden.join(", "),
            if self.visibility.driver { "on" } else { "off" },
            if self.visibility.voxel_map { "on" } else { "off" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;

    fn empty_scene() -> (Scene, HeadlessRenderer) {
        let mut renderer = HeadlessRenderer::new();
        let config = ProjectConfig { fields: Vec::new() };
        let scene = Scene::build(&config, &mut renderer).expect("Failed to build empty scene");
        (scene, renderer)
    }

    fn material(id: u8) -> MaterialId {
        MaterialId::new(id).expect("non-zero material")
    }

    #[test]
    fn test_initial_visibility() {
        let visibility = Visibility::default();
        assert!(visibility.materials.iter().all(|v| *v));
        assert!(visibility.driver);
        assert!(!visibility.voxel_map);
    }

    #[test]
    fn test_unlisted_material_always_visible() {
        let mut visibility = Visibility::default();
        visibility.toggle(Trigger::Material(material(12)));
        assert!(visibility.material_visible(material(12)));
        assert_eq!(visibility, Visibility::default());
    }

    #[test]
    fn test_held_trigger_toggles_once() {
        let (mut scene, mut renderer) = empty_scene();
        let trigger = Some(Trigger::Material(material(3)));

        assert!(scene.apply_trigger(trigger, &mut renderer));
        for _ in 0..50 {
            assert!(!scene.apply_trigger(trigger, &mut renderer));
        }
        assert!(!scene.visibility().materials[2]);

        scene.apply_trigger(None, &mut renderer);
        assert!(scene.apply_trigger(trigger, &mut renderer));
        assert!(scene.visibility().materials[2]);
    }

    #[test]
    fn test_switching_trigger_fires_immediately() {
        let (mut scene, mut renderer) = empty_scene();

        scene.apply_trigger(Some(Trigger::Driver), &mut renderer);
        scene.apply_trigger(Some(Trigger::VoxelMap), &mut renderer);

        assert!(!scene.visibility().driver);
        assert!(scene.visibility().voxel_map);
    }

    #[test]
    fn test_direct_toggle_ignores_held_trigger() {
        let (mut scene, mut renderer) = empty_scene();
        let trigger = Trigger::Material(material(5));

        scene.apply_trigger(Some(trigger), &mut renderer);
        scene.toggle(trigger, &mut renderer);
        assert!(scene.visibility().materials[4]);
        scene.toggle(trigger, &mut renderer);
        assert!(!scene.visibility().materials[4]);

        // Key still held: no repeat
        assert!(!scene.apply_trigger(Some(trigger), &mut renderer));
        assert!(!scene.visibility().materials[4]);
    }

    #[test]
    fn test_empty_scene_has_no_steps() {
        let (mut scene, mut renderer) = empty_scene();
        assert_eq!(scene.total_steps(), 0);
        assert!(scene.set_step(0, &mut renderer));
        assert!(!scene.set_step(0, &mut renderer));
        assert_eq!(renderer.scalar_uploads(), 0);
    }

    #[test]
    fn test_status_line() {
        let (mut scene, mut renderer) = empty_scene();
        scene.apply_trigger(Some(Trigger::Material(material(2))), &mut renderer);
        assert_eq!(
            scene.status_line(),
            "step 0 / 0, hidden materials [2], driver on, voxel map off"
        );
    }
}

//! Project description loading
//!
//! A project is a JSON file listing the simulated fields and, per field, the
//! probes, models and optional voxel map to show. Relative paths are resolved
//! against the directory holding the project file.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use wavescope_data::PlaneGeometry;

/// Probe stride used when a probe does not name one
pub const DEFAULT_STRIDE: u32 = 1;

/// One planar probe
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeConfig {
    /// Plane origin in grid units
    pub position: [f32; 3],
    /// Samples along the plane axes
    pub size: [u32; 2],
    /// Euler rotation in radians
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Series file written by the simulation for this probe
    pub output: PathBuf,
    /// Simulation steps between stored frames
    #[serde(default = "default_stride")]
    pub store_every_nth_frame: u32,
}

impl ProbeConfig {
    pub fn geometry(&self) -> PlaneGeometry {
        PlaneGeometry {
            position: self.position,
            rotation: self.rotation,
            size: self.size,
        }
    }
}

/// One solid model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    /// Binary mesh file
    pub path: PathBuf,
    /// Material id; `0` means the model is not drawn
    pub material: u8,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

/// One simulated field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    /// Grid cells along x, y, z
    pub grid_size: [u32; 3],
    /// Time step (seconds)
    pub dt: f64,
    /// Space step (metres)
    pub dx: f64,
    /// Optional full-field series, one value per grid cell
    pub data: Option<PathBuf>,
    pub probes: Vec<ProbeConfig>,
    pub models: Vec<ModelConfig>,
    /// Optional voxel material map; absence is not an error
    pub voxel_map: Option<PathBuf>,
}

impl FieldConfig {
    /// Cells in the full grid
    pub fn cell_count(&self) -> usize {
        self.grid_size.iter().map(|&n| n as usize).product()
    }
}

/// Parsed project description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectConfig {
    pub fields: Vec<FieldConfig>,
}

#[derive(Deserialize)]
struct RawProject {
    fields: Vec<Value>,
}

#[derive(Deserialize)]
struct RawField {
    grid_size: [u32; 3],
    dt: f64,
    dx: f64,
    #[serde(default)]
    data: Option<PathBuf>,
    #[serde(default)]
    probes: Vec<Value>,
    #[serde(default)]
    models: Vec<Value>,
    #[serde(default)]
    voxel_map: Option<PathBuf>,
}

fn default_stride() -> u32 {
    DEFAULT_STRIDE
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl ProjectConfig {
    /// Load a project file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let config = Self::from_json_str(&contents, base_dir).map_err(|e| match e {
            ConfigError::Syntax { source, .. } => ConfigError::Syntax {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::info!(
            "Loaded project {:?} with {} field(s)",
            path,
            config.fields.len()
        );
        Ok(config)
    }

    /// Parse a project description; relative paths are joined to `base_dir`.
    pub fn from_json_str(json: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawProject = serde_json::from_str(json).map_err(|e| ConfigError::Syntax {
            path: PathBuf::new(),
            source: e,
        })?;

        let fields = raw
            .fields
            .into_iter()
            .enumerate()
            .map(|(index, value)| parse_field(index, value, base_dir))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fields })
    }

    /// Largest grid extent over all fields
    pub fn scene_extent(&self) -> [f32; 3] {
        let mut extent = [0.0f32; 3];
        for field in &self.fields {
            for (e, &n) in extent.iter_mut().zip(field.grid_size.iter()) {
                *e = e.max(n as f32);
            }
        }
        extent
    }
}

fn parse_field(field: usize, value: Value, base_dir: &Path) -> Result<FieldConfig, ConfigError> {
    let raw: RawField =
        serde_json::from_value(value).map_err(|source| ConfigError::Field { field, source })?;

    if raw.grid_size.contains(&0) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("grid_size {:?} has a zero dimension", raw.grid_size),
        });
    }

    let mut probes = Vec::with_capacity(raw.probes.len());
    for (probe, value) in raw.probes.into_iter().enumerate() {
        let mut config: ProbeConfig = serde_json::from_value(value)
            .map_err(|source| ConfigError::Probe {
                field,
                probe,
                source,
            })?;
        if config.store_every_nth_frame == 0 {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("probe {probe}: store_every_nth_frame must be at least 1"),
            });
        }
        if config.size.contains(&0) {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("probe {probe}: size {:?} has a zero dimension", config.size),
            });
        }
        config.output = resolve(base_dir, config.output);
        probes.push(config);
    }

    let mut models = Vec::with_capacity(raw.models.len());
    for (model, value) in raw.models.into_iter().enumerate() {
        let mut config: ModelConfig = serde_json::from_value(value)
            .map_err(|source| ConfigError::Model {
                field,
                model,
                source,
            })?;
        config.path = resolve(base_dir, config.path);
        models.push(config);
    }

    Ok(FieldConfig {
        grid_size: raw.grid_size,
        dt: raw.dt,
        dx: raw.dx,
        data: raw.data.map(|p| resolve(base_dir, p)),
        probes,
        models,
        voxel_map: raw.voxel_map.map(|p| resolve(base_dir, p)),
    })
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Errors that can occur while loading a project description
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse project {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("field {field}: {source}")]
    Field {
        field: usize,
        source: serde_json::Error,
    },
    #[error("field {field}, probe {probe}: {source}")]
    Probe {
        field: usize,
        probe: usize,
        source: serde_json::Error,
    },
    #[error("field {field}, model {model}: {source}")]
    Model {
        field: usize,
        model: usize,
        source: serde_json::Error,
    },
    #[error("field {field}: {reason}")]
    Invalid { field: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
{
    "fields": [
        {
            "grid_size": [512, 512, 256],
            "dt": 1e-6,
            "dx": 0.01,
            "probes": [
                { "position": [0, 0, 128], "size": [512, 512],
                  "output": "data0.f32", "store_every_nth_frame": 10 },
                { "position": [0, 256, 0], "size": [512, 256],
                  "rotation": [1.5707964, 0, 0], "output": "/abs/data1.f32" }
            ],
            "models": [
                { "path": "two_obj.stl", "material": 4 }
            ],
            "voxel_map": "materials.vox"
        }
    ]
}
"#;

    #[test]
    fn test_parse_project() {
        let config = ProjectConfig::from_json_str(PROJECT, Path::new("/proj")).unwrap();
        assert_eq!(config.fields.len(), 1);

        let field = &config.fields[0];
        assert_eq!(field.grid_size, [512, 512, 256]);
        assert_eq!(field.cell_count(), 512 * 512 * 256);
        assert_eq!(field.probes.len(), 2);
        assert_eq!(field.probes[0].output, PathBuf::from("/proj/data0.f32"));
        assert_eq!(field.probes[0].store_every_nth_frame, 10);
        assert_eq!(field.probes[1].output, PathBuf::from("/abs/data1.f32"));
        assert_eq!(field.probes[1].store_every_nth_frame, DEFAULT_STRIDE);
        assert_eq!(field.models[0].scale, [1.0, 1.0, 1.0]);
        assert_eq!(field.models[0].material, 4);
        assert_eq!(field.voxel_map, Some(PathBuf::from("/proj/materials.vox")));
        assert_eq!(field.data, None);
    }

    #[test]
    fn test_optional_sections() {
        let json = r#"{ "fields": [ { "grid_size": [8, 8, 8], "dt": 1.0, "dx": 1.0 } ] }"#;
        let config = ProjectConfig::from_json_str(json, Path::new("")).unwrap();
        let field = &config.fields[0];
        assert!(field.probes.is_empty());
        assert!(field.models.is_empty());
        assert!(field.voxel_map.is_none());
    }

    #[test]
    fn test_missing_probe_field_names_indices() {
        let json = r#"{ "fields": [
            { "grid_size": [8, 8, 8], "dt": 1.0, "dx": 1.0 },
            { "grid_size": [8, 8, 8], "dt": 1.0, "dx": 1.0,
              "probes": [ { "position": [0,0,0], "size": [8,8], "output": "a.f32" },
                          { "position": [0,0,0], "size": [8,8] } ] }
        ] }"#;
        let err = ProjectConfig::from_json_str(json, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Probe { field: 1, probe: 1, .. }));
        let msg = err.to_string();
        assert!(msg.starts_with("field 1, probe 1:"), "{msg}");
        assert!(msg.contains("output"), "{msg}");
    }

    #[test]
    fn test_wrong_type_in_model() {
        let json = r#"{ "fields": [ { "grid_size": [8, 8, 8], "dt": 1.0, "dx": 1.0,
            "models": [ { "path": "m.stl", "material": "steel" } ] } ] }"#;
        let err = ProjectConfig::from_json_str(json, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Model { field: 0, model: 0, .. }));
    }

    #[test]
    fn test_missing_required_field_value() {
        let json = r#"{ "fields": [ { "grid_size": [8, 8, 8], "dx": 1.0 } ] }"#;
        let err = ProjectConfig::from_json_str(json, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Field { field: 0, .. }));
        assert!(err.to_string().contains("dt"));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let json = r#"{ "fields": [ { "grid_size": [8, 8, 8], "dt": 1.0, "dx": 1.0,
            "probes": [ { "position": [0,0,0], "size": [8,8], "output": "a.f32",
                          "store_every_nth_frame": 0 } ] } ] }"#;
        let err = ProjectConfig::from_json_str(json, Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: 0, .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = ProjectConfig::from_json_str("{ fields: ", Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { .. }));
    }

    #[test]
    fn test_scene_extent() {
        let config = ProjectConfig::from_json_str(PROJECT, Path::new("")).unwrap();
        assert_eq!(config.scene_extent(), [512.0, 512.0, 256.0]);
    }
}

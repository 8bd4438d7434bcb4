//! Batch-run configuration.
//!
//! A run config is a YAML file listing the tiles to process and the
//! parameters shared by every tile:
//!
//! ```yaml
//! outdir: /data/out
//! lasdir: /data/las
//! resolution: 4.0
//! model: /data/models/surface.json
//! neighborhood: 5
//! edge_mode: crop
//! dimensions: [Z]
//! features: [mean, var, diffmean]
//! prob: true
//! tiles:
//!   - name: 1km_6171_727
//!     bbox: "727000,6171000,728000,6172000"
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use kernel_features::{EdgeMode, FeatureKind};
use surf_common::BoundingBox;

use crate::error::PipelineError;

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Directory receiving per-tile outputs and the tile index.
    pub outdir: PathBuf,
    /// Directory scanned for .las/.laz input files.
    pub lasdir: PathBuf,
    pub resolution: f64,
    /// Path to the random forest model JSON.
    pub model: PathBuf,
    pub neighborhood: usize,
    pub edge_mode: String,
    /// Point dimensions rasterized per tile; each contributes its raw
    /// band plus one band per feature.
    pub dimensions: Vec<String>,
    pub features: Vec<String>,
    /// Also write per-tile confidence rasters.
    #[serde(default)]
    pub prob: bool,
    pub tiles: Vec<TileConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileConfig {
    pub name: String,
    /// "xmin,ymin,xmax,ymax"
    pub bbox: String,
    /// Explicit LAS files for this tile, relative to `lasdir`. Empty
    /// means every file found under `lasdir`.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl RunConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: Self =
            serde_yaml::from_reader(file).map_err(|source| PipelineError::ConfigParse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without touching data, so
    /// a bad config fails before the first tile starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.resolution <= 0.0 {
            return Err(PipelineError::Config(format!(
                "resolution must be > 0, got {}",
                self.resolution
            )));
        }
        if self.dimensions.is_empty() {
            return Err(PipelineError::Config("no dimensions listed".into()));
        }
        if self.tiles.is_empty() {
            return Err(PipelineError::Config("no tiles listed".into()));
        }
        self.edge_mode()?;
        self.feature_kinds()?;
        for tile in &self.tiles {
            tile.bounding_box()?;
        }
        Ok(())
    }

    pub fn edge_mode(&self) -> Result<EdgeMode, PipelineError> {
        self.edge_mode.parse().map_err(PipelineError::Config)
    }

    pub fn feature_kinds(&self) -> Result<Vec<FeatureKind>, PipelineError> {
        self.features
            .iter()
            .map(|f| f.parse().map_err(PipelineError::Config))
            .collect()
    }

    /// Bands each tile's stack will carry: raw + features, per
    /// dimension.
    pub fn band_count(&self) -> usize {
        self.dimensions.len() * (1 + self.features.len())
    }
}

impl TileConfig {
    pub fn bounding_box(&self) -> Result<BoundingBox, PipelineError> {
        Ok(BoundingBox::from_arg_string(&self.bbox)?)
    }

    /// LAS files for this tile: the explicit list resolved against
    /// `lasdir`, or `all` when no list was given.
    pub fn las_files(&self, lasdir: &Path, all: &[PathBuf]) -> Vec<PathBuf> {
        if self.files.is_empty() {
            all.to_vec()
        } else {
            self.files.iter().map(|f| lasdir.join(f)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> String {
        r#"
outdir: /tmp/out
lasdir: /tmp/las
resolution: 4.0
model: /tmp/model.json
neighborhood: 5
edge_mode: crop
dimensions: [Z]
features: [mean, var]
tiles:
  - name: tile_a
    bbox: "727000,6171000,728000,6172000"
"#
        .to_string()
    }

    fn parse(yaml: &str) -> RunConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_minimal_config_validates() {
        let config = parse(&minimal_yaml());
        config.validate().unwrap();
        assert_eq!(config.band_count(), 3);
        assert!(!config.prob);
        assert_eq!(config.edge_mode().unwrap(), EdgeMode::Crop);
        assert_eq!(
            config.feature_kinds().unwrap(),
            vec![FeatureKind::Mean, FeatureKind::Var]
        );
    }

    #[test]
    fn test_bad_edge_mode_is_rejected() {
        let config = parse(&minimal_yaml().replace("crop", "wrap"));
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(msg)) if msg.contains("wrap")
        ));
    }

    #[test]
    fn test_bad_bbox_is_rejected() {
        let config = parse(&minimal_yaml().replace("727000,6171000,728000,6172000", "1,2,3"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let config = parse(&minimal_yaml().replace("resolution: 4.0", "resolution: 0"));
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_tile_file_resolution() {
        let tile = TileConfig {
            name: "t".into(),
            bbox: "0,0,1,1".into(),
            files: vec![PathBuf::from("a.las")],
        };
        let all = vec![PathBuf::from("/las/b.las")];
        assert_eq!(
            tile.las_files(Path::new("/las"), &all),
            vec![PathBuf::from("/las/a.las")]
        );

        let tile_all = TileConfig {
            name: "t".into(),
            bbox: "0,0,1,1".into(),
            files: vec![],
        };
        assert_eq!(tile_all.las_files(Path::new("/las"), &all), all);
    }
}

//! Windowed GeoTIFF reading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use num_traits::NumCast;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use surf_common::{BoundingBox, Grid, GridValue};

use crate::error::RasterIoError;

/// A rectangular pixel region: (col, row) of the upper-left corner plus
/// size in columns and rows.
///
/// Signed on purpose: bbox-to-window conversion can produce negative
/// offsets or sizes for a bbox outside the raster, and those must be
/// reported, not wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col: i64,
    pub row: i64,
    pub cols: i64,
    pub rows: i64,
}

/// Decoded sample storage, kept in the file's native sample type so a
/// round trip through the reader is lossless.
enum SampleBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleBuffer {
    fn get_f64(&self, i: usize) -> f64 {
        match self {
            SampleBuffer::U8(v) => v[i] as f64,
            SampleBuffer::U16(v) => v[i] as f64,
            SampleBuffer::U32(v) => v[i] as f64,
            SampleBuffer::I16(v) => v[i] as f64,
            SampleBuffer::I32(v) => v[i] as f64,
            SampleBuffer::F32(v) => v[i] as f64,
            SampleBuffer::F64(v) => v[i],
        }
    }
}

/// A single-band GeoTIFF opened for reading.
///
/// The image is decoded once at open time; window reads slice the
/// in-memory buffer. Tile rasters in this pipeline are small enough
/// that this is cheaper than re-seeking the TIFF per window.
pub struct RasterSource {
    path: PathBuf,
    rows: usize,
    cols: usize,
    geotransform: [f64; 6],
    nodata: Option<f64>,
    samples: SampleBuffer,
}

impl RasterSource {
    /// Open a raster file and decode its single band.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterIoError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;

        let pixel_scale = match decoder.find_tag(Tag::ModelPixelScaleTag)? {
            Some(value) => value.into_f64_vec()?,
            None => {
                return Err(RasterIoError::MissingGeoTags {
                    path: path.display().to_string(),
                })
            }
        };
        let tiepoint = match decoder.find_tag(Tag::ModelTiepointTag)? {
            Some(value) => value.into_f64_vec()?,
            None => {
                return Err(RasterIoError::MissingGeoTags {
                    path: path.display().to_string(),
                })
            }
        };
        if pixel_scale.len() < 2 || tiepoint.len() < 5 {
            return Err(RasterIoError::MissingGeoTags {
                path: path.display().to_string(),
            });
        }
        let (x_res, y_res) = (pixel_scale[0], pixel_scale[1]);
        if (x_res - y_res).abs() > 1e-9 {
            return Err(RasterIoError::NonSquarePixels {
                path: path.display().to_string(),
                x_res,
                y_res,
            });
        }
        // Tiepoint maps raster point (i, j) to world point (x, y).
        let origin_x = tiepoint[3] - tiepoint[0] * x_res;
        let origin_y = tiepoint[4] + tiepoint[1] * y_res;
        let geotransform = [origin_x, x_res, 0.0, origin_y, 0.0, -y_res];

        let nodata = match decoder.find_tag(Tag::GdalNodata)? {
            Some(value) => value.into_string().ok().and_then(|s| {
                s.trim().trim_end_matches('\0').parse::<f64>().ok()
            }),
            None => None,
        };

        let samples = match decoder.read_image()? {
            DecodingResult::U8(buf) => SampleBuffer::U8(buf),
            DecodingResult::U16(buf) => SampleBuffer::U16(buf),
            DecodingResult::U32(buf) => SampleBuffer::U32(buf),
            DecodingResult::I16(buf) => SampleBuffer::I16(buf),
            DecodingResult::I32(buf) => SampleBuffer::I32(buf),
            DecodingResult::F32(buf) => SampleBuffer::F32(buf),
            DecodingResult::F64(buf) => SampleBuffer::F64(buf),
            _ => {
                return Err(RasterIoError::UnsupportedPixelFormat {
                    path: path.display().to_string(),
                })
            }
        };

        debug!(
            path = %path.display(),
            rows = height,
            cols = width,
            ?geotransform,
            ?nodata,
            "opened raster"
        );

        Ok(Self {
            path,
            rows: height as usize,
            cols: width as usize,
            geotransform,
            nodata,
            samples,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// GDAL-style geotransform of the full raster.
    pub fn geotransform(&self) -> [f64; 6] {
        self.geotransform
    }

    /// Cell size in world units.
    pub fn resolution(&self) -> f64 {
        self.geotransform[1]
    }

    /// Nodata value declared in the file, if any.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Bounding box covered by the raster.
    pub fn bbox(&self) -> BoundingBox {
        let xmin = self.geotransform[0];
        let ymax = self.geotransform[3];
        let xmax = xmin + self.geotransform[1] * self.cols as f64;
        let ymin = ymax + self.geotransform[5] * self.rows as f64;
        BoundingBox::new(xmin, ymin, xmax, ymax)
    }

    /// Convert a world-coordinate bbox to a pixel window.
    ///
    /// Uses the same float-to-pixel truncation rule as gdal_translate:
    /// +0.001 on the near corner, +0.5 on the far corner, truncated
    /// toward zero. No containment check is made here; windows outside
    /// the raster are rejected by the read methods.
    pub fn bbox_to_pixel_window(&self, bbox: &BoundingBox) -> Result<PixelWindow, RasterIoError> {
        let [origin_x, pixel_width, _, origin_y, _, pixel_height] = self.geotransform;
        let x1 = (bbox.min_x - origin_x) / pixel_width;
        let x2 = (bbox.max_x - origin_x) / pixel_width;
        let y1 = (bbox.max_y - origin_y) / pixel_height;
        let y2 = (bbox.min_y - origin_y) / pixel_height;

        let x1 = (x1 + 0.001).trunc() as i64;
        let y1 = (y1 + 0.001).trunc() as i64;
        let x2 = (x2 + 0.5).trunc() as i64;
        let y2 = (y2 + 0.5).trunc() as i64;

        let cols = x2 - x1;
        let rows = y2 - y1;
        if cols < 0 || rows < 0 {
            return Err(RasterIoError::NegativeWindow { cols, rows });
        }
        Ok(PixelWindow {
            col: x1,
            row: y1,
            cols,
            rows,
        })
    }

    /// Geotransform of a raster subset expressed as a pixel window.
    pub fn window_geotransform(&self, window: &PixelWindow) -> [f64; 6] {
        [
            self.geotransform[0] + window.col as f64 * self.geotransform[1],
            self.geotransform[1],
            0.0,
            self.geotransform[3] + window.row as f64 * self.geotransform[5],
            0.0,
            self.geotransform[5],
        ]
    }

    /// Read the entire raster.
    pub fn read<T: GridValue>(&self) -> Result<Grid<T>, RasterIoError> {
        self.read_window::<T>(&PixelWindow {
            col: 0,
            row: 0,
            cols: self.cols as i64,
            rows: self.rows as i64,
        })
    }

    /// Read the part of the raster covered by `bbox`.
    pub fn read_bbox<T: GridValue>(&self, bbox: &BoundingBox) -> Result<Grid<T>, RasterIoError> {
        let window = self.bbox_to_pixel_window(bbox)?;
        self.read_window::<T>(&window)
    }

    /// Read a pixel window into a grid of the requested value type.
    ///
    /// A window reaching outside the raster is an error; a zero-area
    /// window inside it yields an empty grid.
    pub fn read_window<T: GridValue>(
        &self,
        window: &PixelWindow,
    ) -> Result<Grid<T>, RasterIoError> {
        if window.cols < 0 || window.rows < 0 {
            return Err(RasterIoError::NegativeWindow {
                cols: window.cols,
                rows: window.rows,
            });
        }
        if window.col < 0
            || window.row < 0
            || window.col + window.cols > self.cols as i64
            || window.row + window.rows > self.rows as i64
        {
            return Err(RasterIoError::WindowOutsideRaster {
                col: window.col,
                row: window.row,
                cols: window.cols,
                rows: window.rows,
                raster_rows: self.rows,
                raster_cols: self.cols,
            });
        }

        let gt = self.window_geotransform(window);
        let origin = (gt[0], gt[3]);
        let nodata = match self.nodata {
            Some(nd) => Some(self.cast_sample::<T>(nd)?),
            None => None,
        };

        let out_rows = window.rows as usize;
        let out_cols = window.cols as usize;
        let mut data = Vec::with_capacity(out_rows * out_cols);
        for r in 0..out_rows {
            let src_row = window.row as usize + r;
            let base = src_row * self.cols + window.col as usize;
            for c in 0..out_cols {
                let value = self.samples.get_f64(base + c);
                data.push(self.cast_sample::<T>(value)?);
            }
        }

        Ok(Grid::from_data(
            data,
            out_rows,
            out_cols,
            origin,
            self.resolution(),
            nodata,
        )?)
    }

    fn cast_sample<T: GridValue>(&self, value: f64) -> Result<T, RasterIoError> {
        NumCast::from(value).ok_or_else(|| RasterIoError::ValueNotRepresentable {
            path: self.path.display().to_string(),
            value,
            dtype: T::TYPE_NAME,
        })
    }
}

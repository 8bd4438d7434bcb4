//! GeoTIFF writing.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use surf_common::{Grid, GridValue};

use crate::error::RasterIoError;

/// Grid value types with a single-band TIFF sample representation.
pub trait GeoTiffPixel: GridValue {
    type Color: ColorType<Inner = Self>;
}

impl GeoTiffPixel for u8 {
    type Color = colortype::Gray8;
}

impl GeoTiffPixel for u16 {
    type Color = colortype::Gray16;
}

impl GeoTiffPixel for u32 {
    type Color = colortype::Gray32;
}

impl GeoTiffPixel for f32 {
    type Color = colortype::Gray32Float;
}

impl GeoTiffPixel for f64 {
    type Color = colortype::Gray64Float;
}

/// Write a grid to a single-band GeoTIFF.
///
/// Masked cells are filled with the grid's nodata sentinel, and the
/// sentinel is recorded in the GDAL_NODATA tag so the round trip
/// (`RasterSource::open` + `read`) reproduces origin, resolution,
/// shape, nodata and all unmasked values exactly.
pub fn write_grid<T: GeoTiffPixel, P: AsRef<Path>>(
    path: P,
    grid: &Grid<T>,
) -> Result<(), RasterIoError>
where
    [T]: TiffValue,
{
    let path = path.as_ref();
    let data = grid.filled_data()?;
    let (origin_x, origin_y) = grid.origin();
    let resolution = grid.resolution();

    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<T::Color>(grid.cols() as u32, grid.rows() as u32)?;

    let pixel_scale = [resolution, resolution, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, origin_x, origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    if let Some(nodata) = grid.nodata() {
        let text = format_nodata(nodata);
        image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
    }

    image.write_data(&data)?;

    debug!(
        path = %path.display(),
        rows = grid.rows(),
        cols = grid.cols(),
        resolution,
        "wrote raster"
    );
    Ok(())
}

/// GDAL_NODATA is an ASCII tag; integers must not grow a trailing ".0"
/// or GDAL versions disagree about the value.
fn format_nodata<T: GridValue>(nodata: T) -> String {
    let v = nodata.to_f64().unwrap_or(0.0);
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_nodata_integer_like() {
        assert_eq!(format_nodata(-999.0f32), "-999");
        assert_eq!(format_nodata(0u8), "0");
        assert_eq!(format_nodata(255u8), "255");
    }

    #[test]
    fn test_format_nodata_fractional() {
        assert_eq!(format_nodata(-0.5f64), "-0.5");
    }
}

// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Imaging-train geometry: pixel scale, sensor field of view, and a coarse
//! target-vs-sensor framing heuristic. All pure arithmetic over positive
//! physical dimensions.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Telescope {
    pub name: String,
    pub focal_length_mm: f64,
    pub f_ratio: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub name: String,
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
    pub pixel_size_um: f64,
}

/// The imaging train a request plans around. Either half can be absent when
/// the request is visual-only or the interpreter could not identify gear.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub telescope: Option<Telescope>,
    pub camera: Option<Camera>,
}

impl Equipment {
    /// Arcseconds per pixel, when both halves of the train are known.
    pub fn pixel_scale(&self) -> Option<f64> {
        match (&self.telescope, &self.camera) {
            (Some(t), Some(c)) =>
                Some(pixel_scale(t.focal_length_mm, c.pixel_size_um)),
            _ => None,
        }
    }

    /// Sensor field of view (width, height) in arcminutes, when both halves
    /// of the train are known.
    pub fn sensor_fov_arcmin(&self) -> Option<(f64, f64)> {
        let scale = self.pixel_scale()?;
        let c = self.camera.as_ref()?;
        let (w_px, h_px) =
            fov_pixels(c.sensor_width_mm, c.sensor_height_mm, c.pixel_size_um);
        Some(sensor_fov_arcmin(scale, w_px, h_px))
    }
}

/// Arcseconds of sky per pixel for square photosites. E.g. a 3.76 um pixel
/// behind 650 mm of focal length sees about 1.19 arcsec.
pub fn pixel_scale(focal_length_mm: f64, pixel_size_um: f64) -> f64 {
    (pixel_size_um / focal_length_mm) * 206.265
}

/// Sensor extent (width, height) in arcminutes from the pixel scale and the
/// pixel counts.
pub fn sensor_fov_arcmin(pixel_scale: f64, width_px: u32, height_px: u32)
                         -> (f64, f64) {
    (pixel_scale * width_px as f64 / 60.0,
     pixel_scale * height_px as f64 / 60.0)
}

/// True angular field (width, height) in degrees from the physical sensor
/// dimensions: 2*atan(dim/2 / focal).
pub fn fov_degrees(focal_length_mm: f64, sensor_width_mm: f64,
                   sensor_height_mm: f64) -> (f64, f64) {
    let axis = |dim_mm: f64| {
        2.0 * ((dim_mm / 2.0) / focal_length_mm).atan().to_degrees()
    };
    (axis(sensor_width_mm), axis(sensor_height_mm))
}

/// Pixel counts (width, height) from the physical sensor dimensions and
/// pixel size.
pub fn fov_pixels(sensor_width_mm: f64, sensor_height_mm: f64,
                  pixel_size_um: f64) -> (u32, u32) {
    ((sensor_width_mm * 1000.0 / pixel_size_um) as u32,
     (sensor_height_mm * 1000.0 / pixel_size_um) as u32)
}

/// Rough percentage of the sensor a target spans: major axis against the
/// average sensor dimension, rounded. A framing heuristic for ranking, not
/// a fit calculation; can exceed 100. Returns 0 when any input is missing
/// or non-positive.
pub fn sensor_coverage_percent(maj_axis_arcmin: f64, sensor_width_amin: f64,
                               sensor_height_amin: f64) -> u32 {
    if maj_axis_arcmin <= 0.0 || sensor_width_amin <= 0.0
        || sensor_height_amin <= 0.0 {
        return 0;
    }
    let sensor_avg = (sensor_width_amin + sensor_height_amin) / 2.0;
    (100.0 * maj_axis_arcmin / sensor_avg).round() as u32
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn apo130() -> Telescope {
        Telescope {
            name: "Astrophysics 130EDF F6.3".to_string(),
            focal_length_mm: 650.0,
            f_ratio: 6.3,
        }
    }

    fn asi2600() -> Camera {
        Camera {
            name: "ZWO ASI 2600MC Pro".to_string(),
            sensor_width_mm: 23.5,
            sensor_height_mm: 15.7,
            pixel_size_um: 3.76,
        }
    }

    #[test]
    fn test_pixel_scale() {
        assert_abs_diff_eq!(pixel_scale(650.0, 3.76), 1.194, epsilon = 0.002);
        // Halving focal length doubles the scale.
        assert_abs_diff_eq!(pixel_scale(325.0, 3.76),
                            2.0 * pixel_scale(650.0, 3.76), epsilon = 1e-9);
    }

    #[test]
    fn test_sensor_fov_arcmin() {
        let scale = pixel_scale(650.0, 3.76);
        let (w, h) = sensor_fov_arcmin(scale, 6248, 4176);
        assert_abs_diff_eq!(w, 124.3, epsilon = 0.3);
        assert_abs_diff_eq!(h, 83.1, epsilon = 0.3);
    }

    #[test]
    fn test_fov_degrees_and_pixels() {
        let (w_deg, h_deg) = fov_degrees(650.0, 23.5, 15.7);
        assert_abs_diff_eq!(w_deg, 2.071, epsilon = 0.005);
        assert_abs_diff_eq!(h_deg, 1.384, epsilon = 0.005);

        let (w_px, h_px) = fov_pixels(23.5, 15.7, 3.76);
        assert_eq!(w_px, 6250);
        assert_eq!(h_px, 4175);
    }

    #[test]
    fn test_sensor_coverage() {
        // M31's 178 arcmin major axis overfills this train.
        assert_eq!(sensor_coverage_percent(178.0, 124.25, 83.05), 172);
        // A 10 arcmin galaxy is a small fraction.
        assert_eq!(sensor_coverage_percent(10.0, 124.25, 83.05), 10);
        // Degenerate inputs yield zero rather than an error.
        assert_eq!(sensor_coverage_percent(0.0, 124.25, 83.05), 0);
        assert_eq!(sensor_coverage_percent(178.0, 0.0, 83.05), 0);
    }

    #[test]
    fn test_equipment_accessors() {
        let equipment = Equipment {
            telescope: Some(apo130()),
            camera: Some(asi2600()),
        };
        assert_abs_diff_eq!(equipment.pixel_scale().unwrap(), 1.194,
                            epsilon = 0.002);
        let (w, h) = equipment.sensor_fov_arcmin().unwrap();
        assert!(w > 123.0 && w < 126.0, "width {}", w);
        assert!(h > 82.0 && h < 84.0, "height {}", h);

        let visual_only = Equipment { telescope: Some(apo130()), camera: None };
        assert_eq!(visual_only.pixel_scale(), None);
        assert_eq!(visual_only.sensor_fov_arcmin(), None);
    }
}

use crate::utils::error::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Planck constant times speed of light, in eV·m.
pub const HC_EV_M: f64 = 1.239_841_984e-6;

/// Uniformly sampled axis with inclusive end point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub start: f64,
    pub end: f64,
    pub n: usize,
}

impl Axis {
    pub fn new(start: f64, end: f64, n: usize) -> Self {
        Self { start, end, n }
    }

    pub fn step(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            (self.end - self.start) / (self.n - 1) as f64
        }
    }

    pub fn value(&self, i: usize) -> f64 {
        self.start + self.step() * i as f64
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.value(i)).collect()
    }

    /// Step used as integration weight; a single sample counts with weight 1.
    fn weight(&self) -> f64 {
        if self.n < 2 {
            1.0
        } else {
            self.step().abs()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub x: Axis,
    pub y: Axis,
    pub t: Axis,
}

impl Mesh {
    pub fn len(&self) -> usize {
        self.x.n * self.y.n * self.t.n
    }

    /// Sample count, `None` when it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.x.n.checked_mul(self.y.n)?.checked_mul(self.t.n)
    }

    pub fn is_empty(&self) -> bool {
        self.x.n == 0 || self.y.n == 0 || self.t.n == 0
    }

    pub fn pixel_area(&self) -> f64 {
        self.x.weight() * self.y.weight()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

impl Complex32 {
    pub fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    pub fn norm_sqr(&self) -> f64 {
        let (re, im) = (self.re as f64, self.im as f64);
        re * re + im * im
    }
}

/// Complex electric field on an (x, y, t) mesh.
///
/// `|E|^2` is an intensity in W/m^2, so integrating over the mesh gives the
/// pulse energy in joule. Samples are stored row-major with x fastest:
/// `(t * ny + y) * nx + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefront {
    pub photon_energy_ev: f64,
    pub mesh: Mesh,
    field: Vec<Complex32>,
}

impl Wavefront {
    /// Every axis needs at least one point and the sample count must match
    /// the field length.
    pub fn new(photon_energy_ev: f64, mesh: Mesh, field: Vec<Complex32>) -> Result<Self> {
        let (nx, ny, nt) = (mesh.x.n, mesh.y.n, mesh.t.n);
        if nx == 0 || ny == 0 || nt == 0 {
            return Err(SimError::data_format(
                "wavefront",
                format!("mesh {}x{}x{} has an empty axis", nx, ny, nt),
            ));
        }
        let expected = mesh.checked_len().ok_or_else(|| {
            SimError::data_format(
                "wavefront",
                format!("mesh {}x{}x{} is too large to address", nx, ny, nt),
            )
        })?;
        if field.len() != expected {
            return Err(SimError::data_format(
                "wavefront",
                format!(
                    "field has {} samples but mesh {}x{}x{} needs {}",
                    field.len(),
                    nx,
                    ny,
                    nt,
                    expected
                ),
            ));
        }
        Ok(Self {
            photon_energy_ev,
            mesh,
            field,
        })
    }

    pub fn field(&self) -> &[Complex32] {
        &self.field
    }

    pub fn at(&self, x: usize, y: usize, t: usize) -> Complex32 {
        self.field[(t * self.mesh.y.n + y) * self.mesh.x.n + x]
    }

    pub fn wavelength(&self) -> f64 {
        HC_EV_M / self.photon_energy_ev
    }

    fn slices(&self) -> impl Iterator<Item = &[Complex32]> {
        self.field.chunks(self.mesh.x.n * self.mesh.y.n)
    }

    /// Power per time slice, W.
    pub fn temporal_power(&self) -> Vec<f64> {
        let area = self.mesh.pixel_area();
        self.slices()
            .map(|slice| slice.iter().map(Complex32::norm_sqr).sum::<f64>() * area)
            .collect()
    }

    pub fn pulse_energy(&self) -> f64 {
        self.temporal_power().iter().sum::<f64>() * self.mesh.t.weight()
    }

    pub fn peak_power(&self) -> f64 {
        self.temporal_power().into_iter().fold(0.0, f64::max)
    }

    /// Time-integrated fluence per pixel, J/m^2, indexed `y * nx + x`.
    pub fn integrated_intensity(&self) -> Vec<f64> {
        let dt = self.mesh.t.weight();
        let mut fluence = vec![0.0; self.mesh.x.n * self.mesh.y.n];
        for slice in self.slices() {
            for (acc, sample) in fluence.iter_mut().zip(slice) {
                *acc += sample.norm_sqr() * dt;
            }
        }
        fluence
    }

    /// Intensity-weighted beam centre `(x, y)` in meters.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let fluence = self.integrated_intensity();
        let total: f64 = fluence.iter().sum();
        if total <= 0.0 {
            return None;
        }
        let nx = self.mesh.x.n;
        let (mut cx, mut cy) = (0.0, 0.0);
        for (i, f) in fluence.iter().enumerate() {
            cx += f * self.mesh.x.value(i % nx);
            cy += f * self.mesh.y.value(i / nx);
        }
        Some((cx / total, cy / total))
    }
}

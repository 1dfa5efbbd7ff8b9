//! Phenomenological XFEL pulse model.
//!
//! The field factorises into a complex Gaussian spatial mode and a temporal
//! profile. For SASE pulses the temporal profile is synthesised from a
//! Gaussian spectrum with random spectral phases and then windowed by the
//! pulse envelope, which reproduces the spiky, partially coherent structure of
//! self-amplified spontaneous emission.

use crate::domain::parameters::CalculatorParameters;
use crate::domain::units::Unit;
use crate::domain::wavefront::{Axis, Complex32, Mesh, Wavefront, HC_EV_M};
use crate::utils::error::{Result, SimError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::{LN_2, PI};

/// Reduced Planck constant in eV·s.
const HBAR_EV_S: f64 = 6.582_119_569e-16;

#[derive(Debug, Clone, Copy, PartialEq)]
struct C64 {
    re: f64,
    im: f64,
}

impl C64 {
    fn polar(r: f64, phase: f64) -> Self {
        Self {
            re: r * phase.cos(),
            im: r * phase.sin(),
        }
    }

    fn mul(self, other: C64) -> C64 {
        C64 {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }

    fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

/// Beam settings in canonical units (m, s, eV, J, rad).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub mesh: Mesh,
    pub photon_energy: f64,
    pub pulse_energy: f64,
    pub pulse_duration: f64,
    pub sigma: f64,
    pub div: f64,
    pub x0: f64,
    pub y0: f64,
    pub t0: f64,
    pub theta_x: f64,
    pub theta_y: f64,
    /// Relative rms spectral bandwidth; `None` for a fully coherent pulse.
    pub bandwidth: Option<f64>,
    pub seed: Option<u64>,
}

impl SourceSettings {
    pub fn from_parameters(params: &CalculatorParameters) -> Result<Self> {
        let axis = |range: &str, num: &str, unit: Unit| -> Result<Axis> {
            let [start, end] = params.get(range)?.range_in(unit)?;
            let n = params.get(num)?.as_usize()?;
            if n == 0 || end < start {
                return Err(SimError::invalid_parameter(
                    range,
                    format!("[{}, {}] with {} points is not a valid mesh axis", start, end, n),
                ));
            }
            Ok(Axis::new(start, end, n))
        };

        let mesh = Mesh {
            x: axis("range_x", "num_x", Unit::Meter)?,
            y: axis("range_y", "num_y", Unit::Meter)?,
            t: axis("range_t", "num_t", Unit::Second)?,
        };

        let bandwidth = if params.contains("spectral_bandwidth") {
            Some(params.get("spectral_bandwidth")?.as_f64()?)
        } else {
            None
        };
        let seed = match params.get("seed") {
            Ok(p) if p.value.is_some() => Some(p.as_u64()?),
            _ => None,
        };

        Ok(Self {
            mesh,
            photon_energy: params.get("photon_energy")?.value_in(Unit::ElectronVolt)?,
            pulse_energy: params.get("pulse_energy")?.value_in(Unit::Joule)?,
            pulse_duration: params.get("pulse_duration")?.value_in(Unit::Second)?,
            sigma: params.get("sigma")?.value_in(Unit::Meter)?,
            div: params.get("div")?.value_in(Unit::Radian)?,
            x0: params.get("x0")?.value_in(Unit::Meter)?,
            y0: params.get("y0")?.value_in(Unit::Meter)?,
            t0: params.get("t0")?.value_in(Unit::Second)?,
            theta_x: params.get("theta_x")?.value_in(Unit::Radian)?,
            theta_y: params.get("theta_y")?.value_in(Unit::Radian)?,
            bandwidth,
            seed,
        })
    }
}

/// Complex Gaussian mode with curvature and tilt, indexed `y * nx + x`.
fn spatial_mode(s: &SourceSettings) -> Vec<C64> {
    let k = 2.0 * PI * s.photon_energy / HC_EV_M;
    let curvature = if s.div > 0.0 { s.div / s.sigma } else { 0.0 };
    let xs = s.mesh.x.values();
    let ys = s.mesh.y.values();

    let mut mode = Vec::with_capacity(xs.len() * ys.len());
    for y in &ys {
        for x in &xs {
            let (dx, dy) = (x - s.x0, y - s.y0);
            let r2 = dx * dx + dy * dy;
            let amplitude = (-r2 / (4.0 * s.sigma * s.sigma)).exp();
            let phase = -k * r2 * curvature / 2.0
                - k * (dx * s.theta_x.sin() + dy * s.theta_y.sin());
            mode.push(C64::polar(amplitude, phase));
        }
    }
    mode
}

/// Field amplitude envelope; `pulse_duration` is the intensity FWHM.
fn temporal_envelope(s: &SourceSettings) -> Vec<f64> {
    let tau = s.pulse_duration / (2.0 * (2.0 * LN_2).sqrt());
    s.mesh
        .t
        .values()
        .iter()
        .map(|t| (-(t - s.t0).powi(2) / (4.0 * tau * tau)).exp())
        .collect()
}

/// Random-phase spectrum on the DFT grid of the time axis, transformed back
/// to time by a direct sum.
fn sase_profile(s: &SourceSettings, bandwidth: f64, rng: &mut StdRng) -> Vec<C64> {
    let envelope = temporal_envelope(s);
    let n = s.mesh.t.n;
    let dt = s.mesh.t.step();
    if n < 2 || dt <= 0.0 {
        return envelope.iter().map(|a| C64::polar(*a, 0.0)).collect();
    }

    let sigma_omega = (bandwidth * s.photon_energy / HBAR_EV_S).max(f64::MIN_POSITIVE);
    let centre = (n / 2) as f64;
    let spectrum: Vec<(f64, C64)> = (0..n)
        .map(|k| {
            let omega = 2.0 * PI * (k as f64 - centre) / (n as f64 * dt);
            let u = omega / (2.0 * sigma_omega);
            let amplitude = (-u * u).exp();
            let phase = rng.gen_range(0.0..2.0 * PI);
            (omega, C64::polar(amplitude, phase))
        })
        .filter(|(_, a)| a.norm_sqr() > 0.0)
        .collect();

    s.mesh
        .t
        .values()
        .iter()
        .zip(&envelope)
        .map(|(t, env)| {
            let mut sum = C64 { re: 0.0, im: 0.0 };
            for (omega, a) in &spectrum {
                let term = a.mul(C64::polar(1.0, omega * (t - s.t0)));
                sum.re += term.re;
                sum.im += term.im;
            }
            C64 {
                re: sum.re * env,
                im: sum.im * env,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coherence {
    Coherent,
    Sase,
}

/// Builds the pulse and scales it so its integrated energy is `pulse_energy`.
pub fn build_wavefront(s: &SourceSettings, coherence: Coherence) -> Result<Wavefront> {
    let spatial = spatial_mode(s);
    let temporal: Vec<C64> = match (coherence, s.bandwidth) {
        (Coherence::Sase, Some(bandwidth)) => {
            let mut rng = match s.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            sase_profile(s, bandwidth, &mut rng)
        }
        _ => temporal_envelope(s)
            .into_iter()
            .map(|a| C64::polar(a, 0.0))
            .collect(),
    };

    let area = s.mesh.pixel_area();
    let dt = if s.mesh.t.n < 2 { 1.0 } else { s.mesh.t.step() };
    let spatial_energy: f64 = spatial.iter().map(|c| c.norm_sqr()).sum::<f64>() * area;
    let temporal_energy: f64 = temporal.iter().map(|c| c.norm_sqr()).sum::<f64>() * dt;
    let raw_energy = spatial_energy * temporal_energy;
    if !(raw_energy.is_finite() && raw_energy > 0.0) {
        return Err(SimError::invalid_parameter(
            "mesh",
            "the pulse has no energy on the mesh; widen the ranges or recentre the beam",
        ));
    }
    let scale = (s.pulse_energy / raw_energy).sqrt();

    let mut field = Vec::with_capacity(s.mesh.len());
    for t in &temporal {
        let t = C64 {
            re: t.re * scale,
            im: t.im * scale,
        };
        for xy in &spatial {
            let v = xy.mul(t);
            field.push(Complex32::new(v.re as f32, v.im as f32));
        }
    }

    Wavefront::new(s.photon_energy, s.mesh, field)
}

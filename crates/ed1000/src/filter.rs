//! # IIR bandpass filters
//!
//! The demodulator separates the mark and space tones with
//! narrow Butterworth bandpass filters. These are Infinite
//! Impulse Response (IIR) filters, implemented as a cascade of
//! second-order sections ("biquads").
//!
//! ## Second-order sections
//!
//! Each [`Biquad`] implements
//!
//! ```txt
//!         b0 + b1 z⁻¹ + b2 z⁻²
//! H(z) = ----------------------
//!         1 + a1 z⁻¹ + a2 z⁻²
//! ```
//!
//! in transposed direct form II. A high-order filter is much
//! better behaved numerically as a cascade of these sections
//! than as a single long polynomial.
//!
//! ## Filter state
//!
//! IIR filters remember their past outputs. When a stream is
//! filtered in blocks, the *same* [`SosFilter`] must see every
//! block in order. Resetting it between blocks would restart
//! the filter's transient response at every block boundary.
//!
//! ```ignore
//! let mut bp = SosFilter::butterworth_bandpass(4, 2142.9, 2362.5, 48000.0);
//! for block in audio.chunks(240) {
//!     let energy: f64 = block.iter().map(|&sa| bp.filter(sa as f64).abs()).sum();
//! }
//! ```
//!
//! ## Design
//!
//! [`SosFilter::butterworth_bandpass()`] places the analog
//! Butterworth prototype poles, applies the lowpass-to-bandpass
//! transformation, and maps the result to the z-plane with the
//! bilinear transform. Band edges are pre-warped, so the digital
//! filter is exactly 3 dB down at the requested edge
//! frequencies. An order-`N` design yields `N` sections
//! (`2N` poles).

use std::f64::consts::PI;

use num_complex::Complex;

/// Second-order IIR section
#[derive(Clone, Debug, PartialEq)]
pub struct Biquad {
    // numerator [b0, b1, b2]
    b: [f64; 3],

    // denominator [a1, a2]; a0 is always 1
    a: [f64; 2],

    // transposed direct form II delay line
    state: [f64; 2],
}

impl Biquad {
    /// New section from coefficients
    ///
    /// The denominator's leading coefficient is normalized to
    /// one and is not given.
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self {
            b,
            a,
            state: [0.0; 2],
        }
    }

    /// Filter one sample
    #[inline]
    pub fn filter(&mut self, input: f64) -> f64 {
        let out = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * out + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * out;
        out
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    /// Frequency response at `omega` radians per sample
    pub fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = 1.0 + z1 * self.a[0] + z2 * self.a[1];
        num / den
    }

    /// True if both poles are inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    // scale the numerator
    fn scale(&mut self, gain: f64) {
        for b in self.b.iter_mut() {
            *b *= gain;
        }
    }
}

/// Cascade of second-order sections
#[derive(Clone, Debug, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// Cascade the given sections
    pub fn from_sections(sections: Vec<Biquad>) -> Self {
        Self { sections }
    }

    /// Design a digital Butterworth bandpass filter
    ///
    /// The passband runs from `low_hz` to `high_hz` at sampling
    /// rate `fs`. The filter has `order` sections and unity gain
    /// at the geometric center of the (pre-warped) band.
    pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Self {
        let k = 2.0 * fs;
        let w_low = prewarp(low_hz, fs);
        let w_high = prewarp(high_hz, fs);
        let w_center = f64::sqrt(w_low * w_high);
        let bandwidth = w_high - w_low;
        let omega_center = 2.0 * f64::atan(w_center / k);

        let mut sections = Vec::with_capacity(order);
        for pole in butterworth_poles(order) {
            // lowpass → bandpass: s² - p·B·s + w0² = 0
            let half = pole * (bandwidth / 2.0);
            let disc = (half * half - w_center * w_center).sqrt();
            for s in [half + disc, half - disc] {
                // one section per conjugate pair
                if s.im <= 0.0 {
                    continue;
                }

                // bilinear transform
                let z = (k + s) / (k - s);

                // zeros at DC and at Nyquist
                let mut section = Biquad::new([1.0, 0.0, -1.0], [-2.0 * z.re, z.norm_sqr()]);
                section.scale(1.0 / section.response(omega_center).norm());
                sections.push(section);
            }
        }

        Self::from_sections(sections)
    }

    /// Filter one sample
    #[inline]
    pub fn filter(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |sa, section| section.filter(sa))
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }

    /// Number of second-order sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Second-order sections, in order of application
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Magnitude response at `freq_hz`, for sampling rate `fs`
    pub fn gain_at(&self, freq_hz: f64, fs: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / fs;
        self.sections
            .iter()
            .map(|section| section.response(omega).norm())
            .product()
    }
}

// Pre-warp an edge frequency for the bilinear transform
fn prewarp(freq_hz: f64, fs: f64) -> f64 {
    2.0 * fs * f64::tan(PI * freq_hz / fs)
}

// Analog Butterworth prototype poles
//
// The poles are evenly spaced on the left half of the unit
// circle. They occur in conjugate pairs, plus one real pole
// at -1 when `order` is odd.
fn butterworth_poles(order: usize) -> impl Iterator<Item = Complex<f64>> {
    (0..order).map(move |k| {
        let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        Complex::from_polar(1.0, theta)
    })
}

use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use crate::error::RegistrationError;

/// Performs an in-place 2-D DFT of a `width * height` row-major buffer, as a
/// separable transform: one 1-D FFT over each row, then one over each
/// column. `forward` selects the forward or inverse transform; the inverse
/// is *not* normalized by `width * height` (matching the convention used by
/// [`crate::phase_correlation`], which only cares about the location of the
/// maximum, not its absolute scale).
///
/// Returns [`RegistrationError::DftShapeMismatch`] instead of panicking if
/// `buffer.len() != width * height`.
pub fn dft2d(
    width: usize,
    height: usize,
    buffer: &mut [Complex32],
    forward: bool,
) -> Result<(), RegistrationError> {
    if buffer.len() != width * height {
        return Err(RegistrationError::DftShapeMismatch {
            got: buffer.len(),
            expected: width * height,
        });
    }
    if width == 0 || height == 0 {
        return Ok(());
    }

    let mut planner = FftPlanner::new();
    let row_fft = plan(&mut planner, width, forward);
    let col_fft = plan(&mut planner, height, forward);

    for row in buffer.chunks_mut(width) {
        row_fft.process(row);
    }

    let mut column = vec![Complex32::default(); height];
    for x in 0..width {
        for y in 0..height {
            column[y] = buffer[y * width + x];
        }
        col_fft.process(&mut column);
        for y in 0..height {
            buffer[y * width + x] = column[y];
        }
    }

    Ok(())
}

fn plan(planner: &mut FftPlanner<f32>, len: usize, forward: bool) -> Arc<dyn Fft<f32>> {
    if forward {
        planner.plan_fft_forward(len)
    } else {
        planner.plan_fft_inverse(len)
    }
}

/// Normalized cross-power spectrum of two DFTs of equal shape:
/// `a[i] * conj(b[i]) / |a[i] * conj(b[i])|`, the frequency-domain quantity
/// whose inverse DFT peaks at the translation that best aligns the two
/// spatial-domain signals. Bins where both spectra vanish contribute zero
/// rather than `NaN`.
pub fn unit_phase_correlation(a: &[Complex32], b: &[Complex32]) -> Vec<Complex32> {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&a, &b)| {
            let cross = a * b.conj();
            let mag = cross.norm();
            if mag > 1e-12 {
                cross / mag
            } else {
                Complex32::default()
            }
        })
        .collect()
}

/// Rotates a `width * height` row-major buffer so that the element that was
/// at index `(0, 0)` (the zero-frequency / zero-lag term) ends up centered,
/// at `(width / 2, height / 2)`. This is the standard "fftshift" used so
/// that phase-correlation peaks near zero lag aren't split across the
/// buffer's edges.
pub fn fftshift0_to_origin(buffer: &mut [Complex32], width: usize, height: usize) {
    assert_eq!(buffer.len(), width * height);
    let shifted: Vec<Complex32> = (0..height)
        .flat_map(|y| {
            let src_y = (y + height / 2) % height;
            (0..width).map(move |x| {
                let src_x = (x + width / 2) % width;
                (src_y, src_x)
            })
        })
        .map(|(src_y, src_x)| buffer[src_y * width + src_x])
        .collect();
    buffer.copy_from_slice(&shifted);
}

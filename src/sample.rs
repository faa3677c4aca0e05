//! The sample type and the handful of vector-math primitives the engine
//! needs internally. Everything here is `pub(crate)`: per spec, vector math
//! is an external collaborator this crate merely assumes, not a deliverable
//! in its own right.

/// 32-bit or 64-bit IEEE-754 float, chosen at build time by the `f64`
/// feature. Every Buffer, Port and the external driver boundary agree on
/// this single choice.
#[cfg(not(feature = "f64"))]
pub type Sample = f32;
#[cfg(feature = "f64")]
pub type Sample = f64;

/// Copy `src` into `dst`. Used for the fan-in "copy first source" step.
pub(crate) fn copy_into(dst: &mut [Sample], src: &[Sample]) {
    dst.copy_from_slice(src);
}

/// `dst[i] += src[i]` for all `i`. Used for the fan-in "add the rest" step.
pub(crate) fn add_into(dst: &mut [Sample], src: &[Sample]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += *s;
    }
}

/// Fill a buffer with silence.
pub(crate) fn clear(dst: &mut [Sample]) {
    dst.fill(0.0);
}

//! Boundary to the tensor execution engine.
//!
//! The detector only ever talks to the engine through [`InferenceSession`]:
//! feed one named byte tensor, run, then fetch named float outputs.

pub mod stub;
#[cfg(feature = "tflite")]
pub mod tflite;

pub use stub::StubSession;
#[cfg(feature = "tflite")]
pub use self::tflite::TfliteSession;

use crate::Result;

pub trait InferenceSession {
    /// Copies `data` into the input tensor `name`; `dims` is its NHWC shape.
    fn feed(&mut self, name: &str, data: &[u8], dims: [usize; 4]) -> Result<()>;

    /// Runs the graph. `collect_stats` asks the engine to record timing for
    /// [`InferenceSession::stat_string`].
    fn run(&mut self, output_names: &[String], collect_stats: bool) -> Result<()>;

    /// Copies up to `dst.len()` values of output `name`, returning how many
    /// were written.
    fn fetch(&mut self, name: &str, dst: &mut [f32]) -> Result<usize>;

    fn stat_string(&self) -> String;

    /// Releases engine resources. Calling it twice is a no-op.
    fn close(&mut self);
}

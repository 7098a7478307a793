//! The prediction hook invoked on every sampled frame.
//!
//! A [`Predictor`] turns a sampled frame into the image stored under the
//! prediction directory. The default [`EchoPredictor`] returns the frame
//! unchanged; a model-backed implementation plugs in through
//! [`Pipeline::with_predictor`](crate::Pipeline::with_predictor) without
//! touching sampling or the manifest.
//!
//! Any `Fn(&DynamicImage) -> Result<DynamicImage, String>` closure that is
//! `Send + Sync` is also a predictor:
//!
//! ```
//! use std::sync::Arc;
//!
//! use framesieve::{Pipeline, PipelineConfig, Predictor};
//!
//! let invert = |frame: &image::DynamicImage| {
//!     let mut output = frame.clone();
//!     output.invert();
//!     Ok::<_, String>(output)
//! };
//! let predictor: Arc<dyn Predictor> = Arc::new(invert);
//! let _pipeline = Pipeline::new(PipelineConfig::new()).with_predictor(predictor);
//! ```

use image::DynamicImage;

/// Produces the prediction artifact for one sampled frame.
///
/// Implementations must be [`Send`] and [`Sync`]: with the `rayon` feature
/// several videos share one predictor. Stateful models should guard their
/// state internally.
pub trait Predictor: Send + Sync {
    /// Produce the artifact for `frame`. Errors abort the run.
    fn predict(&self, frame: &DynamicImage) -> Result<DynamicImage, String>;
}

/// Placeholder predictor that echoes the sampled frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoPredictor;

impl Predictor for EchoPredictor {
    fn predict(&self, frame: &DynamicImage) -> Result<DynamicImage, String> {
        Ok(frame.clone())
    }
}

impl<F> Predictor for F
where
    F: Fn(&DynamicImage) -> Result<DynamicImage, String> + Send + Sync,
{
    fn predict(&self, frame: &DynamicImage) -> Result<DynamicImage, String> {
        self(frame)
    }
}

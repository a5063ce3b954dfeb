use linfa::Float;
use ndarray::Array2;

/// Sampling method generating a DoE within a hyper-rectangle
///
/// The sample space is `[lower_i, upper_i]^nx` where `nx` is the number of
/// components of a sample.
pub trait SamplingMethod<F: Float> {
    /// Bounds of the sample space as a (nx, 2) matrix,
    /// the ith row being the [lower, upper] interval of the ith component.
    fn sampling_space(&self) -> &Array2<F>;

    /// Generates `ns` samples in the unit hypercube `[0, 1]^nx`
    fn normalized_sample(&self, ns: usize) -> Array2<F>;

    /// Generates `ns` samples scaled to the sample space bounds
    fn sample(&self, ns: usize) -> Array2<F> {
        let xlimits = self.sampling_space();
        let lower = xlimits.column(0);
        let width = &xlimits.column(1) - &lower;
        self.normalized_sample(ns) * width + lower
    }
}

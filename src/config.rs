use burn::optim::{SgdConfig, momentum::MomentumConfig};
use burn::prelude::*;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub optimizer: SgdConfig,
    #[config(default = 30)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    /// Fraction of the training partition used for training, the rest is kept for validation.
    #[config(default = "5.0 / 6.0")]
    pub train_split: f64,
    #[config(default = 42)]
    pub seed: u64,
    /// Root holding the `<dataset>/raw/` directories.
    #[config(default = "String::from(\"data\")")]
    pub data_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(optimizer_config(0.99))
    }
}

#[derive(Config, Debug)]
pub struct EvaluationConfig {
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = "String::from(\"data\")")]
    pub data_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Stochastic gradient descent with classical momentum (no dampening).
pub fn optimizer_config(momentum: f64) -> SgdConfig {
    SgdConfig::new().with_momentum(Some(
        MomentumConfig::new()
            .with_momentum(momentum)
            .with_dampening(0.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use burn::optim::{GradientsParams, Optimizer};

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn weight(linear: &Linear<TestAutodiffBackend>) -> f32 {
        linear.weight.val().into_data().to_vec::<f32>().unwrap()[0]
    }

    #[test]
    fn training_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.num_epochs, 30);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.lr, 1e-3);
        assert_eq!(config.train_split, 5.0 / 6.0);
        assert_eq!(config.data_dir, "data");
    }

    #[test]
    fn optimizer_applies_undampened_momentum() {
        let device = Default::default();
        let config = TrainingConfig::default();
        let mut linear: Linear<TestAutodiffBackend> = LinearConfig::new(1, 1).init(&device);
        let mut optim = config
            .optimizer
            .init::<TestAutodiffBackend, Linear<TestAutodiffBackend>>();

        // d(w * 1 + b)/dw is 1 at every step
        let mut weights = vec![weight(&linear)];
        for _ in 0..2 {
            let input = Tensor::<TestAutodiffBackend, 2>::ones([1, 1], &device);
            let loss = linear.forward(input).sum();
            let grads = GradientsParams::from_grads(loss.backward(), &linear);
            linear = optim.step(config.lr, linear, grads);
            weights.push(weight(&linear));
        }

        // first step: velocity 1; second: 1 * (1 - 0) + 0.99 * 1
        let first = weights[0] - weights[1];
        let second = weights[1] - weights[2];
        assert!((first - 1e-3).abs() < 1e-6, "{first}");
        assert!((second - 1.99e-3).abs() < 1e-6, "{second}");
    }

    #[test]
    fn training_config_survives_a_save() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("config.json");
        let config = TrainingConfig::default().with_num_epochs(1);
        config.save(&path).unwrap();

        let loaded = TrainingConfig::load(&path).unwrap();
        assert_eq!(loaded.num_epochs, 1);
        assert_eq!(loaded.seed, config.seed);
    }
}

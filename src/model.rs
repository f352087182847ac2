//! The five convolutional classifiers, declared as layer lists.

use crate::dataset::{HEIGHT, NUM_CLASSES, WIDTH};
use crate::error;
use crate::registry::Registry;
use burn::{
    nn::{
        Linear, LinearConfig, PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
    },
    prelude::*,
    train::ClassificationOutput,
};

/// A 2D convolution of the body or of a pointwise head.
#[derive(Config, Debug, PartialEq)]
pub struct ConvLayerConfig {
    /// `[channels_in, channels_out]`
    pub channels: [usize; 2],
    pub kernel_size: usize,
    #[config(default = 1)]
    pub stride: usize,
    /// Pads the input so that a stride-1 convolution keeps the spatial size.
    #[config(default = false)]
    pub same_padding: bool,
}

impl ConvLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv2d<B> {
        let padding = if self.same_padding {
            PaddingConfig2d::Same
        } else {
            PaddingConfig2d::Valid
        };
        Conv2dConfig::new(self.channels, [self.kernel_size, self.kernel_size])
            .with_stride([self.stride, self.stride])
            .with_padding(padding)
            .init(device)
    }

    /// Spatial size of the output for an input of spatial size `size`.
    pub fn output_size(&self, size: usize) -> usize {
        if self.same_padding {
            size
        } else {
            (size - self.kernel_size) / self.stride + 1
        }
    }
}

/// Classification head placed after the body.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HeadConfig {
    /// Flatten, `Linear(features, hidden)`, ReLU, `Linear(hidden, num_classes)`.
    Dense { hidden: usize },
    /// `1x1 conv(channels, hidden)`, ReLU, `1x1 conv(hidden, num_classes)`,
    /// then a global average over the spatial dimensions.
    Pointwise { hidden: usize },
}

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Convolutions of the feature extractor, each followed by a ReLU.
    pub body: Vec<ConvLayerConfig>,
    pub head: HeadConfig,
    #[config(default = 1)]
    pub input_channels: usize,
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,
}

impl ClassifierConfig {
    /// `[channels, height, width]` of the body output for a `[input_channels, HEIGHT, WIDTH]` input.
    pub fn body_output_shape(&self) -> [usize; 3] {
        self.body.iter().fold(
            [self.input_channels, HEIGHT, WIDTH],
            |[_channels, height, width], conv| {
                [conv.channels[1], conv.output_size(height), conv.output_size(width)]
            },
        )
    }

    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        let body = self.body.iter().map(|conv| conv.init(device)).collect();
        let [channels, height, width] = self.body_output_shape();

        let (dense, pointwise) = match self.head {
            HeadConfig::Dense { hidden } => (
                vec![
                    LinearConfig::new(channels * height * width, hidden).init(device),
                    LinearConfig::new(hidden, self.num_classes).init(device),
                ],
                vec![],
            ),
            HeadConfig::Pointwise { hidden } => (
                vec![],
                vec![
                    ConvLayerConfig::new([channels, hidden], 1).init(device),
                    ConvLayerConfig::new([hidden, self.num_classes], 1).init(device),
                ],
            ),
        };

        Classifier {
            body,
            dense,
            pointwise,
            activation: Relu::new(),
        }
    }
}

/// A feed-forward convolutional classifier.
///
/// Exactly one of `dense` and `pointwise` holds the head layers.
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    pub body: Vec<Conv2d<B>>,
    pub dense: Vec<Linear<B>>,
    pub pointwise: Vec<Conv2d<B>>,
    pub activation: Relu,
}

impl<B: Backend> Classifier<B> {
    /// # Shapes
    ///   - Input [batch, channels, HEIGHT, WIDTH]
    ///   - Output [batch, num_classes] (logits)
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _channels, _height, _width] = images.dims();

        let mut x = images;
        for conv in &self.body {
            x = self.activation.forward(conv.forward(x));
        }

        if !self.dense.is_empty() {
            let mut x = x.flatten::<2>(1, 3);
            for (i, linear) in self.dense.iter().enumerate() {
                x = linear.forward(x);
                if i + 1 < self.dense.len() {
                    x = self.activation.forward(x);
                }
            }
            x
        } else {
            for (i, conv) in self.pointwise.iter().enumerate() {
                x = conv.forward(x);
                if i + 1 < self.pointwise.len() {
                    x = self.activation.forward(x);
                }
            }
            let [_batch_size, num_classes, _height, _width] = x.dims();
            // global average pooling
            x.mean_dim(3).mean_dim(2).reshape([batch_size, num_classes])
        }
    }

    /// Logits together with their mean cross-entropy loss against `targets`.
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, ..] = images.dims();
        debug_assert_eq!([batch_size], targets.dims());

        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

/// The fixed set of architectures selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Architecture {
    Nn1,
    Nn2,
    Nn3,
    Nn4,
    Nn5,
}

pub const ARCHITECTURES: Registry<Architecture> = Registry::new(
    "model",
    &[
        ("NN1", Architecture::Nn1),
        ("NN2", Architecture::Nn2),
        ("NN3", Architecture::Nn3),
        ("NN4", Architecture::Nn4),
        ("NN5", Architecture::Nn5),
    ],
);

impl Architecture {
    pub const ALL: [Architecture; 5] = [
        Architecture::Nn1,
        Architecture::Nn2,
        Architecture::Nn3,
        Architecture::Nn4,
        Architecture::Nn5,
    ];

    pub fn from_name(name: &str) -> error::Result<Self> {
        ARCHITECTURES.lookup(name)
    }

    pub fn config(self) -> ClassifierConfig {
        // same-padded feature convolution followed by a 2x2 stride-2 downsampling
        let stage = |channels: [usize; 2], kernel_size: usize| {
            [
                ConvLayerConfig::new(channels, kernel_size).with_same_padding(true),
                ConvLayerConfig::new([channels[1], channels[1]], 2).with_stride(2),
            ]
        };
        let dense = HeadConfig::Dense { hidden: 100 };

        match self {
            Architecture::Nn1 => ClassifierConfig::new(stage([1, 32], 3).to_vec(), dense),
            Architecture::Nn2 => ClassifierConfig::new(stage([1, 32], 5).to_vec(), dense),
            Architecture::Nn3 => ClassifierConfig::new(stage([1, 64], 5).to_vec(), dense),
            Architecture::Nn4 => ClassifierConfig::new(
                [stage([1, 32], 3), stage([32, 64], 5)].concat(),
                dense,
            ),
            Architecture::Nn5 => ClassifierConfig::new(
                [stage([1, 32], 3), stage([32, 64], 5)].concat(),
                HeadConfig::Pointwise { hidden: 128 },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn every_architecture_outputs_one_logit_per_class() {
        let device = Default::default();
        for architecture in Architecture::ALL {
            let model = architecture.config().init::<TestBackend>(&device);
            let images = Tensor::<TestBackend, 4>::random(
                [3, 1, HEIGHT, WIDTH],
                burn::tensor::Distribution::Uniform(0.0, 1.0),
                &device,
            );
            assert_eq!(model.forward(images).dims(), [3, NUM_CLASSES], "{architecture:?}");
        }
    }

    #[test]
    fn body_shapes_match_the_declared_layers() {
        assert_eq!(Architecture::Nn1.config().body_output_shape(), [32, 14, 14]);
        assert_eq!(Architecture::Nn3.config().body_output_shape(), [64, 14, 14]);
        assert_eq!(Architecture::Nn4.config().body_output_shape(), [64, 7, 7]);
        assert_eq!(Architecture::Nn5.config().body_output_shape(), [64, 7, 7]);
    }

    #[test]
    fn heads_follow_the_architecture() {
        let device = Default::default();

        let nn4 = Architecture::Nn4.config().init::<TestBackend>(&device);
        assert_eq!(nn4.body.len(), 4);
        assert_eq!(nn4.dense[0].weight.dims(), [64 * 7 * 7, 100]);
        assert!(nn4.pointwise.is_empty());

        let nn5 = Architecture::Nn5.config().init::<TestBackend>(&device);
        assert!(nn5.dense.is_empty());
        assert_eq!(nn5.pointwise[0].weight.dims(), [128, 64, 1, 1]);
        assert_eq!(nn5.pointwise[1].weight.dims(), [10, 128, 1, 1]);

        let nn2 = Architecture::Nn2.config().init::<TestBackend>(&device);
        assert_eq!(nn2.body[0].weight.dims(), [32, 1, 5, 5]);
    }

    #[test]
    fn classifier_config_survives_a_save() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("nn5.json");
        let config = Architecture::Nn5.config();
        config.save(&path).unwrap();

        let loaded = ClassifierConfig::load(&path).unwrap();
        assert_eq!(loaded.body, config.body);
        assert_eq!(loaded.head, HeadConfig::Pointwise { hidden: 128 });
        assert_eq!(loaded.num_classes, NUM_CLASSES);
    }

    #[test]
    fn model_names_resolve() {
        assert_eq!(Architecture::from_name("NN3").unwrap(), Architecture::Nn3);
        assert!(matches!(
            Architecture::from_name("NN6"),
            Err(error::Error::UnknownIdentifier { .. })
        ));
    }

    #[test]
    fn classification_loss_is_non_negative() {
        let device = Default::default();
        let model = Architecture::Nn1.config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 1, HEIGHT, WIDTH], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_data([3, 7], &device);

        let output = model.forward_classification(images, targets);
        assert_eq!(output.output.dims(), [2, NUM_CLASSES]);
        assert!(output.loss.into_scalar() >= 0.0);
    }
}

use crate::error::{Error, Result};
use crate::registry::Registry;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::{
    Dataset, InMemDataset,
    transform::{PartialDataset, ShuffledDataset},
};
use burn::prelude::*;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// file names used by both the MNIST and FashionMNIST distributions
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;
const IMAGES_HEADER_LEN: usize = 16;
const LABELS_HEADER_LEN: usize = 8;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
pub const NUM_CLASSES: usize = 10;

/// The labeled image collections known to the command-line tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetKind {
    Mnist,
    FashionMnist,
}

pub const DATASETS: Registry<DatasetKind> = Registry::new(
    "dataset",
    &[
        ("MNIST", DatasetKind::Mnist),
        ("FashionMNIST", DatasetKind::FashionMnist),
    ],
);

const MNIST_CLASSES: [&str; NUM_CLASSES] = [
    "0 - zero",
    "1 - one",
    "2 - two",
    "3 - three",
    "4 - four",
    "5 - five",
    "6 - six",
    "7 - seven",
    "8 - eight",
    "9 - nine",
];

const FASHION_MNIST_CLASSES: [&str; NUM_CLASSES] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

impl DatasetKind {
    pub fn from_name(name: &str) -> Result<Self> {
        DATASETS.lookup(name)
    }

    /// Directory under the data root holding the `raw/` IDX files.
    pub fn dir_name(self) -> &'static str {
        match self {
            DatasetKind::Mnist => "MNIST",
            DatasetKind::FashionMnist => "FashionMNIST",
        }
    }

    pub fn classes(self) -> &'static [&'static str; NUM_CLASSES] {
        match self {
            DatasetKind::Mnist => &MNIST_CLASSES,
            DatasetKind::FashionMnist => &FASHION_MNIST_CLASSES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

/// A single labeled image.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ImageItem {
    /// Row-major brightness values, in between 0 and 255.
    ///
    /// # Shape
    /// [HEIGHT * WIDTH]
    pub pixels: Vec<u8>,

    /// Class index, in between 0 and 9.
    pub label: u8,
}

/// One partition of an MNIST-formatted dataset, held in memory.
///
/// The IDX files are read from `<data_dir>/<MNIST|FashionMNIST>/raw/`, the layout
/// torchvision downloads into. Each file may also be gzip-compressed (`.gz` suffix).
/// Nothing is downloaded.
pub struct ImageDataset {
    kind: DatasetKind,
    dataset: InMemDataset<ImageItem>,
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl ImageDataset {
    pub fn train(kind: DatasetKind, data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(kind, Partition::Train, data_dir)
    }

    pub fn test(kind: DatasetKind, data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(kind, Partition::Test, data_dir)
    }

    pub fn new(kind: DatasetKind, partition: Partition, data_dir: impl AsRef<Path>) -> Result<Self> {
        let root = data_dir.as_ref().join(kind.dir_name()).join("raw");
        let (images_name, labels_name) = match partition {
            Partition::Train => (TRAIN_IMAGES, TRAIN_LABELS),
            Partition::Test => (TEST_IMAGES, TEST_LABELS),
        };

        let images_path = root.join(images_name);
        let images = parse_images(&images_path, &read_idx_file(&images_path)?)?;
        let labels_path = root.join(labels_name);
        let labels = parse_labels(&labels_path, &read_idx_file(&labels_path)?)?;

        if images.len() != labels.len() {
            return Err(Error::MalformedDataset {
                path: labels_path,
                reason: format!("{} labels for {} images", labels.len(), images.len()),
            });
        }

        let items: Vec<_> = images
            .into_iter()
            .zip(labels)
            .map(|(pixels, label)| ImageItem { pixels, label })
            .collect();

        Ok(Self {
            kind,
            dataset: InMemDataset::new(items),
        })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }
}

/// Reads `path`, or its gzip-compressed sibling `<path>.gz` if the former is absent.
fn read_idx_file(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        return Ok(std::fs::read(path)?);
    }

    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);
    if !gz_path.exists() {
        return Err(Error::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut bytes = Vec::new();
    GzDecoder::new(File::open(&gz_path)?).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|word| <[u8; 4]>::try_from(word).ok())
        .map(u32::from_be_bytes)
}

fn malformed(path: &Path, reason: impl Into<String>) -> Error {
    Error::MalformedDataset {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Parses an IDX3 image file: a 16-byte header (magic, count, rows, columns)
/// followed by `count * rows * columns` brightness bytes.
pub(crate) fn parse_images(path: &Path, bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let header = |offset| read_u32(bytes, offset).ok_or_else(|| malformed(path, "truncated header"));
    let magic = header(0)?;
    if magic != IMAGES_MAGIC {
        return Err(malformed(path, format!("unexpected magic number {magic:#010x}")));
    }
    let size = header(4)? as usize;
    let (rows, columns) = (header(8)? as usize, header(12)? as usize);
    if (rows, columns) != (HEIGHT, WIDTH) {
        return Err(malformed(path, format!("images are {rows}x{columns}, expected {HEIGHT}x{WIDTH}")));
    }

    let body = &bytes[IMAGES_HEADER_LEN..];
    if body.len() != size * HEIGHT * WIDTH {
        return Err(malformed(
            path,
            format!("{} pixel bytes for {size} images", body.len()),
        ));
    }

    Ok(body
        .chunks(HEIGHT * WIDTH)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Parses an IDX1 label file: an 8-byte header (magic, count) followed by one byte per label.
pub(crate) fn parse_labels(path: &Path, bytes: &[u8]) -> Result<Vec<u8>> {
    let header = |offset| read_u32(bytes, offset).ok_or_else(|| malformed(path, "truncated header"));
    let magic = header(0)?;
    if magic != LABELS_MAGIC {
        return Err(malformed(path, format!("unexpected magic number {magic:#010x}")));
    }
    let size = header(4)? as usize;

    let labels = &bytes[LABELS_HEADER_LEN..];
    if labels.len() != size {
        return Err(malformed(path, format!("{} label bytes for {size} labels", labels.len())));
    }
    if let Some(label) = labels.iter().find(|label| **label as usize >= NUM_CLASSES) {
        return Err(malformed(path, format!("label {label} out of range")));
    }

    Ok(labels.to_vec())
}

/// Number of items kept for training when splitting `num_items` with `ratio`.
///
/// The validation split receives the remaining `num_items - train` items.
pub fn train_split_len(num_items: usize, ratio: f64) -> usize {
    ((num_items as f64 * ratio) as usize).min(num_items)
}

pub type SplitDataset<D> = PartialDataset<Arc<ShuffledDataset<D, ImageItem>>, ImageItem>;

/// Shuffles `dataset` with `seed` and splits it into (train, validation) partitions.
pub fn split_train_validation<D>(
    dataset: D,
    ratio: f64,
    seed: u64,
) -> (SplitDataset<D>, SplitDataset<D>)
where
    D: Dataset<ImageItem>,
{
    let num_items = dataset.len();
    let num_train = train_split_len(num_items, ratio);

    let shuffled = Arc::new(ShuffledDataset::with_seed(dataset, seed));
    let train = PartialDataset::new(Arc::clone(&shuffled), 0, num_train);
    let valid = PartialDataset::new(shuffled, num_train, num_items);
    (train, valid)
}

#[derive(Clone, Default)]
pub struct ImageBatcher {}

#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Brightness scaled into [0, 1].
    ///
    /// # Shape
    /// [batch_size, 1, HEIGHT, WIDTH]
    pub images: Tensor<B, 4>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            images: self.images.to_device(device),
            targets: self.targets.to_device(device),
        }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let mut pixels: Vec<u8> = Vec::with_capacity(batch_size * HEIGHT * WIDTH);
        let mut labels = Vec::with_capacity(batch_size);
        for item in items {
            debug_assert_eq!(item.pixels.len(), HEIGHT * WIDTH);
            pixels.extend(item.pixels);
            labels.push((item.label as i64).elem::<B::IntElem>());
        }

        let images = TensorData::new(pixels, [batch_size, 1, HEIGHT, WIDTH])
            .convert::<B::FloatElem>();
        let images = Tensor::<B, 4>::from_data(images, device) / 255;
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

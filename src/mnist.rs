use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail, ensure};
use machine_learning::dataset::Dataset;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;
const IMAGES_FILE: &str = "train-images-idx3-ubyte";
const LABELS_FILE: &str = "train-labels-idx1-ubyte";

/// The amount of digit classes, the width of every one-hot target.
pub const NUM_CLASSES: usize = 10;

/// Loads the MNIST training split from `dir/MNIST/raw` or, failing that, from `dir` itself.
///
/// Pixels are scaled to `[0, 1]` and labels are one-hot encoded.
pub fn load(dir: &Path) -> Result<Dataset> {
    let raw = dir.join("MNIST").join("raw");
    let dir = [raw.as_path(), dir]
        .into_iter()
        .find(|dir| dir.join(IMAGES_FILE).is_file())
        .with_context(|| format!("no {IMAGES_FILE} under {}", dir.display()))?;

    let images = read(dir.join(IMAGES_FILE))?;
    let labels = read(dir.join(LABELS_FILE))?;

    parse(&images, &labels)
}

fn read(path: PathBuf) -> Result<Vec<u8>> {
    fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
}

/// Builds a dataset from the raw contents of an IDX image file and its IDX label file.
pub fn parse(images: &[u8], labels: &[u8]) -> Result<Dataset> {
    ensure!(
        header(images, 0)? == IMAGES_MAGIC,
        "bad magic number in the image file"
    );
    ensure!(
        header(labels, 0)? == LABELS_MAGIC,
        "bad magic number in the label file"
    );

    let count = header(images, 1)? as usize;
    let rows = header(images, 2)? as usize;
    let cols = header(images, 3)? as usize;
    let pixels = &images[16..];
    let labels_count = header(labels, 1)? as usize;
    let labels = &labels[8..];

    ensure!(
        count == labels_count,
        "{count} images but {labels_count} labels"
    );

    let x_size = rows
        .checked_mul(cols)
        .filter(|&size| size > 0)
        .with_context(|| format!("invalid image size {rows}x{cols}"))?;
    let expected = count
        .checked_mul(x_size)
        .with_context(|| format!("{count} images of {rows}x{cols} overflow"))?;
    ensure!(
        pixels.len() == expected && labels.len() == count,
        "truncated IDX file, expected {count} examples of {rows}x{cols}"
    );

    let mut data = Vec::with_capacity(count * (x_size + NUM_CLASSES));

    for (image, &label) in pixels.chunks(x_size).zip(labels) {
        let label = label as usize;
        if label >= NUM_CLASSES {
            bail!("label {label} is not a digit");
        }

        data.extend(image.iter().map(|&p| p as f32 / 255.));
        data.extend((0..NUM_CLASSES).map(|class| if class == label { 1. } else { 0. }));
    }

    Ok(Dataset::new(data, x_size, NUM_CLASSES)?)
}

/// Reads the `i`-th big endian `u32` of an IDX header.
fn header(bytes: &[u8], i: usize) -> Result<u32> {
    let Some(field) = bytes.get(i * 4..(i + 1) * 4) else {
        bail!("IDX header is too short");
    };

    Ok(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(magic: u32, dims: &[u32], body: &[u8]) -> Vec<u8> {
        let mut bytes = magic.to_be_bytes().to_vec();
        dims.iter().for_each(|d| bytes.extend(d.to_be_bytes()));
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn parses_pixels_and_one_hot_labels() {
        let images = idx(IMAGES_MAGIC, &[2, 1, 2], &[0, 255, 51, 102]);
        let labels = idx(LABELS_MAGIC, &[2], &[3, 9]);

        let dataset = parse(&images, &labels).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.x_size(), 2);
        assert_eq!(dataset.y_size(), NUM_CLASSES);

        let (x, y) = dataset.get(0, 2).unwrap();
        assert_eq!(x.row(0).to_vec(), [0., 1.]);
        assert_eq!(x.row(1).to_vec(), [0.2, 0.4]);
        assert_eq!(y.row(0).iter().position(|&v| v == 1.), Some(3));
        assert_eq!(y.row(1).iter().position(|&v| v == 1.), Some(9));
        assert_eq!(y.sum(), 2.);
    }

    #[test]
    fn rejects_malformed_files() {
        let images = idx(IMAGES_MAGIC, &[1, 1, 1], &[7]);
        let labels = idx(LABELS_MAGIC, &[1], &[1]);

        assert!(parse(&labels, &labels).is_err());
        assert!(parse(&images[..10], &labels).is_err());
        assert!(parse(&images, &idx(LABELS_MAGIC, &[2], &[1, 2])).is_err());
        assert!(parse(&idx(IMAGES_MAGIC, &[2, 1, 1], &[7]), &labels).is_err());
        assert!(parse(&images, &idx(LABELS_MAGIC, &[1], &[10])).is_err());
    }

    #[test]
    fn rejects_empty_images() {
        let labels = idx(LABELS_MAGIC, &[1], &[1]);

        assert!(parse(&idx(IMAGES_MAGIC, &[1, 0, 0], &[]), &labels).is_err());
        assert!(parse(&idx(IMAGES_MAGIC, &[1, 28, 0], &[]), &labels).is_err());
    }

    #[test]
    fn missing_directory_is_reported() {
        assert!(load(Path::new("/nonexistent/mnist")).is_err());
    }
}

//! Reader of the big-endian IDX files digit datasets are distributed in.
//!
//! Only uncompressed files are supported.

use std::{fs, path::Path};

use log::info;
use ndarray::{Array3, ArrayD};

use super::InMemoryDataset;
use crate::{MlErr, Result};

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Reads an IDX image file into an `(N, rows, cols)` array with pixels scaled to `[0, 1]`.
pub fn read_images<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>> {
    let bytes = fs::read(path)?;
    parse_images(&bytes)
}

/// Reads an IDX label file.
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let bytes = fs::read(path)?;
    parse_labels(&bytes)
}

/// Reads a pair of IDX files into a dataset.
///
/// # Arguments
/// * `images` - Path of the images file.
/// * `labels` - Path of the labels file.
///
/// # Returns
/// The dataset, or an error if either file can't be read, is malformed or they disagree on the
/// amount of samples.
pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(images: P, labels: Q) -> Result<InMemoryDataset> {
    let inputs = read_images(&images)?;
    let labels = read_labels(&labels)?;

    info!(
        samples = labels.len(),
        path:? = images.as_ref();
        "loaded idx dataset"
    );

    InMemoryDataset::new(inputs, labels)
}

fn parse_images(bytes: &[u8]) -> Result<ArrayD<f32>> {
    let mut header = Header::new(bytes);
    header.expect_magic(IMAGES_MAGIC)?;

    let n = header.next_u32()? as usize;
    let rows = header.next_u32()? as usize;
    let cols = header.next_u32()? as usize;
    let len = n
        .checked_mul(rows)
        .and_then(|len| len.checked_mul(cols))
        .ok_or_else(|| MlErr::InvalidIdx("image dimensions overflow".into()))?;
    let pixels = header.body(len)?;

    let data = pixels.iter().map(|&p| p as f32 / 255.).collect();
    let images = Array3::from_shape_vec((n, rows, cols), data).map_err(|_| MlErr::ShapeMismatch {
        what: "idx images",
        got: vec![pixels.len()],
        expected: vec![n, rows, cols],
    })?;

    Ok(images.into_dyn())
}

fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    let mut header = Header::new(bytes);
    header.expect_magic(LABELS_MAGIC)?;

    let n = header.next_u32()? as usize;
    let labels = header.body(n)?;

    Ok(labels.iter().map(|&l| l as usize).collect())
}

/// Cursor over the header of an IDX file.
struct Header<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Header<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn next_u32(&mut self) -> Result<u32> {
        let end = self.offset + 4;
        let word = self
            .bytes
            .get(self.offset..end)
            .ok_or_else(|| MlErr::InvalidIdx(format!("truncated header at byte {}", self.offset)))?;

        self.offset = end;
        Ok(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
    }

    fn expect_magic(&mut self, expected: u32) -> Result<()> {
        let magic = self.next_u32()?;
        if magic != expected {
            return Err(MlErr::InvalidIdx(format!(
                "magic number {magic:#010x}, expected {expected:#010x}"
            )));
        }

        Ok(())
    }

    /// Everything after the header, which must be exactly `len` bytes long.
    fn body(&self, len: usize) -> Result<&'a [u8]> {
        let body = &self.bytes[self.offset..];
        if body.len() != len {
            return Err(MlErr::InvalidIdx(format!(
                "the header announces {len} bytes of data but there are {}",
                body.len()
            )));
        }

        Ok(body)
    }
}

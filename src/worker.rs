use std::io::Cursor;

use camino::Utf8Path;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::domain::{ImageReference, ProvenanceRecord};
use crate::error::HarvestError;
use crate::fetch::ImageFetcher;
use crate::ledger::ProvenanceLedger;
use crate::store::ImageStore;

/// Downloads one reference, re-encodes it as RGB JPEG and records it.
pub struct TranscodeWorker<F: ImageFetcher> {
    fetcher: F,
}

impl<F: ImageFetcher> TranscodeWorker<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// `Ok(false)` means this item was skipped; siblings are unaffected. A
    /// reference already in the ledger under `query_label` is skipped before
    /// anything is fetched.
    /// Only folder creation and ledger failures surface as errors.
    pub fn process(
        &self,
        folder: &Utf8Path,
        index: usize,
        reference: &ImageReference,
        query_label: &str,
        ledger: &mut ProvenanceLedger,
    ) -> Result<bool, HarvestError> {
        if ledger.contains(query_label, &reference.url) {
            warn!("already recorded for \"{query_label}\": {}", reference.url);
            return Ok(false);
        }
        ImageStore::ensure_dir(folder)?;
        let path = ImageStore::image_path(folder, index);

        match self.transcode(reference, &path) {
            Ok(()) => {
                let recorded = ledger.record(&ProvenanceRecord::new(query_label, reference))?;
                debug!("saved {} -> {path}", reference.url);
                Ok(recorded)
            }
            Err(err) => {
                warn!("download failed for {}: {err}", reference.url);
                Ok(false)
            }
        }
    }

    fn transcode(&self, reference: &ImageReference, path: &Utf8Path) -> Result<(), HarvestError> {
        let bytes = self.fetcher.fetch(&reference.url)?;
        let jpeg = transcode_to_jpeg(&reference.url, &bytes)?;
        ImageStore::write_bytes_atomic(path, &jpeg).map_err(|err| HarvestError::ImageWrite {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

/// Decodes any supported format and re-encodes as 8-bit RGB JPEG.
pub fn transcode_to_jpeg(url: &str, bytes: &[u8]) -> Result<Vec<u8>, HarvestError> {
    let decoded = image::load_from_memory(bytes).map_err(|err| HarvestError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|err| HarvestError::Encode {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::{Rgba, RgbaImage};

    use super::*;

    #[test]
    fn transcode_drops_alpha_channel() {
        let source = RgbaImage::from_pixel(4, 3, Rgba([10, 200, 30, 128]));
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(source)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let jpeg = transcode_to_jpeg("https://x.example/a.png", png.get_ref()).unwrap();
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn transcode_rejects_html() {
        let err = transcode_to_jpeg("https://x.example/page", b"<html></html>").unwrap_err();
        assert_matches!(err, HarvestError::Decode { .. });
    }
}

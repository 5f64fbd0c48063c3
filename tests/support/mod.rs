#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use plant_harvest::browser::{BrowserLauncher, BrowserPage};
use plant_harvest::config::{Config, ConfigLoader, SearchOptions};
use plant_harvest::error::HarvestError;
use plant_harvest::fetch::ImageFetcher;

pub const THUMBNAIL_SELECTOR: &str = "img.thumb";
pub const FULL_IMAGE_SELECTOR: &str = "img.full";

pub fn search_options() -> SearchOptions {
    let mut options = ConfigLoader::resolve_config(Config::default())
        .unwrap()
        .search;
    options.thumbnail_selector = THUMBNAIL_SELECTOR.to_string();
    options.full_image_selector = FULL_IMAGE_SELECTOR.to_string();
    options.settle = Duration::ZERO;
    options.scroll_pause = Duration::ZERO;
    options
}

/// One result thumbnail and what clicking it reveals.
#[derive(Debug, Clone)]
pub struct FakeThumb {
    pub src: Option<String>,
    pub fail_click: bool,
}

impl FakeThumb {
    pub fn image(url: &str) -> Self {
        Self {
            src: Some(url.to_string()),
            fail_click: false,
        }
    }

    pub fn without_src() -> Self {
        Self {
            src: None,
            fail_click: false,
        }
    }

    pub fn broken(url: &str) -> Self {
        Self {
            src: Some(url.to_string()),
            fail_click: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeStats {
    pub launches: usize,
    pub closes: usize,
    pub scrolls: usize,
    pub clicks: usize,
    pub navigations: Vec<String>,
}

/// A result surface that reveals one more batch of thumbnails per scroll.
#[derive(Clone)]
pub struct FakeLauncher {
    batches: Vec<Vec<FakeThumb>>,
    stats: Arc<Mutex<FakeStats>>,
    fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(batches: Vec<Vec<FakeThumb>>) -> Self {
        Self {
            batches,
            stats: Arc::new(Mutex::new(FakeStats::default())),
            fail_launch: false,
        }
    }

    pub fn failing() -> Self {
        let mut launcher = Self::new(Vec::new());
        launcher.fail_launch = true;
        launcher
    }

    pub fn stats(&self) -> std::sync::MutexGuard<'_, FakeStats> {
        self.stats.lock().unwrap()
    }
}

impl BrowserLauncher for FakeLauncher {
    type Page = FakePage;

    fn launch(&self) -> Result<FakePage, HarvestError> {
        if self.fail_launch {
            return Err(HarvestError::BrowserLaunch("no browser installed".to_string()));
        }
        self.stats.lock().unwrap().launches += 1;
        Ok(FakePage {
            batches: self.batches.clone(),
            revealed: 0,
            shown: None,
            stats: Arc::clone(&self.stats),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeElement {
    Thumb(usize),
    Full(usize),
}

pub struct FakePage {
    batches: Vec<Vec<FakeThumb>>,
    revealed: usize,
    shown: Option<usize>,
    stats: Arc<Mutex<FakeStats>>,
}

impl FakePage {
    fn visible(&self) -> Vec<&FakeThumb> {
        self.batches
            .iter()
            .take(self.revealed + 1)
            .flatten()
            .collect()
    }
}

impl BrowserPage for FakePage {
    type Element = FakeElement;

    fn navigate(&mut self, url: &str) -> Result<(), HarvestError> {
        self.stats.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    fn query_elements(&mut self, selector: &str) -> Result<Vec<FakeElement>, HarvestError> {
        if selector == THUMBNAIL_SELECTOR {
            return Ok((0..self.visible().len()).map(FakeElement::Thumb).collect());
        }
        Ok(self.shown.map(FakeElement::Full).into_iter().collect())
    }

    fn click(&mut self, element: &FakeElement) -> Result<(), HarvestError> {
        let FakeElement::Thumb(index) = *element else {
            return Err(HarvestError::BrowserAction {
                action: "click",
                message: "not a thumbnail".to_string(),
            });
        };
        self.stats.lock().unwrap().clicks += 1;
        if self.visible()[index].fail_click {
            self.shown = None;
            return Err(HarvestError::BrowserAction {
                action: "click",
                message: "element is detached".to_string(),
            });
        }
        self.shown = Some(index);
        Ok(())
    }

    fn read_attribute(
        &mut self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, HarvestError> {
        match (*element, name) {
            (FakeElement::Full(index), "src") => Ok(self.visible()[index].src.clone()),
            _ => Ok(None),
        }
    }

    fn current_url(&mut self) -> Result<String, HarvestError> {
        Ok(match self.shown {
            Some(index) => format!("https://search.example/result?img={index}"),
            None => "https://search.example/result".to_string(),
        })
    }

    fn scroll_to_bottom(&mut self) -> Result<(), HarvestError> {
        self.stats.lock().unwrap().scrolls += 1;
        if self.revealed + 1 < self.batches.len() {
            self.revealed += 1;
        }
        Ok(())
    }

    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn close(self) -> Result<(), HarvestError> {
        self.stats.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Serves canned bodies by URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

impl ImageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| HarvestError::FetchStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(8, 8, Rgb([20, 140, 60]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn image_urls(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| format!("https://img.example/leaf-{n}.jpg"))
        .collect()
}

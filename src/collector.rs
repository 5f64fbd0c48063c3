use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::{BrowserLauncher, BrowserPage};
use crate::config::SearchOptions;
use crate::domain::{ImageReference, Query, is_network_url};
use crate::error::HarvestError;

/// Why a collection session ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    /// The surface stopped rendering new thumbnails.
    Exhausted,
    PassLimit,
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub references: Vec<ImageReference>,
    pub stop: StopReason,
    pub scrolls: u32,
}

/// Per-query state. Owns the page until released.
pub struct HarvestSession<P: BrowserPage> {
    page: P,
    target: usize,
    seen: HashSet<String>,
    references: Vec<ImageReference>,
    interacted: usize,
    scrolls: u32,
}

impl<P: BrowserPage> HarvestSession<P> {
    pub fn new(page: P, target: usize) -> Self {
        Self {
            page,
            target,
            seen: HashSet::new(),
            references: Vec::new(),
            interacted: 0,
            scrolls: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.references.len() >= self.target
    }

    /// Returns false for duplicates and once the target is met.
    pub fn accept(&mut self, reference: ImageReference) -> bool {
        if self.is_complete() || !self.seen.insert(reference.url.clone()) {
            return false;
        }
        self.references.push(reference);
        true
    }

    pub fn references(&self) -> &[ImageReference] {
        &self.references
    }

    /// Closes the page and hands back what was collected.
    pub fn release(self) -> Vec<ImageReference> {
        let Self {
            page, references, ..
        } = self;
        if let Err(err) = page.close() {
            warn!("failed to release browser session: {err}");
        }
        references
    }
}

pub struct ReferenceCollector<L: BrowserLauncher> {
    launcher: L,
    options: SearchOptions,
}

impl<L: BrowserLauncher> ReferenceCollector<L> {
    pub fn new(launcher: L, options: SearchOptions) -> Self {
        Self { launcher, options }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn query_label(&self, query: &Query) -> String {
        query.search_text(&self.options.qualifier, self.options.include_subject)
    }

    pub fn collect(&self, query: &Query, target: usize) -> Result<Collection, HarvestError> {
        if target == 0 {
            return Ok(Collection {
                references: Vec::new(),
                stop: StopReason::TargetReached,
                scrolls: 0,
            });
        }

        let label = self.query_label(query);
        let url = self.options.search_url(&label);
        info!("collecting up to {target} images for \"{label}\"");

        let page = self.launcher.launch()?;
        let mut session = HarvestSession::new(page, target);
        let outcome = self.drive(&mut session, &url);
        let scrolls = session.scrolls;
        let references = session.release();
        let stop = outcome?;

        info!(
            "collected {}/{target} images for \"{label}\" ({stop:?}, {scrolls} scrolls)",
            references.len()
        );
        Ok(Collection {
            references,
            stop,
            scrolls,
        })
    }

    fn drive<P: BrowserPage>(
        &self,
        session: &mut HarvestSession<P>,
        url: &str,
    ) -> Result<StopReason, HarvestError> {
        session.page.navigate(url)?;
        let started = Instant::now();
        let mut idle_passes = 0u32;

        loop {
            let fresh = self.harvest_pass(session, started);
            if session.is_complete() {
                return Ok(StopReason::TargetReached);
            }

            if fresh == 0 {
                idle_passes += 1;
                if idle_passes >= self.options.max_idle_passes {
                    return Ok(StopReason::Exhausted);
                }
            } else {
                idle_passes = 0;
            }
            if session.scrolls >= self.options.max_scroll_passes {
                return Ok(StopReason::PassLimit);
            }
            if started.elapsed() >= self.options.max_session {
                return Ok(StopReason::TimeLimit);
            }

            if let Err(err) = session.page.scroll_to_bottom() {
                warn!("scroll failed: {err}");
            }
            session.scrolls += 1;
            session.page.wait(self.options.scroll_pause);
        }
    }

    /// Visits every thumbnail not seen in an earlier pass, stopping early
    /// once the session budget is spent. Returns how many new thumbnails
    /// were rendered.
    fn harvest_pass<P: BrowserPage>(
        &self,
        session: &mut HarvestSession<P>,
        started: Instant,
    ) -> usize {
        let thumbnails = match session.page.query_elements(&self.options.thumbnail_selector) {
            Ok(thumbnails) => thumbnails,
            Err(err) => {
                warn!("failed to enumerate thumbnails: {err}");
                return 0;
            }
        };

        let fresh = thumbnails.len().saturating_sub(session.interacted);
        for thumbnail in thumbnails.iter().skip(session.interacted) {
            if session.is_complete() {
                break;
            }
            if started.elapsed() >= self.options.max_session {
                debug!("session budget spent after {} thumbnails", session.interacted);
                break;
            }
            session.interacted += 1;
            if let Err(err) = self.inspect_thumbnail(session, thumbnail) {
                warn!("skipping thumbnail {}: {err}", session.interacted);
            }
        }
        fresh
    }

    fn inspect_thumbnail<P: BrowserPage>(
        &self,
        session: &mut HarvestSession<P>,
        thumbnail: &P::Element,
    ) -> Result<(), HarvestError> {
        session.page.click(thumbnail)?;
        session.page.wait(self.options.settle);
        let images = session
            .page
            .query_elements(&self.options.full_image_selector)?;

        for image in &images {
            if session.is_complete() {
                break;
            }
            match read_candidate(&mut session.page, image) {
                Ok(Some(reference)) => {
                    let url = reference.url.clone();
                    if session.accept(reference) {
                        debug!("accepted {url}");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("skipping candidate: {err}"),
            }
        }
        Ok(())
    }
}

fn read_candidate<P: BrowserPage>(
    page: &mut P,
    image: &P::Element,
) -> Result<Option<ImageReference>, HarvestError> {
    let Some(src) = page.read_attribute(image, "src")? else {
        return Ok(None);
    };
    if !is_network_url(&src) {
        return Ok(None);
    }
    let source_page = page.current_url()?;
    Ok(Some(ImageReference::new(src, source_page)))
}

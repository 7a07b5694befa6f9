use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use gifcover_contracts::host::TagRecord;
use gifcover_contracts::images::{AspectFilter, ImageRecord};
use gifcover_contracts::PluginResult;

use crate::gallery::GalleryFetcher;
use crate::host::HostClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AutofillSummary {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Gives every tag that still has the host's default image a random
/// portrait GIF found by searching for the tag's name and aliases.
pub struct TagAutofill<'a, R: Rng> {
    host: &'a HostClient,
    gallery: &'a GalleryFetcher,
    limit: u64,
    delay: Duration,
    rng: R,
}

impl<'a, R: Rng> TagAutofill<'a, R> {
    pub fn new(
        host: &'a HostClient,
        gallery: &'a GalleryFetcher,
        limit: u64,
        delay: Duration,
        rng: R,
    ) -> Self {
        Self {
            host,
            gallery,
            limit,
            delay,
            rng,
        }
    }

    /// Search failures skip the tag; host failures end the batch.
    pub fn run(&mut self, progress: &mut dyn FnMut(f64)) -> PluginResult<AutofillSummary> {
        let tags = self.host.default_image_tags()?;
        let mut summary = AutofillSummary {
            total: tags.len(),
            ..AutofillSummary::default()
        };
        info!("Updating {} tags", summary.total);

        for (index, tag) in tags.iter().enumerate() {
            debug!("Searching for: {} {:?}", tag.name, tag.aliases);
            match self.images_for_tag(tag) {
                Ok(images) => {
                    debug!("Found {} images", images.len());
                    match images.choose(&mut self.rng) {
                        Some(image) => {
                            self.host.save_tag_cover(&tag.id, &image.url_hd)?;
                            summary.updated += 1;
                        }
                        None => summary.skipped += 1,
                    }
                }
                Err(err) => {
                    warn!("Search for tag '{}' failed: {err}", tag.name);
                    summary.failed += 1;
                }
            }

            progress((index + 1) as f64 / summary.total as f64);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }

        info!(
            "Tag autofill finished: {} updated, {} skipped, {} failed",
            summary.updated, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Tries each candidate in turn and keeps the last list obtained. The
    /// walk stops at the first candidate that yields nothing, so later
    /// aliases are only reached while earlier ones keep producing results.
    fn images_for_tag(&self, tag: &TagRecord) -> PluginResult<Vec<ImageRecord>> {
        let mut images = Vec::new();
        for candidate in tag.search_candidates() {
            images = self
                .gallery
                .fetch_gallery_set(&candidate, AspectFilter::Vertical, self.limit, 0)?
                .images;
            if images.is_empty() {
                break;
            }
        }
        Ok(images)
    }
}

//! External content and image generation

use crate::error::{JobError, Result};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use kdp_layout::{AgeRange, BookMode, PageKind, PagePayload, PlannedPage};
use std::io::Cursor;

/// Text content returned by a content generator.
///
/// `pages` holds content pages only; structural pages are added by the
/// pipeline. The count may be off and is normalized downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBook {
    pub title: String,
    pub blurb: String,
    pub cover_prompt: String,
    pub pages: Vec<PlannedPage>,
}

/// LLM-backed book writer
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_story_spec(
        &self,
        prompt: &str,
        page_count: usize,
        age_range: AgeRange,
    ) -> Result<GeneratedBook>;

    async fn generate_coloring_spec(
        &self,
        theme: &str,
        page_count: usize,
        age_range: AgeRange,
    ) -> Result<GeneratedBook>;

    async fn generate_activity_spec(
        &self,
        theme: &str,
        page_count: usize,
        age_range: AgeRange,
    ) -> Result<GeneratedBook>;
}

/// Dispatch on mode
pub async fn generate_for_mode(
    generator: &dyn ContentGenerator,
    mode: BookMode,
    theme: &str,
    page_count: usize,
    age_range: AgeRange,
) -> Result<GeneratedBook> {
    match mode {
        BookMode::Story => generator.generate_story_spec(theme, page_count, age_range).await,
        BookMode::Coloring => {
            generator
                .generate_coloring_spec(theme, page_count, age_range)
                .await
        }
        BookMode::Activity => {
            generator
                .generate_activity_spec(theme, page_count, age_range)
                .await
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStyle {
    pub mode: BookMode,
    pub age_range: AgeRange,
    /// Black and white outlines for coloring pages
    pub line_art: bool,
}

impl ImageStyle {
    pub fn for_page(mode: BookMode, age_range: AgeRange, kind: PageKind) -> Self {
        Self {
            mode,
            age_range,
            line_art: kind == PageKind::Coloring,
        }
    }
}

/// Image model; `Ok(None)` means no image for this prompt
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str, style: &ImageStyle) -> Result<Option<Vec<u8>>>;
}

/// Deterministic offline writer, used by the CLI and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderContentGenerator;

impl PlaceholderContentGenerator {
    fn book(theme: &str, mode: BookMode, pages: Vec<PlannedPage>) -> GeneratedBook {
        GeneratedBook {
            title: theme.to_string(),
            blurb: format!("A {} book all about {}.", mode.to_string().to_lowercase(), theme),
            cover_prompt: format!("Cheerful cover illustration of {}", theme),
            pages,
        }
    }
}

#[async_trait]
impl ContentGenerator for PlaceholderContentGenerator {
    async fn generate_story_spec(
        &self,
        prompt: &str,
        page_count: usize,
        age_range: AgeRange,
    ) -> Result<GeneratedBook> {
        let pages = (0..page_count)
            .map(|i| {
                PlannedPage::new(
                    i as u32,
                    PageKind::Story,
                    PagePayload {
                        title: Some(format!("Chapter {}", i + 1)),
                        prompt: Some(format!("{}, scene {}", prompt, i + 1)),
                        text: Some(format!(
                            "Part {} of a story about {} for readers aged {}.",
                            i + 1,
                            prompt,
                            age_range.label()
                        )),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Ok(Self::book(prompt, BookMode::Story, pages))
    }

    async fn generate_coloring_spec(
        &self,
        theme: &str,
        page_count: usize,
        _age_range: AgeRange,
    ) -> Result<GeneratedBook> {
        let pages = (0..page_count)
            .map(|i| {
                PlannedPage::new(
                    i as u32,
                    PageKind::Coloring,
                    PagePayload {
                        title: Some(format!("{} #{}", theme, i + 1)),
                        prompt: Some(format!("{} coloring page {}, bold outlines", theme, i + 1)),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Ok(Self::book(theme, BookMode::Coloring, pages))
    }

    async fn generate_activity_spec(
        &self,
        theme: &str,
        page_count: usize,
        _age_range: AgeRange,
    ) -> Result<GeneratedBook> {
        let pages = (0..page_count)
            .map(|i| {
                let (kind, payload) = match i % 3 {
                    0 => (
                        PageKind::Maze,
                        PagePayload {
                            title: Some(format!("{} Maze {}", theme, i / 3 + 1)),
                            prompt: Some(format!("{} maze", theme)),
                            ..Default::default()
                        },
                    ),
                    1 => (
                        PageKind::WordSearch,
                        PagePayload {
                            title: Some("Word Search".to_string()),
                            words: theme
                                .split_whitespace()
                                .map(|w| w.to_uppercase())
                                .chain(["FUN".to_string(), "PLAY".to_string()])
                                .collect(),
                            ..Default::default()
                        },
                    ),
                    _ => (
                        PageKind::Tracing,
                        PagePayload {
                            title: Some("Trace the Letters".to_string()),
                            steps: theme
                                .chars()
                                .filter(|c| c.is_alphabetic())
                                .map(String::from)
                                .collect(),
                            ..Default::default()
                        },
                    ),
                };
                PlannedPage::new(i as u32, kind, payload)
            })
            .collect();
        Ok(Self::book(theme, BookMode::Activity, pages))
    }
}

/// Offline image source drawing a small patterned PNG per prompt
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderImageGenerator {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for PlaceholderImageGenerator {
    fn default() -> Self {
        Self {
            width_px: 48,
            height_px: 64,
        }
    }
}

impl PlaceholderImageGenerator {
    pub fn render(&self, prompt: &str, style: &ImageStyle) -> Result<Vec<u8>> {
        let seed = prompt
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let ink = if style.line_art {
            Rgb([0, 0, 0])
        } else {
            let [r, g, b, _] = seed.to_le_bytes();
            Rgb([r, g, b])
        };
        let stripe = 4 + seed % 6;

        let img = RgbImage::from_fn(self.width_px, self.height_px, |x, y| {
            let border = x < 2 || y < 2 || x + 2 >= self.width_px || y + 2 >= self.height_px;
            if border || (x + y) % stripe == 0 {
                ink
            } else {
                Rgb([255, 255, 255])
            }
        });

        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).map_err(|e| {
            JobError::Generation(format!("Failed to encode placeholder image: {}", e))
        })?;
        Ok(out.into_inner())
    }
}

#[async_trait]
impl ImageGenerator for PlaceholderImageGenerator {
    async fn generate_image(&self, prompt: &str, style: &ImageStyle) -> Result<Option<Vec<u8>>> {
        self.render(prompt, style).map(Some)
    }
}

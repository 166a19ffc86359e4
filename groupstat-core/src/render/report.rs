//! Built-in report compositor.
//!
//! Layout, top to bottom:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ title                                │
//! │ header lines                         │
//! ├──────────────────────────────────────┤
//! │ section name                   unit  │
//! │   podium: 2nd  1st  3rd  | artifact  │
//! │           name, count under each     │
//! ├──────────────────────────────────────┤
//! │ ...                                  │
//! └──────────────────────────────────────┘
//! ```

use super::text::{self, fill_rect};
use super::{Report, ReportRenderer, SectionContent};
use crate::enrich::RankedEntry;
use crate::error::Result;
use ab_glyph::FontArc;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const ACCENT: Rgba<u8> = Rgba([255, 183, 197, 255]);
const TITLE_INK: Rgba<u8> = Rgba([60, 40, 50, 255]);
const HEADER_INK: Rgba<u8> = Rgba([90, 70, 80, 255]);
const SECTION_BAR: Rgba<u8> = Rgba([120, 144, 156, 255]);
const SECTION_INK: Rgba<u8> = Rgba([255, 255, 255, 255]);
const NAME_INK: Rgba<u8> = Rgba([50, 50, 50, 255]);
const COUNT_INK: Rgba<u8> = Rgba([120, 120, 120, 255]);
const NO_DATA: Rgba<u8> = Rgba([236, 239, 241, 255]);
const FRAME: Rgba<u8> = Rgba([200, 200, 200, 255]);

const TITLE_SIZE: f32 = 40.0;
const HEADER_SIZE: f32 = 22.0;
const HEADER_LINE: u32 = 30;
const SECTION_SIZE: f32 = 26.0;
const SECTION_HEIGHT: u32 = 48;
const NAME_SIZE: f32 = 28.0;
const COUNT_SIZE: f32 = 22.0;
const NO_DATA_TEXT: &str = "No data yet";

const PODIUM_PLACES: usize = 3;
const PODIUM_GAP: u32 = 24;
const PODIUM_PADDING: u32 = 20;
const TEXT_GAP: u32 = 10;

/// Stacks report sections into a single PNG frame.
#[derive(Clone)]
pub struct StackedReportRenderer {
    font: FontArc,
    pub width: u32,
    /// Avatar side for first place; other places get 95%
    pub champion_size: u32,
}

impl StackedReportRenderer {
    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            width: 960,
            champion_size: 160,
        }
    }

    fn header(&self, title: &str, lines: &[String]) -> RgbaImage {
        let height = 32 + TITLE_SIZE as u32 + 16 + HEADER_LINE * lines.len() as u32 + 16;
        let mut band = RgbaImage::from_pixel(self.width, height, ACCENT);
        let max_width = self.width - 80;

        let title = text::fit(&self.font, TITLE_SIZE, title, max_width);
        text::draw(&mut band, &self.font, TITLE_SIZE, 40, 32, TITLE_INK, &title);

        let mut y = 32 + TITLE_SIZE as i32 + 16;
        for line in lines {
            let line = text::fit(&self.font, HEADER_SIZE, line, max_width);
            text::draw(&mut band, &self.font, HEADER_SIZE, 40, y, HEADER_INK, &line);
            y += HEADER_LINE as i32;
        }
        band
    }

    fn section_bar(&self, name: &str, unit: &str) -> RgbaImage {
        let mut bar = RgbaImage::from_pixel(self.width, SECTION_HEIGHT, SECTION_BAR);
        let (_, name_h) = text::measure(&self.font, SECTION_SIZE, name);
        let y = (SECTION_HEIGHT as i32 - name_h as i32) / 2;
        let name = text::fit(&self.font, SECTION_SIZE, name, self.width * 3 / 4);
        text::draw(&mut bar, &self.font, SECTION_SIZE, 24, y, SECTION_INK, &name);

        let (unit_w, unit_h) = text::measure(&self.font, HEADER_SIZE, unit);
        let unit_x = self.width as i32 - unit_w as i32 - 24;
        let unit_y = (SECTION_HEIGHT as i32 - unit_h as i32) / 2;
        text::draw(&mut bar, &self.font, HEADER_SIZE, unit_x, unit_y, SECTION_INK, unit);
        bar
    }

    fn avatar_tile(entry: &RankedEntry, size: u32) -> RgbaImage {
        let decoded = entry
            .avatar
            .as_deref()
            .and_then(|bytes| image::load_from_memory(bytes).ok());
        match decoded {
            Some(img) => imageops::resize(&img.to_rgba8(), size, size, FilterType::Lanczos3),
            None => {
                let mut tile = RgbaImage::from_pixel(size, size, FRAME);
                fill_rect(&mut tile, 2, 2, size.saturating_sub(4), size.saturating_sub(4), BACKGROUND);
                tile
            }
        }
    }

    fn podium_text_height() -> u32 {
        TEXT_GAP + NAME_SIZE as u32 + TEXT_GAP + COUNT_SIZE as u32 + TEXT_GAP
    }

    /// Top three with the champion in the middle, missing places filled in.
    /// Each place shows its avatar, then the display name and count below.
    fn podium(&self, entries: &[RankedEntry]) -> RgbaImage {
        let mut places: Vec<RankedEntry> = entries.iter().take(PODIUM_PLACES).cloned().collect();
        while places.len() < PODIUM_PLACES {
            places.push(RankedEntry::placeholder(places.len() + 1));
        }

        let champion = self.champion_size;
        let runner_up = champion * 95 / 100;
        let height = PODIUM_PADDING + champion + Self::podium_text_height() + PODIUM_PADDING;
        let mut row = RgbaImage::from_pixel(self.width, height, BACKGROUND);

        let total = runner_up + PODIUM_GAP + champion + PODIUM_GAP + runner_up;
        let left = self.width.saturating_sub(total) / 2;
        let bottom = PODIUM_PADDING + champion;
        let slots = [
            (&places[1], left, runner_up),
            (&places[0], left + runner_up + PODIUM_GAP, champion),
            (&places[2], left + runner_up + PODIUM_GAP + champion + PODIUM_GAP, runner_up),
        ];
        for (entry, x, size) in slots {
            let tile = Self::avatar_tile(entry, size);
            imageops::overlay(&mut row, &tile, x as i64, (bottom - size) as i64);

            let center = (x + size / 2) as i32;
            let max_width = size + PODIUM_GAP;
            let name_y = (bottom + TEXT_GAP) as i32;
            let name = text::fit(&self.font, NAME_SIZE, &entry.display_name, max_width);
            text::draw_centered(&mut row, &self.font, NAME_SIZE, center, name_y, NAME_INK, &name);

            if !entry.count_label.is_empty() {
                let count_y = name_y + (NAME_SIZE as u32 + TEXT_GAP) as i32;
                let count = text::fit(&self.font, COUNT_SIZE, &entry.count_label, max_width);
                text::draw_centered(&mut row, &self.font, COUNT_SIZE, center, count_y, COUNT_INK, &count);
            }
        }
        row
    }

    fn no_data(&self) -> RgbaImage {
        let mut row = RgbaImage::from_pixel(self.width, SECTION_HEIGHT, NO_DATA);
        let (_, h) = text::measure(&self.font, HEADER_SIZE, NO_DATA_TEXT);
        let y = (SECTION_HEIGHT as i32 - h as i32) / 2;
        text::draw_centered(
            &mut row,
            &self.font,
            HEADER_SIZE,
            self.width as i32 / 2,
            y,
            COUNT_INK,
            NO_DATA_TEXT,
        );
        row
    }

    fn artifact(&self, image: RgbaImage) -> RgbaImage {
        let image = if image.width() > self.width {
            let height = image.height() * self.width / image.width();
            imageops::resize(&image, self.width, height.max(1), FilterType::Lanczos3)
        } else {
            image
        };
        let mut row = RgbaImage::from_pixel(self.width, image.height(), BACKGROUND);
        let x = (self.width - image.width()) / 2;
        imageops::overlay(&mut row, &image, x as i64, 0);
        row
    }

    /// Compose the report into one image.
    pub fn compose(&self, report: &Report) -> Result<RgbaImage> {
        let mut blocks = vec![self.header(&report.title, &report.header)];
        for section in &report.sections {
            blocks.push(self.section_bar(&section.name, &section.unit));
            match &section.content {
                SectionContent::Ranking(entries) if entries.is_empty() => blocks.push(self.no_data()),
                SectionContent::Ranking(entries) => blocks.push(self.podium(entries)),
                SectionContent::Artifact(handle) => blocks.push(self.artifact(handle.load()?)),
            }
        }

        let height: u32 = blocks.iter().map(|b| b.height()).sum();
        let mut canvas = RgbaImage::from_pixel(self.width, height, BACKGROUND);
        let mut y = 0;
        for block in &blocks {
            imageops::overlay(&mut canvas, block, 0, y as i64);
            y += block.height();
        }
        Ok(canvas)
    }
}

#[async_trait]
impl ReportRenderer for StackedReportRenderer {
    async fn render(&self, report: &Report) -> Result<Vec<Vec<u8>>> {
        let canvas = self.compose(report)?;
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas).write_to(&mut buffer, ImageFormat::Png)?;
        Ok(vec![buffer.into_inner()])
    }
}

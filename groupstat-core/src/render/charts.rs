//! Built-in chart painter.
//!
//! Labeled charts on transparent canvases: bars with category names and
//! counts, a 24-hour strip with hour labels, and a word cloud that places
//! each word at a size proportional to its frequency.

use super::text;
use super::ChartRenderer;
use crate::error::Result;
use ab_glyph::FontArc;
use image::{Rgba, RgbaImage};

/// Soft pastel palette used for bars.
const BAR_PALETTE: [[u8; 3]; 10] = [
    [255, 138, 128],
    [255, 179, 128],
    [255, 218, 128],
    [240, 230, 140],
    [189, 252, 201],
    [144, 238, 144],
    [135, 206, 235],
    [173, 216, 230],
    [176, 196, 222],
    [221, 160, 221],
];

/// Viridis-like ramp for cloud words, rare to frequent.
const CLOUD_RAMP: [[u8; 3]; 6] = [
    [68, 1, 84],
    [65, 68, 135],
    [42, 120, 142],
    [34, 168, 132],
    [122, 209, 81],
    [253, 231, 37],
];

const IDLE_HOUR: [u8; 3] = [230, 230, 230];
const LABEL: Rgba<u8> = Rgba([80, 80, 80, 255]);
const HOUR_LABEL: Rgba<u8> = Rgba([100, 100, 100, 255]);
const COUNT_ON_BAR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const BAR_LABEL_SIZE: f32 = 18.0;
const BAR_COUNT_SIZE: f32 = 16.0;
const HOUR_LABEL_SIZE: f32 = 14.0;
const MIN_WORD_SIZE: f32 = 14.0;
const MAX_WORD_SIZE: f32 = 96.0;

/// Spiral search budget per cloud word.
const CLOUD_SPIRAL_STEPS: usize = 3000;

/// One word of a laid-out cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    /// Font size in pixels
    pub size: f32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Frequency relative to the most frequent word, in `(0, 1]`
    pub weight: f64,
}

impl PlacedWord {
    fn overlaps(&self, x: i32, y: i32, width: u32, height: u32, gap: i32) -> bool {
        x < self.x + self.width as i32 + gap
            && self.x < x + width as i32 + gap
            && y < self.y + self.height as i32 + gap
            && self.y < y + height as i32 + gap
    }
}

/// Paints bar charts, 24-hour strips and word clouds.
#[derive(Clone)]
pub struct BlockChartRenderer {
    font: FontArc,
    pub width: u32,
    pub bar_height: u32,
    pub strip_height: u32,
    pub cloud_height: u32,
}

impl BlockChartRenderer {
    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            width: 960,
            bar_height: 240,
            strip_height: 120,
            cloud_height: 450,
        }
    }

    /// Shade for one hour block, darker for busier hours.
    pub fn hour_shade(count: u64, max_count: u64) -> [u8; 3] {
        if count == 0 || max_count == 0 {
            return IDLE_HOUR;
        }
        let ratio = count as f64 / max_count as f64;
        if ratio >= 0.8 {
            [30, 80, 200]
        } else if ratio >= 0.6 {
            [50, 110, 230]
        } else if ratio >= 0.4 {
            [100, 150, 255]
        } else if ratio >= 0.2 {
            [160, 190, 255]
        } else {
            [200, 220, 255]
        }
    }

    /// Place words, most frequent first, along an outward spiral from the
    /// canvas center. Words that find no free spot are dropped.
    pub fn layout_cloud(&self, words: &[(String, u64)]) -> Vec<PlacedWord> {
        let margin = 10;
        let gap = 2;
        let max_count = words.iter().map(|(_, c)| *c).max().unwrap_or(0);
        if max_count == 0 {
            return Vec::new();
        }

        let (width, height) = (self.width as i32, self.cloud_height as i32);
        let aspect = width as f64 / height as f64;
        let mut placed: Vec<PlacedWord> = Vec::new();

        for (word, count) in words {
            if *count == 0 {
                continue;
            }
            let weight = *count as f64 / max_count as f64;
            let mut size = MIN_WORD_SIZE + (MAX_WORD_SIZE - MIN_WORD_SIZE) * weight.sqrt() as f32;
            let (mut w, mut h) = text::measure(&self.font, size, word);
            // shrink words wider than the canvas
            while w as i32 > width - 2 * margin && size > MIN_WORD_SIZE {
                size = (size * 0.8).max(MIN_WORD_SIZE);
                (w, h) = text::measure(&self.font, size, word);
            }
            if w == 0 || w as i32 > width - 2 * margin || h as i32 > height - 2 * margin {
                continue;
            }

            let origin_x = (width - w as i32) / 2;
            let origin_y = (height - h as i32) / 2;
            let spot = (0..CLOUD_SPIRAL_STEPS).find_map(|step| {
                let angle = step as f64 * 0.3;
                let radius = 1.5 * angle;
                let x = origin_x + (radius * angle.cos() * aspect) as i32;
                let y = origin_y + (radius * angle.sin()) as i32;
                let inside = x >= margin
                    && y >= margin
                    && x + w as i32 <= width - margin
                    && y + h as i32 <= height - margin;
                let free = inside && !placed.iter().any(|p| p.overlaps(x, y, w, h, gap));
                free.then_some((x, y))
            });

            if let Some((x, y)) = spot {
                placed.push(PlacedWord {
                    word: word.clone(),
                    size,
                    x,
                    y,
                    width: w,
                    height: h,
                    weight,
                });
            }
        }

        placed
    }
}

fn transparent(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]))
}

impl ChartRenderer for BlockChartRenderer {
    fn bar_chart(&self, bars: &[(String, u64)]) -> Result<RgbaImage> {
        let padding_x = 180;
        let padding_y = 40;
        let spacing = 15;
        let mut canvas = transparent(self.width, self.bar_height);
        if bars.is_empty() {
            return Ok(canvas);
        }

        let max_count = bars.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
        let n = bars.len() as u32;
        let chart_height = self.bar_height.saturating_sub(2 * padding_y);
        let bar_height = chart_height.saturating_sub((n - 1) * spacing) / n;
        let max_bar_width = self.width.saturating_sub(padding_x + 100);

        let mut y = padding_y;
        for (idx, (label, count)) in bars.iter().enumerate() {
            let bar_width = (*count as f64 / max_count as f64 * max_bar_width as f64) as u32;
            let [r, g, b] = BAR_PALETTE[idx % BAR_PALETTE.len()];
            if bar_width > 1 {
                text::fill_rect(
                    &mut canvas,
                    padding_x as i32,
                    y as i32,
                    bar_width,
                    bar_height,
                    Rgba([r, g, b, 200]),
                );
            }

            // category name, right-aligned against the bars
            let label = text::fit(&self.font, BAR_LABEL_SIZE, label, padding_x - 25);
            let (label_w, label_h) = text::measure(&self.font, BAR_LABEL_SIZE, &label);
            let label_x = padding_x as i32 - label_w as i32 - 15;
            let label_y = y as i32 + (bar_height as i32 - label_h as i32) / 2;
            text::draw(&mut canvas, &self.font, BAR_LABEL_SIZE, label_x, label_y, LABEL, &label);

            // count inside the bar when it fits, after it otherwise
            let count_text = count.to_string();
            let (count_w, count_h) = text::measure(&self.font, BAR_COUNT_SIZE, &count_text);
            let (count_x, color) = if bar_width > count_w + 30 {
                ((padding_x + bar_width - count_w - 10) as i32, COUNT_ON_BAR)
            } else {
                ((padding_x + bar_width + 8) as i32, LABEL)
            };
            let count_y = y as i32 + (bar_height as i32 - count_h as i32) / 2;
            text::draw(&mut canvas, &self.font, BAR_COUNT_SIZE, count_x, count_y, color, &count_text);

            y += bar_height + spacing;
        }

        Ok(canvas)
    }

    fn hour_strip(&self, hours: &[(u8, u64)]) -> Result<RgbaImage> {
        let padding_x = 80;
        let padding_y = 30;
        let block_height = 48;
        let mut canvas = transparent(self.width, self.strip_height);
        if hours.is_empty() {
            return Ok(canvas);
        }

        let max_count = hours.iter().map(|(_, c)| *c).max().unwrap_or(0);
        let total_width = self.width.saturating_sub(2 * padding_x);
        let block_width = total_width as f64 / hours.len() as f64;

        for (i, (_, count)) in hours.iter().enumerate() {
            let x = padding_x + (i as f64 * block_width) as u32;
            let next_x = padding_x + ((i + 1) as f64 * block_width) as u32;
            let [r, g, b] = Self::hour_shade(*count, max_count);
            text::fill_rect(
                &mut canvas,
                x as i32,
                padding_y as i32,
                next_x - x,
                block_height,
                Rgba([r, g, b, 220]),
            );
        }

        // every other hour is labeled under its block
        let label_y = (padding_y + block_height + 8) as i32;
        for (i, (hour, _)) in hours.iter().enumerate().step_by(2) {
            let center = padding_x as i32 + ((i as f64 + 0.5) * block_width) as i32;
            text::draw_centered(
                &mut canvas,
                &self.font,
                HOUR_LABEL_SIZE,
                center,
                label_y,
                HOUR_LABEL,
                &format!("{hour:02}"),
            );
        }

        Ok(canvas)
    }

    fn word_cloud(&self, words: &[(String, u64)]) -> Result<RgbaImage> {
        let mut canvas = transparent(self.width, self.cloud_height);
        for placed in self.layout_cloud(words) {
            let shade = (placed.weight * (CLOUD_RAMP.len() - 1) as f64).round() as usize;
            let [r, g, b] = CLOUD_RAMP[shade.min(CLOUD_RAMP.len() - 1)];
            text::draw(
                &mut canvas,
                &self.font,
                placed.size,
                placed.x,
                placed.y,
                Rgba([r, g, b, 255]),
                &placed.word,
            );
        }
        Ok(canvas)
    }
}

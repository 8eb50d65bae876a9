use crate::predict::{ClassLabel, Prediction};
use crate::report::load_system_font;
use crate::Result;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

const BAR_COLOR: Rgb<u8> = Rgb([135, 206, 235]); // skyblue
const AXIS_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const MARGIN_LEFT: u32 = 70;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 50;
const MARGIN_BOTTOM: u32 = 70;

/// 每个类别的预测次数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelHistogram {
    counts: Vec<(ClassLabel, usize)>,
}

impl Default for LabelHistogram {
    fn default() -> Self {
        Self {
            counts: ClassLabel::CANONICAL.iter().map(|&l| (l, 0)).collect(),
        }
    }
}

impl LabelHistogram {
    pub fn from_predictions<'a>(predictions: impl IntoIterator<Item = &'a Prediction>) -> Self {
        let mut histogram = Self::default();
        for prediction in predictions {
            histogram.add(prediction.label);
        }
        histogram
    }

    pub fn add(&mut self, label: ClassLabel) {
        if let Some(entry) = self.counts.iter_mut().find(|(l, _)| *l == label) {
            entry.1 += 1;
        }
    }

    pub fn count(&self, label: ClassLabel) -> usize {
        self.counts
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }

    pub fn entries(&self) -> &[(ClassLabel, usize)] {
        &self.counts
    }
}

/// 图表样式
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// 无字体时跳过文字
    pub font: Option<FontVec>,
    pub font_scale: f32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 500,
            title: "Prediction Results".to_string(),
            x_label: "Class Label".to_string(),
            y_label: "Count".to_string(),
            font: None,
            font_scale: 18.0,
        }
    }
}

impl ChartStyle {
    /// 尝试加载系统字体
    pub fn with_system_font() -> Self {
        Self {
            font: load_system_font(),
            ..Self::default()
        }
    }
}

/// 柱状图渲染到内存图像，无字体时只画柱子和坐标轴
pub struct BarChart;

impl BarChart {
    pub fn render(histogram: &LabelHistogram, style: &ChartStyle) -> RgbImage {
        let width = style.width.max(MARGIN_LEFT + MARGIN_RIGHT + 1);
        let height = style.height.max(MARGIN_TOP + MARGIN_BOTTOM + 1);
        let mut img = RgbImage::from_pixel(width, height, BACKGROUND_COLOR);

        let plot_left = MARGIN_LEFT as i32;
        let plot_top = MARGIN_TOP as i32;
        let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;
        let baseline = plot_top + plot_h as i32;

        // y 轴上限留 5% 余量
        let y_max = histogram.max_count().max(1) as f32 * 1.05;

        let entries = histogram.entries();
        let slot_w = plot_w as f32 / entries.len().max(1) as f32;
        let bar_w = (slot_w * 0.8).max(1.0) as u32;

        for (i, (label, count)) in entries.iter().enumerate() {
            let slot_left = plot_left as f32 + slot_w * i as f32;
            let bar_left = (slot_left + (slot_w - bar_w as f32) / 2.0) as i32;
            let bar_h = (*count as f32 / y_max * plot_h as f32).round() as u32;

            if bar_h > 0 {
                let rect = Rect::at(bar_left, baseline - bar_h as i32).of_size(bar_w, bar_h);
                draw_filled_rect_mut(&mut img, rect, BAR_COLOR);
            }

            if let Some(font) = &style.font {
                let x = bar_left + bar_w as i32 / 2 - 4 * label.as_str().len() as i32;
                draw_text_mut(
                    &mut img,
                    TEXT_COLOR,
                    x,
                    baseline + 8,
                    style.font_scale,
                    font,
                    label.as_str(),
                );
            }
        }

        // 坐标轴
        let (left, bottom) = (plot_left as f32, baseline as f32);
        draw_line_segment_mut(&mut img, (left, plot_top as f32), (left, bottom), AXIS_COLOR);
        draw_line_segment_mut(
            &mut img,
            (left, bottom),
            (left + plot_w as f32, bottom),
            AXIS_COLOR,
        );

        if let Some(font) = &style.font {
            Self::draw_text(&mut img, style, font, histogram, y_max, plot_h);
        }

        img
    }

    fn draw_text(
        img: &mut RgbImage,
        style: &ChartStyle,
        font: &FontVec,
        histogram: &LabelHistogram,
        y_max: f32,
        plot_h: u32,
    ) {
        let scale = style.font_scale;
        let center_x = (img.width() / 2) as i32;

        let title_x = center_x - 5 * style.title.len() as i32;
        draw_text_mut(img, TEXT_COLOR, title_x, 15, scale * 1.2, font, &style.title);

        let x_label_x = center_x - 4 * style.x_label.len() as i32;
        let x_label_y = img.height() as i32 - 30;
        draw_text_mut(img, TEXT_COLOR, x_label_x, x_label_y, scale, font, &style.x_label);

        draw_text_mut(img, TEXT_COLOR, 5, MARGIN_TOP as i32 - 20, scale, font, &style.y_label);

        // 整数刻度
        let baseline = (MARGIN_TOP + plot_h) as i32;
        for tick in 0..=histogram.max_count() {
            let y = baseline - (tick as f32 / y_max * plot_h as f32).round() as i32;
            draw_text_mut(
                img,
                TEXT_COLOR,
                MARGIN_LEFT as i32 - 30,
                y - 8,
                scale,
                font,
                &tick.to_string(),
            );
        }
    }

    /// 渲染并保存为图片文件
    pub fn save(histogram: &LabelHistogram, style: &ChartStyle, path: &Path) -> Result<()> {
        let img = Self::render(histogram, style);
        img.save(path)?;
        tracing::info!("Chart written to {}", path.display());
        Ok(())
    }
}

use crate::predict::Detection;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

const BBOX_COLORS: [Rgb<u8>; 3] = [Rgb([0, 200, 0]), Rgb([220, 40, 40]), Rgb([40, 90, 230])];

const BBOX_THICKNESS: i32 = 2;

const LABEL_SCALE: f32 = 16.0;

/// 按类别取颜色
pub fn class_color(class_id: usize) -> Rgb<u8> {
    BBOX_COLORS[class_id % BBOX_COLORS.len()]
}

/// 在图像上绘制检测框（有字体时附带标签和置信度）
pub fn annotate_detections(img: &mut RgbImage, detections: &[Detection], font: Option<&FontVec>) {
    let (img_w, img_h) = (img.width() as i32, img.height() as i32);

    for detection in detections {
        let left = detection.x1.round() as i32;
        let top = detection.y1.round() as i32;
        let width = detection.width().round() as u32;
        let height = detection.height().round() as u32;
        if width == 0 || height == 0 {
            continue;
        }

        let color = class_color(detection.class_id);
        for t in 0..BBOX_THICKNESS {
            let rect = Rect::at(left - t, top - t)
                .of_size(width + 2 * t as u32, height + 2 * t as u32);
            draw_hollow_rect_mut(img, rect, color);
        }

        if let Some(font) = font {
            let text = format!("{} {:.2}", detection.label, detection.confidence);
            let y = (top - LABEL_SCALE as i32 - 2).max(0);
            if left < img_w && y < img_h {
                draw_text_mut(img, color, left.max(0), y, LABEL_SCALE, font, &text);
            }
        }
    }
}

//! Minimal PNG renders of the training curves and of the confusion matrix.

use crate::error::Result;
use crate::metrics::{ConfusionMatrix, TrainingHistory};
use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::Path;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const MARGIN: u32 = 40;
const CELL: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const TRAIN_LOSS: Rgb<u8> = Rgb([0x1f, 0x77, 0xb4]);
const TRAIN_ACCURACY: Rgb<u8> = Rgb([0xff, 0x7f, 0x0e]);
const VALIDATION_LOSS: Rgb<u8> = Rgb([0x2c, 0xa0, 0x2c]);
const VALIDATION_ACCURACY: Rgb<u8> = Rgb([0xd6, 0x27, 0x28]);
// darkest shade of the confusion matrix
const HEAT: Rgb<u8> = Rgb([0x08, 0x30, 0x6b]);

fn save(img: &RgbImage, path: &Path) -> Result<()> {
    // Ensure the output directory exists
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

fn draw_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as usize;
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = (from.0 + (to.0 - from.0) * t).round();
        let y = (from.1 + (to.1 - from.1) * t).round();
        if x >= 0.0 && y >= 0.0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Draws `values` as a polyline, mapping `[0, max]` onto the plot area height.
fn draw_curve(img: &mut RgbImage, values: &[f64], max: f64, color: Rgb<u8>) {
    let (left, right) = (MARGIN as f64, (WIDTH - MARGIN) as f64);
    let (top, bottom) = (MARGIN as f64, (HEIGHT - MARGIN) as f64);
    let span = values.len().saturating_sub(1).max(1) as f64;
    let point = |i: usize, value: f64| {
        let x = left + (right - left) * i as f64 / span;
        let y = bottom - (bottom - top) * (value / max).clamp(0.0, 1.0);
        (x, y)
    };

    match values {
        [] => {}
        [value] => draw_line(img, point(0, *value), (right, point(0, *value).1), color),
        _ => {
            for (i, pair) in values.windows(2).enumerate() {
                draw_line(img, point(i, pair[0]), point(i + 1, pair[1]), color);
            }
        }
    }
}

/// Loss curves share an axis scaled to the largest loss, accuracy curves use `[0, 1]`.
pub fn render_history(history: &TrainingHistory, path: &Path) -> Result<()> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let (left, right) = (MARGIN as f64, (WIDTH - MARGIN) as f64);
    let (top, bottom) = (MARGIN as f64, (HEIGHT - MARGIN) as f64);
    draw_line(&mut img, (left, top), (left, bottom), AXIS);
    draw_line(&mut img, (left, bottom), (right, bottom), AXIS);
    draw_line(&mut img, (right, top), (right, bottom), AXIS);

    let max_loss = history
        .train_loss
        .iter()
        .chain(&history.validation_loss)
        .copied()
        .fold(0.0, f64::max);
    let max_loss = if max_loss > 0.0 { max_loss } else { 1.0 };

    draw_curve(&mut img, &history.train_loss, max_loss, TRAIN_LOSS);
    draw_curve(&mut img, &history.train_accuracy, 1.0, TRAIN_ACCURACY);
    draw_curve(&mut img, &history.validation_loss, max_loss, VALIDATION_LOSS);
    draw_curve(&mut img, &history.validation_accuracy, 1.0, VALIDATION_ACCURACY);

    tracing::info!("saving the loss/accuracy plot to {path:?}");
    save(&img, path)
}

fn shade(fraction: f64) -> Rgb<u8> {
    let fraction = fraction.clamp(0.0, 1.0);
    let Rgb(heat) = HEAT;
    let Rgb(background) = BACKGROUND;
    Rgb(std::array::from_fn(|c| {
        (background[c] as f64 + (heat[c] as f64 - background[c] as f64) * fraction).round() as u8
    }))
}

/// One square cell per (row, column) pair, darker for larger counts.
pub fn render_confusion_matrix(matrix: &ConfusionMatrix, path: &Path) -> Result<()> {
    let n = matrix.num_classes() as u32;
    let side = 2 * MARGIN + n * CELL;
    let mut img = RgbImage::from_pixel(side, side, BACKGROUND);

    let max = matrix.max_count().max(1) as f64;
    for row in 0..n {
        for column in 0..n {
            let color = shade(matrix.count(row as usize, column as usize) as f64 / max);
            let (x0, y0) = (MARGIN + column * CELL, MARGIN + row * CELL);
            for y in y0..y0 + CELL {
                for x in x0..x0 + CELL {
                    img.put_pixel(x, y, color);
                }
            }
        }
    }

    // grid
    for i in 0..=n {
        let offset = (MARGIN + i * CELL) as f64;
        let (start, end) = (MARGIN as f64, (MARGIN + n * CELL) as f64);
        draw_line(&mut img, (offset, start), (offset, end), AXIS);
        draw_line(&mut img, (start, offset), (end, offset), AXIS);
    }

    tracing::info!("saving the confusion matrix to {path:?}");
    save(&img, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_plot_is_a_png() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("plots").join("history.png");

        let history = TrainingHistory {
            train_loss: vec![2.3, 1.1, 0.4],
            train_accuracy: vec![0.1, 0.5, 0.9],
            validation_loss: vec![2.2, 1.3, 0.6],
            validation_accuracy: vec![0.2, 0.5, 0.8],
        };
        render_history(&history, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert!(img.pixels().any(|pixel| *pixel == VALIDATION_ACCURACY));
    }

    #[test]
    fn confusion_matrix_plot_shades_the_largest_cell() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("confusion.png");
        let matrix = ConfusionMatrix::from_labels(&[0, 0, 1], &[0, 0, 0], 2).unwrap();
        render_confusion_matrix(&matrix, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2 * MARGIN + 2 * CELL, 2 * MARGIN + 2 * CELL));
        let center = MARGIN + CELL / 2;
        assert_eq!(*img.get_pixel(center, center), HEAT);
        assert_eq!(*img.get_pixel(center + CELL, center), BACKGROUND);
    }
}

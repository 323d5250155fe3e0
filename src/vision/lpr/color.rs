// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate colour estimation and plate type resolution

use image::RgbImage;

use crate::vision::image_utils::rgb_to_hsv;

/// Plate kinds indexed by type id: (type name, colour name)
pub const PLATE_TYPES: [(&str, &str); 8] = [
    ("未知", "未知"),
    ("蓝牌", "蓝色"),
    ("黄牌", "黄色"),
    ("绿牌", "绿色"),
    ("白牌", "白色"),
    ("黑牌", "黑色"),
    ("绿牌(小型新能源)", "渐变绿"),
    ("黄绿牌(大型新能源)", "黄绿渐变"),
];

pub const TYPE_UNKNOWN: usize = 0;
pub const TYPE_BLUE: usize = 1;
pub const TYPE_YELLOW: usize = 2;
pub const TYPE_GREEN: usize = 3;
pub const TYPE_WHITE: usize = 4;
pub const TYPE_BLACK: usize = 5;
pub const TYPE_NEW_ENERGY_SMALL: usize = 6;
pub const TYPE_NEW_ENERGY_LARGE: usize = 7;

/// Minimum share of voting pixels for a colour to win
const MIN_COLOR_SHARE: f32 = 0.2;

pub fn plate_type_name(type_id: usize) -> &'static str {
    PLATE_TYPES.get(type_id).map(|t| t.0).unwrap_or(PLATE_TYPES[0].0)
}

pub fn plate_color_name(type_id: usize) -> &'static str {
    PLATE_TYPES.get(type_id).map(|t| t.1).unwrap_or(PLATE_TYPES[0].1)
}

/// Vote each pixel of the crop into a base colour (type ids 0..=5)
pub fn estimate_color(crop: &RgbImage) -> usize {
    let mut votes = [0usize; 6];
    let mut total = 0usize;

    for pixel in crop.pixels() {
        let (h, s, v) = rgb_to_hsv(pixel.0);
        total += 1;
        let bucket = if v < 46.0 {
            TYPE_BLACK
        } else if s < 43.0 && v > 180.0 {
            TYPE_WHITE
        } else if s < 43.0 {
            continue;
        } else if (100.0..=124.0).contains(&h) {
            TYPE_BLUE
        } else if (11.0..=34.0).contains(&h) {
            TYPE_YELLOW
        } else if (35.0..=99.0).contains(&h) {
            TYPE_GREEN
        } else {
            continue;
        };
        votes[bucket] += 1;
    }

    if total == 0 {
        return TYPE_UNKNOWN;
    }

    let (best, count) = votes
        .iter()
        .enumerate()
        .skip(1)
        .max_by_key(|(_, c)| **c)
        .map(|(i, c)| (i, *c))
        .unwrap_or((TYPE_UNKNOWN, 0));

    if (count as f32) / (total as f32) < MIN_COLOR_SHARE {
        TYPE_UNKNOWN
    } else {
        best
    }
}

/// Final type id from the recognised text and the crop colour
///
/// Eight-character plates are new-energy plates: green ones are the small
/// vehicle kind, yellow ones the large vehicle kind.
pub fn resolve_plate_type(plate_number: &str, color: usize) -> usize {
    let chars = plate_number.chars().count();
    match (chars, color) {
        (8, TYPE_GREEN) => TYPE_NEW_ENERGY_SMALL,
        (8, TYPE_YELLOW) => TYPE_NEW_ENERGY_LARGE,
        _ => color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_estimate_blue_plate() {
        let crop = RgbImage::from_pixel(20, 8, Rgb([10, 60, 200]));
        assert_eq!(estimate_color(&crop), TYPE_BLUE);
    }

    #[test]
    fn test_estimate_yellow_and_green() {
        let yellow = RgbImage::from_pixel(20, 8, Rgb([230, 190, 20]));
        assert_eq!(estimate_color(&yellow), TYPE_YELLOW);
        let green = RgbImage::from_pixel(20, 8, Rgb([40, 200, 90]));
        assert_eq!(estimate_color(&green), TYPE_GREEN);
    }

    #[test]
    fn test_estimate_white_and_black() {
        let white = RgbImage::from_pixel(20, 8, Rgb([240, 240, 240]));
        assert_eq!(estimate_color(&white), TYPE_WHITE);
        let black = RgbImage::from_pixel(20, 8, Rgb([10, 10, 10]));
        assert_eq!(estimate_color(&black), TYPE_BLACK);
    }

    #[test]
    fn test_empty_crop_unknown() {
        assert_eq!(estimate_color(&RgbImage::new(0, 0)), TYPE_UNKNOWN);
    }

    #[test]
    fn test_new_energy_resolution() {
        assert_eq!(resolve_plate_type("粤BD12345", TYPE_GREEN), TYPE_NEW_ENERGY_SMALL);
        assert_eq!(resolve_plate_type("粤BD12345", TYPE_YELLOW), TYPE_NEW_ENERGY_LARGE);
        assert_eq!(resolve_plate_type("粤B12345", TYPE_GREEN), TYPE_GREEN);
        assert_eq!(resolve_plate_type("京A12345", TYPE_BLUE), TYPE_BLUE);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(plate_type_name(1), "蓝牌");
        assert_eq!(plate_color_name(7), "黄绿渐变");
        assert_eq!(plate_type_name(42), "未知");
    }
}

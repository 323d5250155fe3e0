// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scene analysis on top of classification output
//!
//! Low-level class labels, auxiliary detections and a few global image
//! statistics are scored against twelve coarse scene types.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use std::collections::HashSet;

use super::image_utils::rgb_to_hsv;
use super::yolo::Classification;

/// A coarse scene category
#[derive(Debug, Clone, Copy)]
pub struct SceneType {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SCENE_TYPES: [SceneType; 12] = [
    SceneType {
        key: "portrait",
        name: "人物照片",
        icon: "👤",
        description: "包含人物的照片",
        keywords: &["person", "face", "portrait", "people", "human", "man", "woman", "child", "baby"],
    },
    SceneType {
        key: "animal",
        name: "动物",
        icon: "🐾",
        description: "动物照片",
        keywords: &[
            "dog", "cat", "bird", "fish", "horse", "elephant", "bear", "zebra", "giraffe", "cow",
            "sheep", "tiger", "lion", "monkey", "rabbit", "hamster", "pet",
        ],
    },
    SceneType {
        key: "cityscape",
        name: "城市风景",
        icon: "🏙️",
        description: "城市建筑和街景",
        keywords: &[
            "skyscraper", "building", "tower", "bridge", "street", "road", "traffic", "car", "bus",
            "train", "architecture", "city", "urban", "downtown", "office",
        ],
    },
    SceneType {
        key: "nature",
        name: "自然风景",
        icon: "🏞️",
        description: "自然风光和户外场景",
        keywords: &[
            "mountain", "lake", "river", "ocean", "sea", "beach", "forest", "tree", "flower",
            "garden", "sky", "cloud", "sunset", "sunrise", "landscape", "grass", "field", "valley",
        ],
    },
    SceneType {
        key: "food",
        name: "美食",
        icon: "🍽️",
        description: "食物和饮品",
        keywords: &[
            "food", "pizza", "burger", "cake", "fruit", "vegetable", "bread", "coffee", "drink",
            "meal", "dinner", "breakfast", "lunch", "restaurant", "dish", "cuisine",
        ],
    },
    SceneType {
        key: "vehicle",
        name: "交通工具",
        icon: "🚗",
        description: "车辆和交通工具",
        keywords: &[
            "car", "truck", "bus", "motorcycle", "bicycle", "airplane", "boat", "ship", "train",
            "vehicle", "automobile", "van",
        ],
    },
    SceneType {
        key: "indoor",
        name: "室内场景",
        icon: "🏠",
        description: "室内环境和家居",
        keywords: &[
            "room", "furniture", "sofa", "chair", "table", "bed", "lamp", "desk", "kitchen",
            "bathroom", "bedroom", "living", "office", "interior",
        ],
    },
    SceneType {
        key: "sports",
        name: "运动",
        icon: "⚽",
        description: "体育运动相关",
        keywords: &[
            "ball", "football", "basketball", "tennis", "golf", "baseball", "soccer", "swimming",
            "running", "sport", "gym", "stadium", "athlete",
        ],
    },
    SceneType {
        key: "electronics",
        name: "电子设备",
        icon: "📱",
        description: "电子产品和设备",
        keywords: &[
            "phone", "computer", "laptop", "keyboard", "mouse", "screen", "monitor", "television",
            "camera", "electronic", "device", "gadget",
        ],
    },
    SceneType {
        key: "art",
        name: "艺术/动漫",
        icon: "🎨",
        description: "艺术作品、插画或动漫风格",
        keywords: &[
            "painting", "art", "drawing", "illustration", "cartoon", "comic", "animation", "poster",
            "design", "graphic",
        ],
    },
    SceneType {
        key: "text",
        name: "文本/文档",
        icon: "📄",
        description: "包含文字的图片",
        keywords: &[
            "document", "paper", "book", "newspaper", "magazine", "text", "letter", "sign",
            "poster", "menu", "envelope", "notebook",
        ],
    },
    SceneType {
        key: "unknown",
        name: "其他",
        icon: "❓",
        description: "无法确定的场景类型",
        keywords: &[],
    },
];

const ANIME_SATURATION: f32 = 0.6;
const ANIME_EDGE_RATIO: f32 = 0.15;
const ANIME_MAX_COLORS: usize = 500;
const MIN_SCENE_SCORE: f32 = 0.1;
const PERSON_WEIGHT: f32 = 1.5;
const OBJECT_WEIGHT: f32 = 0.8;
const MAX_DISTRIBUTION: usize = 5;
const MAX_MATCHED_KEYWORDS: usize = 10;

/// Global statistics of an image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageFeatures {
    pub saturation: f32,
    pub color_variety: f32,
    pub edge_ratio: f32,
    pub unique_colors: usize,
    pub is_anime_style: bool,
    pub brightness: f32,
}

/// Object found by the auxiliary detection pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub class_name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrimaryScene {
    #[serde(rename = "type")]
    pub scene_type: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneShare {
    #[serde(rename = "type")]
    pub scene_type: String,
    pub name: String,
    pub icon: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordMatch {
    pub keyword: String,
    pub class: String,
    pub scene: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSummary {
    pub is_anime_style: bool,
    pub saturation: f32,
    pub brightness: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneAnalysis {
    pub primary_scene: PrimaryScene,
    pub scene_distribution: Vec<SceneShare>,
    pub matched_keywords: Vec<KeywordMatch>,
    pub image_features: FeatureSummary,
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

fn scene_index(key: &str) -> usize {
    SCENE_TYPES
        .iter()
        .position(|s| s.key == key)
        .unwrap_or(SCENE_TYPES.len() - 1)
}

/// Compute saturation, colour variety, edge density and related statistics
pub fn analyze_image_features(image: &DynamicImage) -> ImageFeatures {
    let rgb = image.to_rgb8();
    let pixel_count = (rgb.width() as usize) * (rgb.height() as usize);
    if pixel_count == 0 {
        return ImageFeatures::default();
    }

    let mut sat_sum = 0.0f64;
    let mut val_sum = 0.0f64;
    let mut hue_hist = [0usize; 180];
    for pixel in rgb.pixels() {
        let (h, s, v) = rgb_to_hsv(pixel.0);
        sat_sum += s as f64;
        val_sum += v as f64;
        hue_hist[(h as usize).min(179)] += 1;
    }

    let saturation = (sat_sum / pixel_count as f64 / 255.0) as f32;
    let brightness = (val_sum / pixel_count as f64 / 255.0) as f32;
    let color_variety = hue_hist
        .iter()
        .filter(|&&n| n as f32 / pixel_count as f32 > 0.01)
        .count() as f32
        / 180.0;

    let gray = image.to_luma8();
    let edges = imageproc::edges::canny(&gray, 100.0, 200.0);
    let edge_ratio = edges.pixels().filter(|p| p.0[0] > 0).count() as f32 / pixel_count as f32;

    let small = image::imageops::resize(&rgb, 64, 64, FilterType::Triangle);
    let unique_colors = small
        .pixels()
        .map(|p| p.0.map(|c| (c / 32) * 32))
        .collect::<HashSet<[u8; 3]>>()
        .len();

    let is_anime_style = saturation > ANIME_SATURATION
        && edge_ratio > ANIME_EDGE_RATIO
        && unique_colors < ANIME_MAX_COLORS;

    ImageFeatures {
        saturation,
        color_variety,
        edge_ratio,
        unique_colors,
        is_anime_style,
        brightness,
    }
}

/// Score the scene types and pick the primary one
pub fn classify_scene(
    classifications: &[Classification],
    features: Option<&ImageFeatures>,
    detected_objects: &[DetectedObject],
) -> SceneAnalysis {
    let mut scores = [0.0f32; SCENE_TYPES.len()];
    let mut matched = Vec::new();

    for item in classifications {
        let class_name = item.class_name.to_lowercase();
        for (i, scene) in SCENE_TYPES.iter().enumerate() {
            for keyword in scene.keywords {
                if class_name.contains(keyword) || keyword.contains(class_name.as_str()) {
                    scores[i] += item.confidence;
                    matched.push(KeywordMatch {
                        keyword: keyword.to_string(),
                        class: class_name.clone(),
                        scene: scene.key.to_string(),
                        confidence: item.confidence,
                    });
                }
            }
        }
    }

    for obj in detected_objects {
        let name = obj.class_name.to_lowercase();
        if name == "person" {
            scores[scene_index("portrait")] += obj.confidence * PERSON_WEIGHT;
        }
        for (i, scene) in SCENE_TYPES.iter().enumerate() {
            for keyword in scene.keywords {
                if name.contains(keyword) {
                    scores[i] += obj.confidence * OBJECT_WEIGHT;
                }
            }
        }
    }

    if let Some(f) = features {
        if f.is_anime_style {
            scores[scene_index("art")] += 0.5;
        }
        if f.saturation > 0.5 {
            scores[scene_index("food")] += 0.1;
            scores[scene_index("art")] += 0.1;
        }
    }

    let (mut best, best_score) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });
    if best_score < MIN_SCENE_SCORE {
        best = scene_index("unknown");
    }

    let total: f32 = scores.iter().sum::<f32>() + 0.001;
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let scene_distribution = ranked
        .into_iter()
        .filter(|(_, s)| *s > 0.0)
        .take(MAX_DISTRIBUTION)
        .map(|(i, s)| SceneShare {
            scene_type: SCENE_TYPES[i].key.to_string(),
            name: SCENE_TYPES[i].name.to_string(),
            icon: SCENE_TYPES[i].icon.to_string(),
            confidence: s / total,
        })
        .collect();

    matched.truncate(MAX_MATCHED_KEYWORDS);
    let primary = &SCENE_TYPES[best];

    SceneAnalysis {
        primary_scene: PrimaryScene {
            scene_type: primary.key.to_string(),
            name: primary.name.to_string(),
            icon: primary.icon.to_string(),
            description: primary.description.to_string(),
            confidence: best_score.clamp(0.0, 1.0),
        },
        scene_distribution,
        matched_keywords: matched,
        image_features: FeatureSummary {
            is_anime_style: features.map(|f| f.is_anime_style).unwrap_or(false),
            saturation: features.map(|f| round2(f.saturation)).unwrap_or(0.0),
            brightness: features.map(|f| round2(f.brightness)).unwrap_or(0.0),
        },
    }
}

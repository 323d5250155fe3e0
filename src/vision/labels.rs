// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class vocabularies, keypoint layout and the Chinese display names

use std::fs;
use std::path::Path;

/// COCO-80 class names used by the detect and segment models
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// COCO keypoint names in model output order
pub const KEYPOINT_NAMES: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// Keypoint index pairs joined when drawing a skeleton
pub const SKELETON: [(usize, usize); 16] = [
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 11),
    (6, 12),
    (11, 12),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (11, 13),
    (12, 14),
    (13, 15),
    (14, 16),
];

const CLASS_TRANSLATIONS: &[(&str, &str)] = &[
    // people
    ("person", "人"),
    ("people", "人群"),
    ("face", "人脸"),
    ("portrait", "肖像"),
    // animals
    ("dog", "狗"),
    ("cat", "猫"),
    ("bird", "鸟"),
    ("horse", "马"),
    ("sheep", "羊"),
    ("cow", "牛"),
    ("elephant", "大象"),
    ("bear", "熊"),
    ("zebra", "斑马"),
    ("giraffe", "长颈鹿"),
    ("fish", "鱼"),
    ("rabbit", "兔子"),
    ("tiger", "老虎"),
    ("lion", "狮子"),
    // vehicles
    ("car", "汽车"),
    ("truck", "卡车"),
    ("bus", "公交车"),
    ("motorcycle", "摩托车"),
    ("bicycle", "自行车"),
    ("airplane", "飞机"),
    ("train", "火车"),
    ("boat", "船"),
    // household
    ("chair", "椅子"),
    ("table", "桌子"),
    ("sofa", "沙发"),
    ("bed", "床"),
    ("tv", "电视"),
    ("laptop", "笔记本电脑"),
    ("phone", "手机"),
    ("keyboard", "键盘"),
    ("mouse", "鼠标"),
    // food
    ("apple", "苹果"),
    ("banana", "香蕉"),
    ("orange", "橙子"),
    ("pizza", "披萨"),
    ("cake", "蛋糕"),
    ("sandwich", "三明治"),
    ("hot dog", "热狗"),
    ("carrot", "胡萝卜"),
    ("broccoli", "西兰花"),
    // other
    ("book", "书"),
    ("clock", "时钟"),
    ("bottle", "瓶子"),
    ("cup", "杯子"),
    ("knife", "刀"),
    ("fork", "叉子"),
    ("spoon", "勺子"),
    ("bowl", "碗"),
    ("vase", "花瓶"),
    ("scissors", "剪刀"),
    ("teddy bear", "泰迪熊"),
    ("umbrella", "雨伞"),
    ("handbag", "手提包"),
    ("tie", "领带"),
    ("suitcase", "行李箱"),
    ("backpack", "背包"),
];

/// Chinese display name for a class, or the input unchanged
pub fn translate_class_name(class_name: &str) -> String {
    let lower = class_name.to_lowercase();
    CLASS_TRANSLATIONS
        .iter()
        .find(|(en, _)| *en == lower)
        .map(|(_, cn)| cn.to_string())
        .unwrap_or_else(|| class_name.to_string())
}

/// Read a one-name-per-line label file; `None` if absent or empty
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Option<Vec<String>> {
    let raw = fs::read_to_string(path.as_ref()).ok()?;
    let names: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Name for a class id, falling back to `class_<id>`
pub fn class_name(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}

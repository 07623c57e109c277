//! SQLite schema definition
//!
//! Geometry (`segmentation`, `bbox`) is stored as canonical JSON text.

pub const SCHEMA: &str = r#"
-- ============================================
-- IMAGES
-- ============================================

CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    file_name TEXT NOT NULL UNIQUE,        -- Natural dedup key across imports
    license INTEGER,
    date_captured TEXT
);

-- ============================================
-- CATEGORIES
-- ============================================

CREATE TABLE IF NOT EXISTS categories (
    supercategory TEXT,
    id INTEGER PRIMARY KEY,                -- Stable across imports
    name TEXT NOT NULL
);

-- ============================================
-- ANNOTATIONS
-- ============================================

CREATE TABLE IF NOT EXISTS annotations (
    segmentation TEXT NOT NULL,            -- JSON: [[x1, y1, x2, y2, ...], ...]
    area INTEGER,
    bbox TEXT NOT NULL,                    -- JSON: [x, y, width, height]
    iscrowd INTEGER DEFAULT 0,
    id INTEGER PRIMARY KEY,
    image_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    FOREIGN KEY(image_id) REFERENCES images(id) ON UPDATE CASCADE,
    FOREIGN KEY(category_id) REFERENCES categories(id)
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_annotations_image ON annotations(image_id);
CREATE INDEX IF NOT EXISTS idx_annotations_category ON annotations(category_id);
"#;

pub const DROP_ALL: &str = r#"
DROP TABLE IF EXISTS annotations;
DROP TABLE IF EXISTS categories;
DROP TABLE IF EXISTS images;
"#;

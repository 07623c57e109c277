//! Record storage with SQLite
//!
//! The store is an explicit handle passed to every operation. Each logical
//! step (a load, a merge, a select) runs against its own transaction or single
//! statement, so a failure never leaves a half-written step behind.

mod merge;
mod schema;
mod stage;

use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use crate::coco::{
    encode_bbox, encode_segmentation, Annotation, Category, CocoFile, Image, StoredAnnotation,
};
use crate::error::Result;

pub use merge::MergeReport;
pub use schema::SCHEMA;
pub use stage::{ReconciledBatch, StagedBatch};

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!("opened store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Drop every table and recreate the empty schema
    pub fn reset(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(schema::DROP_ALL)?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        info!("store reset");
        Ok(())
    }

    // ============================================
    // SINGLE-ROW INSERTS
    // ============================================

    /// Insert an image unless its file_name is already present. An id that
    /// belongs to another file_name is a constraint error.
    pub fn insert_image(&self, image: &Image) -> Result<bool> {
        insert_image(&self.conn, image)
    }

    /// Insert a category unless its id is already present
    pub fn insert_category(&self, category: &Category) -> Result<bool> {
        insert_category(&self.conn, category)
    }

    /// Insert an annotation only if its image exists and its id is free
    pub fn insert_annotation(&self, annotation: &Annotation) -> Result<AnnotationInsert> {
        insert_annotation(&self.conn, annotation)
    }

    /// Load a canonical annotation file with its own ids, without
    /// renumbering. Meant for the first file of a fresh store.
    pub fn load(&self, file: &CocoFile) -> Result<MergeReport> {
        let tx = self.conn.unchecked_transaction()?;
        let mut report = MergeReport::default();

        for image in &file.images {
            report.count_image(insert_image(&tx, image)?);
        }
        for category in &file.categories {
            report.count_category(insert_category(&tx, category)?);
        }
        for annotation in &file.annotations {
            report.count_annotation(insert_annotation(&tx, annotation)?);
        }

        tx.commit()?;
        info!("loaded {}", report);
        Ok(report)
    }

    // ============================================
    // QUERIES
    // ============================================

    pub fn max_image_id(&self) -> Result<i64> {
        max_image_id(&self.conn)
    }

    pub fn max_annotation_id(&self) -> Result<i64> {
        max_annotation_id(&self.conn)
    }

    /// Distinct images with at least one annotation in `category_ids`,
    /// ordered by image id
    pub fn select_images(&self, category_ids: &[i64]) -> Result<Vec<Image>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            r#"SELECT DISTINCT i.id, i.width, i.height, i.file_name, i.license, i.date_captured
               FROM images i
               JOIN annotations a ON i.id = a.image_id
               WHERE a.category_id IN ({})
               ORDER BY i.id"#,
            placeholders(category_ids.len())
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(category_ids), map_image)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Annotations whose category_id is in `category_ids`, ordered by id
    pub fn select_annotations(&self, category_ids: &[i64]) -> Result<Vec<StoredAnnotation>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            r#"SELECT segmentation, area, bbox, iscrowd, id, image_id, category_id
               FROM annotations
               WHERE category_id IN ({})
               ORDER BY id"#,
            placeholders(category_ids.len())
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(category_ids), map_annotation)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Categories whose id is in `ids`, ordered by id
    pub fn select_categories(&self, ids: &[i64]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT supercategory, id, name FROM categories WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(ids), map_category)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All (id, name) category pairs
    pub fn list_categories(&self) -> Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_images(&self) -> Result<Vec<Image>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, width, height, file_name, license, date_captured FROM images ORDER BY id",
        )?;
        let rows = stmt.query_map([], map_image)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_annotations(&self) -> Result<Vec<StoredAnnotation>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT segmentation, area, bbox, iscrowd, id, image_id, category_id
               FROM annotations ORDER BY id"#,
        )?;
        let rows = stmt.query_map([], map_annotation)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT supercategory, id, name FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], map_category)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn find_image(&self, file_name: &str) -> Result<Option<Image>> {
        self.conn
            .query_row(
                r#"SELECT id, width, height, file_name, license, date_captured
                   FROM images WHERE file_name = ?"#,
                params![file_name],
                map_image,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Every file_name known to the store
    pub fn file_names(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT file_name FROM images")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<HashSet<_>, _>>().map_err(Into::into)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| -> Result<i64> {
            let n = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n)
        };
        Ok(StoreCounts {
            images: count("images")?,
            categories: count("categories")?,
            annotations: count("annotations")?,
        })
    }
}

/// Outcome of a single annotation insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationInsert {
    Inserted,
    /// An annotation with the same id is already stored
    DuplicateId,
    /// The referenced image is not in the store
    MissingImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub images: i64,
    pub categories: i64,
    pub annotations: i64,
}

// ============================================
// STATEMENTS
// ============================================
//
// Shared by direct inserts, the initial load and the merge committer, so they
// take a plain connection (a transaction derefs to one).

fn insert_image(conn: &Connection, image: &Image) -> Result<bool> {
    let changed = conn.execute(
        r#"INSERT INTO images (id, width, height, file_name, license, date_captured)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(file_name) DO NOTHING"#,
        params![
            image.id,
            image.width,
            image.height,
            image.file_name,
            image.license,
            image.date_captured
        ],
    )?;
    Ok(changed > 0)
}

fn insert_category(conn: &Connection, category: &Category) -> Result<bool> {
    let changed = conn.execute(
        r#"INSERT INTO categories (supercategory, id, name)
           VALUES (?, ?, ?)
           ON CONFLICT(id) DO NOTHING"#,
        params![category.supercategory, category.id, category.name],
    )?;
    Ok(changed > 0)
}

fn insert_annotation(conn: &Connection, annotation: &Annotation) -> Result<AnnotationInsert> {
    let changed = conn.execute(
        r#"INSERT INTO annotations (segmentation, area, bbox, iscrowd, id, image_id, category_id)
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
           WHERE EXISTS (SELECT 1 FROM images WHERE id = ?6)
           ON CONFLICT(id) DO NOTHING"#,
        params![
            encode_segmentation(&annotation.segmentation)?,
            annotation.area,
            encode_bbox(&annotation.bbox)?,
            annotation.iscrowd,
            annotation.id,
            annotation.image_id,
            annotation.category_id
        ],
    )?;
    if changed > 0 {
        return Ok(AnnotationInsert::Inserted);
    }

    let image_exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM images WHERE id = ?)",
        params![annotation.image_id],
        |row| row.get(0),
    )?;
    if image_exists {
        Ok(AnnotationInsert::DuplicateId)
    } else {
        Ok(AnnotationInsert::MissingImage)
    }
}

fn max_image_id(conn: &Connection) -> Result<i64> {
    let max = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM images", [], |row| row.get(0))?;
    Ok(max)
}

fn max_annotation_id(conn: &Connection) -> Result<i64> {
    let max = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM annotations", [], |row| {
        row.get(0)
    })?;
    Ok(max)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn map_image(row: &rusqlite::Row) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        width: row.get(1)?,
        height: row.get(2)?,
        file_name: row.get(3)?,
        license: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
        date_captured: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

fn map_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        supercategory: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
        id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn map_annotation(row: &rusqlite::Row) -> rusqlite::Result<StoredAnnotation> {
    Ok(StoredAnnotation {
        segmentation: row.get(0)?,
        area: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        bbox: row.get(2)?,
        iscrowd: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        id: row.get(4)?,
        image_id: row.get(5)?,
        category_id: row.get(6)?,
    })
}

//! # Tag Generation
//!
//! Turns a submitted registration form into a QR tag image on disk and a new
//! inventory record.
//!
//! ## Flow
//!
//! ```text
//! TagRequest ──validate──▶ AttributeRecord ──payload──▶ QR (qrcode) ──PNG──▶ static/<name>.png
//!                                   │                                              │
//!                                   └──────────────── Inventory::commit_with ◀─────┘
//! ```
//!
//! The image is written to a temporary file in the static directory and then
//! renamed over the final name, while the inventory lock is held. A failure at
//! any step leaves neither a file nor a record behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::Deserialize;

use crate::error::{TagError, TagResult};
use crate::filename::{composite_label, format_file_name};
use crate::inventory::{AttributeRecord, Inventory};
use crate::validation::{self, LETTERS_HINT, SIZE_HINT};

/// Smallest side, in pixels, of a rendered tag.
pub const DEFAULT_TAG_SIDE: u32 = 256;

/// Raw registration form, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagRequest {
    #[serde(rename = "produto")]
    pub product: String,
    #[serde(rename = "tamanho")]
    pub size: String,
    #[serde(rename = "cor")]
    pub color: String,
    #[serde(rename = "tecido")]
    pub fabric: String,
    #[serde(rename = "preco")]
    pub price: String,
}

impl TagRequest {
    /// Validate the form and build the record it describes.
    ///
    /// Checks run in a fixed order: price first, then the letter-only fields,
    /// then the size grade. The first failure is returned.
    pub fn to_record(&self) -> TagResult<AttributeRecord> {
        let product = self.product.trim();
        let color = self.color.trim();
        let fabric = self.fabric.trim();

        let price = validation::parse_price(&self.price)?;

        for (field, value) in [("produto", product), ("cor", color), ("tecido", fabric)] {
            if !validation::validate_letters(value) {
                return Err(TagError::validation(field, "letters only", value)
                    .with_recovery_suggestion(LETTERS_HINT));
            }
        }

        let size_text = self.size.trim();
        let size = validation::validate_size(size_text).ok_or_else(|| {
            TagError::validation("tamanho", "must be one of P, M, G, GG, XG, XGG", size_text)
                .with_recovery_suggestion(SIZE_HINT)
        })?;

        let image_file_name =
            format_file_name(&composite_label(product, size.as_str(), color, fabric));

        Ok(AttributeRecord {
            product: product.to_string(),
            size,
            color: color.to_string(),
            fabric: fabric.to_string(),
            price,
            image_file_name,
        })
    }
}

/// Text embedded in a tag.
pub fn payload(record: &AttributeRecord) -> String {
    format!(
        "Produto: {}, Tamanho: {}, Cor: {}, Tecido: {}, Preço: {}",
        record.product, record.size, record.color, record.fabric, record.price
    )
}

/// Render `payload` as a black-on-white QR code image.
pub fn render_qr(payload: &str, min_side: u32) -> TagResult<GrayImage> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| {
        TagError::encoding("qr_render", e.to_string())
            .with_recovery_suggestion(format!("Erro ao gerar QR Code: {}", e))
    })?;

    Ok(code
        .render::<Luma<u8>>()
        .min_dimensions(min_side, min_side)
        .build())
}

/// Outcome of a successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedTag {
    pub record: AttributeRecord,
    pub payload: String,
    pub path: PathBuf,
}

/// Renders tags into a static directory and records them in the inventory.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    static_dir: PathBuf,
    inventory: Arc<Inventory>,
    tag_side: u32,
}

impl CodeGenerator {
    /// Create a generator writing into `static_dir`, creating it if missing.
    pub fn new(static_dir: impl Into<PathBuf>, inventory: Arc<Inventory>) -> TagResult<Self> {
        let static_dir = static_dir.into();
        std::fs::create_dir_all(&static_dir)
            .map_err(|e| TagError::io_at("create static directory", &static_dir, e))?;

        Ok(Self {
            static_dir,
            inventory,
            tag_side: DEFAULT_TAG_SIDE,
        })
    }

    /// Override the minimum rendered tag side.
    pub fn with_tag_side(mut self, side: u32) -> Self {
        self.tag_side = side.max(21);
        self
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Validate, render, write and record a tag.
    pub fn generate(&self, request: &TagRequest) -> TagResult<GeneratedTag> {
        let record = request.to_record()?;
        let payload = payload(&record);
        let path = self.static_dir.join(&record.image_file_name);

        let record = self.inventory.commit_with(|| {
            let image = render_qr(&payload, self.tag_side)?;
            self.write_atomically(&image, &path)?;
            Ok(record)
        })?;

        tracing::info!(
            file = %record.image_file_name,
            product = %record.product,
            size = %record.size,
            "tag generated"
        );

        Ok(GeneratedTag {
            record,
            payload,
            path,
        })
    }

    fn write_atomically(&self, image: &GrayImage, path: &Path) -> TagResult<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".tag-")
            .suffix(".png")
            .tempfile_in(&self.static_dir)
            .map_err(|e| {
                TagError::io_at("create temporary tag image", &self.static_dir, e)
                    .with_recovery_suggestion("Erro ao gerar QR Code: diretório de imagens indisponível.")
            })?;

        image.write_to(&mut tmp, ImageFormat::Png).map_err(|e| {
            TagError::encoding("png_write", e.to_string())
                .with_operation("write tag image")
                .with_recovery_suggestion(format!("Erro ao gerar QR Code: {}", e))
        })?;

        tmp.persist(path).map_err(|e| {
            TagError::io_at("persist tag image", path, e.error)
                .with_recovery_suggestion("Erro ao gerar QR Code: não foi possível salvar a imagem.")
        })?;

        Ok(())
    }
}

//! License agreement rendering.
//!
//! [`contract_lines`] lays the agreement out as plain text lines in the
//! order's locale; [`PdfContractRenderer`] draws those lines onto an A4 page.
//! The fulfillment handler only depends on the [`ContractRenderer`] trait.

use beatstore_core::licensing::{FileKind, License, UNLIMITED};
use beatstore_core::locale::Locale;
use beatstore_core::pricing::format_amount;
use beatstore_core::types::{DbId, Timestamp};
use printpdf::{BuiltinFont, Mm, PdfDocument};

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Failed to render contract: {0}")]
    Render(String),
}

/// Facts printed on one item's agreement.
#[derive(Debug, Clone)]
pub struct ContractDetails {
    pub order_number: String,
    pub issued_at: Timestamp,
    pub licensee_name: String,
    pub licensee_email: String,
    pub beat_id: DbId,
    pub beat_title: String,
    pub license: License,
    pub currency: String,
    pub locale: Locale,
    /// Files the license grants, in display order.
    pub files: Vec<FileKind>,
}

/// Turns contract details into a document.
pub trait ContractRenderer: Send + Sync {
    fn render(&self, details: &ContractDetails) -> Result<Vec<u8>, ContractError>;
}

/// Text of the agreement, one entry per printed line.
pub fn contract_lines(details: &ContractDetails) -> Vec<String> {
    let copy = details.locale.contract_copy();
    let ceiling = |value: i64| {
        if value == UNLIMITED {
            copy.unlimited.to_string()
        } else {
            value.to_string()
        }
    };
    let files = details
        .files
        .iter()
        .map(|kind| kind.as_str().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        format!("{}: {}", copy.order_number, details.order_number),
        format!(
            "{}: {}",
            copy.date,
            details.issued_at.format(details.locale.date_format())
        ),
        format!("{}: {}", copy.licensee, details.licensee_name),
        format!("{}: {}", copy.email, details.licensee_email),
        format!("{}: {} (#{})", copy.beat, details.beat_title, details.beat_id),
        format!("{}: {}", copy.license, details.license.tier.as_str().to_uppercase()),
        format!(
            "{}: {}",
            copy.price,
            format_amount(details.license.price, &details.currency)
        ),
        String::new(),
        format!("{}:", copy.rights),
        format!("  {}: {}", copy.streams, ceiling(details.license.features.streams)),
        format!(
            "  {}: {}",
            copy.physical_sales,
            ceiling(details.license.features.physical_sales)
        ),
        format!("  {}: {files}", copy.files),
        String::new(),
        if details.license.is_exclusive() {
            copy.exclusive_clause.to_string()
        } else {
            copy.non_exclusive_clause.to_string()
        },
    ]
}

/// Renders agreements as single-page A4 PDFs using the built-in Helvetica.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfContractRenderer;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 7.0;

impl ContractRenderer for PdfContractRenderer {
    fn render(&self, details: &ContractDetails) -> Result<Vec<u8>, ContractError> {
        let title = details.locale.contract_copy().title;
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "contract",
        );
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ContractError::Render(e.to_string()))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ContractError::Render(e.to_string()))?;
        let canvas = doc.get_page(page).get_layer(layer);

        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
        canvas.use_text(title, 18.0, Mm(MARGIN_MM), Mm(y), &bold);
        y -= LINE_HEIGHT_MM * 2.0;

        for line in contract_lines(details) {
            if !line.is_empty() {
                canvas.use_text(line, 11.0, Mm(MARGIN_MM), Mm(y), &regular);
            }
            y -= LINE_HEIGHT_MM;
        }

        doc.save_to_bytes()
            .map_err(|e| ContractError::Render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use beatstore_core::licensing::LicenseTier;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn details(tier: LicenseTier, locale: Locale) -> ContractDetails {
        ContractDetails {
            order_number: "BT-20260314-K3F9QZ".into(),
            issued_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            licensee_name: "Dana".into(),
            licensee_email: "dana@example.com".into(),
            beat_id: 7,
            beat_title: "Night Drive".into(),
            license: License {
                tier,
                price: 4900,
                is_available: true,
                features: tier.default_features(),
            },
            currency: "usd".into(),
            locale,
            files: vec![FileKind::Mp3, FileKind::Wav],
        }
    }

    #[test]
    fn lines_describe_the_license() {
        let lines = contract_lines(&details(LicenseTier::Standard, Locale::En));
        assert!(lines.contains(&"Order number: BT-20260314-K3F9QZ".to_string()));
        assert!(lines.contains(&"Date: March 14, 2026".to_string()));
        assert!(lines.contains(&"Price: $49.00".to_string()));
        assert!(lines.contains(&"  Streams: 50000".to_string()));
        assert!(lines.contains(&"  Included files: MP3, WAV".to_string()));
        assert!(lines.last().unwrap().contains("non-exclusive"));
    }

    #[test]
    fn exclusive_license_is_unlimited_and_exclusive() {
        let lines = contract_lines(&details(LicenseTier::Exclusive, Locale::En));
        assert!(lines.contains(&"  Streams: Unlimited".to_string()));
        assert!(lines.last().unwrap().starts_with("This is an exclusive license"));
    }

    #[test]
    fn spanish_contract_uses_spanish_labels() {
        let lines = contract_lines(&details(LicenseTier::Basic, Locale::Es));
        assert!(lines.contains(&"Fecha: 14/03/2026".to_string()));
        assert!(lines[0].starts_with("Número de pedido"));
    }

    #[test]
    fn pdf_renderer_produces_a_pdf() {
        let bytes = PdfContractRenderer
            .render(&details(LicenseTier::Pro, Locale::En))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

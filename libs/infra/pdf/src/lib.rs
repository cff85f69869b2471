// [libs/infra/pdf/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROFORMA INVOICE PDF RENDERER (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLABORADOR DE RENDERIZADO DOCUMENTAL
 *
 * Layout fijo: encabezado de compañía, título PROFORMA INVOICE, tabla
 * de detalles de factura, bloque "Bill To", tabla de líneas (con un
 * respaldo de línea única cuando no hay ítems), fila de total y pie de
 * página en cursiva. Este es el único colaborador del monorepo que
 * dibuja páginas; el resto del stack de terceros permanece sin cambios.
 * =================================================================
 */

use ledger_domain_models::{ErrorKind, Invoice, InvoiceLine, LedgerError, Outcome};
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_decimal::Decimal;
use std::io::BufWriter;
use tracing::instrument;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 20.0;

const COL_DESCRIPTION_X: f64 = MARGIN_MM;
const COL_QUANTITY_X: f64 = MARGIN_MM + 80.0;
const COL_UNIT_PRICE_X: f64 = MARGIN_MM + 105.0;
const COL_TOTAL_X: f64 = MARGIN_MM + 135.0;
const RIGHT_MARGIN_X: f64 = PAGE_WIDTH_MM - MARGIN_MM;

fn format_money(currency: &str, amount: Decimal) -> String {
    format!("{currency} {:.2}", amount.round_dp(2))
}

/// Cantidades enteras se muestran sin decimales, fraccionarias sin
/// ceros sobrantes.
fn format_quantity(quantity: Decimal) -> String {
    let rounded = quantity.round_dp(6).normalize();
    rounded.to_string()
}

struct Cursor {
    y_mm: f64,
}

impl Cursor {
    fn advance(&mut self, step_mm: f64) -> f64 {
        self.y_mm -= step_mm;
        self.y_mm
    }
}

fn draw_rule(layer: &PdfLayerReference, y_mm: f64) {
    let rule = Line {
        points: vec![
            (Point::new(Mm(MARGIN_MM), Mm(y_mm)), false),
            (Point::new(Mm(RIGHT_MARGIN_X), Mm(y_mm)), false),
        ],
        is_closed: false,
    };
    layer.add_line(rule);
}

/// Genera el PDF de una factura proforma. Nunca muta el invoice — es
/// una proyección de sólo lectura sobre la entidad ya persistida.
#[instrument(skip(invoice, lines))]
pub fn generate_proforma_invoice(
    invoice: &Invoice,
    lines: &[InvoiceLine],
    company_name: &str,
    company_address: &str,
) -> Outcome<Vec<u8>> {
    let (doc, page_index, layer_index) =
        PdfDocument::new("Proforma Invoice", Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Contents");
    let layer = doc.get_page(page_index).get_layer(layer_index);

    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to load bold font", e))?;
    let body_font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to load body font", e))?;
    let italic_font = doc
        .add_builtin_font(BuiltinFont::HelveticaOblique)
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to load italic font", e))?;

    let mut cursor = Cursor { y_mm: PAGE_HEIGHT_MM - MARGIN_MM };

    render_header(&layer, &mut cursor, &title_font, &body_font, company_name, company_address);
    render_proforma_title(&layer, &mut cursor, &title_font);
    render_invoice_details(&layer, &mut cursor, &title_font, &body_font, invoice);
    render_bill_to(&layer, &mut cursor, &title_font, &body_font, invoice);
    render_line_items(&layer, &mut cursor, &title_font, &body_font, invoice, lines);
    render_total(&layer, &mut cursor, &title_font, invoice);
    render_footer_disclaimer(&layer, &mut cursor, &italic_font);

    let mut buffer = Vec::new();
    doc.save(&mut BufWriter::new(&mut buffer))
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to serialize pdf document", e))?;

    Ok(buffer)
}

fn render_header(
    layer: &PdfLayerReference,
    cursor: &mut Cursor,
    title_font: &IndirectFontRef,
    body_font: &IndirectFontRef,
    company_name: &str,
    company_address: &str,
) {
    layer.use_text(company_name, 24.0, Mm(MARGIN_MM), Mm(cursor.y_mm), title_font);
    cursor.advance(8.0);
    layer.use_text(company_address, 10.0, Mm(MARGIN_MM), Mm(cursor.y_mm), body_font);
    cursor.advance(14.0);
}

fn render_proforma_title(layer: &PdfLayerReference, cursor: &mut Cursor, title_font: &IndirectFontRef) {
    layer.use_text("PROFORMA INVOICE", 14.0, Mm(MARGIN_MM), Mm(cursor.y_mm), title_font);
    cursor.advance(12.0);
}

fn render_invoice_details(
    layer: &PdfLayerReference,
    cursor: &mut Cursor,
    label_font: &IndirectFontRef,
    value_font: &IndirectFontRef,
    invoice: &Invoice,
) {
    let rows: Vec<(&str, String)> = {
        let mut rows = vec![
            ("Invoice Number:", invoice.invoice_number.clone()),
            ("Status:", invoice.status.as_str().to_string()),
            ("Currency:", invoice.currency.clone()),
            (
                "Billing Period:",
                format!(
                    "{} to {}",
                    invoice.billing_period_start.format("%Y-%m-%d"),
                    invoice.billing_period_end.format("%Y-%m-%d")
                ),
            ),
            ("Created:", format!("{} UTC", invoice.created_at.format("%Y-%m-%d %H:%M:%S"))),
        ];
        if let Some(issued_at) = invoice.issued_at {
            rows.push(("Issued:", format!("{} UTC", issued_at.format("%Y-%m-%d %H:%M:%S"))));
        }
        rows
    };

    for (label, value) in rows {
        layer.use_text(label, 10.0, Mm(MARGIN_MM), Mm(cursor.y_mm), label_font);
        layer.use_text(&value, 10.0, Mm(MARGIN_MM + 40.0), Mm(cursor.y_mm), value_font);
        cursor.advance(6.0);
    }
    cursor.advance(8.0);
}

fn render_bill_to(
    layer: &PdfLayerReference,
    cursor: &mut Cursor,
    label_font: &IndirectFontRef,
    value_font: &IndirectFontRef,
    invoice: &Invoice,
) {
    layer.use_text("Bill To:", 10.0, Mm(MARGIN_MM), Mm(cursor.y_mm), label_font);
    cursor.advance(6.0);
    layer.use_text(&format!("Tenant ID: {}", invoice.tenant_id), 10.0, Mm(MARGIN_MM), Mm(cursor.y_mm), value_font);
    cursor.advance(14.0);
}

fn render_line_items(
    layer: &PdfLayerReference,
    cursor: &mut Cursor,
    header_font: &IndirectFontRef,
    body_font: &IndirectFontRef,
    invoice: &Invoice,
    lines: &[InvoiceLine],
) {
    layer.use_text("Description", 10.0, Mm(COL_DESCRIPTION_X), Mm(cursor.y_mm), header_font);
    layer.use_text("Quantity", 10.0, Mm(COL_QUANTITY_X), Mm(cursor.y_mm), header_font);
    layer.use_text("Unit Price", 10.0, Mm(COL_UNIT_PRICE_X), Mm(cursor.y_mm), header_font);
    layer.use_text("Total", 10.0, Mm(COL_TOTAL_X), Mm(cursor.y_mm), header_font);
    cursor.advance(4.0);
    draw_rule(layer, cursor.y_mm);
    cursor.advance(6.0);

    if lines.is_empty() {
        // Sin líneas detalladas, se muestra un único renglón con el total.
        layer.use_text("Monthly subscription charges", 9.0, Mm(COL_DESCRIPTION_X), Mm(cursor.y_mm), body_font);
        layer.use_text("1", 9.0, Mm(COL_QUANTITY_X), Mm(cursor.y_mm), body_font);
        layer.use_text(
            &format_money(&invoice.currency, invoice.total_amount),
            9.0,
            Mm(COL_UNIT_PRICE_X),
            Mm(cursor.y_mm),
            body_font,
        );
        layer.use_text(
            &format_money(&invoice.currency, invoice.total_amount),
            9.0,
            Mm(COL_TOTAL_X),
            Mm(cursor.y_mm),
            body_font,
        );
        cursor.advance(7.0);
    } else {
        for line in lines {
            layer.use_text(&line.description, 9.0, Mm(COL_DESCRIPTION_X), Mm(cursor.y_mm), body_font);
            layer.use_text(&format_quantity(line.quantity), 9.0, Mm(COL_QUANTITY_X), Mm(cursor.y_mm), body_font);
            layer.use_text(
                &format_money(&invoice.currency, line.unit_price),
                9.0,
                Mm(COL_UNIT_PRICE_X),
                Mm(cursor.y_mm),
                body_font,
            );
            layer.use_text(
                &format_money(&invoice.currency, line.total_price),
                9.0,
                Mm(COL_TOTAL_X),
                Mm(cursor.y_mm),
                body_font,
            );
            cursor.advance(7.0);
        }
    }

    cursor.advance(3.0);
    draw_rule(layer, cursor.y_mm);
    cursor.advance(6.0);
}

fn render_total(layer: &PdfLayerReference, cursor: &mut Cursor, bold_font: &IndirectFontRef, invoice: &Invoice) {
    layer.use_text("Total:", 11.0, Mm(COL_UNIT_PRICE_X), Mm(cursor.y_mm), bold_font);
    layer.use_text(&format_money(&invoice.currency, invoice.total_amount), 11.0, Mm(COL_TOTAL_X), Mm(cursor.y_mm), bold_font);
    cursor.advance(16.0);
}

fn render_footer_disclaimer(layer: &PdfLayerReference, cursor: &mut Cursor, italic_font: &IndirectFontRef) {
    layer.use_text(
        "This is a proforma invoice for preview purposes only. It is not a legally binding document until officially issued.",
        9.0,
        Mm(MARGIN_MM),
        Mm(cursor.y_mm),
        italic_font,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_domain_models::InvoiceStatus;
    use rust_decimal_macros::dec;

    fn sample_invoice() -> Invoice {
        let now = Utc::now();
        Invoice {
            id: "invoice-1".into(),
            tenant_id: "tenant_alpha".into(),
            invoice_number: "INV-2026-000001".into(),
            status: InvoiceStatus::Draft,
            total_amount: dec!(15.00),
            currency: "USD".into(),
            billing_period_start: now,
            billing_period_end: now,
            issued_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn renders_a_valid_pdf_document_with_no_line_items() {
        let invoice = sample_invoice();
        let pdf_bytes = generate_proforma_invoice(&invoice, &[], "metaShark Tech", "Remote-first, planet Earth")
            .expect("pdf generation should succeed");

        assert!(pdf_bytes.starts_with(b"%PDF-"), "output must be a well-formed PDF document");
        assert!(pdf_bytes.len() > 200);
    }

    #[test]
    fn renders_a_valid_pdf_document_with_line_items() {
        let invoice = sample_invoice();
        let line = InvoiceLine::priced(
            "line-1".into(),
            invoice.id.clone(),
            "Monthly credit allocation - pro".into(),
            dec!(1000),
            dec!(0.015),
            Utc::now(),
        );

        let pdf_bytes = generate_proforma_invoice(&invoice, &[line], "metaShark Tech", "Remote-first, planet Earth")
            .expect("pdf generation should succeed");

        assert!(pdf_bytes.starts_with(b"%PDF-"));
    }
}

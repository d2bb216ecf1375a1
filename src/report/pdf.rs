use std::path::Path;

use anyhow::{Context, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, Rgb,
};

use crate::config::PaletteConfig;
use crate::dashboard::{summarize, Dashboard};
use crate::filter::{View, ViewMode, ViewSelection};
use crate::geometry::{bounds, Shape};
use crate::models::{GeoFeature, RiskLabel};

use super::chart::{bar_chart, BarChart};
use super::geojson::FILL_OPACITY;
use super::{rows, FeatureRow};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 18.0;
const COVER_HDR_H: f32 = 72.0; // gradient header height on cover page
const T_END: f32 = PAGE_W - MARGIN;

// ── Colour palette ────────────────────────────────────────────────────────────
const BG:           (f32, f32, f32) = (1.00, 1.00, 1.00);
const PANEL:        (f32, f32, f32) = (1.00, 1.00, 1.00);
const PANEL_ALT:    (f32, f32, f32) = (0.95, 0.96, 0.99); // alternating row tint
const PANEL_BORDER: (f32, f32, f32) = (0.85, 0.87, 0.92);
const ACCENT_TEAL:  (f32, f32, f32) = (0.09, 0.55, 0.60);
const ACCENT_BLU:   (f32, f32, f32) = (0.20, 0.46, 0.95);
const TEXT_PRI:     (f32, f32, f32) = (0.07, 0.08, 0.14);
const TEXT_SEC:     (f32, f32, f32) = (0.36, 0.40, 0.52);
const TEXT_MUT:     (f32, f32, f32) = (0.58, 0.63, 0.72);
const WHITE:        (f32, f32, f32) = (1.00, 1.00, 1.00);
const WHITE_DIM:    (f32, f32, f32) = (0.84, 0.95, 0.96);

const R_BADGE: f32 = 1.5;

// ── Public entry point ────────────────────────────────────────────────────────

/// Render a PDF report: cover page → map → chart → municipality table.
/// An empty view gets the cover page only, with a notice.
pub fn render(
    dashboard: &Dashboard,
    selection: &ViewSelection,
    view: &View<'_>,
    output_path: &Path,
) -> Result<()> {
    let doc = PdfDocument::empty("Deserción Escolar");
    let palette = &dashboard.config.palette;
    let features = view.features();

    add_cover_page(&doc, dashboard, selection, view)?;
    if !features.is_empty() {
        add_map_page(&doc, features, palette)?;
        add_chart_page(&doc, &bar_chart(features, selection), palette)?;
        add_table_pages(&doc, &rows(features), palette)?;
    }

    let bytes = doc.save_to_bytes()?;
    std::fs::write(output_path, &bytes)
        .with_context(|| format!("Failed to write PDF to {}", output_path.display()))?;

    println!("Informe PDF escrito en: {}", output_path.display());
    Ok(())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn fonts(doc: &PdfDocumentReference) -> Result<Fonts> {
    Ok(Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    })
}

fn new_page(doc: &PdfDocumentReference, name: &str) -> PdfLayerReference {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), name);
    let layer = doc.get_page(page_idx).get_layer(layer_idx);
    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    layer
}

fn page_heading(layer: &PdfLayerReference, fonts: &Fonts, title: &str, subtitle: &str) {
    fill_gradient_h(layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_TEAL, ACCENT_BLU, 21);
    set_color(layer, TEXT_PRI);
    layer.use_text(truncate(title, 44), 20.0, Mm(MARGIN), Mm(278.5), &fonts.bold);
    set_color(layer, TEXT_SEC);
    layer.use_text(subtitle, 9.0, Mm(MARGIN), Mm(271.5), &fonts.regular);
    draw_hline(layer, MARGIN, T_END, 267.5, PANEL_BORDER);
}

fn footer(layer: &PdfLayerReference, fonts: &Fonts) {
    draw_hline(layer, MARGIN, T_END, 22.0, PANEL_BORDER);
    set_color(layer, TEXT_MUT);
    layer.use_text(
        format!("desercion-map v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(MARGIN), Mm(15.0), &fonts.regular,
    );
    layer.use_text(report_date(), 7.5, Mm(T_END - 22.0), Mm(15.0), &fonts.regular);
}

// ── Cover page ────────────────────────────────────────────────────────────────

fn add_cover_page(
    doc: &PdfDocumentReference,
    dashboard: &Dashboard,
    selection: &ViewSelection,
    view: &View<'_>,
) -> Result<()> {
    let layer = new_page(doc, "Portada");
    let fonts = fonts(doc)?;
    let summary = summarize(view.features());
    let palette = &dashboard.config.palette;

    let hdr_bot = PAGE_H - COVER_HDR_H;
    fill_gradient_h(&layer, 0.0, hdr_bot, PAGE_W, COVER_HDR_H, ACCENT_TEAL, ACCENT_BLU, 28);

    set_color(&layer, WHITE_DIM);
    layer.use_text(
        format!("desercion-map v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(T_END - 40.0), Mm(PAGE_H - 10.5), &fonts.regular,
    );
    set_color(&layer, WHITE);
    layer.use_text("Deserción Escolar", 28.0, Mm(MARGIN), Mm(PAGE_H - 26.0), &fonts.bold);
    set_color(&layer, WHITE_DIM);
    layer.use_text(
        truncate(&dashboard.config.region.name, 30),
        28.0, Mm(MARGIN), Mm(PAGE_H - 41.0), &fonts.bold,
    );

    // ── Selection chip ────────────────────────────────────────────────────────
    let chip_y = hdr_bot - 18.0;
    let chip_h = 12.0f32;
    let chip_w = 130.0f32;
    fill_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL);
    stroke_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL_BORDER);
    fill_rect(&layer, MARGIN, chip_y, 2.5, chip_h, ACCENT_TEAL);

    set_color(&layer, TEXT_MUT);
    layer.use_text("VISTA", 6.0, Mm(MARGIN + 5.0), Mm(chip_y + chip_h - 3.8), &fonts.bold);
    set_color(&layer, TEXT_PRI);
    layer.use_text(
        truncate(&selection_label(selection), 46),
        9.5, Mm(MARGIN + 5.0), Mm(chip_y + 2.8), &fonts.bold,
    );

    set_color(&layer, TEXT_SEC);
    layer.use_text(
        format!(
            "Generado  {}   ·   {} municipios con datos, {} sin datos",
            report_date(),
            dashboard.report.matched,
            dashboard.report.unmatched
        ),
        9.0, Mm(MARGIN), Mm(chip_y - 8.0), &fonts.regular,
    );

    // ── Stat cards ────────────────────────────────────────────────────────────
    let rule_y = chip_y - 16.5;
    draw_hline(&layer, MARGIN, T_END, rule_y, PANEL_BORDER);
    set_color(&layer, TEXT_MUT);
    layer.use_text("RESUMEN", 6.5, Mm(MARGIN), Mm(rule_y - 7.0), &fonts.bold);

    let card_y = rule_y - 42.0;
    let card_h = 26.0f32;
    let gap = 4.0f32;
    let card_w = (T_END - MARGIN - gap * 4.0) / 5.0;

    let count = |risk: RiskLabel| summary.by_risk.get(&risk).copied().unwrap_or(0).to_string();
    let cards: [(&str, String, (f32, f32, f32)); 5] = [
        ("TOTAL", summary.total.to_string(), ACCENT_BLU),
        ("BAJO", count(RiskLabel::Low), risk_color(palette, RiskLabel::Low)),
        ("MODERADO", count(RiskLabel::Moderate), risk_color(palette, RiskLabel::Moderate)),
        ("ALTO", count(RiskLabel::High), risk_color(palette, RiskLabel::High)),
        ("SIN DATOS", count(RiskLabel::NoData), risk_color(palette, RiskLabel::NoData)),
    ];

    for (i, (label, value, accent)) in cards.iter().enumerate() {
        let cx = MARGIN + (card_w + gap) * i as f32;
        draw_stat_card(&layer, cx, card_y, card_w, card_h, label, value, *accent, &fonts);
    }

    // ── Contents or empty notice ──────────────────────────────────────────────
    let section_y = card_y - 13.0;
    draw_hline(&layer, MARGIN, T_END, section_y, PANEL_BORDER);

    if matches!(view, View::NoResults) {
        set_color(&layer, TEXT_PRI);
        layer.use_text(
            "Sin resultados",
            14.0, Mm(MARGIN), Mm(section_y - 10.0), &fonts.bold,
        );
        set_color(&layer, TEXT_SEC);
        layer.use_text(
            "Ningún municipio coincide con los filtros seleccionados.",
            9.0, Mm(MARGIN), Mm(section_y - 17.0), &fonts.regular,
        );
    } else {
        set_color(&layer, TEXT_MUT);
        layer.use_text("CONTENIDO", 6.5, Mm(MARGIN), Mm(section_y - 7.5), &fonts.bold);

        let mean = summary
            .mean_dropout
            .map(|m| format!("Deserción promedio de la vista: {:.2} %", m))
            .unwrap_or_else(|| "Deserción promedio de la vista: N/D".to_string());
        let items = [
            ("Mapa", "Municipios coloreados por nivel de riesgo".to_string()),
            ("Gráfica", bar_chart(view.features(), selection).title),
            ("Datos", mean),
        ];
        for (j, (title, desc)) in items.iter().enumerate() {
            let iy = section_y - 15.0 - j as f32 * 10.0;
            fill_rounded_rect(&layer, MARGIN, iy + 2.0, 2.0, 2.0, 1.0, ACCENT_TEAL);
            set_color(&layer, TEXT_PRI);
            layer.use_text(*title, 8.5, Mm(MARGIN + 5.0), Mm(iy + 2.0), &fonts.bold);
            set_color(&layer, TEXT_SEC);
            layer.use_text(desc.as_str(), 8.0, Mm(MARGIN + 5.0), Mm(iy - 3.5), &fonts.regular);
        }
    }

    footer(&layer, &fonts);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_stat_card(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    label: &str,
    value: &str,
    accent: (f32, f32, f32),
    fonts: &Fonts,
) {
    fill_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL);
    stroke_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL_BORDER);

    // Thin accent top strip
    fill_rect(layer, x, y + h - 2.0, w, 2.0, accent);

    set_color(layer, TEXT_PRI);
    layer.use_text(value, 20.0, Mm(x + 4.0), Mm(y + h * 0.38), &fonts.bold);

    set_color(layer, TEXT_MUT);
    layer.use_text(label, 6.5, Mm(x + 4.0), Mm(y + 3.5), &fonts.regular);
}

fn selection_label(selection: &ViewSelection) -> String {
    match &selection.mode {
        ViewMode::All => "Todos los municipios".to_string(),
        ViewMode::Single(name) => name.clone(),
        ViewMode::Compare(names) => format!("Comparación: {}", names.join(", ")),
    }
}

// ── Map page ──────────────────────────────────────────────────────────────────

/// Equirectangular projection of a lon/lat box into a page rectangle, with
/// longitudes scaled by the cosine of the middle latitude.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_lon: f64,
    min_lat: f64,
    kx: f64,
    scale: f64,
    x0: f64,
    y0: f64,
}

impl Projection {
    fn fit(bbox: (f64, f64, f64, f64), x: f32, y: f32, w: f32, h: f32) -> Self {
        let (min_lon, min_lat, max_lon, max_lat) = bbox;
        let kx = ((min_lat + max_lat) / 2.0).to_radians().cos();
        let span_x = ((max_lon - min_lon) * kx).max(1e-9);
        let span_y = (max_lat - min_lat).max(1e-9);
        let scale = (w as f64 / span_x).min(h as f64 / span_y);
        Projection {
            min_lon,
            min_lat,
            kx,
            scale,
            // center the drawing in the spare dimension
            x0: x as f64 + (w as f64 - span_x * scale) / 2.0,
            y0: y as f64 + (h as f64 - span_y * scale) / 2.0,
        }
    }

    fn project(&self, [lon, lat]: [f64; 2]) -> (f32, f32) {
        (
            (self.x0 + (lon - self.min_lon) * self.kx * self.scale) as f32,
            (self.y0 + (lat - self.min_lat) * self.scale) as f32,
        )
    }
}

fn add_map_page(
    doc: &PdfDocumentReference,
    features: &[&GeoFeature],
    palette: &PaletteConfig,
) -> Result<()> {
    let layer = new_page(doc, "Mapa");
    let fonts = fonts(doc)?;
    page_heading(&layer, &fonts, "Mapa de riesgo", "Municipios coloreados por nivel de riesgo de deserción");

    const MAP_TOP: f32 = 260.0;
    const MAP_BOT: f32 = 62.0;
    let shapes: Vec<(&Shape, RiskLabel)> = features
        .iter()
        .filter_map(|f| f.shape.as_ref().map(|s| (s, f.risk())))
        .collect();

    match bounds(shapes.iter().map(|(s, _)| *s)) {
        Some(bbox) => {
            let proj = Projection::fit(bbox, MARGIN, MAP_BOT, T_END - MARGIN, MAP_TOP - MAP_BOT);
            layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
            layer.set_outline_thickness(0.5);
            for (shape, risk) in &shapes {
                let fill = over_white(risk_color(palette, *risk), FILL_OPACITY as f32);
                draw_shape(&layer, shape, &proj, fill);
            }
            layer.set_outline_thickness(1.0);
        }
        None => {
            set_color(&layer, TEXT_SEC);
            layer.use_text(
                "Ningún municipio de la vista tiene geometría válida.",
                9.0, Mm(MARGIN), Mm(MAP_TOP - 10.0), &fonts.regular,
            );
        }
    }

    // Legend
    let legend_y = 40.0;
    set_color(&layer, TEXT_MUT);
    layer.use_text("NIVEL DE RIESGO", 6.5, Mm(MARGIN), Mm(legend_y + 10.0), &fonts.bold);
    for (i, risk) in RiskLabel::ALL.into_iter().enumerate() {
        let lx = MARGIN + i as f32 * 44.0;
        fill_rounded_rect(&layer, lx, legend_y, 5.0, 5.0, 1.0, risk_color(palette, risk));
        set_color(&layer, TEXT_SEC);
        layer.use_text(risk.as_str(), 8.0, Mm(lx + 7.0), Mm(legend_y + 1.2), &fonts.regular);
    }

    footer(&layer, &fonts);
    Ok(())
}

fn draw_shape(layer: &PdfLayerReference, shape: &Shape, proj: &Projection, fill: (f32, f32, f32)) {
    if let Shape::Point(p) = shape {
        let (x, y) = proj.project(*p);
        fill_rounded_rect(layer, x - 1.0, y - 1.0, 2.0, 2.0, 1.0, fill);
        return;
    }
    let rings: Vec<Vec<(Point, bool)>> = shape
        .rings()
        .into_iter()
        .filter(|r| r.len() >= 3)
        .map(|r| {
            r.iter()
                .map(|p| {
                    let (x, y) = proj.project(*p);
                    (Point::new(Mm(x), Mm(y)), false)
                })
                .collect()
        })
        .collect();
    if rings.is_empty() {
        return;
    }
    let (r, g, b) = fill;
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings,
        mode: PaintMode::FillStroke,
        winding_order: WindingOrder::EvenOdd,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

// ── Chart page ────────────────────────────────────────────────────────────────

fn add_chart_page(doc: &PdfDocumentReference, chart: &BarChart, palette: &PaletteConfig) -> Result<()> {
    let layer = new_page(doc, "Grafica");
    let fonts = fonts(doc)?;
    page_heading(&layer, &fonts, &chart.title, &format!("Valores en {}", chart.unit));

    const ROW_H: f32 = 9.0;
    const BAR_H: f32 = 5.5;
    const TOP: f32 = 256.0;
    const MAX_BARS: usize = 24;
    let label_w = 52.0f32;
    let bar_x = MARGIN + label_w;
    let bar_max_w = T_END - bar_x - 16.0;
    let max = chart.max_value();

    if chart.bars.is_empty() {
        set_color(&layer, TEXT_SEC);
        layer.use_text("Sin valores para graficar.", 9.0, Mm(MARGIN), Mm(TOP), &fonts.regular);
    }

    for (i, bar) in chart.bars.iter().take(MAX_BARS).enumerate() {
        let y = TOP - i as f32 * ROW_H;
        if i % 2 == 0 {
            fill_rect(&layer, MARGIN, y - 2.0, T_END - MARGIN, ROW_H, PANEL_ALT);
        }
        set_color(&layer, TEXT_PRI);
        layer.use_text(truncate(&bar.label, 26), 8.5, Mm(MARGIN + 1.5), Mm(y + 1.0), &fonts.regular);

        let w = if max > 0.0 { (bar.value / max) as f32 * bar_max_w } else { 0.0 };
        if w > 0.0 {
            fill_rounded_rect(&layer, bar_x, y - 0.3, w, BAR_H, 1.0, risk_color(palette, bar.risk));
        }
        set_color(&layer, TEXT_SEC);
        let value = if bar.value.fract() == 0.0 {
            format!("{}", bar.value as i64)
        } else {
            format!("{:.2}", bar.value)
        };
        layer.use_text(value, 8.0, Mm(bar_x + w + 2.0), Mm(y + 1.0), &fonts.bold);
    }

    if chart.bars.len() > MAX_BARS {
        set_color(&layer, TEXT_MUT);
        layer.use_text(
            format!("+ {} más…", chart.bars.len() - MAX_BARS),
            7.5, Mm(MARGIN + 1.5), Mm(TOP - MAX_BARS as f32 * ROW_H), &fonts.regular,
        );
    }

    footer(&layer, &fonts);
    Ok(())
}

// ── Municipality table pages ──────────────────────────────────────────────────

fn add_table_pages(doc: &PdfDocumentReference, rows: &[FeatureRow], palette: &PaletteConfig) -> Result<()> {
    let fonts = fonts(doc)?;

    const ROW_H: f32 = 7.0;
    const HDR_Y: f32 = 268.5;
    const FIRST_Y: f32 = 259.5;
    const BOT_MARGIN: f32 = 25.0;

    //  MUNICIPIO   DESERCIÓN   RIESGO      EFICIENCIA  CENTROIDE
    let col_x = [MARGIN, MARGIN + 58.0, MARGIN + 84.0, MARGIN + 120.0, MARGIN + 146.0];
    let headers = ["MUNICIPIO", "DESERCIÓN (%)", "RIESGO", "EFICIENCIA (%)", "CENTROIDE"];

    let mut cur_y = FIRST_Y;
    let mut page: Option<PdfLayerReference> = None;
    let mut page_num: u32 = 0;

    for (row_idx, row) in rows.iter().enumerate() {
        let layer = match page.take() {
            Some(layer) if cur_y - ROW_H >= BOT_MARGIN => layer,
            _ => {
                page_num += 1;
                let layer = new_page(doc, "Datos");
                fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_TEAL, ACCENT_BLU, 21);

                set_color(&layer, TEXT_PRI);
                layer.use_text("Municipios de la vista", 14.0, Mm(MARGIN), Mm(282.5), &fonts.bold);
                set_color(&layer, TEXT_MUT);
                layer.use_text(
                    format!("Página {}", page_num),
                    8.0, Mm(T_END - 16.0), Mm(283.0), &fonts.regular,
                );
                draw_hline(&layer, MARGIN, T_END, 277.5, PANEL_BORDER);

                fill_rounded_rect(&layer, MARGIN, HDR_Y - 7.5, T_END - MARGIN, 9.5, R_BADGE, PANEL);
                stroke_rounded_rect(&layer, MARGIN, HDR_Y - 7.5, T_END - MARGIN, 9.5, R_BADGE, PANEL_BORDER);
                set_color(&layer, TEXT_MUT);
                for (i, h) in headers.iter().enumerate() {
                    layer.use_text(*h, 7.0, Mm(col_x[i] + 1.5), Mm(HDR_Y - 4.0), &fonts.bold);
                }

                footer(&layer, &fonts);
                cur_y = FIRST_Y;
                layer
            }
        };

        if row_idx % 2 == 0 {
            fill_rect(&layer, MARGIN, cur_y - ROW_H + 1.5, T_END - MARGIN, ROW_H, PANEL_ALT);
        }

        let text_y = cur_y - 4.0;
        set_color(&layer, TEXT_PRI);
        layer.use_text(truncate(&row.municipio, 30), 8.0, Mm(col_x[0] + 1.5), Mm(text_y), &fonts.regular);
        set_color(&layer, TEXT_SEC);
        layer.use_text(row.desercion.to_string(), 8.0, Mm(col_x[1] + 1.5), Mm(text_y), &fonts.regular);

        // Risk badge
        let badge_x = col_x[2] + 1.5;
        let badge_y = cur_y - ROW_H + 2.2;
        fill_rounded_rect(&layer, badge_x, badge_y, 4.0, 4.0, 1.0, risk_color(palette, row.riesgo));
        set_color(&layer, TEXT_PRI);
        layer.use_text(row.riesgo.as_str(), 7.5, Mm(badge_x + 5.5), Mm(text_y), &fonts.regular);

        set_color(&layer, TEXT_SEC);
        layer.use_text(row.eficiencia.to_string(), 8.0, Mm(col_x[3] + 1.5), Mm(text_y), &fonts.regular);
        set_color(&layer, TEXT_MUT);
        layer.use_text(
            format!("{:.3}, {:.3}", row.centroide[0], row.centroide[1]),
            7.0, Mm(col_x[4] + 1.5), Mm(text_y), &fonts.regular,
        );

        draw_hline(&layer, MARGIN, T_END, cur_y - ROW_H + 1.5, PANEL_BORDER);
        cur_y -= ROW_H;
        page = Some(layer);
    }

    Ok(())
}

// ── Drawing helpers ───────────────────────────────────────────────────────────

fn risk_color(palette: &PaletteConfig, risk: RiskLabel) -> (f32, f32, f32) {
    let (r, g, b) = palette.rgb(risk);
    (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Color seen when `color` is painted at `alpha` over a white page.
fn over_white((r, g, b): (f32, f32, f32), alpha: f32) -> (f32, f32, f32) {
    let mix = |c: f32| c * alpha + (1.0 - alpha);
    (mix(r), mix(g), mix(b))
}

fn set_color(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
             (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![vec![
            (Point::new(Mm(x),     Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x),     Mm(y + h)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

/// Clockwise ring approximating a rounded rectangle, 8 segments per corner.
fn rounded_rect_ring(x: f32, y: f32, w: f32, h: f32, r: f32) -> Vec<(Point, bool)> {
    let r = r.min(w / 2.0).min(h / 2.0);
    const SEGS: usize = 8;
    let mut pts = Vec::with_capacity(4 * (SEGS + 1));

    // (corner_cx, corner_cy, arc_start_deg, arc_end_deg)
    let corners = [
        (x + w - r, y + r,     270.0f32, 360.0f32), // bottom-right
        (x + w - r, y + h - r, 0.0f32,   90.0f32),  // top-right
        (x + r,     y + h - r, 90.0f32,  180.0f32), // top-left
        (x + r,     y + r,     180.0f32, 270.0f32), // bottom-left
    ];

    for (cx, cy, start, end) in &corners {
        for i in 0..=SEGS {
            let t = i as f32 / SEGS as f32;
            let angle = (start + (end - start) * t).to_radians();
            pts.push((
                Point::new(Mm(cx + r * angle.cos()), Mm(cy + r * angle.sin())),
                false,
            ));
        }
    }
    pts
}

fn fill_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                     r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

fn stroke_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                       r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.set_outline_thickness(0.4);
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Stroke,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

fn draw_hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32,
              (r, g, b): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.set_outline_thickness(0.3);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

/// Fill a left-to-right gradient rectangle using `steps` vertical strips.
#[allow(clippy::too_many_arguments)]
fn fill_gradient_h(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    from: (f32, f32, f32),
    to: (f32, f32, f32),
    steps: usize,
) {
    let step_w = w / steps as f32;
    for i in 0..steps {
        let t = i as f32 / (steps - 1).max(1) as f32;
        let color = (
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
            from.2 + (to.2 - from.2) * t,
        );
        // strips overlap to hide rounding gaps
        fill_rect(layer, x + i as f32 * step_w, y, step_w + 0.6, h, color);
    }
}

fn truncate(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max {
        format!("{}…", chars[..max - 1].iter().collect::<String>())
    } else {
        s.to_string()
    }
}

// Approximate calendar date from the unix clock, good enough for a footer.
fn report_date() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days  = secs / 86400;
    let year  = 1970 + days / 365;
    let doy   = days % 365;
    let month = (doy / 30) + 1;
    let day   = (doy % 30) + 1;
    format!("{:04}-{:02}-{:02}", year, month.min(12), day.min(31))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    use crate::config::Config;
    use crate::enrich::EnrichReport;
    use crate::models::{Enrichment, Metric};

    fn feature(name: &str, offset: f64, risk: RiskLabel) -> GeoFeature {
        let coordinates = json!([[
            [-103.0 + offset, 20.0],
            [-102.5 + offset, 20.0],
            [-102.5 + offset, 20.5],
            [-103.0 + offset, 20.5]
        ]]);
        GeoFeature {
            municipality_name: name.to_string(),
            shape: Shape::from_json(&coordinates),
            properties: Map::new(),
            enrichment: Some(Enrichment {
                dropout: Metric::Value(4.0 + offset),
                efficiency: Metric::Value(88.0),
                risk,
                centroid: [20.25, -102.75 + offset],
                matched: true,
            }),
        }
    }

    fn dashboard(n: usize) -> Dashboard {
        let risks = [RiskLabel::Low, RiskLabel::Moderate, RiskLabel::High];
        let features = (0..n)
            .map(|i| feature(&format!("Municipio {i}"), i as f64 * 0.5, risks[i % 3]))
            .collect();
        Dashboard {
            config: Config::default(),
            records: Vec::new(),
            features,
            report: EnrichReport {
                matched: n,
                ..EnrichReport::default()
            },
        }
    }

    fn assert_pdf(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_full_report() {
        // enough rows to spill onto a second table page
        let dash = dashboard(40);
        let selection = ViewSelection::all();
        let view = dash.view(&selection);
        let out = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        render(&dash, &selection, &view, out.path()).unwrap();
        assert_pdf(out.path());
    }

    #[test]
    fn test_render_empty_view() {
        let dash = dashboard(2);
        let selection = ViewSelection {
            mode: ViewMode::Single("Atlantis".to_string()),
            risks: ViewSelection::default_risks(),
        };
        let view = dash.view(&selection);
        assert!(matches!(view, View::NoResults));
        let out = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        render(&dash, &selection, &view, out.path()).unwrap();
        assert_pdf(out.path());
    }

    #[test]
    fn test_projection_fits_rect() {
        let proj = Projection::fit((-104.0, 19.0, -101.0, 22.5), 10.0, 20.0, 100.0, 100.0);
        for corner in [[-104.0, 19.0], [-101.0, 22.5], [-104.0, 22.5], [-101.0, 19.0]] {
            let (x, y) = proj.project(corner);
            assert!((10.0 - 1e-3..=110.0 + 1e-3).contains(&x), "x={x}");
            assert!((20.0 - 1e-3..=120.0 + 1e-3).contains(&y), "y={y}");
        }
        // north is up
        assert!(proj.project([-102.0, 22.0]).1 > proj.project([-102.0, 20.0]).1);
    }

    #[test]
    fn test_over_white() {
        let (r, g, b) = over_white((0.0, 1.0, 0.5), 0.6);
        assert!((r - 0.4).abs() < 1e-6);
        assert!((g - 1.0).abs() < 1e-6);
        assert!((b - 0.7).abs() < 1e-6);
    }
}

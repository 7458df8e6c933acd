//! Scene export to document formats.
//!
//! Renders a [`Scene`] as the composition surface draws it: a 300x300
//! `viewBox`, a 30-unit grid with centre guides, each glyph transformed about
//! its own centre, and a fixed attribution line. PDF is reserved.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use textlab_core::hit::{ROTATE_HANDLE_RADIUS, SCALE_HANDLE_SIZE};
use textlab_core::{CanvasElement, ElementId, Scene, CANVAS_SIZE, GLYPH_BOX};

use crate::error::{RenderError, RenderResult};

/// Base name of exported files.
pub const EXPORT_FILE_STEM: &str = "typography-stamp";

/// Grid cell size in canvas units.
const GRID_STEP: f64 = 30.0;

/// Stroke width of grid and guide lines.
const GUIDE_STROKE: f64 = 0.5;

/// Stroke width of outlined glyphs and selection chrome at scale 1.
const OUTLINE_STROKE: f64 = 1.5;

/// Font stack used for glyphs.
const GLYPH_FONT: &str = "\"Noto Serif SC\", serif";

/// Default attribution appended to every export.
pub const DEFAULT_ATTRIBUTION: &str = "Created with Text Lab";

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// SVG vector graphics (returns the SVG XML string as UTF-8 bytes).
    Svg,
    /// PDF document. Not implemented.
    Pdf,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the output.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }

    /// Download file name, e.g. `typography-stamp.svg`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{EXPORT_FILE_STEM}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Svg => f.write_str("SVG"),
            Self::Pdf => f.write_str("PDF"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> RenderResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(RenderError::UnknownFormat(s.to_string())),
        }
    }
}

/// Configuration for scene export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Colour of grid and centre guides.
    pub grid_color: String,
    /// Colour of glyph fill (or stroke when outlined).
    pub ink_color: String,
    /// Colour of selection chrome.
    pub accent_color: String,
    /// Handle fill colour.
    pub surface_color: String,
    /// Optional solid background behind the grid.
    pub background: Option<String>,
    /// Attribution line; `None` omits it.
    pub attribution: Option<String>,
    /// Draw selection chrome around this element.
    pub selection: Option<ElementId>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            grid_color: "#e5e7eb".to_string(),
            ink_color: "#1f2937".to_string(),
            accent_color: "#dc2626".to_string(),
            surface_color: "#ffffff".to_string(),
            background: None,
            attribution: Some(DEFAULT_ATTRIBUTION.to_string()),
            selection: None,
        }
    }
}

/// Exports a [`Scene`] to document formats.
pub struct SceneExporter {
    config: ExportConfig,
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a scene to the specified format.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Unsupported`] for PDF, or an error if the
    /// document cannot be written.
    pub fn export(&self, scene: &Scene, format: ExportFormat) -> RenderResult<Vec<u8>> {
        match format {
            ExportFormat::Svg => {
                let svg = self.render_to_svg(scene)?;
                Ok(svg.into_bytes())
            }
            ExportFormat::Pdf => self.render_to_pdf(scene),
        }
    }

    /// Render the scene as an SVG document.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the document fails.
    pub fn render_to_svg(&self, scene: &Scene) -> RenderResult<String> {
        let cfg = &self.config;
        let grid = escape_xml(&cfg.grid_color);
        let half = CANVAS_SIZE / 2.0;

        let mut svg = String::with_capacity(2048 + scene.len() * 320);
        write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" id=\"canvas-svg\" width=\"{CANVAS_SIZE}\" height=\"{CANVAS_SIZE}\" viewBox=\"0 0 {CANVAS_SIZE} {CANVAS_SIZE}\">",
        )?;

        write!(
            svg,
            "<defs><pattern id=\"grid\" width=\"{GRID_STEP}\" height=\"{GRID_STEP}\" patternUnits=\"userSpaceOnUse\"><path d=\"M {GRID_STEP} 0 L 0 0 0 {GRID_STEP}\" fill=\"none\" stroke=\"{grid}\" stroke-width=\"{GUIDE_STROKE}\"/></pattern></defs>",
        )?;
        if let Some(background) = &cfg.background {
            write!(
                svg,
                "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
                escape_xml(background)
            )?;
        }
        svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"url(#grid)\"/>");
        write!(
            svg,
            "<line x1=\"{half}\" y1=\"0\" x2=\"{half}\" y2=\"{CANVAS_SIZE}\" stroke=\"{grid}\" stroke-width=\"{GUIDE_STROKE}\"/>",
        )?;
        write!(
            svg,
            "<line x1=\"0\" y1=\"{half}\" x2=\"{CANVAS_SIZE}\" y2=\"{half}\" stroke=\"{grid}\" stroke-width=\"{GUIDE_STROKE}\"/>",
        )?;

        for element in scene.paint_order() {
            self.render_element(&mut svg, element)?;
            if cfg.selection == Some(element.id) {
                self.render_selection(&mut svg, element)?;
            }
        }

        if let Some(attribution) = &cfg.attribution {
            write!(
                svg,
                "<text x=\"50%\" y=\"295\" dominant-baseline=\"middle\" text-anchor=\"middle\" font-size=\"5\" fill=\"#9ca3af\">{}</text>",
                escape_xml(attribution)
            )?;
        }

        svg.push_str("</svg>");
        tracing::debug!(elements = scene.len(), bytes = svg.len(), "rendered svg");
        Ok(svg)
    }

    /// PDF export is reserved.
    ///
    /// # Errors
    ///
    /// Always returns [`RenderError::Unsupported`].
    #[allow(clippy::unused_self)]
    pub fn render_to_pdf(&self, _scene: &Scene) -> RenderResult<Vec<u8>> {
        Err(RenderError::Unsupported(ExportFormat::Pdf))
    }

    fn render_element(&self, svg: &mut String, element: &CanvasElement) -> RenderResult<()> {
        let ink = escape_xml(&self.config.ink_color);
        let (fill, stroke, stroke_width) = if element.is_outline {
            ("none", ink.as_str(), OUTLINE_STROKE / element.scale)
        } else {
            (ink.as_str(), "none", 0.0)
        };

        write_transform_open(svg, element)?;
        if element.is_mirror {
            svg.push_str("<g transform=\"scale(-1, 1)\">");
        }
        write!(
            svg,
            "<text text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-weight=\"{}\" font-size=\"{GLYPH_BOX}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" paint-order=\"stroke\">{}</text>",
            escape_xml(GLYPH_FONT),
            element.font_weight,
            escape_xml(&element.character),
        )?;
        if element.is_mirror {
            svg.push_str("</g>");
        }
        svg.push_str("</g>");
        Ok(())
    }

    /// Dashed box plus rotate and scale handles, sized to stay constant on canvas.
    fn render_selection(&self, svg: &mut String, element: &CanvasElement) -> RenderResult<()> {
        let accent = escape_xml(&self.config.accent_color);
        let surface = escape_xml(&self.config.surface_color);
        let s = element.scale;
        let half = GLYPH_BOX / 2.0;
        let stroke = OUTLINE_STROKE / s;
        let handle = SCALE_HANDLE_SIZE / s;

        write_transform_open(svg, element)?;
        write!(
            svg,
            "<rect x=\"{}\" y=\"{}\" width=\"{GLYPH_BOX}\" height=\"{GLYPH_BOX}\" fill=\"none\" stroke=\"{accent}\" stroke-width=\"{stroke}\" stroke-dasharray=\"{} {}\"/>",
            -half,
            -half,
            4.0 / s,
            2.0 / s,
        )?;
        write!(
            svg,
            "<circle cx=\"{half}\" cy=\"{}\" r=\"{}\" fill=\"{surface}\" stroke=\"{accent}\" stroke-width=\"{stroke}\"/>",
            -half,
            ROTATE_HANDLE_RADIUS / s,
        )?;
        write!(
            svg,
            "<rect x=\"{0}\" y=\"{0}\" width=\"{handle}\" height=\"{handle}\" fill=\"{surface}\" stroke=\"{accent}\" stroke-width=\"{stroke}\"/>",
            half - handle / 2.0,
        )?;
        svg.push_str("</g>");
        Ok(())
    }
}

fn write_transform_open(svg: &mut String, element: &CanvasElement) -> fmt::Result {
    write!(
        svg,
        "<g transform=\"translate({}, {}) rotate({}) scale({})\">",
        element.x, element.y, element.rotation, element.scale
    )
}

/// Escape special XML characters.
#[must_use]
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use textlab_core::{ElementStyle, GlyphId, Point};

    fn glyph(glyph: GlyphId, x: f64, y: f64, z: usize) -> CanvasElement {
        CanvasElement::new(glyph, Point::new(x, y), ElementStyle::default(), z)
    }

    #[test]
    fn test_svg_export_empty_scene() {
        let svg = SceneExporter::with_defaults()
            .render_to_svg(&Scene::new())
            .expect("svg export");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("viewBox=\"0 0 300 300\""));
        assert!(svg.contains("<pattern id=\"grid\" width=\"30\" height=\"30\""));
        assert!(svg.contains("<line x1=\"150\" y1=\"0\" x2=\"150\" y2=\"300\""));
        assert!(svg.contains(">Created with Text Lab</text>"));
    }

    #[test]
    fn test_glyph_transform_and_font() {
        let el = glyph(GlyphId::Shan, 120.0, 80.5, 0).with_transform(1.2, -15.0);
        let scene = Scene::from_elements(vec![el]);
        let svg = SceneExporter::with_defaults()
            .render_to_svg(&scene)
            .expect("svg export");
        assert!(svg.contains("transform=\"translate(120, 80.5) rotate(-15) scale(1.2)\""));
        assert!(svg.contains("font-size=\"48\""));
        assert!(svg.contains("font-weight=\"900\""));
        assert!(svg.contains("&quot;Noto Serif SC&quot;, serif"));
        assert!(svg.contains(">山</text>"));
        assert!(!svg.contains("scale(-1, 1)"));
    }

    #[test]
    fn test_mirror_and_outline() {
        let mut el = glyph(GlyphId::Gong, 150.0, 150.0, 0).with_transform(2.0, 0.0);
        el.is_mirror = true;
        el.is_outline = true;
        let svg = SceneExporter::with_defaults()
            .render_to_svg(&Scene::from_elements(vec![el]))
            .expect("svg export");
        assert!(svg.contains("<g transform=\"scale(-1, 1)\">"));
        assert!(svg.contains("fill=\"none\" stroke=\"#1f2937\" stroke-width=\"0.75\""));
    }

    #[test]
    fn test_elements_are_written_in_z_order() {
        let top = glyph(GlyphId::Ri, 10.0, 10.0, 1);
        let bottom = glyph(GlyphId::Yue, 20.0, 20.0, 0);
        let svg = SceneExporter::with_defaults()
            .render_to_svg(&Scene::from_elements(vec![top, bottom]))
            .expect("svg export");
        let ri = svg.find("日").expect("ri");
        let yue = svg.find("月").expect("yue");
        assert!(yue < ri);
    }

    #[test]
    fn test_selection_chrome_is_opt_in() {
        let el = glyph(GlyphId::Kou, 150.0, 150.0, 0);
        let id = el.id;
        let scene = Scene::from_elements(vec![el]);

        let plain = SceneExporter::with_defaults()
            .render_to_svg(&scene)
            .expect("svg export");
        assert!(!plain.contains("<circle"));

        let config = ExportConfig {
            selection: Some(id),
            ..ExportConfig::default()
        };
        let selected = SceneExporter::new(config)
            .render_to_svg(&scene)
            .expect("svg export");
        assert!(selected.contains("<circle cx=\"24\" cy=\"-24\" r=\"6\""));
        assert!(selected.contains("stroke-dasharray=\"4 2\""));
        assert!(selected.contains("<rect x=\"19\" y=\"19\" width=\"10\" height=\"10\""));
    }

    #[test]
    fn test_attribution_is_escaped_and_optional() {
        let config = ExportConfig {
            attribution: Some("<Tom & Jerry>".to_string()),
            ..ExportConfig::default()
        };
        let svg = SceneExporter::new(config)
            .render_to_svg(&Scene::new())
            .expect("svg export");
        assert!(svg.contains("&lt;Tom &amp; Jerry&gt;"));

        let none = ExportConfig {
            attribution: None,
            ..ExportConfig::default()
        };
        let svg = SceneExporter::new(none)
            .render_to_svg(&Scene::new())
            .expect("svg export");
        assert!(!svg.contains("font-size=\"5\""));
    }

    #[test]
    fn test_pdf_is_unsupported() {
        let err = SceneExporter::with_defaults()
            .export(&Scene::new(), ExportFormat::Pdf)
            .expect_err("pdf");
        assert!(matches!(err, RenderError::Unsupported(ExportFormat::Pdf)));
        assert_eq!(err.to_string(), "PDF export is a planned feature");
    }

    #[test]
    fn test_format_parsing_and_names() {
        assert_eq!("SVG".parse::<ExportFormat>().expect("svg"), ExportFormat::Svg);
        assert_eq!("pdf".parse::<ExportFormat>().expect("pdf"), ExportFormat::Pdf);
        assert!("png".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Svg.file_name(), "typography-stamp.svg");
        assert_eq!(ExportFormat::Svg.mime_type(), "image/svg+xml");
    }

    #[test]
    fn test_xml_escaping() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Document title written into the PDF info dictionary
    pub document_title: String,
    pub title_font_size_pt: f32,
    pub body_font_size_pt: f32,
    pub spine_font_size_pt: f32,
    /// Line height as a multiple of the font size
    pub line_spacing: f32,
    /// Share of the content box given to artwork on pages with text
    pub image_share: f32,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            document_title: "Book".to_string(),
            title_font_size_pt: 28.0,
            body_font_size_pt: 14.0,
            spine_font_size_pt: 8.0,
            line_spacing: 1.3,
            image_share: 0.7,
        }
    }
}

impl AssemblerOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            document_title: title.into(),
            ..Default::default()
        }
    }
}

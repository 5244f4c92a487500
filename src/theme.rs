use serde::Serialize;

/// Palette for the dark dashboard page and its charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorTheme {
    pub background: String,
    pub light_background: String,
    pub dark_background: String,
    pub text: String,
    pub title_text: String,
    pub grid: String,
    pub total_line: String,
    pub success_line: String,
    pub failure_line: String,
    pub success_slice: String,
    pub failure_slice: String,
    /// Cycled through for the per-category lines.
    pub category_lines: Vec<String>,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            background: "rgb(6, 30, 68)".to_string(),
            light_background: "rgb(8, 34, 84)".to_string(),
            dark_background: "rgb(0, 20, 48)".to_string(),
            text: "rgb(196, 205, 213)".to_string(),
            title_text: "rgb(255, 255, 255)".to_string(),
            grid: "rgb(24, 58, 84)".to_string(),
            total_line: "rgb(50, 205, 50)".to_string(),
            success_line: "#00CED1".to_string(),
            failure_line: "rgb(255, 100, 14)".to_string(),
            success_slice: "rgb(30, 150, 250)".to_string(),
            failure_slice: "rgb(244, 48, 100)".to_string(),
            category_lines: ["#21c7ef", "#ef21a1", "#12ba53", "#ba0f0f", "#baa50f"]
                .iter()
                .map(|color| color.to_string())
                .collect(),
        }
    }
}

impl ColorTheme {
    pub fn category_color(&self, index: usize) -> &str {
        if self.category_lines.is_empty() {
            return &self.text;
        }
        &self.category_lines[index % self.category_lines.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_colors_cycle() {
        let theme = ColorTheme::default();
        assert_eq!(theme.category_color(0), "#21c7ef");
        assert_eq!(theme.category_color(5), "#21c7ef");
        assert_eq!(theme.category_color(6), "#ef21a1");
    }

    #[test]
    fn empty_palette_falls_back_to_text() {
        let theme = ColorTheme {
            category_lines: Vec::new(),
            ..ColorTheme::default()
        };
        assert_eq!(theme.category_color(3), theme.text);
    }
}

use axum::Json;

use crate::views::rich_content::EditorConfig;

/// Toolbar and behaviour for the rich text editor used on news bodies.
pub async fn editor_config() -> Json<EditorConfig> {
    Json(EditorConfig::default())
}

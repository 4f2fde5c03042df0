use serde::{Deserialize, Serialize};

use crate::{
    consts::{NEWS_AUTHOR, store_const::NEWS_TABLE},
    errors::{Error, Result},
    store::Record,
    views::rich_content::RichContent,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewsArticle {
    pub id: i64,
    pub title: String,
    /// HTML fragment produced by the rich content editor.
    #[serde(default)]
    pub body: RichContent,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Record for NewsArticle {
    const TABLE: &'static str = NEWS_TABLE;
    const NAME: &'static str = "News article";

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid("Title is required."));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateNewsArticle {
    pub title: String,
    pub body: RichContent,
    pub created_at: String,
    pub updated_at: String,
}

/// What readers see: the stored article plus its byline.
#[derive(Serialize, Debug, Clone)]
pub struct NewsItem {
    #[serde(flatten)]
    pub article: NewsArticle,
    pub author_name: &'static str,
    /// Body as plain text, for previews.
    pub summary: String,
}

impl From<NewsArticle> for NewsItem {
    fn from(article: NewsArticle) -> Self {
        NewsItem {
            summary: article.body.plain_text(),
            article,
            author_name: NEWS_AUTHOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_get_byline_and_plain_summary() {
        let article: NewsArticle = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "Reunion",
            "body": "<p>See you in <em>Laxenburg</em></p>",
            "created_at": "2025-02-01T09:00:00Z",
        }))
        .unwrap();
        let item = NewsItem::from(article);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["author_name"], "IACA Alumni Team");
        assert_eq!(json["summary"], "See you in Laxenburg");
        assert_eq!(json["title"], "Reunion");
        assert!(json["updated_at"].is_null());
    }

    #[test]
    fn blank_title_fails_the_local_check() {
        let article = NewsArticle {
            id: 1,
            title: "  ".into(),
            body: RichContent::default(),
            created_at: "2025-02-01T09:00:00Z".into(),
            updated_at: None,
        };
        assert!(article.check().is_err());
    }
}

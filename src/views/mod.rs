pub mod editor_form;
pub mod list;
pub mod rich_content;

pub mod pdf;
pub mod plain_text;

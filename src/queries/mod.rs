pub mod chapters;
pub mod ddl;
pub mod history;
pub mod stories;

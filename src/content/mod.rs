pub mod content_file;
pub mod front_matter;
pub mod parsing_utils;
pub mod separator;

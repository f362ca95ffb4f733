pub mod ocr;

pub use ocr::{extract_text, ocr_status};

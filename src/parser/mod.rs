pub mod pdf_reader;
pub mod sections;
pub mod text_extractor;

pub use pdf_reader::{PageSource, PdfReader};
pub use sections::{find_page_with_all, scan_sections, BoardSection, SectionScan};
pub use text_extractor::{extract_words, Word};

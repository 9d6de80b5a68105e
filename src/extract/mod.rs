pub mod boards;
pub mod main_record;
pub mod supply;

pub use boards::{parse_board_metadata, BoardMetadata, BoardProcessor};
pub use main_record::{parse_main_record, MainRecordParser};
pub use supply::{parse_numeric_lines, NumericSupply, SupplyExtractor};

pub mod excel_read;
pub mod output;

pub use excel_read::{CalamineReader, SheetGrid, WorkbookReader, discover_workbooks};

pub mod ledger_style;
pub mod table_style;

pub use ledger_style::segment_ledger_style;
pub use table_style::segment_table_style;

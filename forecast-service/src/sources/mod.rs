pub mod consumption_csv_file;

pub use consumption_csv_file::ConsumptionCsvFileSource;

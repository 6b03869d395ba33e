pub mod order_reader;
pub mod outcome_writer;
pub mod stock_writer;

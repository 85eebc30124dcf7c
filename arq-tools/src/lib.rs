pub mod byte_reader;
pub mod crypt;

pub mod table_read;

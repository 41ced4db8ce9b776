pub mod db;
pub mod dead_letter;
pub mod manager;
pub mod mapper;
pub mod statement;
pub mod uploader;

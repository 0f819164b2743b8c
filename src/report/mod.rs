// src/report/mod.rs

pub mod attempts;
pub mod columns;
pub mod export;
pub mod form;
pub mod grading;
pub mod options;
pub mod page;
pub mod responses;
pub mod sql;
pub mod stats;
pub mod table;

#![allow(dead_code)]

pub mod changes;
pub mod git;
pub mod output;

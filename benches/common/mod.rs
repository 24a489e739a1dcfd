#![allow(dead_code)]

pub mod specs;
pub mod workload;

//! Middle-end - name resolution, type analysis and three-address code

pub mod attrs;
pub mod resolve;
pub mod tac;
pub mod tac_gen;
pub mod tac_printer;
pub mod type_analysis;

pub mod chart;
pub mod io;
pub mod polars_ext;

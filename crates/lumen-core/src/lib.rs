pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod integrate;
pub mod io;
pub mod motion;
pub mod pipeline;
pub mod track;

pub mod drawing;

pub use drawing::{Drawing, LabelCount};
